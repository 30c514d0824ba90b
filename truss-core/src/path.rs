//! Canonical project directory layout.
//!
//! `ProjectPaths` is an immutable bundle of absolute paths derived from a
//! single `project_root`. Every path is validated to exist at construction
//! time, so downstream components never need to re-check for missing
//! directories — if you hold a `ProjectPaths`, the layout is there.

use std::path::{Path, PathBuf};

use crate::error::PathModelError;

/// Describes the handful of paths that can't be derived purely from
/// `project_root` and `project_name` — the entry points a caller supplies.
#[derive(Debug, Clone)]
pub struct ProjectPathsInit {
    /// Path to the main source file, relative to `source_project`.
    pub main_source: PathBuf,
    /// Zero or more ancillary main-source files, relative to `source_project`.
    pub ancillary_mains: Vec<PathBuf>,
    /// Path to the common-includes header, relative to `source_project`.
    pub common_includes: PathBuf,
}

/// Immutable, validated bundle of absolute paths rooted at `project_root`.
///
/// Invariant: every file getter names a path that exists as a regular file
/// at construction time; every directory getter names a path that exists as
/// a directory; `project_root` is an ancestor of every other path.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    project_root: PathBuf,
    source_root: PathBuf,
    source_project: PathBuf,
    tests_root: PathBuf,
    materials_root: PathBuf,
    build_root: PathBuf,
    aux_root: PathBuf,
    output_root: PathBuf,
    main_source: PathBuf,
    common_includes: PathBuf,
    ancillary_mains: Vec<PathBuf>,
}

/// Extension appended to material files the updater must never overwrite,
/// regardless of content diff — a predicted-materials sentinel, not a
/// file format of its own.
pub const PROTECTED_MATERIALS_EXT: &str = "seqpat";

impl ProjectPaths {
    /// Builds and validates the layout.
    ///
    /// `project_name` is lower-cased to derive `source_project`
    /// (`source_root / lower(project_name)`), matching every other
    /// derivation in this module.
    pub fn new(
        project_root: impl Into<PathBuf>,
        project_name: &str,
        init: ProjectPathsInit,
    ) -> Result<Self, PathModelError> {
        let project_root = project_root.into();
        if !project_root.is_dir() {
            return Err(PathModelError::RootNotFound(project_root));
        }
        let root = project_root.clone();

        let source_root = require_dir(root.join("source"))?;
        let source_project = require_dir(source_root.join(project_name.to_lowercase()))?;
        let tests_root = require_dir(root.join("tests"))?;
        let materials_root = require_dir(root.join("test_materials"))?;
        let build_root = require_dir(root.join("build"))?;
        let aux_root = require_dir(root.join("aux_files"))?;
        let output_root = require_dir(root.join("output"))?;

        let main_source = require_file(source_project.join(&init.main_source))?;
        let common_includes = require_file(source_project.join(&init.common_includes))?;

        let mut ancillary_mains = Vec::with_capacity(init.ancillary_mains.len());
        for rel in &init.ancillary_mains {
            ancillary_mains.push(require_file(source_project.join(rel))?);
        }

        for p in std::iter::once(&source_root)
            .chain(std::iter::once(&tests_root))
            .chain(std::iter::once(&materials_root))
            .chain(std::iter::once(&build_root))
            .chain(std::iter::once(&aux_root))
            .chain(std::iter::once(&output_root))
        {
            if !p.starts_with(&root) {
                return Err(PathModelError::OutsideRoot(p.clone()));
            }
        }

        Ok(Self {
            project_root: root,
            source_root,
            source_project,
            tests_root,
            materials_root,
            build_root,
            aux_root,
            output_root,
            main_source,
            common_includes,
            ancillary_mains,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn source_project(&self) -> &Path {
        &self.source_project
    }

    pub fn tests_root(&self) -> &Path {
        &self.tests_root
    }

    pub fn materials_root(&self) -> &Path {
        &self.materials_root
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    pub fn aux_root(&self) -> &Path {
        &self.aux_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn main_source(&self) -> &Path {
        &self.main_source
    }

    pub fn main_source_dir(&self) -> &Path {
        self.main_source
            .parent()
            .expect("main_source was validated to be a file with a parent")
    }

    pub fn common_includes(&self) -> &Path {
        &self.common_includes
    }

    pub fn ancillary_mains(&self) -> &[PathBuf] {
        &self.ancillary_mains
    }

    /// The canonical per-compiler build directory:
    /// `build_root / compiler / <main_source_dir relative to source_project>`.
    pub fn build_dir(&self, compiler: &str) -> PathBuf {
        let rel = self
            .main_source_dir()
            .strip_prefix(&self.source_project)
            .unwrap_or(self.main_source_dir());
        self.build_root.join(compiler).join(rel)
    }

    pub fn recovery_dir(&self) -> PathBuf {
        self.output_root.join("recovery")
    }

    pub fn diagnostics_dir(&self, suite: &str) -> PathBuf {
        self.output_root.join("diagnostics_output").join(suite)
    }

    pub fn summaries_dir(&self, suite: &str) -> PathBuf {
        self.output_root.join("test_summaries").join(suite)
    }

    pub fn prune_dir(&self, compiler: &str) -> PathBuf {
        self.build_dir(compiler).join("prune")
    }

    /// Expected materials directory for a test source file under
    /// `tests_root`: `materials_root / rel_path_without_extension`.
    pub fn materials_dir_for_test(&self, test_source: &Path) -> PathBuf {
        let rel = test_source
            .strip_prefix(&self.tests_root)
            .unwrap_or(test_source);
        self.materials_root.join(rel.with_extension(""))
    }
}

fn require_dir(path: impl Into<PathBuf>) -> Result<PathBuf, PathModelError> {
    let path = path.into();
    if !path.is_dir() {
        return Err(PathModelError::MissingDir(path));
    }
    Ok(path)
}

fn require_file(path: impl Into<PathBuf>) -> Result<PathBuf, PathModelError> {
    let path = path.into();
    if !path.is_file() {
        return Err(PathModelError::MissingFile(path));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scaffold() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("source/foo")).unwrap();
        fs::create_dir_all(root.join("tests")).unwrap();
        fs::create_dir_all(root.join("test_materials")).unwrap();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::create_dir_all(root.join("aux_files")).unwrap();
        fs::create_dir_all(root.join("output")).unwrap();
        fs::write(root.join("source/foo/main.cpp"), "int main(){}").unwrap();
        fs::write(root.join("source/foo/common_includes.hpp"), "").unwrap();
        dir
    }

    #[test]
    fn fresh_project_constructs() {
        let dir = scaffold();
        let paths = ProjectPaths::new(
            dir.path(),
            "Foo",
            ProjectPathsInit {
                main_source: "main.cpp".into(),
                ancillary_mains: vec![],
                common_includes: "common_includes.hpp".into(),
            },
        )
        .unwrap();

        assert!(paths.source_project().ends_with("foo"));
        assert!(paths.tests_root().is_dir());
        assert!(paths.main_source().is_file());
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = ProjectPaths::new(
            "/does/not/exist/anywhere",
            "Foo",
            ProjectPathsInit {
                main_source: "main.cpp".into(),
                ancillary_mains: vec![],
                common_includes: "common_includes.hpp".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "ROOT_NOT_FOUND");
    }

    #[test]
    fn materials_dir_strips_extension() {
        let dir = scaffold();
        let paths = ProjectPaths::new(
            dir.path(),
            "Foo",
            ProjectPathsInit {
                main_source: "main.cpp".into(),
                ancillary_mains: vec![],
                common_includes: "common_includes.hpp".into(),
            },
        )
        .unwrap();

        let test_source = paths.tests_root().join("Stuff/FooTest.cpp");
        let materials = paths.materials_dir_for_test(&test_source);
        assert_eq!(materials, paths.materials_root().join("Stuff/FooTest"));
    }
}

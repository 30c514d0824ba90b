//! `truss init`: scaffolds the directory layout described in SPEC_FULL.md
//! §3/§6 and writes a default `Truss.toml`. Source/CMake templating itself
//! is out of scope (§1) — this only creates the directories and config
//! file the rest of the framework expects to find.

use std::path::Path;

use crate::error::CliResult;

pub struct InitOptions {
    pub copyright: String,
    pub project_name: String,
    pub to_files: bool,
    pub no_ide: bool,
    pub no_git: bool,
}

pub fn scaffold(root: &Path, options: &InitOptions) -> CliResult<()> {
    let lower_name = options.project_name.to_lowercase();

    for dir in [
        "tests",
        "test_materials",
        "build",
        "output",
        "aux_files/test_templates",
        "aux_files/source_templates",
        "aux_files/project_template",
    ] {
        std::fs::create_dir_all(root.join(dir))?;
    }
    std::fs::create_dir_all(root.join("source").join(&lower_name))?;

    let config_path = root.join("Truss.toml");
    if !config_path.exists() {
        std::fs::write(config_path, default_config_toml(&options.project_name))?;
    }

    if options.to_files {
        std::fs::write(root.join("COPYRIGHT"), format!("{}\n", options.copyright))?;
    }

    if !options.no_git {
        let gitignore = root.join(".gitignore");
        if !gitignore.exists() {
            std::fs::write(gitignore, "/build\n/output\n")?;
        }
    }

    if !options.no_ide {
        let ide_marker = root.join(".truss-project");
        if !ide_marker.exists() {
            std::fs::write(ide_marker, format!("project_name = \"{}\"\n", options.project_name))?;
        }
    }

    Ok(())
}

fn default_config_toml(project_name: &str) -> String {
    format!(
        "project_name = \"{project_name}\"\n\
         concurrency = \"dynamic\"\n\
         instability_replicas = 2\n\
         include_cutoff = \"\"\n\
         prune_enabled = true\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_creates_the_documented_layout() {
        let dir = tempfile::tempdir().unwrap();
        let options = InitOptions {
            copyright: "Example Corp".to_string(),
            project_name: "Foo".to_string(),
            to_files: true,
            no_ide: false,
            no_git: false,
        };
        scaffold(dir.path(), &options).unwrap();

        assert!(dir.path().join("tests").is_dir());
        assert!(dir.path().join("source/foo").is_dir());
        assert!(dir.path().join("aux_files/test_templates").is_dir());
        assert!(dir.path().join("Truss.toml").is_file());
        assert!(dir.path().join("COPYRIGHT").is_file());
        assert!(dir.path().join(".gitignore").is_file());
    }

    #[test]
    fn no_git_and_no_ide_skip_their_files() {
        let dir = tempfile::tempdir().unwrap();
        let options = InitOptions {
            copyright: "Example Corp".to_string(),
            project_name: "Foo".to_string(),
            to_files: false,
            no_ide: true,
            no_git: true,
        };
        scaffold(dir.path(), &options).unwrap();

        assert!(!dir.path().join(".gitignore").exists());
        assert!(!dir.path().join(".truss-project").exists());
        assert!(!dir.path().join("COPYRIGHT").exists());
    }
}

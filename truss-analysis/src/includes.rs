//! Comment-aware `#include` extraction.

/// An include directive as written in the source, with the delimiter style
/// it used (`"..."` vs `<...>`) preserved since resolution treats them
/// differently (quoted includes are resolved relative to the including
/// file first; angled includes go straight to the externals list if they
/// don't resolve against a known root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    pub target: String,
    pub quoted: bool,
}

/// Extracts every `#include` directive from `text`, honoring `//` line
/// comments and `/* */` block comments, and stopping as soon as a line
/// containing `cutoff` is seen (an empty cutoff scans the whole file).
pub fn extract_includes(text: &str, cutoff: &str) -> Vec<IncludeDirective> {
    let mut includes = Vec::new();
    let mut in_block_comment = false;

    for line in text.lines() {
        if !cutoff.is_empty() && line.contains(cutoff) {
            break;
        }

        let stripped = strip_line_comment(line, &mut in_block_comment);
        let trimmed = stripped.trim_start();
        if let Some(rest) = trimmed.strip_prefix("#include") {
            if let Some(directive) = parse_include_operand(rest) {
                includes.push(directive);
            }
        }
    }

    includes
}

/// Removes `//` and `/* ... */` content from a single line, tracking
/// whether a block comment begun on an earlier line is still open.
fn strip_line_comment(line: &str, in_block_comment: &mut bool) -> String {
    let mut out = String::with_capacity(line.len());
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if *in_block_comment {
            if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                *in_block_comment = false;
                i += 2;
                continue;
            }
            i += 1;
            continue;
        }

        if chars[i] == '/' && chars.get(i + 1) == Some(&'/') {
            break;
        }
        if chars[i] == '/' && chars.get(i + 1) == Some(&'*') {
            *in_block_comment = true;
            i += 2;
            continue;
        }

        out.push(chars[i]);
        i += 1;
    }

    out
}

fn parse_include_operand(rest: &str) -> Option<IncludeDirective> {
    let rest = rest.trim_start();
    if let Some(r) = rest.strip_prefix('"') {
        let end = r.find('"')?;
        return Some(IncludeDirective {
            target: r[..end].to_string(),
            quoted: true,
        });
    }
    if let Some(r) = rest.strip_prefix('<') {
        let end = r.find('>')?;
        return Some(IncludeDirective {
            target: r[..end].to_string(),
            quoted: false,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quoted_and_angled_includes() {
        let text = "#include \"Foo.hpp\"\n#include <vector>\n";
        let includes = extract_includes(text, "");
        assert_eq!(includes.len(), 2);
        assert_eq!(includes[0].target, "Foo.hpp");
        assert!(includes[0].quoted);
        assert_eq!(includes[1].target, "vector");
        assert!(!includes[1].quoted);
    }

    #[test]
    fn ignores_includes_inside_line_comments() {
        let text = "// #include \"Hidden.hpp\"\n#include \"Visible.hpp\"\n";
        let includes = extract_includes(text, "");
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].target, "Visible.hpp");
    }

    #[test]
    fn ignores_includes_inside_block_comments_spanning_lines() {
        let text = "/*\n#include \"Hidden.hpp\"\n*/\n#include \"Visible.hpp\"\n";
        let includes = extract_includes(text, "");
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].target, "Visible.hpp");
    }

    #[test]
    fn stops_scanning_at_cutoff_token() {
        let text = "#include \"Before.hpp\"\n// CUTOFF\n#include \"After.hpp\"\n";
        let includes = extract_includes(text, "CUTOFF");
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].target, "Before.hpp");
    }
}

//! `{$I file}` / `{$INCLUDE file}` expansion.
//!
//! This runs once, ahead of lexing, over the raw source text: it has no
//! notion of tokens, only of `{`, `$`, and quotes. A doubled quote `''`
//! inside a string literal is passed through untouched so the lexer still
//! sees it as an escaped quote later; outside a string literal `{...}` is
//! just a comment and is left alone unless it starts with `$`.

use std::path::{Path, PathBuf};

use crate::error::CompileError;

const DEFAULT_MAX_INCLUDE_DEPTH: usize = 8;

pub fn expand_includes(source: &str, filename: &str) -> Result<String, CompileError> {
    expand_includes_with_depth(source, filename, DEFAULT_MAX_INCLUDE_DEPTH)
}

pub fn expand_includes_with_depth(
    source: &str,
    filename: &str,
    max_depth: usize,
) -> Result<String, CompileError> {
    let mut included = Vec::new();
    preprocess(source, Path::new(filename), 0, max_depth, &mut included)
}

fn preprocess(
    source: &str,
    file: &Path,
    depth: usize,
    max_depth: usize,
    included: &mut Vec<PathBuf>,
) -> Result<String, CompileError> {
    if depth > max_depth {
        return Err(CompileError::Preprocess(format!(
            "include depth exceeded (max {max_depth})"
        )));
    }

    let canonical = file.to_path_buf();
    if included.contains(&canonical) {
        return Err(CompileError::Preprocess(format!(
            "circular include detected: {}",
            file.display()
        )));
    }
    included.push(canonical);

    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut pos = 0;
    let mut in_string = false;

    while pos < chars.len() {
        let c = chars[pos];

        if in_string {
            out.push(c);
            if c == '\'' {
                // A doubled quote `''` is an escaped quote inside the
                // literal; consume both characters and stay in-string.
                if chars.get(pos + 1) == Some(&'\'') {
                    out.push('\'');
                    pos += 2;
                    continue;
                }
                in_string = false;
            }
            pos += 1;
            continue;
        }

        if c == '\'' {
            in_string = true;
            out.push(c);
            pos += 1;
            continue;
        }

        if c == '{' && chars.get(pos + 1) == Some(&'$') {
            let directive_start = pos;
            pos += 2;
            match parse_include_directive(&chars, &mut pos) {
                Some(include_name) => {
                    let include_path = resolve_include_path(file, &include_name);
                    let include_source =
                        std::fs::read_to_string(&include_path).map_err(|e| {
                            CompileError::Preprocess(format!(
                                "could not read include file '{}': {e}",
                                include_path.display()
                            ))
                        })?;
                    let expanded = preprocess(
                        &include_source,
                        &include_path,
                        depth + 1,
                        max_depth,
                        included,
                    )?;
                    out.push_str(&expanded);
                }
                None => {
                    return Err(CompileError::Preprocess(format!(
                        "malformed compiler directive starting at byte {directive_start}"
                    )));
                }
            }
            continue;
        }

        out.push(c);
        pos += 1;
    }

    Ok(out)
}

/// `pos` points just past `{$`. Recognizes `I ` / `INCLUDE ` (case
/// insensitive) followed by a filename and a closing `}`, advancing `pos`
/// past the `}` on success.
fn parse_include_directive(chars: &[char], pos: &mut usize) -> Option<String> {
    while matches!(chars.get(*pos), Some(' ') | Some('\t')) {
        *pos += 1;
    }

    let remaining: String = chars[*pos..].iter().collect();
    let lower = remaining.to_ascii_lowercase();

    if lower.starts_with("include ") || lower.starts_with("include\t") {
        *pos += "include ".len();
    } else if lower.starts_with("i ") || lower.starts_with("i\t") {
        *pos += "i ".len();
    } else {
        return None;
    }

    while matches!(chars.get(*pos), Some(' ') | Some('\t')) {
        *pos += 1;
    }

    let name_start = *pos;
    while !matches!(chars.get(*pos), Some('}') | None) {
        *pos += 1;
    }
    let mut name: String = chars[name_start..*pos].iter().collect();
    while name.ends_with(' ') || name.ends_with('\t') {
        name.pop();
    }

    if chars.get(*pos) != Some(&'}') {
        return None;
    }
    *pos += 1;

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn resolve_include_path(base_file: &Path, include_name: &str) -> PathBuf {
    let include_path = Path::new(include_name);
    if include_path.is_absolute() {
        return include_path.to_path_buf();
    }
    base_file
        .parent()
        .map(|dir| dir.join(include_path))
        .unwrap_or_else(|| include_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn source_without_directives_is_unchanged() {
        let src = "program p; begin end.";
        assert_eq!(expand_includes(src, "p.pas").unwrap(), src);
    }

    #[test]
    fn doubled_quote_inside_string_literal_is_preserved() {
        let src = "writeln('it''s fine');";
        assert_eq!(expand_includes(src, "p.pas").unwrap(), src);
    }

    #[test]
    fn include_directive_splices_in_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let inc_path = dir.path().join("inc.pas");
        std::fs::File::create(&inc_path)
            .unwrap()
            .write_all(b"var x: integer;")
            .unwrap();

        let main_path = dir.path().join("main.pas");
        let src = format!("program p;\n{{$I inc.pas}}\nbegin end.");
        std::fs::write(&main_path, &src).unwrap();

        let expanded = expand_includes(&src, main_path.to_str().unwrap()).unwrap();
        assert!(expanded.contains("var x: integer;"));
        assert!(!expanded.contains("{$I"));
    }

    #[test]
    fn circular_include_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = dir.path().join("a.pas");
        let b_path = dir.path().join("b.pas");
        std::fs::write(&a_path, "{$I b.pas}").unwrap();
        std::fs::write(&b_path, "{$I a.pas}").unwrap();

        let src = std::fs::read_to_string(&a_path).unwrap();
        let err = expand_includes(&src, a_path.to_str().unwrap());
        assert!(err.is_err());
    }

    #[test]
    fn include_depth_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        // each file includes the next one in an unbroken chain
        for i in 0..12 {
            let path = dir.path().join(format!("f{i}.pas"));
            let body = if i == 11 {
                "x".to_string()
            } else {
                format!("{{$I f{}.pas}}", i + 1)
            };
            std::fs::write(&path, body).unwrap();
        }

        let f0 = dir.path().join("f0.pas");
        let src = std::fs::read_to_string(&f0).unwrap();
        let err = expand_includes(&src, f0.to_str().unwrap());
        assert!(err.is_err());
    }
}

//! Operator SQL hooks.
//!
//! Hook files run at four named phases (before_data, after_data, before_fk,
//! after_all). Each file is read, `{{schema}}` is expanded, and the text is
//! split into statements by a single-pass state machine that treats
//! comments, quoted literals/identifiers, and dollar-quoted blocks as
//! opaque.

use tracing::info;

use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::target::PgPool;

/// Read, template, split, and execute every hook file for a phase.
pub async fn run_hook_files(
    pool: &PgPool,
    config: &Config,
    files: &[String],
    phase: &str,
) -> Result<()> {
    if files.is_empty() {
        return Ok(());
    }
    info!("  running {} hooks ({} files)...", phase, files.len());

    for file in files {
        let path = config.resolve_path(file);
        let sql = std::fs::read_to_string(&path).map_err(|e| {
            MigrateError::hook(phase, file.as_str(), format!("read {}: {}", path.display(), e))
        })?;

        let sql = sql.replace("{{schema}}", &config.schema);
        let stmts = split_statements(&sql);

        info!("    {}: {} statements", file, stmts.len());
        for (i, stmt) in stmts.iter().enumerate() {
            pool.execute(stmt).await.map_err(|e| {
                MigrateError::hook(
                    phase,
                    file.as_str(),
                    format!("statement {}: {}\nSQL: {}", i + 1, e, stmt),
                )
            })?;
        }
    }
    Ok(())
}

/// Split SQL text on top-level semicolons.
///
/// Semicolons inside `-- ...` line comments, `/* ... */` block comments
/// (nested to arbitrary depth), `'...'` literals (with `''` escapes),
/// `"..."` identifiers (with `""` escapes), and `$$ ... $$` / `$tag$ ...
/// $tag$` dollar-quoted blocks do not terminate a statement. A trailing
/// non-empty buffer with no final semicolon is emitted as the last
/// statement.
pub fn split_statements(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut stmts = Vec::new();
    let mut current = Vec::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut in_line_comment = false;
    let mut block_comment_depth = 0usize;
    let mut dollar_tag: Option<Vec<u8>> = None;

    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];

        if in_line_comment {
            current.push(c);
            if c == b'\n' {
                in_line_comment = false;
            }
            i += 1;
            continue;
        }

        if block_comment_depth > 0 {
            current.push(c);
            if c == b'/' && bytes.get(i + 1) == Some(&b'*') {
                current.push(b'*');
                i += 2;
                block_comment_depth += 1;
                continue;
            }
            if c == b'*' && bytes.get(i + 1) == Some(&b'/') {
                current.push(b'/');
                i += 2;
                block_comment_depth -= 1;
                continue;
            }
            i += 1;
            continue;
        }

        if in_single_quote {
            current.push(c);
            if c == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    current.push(b'\'');
                    i += 2;
                    continue;
                }
                in_single_quote = false;
            }
            i += 1;
            continue;
        }

        if in_double_quote {
            current.push(c);
            if c == b'"' {
                if bytes.get(i + 1) == Some(&b'"') {
                    current.push(b'"');
                    i += 2;
                    continue;
                }
                in_double_quote = false;
            }
            i += 1;
            continue;
        }

        if let Some(tag) = &dollar_tag {
            if bytes[i..].starts_with(tag) {
                current.extend_from_slice(tag);
                i += tag.len();
                dollar_tag = None;
                continue;
            }
            current.push(c);
            i += 1;
            continue;
        }

        match c {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                current.push(b'-');
                current.push(b'-');
                i += 2;
                in_line_comment = true;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                current.push(b'/');
                current.push(b'*');
                i += 2;
                block_comment_depth = 1;
            }
            b'\'' => {
                current.push(c);
                in_single_quote = true;
                i += 1;
            }
            b'"' => {
                current.push(c);
                in_double_quote = true;
                i += 1;
            }
            b'$' => {
                if let Some(tag) = parse_dollar_tag(bytes, i) {
                    current.extend_from_slice(&tag);
                    i += tag.len();
                    dollar_tag = Some(tag);
                } else {
                    current.push(c);
                    i += 1;
                }
            }
            b';' => {
                push_statement(&mut stmts, &mut current);
                i += 1;
            }
            _ => {
                current.push(c);
                i += 1;
            }
        }
    }

    push_statement(&mut stmts, &mut current);
    stmts
}

fn push_statement(stmts: &mut Vec<String>, current: &mut Vec<u8>) {
    let text = String::from_utf8_lossy(current).trim().to_string();
    if !text.is_empty() {
        stmts.push(text);
    }
    current.clear();
}

/// Parse a dollar-quote opener at position `i`: `$$`, or `$tag$` where tag
/// starts with a letter/underscore and continues with word characters.
fn parse_dollar_tag(bytes: &[u8], i: usize) -> Option<Vec<u8>> {
    if bytes.get(i) != Some(&b'$') {
        return None;
    }
    if bytes.get(i + 1) == Some(&b'$') {
        return Some(b"$$".to_vec());
    }

    let mut j = i + 1;
    match bytes.get(j) {
        Some(&c) if is_tag_start(c) => j += 1,
        _ => return None,
    }
    while let Some(&c) = bytes.get(j) {
        if is_tag_char(c) {
            j += 1;
        } else {
            break;
        }
    }
    if bytes.get(j) == Some(&b'$') {
        return Some(bytes[i..=j].to_vec());
    }
    None
}

fn is_tag_start(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphabetic()
}

fn is_tag_char(c: u8) -> bool {
    is_tag_start(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        let stmts = split_statements("SELECT 1; SELECT 2;");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_trailing_statement_without_semicolon() {
        let stmts = split_statements("SELECT 1;\nSELECT 2");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_empty_fragments_dropped() {
        let stmts = split_statements(" ; ;\n;SELECT 1;");
        assert_eq!(stmts, vec!["SELECT 1"]);
    }

    #[test]
    fn test_semicolon_in_single_quotes() {
        let stmts = split_statements("INSERT INTO t VALUES ('a;b'); SELECT 1;");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "INSERT INTO t VALUES ('a;b')");
    }

    #[test]
    fn test_escaped_single_quote() {
        let stmts = split_statements("SELECT 'it''s; fine'; SELECT 2;");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "SELECT 'it''s; fine'");
    }

    #[test]
    fn test_semicolon_in_double_quoted_identifier() {
        let stmts = split_statements("SELECT \"a;b\" FROM t; SELECT 1;");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_line_comment() {
        let stmts = split_statements("SELECT 1 -- trailing; not a split\n; SELECT 2;");
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("-- trailing; not a split"));
    }

    #[test]
    fn test_nested_block_comment() {
        let stmts =
            split_statements("SELECT 1 /* outer ; /* inner ; */ still outer ; */; SELECT 2;");
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("inner"));
        assert_eq!(stmts[1], "SELECT 2");
    }

    #[test]
    fn test_dollar_quoted_block() {
        let sql = "DO $fn$ BEGIN PERFORM 1; PERFORM 2; END; $fn$; SELECT 1;";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert_eq!(
            stmts[0],
            "DO $fn$ BEGIN PERFORM 1; PERFORM 2; END; $fn$"
        );
        assert_eq!(stmts[1], "SELECT 1");
    }

    #[test]
    fn test_anonymous_dollar_quotes() {
        let sql = "CREATE FUNCTION f() RETURNS int AS $$ SELECT 1; $$ LANGUAGE sql; SELECT 2;";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_dollar_without_tag_is_literal() {
        let stmts = split_statements("SELECT price$ FROM t; SELECT 1;");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_splitter_idempotent_on_rejoin() {
        let inputs = [
            "SELECT 1; SELECT 'a;b'; DO $x$ BEGIN PERFORM 1; END; $x$;",
            "SELECT 1 /* c; /* d; */ e; */; SELECT \"q;\" FROM t",
            "-- top; comment\nSELECT 1;",
        ];
        for input in inputs {
            let once = split_statements(input);
            let rejoined = once.join(";\n");
            let twice = split_statements(&rejoined);
            assert_eq!(once, twice, "splitter not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_parse_dollar_tag() {
        assert_eq!(parse_dollar_tag(b"$$x$$", 0), Some(b"$$".to_vec()));
        assert_eq!(parse_dollar_tag(b"$fn$ body $fn$", 0), Some(b"$fn$".to_vec()));
        assert_eq!(parse_dollar_tag(b"$tag1$", 0), Some(b"$tag1$".to_vec()));
        assert_eq!(parse_dollar_tag(b"$1notag$", 0), None);
        assert_eq!(parse_dollar_tag(b"$ x", 0), None);
        assert_eq!(parse_dollar_tag(b"x$", 0), None);
    }
}

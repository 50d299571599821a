//! Identifier folding and quoting for generated PostgreSQL DDL.
//!
//! Every identifier that ends up in target DDL or DML must be routed through
//! [`quote`] (or [`qualify`]); an unquoted reserved word or mixed-case name
//! produces parse errors or silently case-folded identifiers on the target.

/// PostgreSQL reserved words that must be quoted as identifiers.
///
/// Sorted for binary search.
static PG_RESERVED_WORDS: &[&str] = &[
    "all",
    "analyse",
    "analyze",
    "and",
    "any",
    "array",
    "as",
    "asc",
    "authorization",
    "between",
    "binary",
    "both",
    "case",
    "cast",
    "check",
    "collate",
    "column",
    "constraint",
    "create",
    "cross",
    "current_date",
    "current_role",
    "current_time",
    "current_timestamp",
    "current_user",
    "default",
    "deferrable",
    "desc",
    "distinct",
    "do",
    "else",
    "end",
    "except",
    "false",
    "fetch",
    "for",
    "foreign",
    "freeze",
    "from",
    "full",
    "grant",
    "group",
    "having",
    "ilike",
    "in",
    "initially",
    "inner",
    "intersect",
    "into",
    "is",
    "isnull",
    "join",
    "lateral",
    "leading",
    "left",
    "like",
    "limit",
    "localtime",
    "localtimestamp",
    "natural",
    "not",
    "notnull",
    "null",
    "offset",
    "on",
    "only",
    "or",
    "order",
    "outer",
    "overlaps",
    "placing",
    "primary",
    "references",
    "returning",
    "right",
    "select",
    "session_user",
    "similar",
    "some",
    "symmetric",
    "table",
    "then",
    "to",
    "trailing",
    "true",
    "union",
    "unique",
    "user",
    "using",
    "variadic",
    "verbose",
    "when",
    "where",
    "window",
    "with",
];

/// Fold a source identifier into its target form.
///
/// With `snake_case`, a separator is inserted at lower-or-digit → upper
/// transitions and at the last upper of an uppercase run followed by a
/// lowercase letter, then the whole string is lowercased:
/// `HTMLParser` → `html_parser`, `nameASCII` → `name_ascii`, `IP` → `ip`.
/// Without `snake_case`, the name is simply lowercased.
///
/// Folding is idempotent: `fold(fold(x, s), s) == fold(x, s)`.
pub fn fold(name: &str, snake_case: bool) -> String {
    if !snake_case {
        return name.to_lowercase();
    }

    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        for lc in c.to_lowercase() {
            out.push(lc);
        }
    }
    out
}

/// Quote a target identifier.
///
/// Names consisting only of lowercase ASCII letters and underscores (with
/// digits or `$` allowed after the first character) pass through unquoted
/// unless they are reserved words; everything else is double-quoted with
/// internal double quotes doubled.
pub fn quote(name: &str) -> String {
    if is_safe_unquoted(name) && PG_RESERVED_WORDS.binary_search(&name).is_err() {
        return name.to_string();
    }
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Qualify a table name with its schema, quoting both parts.
pub fn qualify(schema: &str, table: &str) -> String {
    format!("{}.{}", quote(schema), quote(table))
}

fn is_safe_unquoted(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '$' || c.is_ascii_lowercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_snake_case_basic() {
        assert_eq!(fold("UserName", true), "user_name");
        assert_eq!(fold("userId", true), "user_id");
        assert_eq!(fold("user_name", true), "user_name");
        assert_eq!(fold("users", true), "users");
    }

    #[test]
    fn test_fold_acronym_runs() {
        assert_eq!(fold("HTMLParser", true), "html_parser");
        assert_eq!(fold("nameASCII", true), "name_ascii");
        assert_eq!(fold("IP", true), "ip");
        assert_eq!(fold("IPAddress", true), "ip_address");
        assert_eq!(fold("parseHTMLDocument", true), "parse_html_document");
    }

    #[test]
    fn test_fold_digit_boundary() {
        assert_eq!(fold("utf8Name", true), "utf8_name");
        assert_eq!(fold("md5Hash", true), "md5_hash");
    }

    #[test]
    fn test_fold_lowercase_only() {
        assert_eq!(fold("UserName", false), "username");
        assert_eq!(fold("HTMLParser", false), "htmlparser");
    }

    #[test]
    fn test_fold_idempotent() {
        for name in ["HTMLParser", "nameASCII", "user_name", "IP", "utf8Name"] {
            for snake in [true, false] {
                let once = fold(name, snake);
                assert_eq!(fold(&once, snake), once, "fold not idempotent for {name:?}");
            }
        }
    }

    #[test]
    fn test_quote_safe_names_pass_through() {
        assert_eq!(quote("users"), "users");
        assert_eq!(quote("user_name"), "user_name");
        assert_eq!(quote("_private"), "_private");
        assert_eq!(quote("col1"), "col1");
        assert_eq!(quote("pay$"), "pay$");
    }

    #[test]
    fn test_quote_reserved_words() {
        assert_eq!(quote("user"), "\"user\"");
        assert_eq!(quote("order"), "\"order\"");
        assert_eq!(quote("table"), "\"table\"");
        assert_eq!(quote("primary"), "\"primary\"");
    }

    #[test]
    fn test_quote_unsafe_characters() {
        assert_eq!(quote("UserName"), "\"UserName\"");
        assert_eq!(quote("1col"), "\"1col\"");
        assert_eq!(quote("$col"), "\"$col\"");
        assert_eq!(quote("with space"), "\"with space\"");
        assert_eq!(quote("has\"quote"), "\"has\"\"quote\"");
        assert_eq!(quote(""), "\"\"");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("app", "users"), "app.users");
        assert_eq!(qualify("app", "order"), "app.\"order\"");
    }

    #[test]
    fn test_reserved_word_list_is_sorted() {
        let mut sorted = PG_RESERVED_WORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, PG_RESERVED_WORDS);
    }
}

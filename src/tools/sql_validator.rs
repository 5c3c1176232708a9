//! SQL statement classification for read-only enforcement.
//!
//! The `query` tool only runs statements whose leading keyword is not a
//! write keyword. Classification is a keyword scan: leading whitespace and
//! `--` / `/* */` comments are skipped, then the first identifier-like token
//! is compared case-insensitively against [`WRITE_KEYWORDS`]. String literals
//! later in the statement are never inspected, so `SELECT 'INSERT'` is a read.

/// Leading keywords that mark a statement as a write.
pub const WRITE_KEYWORDS: [&str; 12] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "GRANT", "REVOKE",
    "MERGE", "CALL", "EXECUTE",
];

/// Skip leading whitespace and comments.
///
/// Block comments do not nest: the first `*/` closes the comment. An
/// unterminated comment consumes the rest of the input.
fn skip_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = match after.find('\n') {
                Some(pos) => after[pos + 1..].trim_start(),
                None => "",
            };
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = match after.find("*/") {
                Some(pos) => after[pos + 2..].trim_start(),
                None => "",
            };
        } else {
            return rest;
        }
    }
}

/// First keyword of the statement, if any.
pub fn first_keyword(sql: &str) -> Option<&str> {
    let rest = skip_comments(sql);
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let token = &rest[..end];
    (!token.is_empty()).then_some(token)
}

/// True when the statement's first keyword is a write keyword.
///
/// Empty and whitespace-only input is a read.
pub fn is_write_sql(sql: &str) -> bool {
    first_keyword(sql).is_some_and(|keyword| {
        WRITE_KEYWORDS
            .iter()
            .any(|write| write.eq_ignore_ascii_case(keyword))
    })
}

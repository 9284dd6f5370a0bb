//! SQL Validator (C1).
//!
//! Pure function, no I/O: normalizes the statement and checks it against
//! the banned-token / injection-shape / balance rules in `spec.md` §4.1.

use std::sync::OnceLock;

use regex::Regex;

/// Result of [`validate`]: `ok` plus a human-readable reason when rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub ok: bool,
    pub reason: Option<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self { ok: true, reason: None }
    }
    fn reject(reason: impl Into<String>) -> Self {
        Self { ok: false, reason: Some(reason.into()) }
    }
}

const BANNED_TOKENS: &[&str] = &[
    "DROP", "DELETE", "INSERT", "UPDATE", "TRUNCATE", "ALTER", "CREATE", "GRANT", "REVOKE",
    "EXECUTE", "CALL", "SHOW", "DESCRIBE", "EXPLAIN", "HANDLER", "LOAD", "LOCK", "REPLACE",
    "INTO", "VALUES", "SET",
];

const STRICT_ONLY_TOKENS: &[&str] = &["LOAD_FILE", "INTO OUTFILE", "INTO DUMPFILE", "SYSTEM", "EXEC", "EVAL", "SHELL"];

const MAX_LENGTH: usize = 10_000;
const MAX_NESTING_DEPTH: usize = 50;

fn word_regex(token: &str) -> Regex {
    // `INTO OUTFILE` etc. are two words; let any run of whitespace separate
    // them instead of matching the literal single space.
    let parts: Vec<String> = token.split(' ').map(regex::escape).collect();
    Regex::new(&format!(r"(?i)\b{}\b", parts.join(r"\s+"))).unwrap()
}

fn injection_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r";\s*\S").unwrap(),         // `;` followed by another statement
            Regex::new(r"/\*[\s\S]*?\*/").unwrap(), // block comments
            Regex::new(r"--.*\n").unwrap(),         // `--` followed by a newline
            Regex::new(r"(?i)'[^']*'\s*(OR|AND)\s*'?[^=]*=").unwrap(),
            Regex::new(r#"(?i)"[^"]*"\s*(OR|AND)\s*"?[^=]*="#).unwrap(),
        ]
    })
}

/// Normalize whitespace and line endings the way the validator expects:
/// CRLF/CR collapse to `\n`, leading/trailing whitespace trimmed.
fn normalize(sql: &str) -> String {
    sql.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

fn first_token(sql: &str) -> String {
    sql.split(|c: char| c.is_whitespace() || c == '(')
        .find(|s| !s.is_empty())
        .unwrap_or("")
        .to_uppercase()
}

fn balanced_parens(sql: &str) -> bool {
    let mut depth: i32 = 0;
    for c in sql.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

fn max_nesting_depth(sql: &str) -> usize {
    let mut depth: i32 = 0;
    let mut max_depth: i32 = 0;
    for c in sql.chars() {
        match c {
            '(' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            ')' => depth -= 1,
            _ => {}
        }
    }
    max_depth.max(0) as usize
}

fn even_single_quotes(sql: &str) -> bool {
    sql.matches('\'').count() % 2 == 0
}

/// Classify `sql` as safe read-only, or reject it with a reason
/// (`spec.md` §4.1).
pub fn validate(sql: &str, strict: bool) -> ValidationResult {
    let normalized = normalize(sql);
    if normalized.is_empty() {
        return ValidationResult::reject("empty statement");
    }

    let first = first_token(&normalized);
    if first != "SELECT" && first != "WITH" {
        return ValidationResult::reject(format!("statement must start with SELECT or WITH, got '{first}'"));
    }

    for token in BANNED_TOKENS {
        if word_regex(token).is_match(&normalized) {
            return ValidationResult::reject(format!("statement contains banned token '{token}'"));
        }
    }

    for pattern in injection_patterns() {
        if pattern.is_match(&normalized) {
            return ValidationResult::reject("statement matches a known SQL injection shape");
        }
    }

    if !balanced_parens(&normalized) {
        return ValidationResult::reject("unbalanced parentheses");
    }

    if !even_single_quotes(&normalized) {
        return ValidationResult::reject("odd number of single quotes");
    }

    if strict {
        for token in STRICT_ONLY_TOKENS {
            if word_regex(token).is_match(&normalized) {
                return ValidationResult::reject(format!("statement contains banned token '{token}' (strict mode)"));
            }
        }
        if normalized.len() > MAX_LENGTH {
            return ValidationResult::reject(format!("statement exceeds {MAX_LENGTH} characters"));
        }
        if max_nesting_depth(&normalized) > MAX_NESTING_DEPTH {
            return ValidationResult::reject(format!("statement exceeds nesting depth {MAX_NESTING_DEPTH}"));
        }
    }

    ValidationResult::ok()
}

const MIN_LIMIT: u32 = 1;
const MAX_LIMIT: u32 = 10_000;
const DEFAULT_LIMIT: u32 = 100;

/// Clamp `n` to `[1, 10000]`, substituting `100` when absent.
pub fn sanitize_limit(n: Option<u32>) -> u32 {
    match n {
        None => DEFAULT_LIMIT,
        Some(n) => n.clamp(MIN_LIMIT, MAX_LIMIT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mutating_statements() {
        let mutating = [
            "DROP TABLE users",
            "DELETE FROM orders",
            "INSERT INTO t VALUES (1)",
            "UPDATE t SET x = 1",
            "TRUNCATE t",
            "ALTER TABLE t ADD COLUMN x INT",
            "CREATE TABLE t (id INT)",
            "GRANT ALL ON t TO u",
            "REVOKE ALL ON t FROM u",
            "EXECUTE stmt",
            "CALL proc()",
            "SHOW TABLES",
            "DESCRIBE t",
            "EXPLAIN SELECT 1",
        ];
        for sql in mutating {
            assert!(!validate(sql, false).ok, "expected rejection for: {sql}");
        }
    }

    #[test]
    fn accepts_clean_select_and_with() {
        assert!(validate("SELECT * FROM orders WHERE id = 1", false).ok);
        assert!(validate("WITH t AS (SELECT 1) SELECT * FROM t", false).ok);
    }

    #[test]
    fn rejects_stacked_statement() {
        assert!(!validate("SELECT 1; DROP TABLE users", false).ok);
    }

    #[test]
    fn rejects_block_comment() {
        assert!(!validate("SELECT 1 /* comment */", false).ok);
    }

    #[test]
    fn rejects_line_comment_with_newline() {
        assert!(!validate("SELECT 1 -- comment\nFROM t", false).ok);
    }

    #[test]
    fn rejects_or_one_equals_one() {
        assert!(!validate("SELECT * FROM t WHERE name = 'a' OR '1'='1'", false).ok);
    }

    #[test]
    fn rejects_unbalanced_parens() {
        assert!(!validate("SELECT * FROM t WHERE (a = 1", false).ok);
    }

    #[test]
    fn rejects_odd_quote_count() {
        assert!(!validate("SELECT * FROM t WHERE name = 'a", false).ok);
    }

    #[test]
    fn strict_mode_rejects_load_file() {
        assert!(validate("SELECT LOAD_FILE('/etc/passwd')", false).ok);
        assert!(!validate("SELECT LOAD_FILE('/etc/passwd')", true).ok);
    }

    #[test]
    fn strict_mode_rejects_oversized_statement() {
        let sql = format!("SELECT {}", "1+".repeat(6000));
        assert!(!validate(&sql, true).ok);
    }

    #[test]
    fn strict_mode_rejects_deep_nesting() {
        let sql = format!("SELECT {}1{}", "(".repeat(60), ")".repeat(60));
        assert!(!validate(&sql, true).ok);
    }

    #[test]
    fn sanitize_limit_clamps_and_defaults() {
        assert_eq!(sanitize_limit(None), 100);
        assert_eq!(sanitize_limit(Some(0)), 1);
        assert_eq!(sanitize_limit(Some(50_000)), 10_000);
        assert_eq!(sanitize_limit(Some(500)), 500);
    }
}

//! Randomized tests for write-statement classification.
//!
//! Statements are generated with random casing, whitespace and leading
//! comments around a known first keyword, and the classification is checked
//! against the keyword alone.

use mcp_trino::tools::is_write_sql;
use mcp_trino::tools::sql_validator::WRITE_KEYWORDS;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;

const READ_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "SHOW", "DESCRIBE", "EXPLAIN", "VALUES", "TABLE", "USE", "SET",
];

const ITERATIONS: usize = 500;

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn random_case(keyword: &str) -> String {
    let mut rng = rand::thread_rng();
    keyword
        .chars()
        .map(|c| {
            if rng.gen_bool(0.5) {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

fn random_whitespace() -> String {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(0..4);
    (0..len)
        .map(|_| *[" ", "\t", "\n", "\r\n"].choose(&mut rng).unwrap_or(&" "))
        .collect()
}

/// Leading whitespace and comments in random order. Comment bodies never
/// contain the terminator of their own kind.
fn random_prefix() -> String {
    let mut rng = rand::thread_rng();
    let mut prefix = random_whitespace();
    for _ in 0..rng.gen_range(0..3) {
        if rng.gen_bool(0.5) {
            prefix.push_str(&format!("-- {} DROP TABLE x\n", random_string(8)));
        } else {
            prefix.push_str(&format!("/* {} INSERT -- */", random_string(8)));
        }
        prefix.push_str(&random_whitespace());
    }
    prefix
}

fn random_tail() -> String {
    let mut rng = rand::thread_rng();
    let tail = [
        " t VALUES (1)",
        " * FROM users",
        "(1)",
        " 'INSERT INTO x'",
        "\n  FROM orders WHERE note = 'DELETE'",
        ";",
        "",
    ];
    (*tail.choose(&mut rng).unwrap_or(&"")).to_string()
}

#[test]
fn fuzz_write_keywords_are_writes() {
    let mut rng = rand::thread_rng();
    for _ in 0..ITERATIONS {
        let keyword = WRITE_KEYWORDS.choose(&mut rng).unwrap();
        let sql = format!("{}{}{}", random_prefix(), random_case(keyword), random_tail());
        assert!(is_write_sql(&sql), "expected write: {sql:?}");
    }
}

#[test]
fn fuzz_read_keywords_are_reads() {
    let mut rng = rand::thread_rng();
    for _ in 0..ITERATIONS {
        let keyword = READ_KEYWORDS.choose(&mut rng).unwrap();
        let sql = format!("{}{}{}", random_prefix(), random_case(keyword), random_tail());
        assert!(!is_write_sql(&sql), "expected read: {sql:?}");
    }
}

#[test]
fn fuzz_keyword_prefixes_are_not_writes() {
    // A write keyword glued to more identifier characters is another token.
    let mut rng = rand::thread_rng();
    for _ in 0..ITERATIONS {
        let keyword = WRITE_KEYWORDS.choose(&mut rng).unwrap();
        let sql = format!("{}{}_{} x", random_prefix(), keyword, random_string(4));
        assert!(!is_write_sql(&sql), "expected read: {sql:?}");
    }
}

#[test]
fn fuzz_whitespace_only_is_read() {
    for _ in 0..ITERATIONS {
        assert!(!is_write_sql(&random_whitespace()));
    }
}

#[test]
fn fuzz_arbitrary_input_never_panics() {
    let mut rng = rand::thread_rng();
    let pieces = ["--", "/*", "*/", "\n", " ", "'", "\"", "üñí", "\0", "INSERT", ";"];
    for _ in 0..ITERATIONS {
        let len = rng.gen_range(0..12);
        let sql: String = (0..len)
            .map(|_| *pieces.choose(&mut rng).unwrap_or(&" "))
            .collect();
        let _ = is_write_sql(&sql);
        let _ = is_write_sql(&random_string(rng.gen_range(0..64)));
    }
}

#[test]
fn test_literal_keywords_do_not_count() {
    assert!(!is_write_sql("SELECT 'INSERT'"));
    assert!(!is_write_sql("select * from t where op = 'DELETE'"));
    assert!(!is_write_sql("WITH x AS (SELECT 1) SELECT * FROM x"));
}

#[test]
fn test_comments_before_keyword() {
    assert!(is_write_sql("-- cleanup\nDELETE FROM t"));
    assert!(is_write_sql("/* a */ /* b */\n  drop table t"));
    assert!(!is_write_sql("/* DROP TABLE t */ SELECT 1"));
    // Block comments do not nest.
    assert!(!is_write_sql("/* outer /* inner */ SELECT 1"));
    assert!(!is_write_sql("-- only a comment"));
}

#[test]
fn test_call_and_execute_are_writes() {
    assert!(is_write_sql("CALL system.sync_partition_metadata('s', 't', 'ADD')"));
    assert!(is_write_sql("execute stmt USING 1"));
}

#[test]
fn test_empty_is_read() {
    assert!(!is_write_sql(""));
    assert!(!is_write_sql("   \n\t"));
}

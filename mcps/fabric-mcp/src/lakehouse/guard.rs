//! Read-only guard for Lakehouse SQL
//!
//! The SQL endpoint is read-mostly anyway, but a Warehouse reached through
//! the same endpoint is not. In read-only mode every statement must be a
//! query and must not contain a keyword that writes or executes.

use thiserror::Error;

/// Keywords refused anywhere in a read-only batch
const FORBIDDEN: &[&str] = &[
    "INTO", "INSERT", "UPDATE", "DELETE", "MERGE", "DROP", "ALTER", "CREATE", "TRUNCATE", "EXEC",
    "EXECUTE", "GRANT", "REVOKE", "DENY",
];

/// Keywords a read-only statement may start with
const QUERY_STARTS: &[&str] = &["SELECT", "WITH"];

const WRITE_HINT: &str = "Set allow_writes = true under [lakehouse] to enable writes";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("query is empty")]
    Empty,

    #[error("read-only mode: statements must start with SELECT or WITH, found '{0}'. {hint}", hint = WRITE_HINT)]
    NotAQuery(String),

    #[error("read-only mode: '{0}' is not allowed. {hint}", hint = WRITE_HINT)]
    Forbidden(String),
}

/// Check that `sql` only reads
pub fn check_read_only(sql: &str) -> Result<(), GuardError> {
    let statements = statement_keywords(sql);
    if statements.is_empty() {
        return Err(GuardError::Empty);
    }

    for words in &statements {
        let first = &words[0];
        if !QUERY_STARTS.contains(&first.as_str()) {
            return Err(GuardError::NotAQuery(first.clone()));
        }
        if let Some(bad) = words.iter().find(|w| FORBIDDEN.contains(&w.as_str())) {
            return Err(GuardError::Forbidden(bad.clone()));
        }
    }

    Ok(())
}

/// True if `sql` has no words outside comments and literals
pub fn is_blank(sql: &str) -> bool {
    statement_keywords(sql).is_empty()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment(u32),
    Str,
    Bracket,
    Quoted,
}

/// Upper-cased bare words of each non-empty statement
///
/// Skips `--` and (nested) `/* */` comments, `'...'` strings, and `[...]` /
/// `"..."` identifiers so names like `[Update]` never trip the guard.
fn statement_keywords(sql: &str) -> Vec<Vec<String>> {
    let mut statements = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut word = String::new();
    let mut state = State::Code;
    let mut chars = sql.chars().peekable();

    let flush_word = |word: &mut String, current: &mut Vec<String>| {
        if !word.is_empty() {
            current.push(word.to_ascii_uppercase());
            word.clear();
        }
    };

    while let Some(c) = chars.next() {
        match state {
            State::Code => {
                if c.is_ascii_alphanumeric() || c == '_' || c == '@' || c == '#' || c == '$' {
                    word.push(c);
                    continue;
                }
                flush_word(&mut word, &mut current);
                match c {
                    '-' if chars.peek() == Some(&'-') => {
                        chars.next();
                        state = State::LineComment;
                    }
                    '/' if chars.peek() == Some(&'*') => {
                        chars.next();
                        state = State::BlockComment(1);
                    }
                    '\'' => state = State::Str,
                    '[' => state = State::Bracket,
                    '"' => state = State::Quoted,
                    ';' => {
                        if !current.is_empty() {
                            statements.push(std::mem::take(&mut current));
                        }
                    }
                    _ => {}
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment(depth) => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = if depth == 1 { State::Code } else { State::BlockComment(depth - 1) };
                } else if c == '/' && chars.peek() == Some(&'*') {
                    chars.next();
                    state = State::BlockComment(depth + 1);
                }
            }
            State::Str => {
                if c == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                    } else {
                        state = State::Code;
                    }
                }
            }
            State::Bracket => {
                if c == ']' {
                    if chars.peek() == Some(&']') {
                        chars.next();
                    } else {
                        state = State::Code;
                    }
                }
            }
            State::Quoted => {
                if c == '"' {
                    state = State::Code;
                }
            }
        }
    }

    flush_word(&mut word, &mut current);
    if !current.is_empty() {
        statements.push(current);
    }
    statements
}

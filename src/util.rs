//! Small shared helpers: shell-word handling and text utilities.
//!
//! The executor never spawns a shell, so plans are carried as display
//! strings and tokenized here with POSIX-style quoting rules. `shell_quote`
//! mirrors `shlex.quote` semantics: tokens stay bare when safe, otherwise
//! they are single-quoted with embedded quotes escaped.

use regex::Regex;
use std::sync::LazyLock;

/// Characters that never need quoting in a shell word.
static SAFE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_@%+=:,./-]+$").unwrap());

/// Split a command line into words, honoring single/double quotes and
/// backslash escapes. No expansion of any kind is performed.
///
/// Returns an error for unterminated quotes or a trailing bare backslash,
/// so malformed input is rejected instead of silently mis-tokenized.
pub fn shell_split(input: &str) -> anyhow::Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => current.push(inner),
                        None => anyhow::bail!("unterminated single quote"),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            // Inside double quotes, backslash only escapes these.
                            Some(esc @ ('"' | '\\' | '$' | '`')) => current.push(esc),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => anyhow::bail!("unterminated double quote"),
                        },
                        Some(inner) => current.push(inner),
                        None => anyhow::bail!("unterminated double quote"),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(esc) => current.push(esc),
                    None => anyhow::bail!("trailing backslash"),
                }
            }
            other => {
                in_word = true;
                current.push(other);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Quote a single word for display in a command string.
pub fn shell_quote(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }
    if SAFE_TOKEN.is_match(word) {
        return word.to_string();
    }
    let escaped = word.replace('\'', "'\"'\"'");
    format!("'{escaped}'")
}

/// Join tokens into a display command string, quoting each as needed.
pub fn shell_join(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| shell_quote(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rough token count used for routing complexity checks.
///
/// Whole-word count scaled by 0.75, truncated. Deliberately crude: the
/// router only needs a stable relative measure, not tokenizer accuracy.
pub fn estimate_token_count(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words as f64 * 0.75) as usize
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(i, _)| i);
    format!("{}...", &text[..cut])
}

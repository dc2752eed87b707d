//! Identifier tokenization

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

static TERM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid regex"));

/// Keywords of the supported languages plus common English filler.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // keywords
        "and", "as", "assert", "async", "await", "break", "case", "catch", "class", "const",
        "continue", "def", "default", "del", "do", "elif", "else", "enum", "except", "export",
        "extends", "false", "final", "finally", "fn", "for", "from", "func", "function", "global",
        "go", "if", "impl", "import", "in", "interface", "is", "lambda", "let", "loop", "match",
        "mod", "module", "mut", "new", "nil", "none", "nonlocal", "not", "null", "or", "package",
        "pass", "private", "protected", "pub", "public", "raise", "return", "self", "static",
        "struct", "super", "switch", "this", "throw", "trait", "true", "try", "type", "typeof",
        "undefined", "use", "var", "void", "where", "while", "with", "yield", "string", "int",
        "bool", "str", "usize", "u32", "u64", "i32", "i64", "f64", "float", "char", "byte",
        // english
        "the", "that", "with", "this", "from", "have", "are", "was", "were", "been", "but",
        "for", "not", "you", "all", "any", "can", "has", "its", "our", "out", "into", "than",
        "then", "them", "they", "these", "those", "will", "would", "should", "could", "when",
        "which", "who", "why", "how", "what", "there", "here", "also", "only", "more", "some",
        "such", "each", "other", "about", "over", "after", "before", "todo", "fixme", "http",
        "https", "www", "com",
    ]
    .into_iter()
    .collect()
});

/// Lowercased term frequencies of `content`, ignoring stop words and terms
/// shorter than `min_len` characters.
pub fn term_frequencies(content: &str, min_len: usize) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for token in TERM.find_iter(content) {
        let term = token.as_str();
        if term.len() < min_len {
            continue;
        }
        let lowered = term.to_ascii_lowercase();
        if STOP_WORDS.contains(lowered.as_str()) {
            continue;
        }
        *counts.entry(lowered).or_insert(0) += 1;
    }
    counts
}

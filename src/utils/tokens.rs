//! Token estimation

/// Pluggable token counter used for budget accounting only.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Character-based heuristic: one token per four Unicode scalar values,
/// rounded up so that any non-empty text costs at least one token.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Longest prefix of `text` (cut on a line boundary when possible) whose token
/// count is at most `max_tokens`.
pub fn truncate_to_tokens<'a>(
    text: &'a str,
    max_tokens: usize,
    counter: &dyn TokenCounter,
) -> &'a str {
    if counter.count_tokens(text) <= max_tokens {
        return text;
    }

    let boundaries: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let (mut lo, mut hi) = (0usize, boundaries.len() - 1);
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if counter.count_tokens(&text[..boundaries[mid]]) <= max_tokens {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    let prefix = &text[..boundaries[lo]];
    match prefix.rfind('\n') {
        Some(pos) if pos > 0 => &prefix[..=pos],
        _ => prefix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn estimate_counts_chars_not_bytes() {
        assert_eq!(estimate_tokens("日本語の"), 1);
    }

    #[test]
    fn truncate_keeps_text_that_fits() {
        let counter = HeuristicTokenCounter;
        assert_eq!(truncate_to_tokens("short", 10, &counter), "short");
    }

    #[test]
    fn truncate_cuts_on_line_boundary() {
        let counter = HeuristicTokenCounter;
        let text = "line one\nline two\nline three\n";
        let cut = truncate_to_tokens(text, 5, &counter);
        assert_eq!(cut, "line one\nline two\n");
        assert!(counter.count_tokens(cut) <= 5);
    }

    #[test]
    fn truncate_to_zero_is_empty() {
        let counter = HeuristicTokenCounter;
        assert_eq!(truncate_to_tokens("anything", 0, &counter), "");
    }
}

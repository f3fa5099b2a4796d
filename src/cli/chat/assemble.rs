/// Header placed between the user's question and the attached file excerpt.
pub const EXCERPT_SEPARATOR: &str = "\n\nFile content (excerpt):\n";

pub const DEFAULT_MAX_EXCERPT_CHARS: usize = 30_000;

/// How much of an extracted document is sent along with a question.
///
/// The cut is a plain character count, not sentence- or token-aware; it only
/// bounds request size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExcerptPolicy {
    pub max_chars: usize,
}

impl Default for ExcerptPolicy {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_EXCERPT_CHARS,
        }
    }
}

impl ExcerptPolicy {
    pub fn truncate<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.max_chars) {
            Some((end, _)) => &text[..end],
            None => text,
        }
    }
}

/// Combine the user's text with an optional document excerpt into the content
/// of one user message.
pub fn assemble(user_text: &str, excerpt: Option<&str>, policy: ExcerptPolicy) -> String {
    match excerpt {
        Some(text) if !text.is_empty() => {
            let excerpt = policy.truncate(text);
            let mut prompt =
                String::with_capacity(user_text.len() + EXCERPT_SEPARATOR.len() + excerpt.len());
            prompt.push_str(user_text);
            prompt.push_str(EXCERPT_SEPARATOR);
            prompt.push_str(excerpt);
            prompt
        }
        _ => user_text.to_string(),
    }
}

//! Cleanup of raw backend text into a final command string.

const FENCE: &str = "```";

/// Strips surrounding code fences (with or without a language tag) and
/// whitespace.
///
/// Total and idempotent. Empty input yields an empty string, which callers
/// treat as a failed generation.
///
/// ```
/// use shellmate::sanitizer::sanitize;
///
/// assert_eq!(sanitize("```bash\nls -la\n```"), "ls -la");
/// ```
pub fn sanitize(raw: &str) -> String {
    let mut current = raw.trim();
    loop {
        let next = strip_once(current);
        if next == current {
            return next.to_string();
        }
        current = next;
    }
}

/// Language tags a reply may carry on the same line as an inline fence.
const INLINE_TAGS: [&str; 5] = ["bash", "sh", "zsh", "shell", "console"];

fn strip_once(text: &str) -> &str {
    let text = text.trim();
    let text = match text.strip_prefix(FENCE) {
        Some(rest) => strip_opening_tag(rest),
        None => text,
    };
    without_closing_fence(text)
}

/// Drops the tag that may follow an opening fence.
///
/// A first line only counts as a tag when a non-empty body follows it, so a
/// one-word command such as `pwd` is never mistaken for one.
fn strip_opening_tag(rest: &str) -> &str {
    match rest.split_once('\n') {
        Some((first_line, body)) => {
            if is_language_tag(first_line) && !without_closing_fence(body).is_empty() {
                body
            } else {
                rest
            }
        }
        None => match rest.trim_start().split_once(char::is_whitespace) {
            Some((word, command)) if INLINE_TAGS.contains(&word) => command,
            _ => rest,
        },
    }
}

fn without_closing_fence(text: &str) -> &str {
    let text = text.trim();
    text.strip_suffix(FENCE).unwrap_or(text).trim()
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '.' | '#'))
}

//! Common utilities for providers

/// Minimum key length to display partial key
const MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY: usize = 8;

/// Number of characters to show at start/end of masked key
const KEY_MASK_VISIBLE_CHARS: usize = 4;

/// Longest provider message kept in an error
const MAX_ERROR_LEN: usize = 300;

/// Prefixes of provider credentials (OpenAI keys, Replicate tokens)
const SECRET_PREFIXES: &[&str] = &["sk-", "r8_"];

/// Mask API key for safe display in logs
///
/// Shows first 4 and last 4 characters for keys longer than 8 characters,
/// otherwise shows "****".
///
/// # Examples
/// ```
/// use muse_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("sk-1234567890abcdef"), "sk-1...cdef");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY || !key.is_ascii() {
        return "****".to_string();
    }
    format!(
        "{}...{}",
        &key[..KEY_MASK_VISIBLE_CHARS],
        &key[key.len() - KEY_MASK_VISIBLE_CHARS..]
    )
}

/// Redact credentials from a provider error message before it is stored in an error value
///
/// Words that look like provider keys are masked with [`mask_api_key`]; the rest of the
/// message is kept verbatim so server logs carry the provider's detail. Long messages are
/// truncated.
///
/// # Examples
/// ```
/// use muse_llm::util::redact_secrets;
/// assert_eq!(
///     redact_secrets("Incorrect API key provided: sk-1234567890abcdef."),
///     "Incorrect API key provided: sk-1...cdef."
/// );
/// assert_eq!(redact_secrets("Connection timeout"), "Connection timeout");
/// ```
#[must_use]
pub fn redact_secrets(message: &str) -> String {
    let truncated = message.len() > MAX_ERROR_LEN;
    let message = truncate_safe(message, MAX_ERROR_LEN);

    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while !rest.is_empty() {
        let word_end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '\'' | '"' | '(' | ')'))
            .unwrap_or(rest.len());
        let (word, tail) = rest.split_at(word_end);
        // Keep trailing sentence punctuation outside the mask
        let key_len = word.trim_end_matches(['.', ':']).len();
        let (key, punct) = word.split_at(key_len);
        if SECRET_PREFIXES.iter().any(|prefix| key.starts_with(prefix)) {
            out.push_str(&mask_api_key(key));
        } else {
            out.push_str(key);
        }
        out.push_str(punct);

        let sep_len = tail.chars().next().map_or(0, char::len_utf8);
        out.push_str(&tail[..sep_len]);
        rest = &tail[sep_len..];
    }

    if truncated {
        out.push_str("...(truncated)");
    }
    out
}

/// Truncate to at most `max` bytes without splitting a UTF-8 character
#[must_use]
pub fn truncate_safe(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

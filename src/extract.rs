//! Recovery of structured payloads from free-form classifier text
//!
//! Generated answers often wrap the JSON we asked for in prose, code fences or
//! stray control characters. Every classifier-backed stage goes through this
//! module instead of parsing the raw response directly.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no '{0}' found in text")]
    NotFound(char),

    #[error("'{open}' opened at byte {start} is never closed by a matching '{close}'")]
    Unbalanced {
        open: char,
        close: char,
        start: usize,
    },
}

/// Drops every character below U+0020 except newline, carriage return and tab.
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| c as u32 >= 32 || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Returns the first balanced `open`..`close` span of `text`, after control
/// characters have been stripped.
pub fn extract(text: &str, open: char, close: char) -> Result<String, ExtractError> {
    let cleaned = strip_control_chars(text);

    let start = cleaned.find(open).ok_or(ExtractError::NotFound(open))?;

    let mut depth: usize = 0;
    for (offset, c) in cleaned[start..].char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                let end = start + offset + c.len_utf8();
                return Ok(cleaned[start..end].to_string());
            }
        }
    }

    Err(ExtractError::Unbalanced { open, close, start })
}

pub fn extract_object(text: &str) -> Result<String, ExtractError> {
    extract(text, '{', '}')
}

pub fn extract_array(text: &str) -> Result<String, ExtractError> {
    extract(text, '[', ']')
}

/// Unwraps a fenced block. A ```` ```mermaid ```` fence wins over a bare
/// ```` ``` ```` fence; text without fences is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(idx) = trimmed.find("```mermaid") {
        let after = &trimmed[idx + "```mermaid".len()..];
        let body = after.find("```").map_or(after, |end| &after[..end]);
        return body.trim();
    }

    if let Some(idx) = trimmed.find("```") {
        let after = &trimmed[idx + 3..];
        let body = after.find("```").map_or(after, |end| &after[..end]);
        return body.trim();
    }

    trimmed
}

/// First `max_chars` characters of `content`, control characters removed.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    let end = content
        .char_indices()
        .nth(max_chars)
        .map_or(content.len(), |(idx, _)| idx);
    strip_control_chars(&content[..end])
}

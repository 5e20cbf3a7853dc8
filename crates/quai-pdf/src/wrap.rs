//! Text wrapping against real glyph metrics.
//!
//! Two flavours, matching the two places the credential wraps text:
//!
//! - [`wrap_words`] — greedy wrap at word boundaries for label/value
//!   rows. A line never exceeds the column width unless it consists of a
//!   single unbreakable token wider than the column.
//! - [`wrap_chars`] — character-level wrap for the free-text message
//!   box, so even unbroken long tokens break. Explicit newlines are
//!   honoured. A line is flushed once it crosses the limit, so it may
//!   exceed the column by up to one glyph; the box around it carries
//!   enough horizontal padding to absorb that.

use crate::metrics::text_width;

/// Greedy word wrap: words are appended to the current line while the
/// rendered width stays within `max_width`; on overflow the line is
/// flushed and the overflowing word starts the next one.
pub fn wrap_words(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if text_width(&candidate, size) > max_width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Character-level wrap for the message box. Breaks on explicit `\n`
/// and whenever the accumulated line crosses `max_width`.
pub fn wrap_chars(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c == '\n' {
            lines.push(std::mem::take(&mut current));
            continue;
        }
        current.push(c);
        if text_width(&current, size) > max_width {
            lines.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

//! Input normalization.
//!
//! Folds typographic quotes to ASCII, unifies line endings, collapses runs of
//! horizontal whitespace and trims the ends. Dashes are left alone; clause
//! scoping relies on them. The character clamp is applied while scanning, so
//! the raw input is never read past the first `max_chars` kept characters.

/// Normalize `raw` and clamp it to at most `max_chars` characters.
///
/// Returns the text and whether the clamp cut anything.
pub(crate) fn normalize_and_clamp(raw: &str, max_chars: usize) -> (String, bool) {
    let mut out = String::with_capacity(raw.len().min(max_chars.saturating_mul(4)));
    let mut kept = 0usize;
    let mut pending_space = false;
    let mut pending_newlines = 0usize;
    let mut truncated = false;

    let mut chars = raw.chars().peekable();
    'scan: while let Some(c) = chars.next() {
        let c = match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    continue;
                }
                '\n'
            }
            other => other,
        };

        if c == '\n' {
            // Spaces pending before a newline are dropped.
            pending_space = false;
            pending_newlines += 1;
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }

        // Separators are only written once content follows, which trims both ends.
        if !out.is_empty() {
            let separators = if pending_newlines > 0 { pending_newlines } else { usize::from(pending_space) };
            let sep = if pending_newlines > 0 { '\n' } else { ' ' };
            for _ in 0..separators {
                if kept == max_chars {
                    truncated = true;
                    break 'scan;
                }
                out.push(sep);
                kept += 1;
            }
        }
        pending_space = false;
        pending_newlines = 0;

        if kept == max_chars {
            truncated = true;
            break;
        }
        out.push(c);
        kept += 1;
    }

    out.truncate(out.trim_end().len());
    (out, truncated)
}

//! Text normalization for PDF-pasted input.
//!
//! Text pasted from PDF readers arrives with hard line-breaks in the middle
//! of sentences and typographic punctuation variants (curly quotes, em
//! dashes, ellipsis characters). This module collapses those line-wraps into
//! flowing paragraphs and normalizes the punctuation to ASCII.
//!
//! Normalization is total: no input can make it fail, and running it on its
//! own output is a no-op.

/// Punctuation that marks a line as sentence-final.
///
/// A line ending in one of these keeps its hard line-break; any other
/// mid-paragraph break is collapsed to a single space.
const TERMINAL_PUNCTUATION: &[char] = &['.', ':', ';', '?', '!'];

/// Replace typographic punctuation variants with ASCII equivalents.
///
/// Applied before line-join logic so terminal-punctuation checks and all
/// downstream matching see straight quotes and plain hyphens.
///
/// # Examples
///
/// ```
/// use taxotype::normalize::substitute_typographic;
///
/// assert_eq!(substitute_typographic("\u{2018}ok\u{2019} \u{2014} fine\u{2026}"), "'ok' - fine...");
/// ```
pub fn substitute_typographic(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Collapse PDF line-wraps into flowing paragraphs.
///
/// Lines are trimmed and joined with a single space, except:
/// - a blank line maps to a literal newline (paragraph break),
/// - a line already ending in sentence-final punctuation (`.` `:` `;` `?`
///   `!`) keeps its hard line-break,
/// - a line followed by a blank line keeps its hard line-break.
///
/// Typographic substitution runs first, so a line ending in a curly-quoted
/// period is still recognized as sentence-final.
///
/// Empty input yields empty output. The function is idempotent: every
/// newline in the output is either after terminal punctuation or adjacent
/// to a paragraph break, so a second pass re-joins nothing.
///
/// # Examples
///
/// ```
/// use taxotype::normalize::clean_text;
///
/// let pasted = "Escherichia coli is a common\nbacterium found in the gut.";
/// assert_eq!(clean_text(pasted), "Escherichia coli is a common bacterium found in the gut.");
/// ```
pub fn clean_text(text: &str) -> String {
    let text = substitute_typographic(text);
    let lines: Vec<&str> = text.lines().collect();
    let mut out = String::with_capacity(text.len());

    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim();
        if stripped.is_empty() {
            out.push('\n');
            continue;
        }
        out.push_str(stripped);
        if i + 1 >= lines.len() {
            continue;
        }
        let next_blank = lines[i + 1].trim().is_empty();
        let sentence_final = stripped.ends_with(TERMINAL_PUNCTUATION);
        if next_blank || sentence_final {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }
    out
}

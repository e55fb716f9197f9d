//! RTF encoding of plain text with italic spans.
//!
//! Produces a minimal complete RTF document that renders the designated
//! char-offset intervals in italics and is otherwise visually identical to
//! the plain text. Escaping rules, in order: typographic punctuation is
//! normalized to ASCII, `\` `{` `}` are backslash-escaped, newlines become
//! `\par`, and characters outside the 7-bit printable range are emitted as
//! `\uN?` escapes (with surrogate pairs for astral-plane chars).
//!
//! Span bounds outside the text, inverted spans, or overlapping spans are
//! internal-consistency errors (a detector bug) and fail loudly rather than
//! emit malformed output. Zero-length spans are skipped.

use crate::detect::Span;
use crate::error::{Error, Result};

/// Escape a single char into the RTF body.
fn push_escaped(out: &mut String, c: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '{' => out.push_str("\\{"),
        '}' => out.push_str("\\}"),
        // Trailing space delimits the control word; readers do not render it.
        '\n' => out.push_str("\\par \n"),
        '\t' => out.push_str("\\tab "),
        '\u{2018}' | '\u{2019}' => out.push('\''),
        '\u{201C}' | '\u{201D}' => out.push('"'),
        '\u{2013}' | '\u{2014}' => out.push('-'),
        '\u{2026}' => out.push_str("..."),
        '\u{00A0}' => out.push(' '),
        c if (' '..='~').contains(&c) => out.push(c),
        c => {
            // \uN takes a signed 16-bit decimal; astral-plane chars become a
            // UTF-16 surrogate pair. The '?' is the fallback for old readers.
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let n = *unit as i32;
                let n = if n > 32767 { n - 65536 } else { n };
                out.push_str(&format!("\\u{}?", n));
            }
        },
    }
}

/// Validate span ordering, bounds, and disjointness against a text length.
fn validate_spans(spans: &[Span], len: usize) -> Result<()> {
    let mut prev_end = 0usize;
    for span in spans {
        if span.end < span.start || span.end > len {
            return Err(Error::SpanOutOfBounds {
                start: span.start,
                end: span.end,
                len,
            });
        }
        if span.start < prev_end {
            return Err(Error::SpanOverlap {
                prev_end,
                start: span.start,
            });
        }
        prev_end = span.end;
    }
    Ok(())
}

/// Encode plain text and italic intervals as a complete RTF document.
///
/// Spans must be sorted ascending by start, non-overlapping, and within
/// `[0, char_len]`; violations return an error rather than malformed output.
///
/// # Examples
///
/// ```
/// use taxotype::detect::Span;
/// use taxotype::rtf::encode_rtf;
///
/// let rtf = encode_rtf("Escherichia coli here", &[Span::new(0, 16)]).unwrap();
/// assert_eq!(rtf, "{\\rtf1\\ansi \\i Escherichia coli\\i0  here}");
/// ```
pub fn encode_rtf(text: &str, spans: &[Span]) -> Result<String> {
    let chars: Vec<char> = text.chars().collect();
    validate_spans(spans, chars.len())?;

    // Zero-length spans would emit paired toggles with nothing between.
    let spans: Vec<Span> = spans.iter().copied().filter(|s| s.start < s.end).collect();

    let mut out = String::with_capacity(text.len() + 16 + spans.len() * 8);
    out.push_str("{\\rtf1\\ansi ");

    let mut si = 0;
    for (i, &c) in chars.iter().enumerate() {
        if si < spans.len() && i == spans[si].end {
            out.push_str("\\i0 ");
            si += 1;
        }
        if si < spans.len() && i == spans[si].start {
            out.push_str("\\i ");
        }
        push_escaped(&mut out, c);
    }
    if si < spans.len() && spans[si].end == chars.len() {
        out.push_str("\\i0 ");
    }

    out.push('}');
    Ok(out)
}

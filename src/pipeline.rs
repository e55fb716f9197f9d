//! High-level transformation surface.
//!
//! One pure function from raw pasted text to the two output artifacts
//! (plain text and RTF) plus the italic intervals for preview. Clipboard
//! and display integration belong to the caller.

use crate::detect::{detect_spans, Span};
use crate::error::Result;
use crate::normalize::clean_text;
use crate::registry::SharedRegistry;
use crate::rtf::encode_rtf;
use serde::Serialize;

/// Transformation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Reflow and punctuation cleanup only
    Clean,
    /// Reflow plus taxon-name italic detection
    Taxon,
}

/// The two output artifacts and the preview intervals.
#[derive(Debug, Clone, Serialize)]
pub struct Output {
    /// Cleaned plain text (the plain-text clipboard fallback)
    pub plain: String,
    /// Complete RTF document with italics applied
    pub rtf: String,
    /// Italic intervals over `plain`, in char offsets
    pub spans: Vec<Span>,
}

/// Transform raw pasted text into plain text and RTF.
///
/// Normalizes line-wraps and punctuation, then in [`Mode::Taxon`] detects
/// italic spans against the registry's current snapshot (never waiting on an
/// in-flight update). The RTF document is produced either way; in
/// [`Mode::Clean`] it simply carries no italics.
///
/// # Examples
///
/// ```
/// use taxotype::{transform, Mode, SharedRegistry};
///
/// let registry = SharedRegistry::default();
/// let out = transform("wrapped\nline.", Mode::Clean, &registry).unwrap();
/// assert_eq!(out.plain, "wrapped line.");
/// assert!(out.spans.is_empty());
/// ```
pub fn transform(raw: &str, mode: Mode, registry: &SharedRegistry) -> Result<Output> {
    let plain = clean_text(raw);
    let spans = match mode {
        Mode::Clean => Vec::new(),
        Mode::Taxon => detect_spans(&plain, &registry.snapshot()).spans,
    };
    let rtf = encode_rtf(&plain, &spans)?;
    Ok(Output { plain, rtf, spans })
}

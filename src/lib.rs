//! # taxotype
//!
//! Reflow text pasted from PDF readers and italicize biological taxon names,
//! producing clean plain text and a byte-exact RTF document for rich-text
//! paste into word processors.
//!
//! ## Pipeline
//!
//! raw text → [`normalize`] → plain text → [`detect`] (against a
//! [`registry::TaxonRegistry`]) → italic intervals → [`rtf`] → RTF document.
//! [`transform`] wires the whole pipeline as one pure function; display and
//! clipboard integration are the caller's concern.
//!
//! The registry loads once from a per-user list file (seed fallback) and is
//! refreshed by the [`update`] pipeline, which swaps in a fully built
//! replacement atomically — readers never observe a partial set.
//!
//! ## Quick Start
//!
//! ```
//! use taxotype::{transform, Mode, SharedRegistry};
//!
//! let registry = SharedRegistry::default();
//! let out = transform(
//!     "Escherichia coli is a common\nbacterium found in the gut.",
//!     Mode::Taxon,
//!     &registry,
//! )?;
//! assert_eq!(out.plain, "Escherichia coli is a common bacterium found in the gut.");
//! # Ok::<(), taxotype::Error>(())
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Text normalization
pub mod normalize;

// Taxon name sets
pub mod registry;

// Italic span detection
pub mod detect;

// RTF encoding
pub mod rtf;

// Taxonomy update pipeline
pub mod update;

// High-level surface
pub mod pipeline;

// Re-exports
pub use detect::{detect_spans, MarkedText, Span};
pub use error::{Error, Result, UpdateStage};
pub use pipeline::{transform, Mode, Output};
pub use registry::{SharedRegistry, TaxonRegistry};
pub use update::{NcbiTaxdumpSource, UpdateHandle, UpdateOutcome, UpdateSource, Updater};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "taxotype");
    }
}

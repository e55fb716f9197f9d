//! Curated taxon-name sets and their shared, atomically swappable handle.
//!
//! The registry holds two derived sets: genus names (single capitalized
//! tokens) and binomials ("Genus epithet" pairs). It is built once at
//! startup from a persisted newline-delimited list file, falling back to a
//! small built-in seed set when the file is missing or unreadable, and is
//! replaced wholesale by a successful taxonomy update.
//!
//! Readers take an [`Arc`] snapshot via [`SharedRegistry::snapshot`]; an
//! in-flight update can never expose a partially built set.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

lazy_static! {
    /// Full-match shape for a valid taxon name: a genus token, optionally
    /// followed by a lowercase species epithet.
    static ref RE_TAXON_NAME: Regex =
        Regex::new(r"^[A-Z][a-z]{2,}(?: [a-z][a-z-]{2,})?$").unwrap();

    /// Common capitalized English words that must never be treated as genus
    /// names, even when an identically spelled registry entry exists.
    static ref STOPWORDS: HashSet<&'static str> = [
        "A", "An", "The", "This", "That", "These", "Those", "It", "Its", "They", "Their",
        "We", "Our", "In", "On", "At", "From", "To", "For", "With", "By", "As", "Of",
        "And", "Or", "But", "If", "When", "Although", "While", "Beyond", "During",
        "Before", "After", "Within", "Between", "Because", "Bayesian", "Naive",
        "KernelExplainer", "SHAP", "Fig",
    ]
    .into_iter()
    .collect();
}

/// Word endings indicating family/order/higher taxonomic rank.
///
/// Words with these suffixes are never genus candidates regardless of shape.
pub const FAMILY_SUFFIXES: &[&str] = &[
    "aceae", "idae", "viridae", "mycetes", "phyceae", "mycotina", "opsida", "ales",
];

/// Built-in seed genera, available even without a persisted list file.
const SEED_GENERA: &[&str] = &[
    "Escherichia",
    "Bacillus",
    "Methanothrix",
    "Methanocorpusculum",
    "Sphingobium",
];

/// Check whether a word is a capitalized stopword.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Check whether a word carries a family/order rank suffix.
pub fn has_family_suffix(word: &str) -> bool {
    FAMILY_SUFFIXES.iter().any(|s| word.ends_with(s))
}

/// Validate a candidate name against the taxon-name shape invariant.
///
/// Curly quotes are straightened first (the upstream taxonomy dataset quotes
/// some provisional names). Multi-word entries whose first token is a
/// stopword are rejected outright.
pub fn is_valid_taxon_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let name = name
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"");
    if let Some((first, _)) = name.split_once(' ') {
        if is_stopword(first) {
            return false;
        }
    }
    RE_TAXON_NAME.is_match(&name)
}

/// The genus and binomial name sets used by the span detector.
///
/// Read-only during text processing; constructed via [`TaxonRegistry::load`]
/// or [`TaxonRegistry::from_names`] and swapped wholesale on update.
#[derive(Debug, Clone, Default)]
pub struct TaxonRegistry {
    pub(crate) genera: HashSet<String>,
    pub(crate) binomials: HashSet<String>,
}

impl TaxonRegistry {
    /// Build the seed-only registry.
    pub fn seed() -> Self {
        let mut reg = Self::default();
        for g in SEED_GENERA {
            reg.genera.insert((*g).to_string());
        }
        reg
    }

    /// Build a registry from an iterator of candidate names, merged with the
    /// seed set.
    ///
    /// Each valid name contributes its first token to the genus set (unless
    /// that token is a stopword) and, when two tokens are present, the
    /// space-joined pair to the binomial set. Invalid entries are skipped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut reg = Self::seed();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || !is_valid_taxon_name(name) {
                continue;
            }
            let mut tokens = name.split_whitespace();
            if let Some(genus) = tokens.next() {
                if !is_stopword(genus) {
                    reg.genera.insert(genus.to_string());
                }
                if let Some(epithet) = tokens.next() {
                    reg.binomials.insert(format!("{} {}", genus, epithet));
                }
            }
        }
        reg
    }

    /// Load the registry from a newline-delimited list file.
    ///
    /// A missing or unreadable file silently yields the seed-only registry;
    /// load failure is never surfaced to the processing path.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let reg = Self::from_names(contents.lines());
                log::debug!(
                    "Loaded taxonomy from {}: {} genera, {} binomials",
                    path.display(),
                    reg.genus_count(),
                    reg.binomial_count()
                );
                reg
            },
            Err(e) => {
                log::debug!(
                    "No taxonomy list at {} ({}), using seed set",
                    path.display(),
                    e
                );
                Self::seed()
            },
        }
    }

    /// Load the registry from the default per-user list location.
    pub fn load() -> Self {
        Self::load_from(&default_list_path())
    }

    /// Check genus-set membership.
    pub fn contains_genus(&self, word: &str) -> bool {
        self.genera.contains(word)
    }

    /// Check binomial-set membership of a space-joined "Genus epithet" pair.
    pub fn contains_binomial(&self, pair: &str) -> bool {
        self.binomials.contains(pair)
    }

    /// Number of known genera.
    pub fn genus_count(&self) -> usize {
        self.genera.len()
    }

    /// Number of known binomials.
    pub fn binomial_count(&self) -> usize {
        self.binomials.len()
    }
}

/// Default location of the persisted name list: the per-user application
/// data directory plus `taxotype/taxon_list.txt`.
pub fn default_list_path() -> PathBuf {
    let base = std::env::var_os("TAXOTYPE_DATA_DIR")
        .or_else(|| std::env::var_os("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("APPDATA")
                .map(PathBuf::from)
                .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
        })
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("taxotype").join("taxon_list.txt")
}

/// Cheaply clonable handle to the current registry.
///
/// Readers call [`snapshot`](Self::snapshot) and keep processing against a
/// stable `Arc` even while an update swaps in a replacement. The update path
/// is the sole writer and calls [`replace`](Self::replace) only after the
/// replacement is fully built.
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Arc<TaxonRegistry>>>,
}

impl SharedRegistry {
    /// Wrap an initial registry.
    pub fn new(registry: TaxonRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    /// Current registry snapshot. Never blocks on an in-flight update.
    pub fn snapshot(&self) -> Arc<TaxonRegistry> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a fully built replacement registry.
    pub fn replace(&self, registry: TaxonRegistry) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(registry);
    }
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::new(TaxonRegistry::seed())
    }
}

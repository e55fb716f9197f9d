//! Italic span detection for taxon names.
//!
//! Scans normalized text token by token and marks genus names and binomial
//! pairs for italicization, producing non-overlapping char-offset intervals
//! over the unchanged plain text.
//!
//! Checks apply in a fixed precedence order: stopword, then family/order
//! suffix, then registry membership. A capitalized stopword is never
//! italicized even when an identically spelled genus entry exists, and a
//! family-suffixed word is never italicized regardless of shape.
//!
//! A genus token followed by an epithet-shaped token is marked as one
//! binomial interval only when the pair is in the binomial set and the
//! following token is not a grammatical continuation word ("Aquaspirillum
//! was" stays genus-only; a binomial is never guessed across a
//! verb/conjunction boundary).

use crate::registry::{has_family_suffix, is_stopword, TaxonRegistry};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

lazy_static! {
    /// Shape of a lowercase species epithet.
    static ref RE_EPITHET: Regex = Regex::new(r"^[a-z][a-z-]{2,}$").unwrap();

    /// Words after a genus token that suppress a binomial guess: auxiliary
    /// verbs, conjunctions, common prepositions, and taxonomic rank nouns.
    static ref CONTINUATION_WORDS: HashSet<&'static str> = [
        // auxiliaries
        "was", "is", "are", "were", "be", "been", "being", "has", "have", "had",
        "can", "could", "may", "might", "must", "shall", "should", "will", "would",
        "do", "does", "did",
        // conjunctions
        "and", "or", "but", "nor", "so", "yet",
        // prepositions
        "in", "on", "at", "of", "to", "by", "as", "for", "with", "from", "into",
        "onto", "over", "under", "between", "within", "during",
        // rank nouns
        "family", "genus", "species", "strain", "subspecies", "serovar", "biovar",
        "clade", "taxon", "group",
    ]
    .into_iter()
    .collect();
}

/// Half-open `[start, end)` char-offset interval marking an italic span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    /// First char of the span
    pub start: usize,
    /// One past the last char of the span
    pub end: usize,
}

impl Span {
    /// Create a span over `start..end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Plain text paired with its ordered, non-overlapping italic spans.
///
/// The detector's output contract: `text` is the input unchanged, and every
/// span is in bounds, sorted ascending by start, and disjoint.
#[derive(Debug, Clone)]
pub struct MarkedText {
    /// The plain text (unchanged from the detector's input)
    pub text: String,
    /// Italic intervals in char offsets
    pub spans: Vec<Span>,
}

/// A whitespace-delimited token with its alphabetic core located by char
/// offset. Leading and trailing punctuation stay outside the core; internal
/// hyphens stay inside.
struct Token {
    core_start: usize,
    core_end: usize,
    core: String,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().enumerate().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut raw = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            raw.push(c);
            chars.next();
        }
        // Locate the alphabetic core within the raw token.
        let token_chars: Vec<char> = raw.chars().collect();
        let first = token_chars.iter().position(|c| c.is_alphabetic());
        let last = token_chars.iter().rposition(|c| c.is_alphabetic());
        if let (Some(first), Some(last)) = (first, last) {
            tokens.push(Token {
                core_start: start + first,
                core_end: start + last + 1,
                core: token_chars[first..=last].iter().collect(),
            });
        }
    }
    tokens
}

/// Check whether a token core can follow a genus as a species epithet.
fn is_epithet_candidate(core: &str) -> bool {
    RE_EPITHET.is_match(core) && !CONTINUATION_WORDS.contains(core)
}

/// Detect italic spans over normalized text.
///
/// The input text is returned unchanged; original spacing is preserved by
/// construction. Degrades gracefully on empty input, control characters, and
/// texts with no matches.
///
/// # Examples
///
/// ```
/// use taxotype::detect::detect_spans;
/// use taxotype::registry::TaxonRegistry;
///
/// let registry = TaxonRegistry::from_names(["Escherichia coli"]);
/// let marked = detect_spans("Escherichia coli in the gut.", &registry);
/// assert_eq!(marked.spans.len(), 1);
/// assert_eq!(&marked.text[0..16], "Escherichia coli");
/// ```
pub fn detect_spans(text: &str, registry: &TaxonRegistry) -> MarkedText {
    let tokens = tokenize(text);
    let mut spans: Vec<Span> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];

        // Precedence: stopword, then family suffix, then registry membership.
        if is_stopword(&token.core)
            || has_family_suffix(&token.core)
            || !registry.contains_genus(&token.core)
        {
            i += 1;
            continue;
        }

        if let Some(next) = tokens.get(i + 1) {
            if is_epithet_candidate(&next.core) {
                let pair = format!("{} {}", token.core, next.core);
                if registry.contains_binomial(&pair) {
                    spans.push(Span::new(token.core_start, next.core_end));
                    i += 2;
                    continue;
                }
            }
        }

        spans.push(Span::new(token.core_start, token.core_end));
        i += 1;
    }

    debug_assert!(spans.windows(2).all(|w| w[0].end <= w[1].start));
    MarkedText {
        text: text.to_string(),
        spans,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TaxonRegistry {
        TaxonRegistry::from_names([
            "Escherichia coli",
            "Aquaspirillum",
            "Bacillus subtilis",
            "Vibrio",
        ])
    }

    fn marked_strs(marked: &MarkedText) -> Vec<String> {
        let chars: Vec<char> = marked.text.chars().collect();
        marked
            .spans
            .iter()
            .map(|s| chars[s.start..s.end].iter().collect())
            .collect()
    }

    #[test]
    fn test_binomial_is_one_interval() {
        let marked = detect_spans("Escherichia coli is common.", &registry());
        assert_eq!(marked_strs(&marked), vec!["Escherichia coli"]);
    }

    #[test]
    fn test_genus_only() {
        let marked = detect_spans("Cultures of Vibrio grew overnight.", &registry());
        assert_eq!(marked_strs(&marked), vec!["Vibrio"]);
    }

    #[test]
    fn test_continuation_word_tie_break() {
        // "was" is epithet-shaped but a continuation word: genus-only wins.
        let marked = detect_spans("Aquaspirillum was isolated.", &registry());
        assert_eq!(marked_strs(&marked), vec!["Aquaspirillum"]);
    }

    #[test]
    fn test_unknown_pair_falls_back_to_genus() {
        // Next token looks like an epithet but the pair is not a known binomial.
        let marked = detect_spans("Vibrio cultures were dense.", &registry());
        assert_eq!(marked_strs(&marked), vec!["Vibrio"]);
    }

    #[test]
    fn test_stopword_never_italicized_even_with_colliding_entry() {
        // Registry building refuses stopwords, so inject the collision
        // directly: "The" is shape-valid and present in the genus set, but
        // the stopword check takes precedence over membership.
        let mut reg = registry();
        reg.genera.insert("The".to_string());
        let marked = detect_spans("The Vibrio samples.", &reg);
        assert_eq!(marked_strs(&marked), vec!["Vibrio"]);
    }

    #[test]
    fn test_family_suffix_never_italicized() {
        // Even if present in the genus set, a family-suffixed word is skipped.
        let reg = TaxonRegistry::from_names(["Enterobacteriaceae"]);
        let marked = detect_spans("Members of Enterobacteriaceae vary.", &reg);
        assert!(marked.spans.is_empty());
    }

    #[test]
    fn test_punctuation_stays_outside_span() {
        let marked = detect_spans("(Escherichia coli), notably.", &registry());
        assert_eq!(marked_strs(&marked), vec!["Escherichia coli"]);
        assert_eq!(marked.spans[0].start, 1);
    }

    #[test]
    fn test_repeated_genus_names() {
        let marked = detect_spans("Vibrio, Vibrio, Vibrio", &registry());
        assert_eq!(marked.spans.len(), 3);
        for w in marked.spans.windows(2) {
            assert!(w[0].end <= w[1].start);
        }
    }

    #[test]
    fn test_empty_and_unmatched_input() {
        assert!(detect_spans("", &registry()).spans.is_empty());
        assert!(detect_spans("no taxa here at all", &registry())
            .spans
            .is_empty());
        assert!(detect_spans("\u{1}\u{2}\u{3}", &registry()).spans.is_empty());
    }

    #[test]
    fn test_text_unchanged() {
        let input = "Escherichia  coli   spaced oddly.";
        let marked = detect_spans(input, &registry());
        assert_eq!(marked.text, input);
    }

    #[test]
    fn test_spacing_preserved_binomial_across_double_space() {
        // Tokens separated by two spaces still pair up; the span covers both
        // cores and the gap between them.
        let marked = detect_spans("Escherichia  coli here.", &registry());
        assert_eq!(marked_strs(&marked), vec!["Escherichia  coli"]);
    }
}

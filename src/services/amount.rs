//! Inference of a receipt total from noisy OCR text.
//!
//! Recognized text is normalized so that `1,234.56` and `1 234.56` read the
//! same, every money-looking token is collected, and an [`AmountStrategy`]
//! picks the total. The default strategy takes the largest value.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Commas and whitespace runs used as thousands separators.
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\s]+").unwrap());

/// Grouped thousands with cents, bare two-decimal values, grouped thousands
/// without cents. Alternatives are tried in that order at each position.
static MONEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{1,3}(?: \d{3})*\.\d{2}|\d+\.\d{2}|\d{1,3}(?: \d{3})+)\b").unwrap()
});

static TOTAL_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btotal\b").unwrap());

/// How many characters before a candidate may hold its label.
const LABEL_WINDOW: usize = 24;

/// A money-looking token found in one extraction call.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyCandidate {
    pub raw: String,
    pub value: f64,
    /// Byte offset of the token in the normalized text.
    pub offset: usize,
}

/// Chooses the receipt total among the candidates of one text.
pub trait AmountStrategy: Send + Sync {
    fn select(&self, normalized: &str, candidates: &[MoneyCandidate]) -> Option<MoneyCandidate>;
}

/// The largest value wins. Receipts usually print the grand total as their
/// biggest figure; larger non-total numbers produce false positives.
#[derive(Debug, Default, Clone, Copy)]
pub struct LargestAmount;

impl AmountStrategy for LargestAmount {
    fn select(&self, _normalized: &str, candidates: &[MoneyCandidate]) -> Option<MoneyCandidate> {
        candidates
            .iter()
            .max_by(|a, b| a.value.total_cmp(&b.value))
            .cloned()
    }
}

/// The last token in reading order wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct LastAmount;

impl AmountStrategy for LastAmount {
    fn select(&self, _normalized: &str, candidates: &[MoneyCandidate]) -> Option<MoneyCandidate> {
        candidates.iter().max_by_key(|c| c.offset).cloned()
    }
}

/// The last token directly following a "total" label wins, otherwise the
/// largest.
#[derive(Debug, Default, Clone, Copy)]
pub struct LabeledTotal;

impl AmountStrategy for LabeledTotal {
    fn select(&self, normalized: &str, candidates: &[MoneyCandidate]) -> Option<MoneyCandidate> {
        let labeled = candidates
            .iter()
            .filter(|c| {
                let start = floor_char_boundary(normalized, c.offset.saturating_sub(LABEL_WINDOW));
                let window = &normalized[start..c.offset];
                // Nothing numeric may sit between the label and the token.
                TOTAL_LABEL
                    .find_iter(window)
                    .last()
                    .map(|label| !window[label.end()..].chars().any(|ch| ch.is_ascii_digit()))
                    .unwrap_or(false)
            })
            .max_by_key(|c| c.offset)
            .cloned();
        labeled.or_else(|| LargestAmount.select(normalized, candidates))
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Collapses thousands separators into single spaces.
pub fn normalize(text: &str) -> String {
    SEPARATORS.replace_all(text, " ").into_owned()
}

/// All positive, parseable money tokens of an already normalized text.
pub fn find_candidates(normalized: &str) -> Vec<MoneyCandidate> {
    MONEY
        .find_iter(normalized)
        .filter_map(|m| {
            let raw = m.as_str();
            let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
            let value = compact.parse::<f64>().ok()?;
            (value.is_finite() && value > 0.0).then(|| MoneyCandidate {
                raw: raw.to_string(),
                value,
                offset: m.start(),
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct AmountExtractor {
    strategy: Arc<dyn AmountStrategy>,
}

impl Default for AmountExtractor {
    fn default() -> Self {
        AmountExtractor::with_strategy(LargestAmount)
    }
}

impl std::fmt::Debug for AmountExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmountExtractor").finish_non_exhaustive()
    }
}

impl AmountExtractor {
    pub fn with_strategy(strategy: impl AmountStrategy + 'static) -> Self {
        AmountExtractor {
            strategy: Arc::new(strategy),
        }
    }

    /// Best guess at the total, or `None` when nothing money-like survives.
    pub fn extract(&self, text: &str) -> Option<MoneyCandidate> {
        let normalized = normalize(text);
        let candidates = find_candidates(&normalized);
        self.strategy.select(&normalized, &candidates)
    }
}

/// Extracts a receipt total with the largest-value rule.
pub fn extract_amount(text: &str) -> Option<f64> {
    AmountExtractor::default().extract(text).map(|c| c.value)
}

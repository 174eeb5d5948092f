//! Batch-local TF-IDF vectorization and cosine similarity.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));

pub(crate) type TermVector = HashMap<String, f64>;

/// Splits text into lowercase word tokens.
fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|token| token.as_str().to_string())
        .collect()
}

/// Builds one TF-IDF vector per document, in document order.
///
/// Weights are raw term counts scaled by the smoothed inverse document
/// frequency `ln((1 + n) / (1 + df)) + 1` over this batch only.
pub(crate) fn vectorize(documents: &[&str]) -> Vec<TermVector> {
    let term_counts = documents
        .iter()
        .map(|document| count_terms(document))
        .collect::<Vec<_>>();

    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for counts in &term_counts {
        for term in counts.keys() {
            *document_frequency.entry(term.as_str()).or_insert(0) += 1;
        }
    }

    let total_docs = documents.len() as f64;
    term_counts
        .iter()
        .map(|counts| {
            counts
                .iter()
                .map(|(term, &count)| {
                    let df = document_frequency.get(term.as_str()).copied().unwrap_or(1) as f64;
                    let idf = ((1.0 + total_docs) / (1.0 + df)).ln() + 1.0;
                    (term.clone(), count as f64 * idf)
                })
                .collect()
        })
        .collect()
}

/// Cosine similarity between two sparse vectors; `0.0` if either is zero.
pub(crate) fn cosine_similarity(vec_a: &TermVector, vec_b: &TermVector) -> f64 {
    let mut dot_product = 0.0;
    let mut norm_a = 0.0;

    for (term, weight) in vec_a {
        norm_a += weight * weight;
        if let Some(weight_b) = vec_b.get(term) {
            dot_product += weight * weight_b;
        }
    }
    let norm_b: f64 = vec_b.values().map(|weight| weight * weight).sum();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    // Non-negative weights keep this in [0, 1] up to rounding.
    (dot_product / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

fn count_terms(document: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokenize(document) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

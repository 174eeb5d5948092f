//! Lexical similarity engine for duplicate detection.
//!
//! # Responsibility
//! - Score one query text against an ordered corpus of texts.
//! - Validate inputs before any vectorization work.
//!
//! # Invariants
//! - Output length equals corpus length; index `i` scores corpus text `i`.
//! - Every score lies in `[0.0, 1.0]`.
//! - The vector space is rebuilt from the current batch on every call, so
//!   scores from calls with different corpora are not comparable.

mod tfidf;

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Similarity of one corpus text against the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityScore {
    /// Position of the scored text in the supplied corpus.
    pub corpus_index: usize,
    /// Cosine similarity (0.0 to 1.0).
    pub score: f64,
}

/// Ordered per-corpus scores, one per corpus text.
pub type SimilarityResult = Vec<SimilarityScore>;

/// Input error raised before vectorizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimilarityError {
    /// Query or a corpus text is empty or whitespace-only.
    EmptyText {
        /// `None` for the query, `Some(i)` for corpus text `i`.
        corpus_index: Option<usize>,
    },
}

impl Display for SimilarityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText { corpus_index: None } => {
                write!(f, "title/description must be non-empty (query)")
            }
            Self::EmptyText {
                corpus_index: Some(index),
            } => write!(
                f,
                "title/description must be non-empty (corpus entry {index})"
            ),
        }
    }
}

impl Error for SimilarityError {}

/// Scores `query` against each text of `corpus`.
///
/// Builds a TF-IDF space over `[query] + corpus` and returns the cosine
/// similarity between the query vector and each corpus vector. A text sharing
/// no weighted vocabulary with the query scores `0.0`.
///
/// # Errors
/// - `SimilarityError::EmptyText` when the query or any corpus text is blank.
pub fn score<S: AsRef<str>>(
    query: &str,
    corpus: &[S],
) -> Result<SimilarityResult, SimilarityError> {
    if query.trim().is_empty() {
        return Err(SimilarityError::EmptyText { corpus_index: None });
    }
    if corpus.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(index) = corpus
        .iter()
        .position(|text| text.as_ref().trim().is_empty())
    {
        return Err(SimilarityError::EmptyText {
            corpus_index: Some(index),
        });
    }

    let mut documents = Vec::with_capacity(corpus.len() + 1);
    documents.push(query);
    documents.extend(corpus.iter().map(AsRef::as_ref));

    // Index 0 is the query; corpus vectors follow in corpus order.
    let vectors = tfidf::vectorize(&documents);
    let query_vector = &vectors[0];

    Ok(vectors[1..]
        .iter()
        .enumerate()
        .map(|(corpus_index, vector)| SimilarityScore {
            corpus_index,
            score: tfidf::cosine_similarity(query_vector, vector),
        })
        .collect())
}

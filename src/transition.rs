use alloc::vec::Vec;

use rand::Rng;

use crate::errors::{CrfError, Result};

/// Lower bound of the initial transition scores.
const INIT_LOW: f64 = -0.1;

/// Upper bound (exclusive) of the initial transition scores.
const INIT_HIGH: f64 = 0.1;

/// Represents trainable scores of moving between consecutive tags.
///
/// The matrix is square and its size is fixed at construction. The element at `(i, j)`
/// is the score of moving from tag `i` to tag `j`.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionMatrix {
    scores: Vec<f64>,
    num_tags: usize,
}

impl TransitionMatrix {
    /// Creates a new matrix filled with uniform random scores in `[-0.1, 0.1)`.
    ///
    /// # Errors
    ///
    /// `num_tags` must not be 0.
    #[cfg(feature = "std")]
    #[cfg_attr(docsrs, doc(cfg(feature = "std")))]
    pub fn new(num_tags: usize) -> Result<Self> {
        Self::with_rng(num_tags, &mut rand::thread_rng())
    }

    /// Creates a new matrix filled with uniform random scores in `[-0.1, 0.1)` drawn
    /// from the given generator.
    ///
    /// # Errors
    ///
    /// `num_tags` must not be 0.
    pub fn with_rng<R>(num_tags: usize, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let scores = (0..num_scores(num_tags)?)
            .map(|_| rng.gen_range(INIT_LOW..INIT_HIGH))
            .collect();
        Ok(Self { scores, num_tags })
    }

    /// Creates a new matrix from row-major scores.
    ///
    /// # Errors
    ///
    /// `num_tags` must not be 0, and `scores` must hold `num_tags * num_tags` elements.
    pub fn from_vec(scores: Vec<f64>, num_tags: usize) -> Result<Self> {
        let expected = num_scores(num_tags)?;
        if scores.len() != expected {
            return Err(CrfError::shape_mismatch(
                "number of transition scores",
                expected,
                scores.len(),
            ));
        }
        Ok(Self { scores, num_tags })
    }

    /// Creates a new matrix from rows.
    ///
    /// # Errors
    ///
    /// `rows` must not be empty, and each row must have as many elements as there are rows.
    pub fn from_rows<R>(rows: &[R]) -> Result<Self>
    where
        R: AsRef<[f64]>,
    {
        let num_tags = rows.len();
        let mut scores = Vec::with_capacity(num_scores(num_tags)?);
        for row in rows {
            let row = row.as_ref();
            if row.len() != num_tags {
                return Err(CrfError::shape_mismatch(
                    "transition row length",
                    num_tags,
                    row.len(),
                ));
            }
            scores.extend_from_slice(row);
        }
        Ok(Self { scores, num_tags })
    }

    /// Returns the number of tags.
    #[inline(always)]
    #[must_use]
    pub const fn num_tags(&self) -> usize {
        self.num_tags
    }

    /// Returns the score of moving from tag `from` to tag `to`.
    ///
    /// # Panics
    ///
    /// Both tags must be smaller than [`Self::num_tags()`].
    #[inline(always)]
    #[must_use]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        assert!(from < self.num_tags && to < self.num_tags);
        self.scores[from * self.num_tags + to]
    }

    /// Overwrites the score of moving from tag `from` to tag `to`.
    ///
    /// # Panics
    ///
    /// Both tags must be smaller than [`Self::num_tags()`].
    #[inline(always)]
    pub fn set(&mut self, from: usize, to: usize, score: f64) {
        assert!(from < self.num_tags && to < self.num_tags);
        self.scores[from * self.num_tags + to] = score;
    }

    /// Returns the scores of moving from tag `from` to every tag.
    ///
    /// # Panics
    ///
    /// `from` must be smaller than [`Self::num_tags()`].
    #[inline(always)]
    #[must_use]
    pub fn row(&self, from: usize) -> &[f64] {
        &self.scores[from * self.num_tags..(from + 1) * self.num_tags]
    }

    /// Returns all scores in row-major order.
    #[inline(always)]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }

    /// Returns all scores in row-major order for an in-place parameter update.
    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.scores
    }
}

/// Returns the number of scores of a `num_tags x num_tags` matrix.
fn num_scores(num_tags: usize) -> Result<usize> {
    if num_tags == 0 {
        return Err(CrfError::invalid_argument("num_tags must not be 0"));
    }
    num_tags
        .checked_mul(num_tags)
        .ok_or(CrfError::invalid_argument("num_tags is too large"))
}

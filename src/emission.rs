use alloc::vec::Vec;

use crate::errors::{CrfError, Result};

/// Represents per-position, per-tag scores of one sequence.
///
/// Scores are stored in row-major order: row `i` holds the scores of every tag at
/// position `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct EmissionMatrix {
    scores: Vec<f64>,
    num_tags: usize,
}

impl EmissionMatrix {
    /// Creates a new matrix from row-major scores.
    ///
    /// A matrix with no rows can be created, but every algorithm rejects it.
    ///
    /// # Errors
    ///
    /// `num_tags` must not be 0, and the length of `scores` must be a multiple of it.
    pub fn new(scores: Vec<f64>, num_tags: usize) -> Result<Self> {
        if num_tags == 0 {
            return Err(CrfError::invalid_argument("num_tags must not be 0"));
        }
        if scores.len() % num_tags != 0 {
            return Err(CrfError::shape_mismatch(
                "number of emission scores",
                scores.len() / num_tags * num_tags,
                scores.len(),
            ));
        }
        Ok(Self { scores, num_tags })
    }

    /// Creates a new matrix from rows.
    ///
    /// # Errors
    ///
    /// `rows` must not be empty, and all rows must have the same non-zero length.
    pub fn from_rows<R>(rows: &[R]) -> Result<Self>
    where
        R: AsRef<[f64]>,
    {
        let num_tags = rows
            .first()
            .map(|row| row.as_ref().len())
            .ok_or(CrfError::invalid_argument("rows must not be empty"))?;
        if num_tags == 0 {
            return Err(CrfError::invalid_argument("num_tags must not be 0"));
        }
        let capacity = rows
            .len()
            .checked_mul(num_tags)
            .ok_or(CrfError::invalid_argument("number of emission scores is too large"))?;
        let mut scores = Vec::with_capacity(capacity);
        for row in rows {
            let row = row.as_ref();
            if row.len() != num_tags {
                return Err(CrfError::shape_mismatch(
                    "emission row length",
                    num_tags,
                    row.len(),
                ));
            }
            scores.extend_from_slice(row);
        }
        Ok(Self { scores, num_tags })
    }

    /// Returns the sequence length.
    #[inline(always)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len() / self.num_tags
    }

    /// Returns `true` if the sequence has no positions.
    #[inline(always)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Returns the number of tags.
    #[inline(always)]
    #[must_use]
    pub const fn num_tags(&self) -> usize {
        self.num_tags
    }

    /// Returns the scores of every tag at the given position.
    ///
    /// # Panics
    ///
    /// `pos` must be smaller than [`Self::len()`].
    #[inline(always)]
    #[must_use]
    pub fn row(&self, pos: usize) -> &[f64] {
        &self.scores[pos * self.num_tags..(pos + 1) * self.num_tags]
    }

    /// Returns the score of `tag` at `pos`.
    ///
    /// # Panics
    ///
    /// `pos` must be smaller than [`Self::len()`] and `tag` must be smaller than
    /// [`Self::num_tags()`].
    #[inline(always)]
    #[must_use]
    pub fn get(&self, pos: usize, tag: usize) -> f64 {
        self.row(pos)[tag]
    }

    /// Returns all scores in row-major order.
    #[inline(always)]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }
}

/// Represents scores of several sequences padded to a common length.
///
/// Scores are stored in `[sequence][position][tag]` order.
#[derive(Clone, Debug, PartialEq)]
pub struct EmissionBatch {
    scores: Vec<f64>,
    batch_size: usize,
    max_len: usize,
    num_tags: usize,
}

impl EmissionBatch {
    /// Creates a new batch from `[sequence][position][tag]` ordered scores.
    ///
    /// # Errors
    ///
    /// `batch_size` and `num_tags` must not be 0, and `scores` must hold
    /// `batch_size * max_len * num_tags` elements for some `max_len`.
    pub fn new(scores: Vec<f64>, batch_size: usize, num_tags: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(CrfError::invalid_argument("batch_size must not be 0"));
        }
        if num_tags == 0 {
            return Err(CrfError::invalid_argument("num_tags must not be 0"));
        }
        let stride = batch_size
            .checked_mul(num_tags)
            .ok_or(CrfError::invalid_argument("batch_size * num_tags is too large"))?;
        if scores.len() % stride != 0 {
            return Err(CrfError::shape_mismatch(
                "number of emission scores",
                scores.len() / stride * stride,
                scores.len(),
            ));
        }
        Ok(Self {
            max_len: scores.len() / stride,
            scores,
            batch_size,
            num_tags,
        })
    }

    /// Returns the number of sequences.
    #[inline(always)]
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the padded sequence length.
    #[inline(always)]
    #[must_use]
    pub const fn max_len(&self) -> usize {
        self.max_len
    }

    /// Returns the number of tags.
    #[inline(always)]
    #[must_use]
    pub const fn num_tags(&self) -> usize {
        self.num_tags
    }

    /// Returns the padded row-major scores of the `i`-th sequence.
    ///
    /// # Panics
    ///
    /// `i` must be smaller than [`Self::batch_size()`].
    #[inline(always)]
    #[must_use]
    pub fn sequence(&self, i: usize) -> &[f64] {
        let stride = self.max_len * self.num_tags;
        &self.scores[i * stride..(i + 1) * stride]
    }

    /// Returns the `i`-th sequence cut to `len` positions as a new matrix.
    ///
    /// # Panics
    ///
    /// `i` must be smaller than the batch size and `len` must not exceed the padded length.
    #[must_use]
    pub fn trimmed(&self, i: usize, len: usize) -> EmissionMatrix {
        assert!(len <= self.max_len);
        EmissionMatrix {
            scores: self.sequence(i)[..len * self.num_tags].to_vec(),
            num_tags: self.num_tags,
        }
    }
}

/// Input of [`Crf::score_and_decode()`](crate::Crf::score_and_decode).
#[derive(Clone, Copy, Debug)]
pub enum Emissions<'a> {
    /// A single unpadded sequence.
    Single(&'a EmissionMatrix),

    /// Sequences padded to a common length.
    Batch(&'a EmissionBatch),
}

impl<'a> From<&'a EmissionMatrix> for Emissions<'a> {
    fn from(m: &'a EmissionMatrix) -> Self {
        Self::Single(m)
    }
}

impl<'a> From<&'a EmissionBatch> for Emissions<'a> {
    fn from(b: &'a EmissionBatch) -> Self {
        Self::Batch(b)
    }
}

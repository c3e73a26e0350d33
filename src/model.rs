use alloc::vec::Vec;

use crate::batch;
use crate::emission::{EmissionBatch, EmissionMatrix, Emissions};
use crate::errors::{CrfError, Result};
use crate::forward_backward;
use crate::transition::TransitionMatrix;
use crate::viterbi;

#[cfg(feature = "std")]
use crate::forward_backward::NllGradient;

/// Represents a linear-chain CRF without start and stop tags.
///
/// The model owns only the transition scores. Emission scores are supplied to each
/// call, and every call is stateless given the current transitions.
#[derive(Clone, Debug, PartialEq)]
pub struct Crf {
    transitions: TransitionMatrix,
}

impl Crf {
    /// Creates a new model with the given transitions.
    #[inline(always)]
    #[must_use]
    pub const fn new(transitions: TransitionMatrix) -> Self {
        Self { transitions }
    }

    /// Creates a new model with random transitions.
    ///
    /// # Errors
    ///
    /// `num_tags` must not be 0.
    #[cfg(feature = "std")]
    #[cfg_attr(docsrs, doc(cfg(feature = "std")))]
    pub fn with_num_tags(num_tags: usize) -> Result<Self> {
        Ok(Self::new(TransitionMatrix::new(num_tags)?))
    }

    /// Returns the number of tags.
    #[inline(always)]
    #[must_use]
    pub const fn num_tags(&self) -> usize {
        self.transitions.num_tags()
    }

    /// Returns the transition scores.
    #[inline(always)]
    #[must_use]
    pub const fn transitions(&self) -> &TransitionMatrix {
        &self.transitions
    }

    /// Returns the transition scores for a parameter update.
    #[inline(always)]
    pub fn transitions_mut(&mut self) -> &mut TransitionMatrix {
        &mut self.transitions
    }

    /// Scores the given tag sequence.
    ///
    /// # Errors
    ///
    /// The emission must have [`Self::num_tags()`] columns and at least one row, `tags`
    /// must have one tag per row, and every tag must be smaller than
    /// [`Self::num_tags()`].
    pub fn score_real_path(&self, emission: &EmissionMatrix, tags: &[usize]) -> Result<f64> {
        check_emission(self.num_tags(), emission)?;
        check_tags(self.num_tags(), emission.len(), tags)?;
        Ok(forward_backward::path_score(
            &self.transitions,
            emission.as_slice(),
            tags,
        ))
    }

    /// Computes the logarithm of the total score of all tag sequences.
    ///
    /// # Errors
    ///
    /// The emission must have [`Self::num_tags()`] columns and at least one row.
    #[cfg(feature = "std")]
    #[cfg_attr(docsrs, doc(cfg(feature = "std")))]
    pub fn score_all_paths(&self, emission: &EmissionMatrix) -> Result<f64> {
        check_emission(self.num_tags(), emission)?;
        Ok(forward_backward::log_partition(
            &self.transitions,
            emission.as_slice(),
        ))
    }

    /// Searches the best tag sequence and returns it with its score.
    ///
    /// Ties are broken by the lowest tag index. See [`Self::decode_batch()`] for padded
    /// input.
    ///
    /// # Errors
    ///
    /// The emission must have [`Self::num_tags()`] columns and at least one row.
    pub fn decode(&self, emission: &EmissionMatrix) -> Result<(f64, Vec<usize>)> {
        check_emission(self.num_tags(), emission)?;
        Ok(viterbi::decode(
            &self.transitions,
            emission.as_slice(),
            &mut vec![],
        ))
    }

    /// Searches the best tag sequence of each padded sequence.
    ///
    /// Positions beyond `valid_lengths[i]` of the `i`-th sequence are discarded and each
    /// sequence is decoded independently. The returned paths are not re-padded.
    ///
    /// # Errors
    ///
    /// The batch must have [`Self::num_tags()`] columns, `valid_lengths` must have one
    /// entry per sequence, and every length must be in `1..=batch.max_len()`.
    pub fn decode_batch(
        &self,
        batch: &EmissionBatch,
        valid_lengths: &[usize],
    ) -> Result<(Vec<f64>, Vec<Vec<usize>>)> {
        batch::check_batch(self.num_tags(), batch, valid_lengths)?;
        Ok(batch::decode_batch(&self.transitions, batch, valid_lengths))
    }

    /// Decodes a single sequence or a padded batch.
    ///
    /// `valid_lengths` must be given for a batch and omitted for a single sequence. A
    /// single sequence produces one-element outputs.
    ///
    /// # Errors
    ///
    /// See [`Self::decode()`] and [`Self::decode_batch()`].
    pub fn score_and_decode<'a, E>(
        &self,
        emissions: E,
        valid_lengths: Option<&[usize]>,
    ) -> Result<(Vec<f64>, Vec<Vec<usize>>)>
    where
        E: Into<Emissions<'a>>,
    {
        match (emissions.into(), valid_lengths) {
            (Emissions::Single(emission), None) => {
                let (score, path) = self.decode(emission)?;
                Ok((vec![score], vec![path]))
            }
            (Emissions::Batch(batch), Some(valid_lengths)) => {
                self.decode_batch(batch, valid_lengths)
            }
            (Emissions::Single(_), Some(_)) => Err(CrfError::invalid_argument(
                "valid_lengths must not be given for a single sequence",
            )),
            (Emissions::Batch(_), None) => Err(CrfError::invalid_argument(
                "valid_lengths must be given for a padded batch",
            )),
        }
    }

    /// Computes the negative log-likelihood of the given tag sequence.
    ///
    /// The result is non-negative up to rounding errors. It is `+inf` if the given tag
    /// sequence is impossible, including when every tag sequence is.
    ///
    /// # Errors
    ///
    /// See [`Self::score_real_path()`].
    #[cfg(feature = "std")]
    #[cfg_attr(docsrs, doc(cfg(feature = "std")))]
    pub fn nll_loss(&self, emission: &EmissionMatrix, tags: &[usize]) -> Result<f64> {
        let real = self.score_real_path(emission, tags)?;
        let z = forward_backward::log_partition(&self.transitions, emission.as_slice());
        Ok(forward_backward::negative_log_likelihood(z, real))
    }

    /// Computes the posterior probability of every tag at every position.
    ///
    /// The result is an `L x T` row-major matrix whose rows sum to 1.
    ///
    /// # Errors
    ///
    /// The emission must have [`Self::num_tags()`] columns and at least one row.
    #[cfg(feature = "std")]
    #[cfg_attr(docsrs, doc(cfg(feature = "std")))]
    pub fn marginals(&self, emission: &EmissionMatrix) -> Result<Vec<f64>> {
        check_emission(self.num_tags(), emission)?;
        let mut alphas = vec![];
        let mut betas = vec![];
        let z = forward_backward::calculate_alphas_betas(
            &self.transitions,
            emission.as_slice(),
            &mut alphas,
            &mut betas,
        );
        Ok(forward_backward::calculate_marginals(&alphas, &betas, z))
    }

    /// Computes the negative log-likelihood of the given tag sequence and its gradients
    /// with respect to the transition and emission scores.
    ///
    /// If every tag sequence is impossible, the loss is `+inf` and the gradients are
    /// NaN.
    ///
    /// # Errors
    ///
    /// See [`Self::score_real_path()`].
    #[cfg(feature = "std")]
    #[cfg_attr(docsrs, doc(cfg(feature = "std")))]
    pub fn nll_gradient(&self, emission: &EmissionMatrix, tags: &[usize]) -> Result<NllGradient> {
        let real = self.score_real_path(emission, tags)?;
        let num_tags = self.num_tags();
        let mut alphas = vec![];
        let mut betas = vec![];
        let z = forward_backward::calculate_alphas_betas(
            &self.transitions,
            emission.as_slice(),
            &mut alphas,
            &mut betas,
        );
        let mut transitions = vec![0.0; num_tags * num_tags];
        forward_backward::update_gradient(
            &self.transitions,
            emission.as_slice(),
            tags,
            &alphas,
            &betas,
            z,
            &mut transitions,
        );
        let mut emissions = forward_backward::calculate_marginals(&alphas, &betas, z);
        for (row, &tag) in emissions.chunks_exact_mut(num_tags).zip(tags) {
            row[tag] -= 1.0;
        }
        Ok(NllGradient {
            loss: forward_backward::negative_log_likelihood(z, real),
            transitions,
            emissions,
        })
    }
}

/// Checks that the emission is non-empty and has `num_tags` columns.
pub(crate) fn check_emission(num_tags: usize, emission: &EmissionMatrix) -> Result<()> {
    if emission.num_tags() != num_tags {
        return Err(CrfError::shape_mismatch(
            "number of emission tags",
            num_tags,
            emission.num_tags(),
        ));
    }
    if emission.is_empty() {
        return Err(CrfError::EmptySequence);
    }
    Ok(())
}

/// Checks that `tags` has `len` elements in `[0, num_tags)`.
pub(crate) fn check_tags(num_tags: usize, len: usize, tags: &[usize]) -> Result<()> {
    if tags.len() != len {
        return Err(CrfError::shape_mismatch("number of tags", len, tags.len()));
    }
    if let Some((position, &tag)) = tags.iter().enumerate().find(|(_, &tag)| tag >= num_tags) {
        return Err(CrfError::tag_out_of_range(position, tag, num_tags));
    }
    Ok(())
}

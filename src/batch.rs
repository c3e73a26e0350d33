use alloc::vec::Vec;

#[cfg(feature = "std")]
use std::thread;

use crate::emission::EmissionBatch;
use crate::errors::{CrfError, Result};
use crate::transition::TransitionMatrix;
use crate::viterbi;

#[cfg(feature = "std")]
use crate::model::Crf;

/// Checks the shape of a padded batch and its valid lengths.
pub fn check_batch(num_tags: usize, batch: &EmissionBatch, valid_lengths: &[usize]) -> Result<()> {
    if batch.num_tags() != num_tags {
        return Err(CrfError::shape_mismatch(
            "number of emission tags",
            num_tags,
            batch.num_tags(),
        ));
    }
    if valid_lengths.len() != batch.batch_size() {
        return Err(CrfError::shape_mismatch(
            "number of valid lengths",
            batch.batch_size(),
            valid_lengths.len(),
        ));
    }
    for &len in valid_lengths {
        if len > batch.max_len() {
            return Err(CrfError::shape_mismatch(
                "upper bound of valid length",
                batch.max_len(),
                len,
            ));
        }
        if len == 0 {
            return Err(CrfError::EmptySequence);
        }
    }
    Ok(())
}

/// Returns the valid part of the `i`-th sequence.
#[inline(always)]
fn trimmed_scores(batch: &EmissionBatch, i: usize, len: usize) -> &[f64] {
    &batch.sequence(i)[..len * batch.num_tags()]
}

/// Decodes each sequence of a checked batch one after another.
pub fn decode_batch(
    trans: &TransitionMatrix,
    batch: &EmissionBatch,
    valid_lengths: &[usize],
) -> (Vec<f64>, Vec<Vec<usize>>) {
    let mut backptrs = vec![];
    let mut scores = Vec::with_capacity(valid_lengths.len());
    let mut paths = Vec::with_capacity(valid_lengths.len());
    for (i, &len) in valid_lengths.iter().enumerate() {
        let (score, path) = viterbi::decode(trans, trimmed_scores(batch, i, len), &mut backptrs);
        scores.push(score);
        paths.push(path);
    }
    (scores, paths)
}

/// Decoder that distributes the sequences of a batch over worker threads.
///
/// The workers share the transitions of the model read-only and each owns its
/// backpointer table. The results are identical to [`Crf::decode_batch()`].
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub struct BatchDecoder<'a> {
    crf: &'a Crf,
    n_threads: usize,
}

#[cfg(feature = "std")]
impl<'a> BatchDecoder<'a> {
    /// Creates a new decoder using a single thread.
    #[must_use]
    pub const fn new(crf: &'a Crf) -> Self {
        Self { crf, n_threads: 1 }
    }

    /// Sets the number of threads.
    ///
    /// # Errors
    ///
    /// `n_threads` must not be 0.
    pub fn n_threads(mut self, n_threads: usize) -> Result<Self> {
        if n_threads == 0 {
            return Err(CrfError::invalid_argument("n_threads must not be 0"));
        }
        self.n_threads = n_threads;
        Ok(self)
    }

    /// Searches the best tag sequence of each padded sequence.
    ///
    /// # Errors
    ///
    /// See [`Crf::decode_batch()`].
    ///
    /// # Panics
    ///
    /// A panic in a worker thread is resumed on the calling thread.
    pub fn decode(
        &self,
        batch: &EmissionBatch,
        valid_lengths: &[usize],
    ) -> Result<(Vec<f64>, Vec<Vec<usize>>)> {
        let trans = self.crf.transitions();
        check_batch(trans.num_tags(), batch, valid_lengths)?;

        let n_threads = self.n_threads.min(valid_lengths.len());
        if n_threads <= 1 {
            return Ok(decode_batch(trans, batch, valid_lengths));
        }
        log::debug!(
            "decoding {} sequences with {} threads",
            valid_lengths.len(),
            n_threads,
        );

        let (s, r) = crossbeam_channel::unbounded();
        for (i, &len) in valid_lengths.iter().enumerate() {
            // The receiver outlives this loop.
            let _ = s.send((i, trimmed_scores(batch, i, len)));
        }
        drop(s);

        let mut results = thread::scope(|scope| {
            let mut threads = vec![];
            for _ in 0..n_threads {
                let r = r.clone();
                let t = scope.spawn(move || {
                    let mut backptrs = vec![];
                    let mut results = vec![];
                    while let Ok((i, scores)) = r.recv() {
                        let (score, path) = viterbi::decode(trans, scores, &mut backptrs);
                        results.push((i, score, path));
                    }
                    results
                });
                threads.push(t);
            }
            let mut results = Vec::with_capacity(valid_lengths.len());
            for t in threads {
                match t.join() {
                    Ok(r) => results.extend(r),
                    Err(e) => std::panic::resume_unwind(e),
                }
            }
            results
        });

        results.sort_unstable_by_key(|&(i, _, _)| i);
        Ok(results
            .into_iter()
            .map(|(_, score, path)| (score, path))
            .unzip())
    }
}

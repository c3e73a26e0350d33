#[cfg(feature = "std")]
use alloc::vec::Vec;

#[cfg(feature = "std")]
use crate::math;
use crate::transition::TransitionMatrix;

/// Result of [`Crf::nll_gradient()`](crate::Crf::nll_gradient).
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
#[derive(Clone, Debug)]
pub struct NllGradient {
    /// Negative log-likelihood of the gold path.
    pub loss: f64,

    /// Gradient with respect to the transition scores, in the row-major layout of
    /// [`TransitionMatrix::as_slice()`].
    pub transitions: Vec<f64>,

    /// Gradient with respect to the emission scores, in the row-major layout of
    /// [`EmissionMatrix::as_slice()`](crate::EmissionMatrix::as_slice).
    pub emissions: Vec<f64>,
}

/// Returns the score of the given tag sequence. There is no transition term at the
/// first position.
pub fn path_score(trans: &TransitionMatrix, scores: &[f64], tags: &[usize]) -> f64 {
    let num_tags = trans.num_tags();
    let mut score = 0.0;
    let mut prev_tag = None;
    for (emissions, &tag) in scores.chunks_exact(num_tags).zip(tags) {
        score += emissions[tag];
        if let Some(prev_tag) = prev_tag {
            score += trans.get(prev_tag, tag);
        }
        prev_tag = Some(tag);
    }
    score
}

/// Returns the logarithm of the total score of all paths.
///
/// Only the previous row of forward scores is retained.
#[cfg(feature = "std")]
pub fn log_partition(trans: &TransitionMatrix, scores: &[f64]) -> f64 {
    let num_tags = trans.num_tags();
    let trans = trans.as_slice();
    let mut prev = scores[..num_tags].to_vec();
    let mut curr = vec![0.0; num_tags];
    let mut work = vec![0.0; num_tags];
    for emissions in scores.chunks_exact(num_tags).skip(1) {
        for (j, (alpha, &emission)) in curr.iter_mut().zip(emissions).enumerate() {
            for (i, (w, &p)) in work.iter_mut().zip(&prev).enumerate() {
                *w = p + trans[i * num_tags + j];
            }
            *alpha = math::logsumexp(&work) + emission;
        }
        core::mem::swap(&mut prev, &mut curr);
    }
    math::logsumexp(&prev)
}

/// Returns the negative log-likelihood of a path scoring `real` under the log-partition
/// `z`. When no path is possible, `z` is `-inf` and the loss is `+inf`.
#[cfg(feature = "std")]
#[inline(always)]
pub fn negative_log_likelihood(z: f64, real: f64) -> f64 {
    if z == f64::NEG_INFINITY {
        f64::INFINITY
    } else {
        z - real
    }
}

/// Fills the `L x T` forward and backward tables and returns the logarithm of the
/// total score of all paths.
///
/// `alphas[t][j]` is the log total score of prefixes ending with tag `j` at `t`,
/// including the emission at `t`. `betas[t][j]` is the log total score of suffixes
/// following tag `j` at `t`, excluding the emission at `t`.
#[cfg(feature = "std")]
pub fn calculate_alphas_betas(
    trans: &TransitionMatrix,
    scores: &[f64],
    alphas: &mut Vec<f64>,
    betas: &mut Vec<f64>,
) -> f64 {
    let num_tags = trans.num_tags();
    let len = scores.len() / num_tags;
    let trans = trans.as_slice();
    alphas.clear();
    alphas.resize(scores.len(), 0.0);
    betas.clear();
    betas.resize(scores.len(), 0.0);
    let mut work = vec![0.0; num_tags];

    // alphas
    alphas[..num_tags].copy_from_slice(&scores[..num_tags]);
    for t in 1..len {
        let (prev, curr) = alphas.split_at_mut(t * num_tags);
        let prev = &prev[(t - 1) * num_tags..];
        let emissions = &scores[t * num_tags..(t + 1) * num_tags];
        for (j, (alpha, &emission)) in curr[..num_tags].iter_mut().zip(emissions).enumerate() {
            for (i, (w, &p)) in work.iter_mut().zip(prev).enumerate() {
                *w = p + trans[i * num_tags + j];
            }
            *alpha = math::logsumexp(&work) + emission;
        }
    }

    // betas
    for t in (0..len - 1).rev() {
        let (curr, next) = betas.split_at_mut((t + 1) * num_tags);
        let curr = &mut curr[t * num_tags..];
        let next = &next[..num_tags];
        let emissions = &scores[(t + 1) * num_tags..(t + 2) * num_tags];
        for (i, beta) in curr.iter_mut().enumerate() {
            let trans_row = &trans[i * num_tags..(i + 1) * num_tags];
            for (w, ((&tr, &emission), &b)) in work
                .iter_mut()
                .zip(trans_row.iter().zip(emissions).zip(next))
            {
                *w = tr + emission + b;
            }
            *beta = math::logsumexp(&work);
        }
    }

    math::logsumexp(&alphas[(len - 1) * num_tags..])
}

/// Returns the `L x T` posterior probabilities of each tag at each position.
#[cfg(feature = "std")]
pub fn calculate_marginals(alphas: &[f64], betas: &[f64], z: f64) -> Vec<f64> {
    alphas
        .iter()
        .zip(betas)
        .map(|(&alpha, &beta)| (alpha + beta - z).exp())
        .collect()
}

/// Adds the gradient of the negative log-likelihood of `tags` with respect to the
/// transition scores to `gradients`.
///
/// The gradient is the expected count of each transition minus its count in `tags`.
#[allow(clippy::too_many_arguments)]
#[cfg(feature = "std")]
pub fn update_gradient(
    trans: &TransitionMatrix,
    scores: &[f64],
    tags: &[usize],
    alphas: &[f64],
    betas: &[f64],
    z: f64,
    gradients: &mut [f64],
) {
    let num_tags = trans.num_tags();
    let len = scores.len() / num_tags;
    let trans = trans.as_slice();
    for t in 1..len {
        let prev_alphas = &alphas[(t - 1) * num_tags..t * num_tags];
        let emissions = &scores[t * num_tags..(t + 1) * num_tags];
        let curr_betas = &betas[t * num_tags..(t + 1) * num_tags];
        for (i, &alpha) in prev_alphas.iter().enumerate() {
            let row = i * num_tags;
            for (j, (&emission, &beta)) in emissions.iter().zip(curr_betas).enumerate() {
                let log_prob = alpha + trans[row + j] + emission + beta - z;
                gradients[row + j] += log_prob.exp();
            }
        }
    }
    for w in tags.windows(2) {
        gradients[w[0] * num_tags + w[1]] -= 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::emission::EmissionMatrix;
    use crate::test_utils;
    #[cfg(feature = "std")]
    use crate::test_utils::logsumexp;

    #[test]
    fn test_path_score() {
        let crf = test_utils::generate_test_crf();
        let emission = test_utils::generate_test_emission();
        // emissions: 1.0 + 2.0 + 1.2 + 0.0
        // transitions: 0->1 (-1.0) + 1->2 (-0.3) + 2->0 (-0.7)
        let expected = 1.0 + 2.0 + 1.2 + 0.0 - 1.0 - 0.3 - 0.7;
        let result = path_score(crf.transitions(), emission.as_slice(), &[0, 1, 2, 0]);
        assert!((expected - result).abs() < 1e-12);
    }

    #[test]
    fn test_path_score_single_position() {
        let crf = test_utils::generate_test_crf();
        let emission = EmissionMatrix::from_rows(&[[0.1, 0.2, 0.3]]).unwrap();
        let result = path_score(crf.transitions(), emission.as_slice(), &[2]);
        assert!((0.3 - result).abs() < f64::EPSILON);
    }

    // 2 tags, 2 positions:
    // emissions [[1, 2], [3, 0]]
    // transitions [[0, 1], [2, 0]]
    //
    // 0-0: 1 + 3 + 0 = 4
    // 0-1: 1 + 0 + 1 = 2
    // 1-0: 2 + 3 + 2 = 7
    // 1-1: 2 + 0 + 0 = 2
    #[cfg(feature = "std")]
    #[test]
    fn test_log_partition_small() {
        let trans = TransitionMatrix::from_rows(&[[0.0, 1.0], [2.0, 0.0]]).unwrap();
        let emission = EmissionMatrix::from_rows(&[[1.0, 2.0], [3.0, 0.0]]).unwrap();
        let expected = logsumexp!(4.0, 2.0, 7.0, 2.0);
        let result = log_partition(&trans, emission.as_slice());
        assert!((expected - result).abs() < 1e-12);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_log_partition_matches_brute_force() {
        let mut rng = test_utils::seeded_rng(17);
        for num_tags in 1..=3 {
            for len in 1..=5 {
                let trans = test_utils::random_transitions(&mut rng, num_tags);
                let emission = test_utils::random_emission(&mut rng, len, num_tags);
                let expected = test_utils::brute_force_log_partition(&trans, &emission);
                let result = log_partition(&trans, emission.as_slice());
                assert!((expected - result).abs() < 1e-9);
            }
        }
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_log_partition_large_scores() {
        // Every path scores 1000 * 3 + 500 * 2 = 4000, and there are 2^3 of them.
        let trans = TransitionMatrix::from_vec(vec![500.0; 4], 2).unwrap();
        let emission = EmissionMatrix::new(vec![1000.0; 6], 2).unwrap();
        let expected = 4000.0 + 8f64.ln();
        let result = log_partition(&trans, emission.as_slice());
        assert!(result.is_finite());
        assert!((expected - result).abs() < 1e-9);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_log_partition_long_sequence() {
        let mut rng = test_utils::seeded_rng(23);
        let trans = test_utils::random_transitions(&mut rng, 5);
        let emission = test_utils::random_emission(&mut rng, 2000, 5);
        let result = log_partition(&trans, emission.as_slice());
        assert!(result.is_finite());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_alphas_betas_agree_with_forward() {
        let crf = test_utils::generate_test_crf();
        let emission = test_utils::generate_test_emission();
        let mut alphas = vec![];
        let mut betas = vec![];
        let z = calculate_alphas_betas(
            crf.transitions(),
            emission.as_slice(),
            &mut alphas,
            &mut betas,
        );
        let expected = log_partition(crf.transitions(), emission.as_slice());
        assert!((expected - z).abs() < 1e-12);

        // logsumexp_j(alpha[t][j] + beta[t][j]) == z at every position
        for t in 0..emission.len() {
            let sums: Vec<f64> = (0..3)
                .map(|j| alphas[t * 3 + j] + betas[t * 3 + j])
                .collect();
            assert!((math::logsumexp(&sums) - z).abs() < 1e-9);
        }
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_marginals_match_brute_force() {
        let crf = test_utils::generate_test_crf();
        let emission = test_utils::generate_test_emission();
        let mut alphas = vec![];
        let mut betas = vec![];
        let z = calculate_alphas_betas(
            crf.transitions(),
            emission.as_slice(),
            &mut alphas,
            &mut betas,
        );
        let marginals = calculate_marginals(&alphas, &betas, z);

        let mut expected = [0.0; 12];
        for path in test_utils::all_paths(4, 3) {
            let score = test_utils::naive_path_score(crf.transitions(), &emission, &path);
            let prob = (score - z).exp();
            for (t, &tag) in path.iter().enumerate() {
                expected[t * 3 + tag] += prob;
            }
        }
        for (a, b) in expected.iter().zip(&marginals) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_gradient_matches_finite_difference() {
        let crf = test_utils::generate_test_crf();
        let emission = test_utils::generate_test_emission();
        let tags = [0, 1, 1, 2];
        let mut alphas = vec![];
        let mut betas = vec![];
        let z = calculate_alphas_betas(
            crf.transitions(),
            emission.as_slice(),
            &mut alphas,
            &mut betas,
        );
        let mut gradients = [0.0; 9];
        update_gradient(
            crf.transitions(),
            emission.as_slice(),
            &tags,
            &alphas,
            &betas,
            z,
            &mut gradients,
        );

        let loss = |trans: &TransitionMatrix| {
            log_partition(trans, emission.as_slice())
                - path_score(trans, emission.as_slice(), &tags)
        };
        let eps = 1e-6;
        for (k, &g) in gradients.iter().enumerate() {
            let mut plus = crf.transitions().clone();
            plus.as_mut_slice()[k] += eps;
            let mut minus = crf.transitions().clone();
            minus.as_mut_slice()[k] -= eps;
            let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
            assert!((numeric - g).abs() < 1e-6, "k={k}: {numeric} vs {g}");
        }
    }
}

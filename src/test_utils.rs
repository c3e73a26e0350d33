use alloc::vec::Vec;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::emission::EmissionMatrix;
use crate::model::Crf;
use crate::transition::TransitionMatrix;

#[cfg(feature = "std")]
macro_rules! logsumexp {
    ( $($x:expr,)* ) => {
        $crate::math::logsumexp(&[$($x,)*])
    };
    ( $($x:expr),* ) => {
        logsumexp!($( $x, )*)
    };
}

/// Enumerates all `num_tags^len` tag sequences in lexicographic order.
pub fn all_paths(len: usize, num_tags: usize) -> Vec<Vec<usize>> {
    let mut paths = vec![vec![]];
    for _ in 0..len {
        let mut next = vec![];
        for path in &paths {
            for tag in 0..num_tags {
                let mut path = path.clone();
                path.push(tag);
                next.push(path);
            }
        }
        paths = next;
    }
    paths
}

/// Scores a path by looking up every term through the public accessors.
pub fn naive_path_score(
    trans: &TransitionMatrix,
    emission: &EmissionMatrix,
    tags: &[usize],
) -> f64 {
    let mut score = 0.0;
    for (i, &tag) in tags.iter().enumerate() {
        score += emission.get(i, tag);
        if i != 0 {
            score += trans.get(tags[i - 1], tag);
        }
    }
    score
}

/// Returns the best score over all paths and, among the paths reaching it, the smallest
/// one when compared from the last position backwards.
pub fn brute_force_best(trans: &TransitionMatrix, emission: &EmissionMatrix) -> (f64, Vec<usize>) {
    let mut best = f64::NEG_INFINITY;
    let mut best_path: Vec<usize> = vec![];
    for path in all_paths(emission.len(), emission.num_tags()) {
        let score = naive_path_score(trans, emission, &path);
        #[allow(clippy::float_cmp)]
        let better = best_path.is_empty()
            || score > best
            || (score == best && path.iter().rev().lt(best_path.iter().rev()));
        if better {
            best = score;
            best_path = path;
        }
    }
    (best, best_path)
}

/// Returns the log-sum-exp of the scores of all paths.
#[cfg(feature = "std")]
pub fn brute_force_log_partition(trans: &TransitionMatrix, emission: &EmissionMatrix) -> f64 {
    let scores: Vec<f64> = all_paths(emission.len(), emission.num_tags())
        .iter()
        .map(|path| naive_path_score(trans, emission, path))
        .collect();
    crate::math::logsumexp(&scores)
}

pub fn random_emission(rng: &mut StdRng, len: usize, num_tags: usize) -> EmissionMatrix {
    let scores = (0..len * num_tags)
        .map(|_| rng.gen_range(-2.0..2.0))
        .collect();
    EmissionMatrix::new(scores, num_tags).unwrap()
}

pub fn random_transitions(rng: &mut StdRng, num_tags: usize) -> TransitionMatrix {
    let scores = (0..num_tags * num_tags)
        .map(|_| rng.gen_range(-2.0..2.0))
        .collect();
    TransitionMatrix::from_vec(scores, num_tags).unwrap()
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

// 3 tags:
//      0     1     2
// 0 [ 0.5, -1.0,  0.0]
// 1 [ 1.5,  0.2, -0.3]
// 2 [-0.7,  0.9,  0.1]
pub fn generate_test_crf() -> Crf {
    Crf::new(
        TransitionMatrix::from_rows(&[[0.5, -1.0, 0.0], [1.5, 0.2, -0.3], [-0.7, 0.9, 0.1]])
            .unwrap(),
    )
}

// 4 positions x 3 tags
pub fn generate_test_emission() -> EmissionMatrix {
    EmissionMatrix::from_rows(&[
        [1.0, 0.0, -1.0],
        [0.3, 2.0, 0.1],
        [-0.5, 0.4, 1.2],
        [0.0, -0.2, 0.6],
    ])
    .unwrap()
}

#[cfg(feature = "std")]
pub(crate) use logsumexp;

use alloc::vec::Vec;

use crate::math;
use crate::transition::TransitionMatrix;

/// Searches the best path of the given row-major scores.
///
/// `scores` must be non-empty with `trans.num_tags()` columns. `backptrs` is a work
/// space for the `(L - 1) x T` backpointer table; row `i` of the table holds the best
/// predecessors of position `i + 1`, since position 0 has none.
///
/// Ties are broken by the lowest tag index, both for predecessors and for the last
/// tag. Among several best paths, the result is therefore the smallest one when
/// compared from the last position backwards.
pub fn decode(
    trans: &TransitionMatrix,
    scores: &[f64],
    backptrs: &mut Vec<usize>,
) -> (f64, Vec<usize>) {
    let num_tags = trans.num_tags();
    let len = scores.len() / num_tags;
    debug_assert!(len != 0);

    backptrs.clear();
    backptrs.resize((len - 1) * num_tags, 0);

    let trans = trans.as_slice();
    let mut prev = scores[..num_tags].to_vec();
    let mut curr = vec![0.0; num_tags];
    for (emissions, backptr_row) in scores
        .chunks_exact(num_tags)
        .skip(1)
        .zip(backptrs.chunks_exact_mut(num_tags))
    {
        for (j, ((best, backptr), &emission)) in
            curr.iter_mut().zip(backptr_row).zip(emissions).enumerate()
        {
            let mut best_score = f64::NEG_INFINITY;
            let mut best_idx = 0;
            for (i, &score) in prev.iter().enumerate() {
                let score = score + trans[i * num_tags + j];
                if score > best_score {
                    best_score = score;
                    best_idx = i;
                }
            }
            *backptr = best_idx;
            *best = best_score + emission;
        }
        core::mem::swap(&mut prev, &mut curr);
    }

    let (mut tag, best_score) = math::argmax(&prev);
    let mut path = vec![0; len];
    path[len - 1] = tag;
    for pos in (1..len).rev() {
        tag = backptrs[(pos - 1) * num_tags + tag];
        path[pos - 1] = tag;
    }
    (best_score, path)
}

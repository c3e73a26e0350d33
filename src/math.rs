/// Returns `log(sum(exp(xs)))`.
///
/// The maximum is subtracted before exponentiating, so the result stays finite as long
/// as the maximum is. Returns `-inf` for an empty slice or a slice of `-inf`s.
#[cfg(feature = "std")]
#[inline]
pub fn logsumexp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let mut sum = 0.0;
    for &x in xs {
        sum += (x - max).exp();
    }
    max + sum.ln()
}

/// Returns the index and value of the maximum.
///
/// Ties are broken by the lowest index. `xs` must not be empty.
#[inline(always)]
pub fn argmax(xs: &[f64]) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best = xs[0];
    for (i, &x) in xs.iter().enumerate().skip(1) {
        if x > best {
            best = x;
            best_idx = i;
        }
    }
    (best_idx, best)
}

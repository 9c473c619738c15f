//! Stationarity-preserving reparameterization.
//!
//! The optimizer works in an unconstrained space. Each unconstrained value is
//! squashed into (-1, 1) and read as a partial autocorrelation; the
//! Durbin–Levinson recursion then turns those into lag-polynomial
//! coefficients whose polynomial `1 - c_1 z - ... - c_k z^k` has every root
//! outside the unit circle (Monahan, 1984). The same map gives invertible MA
//! coefficients after a sign flip.

/// Map unconstrained values to coefficients of a stationary AR polynomial.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let partials: Vec<f64> = unconstrained.iter().map(|x| x / x.hypot(1.0)).collect();

    let mut row: Vec<f64> = Vec::with_capacity(partials.len());
    for (k, &r) in partials.iter().enumerate() {
        let mut next = Vec::with_capacity(k + 1);
        for i in 0..k {
            next.push(row[i] + r * row[k - i - 1]);
        }
        next.push(r);
        row = next;
    }
    row.into_iter().map(|y| -y).collect()
}

/// Inverse of [`constrain_stationary`]. `None` when the coefficients are not
/// strictly stationary.
pub fn unconstrain_stationary(constrained: &[f64]) -> Option<Vec<f64>> {
    let n = constrained.len();
    let mut row: Vec<f64> = constrained.iter().map(|c| -c).collect();
    let mut partials = vec![0.0; n];

    for k in (0..n).rev() {
        let r = row[k];
        if !r.is_finite() || r.abs() >= 1.0 {
            return None;
        }
        partials[k] = r;
        let denom = 1.0 - r * r;
        row = (0..k)
            .map(|i| (row[i] - r * row[k - i - 1]) / denom)
            .collect();
    }

    Some(
        partials
            .into_iter()
            .map(|r| r / (1.0 - r * r).sqrt())
            .collect(),
    )
}

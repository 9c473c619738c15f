//! Small dense linear algebra used by model estimation.

/// Sample autocovariances of `x` (mean already removed) for lags `0..=max_lag`,
/// normalized by `n`.
pub fn autocovariance(x: &[f64], max_lag: usize) -> Vec<f64> {
    let n = x.len();
    (0..=max_lag)
        .map(|lag| {
            if lag >= n {
                return 0.0;
            }
            x[lag..].iter().zip(x).map(|(a, b)| a * b).sum::<f64>() / n as f64
        })
        .collect()
}

/// AR(`order`) coefficients from autocovariances by the Levinson–Durbin
/// recursion. `None` if the recursion hits a non-positive prediction error.
pub fn levinson_durbin(autocov: &[f64], order: usize) -> Option<Vec<f64>> {
    if autocov.len() <= order || autocov[0] <= 0.0 {
        return None;
    }
    let mut phi: Vec<f64> = Vec::with_capacity(order);
    let mut error = autocov[0];

    for k in 1..=order {
        let acc: f64 = phi
            .iter()
            .enumerate()
            .map(|(j, p)| p * autocov[k - 1 - j])
            .sum();
        let reflection = (autocov[k] - acc) / error;
        let mut next: Vec<f64> = phi
            .iter()
            .enumerate()
            .map(|(j, p)| p - reflection * phi[k - 2 - j])
            .collect();
        next.push(reflection);
        phi = next;
        error *= 1.0 - reflection * reflection;
        if !error.is_finite() || error <= 0.0 {
            return None;
        }
    }
    Some(phi)
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
/// `None` for singular or ill-conditioned systems.
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }
    let scale = a
        .iter()
        .flatten()
        .fold(0.0_f64, |m, v| m.max(v.abs()))
        .max(f64::MIN_POSITIVE);

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() <= 1e-12 * scale {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Ordinary least squares via the normal equations.
pub fn least_squares(rows: &[Vec<f64>], targets: &[f64]) -> Option<Vec<f64>> {
    let k = rows.first()?.len();
    if rows.len() <= k || rows.len() != targets.len() {
        return None;
    }
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, y) in rows.iter().zip(targets) {
        for i in 0..k {
            xty[i] += row[i] * y;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    solve(xtx, xty)
}

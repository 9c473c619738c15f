//! ARMA(p, d, q) estimation and forecasting.
//!
//! The working series is the price level differenced `d` times. For `d = 0`
//! it is demeaned by the sample mean; for `d > 0` no constant is fitted.
//! The working series is divided by its standard deviation before
//! estimation so the optimizer tolerances do not depend on the price scale.

use super::linalg::{autocovariance, least_squares, levinson_durbin};
use super::optimize::{NelderMead, OptimizeError};
use super::transform::{constrain_stationary, unconstrain_stationary};
use super::{ArmaOrder, ModelFitError};

/// Working-series spread below which the series is treated as constant.
const DEGENERATE_SCALE: f64 = 1e-12;

/// Maximum order of the long autoregression used for starting values.
const MAX_LONG_AR: usize = 20;

/// Parameters estimated for one series, in price units.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedArma {
    pub order: ArmaOrder,
    /// `φ_1..φ_p` of `1 - φ_1 B - ... - φ_p B^p`.
    pub ar: Vec<f64>,
    /// `θ_1..θ_q` of `1 + θ_1 B + ... + θ_q B^q`.
    pub ma: Vec<f64>,
    /// Level the working series is centred on (sample mean for d = 0).
    pub mean: f64,
    /// Innovation variance.
    pub sigma2: f64,
    /// Conditional sum of squares at the optimum, in price units.
    pub css: f64,
    pub iterations: usize,
    history: Vec<f64>,
    working: Vec<f64>,
    residuals: Vec<f64>,
}

/// Fit by conditional sum of squares.
pub fn fit(levels: &[f64], order: ArmaOrder, optimizer: &NelderMead) -> Result<FittedArma, ModelFitError> {
    let needed = order.min_observations();
    if levels.len() < needed {
        return Err(ModelFitError::InsufficientObservations {
            needed,
            found: levels.len(),
        });
    }
    if levels.iter().any(|v| !v.is_finite()) {
        return Err(ModelFitError::NumericalFailure(
            "series contains non-finite values".into(),
        ));
    }

    let differenced = difference(levels, order.d);
    let mean = if order.d == 0 { sample_mean(&differenced) } else { 0.0 };
    let centred: Vec<f64> = differenced.iter().map(|v| v - mean).collect();
    let scale = (centred.iter().map(|v| v * v).sum::<f64>() / centred.len() as f64).sqrt();

    if !scale.is_finite() {
        return Err(ModelFitError::NumericalFailure(
            "working series variance is not finite".into(),
        ));
    }
    if scale <= DEGENERATE_SCALE * (1.0 + mean.abs()) {
        tracing::debug!(%order, mean, "constant working series, skipping optimization");
        return Ok(FittedArma {
            order,
            ar: vec![0.0; order.p],
            ma: vec![0.0; order.q],
            mean,
            sigma2: 0.0,
            css: 0.0,
            iterations: 0,
            history: levels.to_vec(),
            working: centred.clone(),
            residuals: vec![0.0; centred.len()],
        });
    }

    let standardized: Vec<f64> = centred.iter().map(|v| v / scale).collect();
    let (p, q) = (order.p, order.q);

    let start = hannan_rissanen(&standardized, p, q)
        .and_then(|(ar, ma)| {
            let neg_ma: Vec<f64> = ma.iter().map(|t| -t).collect();
            let mut u = unconstrain_stationary(&ar)?;
            u.extend(unconstrain_stationary(&neg_ma)?);
            Some(u)
        })
        .unwrap_or_else(|| vec![0.0; p + q]);

    let objective = |u: &[f64]| {
        let (ar, ma) = coefficients(u, p);
        css_residuals(&standardized, &ar, &ma).0
    };

    let minimum = optimizer.minimize(objective, &start).map_err(|e| match e {
        OptimizeError::NotConverged { iterations } => ModelFitError::NotConverged { iterations },
        OptimizeError::NonFinite => {
            ModelFitError::NumericalFailure("objective not finite at any trial point".into())
        }
    })?;

    let (ar, ma) = coefficients(&minimum.point, p);
    let (css_std, residuals_std) = css_residuals(&standardized, &ar, &ma);
    let effective = standardized.len().saturating_sub(p).max(1) as f64;
    let sigma2 = css_std / effective * scale * scale;
    if !sigma2.is_finite() {
        return Err(ModelFitError::NumericalFailure(
            "innovation variance is not finite".into(),
        ));
    }

    tracing::debug!(
        %order,
        iterations = minimum.iterations,
        sigma2,
        ar = ?ar,
        ma = ?ma,
        "arma fit converged"
    );

    Ok(FittedArma {
        order,
        ar,
        ma,
        mean,
        sigma2,
        css: css_std * scale * scale,
        iterations: minimum.iterations,
        history: levels.to_vec(),
        working: centred,
        residuals: residuals_std.into_iter().map(|e| e * scale).collect(),
    })
}

impl FittedArma {
    /// Point forecasts for steps `1..=horizon`, in price levels.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let p = self.order.p;
        let q = self.order.q;

        let mut working = self.working.clone();
        let mut residuals = self.residuals.clone();
        let mut ahead = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let n = working.len();
            let mut value = 0.0;
            for (i, phi) in self.ar.iter().enumerate().take(p) {
                if let Some(w) = n.checked_sub(i + 1).map(|k| working[k]) {
                    value += phi * w;
                }
            }
            for (j, theta) in self.ma.iter().enumerate().take(q) {
                if let Some(e) = n.checked_sub(j + 1).map(|k| residuals[k]) {
                    value += theta * e;
                }
            }
            working.push(value);
            residuals.push(0.0);
            ahead.push(value + self.mean);
        }

        integrate(&self.history, self.order.d, ahead)
    }

    /// Forecast error variance for steps `1..=horizon`.
    pub fn forecast_variance(&self, horizon: usize) -> Vec<f64> {
        let psi = psi_weights(&self.ar, &self.ma, self.order.d, horizon);
        let mut acc = 0.0;
        psi.iter()
            .map(|w| {
                acc += w * w;
                self.sigma2 * acc
            })
            .collect()
    }

    pub fn summary(&self) -> String {
        let fmt = |v: &[f64]| {
            v.iter()
                .map(|c| format!("{c:.4}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "ARMA{} ar=[{}] ma=[{}] mean={:.4} sigma2={:.6} iterations={}",
            self.order,
            fmt(&self.ar),
            fmt(&self.ma),
            self.mean,
            self.sigma2,
            self.iterations
        )
    }
}

fn coefficients(u: &[f64], p: usize) -> (Vec<f64>, Vec<f64>) {
    let ar = constrain_stationary(&u[..p]);
    let ma = constrain_stationary(&u[p..]).into_iter().map(|c| -c).collect();
    (ar, ma)
}

/// Conditional residuals with pre-sample residuals set to zero; the first
/// `p` observations only seed the recursion.
fn css_residuals(w: &[f64], ar: &[f64], ma: &[f64]) -> (f64, Vec<f64>) {
    let p = ar.len();
    let mut residuals = vec![0.0; w.len()];
    let mut ss = 0.0;
    for t in p..w.len() {
        let mut e = w[t];
        for (i, phi) in ar.iter().enumerate() {
            e -= phi * w[t - i - 1];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                e -= theta * residuals[t - j - 1];
            }
        }
        residuals[t] = e;
        ss += e * e;
    }
    (ss, residuals)
}

/// Hannan–Rissanen: long AR for residual estimates, then OLS on lagged
/// values and lagged residuals.
fn hannan_rissanen(w: &[f64], p: usize, q: usize) -> Option<(Vec<f64>, Vec<f64>)> {
    let n = w.len();
    if p + q == 0 {
        return Some((Vec::new(), Vec::new()));
    }

    let m = (p + q + 1).max(MAX_LONG_AR.min(n / 4));
    if m >= n / 2 {
        return None;
    }

    let long_ar = levinson_durbin(&autocovariance(w, m), m)?;
    let mut resid = vec![0.0; n];
    for t in m..n {
        resid[t] = w[t] - (0..m).map(|i| long_ar[i] * w[t - i - 1]).sum::<f64>();
    }

    let begin = m + q.max(p);
    let mut rows = Vec::with_capacity(n.saturating_sub(begin));
    let mut targets = Vec::with_capacity(n.saturating_sub(begin));
    for t in begin..n {
        let mut row: Vec<f64> = (1..=p).map(|i| w[t - i]).collect();
        row.extend((1..=q).map(|j| resid[t - j]));
        rows.push(row);
        targets.push(w[t]);
    }
    if rows.len() <= p + q {
        return None;
    }

    let beta = least_squares(&rows, &targets)?;
    Some((beta[..p].to_vec(), beta[p..].to_vec()))
}

fn difference(levels: &[f64], d: usize) -> Vec<f64> {
    let mut out = levels.to_vec();
    for _ in 0..d {
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Undo `d` rounds of differencing, anchoring each round on the last
/// observed value at that differencing level.
fn integrate(history: &[f64], d: usize, mut ahead: Vec<f64>) -> Vec<f64> {
    for level in (0..d).rev() {
        let anchor = difference(history, level).last().copied().unwrap_or(0.0);
        let mut prev = anchor;
        for v in ahead.iter_mut() {
            prev += *v;
            *v = prev;
        }
    }
    ahead
}

fn sample_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// MA(∞) weights of `θ(B) / (φ(B)(1 - B)^d)`, starting with `ψ_0 = 1`.
fn psi_weights(ar: &[f64], ma: &[f64], d: usize, count: usize) -> Vec<f64> {
    // 1 - φ_1 B - ... as polynomial coefficients, times (1 - B)^d.
    let mut poly: Vec<f64> = std::iter::once(1.0).chain(ar.iter().map(|c| -c)).collect();
    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }
    let full_ar: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

    let mut psi = Vec::with_capacity(count);
    for j in 0..count {
        let mut value = if j == 0 {
            1.0
        } else {
            ma.get(j - 1).copied().unwrap_or(0.0)
        };
        for (i, a) in full_ar.iter().enumerate() {
            let lag = i + 1;
            if lag <= j {
                value += a * psi[j - lag];
            }
        }
        psi.push(value);
    }
    psi
}

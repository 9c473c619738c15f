//! Derivative-free minimization (Nelder–Mead simplex).
//!
//! Fully deterministic: the same objective and start point always walk the
//! same path, which keeps repeated screening passes bit-identical.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    #[error("simplex did not converge within {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("objective is not finite anywhere on the simplex")]
    NonFinite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMead {
    pub max_iterations: usize,
    /// Relative spread of objective values across the simplex.
    pub f_tolerance: f64,
    /// Largest coordinate distance from the best vertex.
    pub x_tolerance: f64,
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 5_000,
            f_tolerance: 1e-10,
            x_tolerance: 1e-8,
            initial_step: 0.1,
        }
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    pub fn minimize<F>(&self, objective: F, start: &[f64]) -> Result<Minimum, OptimizeError>
    where
        F: Fn(&[f64]) -> f64,
    {
        let f = |x: &[f64]| {
            let v = objective(x);
            if v.is_nan() {
                f64::INFINITY
            } else {
                v
            }
        };

        let dim = start.len();
        if dim == 0 {
            let value = f(start);
            if !value.is_finite() {
                return Err(OptimizeError::NonFinite);
            }
            return Ok(Minimum {
                point: Vec::new(),
                value,
                iterations: 0,
            });
        }

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
        simplex.push(start.to_vec());
        for i in 0..dim {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step;
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| f(v)).collect();

        let mut iterations = 0;
        loop {
            sort_simplex(&mut simplex, &mut values);
            let best = values[0];
            let worst = values[dim];

            if !best.is_finite() && iterations > 0 {
                return Err(OptimizeError::NonFinite);
            }
            if best.is_finite() && self.has_converged(&simplex, &values) {
                return Ok(Minimum {
                    point: simplex.swap_remove(0),
                    value: best,
                    iterations,
                });
            }
            if iterations >= self.max_iterations {
                return Err(OptimizeError::NotConverged { iterations });
            }
            iterations += 1;

            let centroid = centroid(&simplex[..dim]);
            let reflected = along(&centroid, &simplex[dim], -REFLECT);
            let f_reflected = f(&reflected);

            if f_reflected < best {
                let expanded = along(&centroid, &simplex[dim], -REFLECT * EXPAND);
                let f_expanded = f(&expanded);
                if f_expanded < f_reflected {
                    simplex[dim] = expanded;
                    values[dim] = f_expanded;
                } else {
                    simplex[dim] = reflected;
                    values[dim] = f_reflected;
                }
                continue;
            }

            if f_reflected < values[dim - 1] {
                simplex[dim] = reflected;
                values[dim] = f_reflected;
                continue;
            }

            let (contracted, f_contracted) = if f_reflected < worst {
                let point = along(&centroid, &simplex[dim], -REFLECT * CONTRACT);
                let value = f(&point);
                (point, value)
            } else {
                let point = along(&centroid, &simplex[dim], CONTRACT);
                let value = f(&point);
                (point, value)
            };

            if f_contracted < f_reflected.min(worst) {
                simplex[dim] = contracted;
                values[dim] = f_contracted;
                continue;
            }

            let anchor = simplex[0].clone();
            for i in 1..=dim {
                for (x, a) in simplex[i].iter_mut().zip(&anchor) {
                    *x = a + SHRINK * (*x - a);
                }
                values[i] = f(&simplex[i]);
            }
        }
    }

    fn has_converged(&self, simplex: &[Vec<f64>], values: &[f64]) -> bool {
        let best = values[0];
        let spread = values[values.len() - 1] - best;
        if spread <= self.f_tolerance * (1.0 + best.abs()) {
            return true;
        }
        let size = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        size <= self.x_tolerance
    }
}

fn sort_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

fn centroid(vertices: &[Vec<f64>]) -> Vec<f64> {
    let n = vertices.len() as f64;
    let dim = vertices[0].len();
    (0..dim)
        .map(|j| vertices.iter().map(|v| v[j]).sum::<f64>() / n)
        .collect()
}

/// `centroid + t * (vertex - centroid)`.
fn along(centroid: &[f64], vertex: &[f64], t: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(vertex)
        .map(|(c, v)| c + t * (v - c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_quadratic_minimum() {
        let nm = NelderMead::default();
        let min = nm
            .minimize(|x| (x[0] - 1.5).powi(2) + 3.0 * (x[1] + 0.5).powi(2), &[0.0, 0.0])
            .unwrap();
        assert!((min.point[0] - 1.5).abs() < 1e-3);
        assert!((min.point[1] + 0.5).abs() < 1e-3);
        assert!(min.value < 1e-6);
    }

    #[test]
    fn rosenbrock_converges() {
        let nm = NelderMead {
            f_tolerance: 1e-14,
            ..NelderMead::default()
        };
        let min = nm
            .minimize(
                |x| 100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2),
                &[-1.2, 1.0],
            )
            .unwrap();
        assert!((min.point[0] - 1.0).abs() < 1e-2, "{:?}", min.point);
        assert!((min.point[1] - 1.0).abs() < 2e-2, "{:?}", min.point);
    }

    #[test]
    fn zero_dimensional_problem_evaluates_once() {
        let min = NelderMead::default().minimize(|_| 4.0, &[]).unwrap();
        assert_eq!(min.value, 4.0);
        assert_eq!(min.iterations, 0);
    }

    #[test]
    fn nan_everywhere_is_non_finite() {
        let err = NelderMead::default()
            .minimize(|_| f64::NAN, &[0.0])
            .unwrap_err();
        assert_eq!(err, OptimizeError::NonFinite);
    }

    #[test]
    fn iteration_budget_is_enforced() {
        let nm = NelderMead {
            max_iterations: 3,
            f_tolerance: 0.0,
            x_tolerance: 0.0,
            ..NelderMead::default()
        };
        let err = nm.minimize(|x| x[0].powi(2) + x[1].powi(2), &[5.0, 5.0]).unwrap_err();
        assert_eq!(err, OptimizeError::NotConverged { iterations: 3 });
    }

    #[test]
    fn deterministic_path() {
        let nm = NelderMead::default();
        let obj = |x: &[f64]| (x[0] - 0.3).powi(4) + (x[1] * x[0] - 0.1).powi(2);
        let a = nm.minimize(obj, &[1.0, 1.0]).unwrap();
        let b = nm.minimize(obj, &[1.0, 1.0]).unwrap();
        assert_eq!(a, b);
    }
}

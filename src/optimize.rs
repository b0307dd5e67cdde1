//! Derivative-free minimisation (Nelder-Mead simplex)

use ndarray::Array1;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Relative step used to build the initial simplex around a non-zero coordinate
const NONZERO_STEP: f64 = 0.05;
/// Absolute step used for a coordinate that starts at zero
const ZERO_STEP: f64 = 0.000_25;

/// Simplex search settings
#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    /// Stop when both the vertex spread and the value spread fall below this
    pub tolerance: f64,
    pub max_iterations: usize,
}

/// Result of a minimisation run
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Array1<f64>,
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    /// `false` when `max_iterations` ran out before the tolerance was met
    pub converged: bool,
}

impl NelderMead {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Minimise `objective` starting from `x0`
    ///
    /// NaN objective values are treated as `+inf`, so the simplex moves away
    /// from regions where the objective is undefined.
    pub fn minimize<F>(&self, objective: F, x0: &Array1<f64>) -> Minimum
    where
        F: Fn(&Array1<f64>) -> f64,
    {
        let n = x0.len();
        let mut evaluations = 0;
        let mut eval = |x: &Array1<f64>| {
            evaluations += 1;
            let value = objective(x);
            if value.is_nan() {
                f64::INFINITY
            } else {
                value
            }
        };

        let mut simplex: Vec<(Array1<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((x0.clone(), eval(x0)));
        for k in 0..n {
            let mut vertex = x0.clone();
            vertex[k] = if vertex[k] != 0.0 {
                vertex[k] * (1.0 + NONZERO_STEP)
            } else {
                ZERO_STEP
            };
            let value = eval(&vertex);
            simplex.push((vertex, value));
        }
        sort_simplex(&mut simplex);

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            if self.within_tolerance(&simplex) {
                converged = true;
                break;
            }

            let worst = &simplex[n].0;
            let centroid = simplex[..n]
                .iter()
                .fold(Array1::<f64>::zeros(n), |acc, (x, _)| acc + x)
                / n as f64;

            let reflected = &centroid * (1.0 + REFLECTION) - worst * REFLECTION;
            let f_reflected = eval(&reflected);
            let mut shrink = false;

            if f_reflected < simplex[0].1 {
                let expanded =
                    &centroid * (1.0 + REFLECTION * EXPANSION) - worst * (REFLECTION * EXPANSION);
                let f_expanded = eval(&expanded);
                simplex[n] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
            } else if f_reflected < simplex[n - 1].1 {
                simplex[n] = (reflected, f_reflected);
            } else if f_reflected < simplex[n].1 {
                let outside = &centroid * (1.0 + CONTRACTION * REFLECTION)
                    - worst * (CONTRACTION * REFLECTION);
                let f_outside = eval(&outside);
                if f_outside <= f_reflected {
                    simplex[n] = (outside, f_outside);
                } else {
                    shrink = true;
                }
            } else {
                let inside = &centroid * (1.0 - CONTRACTION) + worst * CONTRACTION;
                let f_inside = eval(&inside);
                if f_inside < simplex[n].1 {
                    simplex[n] = (inside, f_inside);
                } else {
                    shrink = true;
                }
            }

            if shrink {
                let best = simplex[0].0.clone();
                for vertex in simplex.iter_mut().skip(1) {
                    let moved = &best + &((&vertex.0 - &best) * SHRINK);
                    let value = eval(&moved);
                    *vertex = (moved, value);
                }
            }

            sort_simplex(&mut simplex);
            iterations += 1;
        }

        if !converged {
            converged = self.within_tolerance(&simplex);
        }

        let (x, value) = simplex.swap_remove(0);
        Minimum {
            x,
            value,
            iterations,
            evaluations,
            converged,
        }
    }

    fn within_tolerance(&self, simplex: &[(Array1<f64>, f64)]) -> bool {
        let (best, f_best) = &simplex[0];
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|(x, _)| x.iter().zip(best.iter()).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        let f_spread = simplex[1..]
            .iter()
            .map(|(_, f)| (f - f_best).abs())
            .fold(0.0, f64::max);

        x_spread <= self.tolerance && f_spread <= self.tolerance
    }
}

fn sort_simplex(simplex: &mut [(Array1<f64>, f64)]) {
    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
}

//! BG/NBD (Beta-Geometric / Negative Binomial) purchase model

use ndarray::{array, Array1};
use tracing::debug;

use crate::error::{ChurnError, ChurnResult};
use crate::optimize::NelderMead;
use crate::summary::CustomerSummary;

/// Largest magnitude a fitted log-parameter may reach on the rescaled time axis
///
/// Beyond this the likelihood is flat along some direction and the optimiser
/// has walked off towards a boundary of the parameter space.
const MAX_LOG_PARAM: f64 = 10.0;

/// Something that can be fitted over a whole cohort of summaries
pub trait AliveModel {
    type Fitted: AliveEstimate;

    fn fit(&self, cohort: &[CustomerSummary]) -> ChurnResult<Self::Fitted>;
}

/// A fitted model that scores a single customer
pub trait AliveEstimate {
    /// Probability in `[0, 1]` that the customer is still purchasing
    fn prob_alive(&self, customer: &CustomerSummary) -> f64;
}

/// Fitted BG/NBD parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaGeoParams {
    /// Shape of the purchase-rate gamma mixing distribution
    pub r: f64,
    /// Scale of the purchase-rate gamma mixing distribution, in days
    pub alpha: f64,
    /// Beta dropout parameters
    pub a: f64,
    pub b: f64,
}

impl BetaGeoParams {
    /// Probability that a customer with this history has not dropped out
    ///
    /// # Arguments
    /// * `frequency` - Repeat purchases
    /// * `recency` - Time of the last purchase, measured from the first
    /// * `t` - Length of the observation window
    pub fn conditional_probability_alive(&self, frequency: f64, recency: f64, t: f64) -> f64 {
        if frequency == 0.0 {
            return 1.0;
        }

        let log_div = (self.r + frequency) * ((t - recency) / (self.alpha + recency)).ln_1p()
            + (self.a / (self.b + frequency - 1.0)).ln();

        1.0 / (1.0 + log_div.exp())
    }

    /// Log-likelihood of one customer's history under these parameters
    pub fn log_likelihood(&self, frequency: f64, recency: f64, t: f64) -> f64 {
        let Self { r, alpha, a, b } = *self;
        let x = frequency;

        let a1 = ln_gamma(r + x) - ln_gamma(r) + r * alpha.ln();
        let a2 = ln_gamma(a + b) + ln_gamma(b + x) - ln_gamma(b) - ln_gamma(a + b + x);
        let a3 = -(r + x) * (alpha + t).ln();

        if x > 0.0 {
            let a4 = a.ln() - (b + x - 1.0).ln() - (r + x) * (recency + alpha).ln();
            let max = a3.max(a4);
            a1 + a2 + max + ((a3 - max).exp() + (a4 - max).exp()).ln()
        } else {
            a1 + a2 + a3
        }
    }

    fn from_log(log_params: &Array1<f64>) -> Self {
        Self {
            r: log_params[0].exp(),
            alpha: log_params[1].exp(),
            a: log_params[2].exp(),
            b: log_params[3].exp(),
        }
    }
}

impl AliveEstimate for BetaGeoParams {
    fn prob_alive(&self, customer: &CustomerSummary) -> f64 {
        self.conditional_probability_alive(
            f64::from(customer.frequency),
            customer.recency,
            customer.t,
        )
    }
}

/// Maximum-likelihood BG/NBD fitter
#[derive(Debug, Clone, Copy)]
pub struct BetaGeoFitter {
    /// L2 penalty on the parameters; 0 disables it
    pub penalizer_coef: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for BetaGeoFitter {
    fn default() -> Self {
        Self {
            penalizer_coef: 0.0,
            tolerance: 1e-7,
            max_iterations: 2000,
        }
    }
}

impl BetaGeoFitter {
    pub fn validate(&self) -> ChurnResult<()> {
        if !(self.penalizer_coef.is_finite() && self.penalizer_coef >= 0.0) {
            return Err(ChurnError::InvalidConfig(format!(
                "penalizer must be a non-negative number, got {}",
                self.penalizer_coef
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ChurnError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(ChurnError::InvalidConfig(
                "max iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Mean negative log-likelihood plus penalty, with `recency` and `t` already rescaled
    fn objective(&self, log_params: &Array1<f64>, cohort: &[(f64, f64, f64)]) -> f64 {
        let params = BetaGeoParams::from_log(log_params);
        let total: f64 = cohort
            .iter()
            .map(|&(x, recency, t)| params.log_likelihood(x, recency, t))
            .sum();
        let penalty = self.penalizer_coef
            * (params.r.powi(2) + params.alpha.powi(2) + params.a.powi(2) + params.b.powi(2));

        -total / cohort.len() as f64 + penalty
    }
}

impl AliveModel for BetaGeoFitter {
    type Fitted = BetaGeoParams;

    fn fit(&self, cohort: &[CustomerSummary]) -> ChurnResult<BetaGeoParams> {
        self.validate()?;
        if cohort.is_empty() {
            return Err(ChurnError::model_fit("cannot fit an empty cohort"));
        }

        let max_t = cohort.iter().map(|c| c.t).fold(0.0, f64::max);
        if !(max_t.is_finite() && max_t > 0.0) {
            return Err(ChurnError::model_fit(
                "observation window is zero for every customer",
            ));
        }

        // Keep the optimiser in a well-conditioned range regardless of time units
        let scale = 10.0 / max_t;
        let scaled: Vec<(f64, f64, f64)> = cohort
            .iter()
            .map(|c| (f64::from(c.frequency), c.recency * scale, c.t * scale))
            .collect();

        let solver = NelderMead::new(self.tolerance, self.max_iterations);
        let start = array![0.1, 0.1, 0.1, 0.1];
        let minimum = solver.minimize(|p| self.objective(p, &scaled), &start);

        if !minimum.value.is_finite() {
            return Err(ChurnError::model_fit(
                "log-likelihood is not finite for this cohort",
            ));
        }
        if !minimum.converged {
            return Err(ChurnError::model_fit(format!(
                "did not converge within {} iterations; try a larger penalizer",
                self.max_iterations
            )));
        }

        let worst = minimum.x.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if worst > MAX_LOG_PARAM {
            return Err(ChurnError::model_fit(format!(
                "parameters diverged (log-scale magnitude {worst:.1}); try a larger penalizer"
            )));
        }

        let mut params = BetaGeoParams::from_log(&minimum.x);
        params.alpha /= scale;

        debug!(
            r = params.r,
            alpha = params.alpha,
            a = params.a,
            b = params.b,
            iterations = minimum.iterations,
            evaluations = minimum.evaluations,
            neg_log_likelihood = minimum.value,
            "fitted BG/NBD model"
        );

        Ok(params)
    }
}

/// Natural log of the gamma function (Lanczos approximation, g = 7, n = 9)
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    const G: f64 = 7.0;

    if x.is_nan() {
        return f64::NAN;
    }
    if x <= 0.0 {
        return f64::INFINITY;
    }
    if x < 0.5 {
        // Reflection formula
        let sin = (std::f64::consts::PI * x).sin();
        return std::f64::consts::PI.ln() - sin.abs().ln() - ln_gamma(1.0 - x);
    }

    let z = x - 1.0;
    let series = COEFFS[1..]
        .iter()
        .enumerate()
        .fold(COEFFS[0], |acc, (i, c)| acc + c / (z + i as f64 + 1.0));
    let t = z + G + 0.5;

    0.5 * (2.0 * std::f64::consts::PI).ln() + (z + 0.5) * t.ln() - t + series.ln()
}

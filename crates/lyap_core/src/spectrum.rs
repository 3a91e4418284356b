use crate::integrator::{Integrator, Scheme};
use crate::ortho::{OrthoMethod, Orthogonalizer};
use crate::traits::{DynamicalSystem, VariationalSystem};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Run lengths and intervals for one spectrum computation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpectrumSettings {
    /// Fixed step size handed to the integrator.
    pub dt: f64,
    /// Integration steps over which stretching factors accumulate.
    pub steps: usize,
    /// Warm-up steps before accumulation begins: the trajectory settles
    /// onto the attractor and the tangent basis aligns. Renormalized on the
    /// same interval, never accumulated.
    pub transient_steps: usize,
    /// Integration steps between renormalization passes. Longer intervals
    /// cost accuracy near tangencies; the tangent vectors all fold onto the
    /// most unstable direction if left unchecked.
    pub renorm_interval: usize,
}

impl Default for SpectrumSettings {
    fn default() -> Self {
        Self {
            dt: 0.01,
            steps: 100_000,
            transient_steps: 1_000,
            renorm_interval: 10,
        }
    }
}

/// Outcome of one spectrum run.
#[derive(Debug, Clone, Serialize)]
pub struct SpectrumReport {
    /// Estimated Lyapunov exponents, ordered by the initial tangent basis
    /// (identity seed puts the largest first as the vectors sort
    /// themselves); never re-sorted after the fact.
    pub exponents: Vec<f64>,
    /// Time accumulated after the transient.
    pub elapsed: f64,
    /// Accumulation steps actually taken.
    pub steps: usize,
    /// Renormalization passes performed.
    pub renorms: usize,
}

impl SpectrumReport {
    pub fn kaplan_yorke_dimension(&self) -> f64 {
        kaplan_yorke(&self.exponents)
    }
}

/// Estimates the full Lyapunov spectrum of `model` by joint integration of
/// the trajectory and an identity-seeded tangent basis, renormalizing every
/// `renorm_interval` steps and accumulating the logarithms of the
/// stretching factors.
///
/// Aborts (never retries, never truncates silently) when the state turns
/// non-finite or the tangent basis collapses; the error names the time of
/// failure so the caller can retry with a smaller step or a shorter
/// renormalization interval.
pub fn lyapunov_spectrum<M>(
    model: M,
    scheme: Scheme,
    method: OrthoMethod,
    settings: SpectrumSettings,
) -> Result<SpectrumReport>
where
    M: VariationalSystem<f64>,
{
    if settings.steps == 0 {
        bail!("Spectrum accumulation requires at least one integration step.");
    }
    if settings.renorm_interval == 0 {
        bail!("renorm_interval must be at least 1.");
    }

    let dim = model.equation_count();
    let mut integrator = Integrator::with_spectrum(model, scheme, settings.dt)?;
    integrator.init();
    let mut ortho = Orthogonalizer::new(method, dim, dim);
    let mut norms = vec![0.0; dim];
    let mut accum = vec![0.0; dim];

    let mut remaining = settings.transient_steps;
    while remaining > 0 {
        let block = remaining.min(settings.renorm_interval);
        advance(&mut integrator, block)?;
        renormalize(&mut integrator, &mut ortho, &mut norms)?;
        remaining -= block;
    }

    let start_time = integrator.time();
    let mut steps_done = 0usize;
    let mut renorms = 0usize;
    while steps_done < settings.steps {
        let block = (settings.steps - steps_done).min(settings.renorm_interval);
        advance(&mut integrator, block)?;
        steps_done += block;
        renormalize(&mut integrator, &mut ortho, &mut norms)?;
        renorms += 1;
        for (sum, &r) in accum.iter_mut().zip(norms.iter()) {
            *sum += r.ln();
        }
    }

    let elapsed = integrator.time() - start_time;
    if elapsed <= 0.0 {
        bail!("Total integration time is zero; cannot normalize exponents.");
    }
    for value in &mut accum {
        *value /= elapsed;
    }
    debug!(dim, steps = steps_done, renorms, elapsed, "spectrum run complete");

    Ok(SpectrumReport {
        exponents: accum,
        elapsed,
        steps: steps_done,
        renorms,
    })
}

fn advance<S: DynamicalSystem<f64>>(integrator: &mut Integrator<S>, steps: usize) -> Result<()> {
    for _ in 0..steps {
        integrator.step();
    }
    if let Some(index) = integrator.solution().first_non_finite() {
        bail!(
            "State became non-finite at t = {} (flat index {}); reduce the step size.",
            integrator.time(),
            index
        );
    }
    Ok(())
}

fn renormalize<S: DynamicalSystem<f64>>(
    integrator: &mut Integrator<S>,
    ortho: &mut Orthogonalizer,
    norms: &mut [f64],
) -> Result<()> {
    let time = integrator.time();
    ortho
        .perform(integrator.solution_mut().tangent_mut(), norms)
        .with_context(|| format!("Orthonormalization failed at t = {time}."))
}

/// Kaplan-Yorke (Lyapunov) dimension of a spectrum: the largest k whose
/// partial sum of descending exponents stays non-negative, plus the
/// fractional part carried by the next exponent. Empty input yields 0.
pub fn kaplan_yorke(exponents: &[f64]) -> f64 {
    let mut sorted = exponents.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut partial = 0.0;
    let mut k = 0usize;
    for (index, &lambda) in sorted.iter().enumerate() {
        let extended = partial + lambda;
        if extended >= 0.0 {
            partial = extended;
            k = index + 1;
        } else {
            if lambda.abs() <= f64::EPSILON {
                return k as f64;
            }
            return k as f64 + partial / lambda.abs();
        }
    }
    k as f64
}

#[cfg(test)]
mod tests {
    use super::{kaplan_yorke, lyapunov_spectrum, SpectrumSettings};
    use crate::integrator::Scheme;
    use crate::ortho::OrthoMethod;
    use crate::systems::{Henon, Lorenz};
    use crate::traits::{DynamicalSystem, VariationalSystem};

    /// dx/dt = rate * x; its only exponent is `rate`.
    struct LinearFlow {
        rate: f64,
    }

    impl DynamicalSystem<f64> for LinearFlow {
        fn equation_count(&self) -> usize {
            1
        }

        fn derivatives(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = self.rate * x[0];
        }

        fn initial_state(&self, out: &mut [f64]) {
            out[0] = 1.0;
        }
    }

    impl VariationalSystem<f64> for LinearFlow {
        fn tangent_derivatives(&self, _t: f64, _x: &[f64], tangent: &[f64], out: &mut [f64]) {
            out[0] = self.rate * tangent[0];
        }
    }

    /// dx/dt = x^2 blows up in finite time from x(0) = 1.
    struct FiniteTimeBlowup;

    impl DynamicalSystem<f64> for FiniteTimeBlowup {
        fn equation_count(&self) -> usize {
            1
        }

        fn derivatives(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = x[0] * x[0];
        }

        fn initial_state(&self, out: &mut [f64]) {
            out[0] = 1.0;
        }
    }

    impl VariationalSystem<f64> for FiniteTimeBlowup {
        fn tangent_derivatives(&self, _t: f64, x: &[f64], tangent: &[f64], out: &mut [f64]) {
            out[0] = 2.0 * x[0] * tangent[0];
        }
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn settings_are_validated() {
        let bad_steps = SpectrumSettings {
            steps: 0,
            ..SpectrumSettings::default()
        };
        assert_err_contains(
            lyapunov_spectrum(
                LinearFlow { rate: 1.0 },
                Scheme::Rk4,
                OrthoMethod::ModifiedGramSchmidt,
                bad_steps,
            ),
            "at least one integration step",
        );

        let bad_interval = SpectrumSettings {
            renorm_interval: 0,
            ..SpectrumSettings::default()
        };
        assert_err_contains(
            lyapunov_spectrum(
                LinearFlow { rate: 1.0 },
                Scheme::Rk4,
                OrthoMethod::ModifiedGramSchmidt,
                bad_interval,
            ),
            "renorm_interval",
        );

        let bad_dt = SpectrumSettings {
            dt: 0.0,
            ..SpectrumSettings::default()
        };
        assert_err_contains(
            lyapunov_spectrum(
                LinearFlow { rate: 1.0 },
                Scheme::Rk4,
                OrthoMethod::ModifiedGramSchmidt,
                bad_dt,
            ),
            "step size",
        );
    }

    #[test]
    fn linear_flow_exponent_matches_the_rate() {
        let settings = SpectrumSettings {
            dt: 0.05,
            steps: 2_000,
            transient_steps: 100,
            renorm_interval: 5,
        };
        let report = lyapunov_spectrum(
            LinearFlow { rate: -1.0 },
            Scheme::Rk4,
            OrthoMethod::ModifiedGramSchmidt,
            settings,
        )
        .expect("spectrum should compute");
        assert_eq!(report.exponents.len(), 1);
        assert!((report.exponents[0] + 1.0).abs() < 1e-2);
        assert_eq!(report.steps, 2_000);
    }

    #[test]
    fn henon_spectrum_matches_published_values() {
        let settings = SpectrumSettings {
            dt: 1.0,
            steps: 50_000,
            transient_steps: 1_000,
            renorm_interval: 1,
        };
        let report = lyapunov_spectrum(
            Henon::default(),
            Scheme::Discrete,
            OrthoMethod::Householder,
            settings,
        )
        .expect("spectrum should compute");

        // Largest exponent approx 0.419 nats/iteration (a = 1.4, b = 0.3).
        let largest = report.exponents[0];
        assert!(
            (largest - 0.419).abs() / 0.419 < 0.05,
            "largest exponent {largest}"
        );
        // The sum tracks ln|det J| = ln(b) exactly, per iterate.
        let sum: f64 = report.exponents.iter().sum();
        assert!((sum - 0.3_f64.ln()).abs() < 1e-8, "sum {sum}");
    }

    #[test]
    fn lorenz_spectrum_has_the_known_signature() {
        let settings = SpectrumSettings {
            dt: 0.01,
            steps: 30_000,
            transient_steps: 2_000,
            renorm_interval: 10,
        };
        let report = lyapunov_spectrum(
            Lorenz::default(),
            Scheme::Rk4,
            OrthoMethod::ModifiedGramSchmidt,
            settings,
        )
        .expect("spectrum should compute");

        let [l1, l2, l3]: [f64; 3] = report.exponents.clone().try_into().unwrap();
        assert!(l1 > 0.75 && l1 < 1.05, "l1 = {l1}");
        assert!(l2.abs() < 0.1, "l2 = {l2}");
        assert!(l3 < -13.0, "l3 = {l3}");
        // Divergence of the Lorenz field is constant: -(sigma + 1 + beta).
        let sum = l1 + l2 + l3;
        assert!((sum + 13.0 + 2.0 / 3.0).abs() < 0.5, "sum = {sum}");

        // 2 < D_KY < 3 for the canonical attractor.
        let dim = report.kaplan_yorke_dimension();
        assert!(dim > 2.0 && dim < 2.2, "D_KY = {dim}");
    }

    #[test]
    fn divergence_aborts_with_time_context() {
        let settings = SpectrumSettings {
            dt: 0.5,
            steps: 1_000,
            transient_steps: 0,
            renorm_interval: 10,
        };
        assert_err_contains(
            lyapunov_spectrum(
                FiniteTimeBlowup,
                Scheme::Rk4,
                OrthoMethod::ModifiedGramSchmidt,
                settings,
            ),
            "non-finite",
        );
    }

    #[test]
    fn kaplan_yorke_handles_empty_and_partial_sums() {
        assert_eq!(kaplan_yorke(&[]), 0.0);
        // 0.1 + 0.0 stays non-negative, then -1.0 contributes 0.1/1.0.
        let result = kaplan_yorke(&[0.1, 0.0, -1.0]);
        assert!((result - 2.1).abs() < 1e-12);
        // All positive: dimension saturates at the count.
        assert_eq!(kaplan_yorke(&[0.5, 0.2]), 2.0);
    }
}

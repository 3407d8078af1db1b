//! Poisson mixture families: the per-case transmission rate is drawn from a
//! continuous mixing distribution (log-normal or Weibull) and offspring
//! counts are Poisson around it. The marginal pmfs have no closed form and
//! are evaluated by Gaussian quadrature.

use statrs::function::gamma::{digamma, gamma};

use crate::error::{Error, Result};
use crate::models::{
    FitResult, ModelFamily, OffspringParams, ParameterEstimate, frequency_table, ln_poisson_pmf,
    log_sum_exp,
};
use crate::optim::{NelderMead, hessian, std_errors_from_information};
use crate::quadrature::{QuadratureRule, gauss_hermite, gauss_laguerre};
use crate::sample::OffspringSample;

const QUADRATURE_NODES: usize = 40;

fn fail(family: ModelFamily, reason: &str) -> Error {
    Error::FitConvergence {
        family,
        reason: reason.to_string(),
    }
}

/// log pmf of a Poisson mixed over a log-normal rate, by Gauss-Hermite
/// quadrature: with lambda = exp(mu_log + sqrt(2) sigma t),
/// P(x) = pi^(-1/2) * sum_j w_j Poisson(x | lambda_j).
fn ln_pmf_log_normal(rule: &QuadratureRule, x: u64, mu_log: f64, sigma_log: f64) -> f64 {
    let ln_norm = std::f64::consts::PI.sqrt().ln();
    let terms: Vec<f64> = rule
        .nodes
        .iter()
        .zip(&rule.weights)
        .map(|(&t, &w)| {
            let rate = (mu_log + std::f64::consts::SQRT_2 * sigma_log * t).exp();
            w.ln() - ln_norm + ln_poisson_pmf(x, rate)
        })
        .collect();
    log_sum_exp(&terms)
}

/// log pmf of a Poisson mixed over a Weibull rate, by Gauss-Laguerre
/// quadrature after substituting u = (lambda / scale)^shape:
/// P(x) = sum_j w_j Poisson(x | scale * u_j^(1/shape)).
fn ln_pmf_weibull(rule: &QuadratureRule, x: u64, shape: f64, scale: f64) -> f64 {
    let terms: Vec<f64> = rule
        .nodes
        .iter()
        .zip(&rule.weights)
        .map(|(&u, &w)| {
            let rate = scale * u.powf(1.0 / shape);
            w.ln() + ln_poisson_pmf(x, rate)
        })
        .collect();
    log_sum_exp(&terms)
}

fn mixture_log_likelihood<F>(table: &[(u64, u64)], ln_pmf: F) -> f64
where
    F: Fn(u64) -> f64,
{
    table
        .iter()
        .map(|&(x, freq)| freq as f64 * ln_pmf(x))
        .sum()
}

pub fn fit_log_normal(sample: &OffspringSample) -> Result<FitResult> {
    let family = ModelFamily::PoissonLogNormal;
    let mean = sample.mean();
    if mean == 0.0 {
        return Err(fail(family, "no secondary transmissions observed"));
    }
    let table = frequency_table(sample);
    let rule = gauss_hermite(QUADRATURE_NODES);

    // Moment seeds: excess variance of the mixed count fixes sigma², then
    // mu_log recovers the rate mean exp(mu_log + sigma²/2).
    let variance = sample.variance();
    let sigma_seed = if variance > mean {
        (1.0 + (variance - mean) / (mean * mean)).ln().sqrt().max(0.1)
    } else {
        0.5
    };
    let mu_seed = mean.ln() - sigma_seed * sigma_seed / 2.0;

    let neg_ll = |mu_log: f64, sigma_log: f64| {
        -mixture_log_likelihood(&table, |x| ln_pmf_log_normal(&rule, x, mu_log, sigma_log))
    };
    let objective = |theta: &[f64]| {
        let sigma = theta[1].exp();
        if !theta[0].is_finite() || !sigma.is_finite() {
            return f64::MAX;
        }
        let v = neg_ll(theta[0], sigma);
        if v.is_finite() { v } else { f64::MAX }
    };

    let minimum = NelderMead::default()
        .minimize(objective, &[mu_seed, sigma_seed.ln()])
        .ok_or_else(|| fail(family, "optimizer did not converge"))?;
    let mu_log = minimum.point[0];
    let sigma_log = minimum.point[1].exp();
    if mu_log.abs() > 30.0 || !(1e-6..=10.0).contains(&sigma_log) {
        return Err(fail(family, "parameter estimates diverged"));
    }

    let information = hessian(|theta: &[f64]| neg_ll(theta[0], theta[1]), &[mu_log, sigma_log]);
    let (std_errs, cov) = std_errors_from_information(&information)
        .ok_or_else(|| fail(family, "observed information matrix is singular"))?;

    // Rate mean and moment-matched dispersion of the log-normal mixture:
    // R = exp(mu_log + sigma²/2), k = 1 / (exp(sigma²) - 1).
    let r = (mu_log + sigma_log * sigma_log / 2.0).exp();
    let excess = (sigma_log * sigma_log).exp_m1();
    let k = if excess > 0.0 { 1.0 / excess } else { f64::INFINITY };
    // Delta method: dR/dmu_log = R, dR/dsigma_log = R * sigma_log.
    let g = [r, r * sigma_log];
    let r_var = g[0] * g[0] * cov[(0, 0)] + 2.0 * g[0] * g[1] * cov[(0, 1)] + g[1] * g[1] * cov[(1, 1)];
    let r_std_err = r_var.max(0.0).sqrt();

    Ok(FitResult {
        family,
        estimates: vec![
            ParameterEstimate {
                name: "meanlog",
                value: mu_log,
                std_err: std_errs[0],
            },
            ParameterEstimate {
                name: "sdlog",
                value: sigma_log,
                std_err: std_errs[1],
            },
        ],
        log_likelihood: -minimum.value,
        n_obs: sample.len(),
        offspring: OffspringParams { r, r_std_err, k },
    })
}

pub fn fit_weibull(sample: &OffspringSample) -> Result<FitResult> {
    let family = ModelFamily::PoissonWeibull;
    let mean = sample.mean();
    if mean == 0.0 {
        return Err(fail(family, "no secondary transmissions observed"));
    }
    let table = frequency_table(sample);
    let rule = gauss_laguerre(QUADRATURE_NODES);

    let neg_ll = |shape: f64, scale: f64| {
        -mixture_log_likelihood(&table, |x| ln_pmf_weibull(&rule, x, shape, scale))
    };
    let objective = |theta: &[f64]| {
        let shape = theta[0].exp();
        let scale = theta[1].exp();
        if !shape.is_finite() || !scale.is_finite() {
            return f64::MAX;
        }
        let v = neg_ll(shape, scale);
        if v.is_finite() { v } else { f64::MAX }
    };

    // Shape 1 is an exponential rate mixture with mean equal to the scale.
    let minimum = NelderMead::default()
        .minimize(objective, &[0.0, mean.ln()])
        .ok_or_else(|| fail(family, "optimizer did not converge"))?;
    let shape = minimum.point[0].exp();
    let scale = minimum.point[1].exp();
    if !(0.05..=50.0).contains(&shape) || !(1e-6..=1e6).contains(&scale) {
        return Err(fail(family, "parameter estimates diverged"));
    }

    let information = hessian(|theta: &[f64]| neg_ll(theta[0], theta[1]), &[shape, scale]);
    let (std_errs, cov) = std_errors_from_information(&information)
        .ok_or_else(|| fail(family, "observed information matrix is singular"))?;

    // Weibull rate moments: Gamma_i = Γ(1 + i/shape).
    let gamma1 = gamma(1.0 + 1.0 / shape);
    let gamma2 = gamma(1.0 + 2.0 / shape);
    let r = scale * gamma1;
    let excess = gamma2 - gamma1 * gamma1;
    let k = if excess > 1e-12 {
        gamma1 * gamma1 / excess
    } else {
        f64::INFINITY
    };
    // Delta method on (shape, scale).
    let dr_dshape = -scale / (shape * shape) * gamma1 * digamma(1.0 + 1.0 / shape);
    let dr_dscale = gamma1;
    let r_var = dr_dshape * dr_dshape * cov[(0, 0)]
        + 2.0 * dr_dshape * dr_dscale * cov[(0, 1)]
        + dr_dscale * dr_dscale * cov[(1, 1)];
    let r_std_err = r_var.max(0.0).sqrt();

    Ok(FitResult {
        family,
        estimates: vec![
            ParameterEstimate {
                name: "shape",
                value: shape,
                std_err: std_errs[0],
            },
            ParameterEstimate {
                name: "scale",
                value: scale,
                std_err: std_errs[1],
            },
        ],
        log_likelihood: -minimum.value,
        n_obs: sample.len(),
        offspring: OffspringParams { r, r_std_err, k },
    })
}

//! Downstream risk metrics, each a pure function of the offspring mean R
//! and dispersion k (k = ∞ is the homogeneous Poisson limit) plus its own
//! policy parameters. Nothing here is simulated; every quantity comes from
//! the analytic branching-process theory of a negative-binomial offspring
//! distribution.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Gamma};
use statrs::function::gamma::ln_gamma;

use crate::error::{Error, Result};
use crate::models::ln_factorial;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClusterTailProbability {
    pub cluster_size: u64,
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TransmissionConcentration {
    /// Requested fraction of total onward transmission.
    pub fraction: f64,
    /// Minimum proportion of cases, ranked by individual reproduction
    /// number, that jointly account for `fraction` of transmission.
    pub proportion: f64,
}

fn validate_offspring(r: f64, k: f64) -> Result<()> {
    if !r.is_finite() || r < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "offspring mean R must be finite and non-negative, got {r}"
        )));
    }
    if k.is_nan() || k <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "dispersion k must be positive, got {k}"
        )));
    }
    Ok(())
}

/// Probability that a transmission chain seeded by one case contains
/// exactly `j` cases, for a negative-binomial offspring distribution
/// (Blumberg & Lloyd-Smith's closed form), or its Borel limit when k = ∞.
fn ln_cluster_pmf(r: f64, k: f64, j: u64) -> f64 {
    let j = j as f64;
    if k.is_infinite() {
        // Borel distribution.
        (j - 1.0) * (j * r).ln() - j * r - ln_factorial(j as u64)
    } else {
        ln_gamma(k * j + j - 1.0) - ln_gamma(k * j) - ln_factorial(j as u64)
            + (j - 1.0) * (r / k).ln()
            - (k * j + j - 1.0) * (r / k).ln_1p()
    }
}

/// For each requested cluster size `s`, the probability that the chain
/// started by a single case reaches at least `s` cases.
pub fn cluster_size_tail(r: f64, k: f64, sizes: &[u64]) -> Result<Vec<ClusterTailProbability>> {
    validate_offspring(r, k)?;
    if let Some(&bad) = sizes.iter().find(|&&s| s < 1) {
        return Err(Error::InvalidParameter(format!(
            "cluster size must be at least 1, got {bad}"
        )));
    }
    let max_size = sizes.iter().copied().max().unwrap_or(1);
    // Cumulative chain-size probabilities P(Y <= j) for j < max requested.
    let mut cumulative = vec![0.0; max_size as usize];
    let mut acc = 0.0;
    for j in 1..max_size {
        acc += if r == 0.0 {
            // Chains never grow past the index case.
            if j == 1 { 1.0 } else { 0.0 }
        } else {
            ln_cluster_pmf(r, k, j).exp()
        };
        cumulative[j as usize] = acc;
    }
    Ok(sizes
        .iter()
        .map(|&s| ClusterTailProbability {
            cluster_size: s,
            probability: (1.0 - cumulative[s as usize - 1]).clamp(0.0, 1.0),
        })
        .collect())
}

/// Minimum proportion of cases accounting for `fraction` of all onward
/// transmission, under the gamma model of individual reproduction numbers
/// (ν ~ Gamma(k, ·); the transmission borne by individuals above a rate
/// threshold follows the size-biased Gamma(k + 1, ·)).
pub fn proportion_transmission(r: f64, k: f64, fraction: f64) -> Result<TransmissionConcentration> {
    validate_offspring(r, k)?;
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(Error::InvalidParameter(format!(
            "transmission fraction must be in (0, 1], got {fraction}"
        )));
    }
    let proportion = if fraction == 1.0 {
        1.0
    } else if k.is_infinite() {
        // Homogeneous transmission: cases contribute equally.
        fraction
    } else {
        // The threshold cancels the scale, so rate 1 suffices.
        let size_biased = Gamma::new(k + 1.0, 1.0).expect("validated dispersion");
        let individual = Gamma::new(k, 1.0).expect("validated dispersion");
        let threshold = size_biased.inverse_cdf(1.0 - fraction);
        1.0 - individual.cdf(threshold)
    };
    Ok(TransmissionConcentration {
        fraction,
        proportion,
    })
}

/// Probability that a branching process seeded by `initial` infections,
/// with transmission scaled by (1 - control), dies out: the stable root of
/// q = G(q) in [0, 1], raised to the number of seeds.
pub fn extinction_probability(r: f64, k: f64, initial: u64, control: f64) -> Result<f64> {
    validate_offspring(r, k)?;
    if initial < 1 {
        return Err(Error::InvalidParameter(
            "initial infections must be at least 1".to_string(),
        ));
    }
    if !(0.0..1.0).contains(&control) {
        return Err(Error::InvalidParameter(format!(
            "control effectiveness must be in [0, 1), got {control}"
        )));
    }
    let effective = r * (1.0 - control);
    if effective <= 1.0 {
        // Subcritical or critical: extinction is certain.
        return Ok(1.0);
    }
    let pgf = |q: f64| {
        if k.is_infinite() {
            (effective * (q - 1.0)).exp()
        } else {
            (-k * (effective * (1.0 - q) / k).ln_1p()).exp()
        }
    };
    // g(q) = G(q) - q is positive at 0 and negative just below the trivial
    // root at 1 when the process is supercritical; bisect for the sign
    // change.
    let mut lo = 0.0;
    let mut hi = 1.0 - 1e-9;
    if pgf(hi) - hi >= 0.0 {
        // The stable root is numerically indistinguishable from 1.
        return Ok(1.0);
    }
    for _ in 0..200 {
        let mid = (lo + hi) / 2.0;
        if pgf(mid) - mid > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let root = (lo + hi) / 2.0;
    Ok(root.powf(initial as f64))
}

use log::warn;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{Error, Result};
use crate::metrics::{self, ClusterTailProbability, TransmissionConcentration};
use crate::models::{FitResult, ModelFamily};
use crate::sample::OffspringSample;
use crate::selection::ModelComparison;

/// Policy parameters for a risk-estimation run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Quantile for the upper confidence bound on R.
    pub confidence_level: f64,
    /// Cluster sizes for the tail probabilities.
    pub cluster_sizes: Vec<u64>,
    /// Fraction of transmission for the concentration metric.
    pub transmission_fraction: f64,
    /// Per-individual reduction of transmission for the extinction metric.
    pub control_effectiveness: f64,
    /// Seeds for the extinction metric.
    pub initial_infections: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.975,
            cluster_sizes: vec![5, 10, 20],
            transmission_fraction: 0.8,
            control_effectiveness: 0.0,
            initial_infections: 1,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if let Some(&bad) = self.cluster_sizes.iter().find(|&&s| s < 1) {
            return Err(Error::InvalidParameter(format!(
                "cluster size must be at least 1, got {bad}"
            )));
        }
        if !(self.transmission_fraction > 0.0 && self.transmission_fraction <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "transmission fraction must be in (0, 1], got {}",
                self.transmission_fraction
            )));
        }
        if !(0.0..1.0).contains(&self.control_effectiveness) {
            return Err(Error::InvalidParameter(format!(
                "control effectiveness must be in [0, 1), got {}",
                self.control_effectiveness
            )));
        }
        if self.initial_infections < 1 {
            return Err(Error::InvalidParameter(
                "initial infections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a risk-estimation run produces: the ranked comparison table,
/// the winning fit, the (R, k) pair with its upper bound on R, and the
/// three downstream metrics.
#[derive(Debug, Clone, Serialize)]
pub struct RiskEstimate {
    pub comparison: ModelComparison,
    pub best: FitResult,
    pub r: f64,
    pub r_upper: f64,
    pub k: f64,
    pub cluster_tail: Vec<ClusterTailProbability>,
    pub concentration: TransmissionConcentration,
    pub extinction_probability: f64,
}

/// Fits every candidate family to the sample, selects the best by AICc,
/// and derives the risk metrics from the selected (R, k).
///
/// Per-family fitting failures are recoverable: the family is excluded
/// from the comparison with a warning. Everything downstream of fitting is
/// fatal and propagates to the caller.
pub fn estimate_risk(sample: &OffspringSample, config: &EstimatorConfig) -> Result<RiskEstimate> {
    config.validate()?;

    let mut fits: Vec<FitResult> = Vec::with_capacity(ModelFamily::ALL.len());
    for family in ModelFamily::ALL {
        match family.fit(sample) {
            Ok(fit) => fits.push(fit),
            Err(err) => warn!("excluding {family} from model comparison: {err}"),
        }
    }

    let comparison = ModelComparison::rank(&fits)?;
    let best = fits
        .iter()
        .find(|f| f.family == comparison.best_family())
        .expect("the comparison only ranks fitted families")
        .clone();

    let r = best.offspring.r;
    let k = best.offspring.k;
    let z = Normal::new(0.0, 1.0)
        .expect("standard normal parameters are valid")
        .inverse_cdf(config.confidence_level);
    let r_upper = r + z * best.offspring.r_std_err;

    let cluster_tail = metrics::cluster_size_tail(r, k, &config.cluster_sizes)?;
    let concentration = metrics::proportion_transmission(r, k, config.transmission_fraction)?;
    let extinction_probability = metrics::extinction_probability(
        r,
        k,
        config.initial_infections,
        config.control_effectiveness,
    )?;

    Ok(RiskEstimate {
        comparison,
        best,
        r,
        r_upper,
        k,
        cluster_tail,
        concentration,
        extinction_probability,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::superspreader_sample;

    #[test]
    fn test_superspreader_scenario() {
        let sample = superspreader_sample();
        let estimate = estimate_risk(&sample, &EstimatorConfig::default()).unwrap();

        // The heavy tail over a pile of zeros rules the homogeneous
        // families out.
        let comparison = &estimate.comparison;
        let nb = comparison.aicc_for(ModelFamily::NegBinomial).unwrap();
        let poisson = comparison.aicc_for(ModelFamily::Poisson).unwrap();
        assert!(nb < poisson);
        assert!(!matches!(
            estimate.best.family,
            ModelFamily::Poisson | ModelFamily::Geometric
        ));
        assert!(estimate.k < 1.0, "k = {}", estimate.k);

        assert!(estimate.r > 0.0);
        assert!(estimate.r_upper > estimate.r);
        assert_eq!(estimate.cluster_tail.len(), 3);
        // Subcritical mean: extinction is certain.
        assert_eq!(estimate.extinction_probability, 1.0);
        assert!(estimate.concentration.proportion < 0.5);
    }

    #[test]
    fn test_upper_bound_uses_normal_quantile() {
        let sample = OffspringSample::new(vec![0, 1, 2, 3, 1, 0, 2, 1]).unwrap();
        let estimate = estimate_risk(&sample, &EstimatorConfig::default()).unwrap();
        let expected = estimate.r + 1.959964 * estimate.best.offspring.r_std_err;
        assert!((estimate.r_upper - expected).abs() < 1e-4);
    }

    #[test]
    fn test_supercritical_sample_can_escape_extinction() {
        let sample = OffspringSample::new(vec![0, 1, 2, 3, 4, 0, 5, 3, 2, 4]).unwrap();
        let estimate = estimate_risk(&sample, &EstimatorConfig::default()).unwrap();
        assert!(estimate.r > 1.0);
        assert!(estimate.extinction_probability < 1.0);
    }

    #[test]
    fn test_estimation_is_deterministic() {
        let sample = superspreader_sample();
        let first = estimate_risk(&sample, &EstimatorConfig::default()).unwrap();
        let second = estimate_risk(&sample, &EstimatorConfig::default()).unwrap();
        assert_eq!(first.best.family, second.best.family);
        assert_eq!(first.r, second.r);
        assert_eq!(first.k, second.k);
        assert_eq!(first.extinction_probability, second.extinction_probability);
    }

    #[test]
    fn test_tiny_sample_has_no_converged_model() {
        let sample = OffspringSample::new(vec![2]).unwrap();
        assert!(matches!(
            estimate_risk(&sample, &EstimatorConfig::default()),
            Err(Error::NoConvergedModel)
        ));
    }

    #[test]
    fn test_config_validation() {
        let sample = superspreader_sample();
        let bad = |f: fn(&mut EstimatorConfig)| {
            let mut config = EstimatorConfig::default();
            f(&mut config);
            estimate_risk(&sample, &config)
        };
        assert!(matches!(
            bad(|c| c.confidence_level = 1.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            bad(|c| c.cluster_sizes = vec![5, 0]),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            bad(|c| c.transmission_fraction = 0.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            bad(|c| c.control_effectiveness = 1.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            bad(|c| c.initial_infections = 0),
            Err(Error::InvalidParameter(_))
        ));
    }
}

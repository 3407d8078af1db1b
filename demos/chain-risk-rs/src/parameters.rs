use offspring::EstimatorConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Mean secondary cases per case in the simulated outbreak.
    pub r0: f64,
    /// Dispersion of the simulated offspring distribution.
    pub dispersion: f64,
    pub initial_infections: u64,
    pub max_cases: u64,
    pub max_generations: u64,
    // Estimator policy knobs.
    pub cluster_sizes: Vec<u64>,
    pub transmission_fraction: f64,
    pub control_effectiveness: f64,
    pub confidence_level: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            r0: 1.2,
            dispersion: 0.4,
            initial_infections: 5,
            max_cases: 10_000,
            max_generations: 50,
            cluster_sizes: vec![5, 10, 20],
            transmission_fraction: 0.8,
            control_effectiveness: 0.0,
            confidence_level: 0.975,
        }
    }
}

impl Parameters {
    pub fn estimator_config(&self) -> EstimatorConfig {
        EstimatorConfig {
            confidence_level: self.confidence_level,
            cluster_sizes: self.cluster_sizes.clone(),
            transmission_fraction: self.transmission_fraction,
            control_effectiveness: self.control_effectiveness,
            initial_infections: self.initial_infections,
        }
    }
}

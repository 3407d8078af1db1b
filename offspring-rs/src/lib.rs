//! Offspring-distribution risk estimation for outbreak analytics.
//!
//! Given per-case secondary-infection counts, this crate fits five
//! candidate offspring-distribution families by maximum likelihood, ranks
//! them by corrected AIC, and derives superspreading risk metrics from the
//! selected mean/dispersion pair: cluster-size tail probabilities, the
//! concentration of transmission across cases, and the extinction
//! probability of the branching process.

pub mod error;
pub mod estimator;
pub mod metrics;
pub mod models;
pub mod sample;
pub mod selection;

mod mixture;
mod negbin;
mod optim;
mod quadrature;

pub use error::Error;
pub use estimator::{EstimatorConfig, RiskEstimate, estimate_risk};
pub use models::{FitResult, ModelFamily, OffspringParams, ParameterEstimate};
pub use sample::{OffspringSample, TransmissionEvent};
pub use selection::{ComparisonRow, ModelComparison};

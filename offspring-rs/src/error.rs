use thiserror::Error;

use crate::models::ModelFamily;

/// Errors from sample construction, fitting, selection, and risk metrics.
#[derive(Debug, Error)]
pub enum Error {
    /// The secondary-case-count sample is malformed.
    #[error("invalid sample: {0}")]
    InvalidSample(String),

    /// A single model family failed to fit. Recoverable: the pipeline
    /// excludes the family and continues with the rest.
    #[error("{family} fit did not converge: {reason}")]
    FitConvergence { family: ModelFamily, reason: String },

    /// No candidate family produced a usable fit.
    #[error("no model family converged")]
    NoConvergedModel,

    /// A policy or metric parameter is outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;

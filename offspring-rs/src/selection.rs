use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{FitResult, ModelFamily};

/// Two AICc scores closer than this are treated as tied and the simpler
/// family wins.
const AICC_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow {
    pub family: ModelFamily,
    pub n_params: usize,
    pub log_likelihood: f64,
    pub aicc: f64,
    pub delta_aicc: f64,
}

/// Converged fits ranked by corrected Akaike information criterion,
/// best first.
#[derive(Debug, Clone, Serialize)]
pub struct ModelComparison {
    pub rows: Vec<ComparisonRow>,
}

impl ModelComparison {
    /// Ranks fits by AICc. Near-ties go to the family with fewer free
    /// parameters, then to declaration order, so selection is a pure
    /// deterministic function of the fit results.
    pub fn rank(fits: &[FitResult]) -> Result<Self> {
        if fits.is_empty() {
            return Err(Error::NoConvergedModel);
        }
        let mut scored: Vec<(usize, f64)> = fits.iter().map(|f| f.aicc()).enumerate().collect();
        scored.sort_by(|&(ia, a), &(ib, b)| {
            a.total_cmp(&b)
                .then_with(|| fits[ia].n_params().cmp(&fits[ib].n_params()))
                .then_with(|| family_order(fits[ia].family).cmp(&family_order(fits[ib].family)))
        });
        // Within the tie tolerance of the lowest score, prefer the simpler
        // family; rotate it to the front of the table.
        let tied = scored
            .iter()
            .take_while(|&&(_, aicc)| aicc - scored[0].1 <= AICC_TOLERANCE)
            .count();
        let preferred = (0..tied)
            .min_by_key(|&i| {
                let fit = &fits[scored[i].0];
                (fit.n_params(), family_order(fit.family))
            })
            .expect("at least one fit in the tie window");
        scored[..=preferred].rotate_right(1);
        let best_aicc = scored.iter().map(|s| s.1).fold(f64::INFINITY, f64::min);
        let rows = scored
            .into_iter()
            .map(|(i, aicc)| ComparisonRow {
                family: fits[i].family,
                n_params: fits[i].n_params(),
                log_likelihood: fits[i].log_likelihood,
                aicc,
                delta_aicc: aicc - best_aicc,
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn best_family(&self) -> ModelFamily {
        self.rows[0].family
    }

    pub fn aicc_for(&self, family: ModelFamily) -> Option<f64> {
        self.rows.iter().find(|r| r.family == family).map(|r| r.aicc)
    }
}

fn family_order(family: ModelFamily) -> usize {
    ModelFamily::ALL
        .iter()
        .position(|&f| f == family)
        .expect("family is a member of the closed set")
}

use offspring::RiskEstimate;

pub const COMPARISON_HEADERS: [&str; 5] =
    ["family", "n_params", "log_likelihood", "aicc", "delta_aicc"];

pub const CLUSTER_HEADERS: [&str; 2] = ["cluster_size", "probability"];

pub const SUMMARY_HEADERS: [&str; 6] = [
    "best_family",
    "r",
    "r_upper",
    "k",
    "proportion_for_fraction",
    "extinction_probability",
];

pub fn comparison_rows(estimate: &RiskEstimate) -> Vec<Vec<String>> {
    estimate
        .comparison
        .rows
        .iter()
        .map(|row| {
            vec![
                row.family.to_string(),
                row.n_params.to_string(),
                format!("{:.4}", row.log_likelihood),
                format!("{:.4}", row.aicc),
                format!("{:.4}", row.delta_aicc),
            ]
        })
        .collect()
}

pub fn cluster_rows(estimate: &RiskEstimate) -> Vec<Vec<String>> {
    estimate
        .cluster_tail
        .iter()
        .map(|tail| {
            vec![
                tail.cluster_size.to_string(),
                format!("{:.6}", tail.probability),
            ]
        })
        .collect()
}

pub fn summary_rows(estimate: &RiskEstimate) -> Vec<Vec<String>> {
    vec![vec![
        estimate.best.family.to_string(),
        format!("{:.4}", estimate.r),
        format!("{:.4}", estimate.r_upper),
        format!("{:.4}", estimate.k),
        format!("{:.4}", estimate.concentration.proportion),
        format!("{:.6}", estimate.extinction_probability),
    ]]
}

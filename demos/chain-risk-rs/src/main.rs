pub mod output;
pub mod parameters;
pub mod simulate;

use log::{LevelFilter, info};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use offspring::{OffspringSample, estimate_risk};
use runner::RunEnvironment;

use parameters::Parameters;
use simulate::ChainSimulator;

fn init_logging() {
    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info))
        .expect("logging config is valid");
    log4rs::init_config(config).expect("logging initializes once");
}

fn main() {
    init_logging();

    let env: RunEnvironment<Parameters> =
        RunEnvironment::from_stdin().expect("failed to load run spec");
    let parameters = env.input.clone();

    // Simulate the outbreak
    let log = ChainSimulator::simulate(&parameters, env.seed);
    info!(
        "simulated outbreak: {} cases, {} transmission events",
        log.case_ids.len(),
        log.events.len()
    );

    // Derive the secondary-case-count sample and estimate risk
    let sample = OffspringSample::from_transmission_log(&log.case_ids, &log.events)
        .expect("simulated log yields a valid sample");
    let estimate =
        estimate_risk(&sample, &parameters.estimator_config()).expect("risk estimation failed");
    info!(
        "selected {} with R = {:.3}, k = {:.3}",
        estimate.best.family, estimate.r, estimate.k
    );

    env.write_csv(
        "model_comparison.csv",
        &output::COMPARISON_HEADERS,
        &output::comparison_rows(&estimate),
    )
    .expect("failed to write model comparison");
    env.write_csv(
        "cluster_tail.csv",
        &output::CLUSTER_HEADERS,
        &output::cluster_rows(&estimate),
    )
    .expect("failed to write cluster tail");
    env.write_csv(
        "risk_summary.csv",
        &output::SUMMARY_HEADERS,
        &output::summary_rows(&estimate),
    )
    .expect("failed to write risk summary");
}

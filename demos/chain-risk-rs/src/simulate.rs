use offspring::TransmissionEvent;
use rand::{SeedableRng, distr::Distribution, rngs::StdRng};
use rand_distr::{Gamma, Poisson};

use crate::parameters::Parameters;

/// The raw outbreak record handed to the estimator: every case id plus the
/// directed transmission edges between them.
pub struct TransmissionLog {
    pub case_ids: Vec<u64>,
    pub events: Vec<TransmissionEvent>,
}

pub struct ChainSimulator {}

impl ChainSimulator {
    /// Generation-by-generation branching process: each case draws an
    /// individual reproduction number from Gamma(dispersion, r0/dispersion)
    /// and a Poisson offspring count around it, so offspring counts are
    /// negative binomial with mean `r0` and dispersion `dispersion`.
    /// Stops at `max_generations` or once `max_cases` cases exist.
    pub fn simulate(parameters: &Parameters, seed: u64) -> TransmissionLog {
        let mut rng = StdRng::seed_from_u64(seed);
        let nu = Gamma::new(parameters.dispersion, parameters.r0 / parameters.dispersion)
            .expect("offspring parameters are positive");

        let mut case_ids: Vec<u64> = (0..parameters.initial_infections).collect();
        let mut events: Vec<TransmissionEvent> = Vec::new();
        let mut active = case_ids.clone();
        let mut next_id = parameters.initial_infections;

        for _generation in 0..parameters.max_generations {
            if active.is_empty() || case_ids.len() as u64 >= parameters.max_cases {
                break;
            }
            let mut next_generation = Vec::new();
            'cases: for &infector in &active {
                let rate = nu.sample(&mut rng);
                let offspring = if rate > 0.0 {
                    // Poisson requires non-zero rate
                    Poisson::new(rate).expect("rate is positive").sample(&mut rng) as u64
                } else {
                    0
                };
                for _ in 0..offspring {
                    if case_ids.len() as u64 >= parameters.max_cases {
                        break 'cases;
                    }
                    let infectee = next_id;
                    next_id += 1;
                    case_ids.push(infectee);
                    events.push(TransmissionEvent {
                        infector,
                        infectee,
                        transmitted: true,
                    });
                    next_generation.push(infectee);
                }
            }
            active = next_generation;
        }
        TransmissionLog { case_ids, events }
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One directed edge of a transmission log: `infector` exposed `infectee`,
/// and `transmitted` records whether the exposure caused a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmissionEvent {
    pub infector: u64,
    pub infectee: u64,
    pub transmitted: bool,
}

/// Secondary-case counts for an outbreak: one entry per case, each the
/// number of onward transmissions attributed to that case. Order carries no
/// meaning. Guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffspringSample {
    counts: Vec<u64>,
}

impl OffspringSample {
    pub fn new(counts: Vec<u64>) -> Result<Self> {
        if counts.is_empty() {
            return Err(Error::InvalidSample(
                "sample must contain at least one observation".to_string(),
            ));
        }
        Ok(Self { counts })
    }

    /// Builds a sample from raw float observations, e.g. a column read back
    /// from a CSV. Every value must be a finite non-negative integer.
    pub fn from_observations(values: &[f64]) -> Result<Self> {
        let mut counts = Vec::with_capacity(values.len());
        for &v in values {
            if !v.is_finite() || v < 0.0 || v.fract() != 0.0 {
                return Err(Error::InvalidSample(format!(
                    "observation {v} is not a finite non-negative integer"
                )));
            }
            counts.push(v as u64);
        }
        Self::new(counts)
    }

    /// Derives secondary-case counts from a transmission log: the out-degree
    /// of each case over edges flagged as true transmissions, with zeros for
    /// cases that never transmitted. Every case in the outbreak must appear
    /// in `case_ids`, including seeds and terminal cases absent from the
    /// edge list.
    pub fn from_transmission_log(case_ids: &[u64], events: &[TransmissionEvent]) -> Result<Self> {
        let mut degree: BTreeMap<u64, u64> = BTreeMap::new();
        for &id in case_ids {
            if degree.insert(id, 0).is_some() {
                return Err(Error::InvalidSample(format!("duplicate case id {id}")));
            }
        }
        for event in events.iter().filter(|e| e.transmitted) {
            if !degree.contains_key(&event.infectee) {
                return Err(Error::InvalidSample(format!(
                    "infectee {} is not a listed case",
                    event.infectee
                )));
            }
            match degree.get_mut(&event.infector) {
                Some(count) => *count += 1,
                None => {
                    return Err(Error::InvalidSample(format!(
                        "infector {} is not a listed case",
                        event.infector
                    )));
                }
            }
        }
        Self::new(degree.into_values().collect())
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        self.total() as f64 / self.len() as f64
    }

    /// Sample variance (n - 1 denominator); zero for a single observation.
    pub fn variance(&self) -> f64 {
        let n = self.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let ss: f64 = self
            .counts
            .iter()
            .map(|&x| {
                let d = x as f64 - mean;
                d * d
            })
            .sum();
        ss / (n - 1) as f64
    }

    pub fn max(&self) -> u64 {
        *self.counts.iter().max().expect("sample is non-empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(infector: u64, infectee: u64, transmitted: bool) -> TransmissionEvent {
        TransmissionEvent {
            infector,
            infectee,
            transmitted,
        }
    }

    #[test]
    fn test_empty_sample_rejected() {
        assert!(matches!(
            OffspringSample::new(vec![]),
            Err(Error::InvalidSample(_))
        ));
    }

    #[test]
    fn test_from_observations_validates() {
        assert!(OffspringSample::from_observations(&[0.0, 3.0, 1.0]).is_ok());
        assert!(OffspringSample::from_observations(&[1.5]).is_err());
        assert!(OffspringSample::from_observations(&[-1.0]).is_err());
        assert!(OffspringSample::from_observations(&[f64::NAN]).is_err());
        assert!(OffspringSample::from_observations(&[f64::INFINITY]).is_err());
    }

    #[test]
    fn test_transmission_log_out_degree_and_padding() {
        // 1 infects 2 and 3; 2 infects 4; 3 and 4 transmit to nobody.
        let cases = [1, 2, 3, 4];
        let events = [event(1, 2, true), event(1, 3, true), event(2, 4, true)];
        let sample = OffspringSample::from_transmission_log(&cases, &events).unwrap();
        let mut counts = sample.counts().to_vec();
        counts.sort_unstable();
        assert_eq!(counts, vec![0, 0, 1, 2]);
        assert_eq!(sample.len(), cases.len());
    }

    #[test]
    fn test_transmission_log_ignores_ruled_out_edges() {
        let cases = [1, 2, 3];
        let events = [event(1, 2, true), event(1, 3, true), event(2, 3, false)];
        let sample = OffspringSample::from_transmission_log(&cases, &events).unwrap();
        assert_eq!(sample.total(), 2);
    }

    #[test]
    fn test_transmission_log_unknown_ids() {
        let events = [event(1, 9, true)];
        assert!(OffspringSample::from_transmission_log(&[1], &events).is_err());
        let events = [event(9, 1, true)];
        assert!(OffspringSample::from_transmission_log(&[1], &events).is_err());
    }

    #[test]
    fn test_transmission_log_duplicate_case() {
        assert!(OffspringSample::from_transmission_log(&[1, 1], &[]).is_err());
    }

    #[test]
    fn test_moments() {
        let sample = OffspringSample::new(vec![0, 1, 2, 5]).unwrap();
        assert!((sample.mean() - 2.0).abs() < 1e-12);
        assert!((sample.variance() - 14.0 / 3.0).abs() < 1e-12);
        assert_eq!(sample.max(), 5);
    }
}

//! Run harness for the demo models. A run spec carries a seed, a replicate
//! index, the model's typed parameters under `input`, and an optional
//! output directory. Specs load from stdin (JSON) or from a `.json` /
//! `.toml` file; tabular results are written as CSV into the output
//! directory, or to stdout when none is configured.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to read run spec: {0}")]
    Io(#[from] io::Error),
    #[error("malformed JSON run spec: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed TOML run spec: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("run spec {0} has an unsupported extension (expected .json or .toml)")]
    UnsupportedSpec(PathBuf),
    #[error("run spec is empty")]
    EmptySpec,
    #[error("failed to write CSV output: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct RawSpec<P> {
    #[serde(default)]
    seed: u64,
    #[serde(default)]
    replicate: u64,
    input: P,
    #[serde(default)]
    output: Option<OutputSpec>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSpec {
    dir: Option<PathBuf>,
}

/// A loaded run spec: typed model parameters plus the run bookkeeping the
/// harness owns (seed, replicate index, output destination).
#[derive(Debug)]
pub struct RunEnvironment<P> {
    pub input: P,
    pub seed: u64,
    pub replicate: u64,
    output_dir: Option<PathBuf>,
}

impl<P: DeserializeOwned> RunEnvironment<P> {
    pub fn from_json(data: serde_json::Value) -> Result<Self, RunnerError> {
        Ok(Self::from_raw(serde_json::from_value(data)?))
    }

    pub fn from_stdin() -> Result<Self, RunnerError> {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        if text.trim().is_empty() {
            return Err(RunnerError::EmptySpec);
        }
        Ok(Self::from_raw(serde_json::from_str(&text)?))
    }

    pub fn from_path(path: &Path) -> Result<Self, RunnerError> {
        let text = fs::read_to_string(path)?;
        let raw = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&text)?,
            Some("toml") => toml::from_str(&text)?,
            _ => return Err(RunnerError::UnsupportedSpec(path.to_path_buf())),
        };
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawSpec<P>) -> Self {
        Self {
            input: raw.input,
            seed: raw.seed,
            replicate: raw.replicate,
            output_dir: raw.output.unwrap_or_default().dir,
        }
    }
}

impl<P> RunEnvironment<P> {
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Writes one CSV table into the output directory, creating it as
    /// needed, or to stdout when no directory is configured.
    pub fn write_csv(
        &self,
        filename: &str,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> Result<(), RunnerError> {
        match &self.output_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let file = fs::File::create(dir.join(filename))?;
                write_records(csv::Writer::from_writer(file), headers, rows)
            }
            None => write_records(csv::Writer::from_writer(io::stdout()), headers, rows),
        }
    }
}

fn write_records<W: Write>(
    mut writer: csv::Writer<W>,
    headers: &[&str],
    rows: &[Vec<String>],
) -> Result<(), RunnerError> {
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Params {
        r0: f64,
        #[serde(default)]
        label: String,
    }

    #[test]
    fn test_from_json_basic() {
        let env: RunEnvironment<Params> = RunEnvironment::from_json(json!({
            "seed": 42,
            "replicate": 1,
            "input": { "r0": 2.0, "label": "demo" },
            "output": { "dir": "/tmp/output" }
        }))
        .unwrap();
        assert_eq!(env.seed, 42);
        assert_eq!(env.replicate, 1);
        assert_eq!(env.input.r0, 2.0);
        assert_eq!(env.input.label, "demo");
        assert_eq!(env.output_dir(), Some(Path::new("/tmp/output")));
    }

    #[test]
    fn test_defaults() {
        let env: RunEnvironment<Params> = RunEnvironment::from_json(json!({
            "input": { "r0": 1.5 }
        }))
        .unwrap();
        assert_eq!(env.seed, 0);
        assert_eq!(env.replicate, 0);
        assert_eq!(env.output_dir(), None);
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let result: Result<RunEnvironment<Params>, _> =
            RunEnvironment::from_json(json!({ "seed": 7 }));
        assert!(matches!(result, Err(RunnerError::Json(_))));
    }

    #[test]
    fn test_from_toml_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(
            &path,
            "seed = 9\n\n[input]\nr0 = 1.2\n\n[output]\ndir = \"out\"\n",
        )
        .unwrap();
        let env: RunEnvironment<Params> = RunEnvironment::from_path(&path).unwrap();
        assert_eq!(env.seed, 9);
        assert_eq!(env.input.r0, 1.2);
        assert_eq!(env.output_dir(), Some(Path::new("out")));
    }

    #[test]
    fn test_from_json_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{ "input": { "r0": 0.9 } }"#).unwrap();
        let env: RunEnvironment<Params> = RunEnvironment::from_path(&path).unwrap();
        assert_eq!(env.input.r0, 0.9);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        fs::write(&path, "input:\n  r0: 1.0\n").unwrap();
        let result: Result<RunEnvironment<Params>, _> = RunEnvironment::from_path(&path);
        assert!(matches!(result, Err(RunnerError::UnsupportedSpec(_))));
    }

    #[test]
    fn test_write_csv_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("results");
        let env: RunEnvironment<Params> = RunEnvironment::from_json(json!({
            "input": { "r0": 2.0 },
            "output": { "dir": out }
        }))
        .unwrap();
        env.write_csv(
            "table.csv",
            &["step", "value"],
            &[
                vec!["0".to_string(), "1".to_string()],
                vec!["1".to_string(), "3".to_string()],
            ],
        )
        .unwrap();
        let written = fs::read_to_string(out.join("table.csv")).unwrap();
        assert_eq!(written, "step,value\n0,1\n1,3\n");
    }
}

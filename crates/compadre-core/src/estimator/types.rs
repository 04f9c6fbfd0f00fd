//! Estimator port: options in, model rows or written files out.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// One row of estimator output.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ModelRow {
    pub degree: i64,
    /// Maximum log-likelihood for this degree. Non-finite values arrive as
    /// `null` and read as negative infinity (zero weight).
    #[serde(rename = "loglik", deserialize_with = "null_as_neg_infinity")]
    pub log_likelihood: f64,
}

fn null_as_neg_infinity<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
}

/// Options for a single estimator run.
///
/// Field names follow the estimator's own option dictionary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatorOptions {
    /// Pair key when only one pair is analysed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_pair: Option<String>,
    /// JSON object mapping pair keys to segment tuples.
    pub segment_dict: String,
    pub segment_files: PathBuf,
    pub model_output_file: PathBuf,
    pub output_file: PathBuf,
    pub return_output: bool,
    pub write_output: bool,
    /// Whether segments carry IBD1/2 states. Only sent for single pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_ibd2_siblings: Option<bool>,
}

impl EstimatorOptions {
    /// Full-population run writing `<prefix>.model` and `<prefix>.out`.
    pub fn bulk(segment_dict: String, segment_file: PathBuf, output_prefix: &str) -> Self {
        Self {
            single_pair: None,
            segment_dict,
            segment_files: segment_file,
            model_output_file: PathBuf::from(format!("{output_prefix}.model")),
            output_file: PathBuf::from(format!("{output_prefix}.out")),
            return_output: false,
            write_output: true,
            use_ibd2_siblings: None,
        }
    }

    /// Single-pair run returning rows in-process and writing nothing.
    pub fn single_pair(
        pair: String,
        segment_dict: String,
        segment_file: PathBuf,
        output_prefix: &str,
        use_ibd2_siblings: bool,
    ) -> Self {
        Self {
            single_pair: Some(pair),
            segment_dict,
            segment_files: segment_file,
            model_output_file: PathBuf::from(format!("{output_prefix}.model")),
            output_file: PathBuf::from(format!("{output_prefix}.out")),
            return_output: true,
            write_output: false,
            use_ibd2_siblings: Some(use_ibd2_siblings),
        }
    }
}

/// Result of an estimator run.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorOutput {
    /// Rows returned in-process.
    Rows(Vec<ModelRow>),
    /// Results were written to the configured files.
    Written,
}

impl EstimatorOutput {
    /// Rows of an in-process run; a run that only wrote files has none.
    pub fn into_rows(self) -> Vec<ModelRow> {
        match self {
            EstimatorOutput::Rows(rows) => rows,
            EstimatorOutput::Written => Vec::new(),
        }
    }
}

/// Synchronous-per-request estimator port.
///
/// A call either completes with the full result or fails; there are no
/// partial results.
#[async_trait]
pub trait RelatednessEstimator: Send + Sync {
    async fn run(&self, options: EstimatorOptions) -> Result<EstimatorOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_row_null_loglik() {
        let rows: Vec<ModelRow> =
            serde_json::from_str(r#"[{"degree": 2, "loglik": -3.5}, {"degree": 4, "loglik": null}]"#)
                .unwrap();
        assert_eq!(rows[0].log_likelihood, -3.5);
        assert_eq!(rows[1].log_likelihood, f64::NEG_INFINITY);
    }

    #[test]
    fn test_bulk_options_serialization() {
        let opts = EstimatorOptions::bulk("{}".into(), "/d/seg.txt".into(), "/d/ersa/output_all_ersa");
        let json = serde_json::to_value(&opts).unwrap();

        assert_eq!(json["model_output_file"], "/d/ersa/output_all_ersa.model");
        assert_eq!(json["output_file"], "/d/ersa/output_all_ersa.out");
        assert_eq!(json["write_output"], true);
        assert_eq!(json["return_output"], false);
        assert!(json.get("single_pair").is_none());
        assert!(json.get("use_ibd2_siblings").is_none());
    }

    #[test]
    fn test_single_pair_options() {
        let opts = EstimatorOptions::single_pair(
            "a:b".into(),
            "{}".into(),
            "/d/seg.txt".into(),
            "/d/ersa/output_new_a_b",
            true,
        );
        assert_eq!(opts.single_pair.as_deref(), Some("a:b"));
        assert!(opts.return_output);
        assert!(!opts.write_output);
        assert_eq!(opts.use_ibd2_siblings, Some(true));
    }

    #[test]
    fn test_written_output_has_no_rows() {
        assert!(EstimatorOutput::Written.into_rows().is_empty());
    }
}

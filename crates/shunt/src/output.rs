//! CLI response envelopes, in both JSON and human form.

use serde::{Deserialize, Serialize};

use crate::error::{OutputErrorCode, ShuntError};

/// Response for a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Status: "ok".
    pub status: String,
    /// Whether the run was a dry run.
    pub dry_run: bool,
    /// Paths that changed (or would change), sorted.
    pub files_changed: Vec<String>,
}

impl RunSummary {
    pub fn new(dry_run: bool, files_changed: Vec<String>) -> Self {
        RunSummary {
            status: "ok".to_string(),
            dry_run,
            files_changed,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|_| r#"{"status":"error"}"#.to_string())
    }

    pub fn render_human(&self) -> String {
        let mut out = String::new();
        for path in &self.files_changed {
            out.push_str(path);
            out.push('\n');
        }
        let verb = if self.dry_run { "would change" } else { "changed" };
        match self.files_changed.len() {
            0 => out.push_str(&format!("no files {verb}\n")),
            1 => out.push_str(&format!("1 file {verb}\n")),
            n => out.push_str(&format!("{n} files {verb}\n")),
        }
        out
    }
}

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric exit code class.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
}

/// Response emitted when a run fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &ShuntError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            error: ErrorInfo {
                code: OutputErrorCode::from(err).code(),
                message: err.to_string(),
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|_| r#"{"status":"error"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_json_carries_status_and_files() {
        let summary = RunSummary::new(false, vec!["a.py".to_string(), "b.py".to_string()]);
        let value: serde_json::Value = serde_json::from_str(&summary.to_json()).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["dry_run"], false);
        assert_eq!(value["files_changed"][1], "b.py");
    }

    #[test]
    fn human_rendering_counts_files() {
        let none = RunSummary::new(false, vec![]);
        assert_eq!(none.render_human(), "no files changed\n");

        let one = RunSummary::new(false, vec!["a.py".to_string()]);
        assert_eq!(one.render_human(), "a.py\n1 file changed\n");

        let dry = RunSummary::new(true, vec!["a.py".to_string(), "b.py".to_string()]);
        assert_eq!(dry.render_human(), "a.py\nb.py\n2 files would change\n");
    }

    #[test]
    fn error_response_maps_the_exit_code() {
        let err = ShuntError::EmptyRequests;
        let response = ErrorResponse::from_error(&err);
        assert_eq!(response.status, "error");
        assert_eq!(response.error.code, 2);
        let value: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(value["error"]["code"], 2);
    }
}

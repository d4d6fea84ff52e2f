use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::query::{FormulaMode, Filters};
use crate::error::RankingError;

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Closed set of run lifecycle values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Queued,
    Running,
    Completed,
    Failed,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Error => "error",
        }
    }

    /// Polling stops on these.
    pub fn is_terminal(&self) -> bool {
        match self {
            RunStatus::Completed | RunStatus::Failed | RunStatus::Error => true,
            RunStatus::Idle | RunStatus::Queued | RunStatus::Running => false,
        }
    }

    /// Terminal statuses that are followed by a results refresh.
    pub fn refreshes_results(&self) -> bool {
        match self {
            RunStatus::Completed | RunStatus::Failed => true,
            RunStatus::Error | RunStatus::Idle | RunStatus::Queued | RunStatus::Running => false,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" => Ok(RunStatus::Idle),
            "queued" => Ok(RunStatus::Queued),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            "error" => Ok(RunStatus::Error),
            other => Err(RankingError::UnknownRunStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Where the current [`RunState`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOrigin {
    /// Nothing has happened yet.
    #[default]
    Initial,
    /// Set by the client before any server answer. Always overwritten, never merged.
    Predicted,
    /// The start request was accepted; status is inferred from that.
    Acknowledged,
    /// Copied verbatim from a status poll.
    Server,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Option<String>,
    pub status: RunStatus,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub origin: RunOrigin,
}

impl RunState {
    /// Optimistic state shown the moment a run is triggered.
    pub fn predicted_queued() -> Self {
        Self {
            run_id: None,
            status: RunStatus::Queued,
            progress: Some(0.0),
            message: None,
            origin: RunOrigin::Predicted,
        }
    }

    pub fn failed(run_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            run_id,
            status: RunStatus::Failed,
            progress: None,
            message: Some(message.into()),
            origin: RunOrigin::Predicted,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `POST /rankings/run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    pub formula_mode: FormulaMode,
    pub options: Filters,
}

/// Response of `POST /rankings/run`. Older backends send `id` instead of `run_id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartRunResponse {
    #[serde(default, deserialize_with = "deserialize_run_id")]
    pub run_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_run_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl StartRunResponse {
    pub fn run_id(&self) -> Option<&str> {
        self.run_id
            .as_deref()
            .or(self.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Response of `GET /rankings/status`. Status may come as `status` or `state`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default, deserialize_with = "deserialize_run_id")]
    pub run_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub formula_mode: Option<String>,
}

impl StatusResponse {
    pub fn raw_status(&self) -> Option<&str> {
        self.status.as_deref().or(self.state.as_deref())
    }

    /// Convert into a server-origin [`RunState`], rejecting unknown statuses.
    ///
    /// `idle` is a client-side state only; the backend answers it for run ids
    /// it does not know, so it is rejected like any other unknown value.
    pub fn into_run_state(self, fallback_run_id: &str) -> crate::Result<RunState> {
        let raw = self.raw_status().unwrap_or_default().to_string();
        let status: RunStatus = raw.parse()?;
        if status == RunStatus::Idle {
            return Err(RankingError::UnknownRunStatus(raw));
        }
        Ok(RunState {
            run_id: Some(self.run_id.unwrap_or_else(|| fallback_run_id.to_string())),
            status,
            progress: self.progress,
            message: self.message,
            origin: RunOrigin::Server,
        })
    }
}

/// The backend stores run ids as integers; accept numbers or strings.
fn deserialize_run_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

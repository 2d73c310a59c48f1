//! Load request and registry state machines

use serde::{Deserialize, Serialize};

/// State of a single bundle load request
///
/// State transitions:
/// ```text
/// Requesting → Success
///      ↑  │
///      │  ↓
///      └─ Error → Failed (retries exhausted)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// An attempt is reading and opening the bundle file
    #[default]
    Requesting,
    /// The bundle handle is open
    Success,
    /// The last attempt failed and may be retried
    Error,
    /// Retries are exhausted or a dependency failed
    Failed,
}

impl LoadState {
    /// Check if this state can transition to the target state
    pub fn can_transition_to(&self, target: LoadState) -> bool {
        use LoadState::*;
        matches!(
            (self, target),
            (Requesting, Success)
                | (Requesting, Error)
                // Retry
                | (Error, Requesting)
                | (Error, Failed)
                // Dependency failure and cancellation bypass the retry budget
                | (Requesting, Failed)
                | (Success, Failed)
        )
    }

    /// Check if the request has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadState::Success | LoadState::Failed)
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            LoadState::Requesting => "Bundle is being requested",
            LoadState::Success => "Bundle is open",
            LoadState::Error => "Bundle request failed and may be retried",
            LoadState::Failed => "Bundle request failed permanently",
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::Requesting => write!(f, "Requesting"),
            LoadState::Success => write!(f, "Success"),
            LoadState::Error => write!(f, "Error"),
            LoadState::Failed => write!(f, "Failed"),
        }
    }
}

/// Aggregate state of a request's dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyLoad {
    /// The bundle has no dependencies
    NoTargets,
    /// At least one dependency is still loading
    LoadWait,
    /// Every dependency is loaded
    Success,
    /// At least one dependency failed permanently
    Failed,
}

impl DependencyLoad {
    /// Whether the dependent bundle may be used
    pub fn is_satisfied(&self) -> bool {
        matches!(self, DependencyLoad::NoTargets | DependencyLoad::Success)
    }
}

/// Coarse registry status for progress displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Setup has not run
    #[default]
    Idle,
    /// Reading hash lists from the cache directory
    LoadingHashList,
    /// Opening the dependency manifest bundle
    LoadingManifest,
    /// Comparing recorded sizes with local files
    CheckingDiff,
    /// Reading every recorded file into memory (server mode)
    Preloading,
    /// Setup finished; loads are served
    Ready,
    /// Setup failed
    Failed,
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ProgressStatus::Idle => "Idle",
            ProgressStatus::LoadingHashList => "LoadingHashList",
            ProgressStatus::LoadingManifest => "LoadingManifest",
            ProgressStatus::CheckingDiff => "CheckingDiff",
            ProgressStatus::Preloading => "Preloading",
            ProgressStatus::Ready => "Ready",
            ProgressStatus::Failed => "Failed",
        };
        write!(f, "{text}")
    }
}

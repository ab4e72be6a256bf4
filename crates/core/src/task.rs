// crates/core/src/task.rs
//! Task identity and progress snapshots.
//!
//! Everything here serializes straight onto the wire: `TaskStatus` is the
//! body of `GET /api/progress/{task_id}` responses, so the field names and
//! status strings are load-bearing for clients.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

// ============================================================================
// TaskId
// ============================================================================

/// Opaque task identifier handed to clients at dispatch time.
///
/// A hyphenated uuid-v4 underneath, but treated as a plain string everywhere
/// so lookups work for whatever id a client sends back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// Lets `HashMap<TaskId, _>` answer `&str` lookups without an allocation.
impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// MediaKind
// ============================================================================

/// What the client asked for: a merged mp4 video or an extracted mp3 track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Extension of the finished artifact.
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl FromStr for MediaKind {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            other => Err(FetchError::UnsupportedKind(other.to_string())),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TaskStatus
// ============================================================================

/// One whole-record progress snapshot.
///
/// Stored and published as a unit — there is deliberately no partial-update
/// API, so a reader can never observe a `done` without its `file` or an
/// `error` without its message. The percents per status are fixed by the
/// constructors:
///
/// | status        | percent                  |
/// |---------------|--------------------------|
/// | `queued`      | 0                        |
/// | `starting`    | 1                        |
/// | `downloading` | computed, capped at 99   |
/// | `processing`  | 99                       |
/// | `done`        | 100                      |
/// | `error`       | 0                        |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Queued {
        percent: u8,
    },
    Starting {
        percent: u8,
    },
    Downloading {
        percent: u8,
        /// Transfer rate in bytes per second, when the tool reports one.
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
        /// Estimated seconds remaining, when the tool reports one.
        #[serde(skip_serializing_if = "Option::is_none")]
        eta: Option<u64>,
    },
    Processing {
        percent: u8,
    },
    Done {
        percent: u8,
        /// Final filename (stem + extension), servable via `/api/files`.
        file: String,
    },
    Error {
        percent: u8,
        error: String,
    },
}

impl TaskStatus {
    pub fn queued() -> Self {
        TaskStatus::Queued { percent: 0 }
    }

    pub fn starting() -> Self {
        TaskStatus::Starting { percent: 1 }
    }

    pub fn downloading(percent: u8, speed: Option<f64>, eta: Option<u64>) -> Self {
        TaskStatus::Downloading { percent, speed, eta }
    }

    pub fn processing() -> Self {
        TaskStatus::Processing { percent: 99 }
    }

    pub fn done(file: impl Into<String>) -> Self {
        TaskStatus::Done { percent: 100, file: file.into() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        TaskStatus::Error { percent: 0, error: error.into() }
    }

    /// Terminal states are never overwritten by further job activity.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done { .. } | TaskStatus::Error { .. })
    }

    pub fn percent(&self) -> u8 {
        match self {
            TaskStatus::Queued { percent }
            | TaskStatus::Starting { percent }
            | TaskStatus::Downloading { percent, .. }
            | TaskStatus::Processing { percent }
            | TaskStatus::Done { percent, .. }
            | TaskStatus::Error { percent, .. } => *percent,
        }
    }
}

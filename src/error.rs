//! Error types for board operations and snapshot storage.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::task::{Stage, TaskId};

/// Input field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    ReturnReason,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Title => "title",
            Field::ReturnReason => "return reason",
        })
    }
}

/// Failure reading or writing a snapshot.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("snapshot I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot is not valid JSON: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum BoardError {
    /// Rejected input; board state is unchanged.
    #[error("{field} must not be empty")]
    Validation { field: Field },

    /// The id is not in the collection the operation expects.
    #[error("{}", not_found_message(.id, .stage))]
    NotFound { id: TaskId, stage: Option<Stage> },

    /// Done is terminal; there is nothing to advance to.
    #[error("task #{id} is already Done")]
    AlreadyDone { id: TaskId },

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

fn not_found_message(id: &TaskId, stage: &Option<Stage>) -> String {
    match stage {
        Some(stage) => format!("task #{id} is not in {stage}"),
        None => format!("task #{id} does not exist"),
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;

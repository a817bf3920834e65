//! A four-stage task board: Planned → In Progress → Testing → Done.
//!
//! [`KanbanBoard`] owns every task and enforces the lifecycle; a
//! [`SnapshotStore`] keeps a copy of the board between runs.

pub mod error;
pub mod kanban_board;
pub mod search;
pub mod store;
pub mod task;
pub mod ui;

pub use error::{BoardError, Field, StoreError};
pub use kanban_board::{Applied, Clock, FixedClock, KanbanBoard, SystemClock};
pub use search::search;
pub use store::{JsonFileStore, MemoryStore, Snapshot, SnapshotStore};
pub use task::{Stage, Task, TaskDraft, TaskId, TaskStatus};

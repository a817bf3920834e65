use crate::error::{BoardError, Field, Result, StoreError};
use crate::search;
use crate::store::{Snapshot, SnapshotStore};
use crate::task::{Stage, Task, TaskDraft, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Result of a mutation that was applied in memory.
///
/// `persist_error` is set when the save that follows every mutation failed;
/// the change still stands for this session but may not survive a restart.
#[derive(Debug)]
#[must_use]
pub struct Applied<T> {
    pub value: T,
    pub persist_error: Option<StoreError>,
}

impl<T> Applied<T> {
    pub fn is_durable(&self) -> bool {
        self.persist_error.is_none()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// The task board: owns the four stage collections and every task in them.
pub struct KanbanBoard<S> {
    columns: [Vec<Task>; 4],
    next_id: TaskId,
    store: S,
    clock: Box<dyn Clock>,
}

impl<S: SnapshotStore> KanbanBoard<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }

    pub fn with_clock(store: S, clock: impl Clock + 'static) -> Self {
        Self {
            columns: Default::default(),
            next_id: 1,
            store,
            clock: Box::new(clock),
        }
    }

    /// Empty board populated from whatever `store` holds.
    pub fn open(store: S) -> Result<Self> {
        let mut board = Self::new(store);
        board.load()?;
        Ok(board)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn set_clock(&mut self, clock: impl Clock + 'static) {
        self.clock = Box::new(clock);
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ----- persistence -----

    /// Replaces the board with the stored snapshot. An empty store resets the
    /// board to empty and returns `false`; a failed read leaves it untouched.
    pub fn load(&mut self) -> Result<bool> {
        let Some(snapshot) = self.store.load()? else {
            debug!("no stored snapshot, starting empty");
            self.columns = Default::default();
            self.next_id = 1;
            return Ok(false);
        };
        self.next_id = snapshot.resolve_next_id();
        self.columns = [
            snapshot.planned,
            snapshot.in_progress,
            snapshot.testing,
            snapshot.done,
        ];
        info!(tasks = self.len(), "board loaded");
        Ok(true)
    }

    pub fn save(&mut self) -> Result<()> {
        let snapshot = self.snapshot();
        self.store.save(&snapshot)?;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        let [planned, in_progress, testing, done] = self.columns.clone();
        Snapshot {
            planned,
            in_progress,
            testing,
            done,
            next_id: Some(self.next_id),
        }
    }

    fn persist<T>(&mut self, value: T) -> Applied<T> {
        let persist_error = match self.save() {
            Ok(()) => None,
            Err(BoardError::Persistence(e)) => {
                warn!(error = %e, "change kept in memory but not saved");
                Some(e)
            }
            Err(e) => Some(StoreError::Unavailable(e.to_string())),
        };
        Applied {
            value,
            persist_error,
        }
    }

    // ----- intents -----

    pub fn create(&mut self, draft: TaskDraft) -> Result<Applied<TaskId>> {
        let title = required(&draft.title, Field::Title)?;
        let id = self.next_id;
        self.next_id += 1;
        let task = Task {
            id,
            title,
            description: draft.description,
            deadline: draft.deadline,
            last_edited: self.now(),
            status: None,
            return_reason: None,
        };
        debug!(id, title = %task.title, "task created");
        self.column_mut(Stage::Planned).push(task);
        Ok(self.persist(id))
    }

    /// Overwrites title, description and deadline of a Planned task.
    pub fn edit(&mut self, id: TaskId, draft: TaskDraft) -> Result<Applied<()>> {
        let title = required(&draft.title, Field::Title)?;
        let now = self.now();
        let index = self.position(Stage::Planned, id)?;
        let task = &mut self.column_mut(Stage::Planned)[index];
        task.title = title;
        task.description = draft.description;
        task.deadline = draft.deadline;
        task.last_edited = now;
        debug!(id, "task edited");
        Ok(self.persist(()))
    }

    /// Removes a task. Only Planned tasks can be deleted.
    pub fn delete(&mut self, id: TaskId) -> Result<Applied<Task>> {
        let index = self.position(Stage::Planned, id)?;
        let task = self.column_mut(Stage::Planned).remove(index);
        debug!(id, "task deleted");
        Ok(self.persist(task))
    }

    /// Moves a task one stage forward and returns the stage it landed in.
    /// Entering Done freezes its on-time/overdue status.
    pub fn advance(&mut self, id: TaskId) -> Result<Applied<Stage>> {
        let (from, _) = self.get(id).ok_or_else(|| not_found(id, None))?;
        let Some(to) = from.next() else {
            warn!(id, "task is already done");
            return Err(BoardError::AlreadyDone { id });
        };
        let index = self.position(from, id)?;

        let mut task = self.column_mut(from).remove(index);
        if to == Stage::Done {
            task.status = Some(TaskStatus::evaluate(task.deadline, self.now()));
        }
        debug!(id, %from, %to, "task advanced");
        self.column_mut(to).push(task);
        Ok(self.persist(to))
    }

    /// Sends a Testing task back to In Progress with a reason.
    pub fn return_to_in_progress(&mut self, id: TaskId, reason: &str) -> Result<Applied<()>> {
        let index = self.position(Stage::Testing, id)?;
        let reason = required(reason, Field::ReturnReason)?;

        let mut task = self.column_mut(Stage::Testing).remove(index);
        task.return_reason = Some(reason);
        debug!(id, "task returned to in progress");
        self.column_mut(Stage::InProgress).push(task);
        Ok(self.persist(()))
    }

    // ----- queries -----

    pub fn search(&self, query: &str) -> Vec<&Task> {
        search::search(self.all_tasks(), query)
    }

    pub fn tasks(&self, stage: Stage) -> &[Task] {
        &self.columns[stage.index()]
    }

    /// Every task, Planned first and Done last.
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.columns.iter().flatten()
    }

    pub fn get(&self, id: TaskId) -> Option<(Stage, &Task)> {
        Stage::ALL.into_iter().find_map(|stage| {
            self.tasks(stage)
                .iter()
                .find(|t| t.id == id)
                .map(|t| (stage, t))
        })
    }

    pub fn stage_of(&self, id: TaskId) -> Option<Stage> {
        self.get(id).map(|(stage, _)| stage)
    }

    /// Frozen status for completed tasks, live status otherwise.
    pub fn status_of(&self, task: &Task) -> TaskStatus {
        task.status_at(self.now())
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn column_mut(&mut self, stage: Stage) -> &mut Vec<Task> {
        &mut self.columns[stage.index()]
    }

    fn position(&self, stage: Stage, id: TaskId) -> Result<usize> {
        self.tasks(stage)
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| not_found(id, Some(stage)))
    }
}

fn required(value: &str, field: Field) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        warn!(%field, "rejected empty input");
        return Err(BoardError::Validation { field });
    }
    Ok(trimmed.to_string())
}

fn not_found(id: TaskId, stage: Option<Stage>) -> BoardError {
    warn!(id, stage = ?stage, "task not found where expected");
    BoardError::NotFound { id, stage }
}

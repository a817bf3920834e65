use crate::error::BoardError;
use crate::kanban_board::{Applied, KanbanBoard};
use crate::store::SnapshotStore;
use crate::task::{Stage, Task, TaskDraft, TaskId, TaskStatus};
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::collections::HashSet;
use std::io;

/// Front-end state around the board: cursor, search query and status line.
pub struct App<S> {
    pub board: KanbanBoard<S>,
    pub selected_status: usize,
    pub selected_task: usize,
    pub query: String,
    pub message: Option<String>,
}

impl<S: SnapshotStore> App<S> {
    pub fn new(board: KanbanBoard<S>) -> Self {
        Self {
            board,
            selected_status: 0,
            selected_task: 0,
            query: String::new(),
            message: None,
        }
    }

    pub fn selected_stage(&self) -> Stage {
        Stage::ALL[self.selected_status]
    }

    pub fn selected_id(&self) -> Option<TaskId> {
        self.board
            .tasks(self.selected_stage())
            .get(self.selected_task)
            .map(|t| t.id)
    }

    pub fn move_column(&mut self, delta: isize) {
        self.selected_status = (self.selected_status as isize + delta)
            .clamp(0, Stage::ALL.len() as isize - 1) as usize;
        self.clamp_selection();
    }

    pub fn move_task(&mut self, delta: isize) {
        let max = self.board.tasks(self.selected_stage()).len() as isize - 1;
        self.selected_task = (self.selected_task as isize + delta).clamp(0, max.max(0)) as usize;
    }

    fn clamp_selection(&mut self) {
        self.move_task(0);
    }

    /// Ids matching the active query; empty when no search is running.
    pub fn matches(&self) -> HashSet<TaskId> {
        if self.query.trim().is_empty() {
            return HashSet::new();
        }
        self.board.search(&self.query).iter().map(|t| t.id).collect()
    }

    /// Turns an intent outcome into the status line.
    pub fn report<T>(&mut self, done: &str, outcome: Result<Applied<T>, BoardError>) {
        self.message = Some(match outcome {
            Ok(applied) => match applied.persist_error {
                None => done.to_string(),
                Some(e) => format!("{done}, but not saved: {e}"),
            },
            Err(e) => e.to_string(),
        });
        self.clamp_selection();
    }
}

/// Asks for title, description and deadline. Blank answers keep `current`'s values.
fn draft_from_prompts(current: Option<&Task>) -> Result<TaskDraft, String> {
    let cancelled = || "cancelled".to_string();
    let title = prompt("Title").ok_or_else(cancelled)?;
    let description = prompt("Description").ok_or_else(cancelled)?;
    let deadline = prompt("Deadline (YYYY-MM-DD, empty for none)").ok_or_else(cancelled)?;

    let keep = |value: String, old: Option<&String>| match old {
        Some(old) if value.is_empty() => old.clone(),
        _ => value,
    };
    let deadline = match parse_deadline(&deadline) {
        Ok(None) => current.and_then(|t| t.deadline),
        Ok(Some(day)) => Some(day),
        Err(e) => return Err(format!("invalid deadline {deadline:?}: {e}")),
    };
    Ok(TaskDraft {
        title: keep(title, current.map(|t| &t.title)),
        description: keep(description, current.map(|t| &t.description)),
        deadline,
    })
}

/// Parses a `YYYY-MM-DD` deadline; blank input means no deadline.
pub fn parse_deadline(input: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map(Some)
}

pub fn draw<S: SnapshotStore>(f: &mut Frame, app: &App<S>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Percentage(25); 4])
        .split(rows[0]);

    let matches = app.matches();
    for (i, stage) in Stage::ALL.iter().enumerate() {
        let items: Vec<ListItem> = app
            .board
            .tasks(*stage)
            .iter()
            .enumerate()
            .map(|(row, t)| {
                let selected = app.selected_status == i && app.selected_task == row;
                task_item(t, app.board.status_of(t), selected, matches.contains(&t.id))
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .title(format!("{} ({})", stage.title(), app.board.tasks(*stage).len()))
                .borders(Borders::ALL)
                .border_style(if app.selected_status == i {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default()
                }),
        );

        f.render_widget(list, chunks[i]);
    }

    let mut status = Vec::new();
    if !app.query.trim().is_empty() {
        status.push(Span::styled(
            format!("search \"{}\": {} found  ", app.query.trim(), matches.len()),
            Style::default().fg(Color::Yellow),
        ));
    }
    status.push(Span::raw(app.message.clone().unwrap_or_else(|| {
        "a add  e edit  d delete  enter advance  r return  / search  q quit".to_string()
    })));
    f.render_widget(Paragraph::new(Line::from(status)), rows[1]);
}

fn task_item(t: &Task, status: TaskStatus, selected: bool, found: bool) -> ListItem<'_> {
    let status_color = match status {
        TaskStatus::Overdue => Color::Red,
        TaskStatus::OnTime => Color::Green,
    };
    let mut title_style = Style::default().fg(status_color);
    if found {
        title_style = title_style.bg(Color::Yellow).fg(Color::Black);
    }

    let mut spans = vec![
        Span::raw(format!("[#{}] ", t.id)),
        Span::styled(t.title.as_str(), title_style),
    ];
    if let Some(deadline) = t.deadline {
        spans.push(Span::raw(format!(" (Due: {deadline})")));
    }
    spans.push(Span::raw(format!(" {status}")));
    if let Some(reason) = &t.return_reason {
        spans.push(Span::styled(
            format!(" ↩ {reason}"),
            Style::default().fg(Color::Magenta),
        ));
    }

    let item = ListItem::new(Line::from(spans));
    if selected {
        item.style(Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD))
    } else {
        item
    }
}

pub fn run_app<B: Backend, S: SnapshotStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('q') => return Ok(()),
            KeyCode::Char('a') => match draft_from_prompts(None) {
                Ok(draft) => {
                    let outcome = app.board.create(draft);
                    app.report("task created", outcome);
                }
                Err(e) => app.message = Some(e),
            },
            KeyCode::Char('e') => {
                if let Some(id) = app.selected_id() {
                    let current = app.board.get(id).map(|(_, t)| t.clone());
                    match draft_from_prompts(current.as_ref()) {
                        Ok(draft) => {
                            let outcome = app.board.edit(id, draft);
                            app.report("task edited", outcome);
                        }
                        Err(e) => app.message = Some(e),
                    }
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = app.selected_id() {
                    let outcome = app.board.delete(id);
                    app.report("task deleted", outcome);
                }
            }
            KeyCode::Char('r') => {
                if let Some(id) = app.selected_id() {
                    if let Some(reason) = prompt("Return reason") {
                        let outcome = app.board.return_to_in_progress(id, &reason);
                        app.report("task returned to In Progress", outcome);
                    }
                }
            }
            KeyCode::Char('/') => {
                if let Some(query) = prompt("Search") {
                    app.query = query;
                    app.message = None;
                }
            }
            KeyCode::Esc => {
                app.query.clear();
                app.message = None;
            }
            KeyCode::Enter => {
                if let Some(id) = app.selected_id() {
                    let outcome = app.board.advance(id);
                    app.report("task advanced", outcome);
                }
            }
            KeyCode::Left => app.move_column(-1),
            KeyCode::Right => app.move_column(1),
            KeyCode::Up => app.move_task(-1),
            KeyCode::Down => app.move_task(1),
            _ => {}
        }
    }
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        enable_raw_mode().ok();
        Some(input.trim().to_string())
    } else {
        enable_raw_mode().ok();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kanban_board::FixedClock;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use ratatui::backend::TestBackend;

    fn app() -> App<MemoryStore> {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap());
        App::new(KanbanBoard::with_clock(MemoryStore::new(), clock))
    }

    fn render(app: &App<MemoryStore>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(160, 12)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_parse_deadline() {
        assert_eq!(parse_deadline(""), Ok(None));
        assert_eq!(
            parse_deadline(" 2025-01-01 "),
            Ok(NaiveDate::from_ymd_opt(2025, 1, 1))
        );
        assert!(parse_deadline("01/01/2025").is_err());
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut app = app();
        app.move_column(-1);
        assert_eq!(app.selected_stage(), Stage::Planned);
        app.move_column(10);
        assert_eq!(app.selected_stage(), Stage::Done);
        app.move_task(5);
        assert_eq!(app.selected_task, 0);
        assert_eq!(app.selected_id(), None);
    }

    #[test]
    fn test_report_shows_rejection() {
        let mut app = app();
        let outcome = app.board.create(TaskDraft::new("  "));
        app.report("task created", outcome);
        assert_eq!(app.message.as_deref(), Some("title must not be empty"));
    }

    #[test]
    fn test_report_warns_on_unsaved_change() {
        let mut app = app();
        app.board.store_mut().set_fail_saves(true);
        let outcome = app.board.create(TaskDraft::new("offline"));
        app.report("task created", outcome);
        let message = app.message.unwrap();
        assert!(message.starts_with("task created, but not saved"));
    }

    #[test]
    fn test_draw_lists_tasks_under_their_stage() {
        let mut app = app();
        let id = app
            .board
            .create(TaskDraft::new("Buy milk"))
            .unwrap()
            .into_value();
        let _ = app.board.create(TaskDraft::new("Walk dog")).unwrap();
        let _ = app.board.advance(id).unwrap();

        let screen = render(&app);
        assert!(screen.contains("Planned (1)"));
        assert!(screen.contains("In Progress (1)"));
        assert!(screen.contains("[#1] Buy milk"));
        assert!(screen.contains("[#2] Walk dog"));
    }

    #[test]
    fn test_search_highlights_only_matches() {
        let mut app = app();
        let _ = app.board.create(TaskDraft::new("Buy milk")).unwrap();
        let _ = app.board.create(TaskDraft::new("Walk dog")).unwrap();
        app.query = "milk".into();

        assert_eq!(app.matches(), HashSet::from([1]));
        assert!(render(&app).contains("search \"milk\": 1 found"));
    }
}

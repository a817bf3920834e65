use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub type TaskId = u64;

/// The four pipeline positions a task can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Planned,
    InProgress,
    Testing,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Planned,
        Stage::InProgress,
        Stage::Testing,
        Stage::Done,
    ];

    pub fn index(self) -> usize {
        match self {
            Stage::Planned => 0,
            Stage::InProgress => 1,
            Stage::Testing => 2,
            Stage::Done => 3,
        }
    }

    /// Forward successor; `None` for Done.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Planned => Some(Stage::InProgress),
            Stage::InProgress => Some(Stage::Testing),
            Stage::Testing => Some(Stage::Done),
            Stage::Done => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Planned => "Planned",
            Stage::InProgress => "In Progress",
            Stage::Testing => "Testing",
            Stage::Done => "Done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    OnTime,
    Overdue,
}

impl TaskStatus {
    /// Classifies a deadline against `now`. A deadline is the start of its day
    /// (UTC), so the task is overdue from the first moment after midnight.
    pub fn evaluate(deadline: Option<NaiveDate>, now: DateTime<Utc>) -> Self {
        match deadline {
            Some(day) if now > day.and_time(NaiveTime::MIN).and_utc() => TaskStatus::Overdue,
            _ => TaskStatus::OnTime,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::OnTime => "onTime",
            TaskStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskStatus::OnTime => "On Time",
            TaskStatus::Overdue => "Overdue",
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub deadline: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub last_edited: DateTime<Utc>,
    /// Frozen when the task reaches Done; never set before that.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_reason: Option<String>,
}

impl Task {
    /// Frozen status if the task has been completed, otherwise computed against `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> TaskStatus {
        self.status
            .unwrap_or_else(|| TaskStatus::evaluate(self.deadline, now))
    }

    /// Every string-valued field, in the form it takes in a snapshot.
    pub fn text_fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.title.clone(),
            self.description.clone(),
            self.last_edited.to_rfc3339(),
        ];
        if let Some(deadline) = self.deadline {
            fields.push(deadline.format("%Y-%m-%d").to_string());
        }
        if let Some(status) = self.status {
            fields.push(status.as_str().to_string());
        }
        if let Some(reason) = &self.return_reason {
            fields.push(reason.clone());
        }
        fields
    }
}

/// User-supplied fields for create and edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

// Browser-written snapshots store an unset date input as "".
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// Locale renderings the browser board wrote via `toLocaleString()`.
const LOCALE_TIMESTAMPS: [&str; 3] = [
    "%m/%d/%Y, %I:%M:%S %p",
    "%d.%m.%Y, %H:%M:%S",
    "%d/%m/%Y, %H:%M:%S",
];

/// RFC 3339 first, then the known locale formats (read as UTC). Anything
/// else falls back to the load time rather than rejecting the snapshot.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_timestamp(&raw).unwrap_or_else(|| {
        tracing::warn!(value = %raw, "unreadable lastEdited, using load time");
        Utc::now()
    }))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim().replace(['\u{202f}', '\u{a0}'], " ");
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Some(ts.with_timezone(&Utc));
    }
    LOCALE_TIMESTAMPS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_stage_next_walks_pipeline_once() {
        let mut stage = Stage::Planned;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen, Stage::ALL.to_vec());
    }

    #[test]
    fn test_status_overdue_from_start_of_deadline_day() {
        let deadline = Some(date(2025, 1, 1));
        let midnight = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let afternoon = Utc.with_ymd_and_hms(2025, 1, 1, 15, 0, 0).unwrap();
        assert_eq!(TaskStatus::evaluate(deadline, at(2024, 12, 31)), TaskStatus::OnTime);
        assert_eq!(TaskStatus::evaluate(deadline, midnight), TaskStatus::OnTime);
        assert_eq!(TaskStatus::evaluate(deadline, afternoon), TaskStatus::Overdue);
        assert_eq!(TaskStatus::evaluate(deadline, at(2025, 1, 2)), TaskStatus::Overdue);
        assert_eq!(TaskStatus::evaluate(None, at(2099, 1, 1)), TaskStatus::OnTime);
    }

    #[test]
    fn test_frozen_status_wins_over_live() {
        let task = Task {
            id: 1,
            title: "Ship".into(),
            description: String::new(),
            deadline: Some(date(2025, 1, 1)),
            last_edited: at(2024, 12, 1),
            status: Some(TaskStatus::OnTime),
            return_reason: None,
        };
        assert_eq!(task.status_at(at(2030, 1, 1)), TaskStatus::OnTime);
    }

    #[test]
    fn test_task_deserializes_empty_deadline_as_absent() {
        let json = r#"{"id":3,"title":"Walk dog","description":"","deadline":"","lastEdited":"2025-03-01T10:00:00Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.deadline, None);
        assert_eq!(task.status, None);
        assert_eq!(task.return_reason, None);
    }

    #[test]
    fn test_task_serializes_camel_case_fields() {
        let task = Task {
            id: 2,
            title: "Review".into(),
            description: "PR".into(),
            deadline: Some(date(2025, 6, 30)),
            last_edited: at(2025, 6, 1),
            status: Some(TaskStatus::Overdue),
            return_reason: Some("flaky".into()),
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["deadline"], "2025-06-30");
        assert_eq!(value["status"], "overdue");
        assert_eq!(value["returnReason"], "flaky");
        assert!(value.get("lastEdited").is_some());
    }

    #[test]
    fn test_last_edited_accepts_browser_locale_strings() {
        let parse = |last_edited: &str| {
            let json = format!(
                r#"{{"id":1,"title":"t","lastEdited":{}}}"#,
                serde_json::to_string(last_edited).unwrap()
            );
            serde_json::from_str::<Task>(&json).unwrap().last_edited
        };
        let expected = Utc.with_ymd_and_hms(2025, 1, 2, 8, 15, 0).unwrap();

        assert_eq!(parse("2025-01-02T08:15:00Z"), expected);
        assert_eq!(parse("1/2/2025, 8:15:00 AM"), expected);
        assert_eq!(parse("1/2/2025, 8:15:00\u{202f}AM"), expected);
        assert_eq!(parse("02.01.2025, 08:15:00"), expected);
        assert_eq!(
            parse("1/2/2025, 8:15:00 PM"),
            Utc.with_ymd_and_hms(2025, 1, 2, 20, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_unreadable_last_edited_falls_back_to_load_time() {
        let before = Utc::now();
        let task: Task =
            serde_json::from_str(r#"{"id":1,"title":"t","lastEdited":"sometime"}"#).unwrap();
        assert!(task.last_edited >= before);
    }
}

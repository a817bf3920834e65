use crate::task::Task;

/// Tasks with any text field containing `query`, case-insensitively.
///
/// The query is trimmed first; a blank query matches every task.
pub fn search<'a, I>(tasks: I, query: &str) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let needle = query.trim().to_lowercase();
    tasks
        .into_iter()
        .filter(|task| matches(task, &needle))
        .collect()
}

fn matches(task: &Task, needle: &str) -> bool {
    needle.is_empty()
        || task
            .text_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn task(id: u64, title: &str, description: &str) -> Task {
        Task {
            id,
            title: title.into(),
            description: description.into(),
            deadline: None,
            last_edited: Utc.with_ymd_and_hms(2025, 2, 3, 8, 0, 0).unwrap(),
            status: None,
            return_reason: None,
        }
    }

    fn ids(found: Vec<&Task>) -> Vec<u64> {
        found.into_iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_search_matches_title_substring() {
        let tasks = [task(1, "Buy milk", ""), task(2, "Walk dog", "")];
        assert_eq!(ids(search(&tasks, "milk")), vec![1]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_trimmed() {
        let tasks = [task(1, "Buy MILK", ""), task(2, "Walk dog", "")];
        assert_eq!(ids(search(&tasks, "  Milk ")), vec![1]);
    }

    #[test]
    fn test_blank_query_matches_everything() {
        let tasks = [task(1, "Buy milk", ""), task(2, "Walk dog", "")];
        assert_eq!(ids(search(&tasks, "")), vec![1, 2]);
        assert_eq!(ids(search(&tasks, "   ")), vec![1, 2]);
    }

    #[test]
    fn test_search_covers_other_text_fields() {
        let mut a = task(1, "Deploy", "staging first");
        a.return_reason = Some("Broken Migration".into());
        let mut b = task(2, "Release", "");
        b.deadline = NaiveDate::from_ymd_opt(2025, 12, 24);
        b.status = Some(TaskStatus::Overdue);
        let c = task(3, "Nothing", "");
        let tasks = [a, b, c];

        assert_eq!(ids(search(&tasks, "staging")), vec![1]);
        assert_eq!(ids(search(&tasks, "migration")), vec![1]);
        assert_eq!(ids(search(&tasks, "2025-12-24")), vec![2]);
        assert_eq!(ids(search(&tasks, "overdue")), vec![2]);
    }

    #[test]
    fn test_search_does_not_match_numeric_id() {
        let tasks = [task(42, "Answer", "")];
        assert!(search(&tasks, "42").is_empty());
    }
}

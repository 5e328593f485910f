use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Local handle for a task. Never sent to the task store, which only knows
/// `{text, done}`; a task read from the wire gets a fresh id that stays put
/// for as long as its list sits in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn generate() -> Self {
        TaskId(Uuid::new_v4())
    }

    pub fn parse(input: &str) -> Option<Self> {
        Uuid::parse_str(input).ok().map(TaskId)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(skip, default = "TaskId::generate")]
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Task {
            id: TaskId::generate(),
            text: text.into(),
            done: false,
        }
    }
}

// Ids are local bookkeeping; two tasks are the same task if the store would
// see the same thing.
impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.done == other.done
    }
}

impl Eq for Task {}

pub type DayTaskList = Vec<Task>;

pub fn default_task_texts() -> Vec<String> {
    vec![
        "LeetCode".to_string(),
        "GitHub Contribution".to_string(),
        "Workout".to_string(),
    ]
}

/// A fresh list built from `texts`, every task not yet done.
pub fn task_list(texts: &[String]) -> DayTaskList {
    texts.iter().map(|text| Task::new(text.clone())).collect()
}

pub fn all_done(tasks: &[Task]) -> bool {
    !tasks.is_empty() && tasks.iter().all(|task| task.done)
}

use crate::date_key::DateKey;
use crate::task::{DayTaskList, Task, TaskId};

/// Completed over total for a non-empty list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percent: u32,
}

impl Progress {
    pub fn remaining(&self) -> usize {
        self.total - self.completed
    }
}

/// Editable copy of one day's tasks, as shown in the task modal.
///
/// Mutators return whether the list changed; every change is meant to be
/// followed by one save of the whole list.
#[derive(Debug, Clone)]
pub struct TaskEditor {
    key: DateKey,
    tasks: DayTaskList,
}

impl TaskEditor {
    pub fn open(key: DateKey, tasks: DayTaskList) -> Self {
        Self { key, tasks }
    }

    /// Replace the local list with the caller's newer one.
    pub fn sync(&mut self, tasks: DayTaskList) {
        self.tasks = tasks;
    }

    pub fn key(&self) -> &DateKey {
        &self.key
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn add(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.tasks.push(Task::new(text));
        true
    }

    pub fn toggle(&mut self, id: TaskId) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.done = !task.done;
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    pub fn progress(&self) -> Option<Progress> {
        let total = self.tasks.len();
        if total == 0 {
            return None;
        }

        let completed = self.tasks.iter().filter(|task| task.done).count();
        let percent = (completed as f64 / total as f64 * 100.0).round() as u32;

        Some(Progress {
            completed,
            total,
            percent,
        })
    }
}

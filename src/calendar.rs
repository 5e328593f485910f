use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cache::TaskCache;
use crate::date_key::{days_in_month, first_weekday_offset, DateKey};
use crate::task::{all_done, DayTaskList};

pub const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

pub const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// The month being looked at. `month0` is zero-based, like in date keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    pub year: i32,
    pub month0: u32,
}

impl MonthCursor {
    pub fn containing(date: NaiveDate) -> Self {
        MonthCursor {
            year: date.year(),
            month0: date.month0(),
        }
    }

    /// Move by whole months; negative goes back. Leaves the cache alone.
    /// A move past the ends of `i32` years stays put.
    pub fn navigate(self, delta_months: i32) -> Self {
        let index = i64::from(self.year) * 12 + i64::from(self.month0) + i64::from(delta_months);
        match i32::try_from(index.div_euclid(12)) {
            Ok(year) => MonthCursor {
                year,
                month0: index.rem_euclid(12) as u32,
            },
            Err(_) => self,
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, 1)
    }

    pub fn days_in_month(&self) -> u32 {
        self.first_day().map(days_in_month).unwrap_or(0)
    }

    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, day)
    }

    pub fn key(&self, day: u32) -> DateKey {
        DateKey::new(day, self.month0, self.year)
    }

    pub fn title(&self) -> String {
        let name = MONTH_NAMES.get(self.month0 as usize).copied().unwrap_or("");
        format!("{} {}", name, self.year)
    }
}

/// Layout of a month in Sunday-first rows of seven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthGrid {
    pub leading_blanks: u32,
    pub days: u32,
    pub trailing_blanks: u32,
}

impl MonthGrid {
    pub fn for_month(cursor: MonthCursor) -> Self {
        let leading_blanks = first_weekday_offset(cursor.year, cursor.month0);
        let days = cursor.days_in_month();
        let used = (leading_blanks + days) % 7;
        let trailing_blanks = if used == 0 { 0 } else { 7 - used };

        MonthGrid {
            leading_blanks,
            days,
            trailing_blanks,
        }
    }

    #[cfg(test)]
    pub fn rows(&self) -> u32 {
        (self.leading_blanks + self.days + self.trailing_blanks) / 7
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    /// A fetch for this day is running.
    Loading,
    Today { completed: bool },
    /// Shown as completed whatever its tasks say.
    Past,
    /// Shown as not completed whatever its tasks say.
    Future,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCell {
    pub day: u32,
    pub status: DayStatus,
}

/// Keys with a fetch in progress.
#[derive(Clone, Default)]
pub struct LoadingSet {
    keys: Arc<Mutex<HashSet<DateKey>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LoadingSet {
    pub fn contains(&self, key: &DateKey) -> bool {
        lock(&self.keys).contains(key)
    }

    /// Marks `key` loading until the guard is dropped.
    pub fn mark(&self, key: DateKey) -> LoadingGuard {
        lock(&self.keys).insert(key.clone());
        LoadingGuard {
            key,
            keys: self.keys.clone(),
        }
    }
}

pub struct LoadingGuard {
    key: DateKey,
    keys: Arc<Mutex<HashSet<DateKey>>>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        lock(&self.keys).remove(&self.key);
    }
}

/// Drives one rendered calendar: `today` is fixed when the view is built.
pub struct Calendar {
    cache: TaskCache,
    loading: LoadingSet,
    today: NaiveDate,
}

impl Calendar {
    pub fn new(cache: TaskCache, loading: LoadingSet, today: NaiveDate) -> Self {
        Self {
            cache,
            loading,
            today,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Loads today's list, and only today's.
    pub async fn mount(&self) -> DayTaskList {
        let key = DateKey::from_date(self.today);
        if let Some(tasks) = self.cache.get(&key) {
            return tasks;
        }
        let _loading = self.loading.mark(key.clone());
        self.cache.fetch(&key).await
    }

    /// The list the task modal opens with.
    pub async fn select_day(&self, key: &DateKey) -> DayTaskList {
        if let Some(tasks) = self.cache.get(key) {
            return tasks;
        }
        let _loading = self.loading.mark(key.clone());
        self.cache.fetch(key).await
    }

    pub fn day_status(&self, cursor: MonthCursor, day: u32) -> DayStatus {
        let key = cursor.key(day);
        if self.loading.contains(&key) {
            return DayStatus::Loading;
        }

        let Some(date) = cursor.date(day) else {
            return DayStatus::Neutral;
        };

        match date.cmp(&self.today) {
            Ordering::Equal => DayStatus::Today {
                completed: self.cache.get(&key).is_some_and(|tasks| all_done(&tasks)),
            },
            Ordering::Less => DayStatus::Past,
            Ordering::Greater => DayStatus::Future,
        }
    }

    pub fn month(&self, cursor: MonthCursor) -> Vec<DayCell> {
        (1..=cursor.days_in_month())
            .map(|day| DayCell {
                day,
                status: self.day_status(cursor, day),
            })
            .collect()
    }
}

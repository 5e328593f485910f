use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, get_service, post},
    Form, Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::cache::TaskCache;
use crate::calendar::{Calendar, LoadingSet, MonthCursor};
use crate::config::AppConfig;
use crate::date_key::DateKey;
use crate::editor::TaskEditor;
use crate::mail::{HttpMailer, Mailer};
use crate::reminder::ReminderJob;
use crate::session::{CookieStorage, Credentials, SessionState};
use crate::store::{HttpTaskStore, RemoteTaskStore, TaskStoreClient};
use crate::task::{DayTaskList, TaskId};
use crate::views;

pub const SAVE_FAILED_NOTICE: &str = "Couldn't save your changes. They are kept here and will be sent with the next edit.";

#[derive(Clone)]
pub struct AppState {
    cache: TaskCache,
    loading: LoadingSet,
    credentials: Credentials,
    reminder: Arc<ReminderJob>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(HttpTaskStore::new(
            config.store_url.clone(),
            config.user_id.clone(),
        ));
        let mailer = Arc::new(HttpMailer::new(config.mail_url.clone()));
        Self::with_services(config, store, mailer)
    }

    /// The calendar and the reminder job share one store.
    pub fn with_services(
        config: &AppConfig,
        store: Arc<dyn RemoteTaskStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let client = TaskStoreClient::new(store.clone(), config.default_tasks.clone());
        AppState {
            cache: TaskCache::new(client),
            loading: LoadingSet::default(),
            credentials: Credentials::new(config.user_id.clone(), config.password.clone()),
            reminder: Arc::new(ReminderJob::new(store, mailer, config.reminder.clone())),
        }
    }

    fn calendar(&self) -> Calendar {
        Calendar::new(self.cache.clone(), self.loading.clone(), Local::now().date_naive())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(homepage))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/days/{key}", get(open_day))
        .route("/days/{key}/tasks", post(add_task))
        .route("/days/{key}/tasks/{id}/toggle", post(toggle_task))
        .route("/days/{key}/tasks/{id}", delete(delete_task))
        .route("/api/check-tasks", get(check_tasks).post(check_tasks))
        .with_state(state)
        .nest_service("/static", get_service(ServeDir::new("static")))
}

/// `month` is zero-based. Out-of-range values, and years outside chrono's
/// range, fall back to the current month.
#[derive(Debug, Default, Deserialize)]
pub struct CursorQuery {
    year: Option<i32>,
    month: Option<u32>,
}

impl CursorQuery {
    fn cursor(&self, today: NaiveDate) -> MonthCursor {
        let mut cursor = MonthCursor::containing(today);
        if let Some(year) = self.year {
            // Years chrono cannot represent have no calendar to show.
            if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
                return cursor;
            }
            cursor.year = year;
        }
        if let Some(month) = self.month.filter(|m| *m < 12) {
            cursor.month0 = month;
        }
        cursor
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct AddTaskForm {
    #[serde(default)]
    text: String,
}

fn logged_in(headers: &HeaderMap) -> bool {
    SessionState::load(&CookieStorage::from_headers(headers)).logged_in
}

/// Sends a visitor without a session back to `/`. htmx requests get an
/// `HX-Redirect` so the whole page navigates instead of the fragment.
fn back_to_login(headers: &HeaderMap) -> Response {
    if headers.contains_key("hx-request") {
        (StatusCode::UNAUTHORIZED, [("HX-Redirect", "/")]).into_response()
    } else {
        Redirect::to("/").into_response()
    }
}

async fn homepage(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CursorQuery>,
) -> Html<String> {
    if !logged_in(&headers) {
        return Html(views::login_page(None));
    }

    let calendar = state.calendar();
    calendar.mount().await;
    let cursor = query.cursor(calendar.today());

    Html(views::calendar_page(&calendar, cursor))
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.credentials.check(&form.user_id, &form.password) {
        Ok(()) => {
            let mut storage = CookieStorage::from_headers(&headers);
            SessionState::initialize(&mut storage);
            tracing::info!("login succeeded");
            (storage.into_headers(), Redirect::to("/")).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "login rejected");
            Html(views::login_page(Some(&e.to_string()))).into_response()
        }
    }
}

async fn logout(headers: HeaderMap) -> Response {
    let mut storage = CookieStorage::from_headers(&headers);
    SessionState::clear(&mut storage);
    (storage.into_headers(), Redirect::to("/")).into_response()
}

async fn open_day(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Response {
    if !logged_in(&headers) {
        return back_to_login(&headers);
    }
    let Some(key) = DateKey::parse(&key) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let tasks = state.calendar().select_day(&key).await;
    let editor = TaskEditor::open(key, tasks);
    Html(views::task_modal(&editor, None)).into_response()
}

async fn add_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Form(form): Form<AddTaskForm>,
) -> Response {
    if !logged_in(&headers) {
        return back_to_login(&headers);
    }
    let Some(key) = DateKey::parse(&key) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    edit_day(&state, key, |editor| editor.add(&form.text)).await
}

async fn toggle_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((key, id)): Path<(String, String)>,
) -> Response {
    if !logged_in(&headers) {
        return back_to_login(&headers);
    }
    let (Some(key), Some(id)) = (DateKey::parse(&key), TaskId::parse(&id)) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    edit_day(&state, key, |editor| editor.toggle(id)).await
}

async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((key, id)): Path<(String, String)>,
) -> Response {
    if !logged_in(&headers) {
        return back_to_login(&headers);
    }
    let (Some(key), Some(id)) = (DateKey::parse(&key), TaskId::parse(&id)) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    edit_day(&state, key, |editor| editor.delete(id)).await
}

/// Applies one edit to the day's latest list and saves the whole list if it
/// changed. A failed save leaves the edit in place and shows a notice.
async fn edit_day(
    state: &AppState,
    key: DateKey,
    edit: impl FnOnce(&mut TaskEditor) -> bool,
) -> Response {
    let mut editor = TaskEditor::open(key.clone(), DayTaskList::new());

    let saved = state
        .cache
        .update(&key, |tasks| {
            editor.sync(tasks.clone());
            let changed = edit(&mut editor);
            if changed {
                *tasks = editor.tasks().to_vec();
            }
            changed
        })
        .await;

    let notice = match saved {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(date = %key, error = %e, "failed to save tasks");
            Some(SAVE_FAILED_NOTICE)
        }
    };

    Html(views::task_modal(&editor, notice)).into_response()
}

async fn check_tasks(State(state): State<AppState>) -> Response {
    let reply = state.reminder.respond().await;
    (reply.status, Json(reply.body)).into_response()
}

use hypertext::{prelude::*, Raw};

use crate::calendar::{Calendar, DayStatus, MonthCursor, MonthGrid, DAY_NAMES};
use crate::editor::TaskEditor;

// Fades the modal out, then drops it and refreshes the calendar grid so the
// cells reflect any edits.
const MODAL_SCRIPT: &str = r##"
function closeModal() {
    const modal = document.querySelector('#modal-container .modal-overlay');
    if (!modal) return;
    modal.classList.add('modal-closing');
    setTimeout(function () {
        document.getElementById('modal-container').innerHTML = '';
        htmx.ajax('GET', window.location.href, { target: '#calendar', select: '#calendar', swap: 'outerHTML' });
    }, 300);
}
"##;

fn page(title: &str, body: &str) -> String {
    maud! {
        !DOCTYPE
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                link rel="stylesheet" href="/static/app.css";
                script src="https://unpkg.com/htmx.org@2.0.4" {}
                script { (Raw::dangerously_create(MODAL_SCRIPT)) }
            }
            body {
                (Raw::dangerously_create(body))
            }
        }
    }
    .render()
    .into_inner()
}

pub fn login_page(error: Option<&str>) -> String {
    let error = error.unwrap_or_default();
    let body = maud! {
        div .login-page {
            div .login-card {
                h2 { "Task Manager" }
                p { "Login to continue" }
                form method="post" action="/login" {
                    input type="text" name="user_id" placeholder="User ID";
                    input type="password" name="password" placeholder="Password";
                    button .btn type="submit" { "Login" }
                }
                @if !error.is_empty() {
                    p .login-error { (error) }
                }
            }
        }
    }
    .render()
    .into_inner();

    page("Login - Task Manager", &body)
}

pub fn calendar_page(calendar: &Calendar, cursor: MonthCursor) -> String {
    let prev = cursor.navigate(-1);
    let next = cursor.navigate(1);
    let prev_url = format!("/?year={}&month={}", prev.year, prev.month0);
    let next_url = format!("/?year={}&month={}", next.year, next.month0);
    let grid = render_calendar(calendar, cursor);

    let body = maud! {
        header .app-header {
            h1 { "Task Manager" }
            form method="post" action="/logout" {
                button .btn type="submit" { "Logout" }
            }
        }
        main .calendar-page {
            div .month-nav {
                a .btn href=(prev_url) { "⟵ Prev" }
                h2 { (cursor.title()) }
                a .btn href=(next_url) { "Next ⟶" }
            }
            (Raw::dangerously_create(&grid))
            div .legend {
                span class="legend-item calendar-cell-past" { "✓ Completed" }
                span class="legend-item calendar-cell-today" { "◐ Today" }
                span class="legend-item calendar-cell-future" { "✕ Not completed" }
            }
            div #modal-container {}
        }
    }
    .render()
    .into_inner();

    page(&format!("{} - Task Manager", cursor.title()), &body)
}

fn render_calendar(calendar: &Calendar, cursor: MonthCursor) -> String {
    let grid = MonthGrid::for_month(cursor);
    let mut cells = String::new();

    cells.push_str(r#"<div class="calendar-header-row">"#);
    for day_name in DAY_NAMES {
        cells.push_str(&format!(r#"<div class="calendar-header-cell">{}</div>"#, day_name));
    }
    cells.push_str("</div>");

    cells.push_str(r#"<div class="calendar-days">"#);
    for _ in 0..grid.leading_blanks {
        cells.push_str(r#"<div class="calendar-cell calendar-cell-empty"></div>"#);
    }

    for cell in calendar.month(cursor) {
        cells.push_str(&render_day_cell(cursor, cell.day, cell.status));
    }

    for _ in 0..grid.trailing_blanks {
        cells.push_str(r#"<div class="calendar-cell calendar-cell-empty"></div>"#);
    }
    cells.push_str("</div>");

    format!(r#"<div class="calendar" id="calendar">{}</div>"#, cells)
}

fn render_day_cell(cursor: MonthCursor, day: u32, status: DayStatus) -> String {
    let (class, marker) = match status {
        DayStatus::Loading => {
            return r#"<button class="calendar-cell calendar-cell-loading" disabled><span class="skeleton"></span></button>"#
                .to_string();
        }
        DayStatus::Today { completed: true } => ("calendar-cell calendar-cell-today calendar-cell-completed", "✓"),
        DayStatus::Today { completed: false } => ("calendar-cell calendar-cell-today calendar-cell-pending", "◐"),
        DayStatus::Past => ("calendar-cell calendar-cell-past", "✓"),
        DayStatus::Future => ("calendar-cell calendar-cell-future", "✕"),
        DayStatus::Neutral => ("calendar-cell", ""),
    };

    format!(
        r##"<button class="{}" hx-get="/days/{}" hx-target="#modal-container" hx-swap="innerHTML"><span class="calendar-day-number">{}</span><span class="calendar-marker">{}</span></button>"##,
        class,
        cursor.key(day),
        day,
        marker
    )
}

pub fn task_modal(editor: &TaskEditor, notice: Option<&str>) -> String {
    let key = editor.key();
    let heading = key
        .to_date()
        .map(|date| date.format("%A, %B %-d").to_string())
        .unwrap_or_else(|| key.to_string());
    let notice = notice.unwrap_or_default();
    let progress_html = editor.progress().map(|progress| {
        maud! {
            div .modal-progress {
                span .progress-count { (format!("{}/{}", progress.completed, progress.total)) }
                div .progress-bar {
                    div .progress-fill style=(format!("width: {}%", progress.percent)) {}
                }
                div .progress-stats {
                    span { (format!("✓ {} done", progress.completed)) }
                    span { (format!("{} remaining", progress.remaining())) }
                }
                span .progress-percent { (format!("{}%", progress.percent)) }
            }
        }
        .render()
        .into_inner()
    })
    .unwrap_or_default();

    let rows: Vec<String> = editor
        .tasks()
        .iter()
        .map(|task| {
            let row_class = if task.done { "task-row task-row-done" } else { "task-row" };
            let text = maud! { span .task-text { (task.text) } }.render().into_inner();
            let check = if task.done { "✓" } else { "" };

            format!(
                r##"<li class="{row_class}">
                    <button class="task-check" hx-post="/days/{key}/tasks/{id}/toggle" hx-target="#modal-container" hx-swap="innerHTML">{check}</button>
                    {text}
                    <button class="task-delete" hx-delete="/days/{key}/tasks/{id}" hx-target="#modal-container" hx-swap="innerHTML">×</button>
                </li>"##,
                id = task.id,
            )
        })
        .collect();

    let add_form = format!(
        r##"<form class="task-add" hx-post="/days/{}/tasks" hx-target="#modal-container" hx-swap="innerHTML">
            <input type="text" name="text" placeholder="Add a new task..." autofocus>
            <button class="btn" type="submit">Add</button>
        </form>"##,
        key
    );

    maud! {
        div .modal-overlay {
            div .modal {
                div .modal-header {
                    h2 { (heading) }
                    (Raw::dangerously_create(r#"<button class="modal-close" onclick="closeModal()">×</button>"#))
                }

                @if !progress_html.is_empty() {
                    (Raw::dangerously_create(&progress_html))
                }

                @if !notice.is_empty() {
                    p .modal-notice { (notice) }
                }

                @if rows.is_empty() {
                    p .tasks-empty { "No tasks for this day" }
                } @else {
                    ul .task-list {
                        (Raw::dangerously_create(&rows.join("\n")))
                    }
                }

                (Raw::dangerously_create(&add_form))
            }
        }
    }
    .render()
    .into_inner()
}

//! Bounded plain-text rendering of a user's academic payload.
//!
//! The downstream text field has practical size limits, so every section is
//! capped and file snippets share one character budget. Sections are
//! independent renderers returning `Option<String>`; one absent or
//! malformed section never blanks the whole document.

use serde_json::Value;

use crate::utils::text::truncate_chars;

pub const MAX_ASSIGNMENT_LINES: usize = 200;
pub const MAX_COURSE_LINES: usize = 50;
pub const MAX_EVENT_LINES: usize = 100;
pub const EVENT_DESCRIPTION_CAP: usize = 500;
pub const MAX_FILE_ENTRIES: usize = 50;
/// Shared character budget for all extracted-text snippets in one summary.
pub const FILE_SNIPPET_BUDGET: usize = 16_000;
pub const FILE_SNIPPET_FLOOR: usize = 200;
pub const FILE_SNIPPET_CEILING: usize = 4_000;
pub const MAX_CHAT_LINES: usize = 200;
pub const CHAT_MESSAGE_CAP: usize = 1_200;
pub const FALLBACK_JSON_CAP: usize = 24_000;
pub const FALLBACK_RAW_CAP: usize = 10_000;

/// Render the payload into the text body pushed to the remote index.
#[must_use]
pub fn render(user_id: &str, payload: &Value) -> String {
    let sections = [
        render_profile(user_id, payload),
        render_assignments(payload),
        render_courses(payload),
        render_events(payload),
        render_files(payload),
        render_chats(payload),
        render_performance(payload),
        render_schedule(payload),
        render_plan(payload),
        render_stats(payload),
    ];
    let text = sections.into_iter().flatten().collect::<Vec<_>>().join("\n\n");
    if !text.is_empty() {
        return text;
    }

    // Nothing recognizable in the payload: fall back to a capped raw dump so
    // the resource still carries something searchable.
    match serde_json::to_string_pretty(payload) {
        Ok(raw) => truncate_chars(&raw, FALLBACK_JSON_CAP).to_string(),
        Err(_) => truncate_chars(&format!("{payload:?}"), FALLBACK_RAW_CAP).to_string(),
    }
}

fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| value.get(*k).and_then(Value::as_str)).filter(|s| !s.is_empty())
}

fn array<'a>(payload: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    payload.get(key).and_then(Value::as_array).filter(|a| !a.is_empty())
}

fn render_profile(user_id: &str, payload: &Value) -> Option<String> {
    let profile = payload.get("userProfile")?;
    let name = str_field(profile, &["name", "fullName", "firstName"]).unwrap_or("unknown");
    let mut line = format!("Student profile: {name} (user {user_id})");
    if let Some(email) = str_field(profile, &["email"]) {
        line.push_str(&format!(", email {email}"));
    }
    if let Some(school) = str_field(profile, &["school", "institution"]) {
        line.push_str(&format!(", {school}"));
    }
    Some(line)
}

fn render_assignments(payload: &Value) -> Option<String> {
    let assignments = array(payload, "assignments")?;
    let mut lines = vec![format!("Assignments ({} total)", assignments.len())];
    for item in assignments.iter().take(MAX_ASSIGNMENT_LINES) {
        let title = str_field(item, &["title", "name"]).unwrap_or("untitled");
        let course = str_field(item, &["course", "courseName"]).unwrap_or("no course");
        let due = str_field(item, &["dueDate", "due"]).unwrap_or("no due date");
        let status = str_field(item, &["status"]).unwrap_or("unknown");
        lines.push(format!("- {title} [{course}] due {due}, status {status}"));
    }
    Some(lines.join("\n"))
}

fn render_courses(payload: &Value) -> Option<String> {
    let courses = array(payload, "courses")?;
    let mut lines = vec![format!("Courses ({})", courses.len())];
    for course in courses.iter().take(MAX_COURSE_LINES) {
        let name = str_field(course, &["name", "title"]).unwrap_or("unnamed course");
        match str_field(course, &["code", "courseCode"]) {
            Some(code) => lines.push(format!("- {name} ({code})")),
            None => lines.push(format!("- {name}")),
        }
    }
    Some(lines.join("\n"))
}

fn render_events(payload: &Value) -> Option<String> {
    let events = array(payload, "events")?;
    let mut lines = vec![format!("Events ({})", events.len())];
    for event in events.iter().take(MAX_EVENT_LINES) {
        let title = str_field(event, &["title", "name"]).unwrap_or("untitled event");
        let start = str_field(event, &["start", "startTime", "date"]).unwrap_or("unscheduled");
        let mut line = format!("- {title} at {start}");
        if let Some(desc) = str_field(event, &["description"]) {
            line.push_str(": ");
            line.push_str(truncate_chars(desc, EVENT_DESCRIPTION_CAP));
        }
        lines.push(line);
    }
    Some(lines.join("\n"))
}

fn file_text<'a>(file: &'a Value) -> Option<&'a str> {
    str_field(file, &["extractedText", "text", "content"])
}

fn render_files(payload: &Value) -> Option<String> {
    let files = array(payload, "files")?;
    let shown: Vec<&Value> = files.iter().take(MAX_FILE_ENTRIES).collect();
    let mut lines = vec![format!("Files ({})", files.len())];

    // Snippets share one budget, split proportionally over the files that
    // still have text coming; floor and ceiling keep any single file from
    // starving or hogging the rest.
    let mut budget = FILE_SNIPPET_BUDGET;
    let mut remaining_with_text = shown.iter().filter(|f| file_text(f).is_some()).count();

    for file in &shown {
        let name = str_field(file, &["name", "fileName", "title"]).unwrap_or("unnamed file");
        let kind = str_field(file, &["type", "mimeType"]).unwrap_or("unknown type");
        lines.push(format!("- {name} ({kind})"));

        if let Some(text) = file_text(file) {
            if budget > 0 {
                let share = budget / remaining_with_text;
                let alloc = share.clamp(FILE_SNIPPET_FLOOR, FILE_SNIPPET_CEILING).min(budget);
                let snippet = truncate_chars(text, alloc);
                budget -= snippet.chars().count().min(alloc);
                lines.push(format!("  {snippet}"));
            }
            remaining_with_text -= 1;
        }
    }
    Some(lines.join("\n"))
}

fn render_chats(payload: &Value) -> Option<String> {
    let messages = array(payload, "chatMessages").or_else(|| array(payload, "recentMessages"))?;
    let mut lines = vec![format!("Recent chat messages ({})", messages.len())];
    for message in messages.iter().take(MAX_CHAT_LINES) {
        let role = str_field(message, &["role", "sender"]).unwrap_or("user");
        let content = str_field(message, &["content", "text"]).unwrap_or("");
        lines.push(format!("- {role}: {}", truncate_chars(content, CHAT_MESSAGE_CAP)));
    }
    Some(lines.join("\n"))
}

fn render_performance(payload: &Value) -> Option<String> {
    let performance = payload.get("performance")?;
    let mut lines = vec!["Performance".to_string()];
    if let Some(gpa) = performance.get("gpa") {
        if gpa.is_number() || gpa.is_string() {
            lines.push(format!("- GPA: {}", gpa.as_str().map_or_else(|| gpa.to_string(), String::from)));
        }
    }
    if let Some(grades) = performance.get("grades").and_then(Value::as_array) {
        for grade in grades {
            let course = str_field(grade, &["course", "courseName"]).unwrap_or("course");
            let mark = str_field(grade, &["grade", "score"]).unwrap_or("n/a");
            lines.push(format!("- {course}: {mark}"));
        }
    }
    if lines.len() == 1 { None } else { Some(lines.join("\n")) }
}

fn render_schedule(payload: &Value) -> Option<String> {
    let schedule = payload.get("schedule")?;
    if let Some(entries) = schedule.as_array().filter(|a| !a.is_empty()) {
        return Some(format!("Schedule: {} entries", entries.len()));
    }
    str_field(schedule, &["summary", "description"]).map(|s| format!("Schedule: {s}"))
}

fn render_plan(payload: &Value) -> Option<String> {
    let plan = payload.get("plan")?;
    let name = str_field(plan, &["name", "tier"])?;
    match str_field(plan, &["status"]) {
        Some(status) => Some(format!("Plan: {name} ({status})")),
        None => Some(format!("Plan: {name}")),
    }
}

fn render_stats(payload: &Value) -> Option<String> {
    let stats = payload.get("stats").and_then(Value::as_object).filter(|m| !m.is_empty())?;
    let mut lines = vec!["Statistics".to_string()];
    for (key, value) in stats {
        match value {
            Value::Number(n) => lines.push(format!("- {key}: {n}")),
            Value::String(s) => lines.push(format!("- {key}: {s}")),
            _ => {}
        }
    }
    if lines.len() == 1 { None } else { Some(lines.join("\n")) }
}

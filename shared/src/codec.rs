//! Plain-text export report and line-per-task import.
//!
//! Exporting and importing is deliberately lossy: `parse(format(tasks))` keeps the
//! task names and their order, but every imported task starts out not completed and
//! carries a placeholder id that the store replaces on import.

use std::collections::HashSet;
use std::fmt::Write;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{CodecError, Task, TaskId};

pub const SEPARATOR: &str = "----------------------------------------";
pub const EXPORT_MIME_TYPE: &str = "text/plain;charset=utf-8";

const TITLE: &str = "任务列表 - 导出时间：";
const TOTAL: &str = "总任务数：";
const COMPLETED_TOTAL: &str = "已完成任务数：";
const STATUS: &str = "状态：";
const STATUS_DONE: &str = "已完成";
const STATUS_OPEN: &str = "未完成";
const CREATED: &str = "创建时间：";
const CREATED_UNKNOWN: &str = "未知";

const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

// ASCII digits only; full-width and other script digits are part of the name.
static ORDINAL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.\s*").expect("ordinal pattern is valid"));

/// Format the report using the local clock for the header.
pub fn format(tasks: &[Task]) -> Result<String, CodecError> {
    format_tasks(tasks, Local::now())
}

/// Format the report with an explicit export time.
pub fn format_tasks(tasks: &[Task], exported_at: DateTime<Local>) -> Result<String, CodecError> {
    check_collection(tasks)?;

    let completed = tasks.iter().filter(|task| task.completed).count();
    let mut out = String::new();
    write_report(&mut out, tasks, completed, exported_at)
        .map_err(|e| CodecError::Malformed(format!("failed to write report: {}", e)))?;
    Ok(out)
}

fn write_report(
    out: &mut String,
    tasks: &[Task],
    completed: usize,
    exported_at: DateTime<Local>,
) -> std::fmt::Result {
    writeln!(out, "{}{}", TITLE, exported_at.format(DISPLAY_FORMAT))?;
    writeln!(out, "{}{}", TOTAL, tasks.len())?;
    writeln!(out, "{}{}", COMPLETED_TOTAL, completed)?;
    writeln!(out, "{}", SEPARATOR)?;
    writeln!(out)?;

    for (index, task) in tasks.iter().enumerate() {
        let status = if task.completed { STATUS_DONE } else { STATUS_OPEN };
        let created = task
            .created_at
            .as_deref()
            .map(display_timestamp)
            .unwrap_or_else(|| CREATED_UNKNOWN.to_string());

        writeln!(out, "{}. {}", index + 1, task.name)?;
        writeln!(out, "   {}{}", STATUS, status)?;
        writeln!(out, "   {}{}", CREATED, created)?;
        writeln!(out, "{}", SEPARATOR)?;
    }
    Ok(())
}

fn check_collection(tasks: &[Task]) -> Result<(), CodecError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if task.name.trim().is_empty() {
            return Err(CodecError::Malformed(format!("task {} has an empty name", task.id)));
        }
        if !seen.insert(task.id) {
            return Err(CodecError::Malformed(format!("duplicate task id {}", task.id)));
        }
    }
    Ok(())
}

/// Render a store timestamp for humans, falling back to the raw text.
fn display_timestamp(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Local).format(DISPLAY_FORMAT).to_string();
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(raw, pattern).ok())
        .map(|parsed| parsed.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Parse free text into new tasks, one per non-blank line.
///
/// A leading `12. ` ordinal is stripped. Every other non-blank line becomes a task
/// as-is, including the status and timestamp lines of an exported report.
pub fn parse(text: &str) -> Result<Vec<Task>, CodecError> {
    if text.trim().is_empty() {
        return Err(CodecError::EmptyContent);
    }

    let mut tasks: Vec<Task> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let name = ORDINAL_PREFIX.replace(line, "");
        let name = name.trim();
        if !name.is_empty() {
            let id = tasks.len() as TaskId + 1;
            tasks.push(Task::new(id, name.to_string()));
        }
    }

    if tasks.is_empty() {
        return Err(CodecError::NoValidTasks);
    }
    Ok(tasks)
}

/// Suggested download name for an export made at `at`, dated in UTC.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("todo-list-{}.txt", at.date_naive().format("%Y-%m-%d"))
}

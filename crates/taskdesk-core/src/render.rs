use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Local, Utc};
use taskdesk_shared::validate::DATE_FORMAT;
use taskdesk_shared::{Banner, BannerKind, FieldErrors, Statistics, Task, TaskPriority, User};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;

const TITLE_WIDTH: usize = 48;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(count = tasks.len()))]
    pub fn task_table<W: Write>(
        &self,
        out: &mut W,
        tasks: &[Task],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No tasks found.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Status".to_string(),
            "Priority".to_string(),
            "Due".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = self.paint(&task.id.to_string(), "33");
            let status = if task.status {
                self.paint("done", "32")
            } else {
                "pending".to_string()
            };
            let due = task
                .due_date
                .map(|due| due.with_timezone(&Local).format(DATE_FORMAT).to_string())
                .unwrap_or_default();
            let due = if task.is_overdue(now) {
                self.paint(&format!("{due} (overdue)"), "31")
            } else {
                due
            };
            let title = truncate(&task.title, TITLE_WIDTH);
            let title = if task.status {
                self.paint(&title, "9")
            } else {
                title
            };

            rows.push(vec![id, status, self.priority(task.priority), due, title]);
        }

        write_table(out, headers, rows)
    }

    pub fn task_info<W: Write>(
        &self,
        out: &mut W,
        task: &Task,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        writeln!(out, "status      {}", task.status_label())?;
        writeln!(out, "priority    {}", self.priority(task.priority))?;
        if let Some(due) = task.due_date {
            let mut line = due.with_timezone(&Local).format(DATE_FORMAT).to_string();
            if task.is_overdue(now) {
                line = self.paint(&format!("{line} (overdue)"), "31");
            }
            writeln!(out, "due         {line}")?;
        }
        writeln!(
            out,
            "created     {}",
            task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )?;
        if let Some(updated) = task.updated_at {
            writeln!(
                out,
                "updated     {}",
                updated.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            )?;
        }
        if let Some(description) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
            writeln!(out)?;
            for line in description.lines() {
                writeln!(out, "  {line}")?;
            }
        }
        Ok(())
    }

    pub fn statistics<W: Write>(&self, out: &mut W, stats: &Statistics) -> anyhow::Result<()> {
        writeln!(
            out,
            "{} total, {} completed, {} pending ({:.1}% complete)",
            stats.total_tasks,
            stats.completed_tasks,
            stats.pending_tasks,
            stats.completion_percentage
        )?;
        Ok(())
    }

    pub fn page_footer<W: Write>(&self, out: &mut W, page: u32, total: u32) -> anyhow::Result<()> {
        if total > 1 {
            writeln!(out, "Page {page} of {total}")?;
        }
        Ok(())
    }

    pub fn banner<W: Write>(&self, out: &mut W, banner: &Banner) -> anyhow::Result<()> {
        let code = match banner.kind {
            BannerKind::Success => "32",
            BannerKind::Error => "31",
        };
        writeln!(out, "{}", self.paint(&banner.text, code))?;
        Ok(())
    }

    pub fn field_errors<W: Write>(&self, out: &mut W, errors: &FieldErrors) -> anyhow::Result<()> {
        for (field, message) in errors {
            writeln!(out, "{}: {message}", self.paint(field, "31"))?;
        }
        Ok(())
    }

    pub fn user<W: Write>(&self, out: &mut W, user: &User) -> anyhow::Result<()> {
        writeln!(out, "{} ({})", user.display_name(), user.username)?;
        if !user.email.is_empty() {
            writeln!(out, "{}", user.email)?;
        }
        Ok(())
    }

    fn priority(&self, priority: TaskPriority) -> String {
        match priority {
            TaskPriority::High => self.paint(priority.label(), "31"),
            TaskPriority::Medium => self.paint(priority.label(), "33"),
            TaskPriority::Low => priority.label().to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn truncate(text: &str, max: usize) -> String {
    if UnicodeWidthStr::width(text) <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + w + 1 > max {
            break;
        }
        width += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(header.as_str()))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            write!(writer, "{cell}{} ", " ".repeat(width.saturating_sub(visible)))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }
        if ch == '\x1b' {
            escaped = true;
            continue;
        }
        out.push(ch);
    }

    out
}

use scrape_core::{
    estimated_minutes, AppViewModel, ConnectionState, FileRowView, JobStatus, JobStatusView,
    LogLevel, LogRecord,
};

/// Turns successive view models into terminal lines, printing only what changed.
#[derive(Debug, Default)]
pub struct Renderer {
    show_files: bool,
    status: Option<(JobStatus, Option<String>)>,
    stream: Option<ConnectionState>,
    printed_logs: usize,
    files: Option<Vec<(String, String)>>,
    submission_error: Option<String>,
}

impl Renderer {
    pub fn new(show_files: bool) -> Self {
        Self {
            show_files,
            ..Self::default()
        }
    }

    pub fn set_show_files(&mut self, show_files: bool) {
        self.show_files = show_files;
        self.files = None;
    }

    pub fn render(&mut self, view: &AppViewModel<'_>) -> Vec<String> {
        let mut lines = Vec::new();

        if view.submission_error != self.submission_error {
            if let Some(message) = &view.submission_error {
                lines.push(format!("error: {message}"));
            }
            self.submission_error = view.submission_error.clone();
        }

        if let Some(status) = &view.status {
            let key = (status.status, status.progress.clone());
            if self.status.as_ref() != Some(&key) {
                lines.push(status_line(status));
                if view.settled {
                    lines.extend(settled_lines(status));
                }
                self.status = Some(key);
            }
        }

        if view.active_job.is_some() && self.stream != Some(view.stream) {
            lines.push(format!("log stream: {}", stream_label(view.stream)));
            self.stream = Some(view.stream);
        }

        // The buffer only shrinks when cleared.
        if view.logs.len() < self.printed_logs {
            self.printed_logs = 0;
        }
        lines.extend(view.logs[self.printed_logs..].iter().map(log_line));
        self.printed_logs = view.logs.len();

        if self.show_files && view.files_loaded {
            let rows: Vec<_> = view
                .files
                .iter()
                .map(|row| (row.filename.clone(), row.size.clone()))
                .collect();
            if self.files.as_ref() != Some(&rows) {
                lines.extend(file_table(&view.files));
                self.files = Some(rows);
            }
        }

        lines
    }
}

pub fn status_line(status: &JobStatusView) -> String {
    match &status.progress {
        Some(progress) => format!(
            "[{}] {}: {}",
            status.job_id.short(),
            status.status,
            progress
        ),
        None => format!("[{}] {}", status.job_id.short(), status.status),
    }
}

fn settled_lines(status: &JobStatusView) -> Vec<String> {
    let mut lines = Vec::new();
    match status.status {
        JobStatus::Failed => {
            lines.push(format!(
                "job failed: {}",
                status.error.as_deref().unwrap_or("no error reported")
            ));
        }
        _ => {
            if let Some(completed_at) = status.completed_at {
                lines.push(format!(
                    "completed at {}",
                    completed_at.format("%Y-%m-%d %H:%M:%S")
                ));
            }
            if status.result_files.is_empty() {
                lines.push("no result files".to_string());
            } else {
                lines.push("result files:".to_string());
                lines.extend(status.result_files.iter().map(|name| format!("  {name}")));
            }
        }
    }
    lines
}

fn stream_label(state: ConnectionState) -> String {
    match state {
        ConnectionState::Retrying { attempt, delay_ms } => {
            format!("retrying (attempt {attempt}, in {delay_ms} ms)")
        }
        other => other.label().to_string(),
    }
}

pub fn log_line(record: &LogRecord) -> String {
    let tag = match record.level {
        LogLevel::Info => "INFO",
        LogLevel::Warning => "WARN",
        LogLevel::Error => "ERROR",
        LogLevel::Success => "OK",
    };
    format!("{} {:<5} {}", record.timestamp, tag, record.message)
}

pub fn file_table(rows: &[FileRowView]) -> Vec<String> {
    if rows.is_empty() {
        return vec!["no result files".to_string()];
    }
    let width = rows
        .iter()
        .map(|row| row.filename.chars().count())
        .max()
        .unwrap_or(0)
        .max("FILE".len());
    let mut lines = vec![format!("{:<width$}  {:>10}  CREATED", "FILE", "SIZE")];
    for row in rows {
        let marker = if row.busy { "  (deleting)" } else { "" };
        lines.push(format!(
            "{:<width$}  {:>10}  {}{}",
            row.filename,
            row.size,
            row.created_at.format("%Y-%m-%d %H:%M"),
            marker
        ));
    }
    lines
}

pub fn submission_banner(url: &str, max_results: u32) -> String {
    format!(
        "submitting {url} (up to {max_results} results, about {} min)",
        estimated_minutes(max_results)
    )
}

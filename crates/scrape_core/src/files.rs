use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Entry of `GET /api/files`. Identity is `filename`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFile {
    pub filename: String,
    pub size: u64,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

/// Last fetched file list plus the filenames with a delete in flight.
///
/// The list is replaced wholesale on each refresh; busy marks survive a
/// refresh because they track requests, not rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileSnapshot {
    files: Vec<ResultFile>,
    busy: BTreeSet<String>,
    loaded: bool,
    refreshing: bool,
}

impl FileSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, files: Vec<ResultFile>) {
        self.files = files;
        self.loaded = true;
        self.refreshing = false;
    }

    pub fn files(&self) -> &[ResultFile] {
        &self.files
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.files.iter().any(|file| file.filename == filename)
    }

    /// Marks `filename` busy. Returns false when a delete is already in flight.
    pub fn mark_busy(&mut self, filename: &str) -> bool {
        self.busy.insert(filename.to_string())
    }

    pub fn clear_busy(&mut self, filename: &str) -> bool {
        self.busy.remove(filename)
    }

    pub fn is_busy(&self, filename: &str) -> bool {
        self.busy.contains(filename)
    }

    pub fn busy(&self) -> impl Iterator<Item = &str> {
        self.busy.iter().map(String::as_str)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn set_refreshing(&mut self, refreshing: bool) {
        self.refreshing = refreshing;
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }
}

/// Human readable size: `512 B`, `1.50 KB`, `2.00 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    }
}

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use monitor_logging::{monitor_error, monitor_info, monitor_trace, monitor_warn};
use scrape_client::{local_filename, AtomicFileWriter, MonitorHandle, PersistError};
use scrape_core::{Effect, JobId, JobStatus, Msg};

use crate::render::submission_banner;

/// How delete confirmations are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    AssumeYes,
    Prompt,
}

/// Executes core effects against the client and the local filesystem.
pub struct EffectRunner {
    monitor: Arc<MonitorHandle>,
    writer: AtomicFileWriter,
    confirmation: Confirmation,
    completed: Option<(JobId, JobStatus)>,
}

impl EffectRunner {
    pub fn new(
        monitor: Arc<MonitorHandle>,
        output_dir: PathBuf,
        confirmation: Confirmation,
    ) -> Self {
        Self {
            monitor,
            writer: AtomicFileWriter::new(output_dir),
            confirmation,
            completed: None,
        }
    }

    /// The last completion signal, if one arrived since the previous call.
    pub fn take_completion(&mut self) -> Option<(JobId, JobStatus)> {
        self.completed.take()
    }

    /// Runs `effects` in order and returns the messages they produced synchronously.
    pub async fn run(&mut self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut follow_ups = Vec::new();
        for effect in effects {
            match effect {
                Effect::SubmitJob(request) => {
                    println!("{}", submission_banner(&request.url, request.max_results));
                    self.monitor.submit(request);
                }
                Effect::StartWatching { job_id } => {
                    println!("watching job {job_id}");
                    self.monitor.watch(job_id).await;
                }
                Effect::StopWatching { job_id } => self.monitor.unwatch(&job_id).await,
                Effect::JobCompleted { job_id, status } => {
                    monitor_info!("Completion signal job_id={} status={}", job_id, status);
                    self.completed = Some((job_id, status));
                }
                Effect::ScrollToLatest => monitor_trace!("Output follows the latest record"),
                Effect::SaveLogExport { filename, contents } => {
                    match self.save(&filename, contents.as_bytes()) {
                        Ok(path) => println!("logs saved to {}", path.display()),
                        Err(err) => {
                            monitor_error!("Failed to save {}: {}", filename, err);
                            eprintln!("could not save logs: {err}");
                        }
                    }
                }
                Effect::RefreshFiles => self.monitor.refresh_files(),
                Effect::DownloadFile { filename } => self.monitor.download(filename),
                Effect::ConfirmDelete { filename } => {
                    let confirmed = match self.confirmation {
                        Confirmation::AssumeYes => true,
                        Confirmation::Prompt => prompt_yes_no(&filename).await,
                    };
                    follow_ups.push(if confirmed {
                        Msg::DeleteConfirmed { filename }
                    } else {
                        Msg::DeleteCancelled { filename }
                    });
                }
                Effect::DeleteFile { filename } => self.monitor.delete(filename),
            }
        }
        follow_ups
    }

    /// Writes a downloaded file under its sanitized local name.
    pub fn save_download(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, PersistError> {
        self.save(&local_filename(filename), bytes)
    }

    fn save(&self, filename: &str, contents: &[u8]) -> Result<PathBuf, PersistError> {
        let path = self.writer.write(filename, contents)?;
        monitor_info!("Saved {} bytes to {:?}", contents.len(), path);
        Ok(path)
    }
}

async fn prompt_yes_no(filename: &str) -> bool {
    let question = format!("delete {filename}? [y/N] ");
    let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
        let mut stdout = io::stdout();
        stdout.write_all(question.as_bytes())?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    })
    .await;

    match answer {
        Ok(Ok(line)) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Ok(Err(err)) => {
            monitor_warn!("Could not read confirmation: {}", err);
            false
        }
        Err(err) => {
            monitor_warn!("Confirmation prompt failed: {}", err);
            false
        }
    }
}

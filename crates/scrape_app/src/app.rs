use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail};
use log::LevelFilter;
use monitor_logging::{monitor_debug, monitor_info, monitor_warn};
use scrape_client::{ChannelEventSink, ClientEvent, MonitorHandle};
use scrape_core::{update, AppState, ConnectionState, JobId, JobStatus, Msg, ScrapeForm};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::cli::{Cli, Command};
use crate::config::{config_path, load_config_file, resolve};
use crate::effects::{Confirmation, EffectRunner};
use crate::events::to_msg;
use crate::render::Renderer;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let path = config_path(&cli);
    let (file, file_problem) = match load_config_file(&path) {
        Ok(file) => (file.unwrap_or_default(), None),
        Err(err) => (Default::default(), Some(err)),
    };
    let settings = resolve(&cli, file)?;

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    monitor_logging::initialize(settings.log_destination(), level);
    if let Some(err) = file_problem {
        monitor_warn!("Ignoring config file: {:#}", err);
    }
    monitor_info!("Backend at {}", settings.client.base_url);

    let (tx, rx) = mpsc::unbounded_channel();
    let monitor = Arc::new(MonitorHandle::new(
        settings.client.clone(),
        Arc::new(ChannelEventSink::new(tx)),
    )?);
    let confirmation = match cli.command {
        Command::Delete { yes: true, .. } => Confirmation::AssumeYes,
        _ => Confirmation::Prompt,
    };
    let mut coordinator = Coordinator::new(
        monitor.clone(),
        rx,
        EffectRunner::new(monitor.clone(), settings.output_dir.clone(), confirmation),
    );

    let result = match cli.command {
        Command::Run {
            url,
            date_start,
            date_end,
            search_term,
            max_results,
            no_follow,
            keep_files_view,
            export_logs,
        } => {
            let form = ScrapeForm {
                url,
                date_start: date_start.unwrap_or_default(),
                date_end: date_end.unwrap_or_default(),
                search_term: search_term.unwrap_or_default(),
                max_results: max_results.unwrap_or_default(),
            };
            coordinator
                .run_job(form, !no_follow, keep_files_view, export_logs)
                .await
        }
        Command::Watch {
            job_id,
            export_logs,
        } => coordinator.watch(JobId::new(job_id), export_logs).await,
        Command::Files { watch } => coordinator.files(watch).await,
        Command::Download { filename } => coordinator.download(filename).await,
        Command::Delete { filename, .. } => coordinator.delete(filename).await,
        Command::Health => match monitor.health().await {
            Ok(()) => {
                println!("backend at {} is healthy", settings.client.base_url);
                Ok(())
            }
            Err(err) => Err(anyhow!(
                "backend at {} is unavailable: {err}",
                settings.client.base_url
            )),
        },
    };

    monitor.shutdown().await;
    result
}

/// How long a settled job's log stream may keep delivering before export.
const LOG_DRAIN_GRACE: Duration = Duration::from_secs(2);

fn never(_: &Msg, _: &AppState) -> bool {
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Done,
    Interrupted,
    Disconnected,
    TimedOut,
}

/// Single owner of [`AppState`]: drains client events, applies them through
/// `update`, executes the resulting effects and renders.
struct Coordinator {
    monitor: Arc<MonitorHandle>,
    events: mpsc::UnboundedReceiver<ClientEvent>,
    effects: EffectRunner,
    renderer: Renderer,
    state: AppState,
}

impl Coordinator {
    fn new(
        monitor: Arc<MonitorHandle>,
        events: mpsc::UnboundedReceiver<ClientEvent>,
        effects: EffectRunner,
    ) -> Self {
        Self {
            monitor,
            events,
            effects,
            renderer: Renderer::new(false),
            state: AppState::new(),
        }
    }

    async fn run_job(
        &mut self,
        form: ScrapeForm,
        follow: bool,
        keep_files_view: bool,
        export_logs: bool,
    ) -> anyhow::Result<()> {
        self.dispatch(Msg::FormSubmitted(form), &mut never).await;
        if !self.state.is_submitting() {
            bail!("{}", self.submission_error());
        }

        let exit = self
            .run_until(|msg, _| {
                matches!(
                    msg,
                    Msg::JobCreated { .. } | Msg::SubmissionFailed { .. }
                )
            })
            .await;
        if exit == Exit::Interrupted {
            return Ok(());
        }
        let Some(job_id) = self.state.active_job().cloned() else {
            bail!("{}", self.submission_error());
        };
        if !follow {
            println!("{job_id}");
            return Ok(());
        }

        self.follow_job(export_logs).await?;
        if keep_files_view {
            self.renderer.set_show_files(true);
            self.monitor.start_files_refresh().await;
            self.run_until(never).await;
        }
        Ok(())
    }

    async fn watch(&mut self, job_id: JobId, export_logs: bool) -> anyhow::Result<()> {
        self.dispatch(Msg::WatchRequested { job_id }, &mut never).await;
        self.follow_job(export_logs).await
    }

    /// Follows the active job until it settles or the user interrupts.
    async fn follow_job(&mut self, export_logs: bool) -> anyhow::Result<()> {
        let exit = self
            .run_until(|_, state| state.poller().is_settled())
            .await;
        match exit {
            Exit::Done | Exit::TimedOut => {}
            Exit::Interrupted => {
                let job_id = self.state.active_job().cloned();
                self.dispatch(Msg::StopClicked, &mut never).await;
                if let Some(job_id) = job_id {
                    println!("stopped watching {job_id}");
                }
                return Ok(());
            }
            Exit::Disconnected => bail!("client stopped before the job settled"),
        }

        if export_logs {
            self.drain_logs().await;
            self.dispatch(Msg::ExportLogsClicked, &mut never).await;
        }
        match self.effects.take_completion() {
            Some((job_id, JobStatus::Failed)) => bail!("job {job_id} failed"),
            _ => Ok(()),
        }
    }

    /// Keeps applying log records that arrive after the terminal status until
    /// the stream drops or [`LOG_DRAIN_GRACE`] runs out.
    async fn drain_logs(&mut self) {
        if self.state.view().stream == ConnectionState::Closed {
            return;
        }
        let deadline = Instant::now() + LOG_DRAIN_GRACE;
        let exit = self
            .run_until_deadline(Some(deadline), |msg, _| {
                matches!(
                    msg,
                    Msg::StreamStateChanged {
                        state: ConnectionState::Retrying { .. } | ConnectionState::Closed,
                        ..
                    }
                )
            })
            .await;
        monitor_debug!("Log drain before export ended with {:?}", exit);
    }

    async fn files(&mut self, watch: bool) -> anyhow::Result<()> {
        self.renderer.set_show_files(true);
        if watch {
            self.monitor.start_files_refresh().await;
            self.run_until(never).await;
            return Ok(());
        }
        self.load_files().await
    }

    async fn load_files(&mut self) -> anyhow::Result<()> {
        self.dispatch(Msg::RefreshFilesClicked, &mut never).await;
        let mut failure = None;
        self.run_until(|msg, _| match msg {
            Msg::FilesRefreshed(_) => true,
            Msg::FilesRefreshFailed { message } => {
                failure = Some(message.clone());
                true
            }
            _ => false,
        })
        .await;
        match failure {
            Some(message) => bail!("could not list result files: {message}"),
            None if self.state.files().is_loaded() => Ok(()),
            None => bail!("interrupted before the file list arrived"),
        }
    }

    async fn download(&mut self, filename: String) -> anyhow::Result<()> {
        let mut outcome = None;
        let mut done = |msg: &Msg, _: &AppState| match msg {
            Msg::DownloadFinished { filename: name, .. } if *name == filename => {
                outcome = Some(Ok(()));
                true
            }
            Msg::DownloadFailed {
                filename: name,
                message,
            } if *name == filename => {
                outcome = Some(Err(message.clone()));
                true
            }
            _ => false,
        };
        if !self
            .dispatch(
                Msg::DownloadClicked {
                    filename: filename.clone(),
                },
                &mut done,
            )
            .await
        {
            self.run_until(&mut done).await;
        }
        match outcome {
            Some(Ok(())) => Ok(()),
            Some(Err(message)) => bail!("{message}"),
            None => bail!("interrupted before {filename} was saved"),
        }
    }

    async fn delete(&mut self, filename: String) -> anyhow::Result<()> {
        self.load_files().await?;
        if !self.state.files().contains(&filename) {
            bail!("{filename} is not in the result file list");
        }

        let mut outcome = None;
        let mut done = |msg: &Msg, _: &AppState| match msg {
            Msg::FileDeleted { filename: name } if *name == filename => {
                outcome = Some(Ok(true));
                true
            }
            Msg::DeleteCancelled { filename: name } if *name == filename => {
                outcome = Some(Ok(false));
                true
            }
            Msg::FileDeleteFailed {
                filename: name,
                message,
            } if *name == filename => {
                outcome = Some(Err(message.clone()));
                true
            }
            _ => false,
        };
        if !self
            .dispatch(
                Msg::DeleteClicked {
                    filename: filename.clone(),
                },
                &mut done,
            )
            .await
        {
            self.run_until(&mut done).await;
        }
        match outcome {
            Some(Ok(true)) => {
                println!("deleted {filename}");
                Ok(())
            }
            Some(Ok(false)) => {
                println!("kept {filename}");
                Ok(())
            }
            Some(Err(message)) => bail!("{message}"),
            None => bail!("interrupted before {filename} was deleted"),
        }
    }

    fn submission_error(&self) -> String {
        self.state
            .view()
            .submission_error
            .unwrap_or_else(|| "submission failed".to_string())
    }

    /// Feeds events into the loop until `done` accepts a message, the user
    /// presses Ctrl-C, or the client side goes away.
    async fn run_until<F>(&mut self, done: F) -> Exit
    where
        F: FnMut(&Msg, &AppState) -> bool,
    {
        self.run_until_deadline(None, done).await
    }

    async fn run_until_deadline<F>(&mut self, deadline: Option<Instant>, mut done: F) -> Exit
    where
        F: FnMut(&Msg, &AppState) -> bool,
    {
        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);
        let timer = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now));
        tokio::pin!(timer);
        loop {
            let event = tokio::select! {
                _ = &mut interrupt => {
                    monitor_info!("Interrupted by user");
                    return Exit::Interrupted;
                }
                _ = &mut timer, if deadline.is_some() => return Exit::TimedOut,
                event = self.events.recv() => event,
            };
            let Some(event) = event else {
                return Exit::Disconnected;
            };
            let msg = self.translate(event);
            if self.dispatch(msg, &mut done).await {
                return Exit::Done;
            }
        }
    }

    fn translate(&self, event: ClientEvent) -> Msg {
        match event {
            ClientEvent::Downloaded {
                filename,
                result: Ok(bytes),
            } => match self.effects.save_download(&filename, &bytes) {
                Ok(path) => {
                    println!("saved {}", path.display());
                    Msg::DownloadFinished {
                        filename,
                        bytes: bytes.len() as u64,
                    }
                }
                Err(err) => Msg::DownloadFailed {
                    filename,
                    message: err.to_string(),
                },
            },
            other => to_msg(other),
        }
    }

    /// Applies `msg` and every message its effects produce, then renders.
    /// Returns whether `done` accepted any of them.
    async fn dispatch<F>(&mut self, msg: Msg, done: &mut F) -> bool
    where
        F: FnMut(&Msg, &AppState) -> bool,
    {
        let mut inbox = VecDeque::from([msg]);
        let mut finished = false;
        while let Some(msg) = inbox.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg.clone());
            self.state = state;
            finished |= done(&msg, &self.state);
            inbox.extend(self.effects.run(effects).await);
        }
        self.render();
        finished
    }

    fn render(&mut self) {
        if self.state.consume_dirty() {
            for line in self.renderer.render(&self.state.view()) {
                println!("{line}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scrape_client::ClientConfig;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COMPLETED_JOB: &str = r#"{"job_id":"abc123","status":"completed","progress":null,"result_files":["out_abc123.csv"],"error":null,"created_at":"2024-03-01T09:15:00","completed_at":"2024-03-01T09:20:00"}"#;

    const LATE_RECORDS: &str = concat!(
        "data: {\"timestamp\":\"t1\",\"message\":\"Saved 12 rows\",\"level\":\"info\"}\n\n",
        "data: {\"timestamp\":\"t2\",\"message\":\"Job finished\",\"level\":\"success\"}\n\n",
    );

    #[tokio::test]
    async fn exported_logs_include_records_streamed_after_settling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/abc123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(COMPLETED_JOB.to_string(), "application/json"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/logs/abc123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(LATE_RECORDS.to_string(), "text/event-stream")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = ClientConfig::from_base_url(&server.uri()).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor =
            Arc::new(MonitorHandle::new(config, Arc::new(ChannelEventSink::new(tx))).unwrap());
        let effects = EffectRunner::new(
            monitor.clone(),
            dir.path().to_path_buf(),
            Confirmation::AssumeYes,
        );
        let mut coordinator = Coordinator::new(monitor.clone(), rx, effects);

        coordinator
            .watch(JobId::new("abc123"), true)
            .await
            .unwrap();
        monitor.shutdown().await;

        let exported =
            std::fs::read_to_string(dir.path().join("scraper-logs-abc123.txt")).unwrap();
        assert_eq!(exported, "[t1] Saved 12 rows\n[t2] Job finished");
    }
}

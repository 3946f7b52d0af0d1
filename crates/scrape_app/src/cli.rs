use std::path::PathBuf;

use clap::{ArgEnum, Parser, Subcommand};
use serde::Deserialize;

/// Submit scraping jobs and follow their status, logs and result files
#[derive(Debug, Parser)]
#[clap(name = "scrape_monitor", version)]
pub struct Cli {
    /// Base URL of the scraping backend
    #[clap(long = "api-url", env = "SCRAPER_API_URL")]
    pub api_url: Option<String>,
    /// RON configuration file (default: ./scrape_monitor.ron)
    #[clap(long = "config")]
    pub config: Option<PathBuf>,
    /// Directory for downloads and log exports
    #[clap(long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Where diagnostics go
    #[clap(long = "log", arg_enum)]
    pub log: Option<LogTarget>,
    /// Log at debug level
    #[clap(short = 'v', long = "verbose")]
    pub verbose: bool,
    /// The sub-command to use
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// submit a new job and follow it until it settles
    Run {
        /// page to scrape
        url: String,
        #[clap(long = "date-start")]
        /// start of the date filter (YYYY-MM-DD)
        date_start: Option<String>,
        #[clap(long = "date-end")]
        /// end of the date filter (YYYY-MM-DD)
        date_end: Option<String>,
        #[clap(long = "search-term")]
        /// keyword filter
        search_term: Option<String>,
        #[clap(long = "max-results")]
        /// 1 to 500, default 50
        max_results: Option<String>,
        #[clap(long = "no-follow")]
        /// print the job id and exit
        no_follow: bool,
        #[clap(long = "keep-files-view")]
        /// keep refreshing the result files after the job settles
        keep_files_view: bool,
        #[clap(long = "export-logs")]
        /// save the job's logs once it settles
        export_logs: bool,
    },
    /// follow an existing job
    Watch {
        job_id: String,
        #[clap(long = "export-logs")]
        /// save the job's logs once it settles
        export_logs: bool,
    },
    /// list result files
    Files {
        #[clap(long)]
        /// keep refreshing until interrupted
        watch: bool,
    },
    /// save a result file into the output directory
    Download { filename: String },
    /// delete a result file on the backend
    Delete {
        filename: String,
        #[clap(short = 'y', long = "yes")]
        /// skip the confirmation prompt
        yes: bool,
    },
    /// check that the backend is reachable
    Health,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ArgEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// ./scrape_monitor.log
    File,
    /// stderr
    Terminal,
    /// both
    Both,
}

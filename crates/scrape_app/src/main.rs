mod app;
mod cli;
mod config;
mod effects;
mod events;
mod render;

use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run(Cli::parse()).await
}

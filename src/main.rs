mod app;
mod capture;
mod commands;
mod config;
mod dsp;
mod error;
mod logging;
mod pipeline;
mod setup;
mod ui;
mod waterfall;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}

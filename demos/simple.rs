use std::sync::Arc;
use std::time::Duration;

use pavlov_tv_api::engine::TvEngine;
use pavlov_tv_api::error::Result;
use pavlov_tv_api::http::ApiResult;
use pavlov_tv_api::model::{MatchStatus, MatchTime};
use pavlov_tv_api::process::ViewerProcess;
use pavlov_tv_api::sink::{ConnectionState, TelemetrySink};

/// A sink that prints the updates it cares about.
struct PrintSink;

impl TelemetrySink for PrintSink {
    fn on_state(&self, state: ConnectionState) {
        println!("connection: {}", state);
    }

    fn on_status(&self, update: ApiResult<MatchStatus>) {
        if let Some(status) = update.data() {
            println!(
                "match: {} on {}",
                status.game_mode.as_deref().unwrap_or("?"),
                status.map_name.as_deref().unwrap_or("?")
            );
        }
    }

    fn on_time(&self, update: ApiResult<MatchTime>) {
        if let Some(time) = update.data() {
            println!("t = {:.1}s", time.match_time);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Create an engine against the default local viewer URL.
    let engine = TvEngine::new(Arc::new(ViewerProcess::new()))?;
    engine.set_sink(Some(Arc::new(PrintSink)));

    // Start polling. State notifications and data updates arrive on the
    // sink from here on.
    engine.start();

    // Load a replay by catalog id.
    // let commands = pavlov_tv_api::commands::ViewerCommands::new()?;
    // commands.load_replay("5f2a9c0e8d1b4c").await?;

    // List the newest community replays.
    // let catalog = pavlov_tv_api::catalog::ReplayCatalog::new()?;
    // for replay in catalog.list_replays(None).await? {
    //     println!("{} {}", replay.id, replay.map_name.as_deref().unwrap_or("?"));
    // }

    tokio::time::sleep(Duration::from_secs(10)).await;

    engine.stop().await;
    Ok(())
}

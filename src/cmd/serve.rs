use anyhow::Result;

use reelnab::server::{self, AppState};
use reelnab::Config;

pub async fn cmd_serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    println!("🎬 reelnab {} on http://{}", reelnab::VERSION, config.server.bind);
    server::serve(config, state).await
}

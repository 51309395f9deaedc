//! Connect somewhere, register a printing handler, and watch the wrapper keep
//! itself alive.
//!
//! Run against any endpoint that pushes text frames:
//! ```sh
//! RUST_LOG=info cargo run --example subscribe --features tracing -- wss://ws.postman-echo.com/raw
//! ```

use std::sync::Arc;
use std::time::Duration;

use friendly_websocket::{Client, Config, EventKind, Origin};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = Config::default();
    config.path = "/raw".to_owned();
    // An explicit URL on the command line wins over the derived target.
    config.url = std::env::args().nth(1).map(|raw| raw.parse()).transpose()?;

    let origin = Origin::new("ws.postman-echo.com", true);
    let client = Client::new(config, &origin)?;

    client.on(
        EventKind::Message,
        Arc::new(|payload: &str| info!(payload, "message")),
    );

    let mut state_rx = client.state_receiver();
    state_rx.wait_for(|state| state.is_connected()).await?;
    info!(endpoint = %client.endpoint(), "connected");

    client.send("anybody home?");

    // Leave the wrapper running; kill the connection server-side to watch it
    // come back on its own after the fixed delay.
    tokio::time::sleep(Duration::from_secs(30)).await;
    Ok(())
}

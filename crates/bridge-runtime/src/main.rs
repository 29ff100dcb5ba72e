//! # Concord Bridge Runtime
//!
//! Replays blocks of bridge messages against a fresh state and reports the
//! result.
//!
//! ```text
//! bridge-runtime <config.json> [genesis.json] [blocks.json]
//! ```
//!
//! `blocks.json` is an array of blocks, each an array of `BridgeMsg`.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration
//! 2. Initialize telemetry
//! 3. Wire subsystems and import genesis
//! 4. Execute each block and commit it

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::{info, warn};

use bridge_runtime::{BridgeConfig, BridgeMsg, BridgeNode, Genesis};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1).map(PathBuf::from);
    let config_path = args
        .next()
        .context("usage: bridge-runtime <config.json> [genesis.json] [blocks.json]")?;
    let genesis_path = args.next();
    let blocks_path = args.next();

    let config = BridgeConfig::from_json_file(&config_path).context("Failed to load config")?;
    let _telemetry = bridge_telemetry::init_telemetry(config.telemetry.clone())
        .context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Concord Bridge Runtime v{}", bridge_runtime::VERSION);
    info!("===========================================");

    let genesis = match &genesis_path {
        Some(path) => Genesis::from_json_file(path).context("Failed to load genesis")?,
        None => Genesis::default(),
    };
    let node = BridgeNode::new(&config, &genesis).context("Failed to import genesis")?;

    let blocks: Vec<Vec<BridgeMsg>> = match &blocks_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&json).context("Failed to parse blocks")?
        }
        None => Vec::new(),
    };

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock before 1970")?
        .as_secs();
    for block in &blocks {
        let result = node.execute_block(block, now);
        for (msg, outcome) in block.iter().zip(&result.results) {
            if let Err(e) = outcome {
                warn!(height = result.height, msg = msg.name(), kind = e.kind().as_str(), "{}", e);
            }
        }
    }

    let query = node.query();
    let pending = query
        .list_pending_within_rate_limit(None)
        .context("Failed to list pending xmsgs")?;
    info!(
        height = query.height(),
        observers = query.observer_set().context("Failed to read observers")?.len(),
        pending_xmsgs = pending.total_pending,
        "Replay finished"
    );

    #[cfg(feature = "metrics")]
    match bridge_telemetry::metrics::export_text() {
        Ok(text) => println!("{text}"),
        Err(e) => warn!("Failed to export metrics: {}", e),
    }

    Ok(())
}

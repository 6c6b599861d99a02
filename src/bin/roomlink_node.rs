//! RoomLink Node
//!
//! Runs one installation node on a host: loads `config/node.yaml` (or
//! `NODE_CONFIG_PATH`, or `--config <path>`), connects the routes and keeps
//! the controller alive, rebuilding it after failures until Ctrl+C.
//!
//! Lines on stdin simulate the node's inputs: `card <id>`,
//! `press <button>`, `release <button>`.

use ambiance::infrastructure::hardware::{parse_input_line, ChannelInputs};
use ambiance::{init_tracing, DeviceController, Hardware, NodeConfig, ShutdownManager};
use anyhow::Context;
use crossbeam_channel::Receiver;
use roomlink::bin_common::{config_from_args, load_config_from_env, parse_args, supervise, ConfigType, RunConfig};
use std::io::BufRead;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before resolving the config path
    dotenv::dotenv().ok();

    let config_type = config_from_args(&parse_args()).unwrap_or(ConfigType::Node);
    let config_path = load_config_from_env(config_type);
    let config = NodeConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    init_tracing(&config.log_level);
    config.log();

    let run_config = RunConfig::new(format!("roomlink-node ({})", config.device_name));
    run_config.print_banner();

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    // One reader for the whole process; every rebuilt node drains the same channel
    let inputs = spawn_stdin_reader();

    let (node, stop) = (&config, &shutdown);
    let restarts = supervise(&run_config, &shutdown, move || {
        let inputs = inputs.clone();
        async move {
            let hardware = Hardware::host(node).with_inputs(Box::new(ChannelInputs::new(inputs)));
            let mut controller = DeviceController::new(node, hardware)?;
            controller.run(stop).await
        }
    })
    .await;

    run_config.print_shutdown(restarts);
    Ok(())
}

fn spawn_stdin_reader() -> Receiver<ambiance::infrastructure::InputEvent> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let spawned = std::thread::Builder::new()
        .name("stdin-inputs".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_input_line(&line) {
                    Some(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!("Ignoring input line '{}'", line.trim()),
                }
            }
            info!("stdin closed, no more simulated inputs");
        });
    if let Err(e) = spawned {
        warn!("No simulated inputs: {}", e);
    }
    rx
}

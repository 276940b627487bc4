use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, Command as CliCommand};
use voxel_bridge::commands::Command;
use voxel_bridge::core::{BridgeConfig, Config};
use voxel_bridge::foundation::logging;
use voxel_bridge::net::{DispatchError, ErrorCallback};
use voxel_bridge::{Bridge, RecordingTransport, ScriptReport};

fn main() -> Result<()> {
    let matches = CliCommand::new("voxel-bridge")
        .about("Runs a voxel scene script and streams the result to a renderer")
        .arg(
            Arg::new("script")
                .value_name("SCRIPT")
                .required_unless_present("write-config")
                .help("RON file holding a list of commands"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Bridge configuration (.toml or .ron)"),
        )
        .arg(
            Arg::new("room")
                .short('r')
                .long("room")
                .value_name("ROOM")
                .env("VOXEL_BRIDGE_ROOM")
                .help("Room to join until the script changes it"),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .env("VOXEL_BRIDGE_URL")
                .help("Relay endpoint (ws:// or wss://)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Default log filter; RUST_LOG takes precedence"),
        )
        .arg(
            Arg::new("write-config")
                .long("write-config")
                .value_name("FILE")
                .help("Save the effective configuration (.toml or .ron)"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Print snapshots instead of sending them"),
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => BridgeConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {path}"))?,
        None => BridgeConfig::default(),
    };
    if let Some(room) = matches.get_one::<String>("room") {
        config.scene.room_name.clone_from(room);
    }
    if let Some(url) = matches.get_one::<String>("url") {
        config.transport.server_url.clone_from(url);
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level.clone_from(level);
    }

    logging::init(&config.logging.level);
    config.validate().context("Invalid configuration")?;

    if let Some(path) = matches.get_one::<String>("write-config") {
        config
            .save_to_file(path)
            .with_context(|| format!("Failed to write config {path}"))?;
        log::info!("Wrote configuration to {path}");
    }

    let Some(script_path) = matches.get_one::<String>("script") else {
        return Ok(());
    };
    let text = std::fs::read_to_string(script_path)
        .with_context(|| format!("Failed to read script {script_path}"))?;
    let commands: Vec<Command> =
        ron::from_str(&text).with_context(|| format!("Failed to parse script {script_path}"))?;
    log::info!("Loaded {} commands from {script_path}", commands.len());

    if matches.get_flag("dry-run") {
        let mut bridge = Bridge::new(&config.scene, RecordingTransport::default());
        let report = bridge.run_script(&commands);
        for (room, payload) in &bridge.transport().sent {
            println!("{room}\t{payload}");
        }
        return finish(report, 0);
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(run(config, commands))
}

async fn run(config: BridgeConfig, commands: Vec<Command>) -> Result<()> {
    let transport_errors = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&transport_errors);
    let on_error: ErrorCallback = Arc::new(move |_: &DispatchError| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let mut bridge = Bridge::connect(&config, Some(on_error))?;
    let report = bridge.run_script(&commands);

    // Wait for the idle close so queued snapshots are delivered
    bridge.transport().flush().await?;
    bridge.into_transport().shutdown().await;

    finish(report, transport_errors.load(Ordering::Relaxed))
}

fn finish(report: ScriptReport, transport_errors: usize) -> Result<()> {
    log::info!(
        "Script done: {} applied, {} skipped, {} snapshot(s) sent",
        report.applied,
        report.failed,
        report.sent
    );
    if transport_errors > 0 {
        bail!("{transport_errors} transport error(s); see log for details");
    }
    if report.failed > 0 {
        log::warn!("{} command(s) failed", report.failed);
    }
    Ok(())
}

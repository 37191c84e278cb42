use anyhow::{Context, Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::{Coordinator, DobissSystem, Entities, build_entities};
use dobiss_agent::report::level_changes;
use dobiss_agent::{Cli, Command, ConfigManager, CoverAction};
use infrastructure::config::AgentConfig;

async fn run() -> Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,dobiss_agent=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Portable config discovery: prefer the crate directory when run from the workspace root
    let config_dir = cli.config_dir.clone().unwrap_or_else(|| {
        let dev_dir = "crates/dobiss-agent/config";
        if std::path::Path::new(dev_dir).exists() {
            dev_dir.to_string()
        } else {
            "config".to_string()
        }
    });
    debug!("📂 Config directory: {}", config_dir);

    let mut config = AgentConfig::load(&config_dir)
        .with_context(|| format!("loading configuration from {}", config_dir))?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let controller = &config.controller;
    info!(
        id = %controller.unique_id(),
        endpoint = %controller.endpoint(),
        driver = controller.driver.as_str(),
        "✅ Loaded configuration"
    );

    let system = Arc::new(DobissSystem::from_config(controller)?);
    let coordinator = Arc::new(Coordinator::new(
        system.clone(),
        controller.scan_interval(),
        controller.poll_timeout(),
    ));

    match cli.command() {
        Command::Run => serve(coordinator, config, config_dir, cli).await,
        Command::Check => {
            system.check_connection().await?;
            println!("Controller at {} is reachable", system.endpoint());
            Ok(())
        }
        Command::Import => {
            let topology = system.import_full_installation().await?;
            println!("{}", serde_json::to_string_pretty(&*topology)?);
            Ok(())
        }
        Command::Status => {
            let snapshot = coordinator.refresh().await?;
            println!("{}", serde_json::to_string_pretty(&*snapshot)?);
            Ok(())
        }
        Command::Set {
            module,
            index,
            level,
        } => {
            system.import_full_installation().await?;
            system.set_level(module, index, level).await?;
            Ok(())
        }
        Command::On { module, index } => {
            system.import_full_installation().await?;
            system.set_on(module, index).await?;
            Ok(())
        }
        Command::Off { module, index } => {
            system.import_full_installation().await?;
            system.set_off(module, index).await?;
            Ok(())
        }
        Command::Cover { id, action } => {
            coordinator.import_installation().await?;
            let entities = build_entities(&coordinator);
            let cover = entities
                .covers
                .iter()
                .find(|c| c.unique_id() == id)
                .ok_or_else(|| anyhow!("no cover with id {}", id))?;
            match action {
                CoverAction::Open => cover.open().await?,
                CoverAction::Close => cover.close().await?,
                CoverAction::Stop => cover.stop().await?,
            }
            Ok(())
        }
        Command::Watch { interval_secs } => watch(system, interval_secs).await,
    }
}

/// Long-running mode: poll on the configured interval and react to signals
async fn serve(
    coordinator: Arc<Coordinator>,
    config: AgentConfig,
    config_dir: String,
    cli: Cli,
) -> Result<()> {
    info!("🤖 Dobiss Agent Starting...");
    info!("🆔 Process ID: {}", std::process::id());

    let system = coordinator.system().clone();
    if let Err(e) = coordinator.refresh().await {
        // Not fatal: the coordinator keeps retrying on every tick
        warn!(error = %e, "Initial update failed");
    }
    log_entities(&build_entities(&coordinator));

    let cancel = CancellationToken::new();
    let runner = coordinator.clone();
    let token = cancel.clone();
    let coordinator_handle = tokio::spawn(async move { runner.run(token).await });

    // State change logger
    let mut values_rx = system.subscribe_values();
    let mut topology_rx = system.subscribe_topology();
    let watcher_coordinator = coordinator.clone();
    let watcher_handle = tokio::spawn(async move {
        let mut previous = values_rx.borrow_and_update().clone();
        loop {
            tokio::select! {
                changed = values_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = values_rx.borrow_and_update().clone();
                    let topology = watcher_coordinator.system().topology();
                    for change in level_changes(&topology, &previous, &current) {
                        info!(
                            output = %change.id,
                            name = %change.name,
                            from = ?change.from,
                            to = change.to,
                            "Output changed"
                        );
                    }
                    previous = current;
                }
                changed = topology_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    drop(topology_rx.borrow_and_update());
                    log_entities(&build_entities(&watcher_coordinator));
                }
            }
        }
    });

    let mut config_manager = ConfigManager::new(config_dir, config, cli, coordinator.clone());
    wait_for_shutdown(&coordinator, &mut config_manager).await?;

    info!("🛑 Shutting down...");
    cancel.cancel();
    if let Err(e) = coordinator_handle.await {
        warn!(error = %e, "Coordinator task failed");
    }
    watcher_handle.abort();

    info!("👋 Good bye!");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown(
    coordinator: &Coordinator,
    config_manager: &mut ConfigManager,
) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut user1 = signal(SignalKind::user_defined1())?;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!(error = %err, "Unable to listen for shutdown signal");
                }
                return Ok(());
            }
            _ = hangup.recv() => {
                info!("SIGHUP received, reloading options");
                match config_manager.reload() {
                    Ok(true) => {}
                    Ok(false) => info!("Options unchanged"),
                    Err(e) => warn!(error = %e, "Options reload failed, keeping current options"),
                }
            }
            _ = user1.recv() => {
                info!("SIGUSR1 received, re-importing installation");
                coordinator.request_import();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(
    _coordinator: &Coordinator,
    _config_manager: &mut ConfigManager,
) -> Result<()> {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {}
        Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
    }
    Ok(())
}

async fn watch(system: Arc<DobissSystem>, interval_secs: u64) -> Result<()> {
    system.import_full_installation().await?;
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = interval.tick() => {
                match system.request_all_status().await {
                    Ok(snapshot) => println!("{}", serde_json::to_string(&*snapshot)?),
                    Err(e) => warn!(error = %e, "Poll failed"),
                }
            }
        }
    }
}

fn log_entities(entities: &Entities) {
    info!(
        lights = entities.lights.len(),
        fans = entities.fans.len(),
        switches = entities.switches.len(),
        covers = entities.covers.len(),
        "Entities ready"
    );
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}

//! Alchemist Status Daemon - Entry Point
//!
//! Tracks deployment records for a configured set of agents, derives a
//! consistent deployment view per agent, and serves it over a local HTTP API.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use statusd::app::options::{AppOptions, LifecycleOptions, ServerOptions};
use statusd::app::run::run;
use statusd::logs::{init_logging, LogOptions};
use statusd::settings::Settings;
use statusd::utils::version_info;
use statusd::watch::poll;

use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "/etc/alchemist/statusd.json";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => eprintln!("Failed to render version info: {}", e),
        }
        return;
    }

    // Retrieve the settings file
    let config_path = cli_args
        .get("config")
        .cloned()
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let settings = match Settings::load(Path::new(&config_path)).await {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Unable to read settings file {}: {}", config_path, e);
            warn!("Falling back to default settings");
            Settings::default()
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    if settings.agents.is_empty() {
        warn!("No agents configured; the daemon will track nothing");
    }

    // Run the daemon
    let options = AppOptions {
        lifecycle: LifecycleOptions {
            is_persistent: settings.is_persistent,
            ..Default::default()
        },
        backend_base_url: settings.backend.base_url.clone(),
        api_key: settings.backend.api_key.clone(),
        agent_ids: settings.agents.clone(),
        enable_socket_server: settings.enable_socket_server,
        enable_reconciler: settings.enable_reconciler,
        server: ServerOptions {
            host: settings.server.host.clone(),
            port: settings.server.port,
        },
        poll: poll::Options {
            interval: Duration::from_secs(settings.poll_interval_secs),
            ..Default::default()
        },
        ..Default::default()
    };

    info!("Running Alchemist status daemon with options: {:?}", options);
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run the status daemon: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}

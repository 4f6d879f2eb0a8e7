use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use clap::{Parser, Subcommand};
use vcsbridge_core::config::{
  default_config_template, get_default_config_path, load_config, ConfigFile, DEFAULT_POLL_INTERVAL_SECS,
};
use vcsbridge_core::patch_vcs::PijulCli;
use vcsbridge_core::{BridgeError, SyncContext, SyncOrchestrator, Trigger};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[arg(short, long, value_name = "FILE", help = "Path to bridges.toml")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Manage bridge configuration
  Config {
    #[command(subcommand)]
    action: ConfigAction,
  },
  /// Run one sync pass for a configured bridge
  Run { bridge_id: String },
  /// Run sync passes on a fixed interval until interrupted
  Watch {
    bridge_id: String,
    #[arg(long, help = "Override the configured poll interval, in seconds")]
    interval_secs: Option<u64>,
  },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
  /// Create a default configuration file if one doesn't exist
  Init,
  /// List all configured bridges
  List,
  /// Show details for a specific bridge
  Show { bridge_id: String },
  /// Validate the configuration file
  Validate,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  env_logger::init();
  let cli = Cli::parse();

  if let Commands::Config {
    action: ConfigAction::Init,
  } = cli.command
  {
    return handle_config_init();
  }

  let config_file = match load_config(cli.config.as_deref()) {
    Ok(config) => {
      log::info!("loaded config with {} bridges", config.bridges.len());
      config
    }
    Err(BridgeError::ConfigNotFound(path)) => {
      eprintln!("Error: configuration file not found at {}", path.display());
      eprintln!("Run `vcsbridge config init` to create a default one, or pass --config.");
      exit(1);
    }
    Err(err) => {
      eprintln!("Error loading configuration: {err}");
      exit(1);
    }
  };

  let result = match cli.command {
    Commands::Config { action } => handle_config_action(action, &config_file),
    Commands::Run { bridge_id } => handle_run(&bridge_id, &config_file),
    Commands::Watch {
      bridge_id,
      interval_secs,
    } => handle_watch(&bridge_id, interval_secs, &config_file),
  };

  if let Err(err) = result {
    eprintln!("\nOperation failed: {err}");
    exit(1);
  }

  Ok(())
}

fn handle_config_init() -> Result<(), Box<dyn std::error::Error>> {
  let config_path = get_default_config_path()?;
  println!("Checking for configuration file at: {}", config_path.display());

  if config_path.exists() {
    println!("Configuration file already exists. No action taken.");
    return Ok(());
  }

  if let Some(parent) = config_path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(&config_path, default_config_template())?;

  println!("Created default configuration file at: {}", config_path.display());
  println!("Edit this file to define your bridges.");
  Ok(())
}

fn handle_config_action(
  action: ConfigAction,
  config: &ConfigFile,
) -> Result<(), Box<dyn std::error::Error>> {
  match action {
    ConfigAction::Init => unreachable!(),
    ConfigAction::List => {
      println!("Configured bridges:");
      if config.bridges.is_empty() {
        println!("  (none configured)");
      } else {
        for id in config.bridges.keys() {
          println!("- {id}");
        }
      }
    }
    ConfigAction::Show { bridge_id } => match config.bridges.get(&bridge_id) {
      Some(bridge) => println!("{bridge:#?}"),
      None => eprintln!("Error: bridge '{bridge_id}' not found in configuration."),
    },
    ConfigAction::Validate => {
      println!("Configuration loaded successfully.");
    }
  }
  Ok(())
}

fn build_orchestrator(
  bridge_id: &str,
  config: &ConfigFile,
) -> Result<SyncOrchestrator, Box<dyn std::error::Error>> {
  let bridge = config.bridge(bridge_id)?;
  let ctx = SyncContext::new(bridge.commit_repo_url.clone(), bridge.patch_repo_url.clone());
  let binary = config
    .settings
    .pijul_binary
    .clone()
    .unwrap_or_else(|| "pijul".to_string());
  let vcs = Box::new(PijulCli::with_binary(binary));
  Ok(SyncOrchestrator::new(bridge_id, ctx, vcs))
}

fn handle_run(bridge_id: &str, config: &ConfigFile) -> Result<(), Box<dyn std::error::Error>> {
  let mut orchestrator = build_orchestrator(bridge_id, config)?;
  orchestrator.run_once(Trigger::Initial)?;
  println!("Sync complete for bridge '{bridge_id}'.");
  Ok(())
}

fn handle_watch(
  bridge_id: &str,
  interval_override: Option<u64>,
  config: &ConfigFile,
) -> Result<(), Box<dyn std::error::Error>> {
  let bridge = config.bridge(bridge_id)?;
  let interval_secs = interval_override
    .or(bridge.poll_interval_secs)
    .or(config.settings.default_poll_interval_secs)
    .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

  let mut orchestrator = build_orchestrator(bridge_id, config)?;
  println!("Watching bridge '{bridge_id}' every {interval_secs}s. Press Ctrl-C to stop.");

  orchestrator.run_once(Trigger::Initial)?;
  loop {
    std::thread::sleep(Duration::from_secs(interval_secs));
    if let Err(err) = orchestrator.try_run_once(Trigger::Poll) {
      log::error!("sync failed: {err}");
    }
    while orchestrator.take_dirty() {
      if let Err(err) = orchestrator.try_run_once(Trigger::Poll) {
        log::error!("follow-up sync failed: {err}");
        break;
      }
    }
  }
}

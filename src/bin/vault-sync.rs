//! vault-sync CLI — fill empty settings from Vault before starting an app.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use vault_sync::boot::{self, Bootstrap};
use vault_sync::config::VaultConfig;
use vault_sync::engine::Engine;
use vault_sync::env::{MemoryEnv, ProcessEnv};
use vault_sync::envfile::{self, EnvKeyState};
use vault_sync::mapping::{MappingSource, MappingTable};
use vault_sync::model::{BootGuard, SyncPolicy};
use vault_sync::store::ConfigTree;
use vault_sync::telemetry::{TelemetryConfig, init_telemetry};
use vault_sync::vault::{SecretBundle, SecretStore, StaticStore, VaultClient};

#[derive(Parser)]
#[command(name = "vault-sync", about = "Fill empty settings from a Vault secret")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile without touching the process environment and print the result
    Run {
        #[command(flatten)]
        sync: SyncArgs,
        /// TOML file holding the application configuration tree
        #[arg(long)]
        app_config: Option<PathBuf>,
        /// Read the bundle from a JSON file instead of Vault
        #[arg(long)]
        secrets: Option<PathBuf>,
    },
    /// Reconcile into the process environment, then run a command
    Exec {
        #[command(flatten)]
        sync: SyncArgs,
        /// Command to run, e.g. `-- php artisan serve`
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
    /// Show which keys the env file declares and which are empty
    Scan {
        #[arg(long, default_value = ".env")]
        env_file: PathBuf,
    },
    /// Show the configuration path a secret key maps to
    Map {
        key: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SyncArgs {
    /// Env file consulted by the env-first policy
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
    /// TOML file with a [vault] table
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the sync policy (env | vault)
    #[arg(long)]
    sync_mode: Option<SyncPolicy>,
}

impl SyncArgs {
    fn vault_config(&self) -> anyhow::Result<VaultConfig> {
        let mut config = VaultConfig::load(self.config.as_deref())?;
        if let Some(policy) = self.sync_mode {
            config.sync_mode = policy;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let _guard = init_telemetry(TelemetryConfig::from_env("vault-sync"))?;

    match cli.command {
        Command::Run {
            sync,
            app_config,
            secrets,
        } => cmd_run(&sync, app_config.as_deref(), secrets.as_deref()),
        Command::Exec { sync, command } => cmd_exec(&sync, &command),
        Command::Scan { env_file } => cmd_scan(&env_file),
        Command::Map { key, config } => cmd_map(&key, config.as_deref()),
    }
}

fn cmd_run(
    sync: &SyncArgs,
    app_config: Option<&Path>,
    secrets: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    dotenvy::from_path(&sync.env_file).ok();
    let vault = sync.vault_config()?;
    let mut app_config = match app_config {
        Some(path) => ConfigTree::from_toml(&std::fs::read_to_string(path)?)?,
        None => ConfigTree::new(),
    };
    let mut env = MemoryEnv::with_vars(std::env::vars());

    let engine = Engine::from_config(&vault).env_file(&sync.env_file);
    let store: Box<dyn SecretStore> = match secrets {
        Some(path) => Box::new(static_store(&engine, path)?),
        None => Box::new(VaultClient::from_config(&vault)?),
    };

    let report = engine.reconcile(
        &mut BootGuard::new(),
        store.as_ref(),
        &mut app_config,
        &mut env,
    )?;

    let output = serde_json::json!({
        "report": report,
        "config": app_config.as_value(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(ExitCode::SUCCESS)
}

/// A store holding the JSON object in `path` at the engine's secret path.
fn static_store(engine: &Engine, path: &Path) -> anyhow::Result<StaticStore> {
    let bundle: SecretBundle = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    Ok(StaticStore::new().with_secret(engine.options().secret_path.resolve(), bundle))
}

fn cmd_exec(sync: &SyncArgs, command: &[String]) -> anyhow::Result<ExitCode> {
    dotenvy::from_path(&sync.env_file).ok();
    let vault = sync.vault_config()?;
    // The child process only sees the environment.
    let mut app_config = ConfigTree::new();

    // `php artisan config:cache` carries the maintenance command past argv[1].
    if let Some(maintenance) = command
        .iter()
        .skip(1)
        .find(|arg| boot::is_maintenance_command(arg))
    {
        tracing::info!(command = %maintenance, "maintenance command; not fetching secrets");
    } else {
        let mut bootstrap = Bootstrap::from_config(&vault, Some(sync.env_file.clone()));
        let mut env = ProcessEnv::new();
        if let Some(report) = bootstrap.boot_from_config(&vault, &mut app_config, &mut env) {
            tracing::info!(
                status = ?report.status,
                applied = report.applied_count(),
                "vault sync finished"
            );
        }
    }

    let Some((program, args)) = command.split_first() else {
        anyhow::bail!("no command given");
    };
    let status = std::process::Command::new(program).args(args).status()?;
    Ok(match status.code() {
        Some(code) => ExitCode::from(code.clamp(0, 255) as u8),
        None => ExitCode::FAILURE,
    })
}

fn cmd_scan(env_file: &Path) -> anyhow::Result<ExitCode> {
    let scan = envfile::scan(env_file);
    if scan.is_empty() {
        println!("No keys declared in {}.", env_file.display());
        return Ok(ExitCode::SUCCESS);
    }

    println!("{:<40}  STATE", "KEY");
    println!("{}", "-".repeat(56));
    for (key, state) in scan.iter() {
        let state = match state {
            EnvKeyState::PresentWithValue => "set",
            EnvKeyState::PresentEmpty => "empty",
            EnvKeyState::Absent => "absent",
        };
        println!("{key:<40}  {state}");
    }
    println!("\n{} key(s), {} empty", scan.len(), scan.empty_keys().len());
    Ok(ExitCode::SUCCESS)
}

fn cmd_map(key: &str, config: Option<&Path>) -> anyhow::Result<ExitCode> {
    let vault = VaultConfig::load(config)?;
    let table = MappingTable::new(&vault.config_mappings);

    let Some(path) = table.resolve(key) else {
        println!("{}: not mapped (environment only)", key.to_uppercase());
        return Ok(ExitCode::from(1));
    };
    let source = match table.source(key) {
        Some(MappingSource::Default(category)) => format!("default, {category}"),
        Some(MappingSource::Custom) => "custom".to_string(),
        None => "vault prefix".to_string(),
    };
    println!("{} -> {path} ({source})", key.to_uppercase());
    Ok(ExitCode::SUCCESS)
}

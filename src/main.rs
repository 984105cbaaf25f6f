use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{debug, info};

use twinpane::core::config::data::{default_settings_path, ConfigData, Options};
use twinpane::core::config::options::default_schema;
use twinpane::core::config::store::{JsonSettingsStore, SettingValue, SettingsStore};
use twinpane::core::config::types::{SortColumn, SortOrder};
use twinpane::core::format::size_to_string;
use twinpane::core::telemetry::logging::init_logging;
use twinpane::models::Connection;
use twinpane::services::fs::tree_size::{spawn_tree_size, TreeSizeUpdate};
use twinpane::services::fs::LocalVfs;
use twinpane::ui::components::Pane;
use twinpane::ui::NullSurface;

#[derive(Debug, Parser)]
#[command(name = "twinpane", about = "Two pane file manager core")]
struct Cli {
    /// Settings file (defaults to twinpane/settings.json in the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List a directory the way a pane shows it
    Ls {
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Sort column
        #[arg(long, default_value = "name")]
        sort: SortColumn,
        #[arg(long)]
        desc: bool,
        /// Mark entries matching this pattern before printing the summary
        #[arg(long)]
        mark: Option<String>,
    },
    /// Recursive size of a directory; Ctrl-C cancels
    Du { path: PathBuf },
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    List,
    Get { key: String },
    /// Lists are comma separated
    Set { key: String, value: String },
}

fn settings_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(path) = &cli.config {
        return Ok(path.clone());
    }
    let config_home =
        dirs::config_dir().ok_or_else(|| anyhow!("cannot determine the configuration directory"))?;
    Ok(default_settings_path(&config_home))
}

fn open_store(cli: &Cli) -> anyhow::Result<Rc<JsonSettingsStore>> {
    let path = settings_path(cli)?;
    let store = JsonSettingsStore::open(&path, default_schema())
        .with_context(|| format!("reading settings from {}", path.display()))?;
    Ok(Rc::new(store))
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    std::fs::canonicalize(path).with_context(|| format!("resolving {}", path.display()))
}

fn list(
    options: Options,
    path: &Path,
    sort: SortColumn,
    desc: bool,
    mark: Option<&str>,
) -> anyhow::Result<()> {
    let path = absolute(path)?;
    let options = Rc::new(options);
    let connection = Rc::new(Connection::home("/"));
    let mut pane = Pane::new(
        Default::default(),
        connection,
        &path,
        options.clone(),
        Rc::new(NullSurface),
    )?;
    let order = if desc {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    };
    pane.file_list_mut().set_sorting(sort, order);
    if let Some(pattern) = mark {
        pane.mark_by_pattern(pattern, options.case_sensitive);
    }

    for entry in pane.file_list().visible_files() {
        let marker = if pane.file_list().is_marked(entry) { '*' } else { ' ' };
        println!(
            "{marker} {}{} {:>8} {:>8} {:>12} {} {}",
            entry.info().file_type.as_char(),
            entry.permissions_string(options.permissions_display_mode),
            entry.owner(),
            entry.group(),
            entry.size_string(options.size_display_mode),
            entry.mdate_string(&options.date_format),
            entry.name(),
        );
    }
    println!("{}", pane.selection_label());
    Ok(())
}

async fn disk_usage(options: Options, path: &Path) -> anyhow::Result<()> {
    let path = absolute(path)?;
    let (tx, mut rx) = mpsc::channel(1);
    let task = spawn_tree_size(Arc::new(LocalVfs::new()), path.clone(), tx);

    let update = tokio::select! {
        update = rx.recv() => update,
        _ = tokio::signal::ctrl_c() => {
            info!("cancelling");
            task.cancel();
            rx.recv().await
        }
    };
    match update.ok_or_else(|| anyhow!("size computation ended without a result"))? {
        TreeSizeUpdate::Done { usage, .. } => {
            println!(
                "{}\t{} files, {} dirs\t{}",
                size_to_string(usage.bytes, options.size_display_mode),
                usage.files,
                usage.directories,
                path.display()
            );
            if let Some(err) = usage.interrupted {
                eprintln!("warning: partial result: {err}");
            }
            Ok(())
        }
        TreeSizeUpdate::Cancelled { .. } => bail!("cancelled"),
        TreeSizeUpdate::Failed { error, .. } => Err(error).context("measuring disk usage"),
    }
}

fn parse_setting(default: &SettingValue, raw: &str) -> anyhow::Result<SettingValue> {
    Ok(match default {
        SettingValue::Bool(_) => SettingValue::Bool(raw.parse().context("expected true or false")?),
        SettingValue::UInt(_) => SettingValue::UInt(raw.parse().context("expected a number")?),
        SettingValue::Str(_) => SettingValue::Str(raw.to_string()),
        SettingValue::StrList(_) => SettingValue::StrList(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        ),
    })
}

fn config(store: &JsonSettingsStore, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::List => {
            for key in default_schema().keys() {
                let value = store.value(key).unwrap_or(SettingValue::Str(String::new()));
                println!("{key} = {}", serde_json::to_string(&value)?);
            }
        }
        ConfigAction::Get { key } => {
            let value = store
                .value(&key)
                .ok_or_else(|| anyhow!("unknown key '{key}'"))?;
            println!("{}", serde_json::to_string(&value)?);
        }
        ConfigAction::Set { key, value } => {
            let default = store
                .default_value(&key)
                .ok_or_else(|| anyhow!("unknown key '{key}'"))?;
            store.set_value(&key, parse_setting(&default, &value)?)?;
            store.flush()?;
            debug!(key, "setting written");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let store = open_store(&cli)?;
    let options = ConfigData::load(store.clone()).options().clone();

    match cli.command {
        Command::Ls {
            path,
            sort,
            desc,
            mark,
        } => list(options, &path, sort, desc, mark.as_deref()),
        Command::Du { path } => disk_usage(options, &path).await,
        Command::Config { action } => config(&store, action),
    }
}

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use node_layout::common::config::{Config, config_file};
use node_layout::common::log;
use node_layout::layout_engine::NodeConfigEngine;
use node_layout::model::LayoutMode;
use node_layout::presets::PresetCatalog;
use node_layout::registry::BlockRegistry;
use node_layout::storage::StorageHandle;
use serde_json::json;

/// Inspect and manage stored node layouts and layout presets.
#[derive(Parser)]
#[command(name = "node-layout")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the stored documents (overrides the config file).
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every node with a stored layout
    List,
    /// Print the effective layout of a node
    Show {
        node: String,
        /// Only show this mode
        #[arg(long)]
        mode: Option<LayoutMode>,
    },
    /// Print a node's config as JSON
    Export { node: String },
    /// Replace a node's config with the JSON in FILE
    Import { node: String, file: PathBuf },
    /// Forget a node's layout
    Delete { node: String },
    /// Put one mode of a node back to the registry defaults
    Reset {
        node: String,
        #[arg(long)]
        mode: LayoutMode,
    },
    /// Apply a preset to one mode of a node
    ApplyPreset {
        node: String,
        preset: String,
        #[arg(long)]
        mode: LayoutMode,
    },
    /// Manage layout presets
    Preset {
        #[command(subcommand)]
        command: PresetCommands,
    },
    /// Work with the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum PresetCommands {
    /// List builtin and user presets
    List {
        #[arg(long)]
        node_type: Option<String>,
    },
    /// Print a preset as JSON
    Export { id: String },
    /// Add the preset in FILE as a new user preset
    Import { file: PathBuf },
    Rename { id: String, name: String },
    Delete { id: String },
    /// List every configured default preset
    Defaults,
    /// Show or change the default preset of a node type
    Default {
        node_type: String,
        /// Limit to one mode; both modes otherwise
        #[arg(long)]
        mode: Option<LayoutMode>,
        #[arg(long, value_name = "ID", conflicts_with = "unset")]
        set: Option<String>,
        #[arg(long)]
        unset: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Check the configuration file for problems
    Validate,
}

fn main() {
    let cli = Cli::parse();
    log::init_logging();

    if let Err(err) = run(cli) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config_file);
    let mut config = Config::read_or_default(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = Some(dir);
    }

    let storage = StorageHandle::from_settings(&config.storage);
    let registry = Arc::new(BlockRegistry::builtin());

    match cli.command {
        Commands::Config { command: ConfigCommands::Validate } => validate_config(&config),
        Commands::Preset { command } => {
            let mut catalog = PresetCatalog::from_registry(storage, &registry, &config.storage);
            run_preset_command(&mut catalog, &registry, command)
        }
        command => {
            let catalog = PresetCatalog::from_registry(storage.clone(), &registry, &config.storage);
            let mut engine = NodeConfigEngine::new(registry, storage, &config);
            run_node_command(&mut engine, &catalog, command)
        }
    }
}

fn validate_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    if issues.is_empty() {
        println!("Config validation passed");
        return Ok(());
    }
    for issue in &issues {
        eprintln!("{issue}");
    }
    bail!("{} configuration issue(s) found", issues.len());
}

fn run_node_command(
    engine: &mut NodeConfigEngine,
    catalog: &PresetCatalog,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::List => {
            for node_id in engine.node_ids() {
                let Some(config) = engine.get(node_id) else { continue };
                let summary: Vec<String> = LayoutMode::ALL
                    .iter()
                    .map(|&mode| {
                        let state = config.mode(mode);
                        format!("{mode}={}/{}", state.slots().len(), state.tab_groups().count())
                    })
                    .collect();
                println!("{node_id}\t{}\t{}", config.node_type(), summary.join(" "));
            }
        }
        Commands::Show { node, mode } => {
            let Some(config) = engine.get(&node) else { bail!("no layout stored for node {node}") };
            let mut shown = serde_json::Map::new();
            shown.insert("nodeType".into(), json!(config.node_type()));
            for m in LayoutMode::ALL.into_iter().filter(|m| mode.is_none_or(|only| only == *m)) {
                let items = serde_json::to_value(engine.effective_items(&node, m))?;
                shown.insert(m.to_string(), items);
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        Commands::Export { node } => match engine.export_node_config(&node) {
            Some(json) => println!("{json}"),
            None => bail!("no layout stored for node {node}"),
        },
        Commands::Import { node, file } => {
            let json = read_file(&file)?;
            if !engine.import_node_config(&node, &json) {
                bail!("{} is not a valid node layout", file.display());
            }
            println!("Imported layout for {node}");
        }
        Commands::Delete { node } => {
            if !engine.delete(&node) {
                bail!("no layout stored for node {node}");
            }
        }
        Commands::Reset { node, mode } => {
            if !engine.reset_mode(&node, mode) {
                bail!("no layout stored for node {node}");
            }
        }
        Commands::ApplyPreset { node, preset, mode } => {
            let Some(preset) = catalog.get_preset(&preset) else {
                bail!("unknown preset {preset}");
            };
            if !engine.apply_preset(&node, mode, preset) {
                bail!("cannot apply preset {} to node {node}", preset.id);
            }
        }
        Commands::Preset { .. } | Commands::Config { .. } => {}
    }
    Ok(())
}

fn run_preset_command(
    catalog: &mut PresetCatalog,
    registry: &BlockRegistry,
    command: PresetCommands,
) -> anyhow::Result<()> {
    match command {
        PresetCommands::List { node_type } => {
            for preset in catalog.get_all_presets(node_type.as_deref()) {
                let kind = if preset.is_builtin { "builtin" } else { "user" };
                println!("{}\t{}\t{kind}\t{}", preset.id, preset.node_type, preset.name);
            }
        }
        PresetCommands::Export { id } => match catalog.export_preset(&id) {
            Some(json) => println!("{json}"),
            None => bail!("unknown preset {id}"),
        },
        PresetCommands::Import { file } => {
            let json = read_file(&file)?;
            let Some(preset) = catalog.import_preset(&json) else {
                bail!("{} is not a valid preset", file.display());
            };
            println!("{}", preset.id);
        }
        PresetCommands::Rename { id, name } => {
            if !catalog.rename_preset(&id, &name) {
                bail!("no user preset {id}");
            }
        }
        PresetCommands::Delete { id } => {
            if !catalog.delete_preset(&id) {
                bail!("no user preset {id}");
            }
        }
        PresetCommands::Defaults => {
            for (node_type, ids) in catalog.default_presets().iter() {
                for mode in LayoutMode::ALL {
                    if let Some(id) = ids.get(mode) {
                        println!("{node_type}\t{mode}\t{id}");
                    }
                }
            }
        }
        PresetCommands::Default { node_type, mode, set, unset } => {
            if !registry.contains(&node_type) {
                bail!("unknown node type {node_type}");
            }
            let modes: Vec<LayoutMode> = mode.map_or(LayoutMode::ALL.to_vec(), |m| vec![m]);
            if let Some(id) = set {
                for &m in &modes {
                    if !catalog.set_default_preset(&node_type, m, &id) {
                        bail!("preset {id} is not a preset for {node_type}");
                    }
                }
            } else if unset {
                for &m in &modes {
                    catalog.unset_default_preset(&node_type, m);
                }
            } else {
                for m in modes {
                    let id = catalog.get_default_preset(&node_type, Some(m)).map(|p| p.id.as_str());
                    println!("{m}\t{}", id.unwrap_or("-"));
                }
            }
        }
    }
    Ok(())
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

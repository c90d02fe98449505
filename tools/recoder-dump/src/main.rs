// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! recoder-dump - Run the record rewrite pass over a YAML model
//!
//! Usage:
//!   recoder-dump rewrite samples/point.yaml
//!   recoder-dump rewrite samples/point.yaml --format json --output out.json
//!   recoder-dump check samples/point.yaml --config recoder.toml

mod model;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use model::{parse_type, zero_value, Model};
use recoder::classfile::disasm;
use recoder::{
    ComponentKeyRegistry, RecoderConfig, RecordTransformer, RewriteOutcome, Runtime,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "recoder-dump")]
#[command(about = "Rewrite records with registered components and show the result")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite each record and print its definition
    Rewrite {
        /// Model file (YAML)
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Load each record, construct an instance and print it
    Check {
        /// Model file (YAML)
        input: PathBuf,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Rewrite {
            input,
            format,
            output,
            config,
        } => cmd_rewrite(&input, format, output.as_deref(), config.as_deref()),
        Commands::Check { input, config } => cmd_check(&input, config.as_deref()),
    }
}

fn load_model(path: &Path) -> Result<Model> {
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let model = Model::from_yaml(&yaml)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    log::debug!(
        "[recoder-dump] {}: {} record(s), {} key(s)",
        path.display(),
        model.records.len(),
        model.keys.len()
    );
    Ok(model)
}

fn load_config(path: Option<&Path>) -> Result<RecoderConfig> {
    let config = match path {
        Some(path) => RecoderConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => RecoderConfig::default(),
    };
    let config = config.with_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn cmd_rewrite(
    input: &Path,
    format: Format,
    output: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let model = load_model(input)?;
    let config = load_config(config)?;
    let registry = Arc::new(ComponentKeyRegistry::new());
    model.register_keys(&registry)?;
    let transformer = RecordTransformer::new(Arc::clone(&registry), config);

    let mut text = String::new();
    let mut entries = Vec::new();
    for mut def in model.class_defs()? {
        let outcome = transformer
            .rewrite(&mut def)
            .with_context(|| format!("Failed to rewrite {}", def.binary_name()))?;
        let summary = match outcome {
            RewriteOutcome::Rewritten(summary) => Some(summary),
            _ => None,
        };
        match format {
            Format::Text => {
                text.push_str(&disasm::render(&def));
                text.push('\n');
            }
            Format::Json => entries.push(serde_json::json!({
                "summary": summary,
                "class": def,
            })),
        }
    }

    let rendered = match format {
        Format::Text => text,
        Format::Json => serde_json::to_string_pretty(&entries)?,
    };

    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("[OK] Wrote {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn cmd_check(input: &Path, config: Option<&Path>) -> Result<()> {
    let model = load_model(input)?;
    let config = load_config(config)?;
    let registry = Arc::new(ComponentKeyRegistry::new());
    model.register_keys(&registry)?;

    let mut runtime = Runtime::new(Arc::clone(&registry));
    runtime.add_transformer(Box::new(RecordTransformer::new(
        Arc::clone(&registry),
        config,
    )));

    for (record, def) in model.records.iter().zip(model.class_defs()?) {
        let class = runtime
            .define_class(def)
            .with_context(|| format!("Failed to load {}", record.name))?;
        let args = record
            .components
            .iter()
            .map(|c| parse_type(&c.ty).map(|ty| zero_value(&ty)))
            .collect::<Result<Vec<_>>>()?;
        let instance = runtime
            .construct(&class, args)
            .with_context(|| format!("Failed to construct {}", record.name))?;

        println!("[OK] {}", runtime.to_string(&instance)?);
        println!("     hashCode = {}", runtime.hash_code(&instance)?);
        for component in runtime.component_values(&instance)? {
            if let Some(facing) = &component.facing_name {
                println!(
                    "     + {} ({}) = {:?}",
                    facing, component.name, component.value
                );
            }
        }
    }
    Ok(())
}

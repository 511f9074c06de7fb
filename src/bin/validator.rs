//! Record Validator CLI
//!
//! Loads, validates, describes and generates examples for records declared
//! in a JSON descriptor file.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use familiar_records::{
    DescriptorLoader, EngineConfig, ExampleContext, Map, RecordType, Type, TypeRegistry, Value,
    ValuePath,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "record-validator")]
#[command(about = "Load, validate and describe records from JSON descriptors")]
struct Cli {
    /// Descriptor file (one record descriptor or a list)
    #[arg(short, long)]
    descriptors: PathBuf,

    /// Configuration file layered over records.toml
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a JSON document and report validation errors
    Load {
        /// Record type to load as (defaults to the last descriptor)
        #[arg(short, long)]
        record: Option<String>,
        /// Input JSON file
        input: PathBuf,
    },

    /// Generate an example record
    Example {
        #[arg(short, long)]
        record: Option<String>,
        /// Seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Print the describe tree of a record type
    Describe {
        #[arg(short, long)]
        record: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = EngineConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let mut loader = DescriptorLoader::new(TypeRegistry::new(), &config);
    let records = loader
        .load_file(&cli.descriptors)
        .with_context(|| format!("loading descriptors from {}", cli.descriptors.display()))?;
    let format = config.output.format;

    match cli.command {
        Commands::Load { record, input } => {
            let record_type = select(&records, record.as_deref())?;
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let loaded = record_type.load(Value::String(text), &ValuePath::root())?;
            let errors = record_type.validate_root(&loaded);

            println!("{}", format.render(&record_type.dump(&loaded))?);
            if errors.is_empty() {
                println!("✅ valid {}", Type::name(record_type));
            } else {
                println!("❌ {} validation error(s):", errors.len());
                for error in &errors {
                    println!("   └─ {}", error);
                }
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Example { record, seed } => {
            let record_type = select(&records, record.as_deref())?;
            let mut examples = config.examples.clone();
            if seed.is_some() {
                examples.seed = seed;
            }
            let mut ctx = ExampleContext::from_config(&examples);
            let value = record_type.example_with(&ValuePath::root(), &Map::new(), &mut ctx)?;
            println!("{}", format.render(&record_type.dump(&value))?);
            Ok(())
        }

        Commands::Describe { record } => {
            let record_type = select(&records, record.as_deref())?;
            println!("{}", format.render(&record_type.describe(false).to_json())?);
            Ok(())
        }
    }
}

fn select<'a>(records: &'a [RecordType], name: Option<&str>) -> anyhow::Result<&'a RecordType> {
    match name {
        Some(name) => records
            .iter()
            .find(|record| RecordType::name(record) == Some(name))
            .ok_or_else(|| anyhow!("no record type named {}", name)),
        None => match records.last() {
            Some(record) => Ok(record),
            None => bail!("descriptor file declares no record types"),
        },
    }
}

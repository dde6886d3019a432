//! Command-line front end over [`Model`].

use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::{Model, Progress};
use crate::package::{Block, blocks};
use crate::search::{MatchMode, Query};
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "debfind")]
#[command(about = "Search Debian package lists by stemmed keywords", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the user config dir, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding apt Packages files (overrides the config)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Ignore today's cache and re-read the package lists
    #[arg(long, global = true)]
    pub refresh: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List packages matching a query
    Query(QueryArgs),
    /// Show one package
    Show { name: String },
    /// List all sections
    Sections,
    /// Write the name list and indices as text files
    Dump {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Args)]
pub struct QueryArgs {
    /// Restrict to a section, e.g. "python" or "admin"
    #[arg(short, long, default_value = "")]
    pub section: String,
    /// Words to look for in names and descriptions
    #[arg(short, long, default_value = "")]
    pub desc: String,
    #[arg(long, value_enum, default_value_t = Mode::All)]
    pub desc_match: Mode,
    /// Words to look for in package names
    #[arg(short, long, default_value = "")]
    pub name: String,
    #[arg(long, value_enum, default_value_t = Mode::All)]
    pub name_match: Mode,
    /// Include library packages
    #[arg(long)]
    pub libs: bool,
    /// Include documentation packages
    #[arg(long)]
    pub docs: bool,
    /// Print matches with version and summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Mode {
    All,
    Any,
}

impl From<Mode> for MatchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::All => Self::All,
            Mode::Any => Self::Any,
        }
    }
}

impl QueryArgs {
    pub fn to_query(&self) -> Query {
        Query::new()
            .section(&self.section)
            .description_words(&self.desc, self.desc_match.into())
            .name_words(&self.name, self.name_match.into())
            .include_libraries(self.libs)
            .include_docs(self.docs)
    }
}

impl Cli {
    /// Build the engine configuration from the config file plus command-line overrides.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::discover(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.data_dir.clone_from(dir);
        }
        Ok(config)
    }
}

/// Load the model and run the selected command.
pub async fn run(cli: Cli) -> Result<()> {
    let model = Model::new(cli.engine_config()?)?;

    model
        .load(
            |p| match p {
                Progress::Working(message) => tracing::info!("{}", message),
                Progress::Ready(message) => tracing::info!("{} Ready.", message),
            },
            cli.refresh,
        )
        .await
        .context("Failed to load package lists")?;

    match cli.command {
        Commands::Query(args) => print_query(&model, &args)?,
        Commands::Show { name } => print_record(&model, &name)?,
        Commands::Sections => {
            for section in model.all_sections() {
                println!("{}", section);
            }
        }
        Commands::Dump { dir } => model
            .dump_indices(&dir)
            .with_context(|| format!("Failed to dump indices to {}", dir.display()))?,
    }
    Ok(())
}

fn print_query(model: &Model, args: &QueryArgs) -> Result<()> {
    let query = args.to_query();
    let names = model.query(&query);

    if args.json {
        let matches: Vec<_> = names
            .iter()
            .filter_map(|name| model.record_for(name))
            .map(|record| {
                serde_json::json!({
                    "name": record.name,
                    "version": record.version,
                    "section": record.section,
                    "summary": record.summary(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&matches)?);
    } else {
        for name in &names {
            println!("{}", name);
        }
        eprintln!("{} matching packages ({})", names.len(), query);
    }
    Ok(())
}

fn print_record(model: &Model, name: &str) -> Result<()> {
    let record = model
        .record_for(name)
        .with_context(|| format!("No package named '{}'", name))?;

    println!("{} {}", record.name, record.version);
    println!("Section: {}", record.section);
    if !record.url.is_empty() {
        println!("Homepage: {}", record.url);
    }
    if record.size > 0 {
        println!("Installed size: {} KiB", record.size);
    }
    println!();
    for block in blocks(&record.description) {
        match block {
            Block::Paragraph(text) => println!("{}\n", text),
            Block::List(items) => {
                for item in items {
                    println!("  • {}", item);
                }
                println!();
            }
        }
    }
    Ok(())
}

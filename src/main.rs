//! yaraforge 命令行入口

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use yaraforge::{sanitize_identifier, CompiledRef, ConfigManager, RuleForge, RuleRequest};

#[derive(Parser, Debug)]
#[command(name = "yaraforge", version, about = "Generate, compile and round-trip YARA rules")]
struct Cli {
    /// Directory holding .yar sources and .bin compiled rules
    #[arg(short, long, default_value = yaraforge::config::RULES_DIR)]
    rules_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render, store and compile a rule request (JSON), print the recovered source
    Compile {
        /// Rule request JSON file
        request: PathBuf,
        /// Do not treat compiler warnings as errors
        #[arg(long)]
        allow_warnings: bool,
    },
    /// Render a rule request (JSON) without storing or compiling it
    Render {
        /// Rule request JSON file
        request: PathBuf,
    },
    /// Rebuild rule source from stored compiled rules
    Recover {
        /// Rule name (file stem inside the rules directory)
        name: String,
        /// Condition expression (not kept in compiled rules)
        #[arg(short, long)]
        condition: String,
        /// Print the recovered match record as JSON instead of rule source
        #[arg(long)]
        json: bool,
    },
    /// Print the sanitized form of a rule name
    Sanitize {
        raw: String,
    },
}

fn read_request(path: &Path) -> Result<RuleRequest> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    RuleRequest::from_json_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = ConfigManager::custom().rules_dir(&cli.rules_dir).build();
    let forge = RuleForge::new(config);
    debug!("Rules directory: {}", cli.rules_dir.display());

    match cli.command {
        Command::Compile {
            request,
            allow_warnings,
        } => {
            let req = read_request(&request)?;
            let source = forge.compile_from_source_with(&req, !allow_warnings)?;
            println!("{}", source);
        }
        Command::Render { request } => {
            let req = read_request(&request)?;
            println!("{}", forge.render_request(&req)?.source);
        }
        Command::Recover {
            name,
            condition,
            json,
        } => {
            if json {
                let record = forge.recover_record(CompiledRef::Stored(&name), &condition)?;
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                let source = forge.recover_source(CompiledRef::Stored(&name), &condition)?;
                println!("{}", source);
            }
        }
        Command::Sanitize { raw } => {
            println!("{}", sanitize_identifier(&raw));
        }
    }

    Ok(())
}

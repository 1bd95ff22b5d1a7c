pub mod config;
pub mod stock;
pub mod store;
pub mod types;

use std::path::Path;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::stock::{
    InitOptions, StockError, commit_head, get_current_head, init_repo, require_stock_root,
};
use crate::store::{HangarStore, VersionStore};

#[derive(Parser)]
#[command(
    name = "stock",
    about = "Stockroom - track data store commits alongside git"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn the current git repository into a stock repository
    Init {
        /// User name for a new store (falls back to the config file)
        #[arg(long)]
        name: Option<String>,

        /// User email for a new store (falls back to the config file)
        #[arg(long)]
        email: Option<String>,

        /// Discard any existing store and start fresh
        #[arg(long)]
        overwrite: bool,
    },

    /// Print the stock root of the current directory
    Root,

    /// Print the current head commit
    Head,

    /// Commit to the store and move the head to the new commit
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Show the store history
    Log {
        /// Print the log as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = run(cli.command);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        match e.downcast_ref::<StockError>() {
            Some(StockError::NotAGitRepo(_)) => {
                eprintln!();
                eprintln!("Hint: Run `git init` first");
            }
            Some(StockError::MissingIdentity) => {
                eprintln!();
                eprintln!("Hint: Pass --name and --email, or set user_name and user_email in");
                eprintln!(
                    "      {}",
                    Config::default_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "the stockroom config file".into())
                );
            }
            _ => {}
        }
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;

    match command {
        Commands::Init {
            name,
            email,
            overwrite,
        } => cmd_init(&cwd, name, email, overwrite),
        Commands::Root => cmd_root(&cwd),
        Commands::Head => cmd_head(&cwd),
        Commands::Commit { message } => cmd_commit(&cwd, &message),
        Commands::Log { json } => cmd_log(&cwd, json),
    }
}

fn cmd_init(
    cwd: &Path,
    name: Option<String>,
    email: Option<String>,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let options = InitOptions {
        name: name.or(config.user_name),
        email: email.or(config.user_email),
        overwrite,
    };

    let report = init_repo::<HangarStore>(cwd, &options)?;

    if report.adopted {
        println!(
            "Hangar repo already exists at {}. Initializing it as stock repository",
            report.root.display()
        );
    }
    if report.created_head_file {
        println!("Stock file created");
    }
    if report.updated_gitignore {
        println!("Added .hangar to .gitignore");
    }

    Ok(())
}

fn cmd_root(cwd: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let root = require_stock_root(cwd)?;
    println!("{}", root.display());
    Ok(())
}

fn cmd_head(cwd: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let root = require_stock_root(cwd)?;
    let head = get_current_head(&root)?;
    if head.is_empty() {
        println!("No commits yet");
    } else {
        println!("{}", head);
    }
    Ok(())
}

fn cmd_commit(cwd: &Path, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    let root = require_stock_root(cwd)?;
    let commit = commit_head::<HangarStore>(&root, message)?;
    println!("Committed {}", commit);
    Ok(())
}

fn cmd_log(cwd: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let root = require_stock_root(cwd)?;
    let store = HangarStore::open_or_create(&root)?;
    let log = store.log()?;
    drop(store);

    if json {
        println!("{}", serde_json::to_string_pretty(&log)?);
        return Ok(());
    }

    if log.order.is_empty() {
        println!("No commits yet");
        return Ok(());
    }

    let current = get_current_head(&root)?;
    for digest in &log.order {
        let spec = &log.specs[digest];
        let marker = if *digest == current { "*" } else { " " };
        println!(
            "{} {}  {}  ({} <{}>)",
            marker,
            &digest[..digest.len().min(12)],
            spec.message,
            spec.user_name,
            spec.user_email
        );
    }

    Ok(())
}

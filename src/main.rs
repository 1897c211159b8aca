use std::path::PathBuf;

use anyhow::Context as _;
use clap::{ArgAction, Parser};

use snrekey::prelude::*;

/// snrekey - re-key the strong name of managed modules and fix every module
/// that depends on them
#[derive(Debug, Parser)]
#[command(name = "snrekey", version, about, long_about = None)]
struct Cli {
    /// Add a directory to search for target and dependent modules (repeatable).
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    search_dirs: Vec<PathBuf>,

    /// Key pair file to re-sign with; omit to strip signatures entirely.
    #[arg(short = 'k', long = "key", value_name = "FILE")]
    key: Option<PathBuf>,

    /// List each closure member's resolved path, one per line, without
    /// mutating anything.
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Increase diagnostic detail (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Target module names or paths.
    #[arg(required = true, value_name = "MODULE")]
    targets: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Diagnostics on stderr, keeping stdout for --list output; RUST_LOG overrides.
    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_module("snrekey", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let search_dirs = if cli.search_dirs.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        cli.search_dirs.clone()
    };

    let key = match &cli.key {
        Some(path) => Some(
            StrongNameKey::from_file(path)
                .with_context(|| format!("cannot load key pair from {}", path.display()))?,
        ),
        None => None,
    };

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, search_dirs, key);

    if cli.list {
        let paths = context
            .list_dependencies(&cli.targets)
            .context("dependency discovery failed")?;
        for path in paths {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let summary = context.run(&cli.targets).context("rekeying run failed")?;
    println!(
        "{} module(s) rewritten, {} skipped",
        summary.written.len(),
        summary.skipped
    );
    if summary.skipped > 0 {
        std::process::exit(1);
    }
    Ok(())
}

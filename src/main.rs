//! Veles CLI - command-line tool for Ren'Py RPA archives.
//!
//! This is the main entry point for the Veles command-line application.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};

use veles_rpa::RpaArchive;

/// Veles - Ren'Py archive listing and extraction tool
#[derive(Parser)]
#[command(name = "veles")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the members of an archive
    List {
        /// Path to the .rpa file
        #[arg(short, long, env = "INPUT_RPA")]
        archive: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,

        /// Show member sizes
        #[arg(short, long)]
        detailed: bool,
    },

    /// Extract members into a directory
    Extract {
        /// Path to the .rpa file
        #[arg(short, long, env = "INPUT_RPA")]
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, env = "OUTPUT_FOLDER")]
        output: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Write a single member to stdout
    Cat {
        /// Path to the .rpa file
        #[arg(short, long, env = "INPUT_RPA")]
        archive: PathBuf,

        /// Member name, as shown by `list`
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List {
            archive,
            filter,
            detailed,
        } => cmd_list(&archive, filter.as_deref(), detailed),
        Commands::Extract {
            archive,
            output,
            filter,
        } => cmd_extract(&archive, &output, filter.as_deref()),
        Commands::Cat { archive, name } => cmd_cat(&archive, &name),
    }
}

fn cmd_list(path: &Path, filter: Option<&str>, detailed: bool) -> Result<()> {
    let archive = RpaArchive::open(path).context("Failed to open RPA archive")?;
    let pattern = compile_filter(filter)?;

    let mut names: Vec<&str> = archive
        .names()?
        .filter(|name| matches_filter(&pattern, name))
        .collect();
    names.sort_unstable();

    for name in &names {
        if detailed {
            if let Some(entry) = archive.entry(name) {
                println!("{:>12} {}", entry.length(), name);
            }
        } else {
            println!("{}", name);
        }
    }

    println!("\nTotal: {} members ({})", names.len(), archive.version());

    Ok(())
}

fn cmd_extract(path: &Path, output: &Path, filter: Option<&str>) -> Result<()> {
    println!("Opening RPA archive: {}", path.display());

    let start = Instant::now();
    let archive = RpaArchive::open(path).context("Failed to open RPA archive")?;

    println!("Loaded {} members in {:?}", archive.len(), start.elapsed());

    let pattern = compile_filter(filter)?;
    let names: Vec<&str> = archive
        .names()?
        .filter(|name| matches_filter(&pattern, name))
        .collect();

    println!("Extracting {} members...", names.len());

    let pb = ProgressBar::new(names.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    fs::create_dir_all(output)?;

    let start = Instant::now();
    let mut skipped = 0;
    for name in &names {
        let Some(relative) = sanitized_path(name) else {
            eprintln!("Skipping member with unsafe name: {}", name);
            skipped += 1;
            pb.inc(1);
            continue;
        };

        let target = output.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = archive.get(name)?;
        fs::write(&target, data)?;
        pb.inc(1);
    }

    pb.finish_with_message("Done");
    println!("Extraction completed in {:?}", start.elapsed());
    if skipped > 0 {
        println!("Skipped {} members with unsafe names", skipped);
    }

    Ok(())
}

fn cmd_cat(path: &Path, name: &str) -> Result<()> {
    let archive = RpaArchive::open(path).context("Failed to open RPA archive")?;
    let data = archive
        .get(name)
        .with_context(|| format!("Failed to read member {name:?}"))?;

    std::io::stdout().write_all(&data)?;

    Ok(())
}

fn compile_filter(filter: Option<&str>) -> Result<Option<Pattern>> {
    filter
        .map(|f| Pattern::new(f).context("Invalid filter pattern"))
        .transpose()
}

fn matches_filter(pattern: &Option<Pattern>, name: &str) -> bool {
    pattern.as_ref().map_or(true, |p| p.matches(name))
}

/// Member names come from the archive and are joined onto the output
/// directory; reject anything that could land outside it.
fn sanitized_path(name: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

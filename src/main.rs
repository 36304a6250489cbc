//! gamearc CLI - unpack game asset containers.
//!
//! This is the main entry point for the gamearc command-line application.

mod output;
mod rpgmv;
mod zipfile;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gamearc::SNIFF_LEN;
use gamearc::prelude::*;

use crate::output::Filter;

/// gamearc - game asset container extraction tool
#[derive(Parser)]
#[command(name = "gamearc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the entries of a container
    List {
        /// Container format, or "auto" to detect it
        #[arg(short, long, default_value = "auto")]
        format: FormatArg,

        /// Path to the container
        #[arg(env = "GAMEARC_INPUT")]
        src: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(long)]
        filter: Option<String>,
    },

    /// Extract the entries of a container into a directory
    Extract {
        /// Container format, or "auto" to detect it
        #[arg(short, long, default_value = "auto")]
        format: FormatArg,

        /// Path to the container
        #[arg(env = "GAMEARC_INPUT")]
        src: PathBuf,

        /// Output directory
        #[arg(env = "GAMEARC_OUTPUT")]
        output: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(long)]
        filter: Option<String>,
    },

    /// Decrypt RPG Maker MV assets (.rpgmvp, .rpgmvm, .rpgmvo)
    Rpgmv {
        /// Path to the game's System.json
        #[arg(short, long, env = "GAMEARC_KEY_FILE")]
        key_file: PathBuf,

        /// Directory holding the encrypted assets
        src: PathBuf,

        /// Output directory
        output: PathBuf,
    },
}

/// Value of `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatArg {
    Auto,
    Zip,
    Container(Format),
}

impl FromStr for FormatArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else if s.eq_ignore_ascii_case("zip") {
            Ok(Self::Zip)
        } else {
            s.parse().map(Self::Container)
        }
    }
}

/// A source with its format settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Zip,
    Container(Format),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::List { format, src, filter } => {
            cmd_list(&src, format, filter.as_deref())?;
        }
        Commands::Extract {
            format,
            src,
            output,
            filter,
        } => {
            cmd_extract(&src, &output, format, filter.as_deref())?;
        }
        Commands::Rpgmv { key_file, src, output } => {
            cmd_rpgmv(&key_file, &src, &output)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Settle `--format`, sniffing the file when it is `auto`.
fn resolve(src: &Path, format: FormatArg) -> Result<Kind> {
    match format {
        FormatArg::Zip => Ok(Kind::Zip),
        FormatArg::Container(format) => Ok(Kind::Container(format)),
        FormatArg::Auto => {
            let file =
                File::open(src).with_context(|| format!("failed to open {}", src.display()))?;
            let mut prefix = Vec::with_capacity(SNIFF_LEN);
            file.take(SNIFF_LEN as u64).read_to_end(&mut prefix)?;
            match sniff(&prefix) {
                Some(kind) => {
                    info!(path = %src.display(), ?kind, "detected format");
                    Ok(kind)
                }
                None => bail!("{}: unrecognized container format", src.display()),
            }
        }
    }
}

fn sniff(prefix: &[u8]) -> Option<Kind> {
    if prefix.starts_with(b"PK\x03\x04") || prefix.starts_with(b"PK\x05\x06") {
        return Some(Kind::Zip);
    }
    Format::detect(prefix).map(Kind::Container)
}

fn open_container(src: &Path, format: Format) -> Result<Archive<memmap2::Mmap>> {
    Archive::open_file(src, Some(format))
        .with_context(|| format!("failed to open {} as {}", src.display(), format))
}

fn cmd_list(src: &Path, format: FormatArg, filter: Option<&str>) -> Result<()> {
    let filter = filter.map(Filter::new).transpose()?;
    let listing = match resolve(src, format)? {
        Kind::Zip => zipfile::list(&mut zipfile::open(src)?)?,
        Kind::Container(format) => open_container(src, format)?
            .entries()
            .into_iter()
            .map(|e| (e.path, e.size))
            .collect(),
    };

    let mut count = 0;
    for (path, size) in listing {
        if !output::keep(filter.as_ref(), &path) {
            continue;
        }
        println!("{:>12} {}", size, path);
        count += 1;
    }

    println!("\nTotal: {} entries", count);

    Ok(())
}

fn cmd_extract(src: &Path, output: &Path, format: FormatArg, filter: Option<&str>) -> Result<()> {
    let filter = filter.map(Filter::new).transpose()?;
    println!("Opening: {}", src.display());

    std::fs::create_dir_all(output)
        .with_context(|| format!("failed to create {}", output.display()))?;

    let start = Instant::now();
    let (written, failed) = match resolve(src, format)? {
        Kind::Zip => zipfile::extract(&mut zipfile::open(src)?, output, filter.as_ref())?,
        Kind::Container(format) => {
            let archive = open_container(src, format)?;
            extract_container(&archive, output, filter.as_ref())?
        }
    };

    println!(
        "Extracted {} files in {:?} ({} errors)",
        written,
        start.elapsed(),
        failed
    );

    if failed > 0 {
        bail!("{} entries could not be extracted", failed);
    }

    Ok(())
}

fn extract_container<R: ReadAt + Sync>(
    archive: &Archive<R>,
    output: &Path,
    filter: Option<&Filter>,
) -> Result<(usize, usize)> {
    let entries: Vec<EntryInfo> = archive
        .entries()
        .into_iter()
        .filter(|e| output::keep(filter, &e.path))
        .collect();

    println!(
        "Extracting {} of {} {} entries to {}...",
        entries.len(),
        archive.entry_count(),
        archive.format(),
        output.display()
    );

    let pb = output::progress_bar(entries.len())?;

    let extract_one = |entry: &EntryInfo| -> bool {
        let result = output::create(output, &entry.path).and_then(|mut out| {
            archive.copy_to(entry.index, &mut out)?;
            std::io::Write::flush(&mut out)?;
            Ok(())
        });
        pb.inc(1);
        match result {
            Ok(()) => true,
            Err(e) => {
                pb.suspend(|| eprintln!("Error extracting {}: {:#}", entry.path, e));
                false
            }
        }
    };

    #[cfg(feature = "parallel")]
    let written = {
        use rayon::prelude::*;
        entries.par_iter().filter(|e| extract_one(*e)).count()
    };
    #[cfg(not(feature = "parallel"))]
    let written = entries.iter().filter(|e| extract_one(*e)).count();

    pb.finish_with_message("Done");
    Ok((written, entries.len() - written))
}

fn cmd_rpgmv(key_file: &Path, src: &Path, output: &Path) -> Result<()> {
    let key = rpgmv::load_key(key_file)?;
    let start = Instant::now();
    let count = rpgmv::convert_dir(&key, src, output)?;
    println!("Decrypted {} assets in {:?}", count, start.elapsed());
    Ok(())
}

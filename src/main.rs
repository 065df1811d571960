use apple_books_export::error::ExportError;
use apple_books_export::extractor::Extractor;
use apple_books_export::{exporter, locator};
use clap::Parser;
use eyre::{eyre, Context, Result};
use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Export Apple Books highlights and notes to a Markdown file.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Book title substring to filter on (case-insensitive).
    /// Prompted for interactively if omitted.
    #[arg(value_name = "TITLE")]
    title: Option<String>,

    /// Path to the annotation database (annotations.sqlite).
    /// Auto-detected if omitted.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Directory to write the export into.
    /// Defaults to the desktop if not set in config.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/apple-books-export/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    db_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        // Search: XDG/OS config dir, then nothing
        dirs::config_dir()
            .map(|d| d.join("apple-books-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn prompt_for_title() -> Result<Option<String>> {
    println!("\nEnter a book title to export highlights (or press Enter for all books):");
    print!("> ");
    io::stdout().flush().wrap_err("Failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .wrap_err("Failed to read from stdin")?;
    let trimmed = line.trim();
    Ok(if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve the title filter (CLI > interactive prompt)
    let title = match cli.title {
        Some(t) => Some(t),
        None => prompt_for_title()?,
    };

    // 3. Resolve db_path (CLI > Config > Auto-detect)
    let db_path = cli
        .db
        .or(file_cfg.db_path)
        .unwrap_or_else(locator::find_database);

    // 4. Resolve output_dir (CLI > Config > Desktop)
    let output_dir = cli
        .output_dir
        .or(file_cfg.output_dir)
        .or_else(dirs::desktop_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join("Desktop")))
        .ok_or_else(|| {
            eyre!("Could not determine output directory.\nUse --output-dir to specify one.")
        })?;
    let output_path = output_dir.join(exporter::output_filename(title.as_deref()));

    // 5. Extract and export
    let extractor = Extractor::open(&db_path)?;
    match exporter::export_to_markdown(&extractor, &output_path, title.as_deref()) {
        Ok(()) => {
            println!(
                "Highlights exported successfully to {}",
                output_path.display()
            );
            Ok(())
        }
        // Zero matches is reported, not fatal; nothing is written.
        Err(e @ ExportError::EmptyResult { .. }) => {
            println!("{}", e);
            println!("No file was written.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

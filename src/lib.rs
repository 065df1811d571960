//! # apple-books-export
//!
//! A CLI tool that exports Apple Books highlights and notes to a Markdown file.
//!
//! ## What it does
//!
//! Apple Books stores highlights in a SQLite database inside its sandbox
//! container (`ZAEANNOTATION` rows, joined to book titles in
//! `ZBKLIBRARYASSET`). This tool locates that database, reads the non-deleted
//! annotations, and writes them grouped by book to a single Markdown file on
//! your desktop.
//!
//! The database is opened **read-only** — your library is never modified.
//!
//! ## Usage
//!
//! ```sh
//! # Prompted for an optional title filter, writes to ~/Desktop
//! apple-books-export
//!
//! # Filter by title substring, custom database and output directory
//! apple-books-export dune --db /path/to/annotations.sqlite --output-dir ~/notes
//! ```
//!
//! Preferences can be persisted in `~/.config/apple-books-export/config.toml`.
//!
//! ## Compatibility
//!
//! Tracks Apple Books' internal (undocumented) SQLite schema, including the
//! Core Data timestamp epoch of 2001-01-01. If an OS update moves the
//! container or renames columns, pass `--db` explicitly.

pub mod error;
pub mod exporter;
pub mod extractor;
pub mod locator;

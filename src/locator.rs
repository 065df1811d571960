//! Locate the annotation store on disk.
//!
//! Apple Books keeps its annotation database inside a sandboxed container
//! under `~/Library/Containers`; the container name and the directory holding
//! the `.sqlite` file have both changed across OS releases, so the search is
//! by shape rather than by a fixed path.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DEFAULT_DB_PATH: &str =
    "Library/Containers/com.apple.iBooksX/Data/Documents/AEAnnotation/annotations.sqlite";

/// Directory names that hold annotation databases, old and new.
const ANNOTATION_DIRS: &[&str] = &["AEAnnotation", "BKAnnotation"];

/// Find the annotation database among the known container locations. If the
/// scan comes up empty, returns the default path without verifying it; the
/// connection step reports the failure.
pub fn find_database() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let containers = home.join("Library/Containers");

    println!("Searching for the annotation database...");
    match search_containers(&containers) {
        Some(found) => {
            println!("Found annotation database: {}", found.display());
            found
        }
        None => {
            let fallback = home.join(DEFAULT_DB_PATH);
            println!(
                "No annotation database found. Will try the default path: {}",
                fallback.display()
            );
            fallback
        }
    }
}

/// Scan container directories whose name suggests Books (`book`, `bk`,
/// `annotation`, case-insensitive) for `*.sqlite` files inside an annotation
/// directory. Containers are visited in name order so the first hit is stable.
pub fn search_containers(containers: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(containers).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            name.contains("book") || name.contains("bk") || name.contains("annotation")
        })
        .collect();
    candidates.sort();

    for container in candidates {
        println!("Checking container: {}", container.display());
        if let Some(db) = find_sqlite_under(&container) {
            return Some(db);
        }
    }
    None
}

fn find_sqlite_under(container: &Path) -> Option<PathBuf> {
    WalkDir::new(container)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .map(|entry| entry.into_path())
        .find(|path| {
            path.extension().and_then(|e| e.to_str()) == Some("sqlite")
                && path
                    .parent()
                    .and_then(Path::file_name)
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| ANNOTATION_DIRS.contains(&n))
        })
}

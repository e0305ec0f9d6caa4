//! Source parsing stage
//!
//! Turns the Java files of a project into [`ParsedFile`]s. The grammar-specific
//! work sits behind [`SourceParser`] so another backend can be dropped in
//! without touching the pipeline.
//!
//! # Error Handling
//!
//! A file that cannot be read or parsed is logged and skipped; the stage only
//! fails when the project directory itself is missing.

mod java;

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use rayon::prelude::*;

use crate::error::{Result, VulnLensError};
use crate::schema::ParsedFile;

pub use java::JavaParser;

/// Parses one source file into classes and methods
pub trait SourceParser {
    fn parse_file(&self, path: &str, source: &str) -> Result<ParsedFile>;
}

/// Directory names that hold build output rather than app sources
const SKIPPED_DIRS: &[&str] = &["build", "target", "out", "bin", "node_modules", "__pycache__"];

/// Source roots; directories below them are package segments
const SOURCE_ROOTS: &[&str] = &["java", "kotlin"];

/// Whether a directory, given relative to the walk root, should be pruned
///
/// Inside a `java/` or `kotlin/` source root the names in [`SKIPPED_DIRS`]
/// are package segments (`com/app/out/`) and are kept. Hidden entries
/// (`.git`, `.gradle`, `.idea`) are pruned by the walker itself.
pub fn should_skip_path(relative: &Path) -> bool {
    let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if !SKIPPED_DIRS.contains(&name) {
        return false;
    }
    let in_source_root = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .any(|c| c.as_os_str().to_str().is_some_and(|s| SOURCE_ROOTS.contains(&s)))
        })
        .unwrap_or(false);
    !in_source_root
}

/// Collect `.java` files under `dir`, sorted by path
///
/// Honours `.gitignore`/`.ignore` files.
pub fn collect_java_files(dir: &Path) -> Vec<PathBuf> {
    let root = dir.to_path_buf();
    let walker = WalkBuilder::new(dir)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            !(is_dir && should_skip_path(relative))
        })
        .build();

    let mut files: Vec<PathBuf> = walker
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("java"))
        .collect();

    files.sort();
    files
}

/// Parse every Java file under `dir` in parallel
///
/// Files without any class declaration are dropped. Output order follows the
/// sorted file order regardless of thread scheduling.
pub fn parse_project<P>(dir: &Path, parser: &P) -> Result<Vec<ParsedFile>>
where
    P: SourceParser + Sync,
{
    if !dir.is_dir() {
        return Err(VulnLensError::FileNotFound {
            path: dir.display().to_string(),
        });
    }

    tracing::info!("Parsing Java files in '{}'", dir.display());
    let files = collect_java_files(dir);
    tracing::debug!("Found {} Java files", files.len());

    let parsed: Vec<ParsedFile> = files
        .par_iter()
        .filter_map(|path| match parse_path(path, parser) {
            Ok(file) if file.classes.is_empty() => None,
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    tracing::info!("Parsed {} of {} Java files", parsed.len(), files.len());
    Ok(parsed)
}

/// Read and parse a single file; invalid UTF-8 is replaced rather than rejected
pub fn parse_path<P: SourceParser + ?Sized>(path: &Path, parser: &P) -> Result<ParsedFile> {
    let bytes = fs::read(path)?;
    let source = String::from_utf8_lossy(&bytes);
    parser.parse_file(&path.display().to_string(), &source)
}

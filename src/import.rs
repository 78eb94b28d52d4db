//! Bulk import of material documents
//!
//! Walks a directory of exported catalog documents (`*.json`) and stores every
//! material found. A file may hold a single material object or an array of them.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::db;
use crate::models::Material;

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentFile {
    Many(Vec<serde_json::Value>),
    One(serde_json::Value),
}

/// Statistics from an import run
#[derive(Debug, Default)]
pub struct ImportStats {
    pub files_scanned: usize,
    pub materials_imported: usize,
    pub documents_skipped: usize,
    pub crafted_items: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Import Statistics ===")?;
        writeln!(f, "Files scanned:      {}", self.files_scanned)?;
        writeln!(f, "Materials imported: {}", self.materials_imported)?;
        writeln!(f, "  crafted items:    {}", self.crafted_items)?;
        writeln!(f, "Documents skipped:  {}", self.documents_skipped)?;
        Ok(())
    }
}

/// Find all `*.json` files below a directory
pub fn find_document_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

/// Parse the material documents of one file.
///
/// Returns the parsed materials and the number of documents that were not
/// valid materials (for example missing a name).
pub fn parse_document_file(path: &Path) -> Result<(Vec<Material>, usize)> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: DocumentFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let documents = match file {
        DocumentFile::Many(values) => values,
        DocumentFile::One(value) => vec![value],
    };

    let mut materials = Vec::new();
    let mut skipped = 0;
    for (i, value) in documents.into_iter().enumerate() {
        match serde_json::from_value::<Material>(value) {
            Ok(material) if !material.name.trim().is_empty() => materials.push(material),
            Ok(_) => {
                warn!(file = %path.display(), index = i, "document has no name, skipping");
                skipped += 1;
            }
            Err(e) => {
                warn!(file = %path.display(), index = i, "not a material document: {}", e);
                skipped += 1;
            }
        }
    }

    Ok((materials, skipped))
}

/// Import every material document below `dir` into the database
///
/// The whole run, including the optional clear, is one transaction: a storage
/// failure leaves the catalog exactly as it was before the import.
pub fn import_directory(conn: &Connection, dir: &Path, clear: bool) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let files = find_document_files(dir);
    println!("Found {} document files", files.len());

    let tx = conn.unchecked_transaction()?;
    if clear {
        println!("Clearing existing materials...");
        db::clear_materials(&tx)?;
    }

    for path in files {
        stats.files_scanned += 1;
        let (materials, skipped) = match parse_document_file(&path) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("{:#}", e);
                stats.documents_skipped += 1;
                continue;
            }
        };
        stats.documents_skipped += skipped;

        for material in materials {
            db::write_material(&tx, &material)
                .with_context(|| format!("Failed to store '{}'", material.name))?;
            debug!(material = %material.name, file = %path.display(), "imported");
            stats.materials_imported += 1;
            if material.is_bar {
                stats.crafted_items += 1;
            }
        }
    }

    tx.commit()?;
    Ok(stats)
}

//! Portable bundles of the two store documents.
//!
//! A bundle is a zip holding `manifest.json`, `marksheets.json` and
//! `studentResults.json`. Import parses and checks every document before the
//! store is touched, then writes both keys in one transaction.

use crate::db::{self, MARKSHEETS_KEY, STUDENT_RESULTS_KEY};
use crate::portal::{self, Marksheet, SharedResult, StaffPortal};
use anyhow::{anyhow, bail, Context};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const BUNDLE_FORMAT: &str = "marksheet-bundle-v1";

const MANIFEST_ENTRY: &str = "manifest.json";
const MARKSHEETS_ENTRY: &str = "marksheets.json";
const STUDENT_RESULTS_ENTRY: &str = "studentResults.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub marksheets: Vec<Marksheet>,
    pub student_results: Vec<SharedResult>,
}

pub fn export_bundle(conn: &Connection, out_path: &Path) -> anyhow::Result<Bundle> {
    let bundle = Bundle {
        marksheets: StaffPortal::load(conn)?.list().to_vec(),
        student_results: portal::student_results(conn)?,
    };

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create bundle {}", out_path.display()))?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "marksheetCount": bundle.marksheets.len(),
        "studentResultCount": bundle.student_results.len(),
    });
    write_entry(&mut zip, opts, MANIFEST_ENTRY, &manifest)?;
    write_entry(&mut zip, opts, MARKSHEETS_ENTRY, &bundle.marksheets)?;
    write_entry(&mut zip, opts, STUDENT_RESULTS_ENTRY, &bundle.student_results)?;
    zip.finish().context("failed to finalize bundle")?;

    Ok(bundle)
}

/// Reads and validates a bundle without touching any store.
pub fn read_bundle(in_path: &Path) -> anyhow::Result<Bundle> {
    let mut f = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.display()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read bundle signature")?;
    if read < 4 || sig != [0x50, 0x4B, 0x03, 0x04] {
        bail!("not a marksheet bundle: {}", in_path.display());
    }
    drop(f);

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.display()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let manifest: serde_json::Value = read_entry(&mut archive, MANIFEST_ENTRY)?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let bundle = Bundle {
        marksheets: read_entry(&mut archive, MARKSHEETS_ENTRY)?,
        student_results: read_entry(&mut archive, STUDENT_RESULTS_ENTRY)?,
    };

    let mut seen = HashSet::new();
    for m in &bundle.marksheets {
        if !seen.insert(m.id) {
            bail!("bundle repeats marksheet id {}", m.id);
        }
        if m.data.is_empty() {
            bail!("bundle marksheet {} has no rows", m.id);
        }
    }

    Ok(bundle)
}

/// Replaces both store documents with the bundle's, atomically.
pub fn restore_bundle(conn: &Connection, bundle: &Bundle) -> anyhow::Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start restore transaction")?;
    db::kv_set_json(&tx, MARKSHEETS_KEY, &bundle.marksheets)?;
    if bundle.student_results.is_empty() {
        db::kv_remove(&tx, STUDENT_RESULTS_KEY)?;
    } else {
        db::kv_set_json(&tx, STUDENT_RESULTS_KEY, &bundle.student_results)?;
    }
    tx.commit().context("failed to commit restore")?;
    Ok(())
}

fn write_entry<T: serde::Serialize + ?Sized>(
    zip: &mut ZipWriter<File>,
    opts: FileOptions,
    name: &str,
    value: &T,
) -> anyhow::Result<()> {
    zip.start_file(name, opts)
        .with_context(|| format!("failed to start {name}"))?;
    let text = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {name}"))?;
    zip.write_all(text.as_bytes())
        .with_context(|| format!("failed to write {name}"))?;
    Ok(())
}

fn read_entry<T: DeserializeOwned>(
    archive: &mut ZipArchive<File>,
    name: &str,
) -> anyhow::Result<T> {
    let mut text = String::new();
    archive
        .by_name(name)
        .with_context(|| format!("bundle missing {name}"))?
        .read_to_string(&mut text)
        .with_context(|| format!("failed to read {name}"))?;
    serde_json::from_str(&text).with_context(|| format!("{name} is invalid"))
}

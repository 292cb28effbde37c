//! Trace archive ingest and normalization.
//!
//! The raw archive is a gzip-compressed JSON collection of entries, one per
//! replicate, keyed by (ionic-strength-id, temperature-id, replicate-id). Each
//! entry carries a 2-column table of instrument-native samples: time in
//! milliseconds and absorbance scaled by 1e4.
//!
//! This module is responsible for turning that into clean per-condition groups
//! of `Trace` values that are safe to fit:
//!
//! - apply the fixed unit rescaling (x1e-3 on time, x1e-4 on absorbance)
//! - validate every condition carries the configured replicate count
//! - apply the curated replicate exclusion list
//!
//! No fitting logic lives here.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use crate::domain::{ConditionKey, ConditionTables, Trace};
use crate::error::AppError;

/// Raw time is milliseconds.
pub const TIME_SCALE: f64 = 1e-3;
/// Raw absorbance is scaled up by 1e4.
pub const ABSORBANCE_SCALE: f64 = 1e-4;

/// One replicate's raw samples, in instrument-native units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub ionic_id: u8,
    pub temp_id: u8,
    pub replicate_id: u8,
    /// `[time_ms, absorbance_x1e4]` pairs.
    pub samples: Vec<[f64; 2]>,
}

/// The full raw trace collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceArchive {
    pub entries: Vec<ArchiveEntry>,
}

/// A replicate excluded by hand after visual inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedReplicate {
    pub ionic_id: u8,
    pub temp_id: u8,
    pub replicate_id: u8,
}

/// Curated exclusion list (JSON). Empty by default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExclusionList {
    pub excluded: Vec<ExcludedReplicate>,
}

impl ExclusionList {
    pub fn read_json(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::config(format!("Failed to open exclusion list '{}': {e}", path.display()))
        })?;
        serde_json::from_reader(file)
            .map_err(|e| AppError::config(format!("Invalid exclusion list JSON: {e}")))
    }

    fn contains(&self, entry: &ArchiveEntry) -> bool {
        self.excluded.iter().any(|x| {
            x.ionic_id == entry.ionic_id
                && x.temp_id == entry.temp_id
                && x.replicate_id == entry.replicate_id
        })
    }
}

/// Read a gzipped JSON archive from disk.
pub fn read_archive(path: &Path) -> Result<TraceArchive, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::config(format!("Failed to open archive '{}': {e}", path.display()))
    })?;
    read_archive_from(file)
}

/// Write a gzipped JSON archive to disk.
pub fn write_archive(path: &Path, archive: &TraceArchive) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::config(format!("Failed to create archive '{}': {e}", path.display()))
    })?;
    write_archive_to(file, archive)
}

fn read_archive_from(reader: impl Read) -> Result<TraceArchive, AppError> {
    let decoder = GzDecoder::new(reader);
    serde_json::from_reader(decoder)
        .map_err(|e| AppError::config(format!("Invalid trace archive: {e}")))
}

fn write_archive_to(writer: impl Write, archive: &TraceArchive) -> Result<(), AppError> {
    let mut encoder = GzEncoder::new(writer, Compression::default());
    serde_json::to_writer(&mut encoder, archive)
        .map_err(|e| AppError::config(format!("Failed to serialize trace archive: {e}")))?;
    encoder
        .finish()
        .map_err(|e| AppError::config(format!("Failed to finish archive compression: {e}")))?;
    Ok(())
}

/// Rescale raw entries to (seconds, absorbance) traces and group them by
/// condition key.
///
/// The replicate-count invariant is checked on the raw archive, before the
/// exclusion list is applied: every condition present must carry exactly
/// `tables.replicates` replicates, and every grid cell of the tables must be
/// present.
pub fn group_by_condition(
    archive: &TraceArchive,
    tables: &ConditionTables,
    exclusions: &ExclusionList,
) -> Result<BTreeMap<ConditionKey, Vec<Trace>>, AppError> {
    tables.validate()?;

    let mut raw_counts: BTreeMap<ConditionKey, usize> = BTreeMap::new();
    let mut groups: BTreeMap<ConditionKey, Vec<Trace>> = BTreeMap::new();

    for entry in &archive.entries {
        let key = ConditionKey {
            ionic_id: entry.ionic_id,
            temp_id: entry.temp_id,
        };
        // Unknown ids are a configuration mismatch, not a data problem.
        tables.ionic_strength_for(key.ionic_id)?;
        tables.temperature_for(key.temp_id)?;

        *raw_counts.entry(key).or_insert(0) += 1;
        if exclusions.contains(entry) {
            continue;
        }

        let mut time = Vec::with_capacity(entry.samples.len());
        let mut absorbance = Vec::with_capacity(entry.samples.len());
        for s in &entry.samples {
            time.push(s[0] * TIME_SCALE);
            absorbance.push(s[1] * ABSORBANCE_SCALE);
        }
        let trace = Trace::new(time, absorbance).map_err(|e| {
            AppError::new(
                e.kind(),
                format!("Condition {key}, replicate {}: {e}", entry.replicate_id),
            )
        })?;
        groups.entry(key).or_default().push(trace);
    }

    for key in tables.grid() {
        let count = raw_counts.get(&key).copied().unwrap_or(0);
        if count != tables.replicates {
            return Err(AppError::malformed_condition(format!(
                "Condition {key} has {count} replicates, expected {}.",
                tables.replicates
            )));
        }
    }

    Ok(groups)
}

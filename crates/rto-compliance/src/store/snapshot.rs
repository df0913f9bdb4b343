use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::memory::Snapshot;
use crate::compliance::domain::DocumentRecord;

#[derive(Debug)]
pub enum SnapshotImportError {
    Io { path: PathBuf, source: std::io::Error },
    Csv { table: &'static str, source: csv::Error },
}

impl std::fmt::Display for SnapshotImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotImportError::Io { path, source } => {
                write!(f, "failed to read snapshot file {}: {}", path.display(), source)
            }
            SnapshotImportError::Csv { table, source } => {
                write!(f, "invalid CSV data in table '{}': {}", table, source)
            }
        }
    }
}

impl std::error::Error for SnapshotImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotImportError::Io { source, .. } => Some(source),
            SnapshotImportError::Csv { source, .. } => Some(source),
        }
    }
}

/// Loads CSV table exports into a [`Snapshot`]. One file per table, named
/// after the table; a missing file is an empty table and an empty cell is a
/// null.
pub struct SnapshotImporter;

impl SnapshotImporter {
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Snapshot, SnapshotImportError> {
        let dir = dir.as_ref();
        let mut snapshot = Snapshot {
            branches: read_table(dir, "branches")?,
            users: read_table(dir, "users")?,
            citizens: read_table(dir, "citizens")?,
            vehicles: read_table(dir, "vehicles")?,
            learner_licenses: read_table(dir, "learner_licenses")?,
            driving_licenses: read_table(dir, "driving_licenses")?,
            registry: read_table(dir, "ll_registries")?,
            documents: Vec::new(),
        };

        let documents = &mut snapshot.documents;
        extend(documents, read_table(dir, "vehicle_taxes")?, DocumentRecord::Tax);
        extend(
            documents,
            read_table(dir, "vehicle_insurances")?,
            DocumentRecord::Insurance,
        );
        extend(
            documents,
            read_table(dir, "vehicle_fitnesses")?,
            DocumentRecord::Fitness,
        );
        extend(
            documents,
            read_table(dir, "vehicle_permits")?,
            DocumentRecord::Permit,
        );
        extend(documents, read_table(dir, "vehicle_puccs")?, DocumentRecord::Pucc);
        extend(documents, read_table(dir, "vehicle_vltds")?, DocumentRecord::Vltd);
        extend(
            documents,
            read_table(dir, "vehicle_speed_governors")?,
            DocumentRecord::SpeedGovernor,
        );

        info!(
            dir = %dir.display(),
            citizens = snapshot.citizens.len(),
            vehicles = snapshot.vehicles.len(),
            documents = snapshot.documents.len(),
            registry = snapshot.registry.len(),
            "compliance snapshot imported"
        );

        Ok(snapshot)
    }

    /// Parses a single table export.
    pub fn parse_table<T, R>(table: &'static str, reader: R) -> Result<Vec<T>, SnapshotImportError>
    where
        T: DeserializeOwned,
        R: Read,
    {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        csv_reader
            .deserialize::<T>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| SnapshotImportError::Csv { table, source })
    }
}

fn read_table<T: DeserializeOwned>(
    dir: &Path,
    table: &'static str,
) -> Result<Vec<T>, SnapshotImportError> {
    let path = dir.join(format!("{table}.csv"));
    if !path.exists() {
        debug!(table, "snapshot table missing; treating as empty");
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(&path).map_err(|source| SnapshotImportError::Io {
        path: path.clone(),
        source,
    })?;
    SnapshotImporter::parse_table(table, file)
}

fn extend<T>(documents: &mut Vec<DocumentRecord>, rows: Vec<T>, wrap: fn(T) -> DocumentRecord) {
    documents.extend(rows.into_iter().map(wrap));
}

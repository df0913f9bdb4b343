use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rto_compliance::compliance::{ComplianceNotice, NoticeError, NoticePublisher};
use rto_compliance::error::AppError;
use rto_compliance::store::{MemoryStore, Snapshot, SnapshotImporter};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Records notices and logs them in place of a messaging gateway.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNoticePublisher {
    events: Arc<Mutex<Vec<ComplianceNotice>>>,
}

impl NoticePublisher for InMemoryNoticePublisher {
    fn publish(&self, notice: ComplianceNotice) -> Result<(), NoticeError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| NoticeError::Transport("notice log poisoned".to_string()))?;
        info!(
            template = notice.template.label(),
            recipient = %notice.recipient,
            "compliance notice queued"
        );
        guard.push(notice);
        Ok(())
    }
}

impl InMemoryNoticePublisher {
    #[cfg(test)]
    pub(crate) fn events(&self) -> Vec<ComplianceNotice> {
        self.events.lock().expect("notice mutex poisoned").clone()
    }
}

/// Loads the CSV snapshot when a directory is configured, else starts empty.
pub(crate) fn load_store(dir: Option<&Path>) -> Result<MemoryStore, AppError> {
    let snapshot = match dir {
        Some(dir) => {
            let snapshot = SnapshotImporter::from_dir(dir)?;
            info!(
                dir = %dir.display(),
                citizens = snapshot.citizens.len(),
                vehicles = snapshot.vehicles.len(),
                documents = snapshot.documents.len(),
                registry = snapshot.registry.len(),
                "snapshot loaded"
            );
            snapshot
        }
        None => {
            warn!("no snapshot directory configured; serving an empty store");
            Snapshot::default()
        }
    };
    Ok(MemoryStore::new(snapshot))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

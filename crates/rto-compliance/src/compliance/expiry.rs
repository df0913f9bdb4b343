//! Normalizes the seven vehicle document collections onto a single
//! `(kind, expiry_date)` shape and answers window and "current record"
//! questions over it.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use super::domain::{DocumentId, DocumentKind, DocumentRecord, Vehicle};

/// Closed calendar-date interval; both ends are inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `[today, today + days]`, clamped to the last representable date.
    pub fn following(today: NaiveDate, days: u32) -> Self {
        Self {
            start: today,
            end: today
                .checked_add_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizedExpiry {
    pub kind: DocumentKind,
    pub expiry_date: Option<NaiveDate>,
}

impl DocumentRecord {
    /// Value of the kind-specific expiry-like column.
    pub fn expiry_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Tax(record) => record.tax_upto,
            Self::Insurance(record) => record.end_date,
            Self::Fitness(record) => record.expiry_date,
            Self::Permit(record) => record.expiry_date,
            Self::Pucc(record) => record.valid_until,
            Self::Vltd(record) => record.expiry_date,
            Self::SpeedGovernor(record) => record.expiry_date,
        }
    }

    pub fn normalized(&self) -> NormalizedExpiry {
        NormalizedExpiry {
            kind: self.kind(),
            expiry_date: self.expiry_date(),
        }
    }

    /// Certificate, policy or permit number where the collection records one.
    pub fn reference_number(&self) -> Option<&str> {
        match self {
            Self::Tax(_) | Self::Vltd(_) | Self::SpeedGovernor(_) => None,
            Self::Insurance(record) => record.policy_number.as_deref(),
            Self::Fitness(record) => record.certificate_number.as_deref(),
            Self::Permit(record) => record.permit_number.as_deref(),
            Self::Pucc(record) => record.pucc_number.as_deref(),
        }
    }
}

/// Records without an expiry date are never inside any window.
pub fn is_in_window(record: &DocumentRecord, window: &DateWindow) -> bool {
    record
        .expiry_date()
        .map(|date| window.contains(date))
        .unwrap_or(false)
}

/// Picks the current record: latest expiry date, highest id when dates tie.
/// Undated rows never qualify.
pub fn latest<'a, I>(records: I) -> Option<&'a DocumentRecord>
where
    I: IntoIterator<Item = &'a DocumentRecord>,
{
    records
        .into_iter()
        .filter_map(|record| record.expiry_date().map(|date| (date, record)))
        .max_by_key(|(date, record)| (*date, record.id()))
        .map(|(_, record)| record)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryState {
    Missing,
    Expired,
    ExpiringSoon,
    Valid,
}

impl ExpiryState {
    pub fn classify(expiry: Option<NaiveDate>, soon: &DateWindow) -> Self {
        match expiry {
            None => Self::Missing,
            Some(date) if date < soon.start => Self::Expired,
            Some(date) if soon.contains(date) => Self::ExpiringSoon,
            Some(_) => Self::Valid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStatus {
    pub kind: DocumentKind,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    pub latest_expiry: Option<NaiveDate>,
    pub state: ExpiryState,
}

/// A vehicle with the current status of each document collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleStatusView {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub documents: Vec<DocumentStatus>,
}

impl VehicleStatusView {
    /// `records` may mix kinds; each kind is resolved on its own.
    pub fn build(vehicle: Vehicle, records: &[DocumentRecord], soon: &DateWindow) -> Self {
        let documents = DocumentKind::ordered()
            .into_iter()
            .map(|kind| {
                let current = latest(records.iter().filter(|record| record.kind() == kind));
                let latest_expiry = current.and_then(DocumentRecord::expiry_date);
                DocumentStatus {
                    kind,
                    label: kind.label(),
                    document_id: current.map(DocumentRecord::id),
                    latest_expiry,
                    state: ExpiryState::classify(latest_expiry, soon),
                }
            })
            .collect();

        Self { vehicle, documents }
    }

    pub fn latest_expiry(&self, kind: DocumentKind) -> Option<NaiveDate> {
        self.documents
            .iter()
            .find(|status| status.kind == kind)
            .and_then(|status| status.latest_expiry)
    }
}

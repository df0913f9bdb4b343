//! Record store seam. The engine only reads; every query carries the caller's
//! [`Scope`] explicitly so visibility is decided in one place.

mod memory;
mod snapshot;

pub use memory::{MemoryStore, Snapshot};
pub use snapshot::{SnapshotImportError, SnapshotImporter};

use chrono::NaiveDate;
use serde::Serialize;

use crate::compliance::domain::{
    Citizen, CitizenId, DocumentKind, DocumentRecord, DrivingLicense, LearnerLicense,
    LlRegistryEntry, RegistryId, UserId, Vehicle, VehicleId,
};
use crate::compliance::expiry::DateWindow;
use crate::compliance::scope::Scope;

/// Read access to the persisted compliance tables.
pub trait RecordStore: Send + Sync {
    fn count_users(&self, scope: &Scope) -> Result<u64, StoreError>;

    fn citizens(&self, query: &CitizenQuery) -> Result<Vec<Citizen>, StoreError>;
    fn count_citizens(&self, query: &CitizenQuery) -> Result<u64, StoreError>;

    fn vehicles(&self, query: &VehicleQuery) -> Result<Vec<Vehicle>, StoreError>;
    fn count_vehicles(&self, query: &VehicleQuery) -> Result<u64, StoreError>;

    fn documents(
        &self,
        kind: DocumentKind,
        query: &DocumentQuery,
    ) -> Result<Vec<DocumentRecord>, StoreError>;
    fn count_documents(&self, kind: DocumentKind, query: &DocumentQuery)
        -> Result<u64, StoreError>;

    fn learner_licenses(&self, query: &LicenseQuery) -> Result<Vec<LearnerLicense>, StoreError>;
    fn count_learner_licenses(&self, query: &LicenseQuery) -> Result<u64, StoreError>;

    fn driving_licenses(&self, query: &LicenseQuery) -> Result<Vec<DrivingLicense>, StoreError>;
    fn count_driving_licenses(&self, query: &LicenseQuery) -> Result<u64, StoreError>;

    /// Registry rows in insertion (id ascending) order.
    fn registry_entries(
        &self,
        query: &RegistryQuery,
        limit: Option<usize>,
    ) -> Result<Vec<LlRegistryEntry>, StoreError>;
    /// Registry rows newest first, one page at a time.
    fn registry_page(
        &self,
        query: &RegistryQuery,
        page: PageRequest,
    ) -> Result<Page<LlRegistryEntry>, StoreError>;
    fn count_registry_entries(&self, query: &RegistryQuery) -> Result<u64, StoreError>;
    fn registry_entry(&self, id: RegistryId) -> Result<Option<LlRegistryEntry>, StoreError>;

    fn citizen(&self, id: CitizenId, scope: &Scope) -> Result<Option<Citizen>, StoreError> {
        let query = CitizenQuery::scoped(*scope).with_id(id).limit(1);
        Ok(self.citizens(&query)?.into_iter().next())
    }

    /// Citizen profile linked to a self-service login.
    fn citizen_for_account(&self, account: UserId) -> Result<Option<Citizen>, StoreError> {
        let query = CitizenQuery::scoped(Scope::Unrestricted)
            .for_account(account)
            .limit(1);
        Ok(self.citizens(&query)?.into_iter().next())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("record store rejected query: {0}")]
    Query(String),
}

/// Case-insensitive substring match, the `LIKE '%term%'` of the source tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch(String);

impl TextMatch {
    /// Returns `None` for blank input so an empty search box filters nothing.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.0)
    }

    pub fn matches_any<'a, I>(&self, fields: I) -> bool
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        fields.into_iter().flatten().any(|field| self.matches(field))
    }
}

/// Inclusive bounds on a nullable date column. A bounded filter never matches
/// a null date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub on_or_after: Option<NaiveDate>,
    pub on_or_before: Option<NaiveDate>,
}

impl DateFilter {
    pub fn on_or_before(date: NaiveDate) -> Self {
        Self {
            on_or_after: None,
            on_or_before: Some(date),
        }
    }

    pub fn on_or_after(date: NaiveDate) -> Self {
        Self {
            on_or_after: Some(date),
            on_or_before: None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.on_or_after.is_none() && self.on_or_before.is_none()
    }

    /// Intersection of two filters.
    pub fn and(self, other: Self) -> Self {
        Self {
            on_or_after: self.on_or_after.max(other.on_or_after),
            on_or_before: match (self.on_or_before, other.on_or_before) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        }
    }

    pub fn matches(&self, date: Option<NaiveDate>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(date) = date else {
            return false;
        };
        self.on_or_after.map_or(true, |start| date >= start)
            && self.on_or_before.map_or(true, |end| date <= end)
    }
}

impl From<DateWindow> for DateFilter {
    fn from(window: DateWindow) -> Self {
        Self {
            on_or_after: Some(window.start),
            on_or_before: Some(window.end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitizenQuery {
    pub scope: Scope,
    pub id: Option<CitizenId>,
    pub account: Option<UserId>,
    /// Matches name or mobile.
    pub text: Option<TextMatch>,
    pub limit: Option<usize>,
}

impl CitizenQuery {
    pub fn scoped(scope: Scope) -> Self {
        Self {
            scope,
            id: None,
            account: None,
            text: None,
            limit: None,
        }
    }

    pub fn with_id(mut self, id: CitizenId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn for_account(mut self, account: UserId) -> Self {
        self.account = Some(account);
        self
    }

    pub fn matching(mut self, text: TextMatch) -> Self {
        self.text = Some(text);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleQuery {
    pub scope: Scope,
    pub id: Option<VehicleId>,
    pub citizen: Option<CitizenId>,
    /// Matches registration number.
    pub text: Option<TextMatch>,
    pub limit: Option<usize>,
}

impl VehicleQuery {
    pub fn scoped(scope: Scope) -> Self {
        Self {
            scope,
            id: None,
            citizen: None,
            text: None,
            limit: None,
        }
    }

    pub fn with_id(mut self, id: VehicleId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn owned_by(mut self, citizen: CitizenId) -> Self {
        self.citizen = Some(citizen);
        self
    }

    pub fn matching(mut self, text: TextMatch) -> Self {
        self.text = Some(text);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub scope: Scope,
    pub vehicle: Option<VehicleId>,
    /// Applied to the kind-specific expiry-like column.
    pub expiry: DateFilter,
}

impl DocumentQuery {
    pub fn scoped(scope: Scope) -> Self {
        Self {
            scope,
            vehicle: None,
            expiry: DateFilter::default(),
        }
    }

    pub fn for_vehicle(mut self, vehicle: VehicleId) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    pub fn expiring(mut self, expiry: DateFilter) -> Self {
        self.expiry = expiry;
        self
    }
}

/// Shared by learner and driving licenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseQuery {
    pub scope: Scope,
    pub citizen: Option<CitizenId>,
    /// Matches license number or application number.
    pub text: Option<TextMatch>,
    /// Applied to `issue_date`.
    pub issued: DateFilter,
    pub limit: Option<usize>,
}

impl LicenseQuery {
    pub fn scoped(scope: Scope) -> Self {
        Self {
            scope,
            citizen: None,
            text: None,
            issued: DateFilter::default(),
            limit: None,
        }
    }

    pub fn held_by(mut self, citizen: CitizenId) -> Self {
        self.citizen = Some(citizen);
        self
    }

    pub fn matching(mut self, text: TextMatch) -> Self {
        self.text = Some(text);
        self
    }

    pub fn issued(mut self, issued: DateFilter) -> Self {
        self.issued = issued;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The registry has no owner relationship, so it carries no scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryQuery {
    /// Matches name, mobile, application number or LL number.
    pub text: Option<TextMatch>,
    /// Extends `text` to the "given by" column.
    pub text_includes_given_by: bool,
    pub unpaid_only: bool,
    pub start: DateFilter,
    pub end: DateFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    /// Page numbers are 1-based; zero is read as the first page.
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Saturates for page numbers past any reachable row.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: usize,
    pub last_page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Slices an already ordered result set.
    pub fn from_ordered(rows: Vec<T>, request: PageRequest) -> Self {
        let total = rows.len();
        let last_page = total.div_ceil(request.per_page).max(1);
        let data = rows
            .into_iter()
            .skip(request.offset())
            .take(request.per_page)
            .collect();

        Self {
            data,
            current_page: request.page,
            last_page,
            per_page: request.per_page,
            total,
        }
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            last_page: self.last_page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

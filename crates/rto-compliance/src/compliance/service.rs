use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};

use super::clock::Clock;
use super::dashboard::{aggregate_dashboard, aggregate_user_stats, DashboardStats, UserStats};
use super::domain::{CitizenId, DocumentKind, Principal, RegistryId};
use super::eligibility::{self, is_dl_eligible, EligibleLearner};
use super::expired::{
    collect_expired, collect_expiring, ExpiredDocumentsReport, ExpiringDocumentRow,
    ExpiryReportFilter,
};
use super::expiry::{DateWindow, VehicleStatusView};
use super::notify::{
    international_mobile, ComplianceNotice, NoticeError, NoticePublisher, NoticeTemplate,
};
use super::registry::{RegistryFilter, RegistryRow};
use super::scope::Scope;
use super::search::{search_all, ResultCard, MIN_QUERY_CHARS};
use crate::config::EngineConfig;
use crate::store::{
    DocumentQuery, Page, PageRequest, RecordStore, StoreError, TextMatch, VehicleQuery,
};

/// Read-side facade over the record store. Every call resolves the caller's
/// scope and today's date afresh.
pub struct ComplianceService<S, N> {
    store: Arc<S>,
    notices: Arc<N>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

/// Body of an expiry notification request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExpiryNoticeRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub owner_mobile: String,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

impl<S, N> ComplianceService<S, N>
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    pub fn new(
        store: Arc<S>,
        notices: Arc<N>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            notices,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn expiring_soon_window(&self, today: NaiveDate) -> DateWindow {
        DateWindow::following(today, self.config.expiring_soon_days)
    }

    /// Staff dashboard. Managers outside the exempt branch only see their
    /// branch; the registry-based eligibility count is never narrowed.
    pub fn dashboard_stats(&self, principal: &Principal) -> Result<DashboardStats, ServiceError> {
        require_staff(principal)?;
        let scope = Scope::resolve(principal);
        let today = self.today();

        let stats = aggregate_dashboard(
            &*self.store,
            &scope,
            today,
            &self.expiring_soon_window(today),
        )?;
        debug!(principal = %principal.id, ?scope, ?stats, "dashboard aggregated");
        Ok(stats)
    }

    pub fn user_stats(&self, principal: &Principal) -> Result<UserStats, ServiceError> {
        Ok(aggregate_user_stats(&*self.store, principal.id)?)
    }

    pub fn search(&self, principal: &Principal, raw: &str) -> Result<Vec<ResultCard>, ServiceError> {
        require_staff(principal)?;

        let needle = TextMatch::new(raw)
            .filter(|needle| needle.as_str().chars().count() >= MIN_QUERY_CHARS)
            .ok_or_else(|| ServiceError::Validation {
                field: "query",
                message: format!("query must be at least {MIN_QUERY_CHARS} characters"),
            })?;

        Ok(search_all(
            &*self.store,
            &needle,
            self.config.search_limit,
        )?)
    }

    pub fn list_registry(
        &self,
        principal: &Principal,
        filter: &RegistryFilter,
    ) -> Result<Page<RegistryRow>, ServiceError> {
        require_staff(principal)?;
        let today = self.today();
        let request = PageRequest::new(filter.page.unwrap_or(1), self.config.registry_page_size);

        let page = self
            .store
            .registry_page(&filter.to_query(today), request)?;
        Ok(page.map(|entry| RegistryRow::new(entry, today)))
    }

    /// Learners from both sources who have held their license long enough
    /// to sit the driving test, legacy records first.
    pub fn list_dl_eligible(
        &self,
        principal: &Principal,
    ) -> Result<Vec<EligibleLearner>, ServiceError> {
        require_staff(principal)?;
        let scope = Scope::resolve(principal);
        Ok(eligibility::list_dl_eligible(
            &*self.store,
            &scope,
            self.today(),
        )?)
    }

    pub fn send_registry_reminder(
        &self,
        principal: &Principal,
        id: RegistryId,
    ) -> Result<ComplianceNotice, ServiceError> {
        require_staff(principal)?;
        let entry = self
            .store
            .registry_entry(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("registry entry {id}")))?;

        let mut details = BTreeMap::new();
        details.insert("name".to_string(), entry.name.clone());
        details.insert(
            "crossed_31_days".to_string(),
            is_dl_eligible(entry.start_date, self.today()).to_string(),
        );
        if let Some(ll_no) = &entry.ll_no {
            details.insert("ll_no".to_string(), ll_no.clone());
        }

        let notice = ComplianceNotice {
            template: NoticeTemplate::DlReadyReminder,
            recipient: international_mobile(&entry.mobile),
            details,
        };
        self.notices.publish(notice.clone())?;
        info!(registry_id = %id, "dl reminder sent");
        Ok(notice)
    }

    pub fn expired_documents(
        &self,
        principal: &Principal,
        citizen: CitizenId,
    ) -> Result<ExpiredDocumentsReport, ServiceError> {
        require_staff(principal)?;
        let scope = Scope::resolve(principal);
        let profile = self
            .store
            .citizen(citizen, &scope)?
            .ok_or_else(|| ServiceError::NotFound(format!("citizen {citizen}")))?;

        Ok(collect_expired(
            &*self.store,
            profile,
            &scope,
            self.today(),
        )?)
    }

    /// Staff see any vehicle in scope; a citizen only their own profile's.
    pub fn citizen_vehicles(
        &self,
        principal: &Principal,
        citizen: CitizenId,
    ) -> Result<Vec<VehicleStatusView>, ServiceError> {
        if !principal.role.is_staff() {
            let own = self.store.citizen_for_account(principal.id)?;
            if own.map(|profile| profile.id) != Some(citizen) {
                return Err(ServiceError::Authorization);
            }
        }

        let scope = Scope::resolve(principal);
        self.store
            .citizen(citizen, &scope)?
            .ok_or_else(|| ServiceError::NotFound(format!("citizen {citizen}")))?;

        let today = self.today();
        let soon = self.expiring_soon_window(today);
        let vehicles = self
            .store
            .vehicles(&VehicleQuery::scoped(scope).owned_by(citizen))?;

        let mut views = Vec::with_capacity(vehicles.len());
        for vehicle in vehicles {
            let query = DocumentQuery::scoped(scope).for_vehicle(vehicle.id);
            let mut records = Vec::new();
            for kind in DocumentKind::ordered() {
                records.extend(self.store.documents(kind, &query)?);
            }
            views.push(VehicleStatusView::build(vehicle, &records, &soon));
        }
        Ok(views)
    }

    pub fn expiring_documents(
        &self,
        principal: &Principal,
        filter: &ExpiryReportFilter,
    ) -> Result<Vec<ExpiringDocumentRow>, ServiceError> {
        require_staff(principal)?;

        let kinds = match filter.kind.as_deref().map(str::trim) {
            None | Some("") => DocumentKind::ordered().to_vec(),
            Some(raw) => vec![DocumentKind::parse(raw).ok_or_else(|| {
                ServiceError::Validation {
                    field: "type",
                    message: format!("unknown document type '{raw}'"),
                }
            })?],
        };

        let today = self.today();
        let from = filter.from.unwrap_or(today);
        let to = match filter.to {
            Some(to) => to,
            None => from
                .checked_add_days(Days::new(u64::from(self.config.expiring_soon_days)))
                .ok_or_else(|| ServiceError::Validation {
                    field: "from",
                    message: "from is too close to the end of the calendar".to_string(),
                })?,
        };
        let window = DateWindow::new(from, to);
        if window.is_empty() {
            return Err(ServiceError::Validation {
                field: "from",
                message: "from must not be after to".to_string(),
            });
        }

        let scope = Scope::resolve(principal);
        let rows = collect_expiring(&*self.store, &scope, &window, &kinds)?;
        debug!(%from, %to, rows = rows.len(), "expiry report built");
        Ok(rows)
    }

    pub fn send_expiry_notice(
        &self,
        principal: &Principal,
        request: ExpiryNoticeRequest,
    ) -> Result<ComplianceNotice, ServiceError> {
        require_staff(principal)?;
        if request.owner_mobile.trim().is_empty() {
            return Err(ServiceError::Validation {
                field: "owner_mobile",
                message: "owner mobile is required".to_string(),
            });
        }

        let mut details = BTreeMap::new();
        details.insert("type".to_string(), request.kind);
        if let Some(identifier) = request.identifier {
            details.insert("identifier".to_string(), identifier);
        }
        if let Some(expiry_date) = request.expiry_date {
            details.insert("expiry_date".to_string(), expiry_date.to_string());
        }

        let notice = ComplianceNotice {
            template: NoticeTemplate::DocumentExpiry,
            recipient: international_mobile(&request.owner_mobile),
            details,
        };
        self.notices.publish(notice.clone())?;
        info!(principal = %principal.id, "expiry notice sent");
        Ok(notice)
    }
}

fn require_staff(principal: &Principal) -> Result<(), ServiceError> {
    if principal.role.is_staff() {
        Ok(())
    } else {
        debug!(principal = %principal.id, role = principal.role.label(), "staff-only operation refused");
        Err(ServiceError::Authorization)
    }
}

/// Error raised by the compliance service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("this action is unauthorized")]
    Authorization,
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notice(#[from] NoticeError),
}

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::domain::{DocumentKind, UserId};
use super::eligibility;
use super::expiry::DateWindow;
use super::scope::Scope;
use crate::store::{
    CitizenQuery, DocumentQuery, LicenseQuery, RecordStore, StoreError, VehicleQuery,
};

/// Staff dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_citizens: u64,
    pub ll_eligible_for_dl: u64,
    pub docs_expiring_soon: u64,
}

/// Counters for a citizen's own profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub ll_count: u64,
    pub dl_count: u64,
    pub vehicle_count: u64,
}

/// Every sub-count runs under the same scope; the first failing count fails
/// the whole aggregate.
pub fn aggregate_dashboard<S: RecordStore>(
    store: &S,
    scope: &Scope,
    today: NaiveDate,
    soon: &DateWindow,
) -> Result<DashboardStats, StoreError> {
    let total_users = store.count_users(scope)?;
    let total_citizens = store.count_citizens(&CitizenQuery::scoped(*scope))?;

    let ll_eligible_for_dl = eligibility::count_dl_eligible(store, scope, today)?;

    let query = DocumentQuery::scoped(*scope).expiring((*soon).into());
    let mut docs_expiring_soon = 0;
    for kind in DocumentKind::ordered() {
        let count = store.count_documents(kind, &query)?;
        debug!(kind = kind.label(), count, "documents expiring soon");
        docs_expiring_soon += count;
    }

    Ok(DashboardStats {
        total_users,
        total_citizens,
        ll_eligible_for_dl,
        docs_expiring_soon,
    })
}

/// A login without a linked citizen profile gets zeros, not an error.
pub fn aggregate_user_stats<S: RecordStore>(
    store: &S,
    account: UserId,
) -> Result<UserStats, StoreError> {
    let Some(citizen) = store.citizen_for_account(account)? else {
        debug!(%account, "no citizen profile linked to account");
        return Ok(UserStats::default());
    };

    let licenses = LicenseQuery::scoped(Scope::Unrestricted).held_by(citizen.id);
    Ok(UserStats {
        ll_count: store.count_learner_licenses(&licenses)?,
        dl_count: store.count_driving_licenses(&licenses)?,
        vehicle_count: store
            .count_vehicles(&VehicleQuery::scoped(Scope::Unrestricted).owned_by(citizen.id))?,
    })
}

//! Lapsed-document reports: everything already past its expiry for one
//! citizen, and everything falling due inside a window across the caller's
//! scope.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    Citizen, CitizenId, DocumentId, DocumentKind, DocumentRecord, DrivingLicense,
    LearnerLicense, Vehicle, VehicleId,
};
use super::expiry::{latest, DateWindow};
use super::registry::blank_as_none;
use super::scope::Scope;
use crate::store::{
    CitizenQuery, DocumentQuery, LicenseQuery, RecordStore, StoreError, VehicleQuery,
};

pub const LEARNER_LICENSE_LABEL: &str = "Learner License";
pub const DRIVING_LICENSE_LABEL: &str = "Driving License";

/// The row behind an expired entry, serialized as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExpiredRecord {
    Vehicle(DocumentRecord),
    LearnerLicense(LearnerLicense),
    DrivingLicense(DrivingLicense),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiredDocument {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub identifier: String,
    pub expiry_date: NaiveDate,
    pub full_record: ExpiredRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiredDocumentsReport {
    pub citizen: Citizen,
    pub expired_documents: Vec<ExpiredDocument>,
}

/// Current record of every document kind on every vehicle of `citizen`
/// that lapsed before `today`, plus the citizen's lapsed licenses, oldest
/// first.
pub fn collect_expired<S: RecordStore>(
    store: &S,
    citizen: Citizen,
    scope: &Scope,
    today: NaiveDate,
) -> Result<ExpiredDocumentsReport, StoreError> {
    let mut expired = Vec::new();

    for vehicle in store.vehicles(&VehicleQuery::scoped(*scope).owned_by(citizen.id))? {
        let query = DocumentQuery::scoped(*scope).for_vehicle(vehicle.id);
        for kind in DocumentKind::ordered() {
            let records = store.documents(kind, &query)?;
            let Some(current) = latest(&records) else {
                continue;
            };
            let Some(expiry_date) = current.expiry_date() else {
                continue;
            };
            if expiry_date < today {
                expired.push(ExpiredDocument {
                    kind: kind.label(),
                    identifier: vehicle.registration_no.clone(),
                    expiry_date,
                    full_record: ExpiredRecord::Vehicle(current.clone()),
                });
            }
        }
    }

    let licenses = LicenseQuery::scoped(*scope).held_by(citizen.id);
    for license in store.learner_licenses(&licenses)? {
        if let Some(expiry_date) = license.expiry_date.filter(|date| *date < today) {
            expired.push(ExpiredDocument {
                kind: LEARNER_LICENSE_LABEL,
                identifier: license_identifier(&license.ll_no, &license.application_no),
                expiry_date,
                full_record: ExpiredRecord::LearnerLicense(license),
            });
        }
    }
    for license in store.driving_licenses(&licenses)? {
        if let Some(expiry_date) = license.expiry_date.filter(|date| *date < today) {
            expired.push(ExpiredDocument {
                kind: DRIVING_LICENSE_LABEL,
                identifier: license_identifier(&license.dl_no, &license.application_no),
                expiry_date,
                full_record: ExpiredRecord::DrivingLicense(license),
            });
        }
    }

    expired.sort_by_key(|document| document.expiry_date);

    Ok(ExpiredDocumentsReport {
        citizen,
        expired_documents: expired,
    })
}

fn license_identifier(number: &Option<String>, application_no: &Option<String>) -> String {
    number
        .as_deref()
        .or(application_no.as_deref())
        .filter(|value| !value.is_empty())
        .unwrap_or("N/A")
        .to_string()
}

/// Expiry report filters. `type` narrows to one document kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExpiryReportFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub to: Option<NaiveDate>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiringDocumentRow {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub document_id: DocumentId,
    pub vehicle_id: VehicleId,
    pub registration_no: String,
    pub citizen_id: CitizenId,
    pub owner_name: String,
    pub owner_mobile: String,
    pub expiry_date: NaiveDate,
}

/// Every in-scope document of `kinds` whose expiry falls inside `window`,
/// ordered by expiry date and then kind.
pub fn collect_expiring<S: RecordStore>(
    store: &S,
    scope: &Scope,
    window: &DateWindow,
    kinds: &[DocumentKind],
) -> Result<Vec<ExpiringDocumentRow>, StoreError> {
    let query = DocumentQuery::scoped(*scope).expiring((*window).into());
    let mut vehicles: HashMap<VehicleId, Option<(Vehicle, Option<Citizen>)>> = HashMap::new();
    let mut rows = Vec::new();

    for kind in kinds {
        for record in store.documents(*kind, &query)? {
            let Some(expiry_date) = record.expiry_date() else {
                continue;
            };
            let owner = match vehicles.get(&record.vehicle_id()) {
                Some(cached) => cached.clone(),
                None => {
                    let resolved = resolve_owner(store, scope, record.vehicle_id())?;
                    vehicles.insert(record.vehicle_id(), resolved.clone());
                    resolved
                }
            };
            let Some((vehicle, citizen)) = owner else {
                continue;
            };

            rows.push(ExpiringDocumentRow {
                kind: kind.label(),
                document_id: record.id(),
                vehicle_id: vehicle.id,
                registration_no: vehicle.registration_no,
                citizen_id: vehicle.citizen_id,
                owner_name: citizen
                    .as_ref()
                    .map(|citizen| citizen.name.clone())
                    .unwrap_or_default(),
                owner_mobile: citizen.map(|citizen| citizen.mobile).unwrap_or_default(),
                expiry_date,
            });
        }
    }

    rows.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then_with(|| a.kind.cmp(b.kind))
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
    Ok(rows)
}

fn resolve_owner<S: RecordStore>(
    store: &S,
    scope: &Scope,
    vehicle: VehicleId,
) -> Result<Option<(Vehicle, Option<Citizen>)>, StoreError> {
    let Some(vehicle) = store
        .vehicles(&VehicleQuery::scoped(*scope).with_id(vehicle).limit(1))?
        .into_iter()
        .next()
    else {
        return Ok(None);
    };
    let citizen = store
        .citizens(&CitizenQuery::scoped(*scope).with_id(vehicle.citizen_id).limit(1))?
        .into_iter()
        .next();
    Ok(Some((vehicle, citizen)))
}

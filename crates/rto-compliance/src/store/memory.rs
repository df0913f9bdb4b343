use std::collections::HashMap;

use super::{
    CitizenQuery, DocumentQuery, LicenseQuery, Page, PageRequest, RecordStore, RegistryQuery,
    StoreError, VehicleQuery,
};
use crate::compliance::domain::{
    Branch, BranchId, Citizen, CitizenId, DocumentKind, DocumentRecord, DrivingLicense,
    LearnerLicense, LlRegistryEntry, RegistryId, User, UserId, Vehicle, VehicleId,
};
use crate::compliance::scope::Scope;

/// Point-in-time copy of every table the engine reads.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub branches: Vec<Branch>,
    pub users: Vec<User>,
    pub citizens: Vec<Citizen>,
    pub vehicles: Vec<Vehicle>,
    pub documents: Vec<DocumentRecord>,
    pub learner_licenses: Vec<LearnerLicense>,
    pub driving_licenses: Vec<DrivingLicense>,
    pub registry: Vec<LlRegistryEntry>,
}

/// Immutable store over a [`Snapshot`]. Ownership joins (user -> branch,
/// citizen -> branch, vehicle -> citizen) are resolved once at construction.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Snapshot,
    user_branch: HashMap<UserId, BranchId>,
    citizen_branch: HashMap<CitizenId, BranchId>,
    vehicle_owner: HashMap<VehicleId, CitizenId>,
}

impl MemoryStore {
    pub fn new(mut snapshot: Snapshot) -> Self {
        snapshot.users.sort_by_key(|user| user.id);
        snapshot.citizens.sort_by_key(|citizen| citizen.id);
        snapshot.vehicles.sort_by_key(|vehicle| vehicle.id);
        snapshot
            .documents
            .sort_by_key(|record| (record.kind(), record.id()));
        snapshot.learner_licenses.sort_by_key(|license| license.id);
        snapshot.driving_licenses.sort_by_key(|license| license.id);
        snapshot.registry.sort_by_key(|entry| entry.id);

        let user_branch: HashMap<UserId, BranchId> = snapshot
            .users
            .iter()
            .filter_map(|user| user.branch_id.map(|branch| (user.id, branch)))
            .collect();
        let citizen_branch = snapshot
            .citizens
            .iter()
            .filter_map(|citizen| {
                user_branch
                    .get(&citizen.user_id)
                    .map(|branch| (citizen.id, *branch))
            })
            .collect();
        let vehicle_owner = snapshot
            .vehicles
            .iter()
            .map(|vehicle| (vehicle.id, vehicle.citizen_id))
            .collect();

        Self {
            snapshot,
            user_branch,
            citizen_branch,
            vehicle_owner,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn citizen_visible(&self, scope: &Scope, citizen: CitizenId) -> bool {
        !scope.is_restricted() || scope.admits(self.citizen_branch.get(&citizen).copied())
    }

    fn vehicle_visible(&self, scope: &Scope, vehicle: VehicleId) -> bool {
        if !scope.is_restricted() {
            return true;
        }
        self.vehicle_owner
            .get(&vehicle)
            .map(|citizen| self.citizen_visible(scope, *citizen))
            .unwrap_or(false)
    }

    fn filter_citizens<'a>(
        &'a self,
        query: &'a CitizenQuery,
    ) -> impl Iterator<Item = &'a Citizen> + 'a {
        self.snapshot.citizens.iter().filter(move |citizen| {
            query.id.map_or(true, |id| citizen.id == id)
                && query
                    .account
                    .map_or(true, |account| citizen.account_id == Some(account))
                && query.text.as_ref().map_or(true, |text| {
                    text.matches_any([Some(citizen.name.as_str()), Some(citizen.mobile.as_str())])
                })
                && self.citizen_visible(&query.scope, citizen.id)
        })
    }

    fn filter_vehicles<'a>(
        &'a self,
        query: &'a VehicleQuery,
    ) -> impl Iterator<Item = &'a Vehicle> + 'a {
        self.snapshot.vehicles.iter().filter(move |vehicle| {
            query.id.map_or(true, |id| vehicle.id == id)
                && query
                    .citizen
                    .map_or(true, |citizen| vehicle.citizen_id == citizen)
                && query
                    .text
                    .as_ref()
                    .map_or(true, |text| text.matches(&vehicle.registration_no))
                && self.citizen_visible(&query.scope, vehicle.citizen_id)
        })
    }

    fn filter_documents<'a>(
        &'a self,
        kind: DocumentKind,
        query: &'a DocumentQuery,
    ) -> impl Iterator<Item = &'a DocumentRecord> + 'a {
        self.snapshot.documents.iter().filter(move |record| {
            record.kind() == kind
                && query
                    .vehicle
                    .map_or(true, |vehicle| record.vehicle_id() == vehicle)
                && query.expiry.matches(record.expiry_date())
                && self.vehicle_visible(&query.scope, record.vehicle_id())
        })
    }

    fn filter_learner_licenses<'a>(
        &'a self,
        query: &'a LicenseQuery,
    ) -> impl Iterator<Item = &'a LearnerLicense> + 'a {
        self.snapshot.learner_licenses.iter().filter(move |license| {
            query
                .citizen
                .map_or(true, |citizen| license.citizen_id == citizen)
                && query.text.as_ref().map_or(true, |text| {
                    text.matches_any([license.ll_no.as_deref(), license.application_no.as_deref()])
                })
                && query.issued.matches(license.issue_date)
                && self.citizen_visible(&query.scope, license.citizen_id)
        })
    }

    fn filter_driving_licenses<'a>(
        &'a self,
        query: &'a LicenseQuery,
    ) -> impl Iterator<Item = &'a DrivingLicense> + 'a {
        self.snapshot.driving_licenses.iter().filter(move |license| {
            query
                .citizen
                .map_or(true, |citizen| license.citizen_id == citizen)
                && query.text.as_ref().map_or(true, |text| {
                    text.matches_any([license.dl_no.as_deref(), license.application_no.as_deref()])
                })
                && query.issued.matches(license.issue_date)
                && self.citizen_visible(&query.scope, license.citizen_id)
        })
    }

    fn filter_registry<'a>(
        &'a self,
        query: &'a RegistryQuery,
    ) -> impl DoubleEndedIterator<Item = &'a LlRegistryEntry> + 'a {
        self.snapshot.registry.iter().filter(move |entry| {
            query.text.as_ref().map_or(true, |text| {
                text.matches_any([
                    Some(entry.name.as_str()),
                    Some(entry.mobile.as_str()),
                    entry.application_no.as_deref(),
                    entry.ll_no.as_deref(),
                    entry
                        .given_by
                        .as_deref()
                        .filter(|_| query.text_includes_given_by),
                ])
            }) && (!query.unpaid_only || entry.has_due())
                && query.start.matches(entry.start_date)
                && query.end.matches(entry.end_date)
        })
    }
}

fn collect_limited<'a, T, I>(rows: I, limit: Option<usize>) -> Vec<T>
where
    T: Clone + 'a,
    I: Iterator<Item = &'a T>,
{
    rows.take(limit.unwrap_or(usize::MAX)).cloned().collect()
}

impl RecordStore for MemoryStore {
    fn count_users(&self, scope: &Scope) -> Result<u64, StoreError> {
        let count = self
            .snapshot
            .users
            .iter()
            .filter(|user| scope.admits(self.user_branch.get(&user.id).copied()))
            .count();
        Ok(count as u64)
    }

    fn citizens(&self, query: &CitizenQuery) -> Result<Vec<Citizen>, StoreError> {
        Ok(collect_limited(self.filter_citizens(query), query.limit))
    }

    fn count_citizens(&self, query: &CitizenQuery) -> Result<u64, StoreError> {
        Ok(self.filter_citizens(query).count() as u64)
    }

    fn vehicles(&self, query: &VehicleQuery) -> Result<Vec<Vehicle>, StoreError> {
        Ok(collect_limited(self.filter_vehicles(query), query.limit))
    }

    fn count_vehicles(&self, query: &VehicleQuery) -> Result<u64, StoreError> {
        Ok(self.filter_vehicles(query).count() as u64)
    }

    fn documents(
        &self,
        kind: DocumentKind,
        query: &DocumentQuery,
    ) -> Result<Vec<DocumentRecord>, StoreError> {
        Ok(self.filter_documents(kind, query).cloned().collect())
    }

    fn count_documents(
        &self,
        kind: DocumentKind,
        query: &DocumentQuery,
    ) -> Result<u64, StoreError> {
        Ok(self.filter_documents(kind, query).count() as u64)
    }

    fn learner_licenses(&self, query: &LicenseQuery) -> Result<Vec<LearnerLicense>, StoreError> {
        Ok(collect_limited(
            self.filter_learner_licenses(query),
            query.limit,
        ))
    }

    fn count_learner_licenses(&self, query: &LicenseQuery) -> Result<u64, StoreError> {
        Ok(self.filter_learner_licenses(query).count() as u64)
    }

    fn driving_licenses(&self, query: &LicenseQuery) -> Result<Vec<DrivingLicense>, StoreError> {
        Ok(collect_limited(
            self.filter_driving_licenses(query),
            query.limit,
        ))
    }

    fn count_driving_licenses(&self, query: &LicenseQuery) -> Result<u64, StoreError> {
        Ok(self.filter_driving_licenses(query).count() as u64)
    }

    fn registry_entries(
        &self,
        query: &RegistryQuery,
        limit: Option<usize>,
    ) -> Result<Vec<LlRegistryEntry>, StoreError> {
        Ok(collect_limited(self.filter_registry(query), limit))
    }

    fn registry_page(
        &self,
        query: &RegistryQuery,
        page: PageRequest,
    ) -> Result<Page<LlRegistryEntry>, StoreError> {
        let newest_first = self.filter_registry(query).rev().cloned().collect();
        Ok(Page::from_ordered(newest_first, page))
    }

    fn count_registry_entries(&self, query: &RegistryQuery) -> Result<u64, StoreError> {
        Ok(self.filter_registry(query).count() as u64)
    }

    fn registry_entry(&self, id: RegistryId) -> Result<Option<LlRegistryEntry>, StoreError> {
        Ok(self
            .snapshot
            .registry
            .iter()
            .find(|entry| entry.id == id)
            .cloned())
    }
}

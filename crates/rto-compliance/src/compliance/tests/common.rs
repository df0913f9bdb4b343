use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::compliance::domain::{
    Branch, BranchId, Citizen, CitizenId, DocumentId, DocumentKind, DocumentRecord,
    DrivingLicense, LearnerLicense, LicenseId, LlRegistryEntry, Principal, RegistryId, Role,
    User, UserId, Vehicle, VehicleFitness, VehicleId, VehicleInsurance, VehiclePermit,
    VehiclePucc, VehicleTax, VehicleVltd,
};
use crate::compliance::notify::{ComplianceNotice, NoticeError, NoticePublisher};
use crate::compliance::scope::Scope;
use crate::compliance::{compliance_router, ComplianceService, FixedClock};
use crate::config::EngineConfig;
use crate::store::{
    CitizenQuery, DocumentQuery, LicenseQuery, MemoryStore, Page, PageRequest, RecordStore,
    RegistryQuery, Snapshot, StoreError, VehicleQuery,
};

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Every fixture is evaluated as of this day.
pub(super) fn today() -> NaiveDate {
    date(2025, 3, 1)
}

pub(super) fn admin() -> Principal {
    Principal {
        id: UserId(1),
        role: Role::Admin,
        branch: None,
    }
}

pub(super) fn head_office_manager() -> Principal {
    Principal {
        id: UserId(2),
        role: Role::Manager,
        branch: Some(Branch {
            id: BranchId(1),
            name: "Dhamtari".to_string(),
        }),
    }
}

pub(super) fn kurud_manager() -> Principal {
    Principal {
        id: UserId(3),
        role: Role::Manager,
        branch: Some(Branch {
            id: BranchId(2),
            name: "Kurud".to_string(),
        }),
    }
}

/// Self-service login linked to citizen 10.
pub(super) fn citizen_account() -> Principal {
    Principal {
        id: UserId(4),
        role: Role::Citizen,
        branch: None,
    }
}

pub(super) fn snapshot() -> Snapshot {
    Snapshot {
        branches: vec![
            Branch {
                id: BranchId(1),
                name: "Dhamtari".to_string(),
            },
            Branch {
                id: BranchId(2),
                name: "Kurud".to_string(),
            },
        ],
        users: vec![
            user(1, "Head Admin", Role::Admin, None),
            user(2, "Dhamtari Desk", Role::Manager, Some(1)),
            user(3, "Kurud Desk", Role::Manager, Some(2)),
            user(4, "Arjun Login", Role::Citizen, None),
        ],
        citizens: vec![
            Citizen {
                id: CitizenId(10),
                name: "Arjun Verma".to_string(),
                mobile: "9826000010".to_string(),
                user_id: UserId(2),
                account_id: Some(UserId(4)),
            },
            Citizen {
                id: CitizenId(20),
                name: "Meena Sahu".to_string(),
                mobile: "9826000020".to_string(),
                user_id: UserId(3),
                account_id: None,
            },
        ],
        vehicles: vec![
            vehicle(100, 10, "CG05AB1234"),
            vehicle(200, 20, "CG05CD5678"),
            // Owner row was deleted upstream.
            vehicle(300, 999, "CG04ZZ0001"),
        ],
        documents: vec![
            insurance(1, 100, Some(date(2024, 1, 1))),
            insurance(2, 100, Some(date(2025, 6, 15))),
            insurance(3, 100, Some(date(2024, 12, 31))),
            DocumentRecord::Tax(VehicleTax {
                id: DocumentId(4),
                vehicle_id: VehicleId(100),
                tax_mode: Some("Quarterly".to_string()),
                tax_from: Some(date(2024, 12, 6)),
                tax_upto: Some(date(2025, 3, 5)),
                amount: Some(150_000),
            }),
            DocumentRecord::Pucc(VehiclePucc {
                id: DocumentId(5),
                vehicle_id: VehicleId(200),
                pucc_number: Some("PUC-55".to_string()),
                valid_from: Some(date(2024, 9, 12)),
                valid_until: Some(date(2025, 3, 11)),
                status: Some("active".to_string()),
            }),
            DocumentRecord::Fitness(VehicleFitness {
                id: DocumentId(6),
                vehicle_id: VehicleId(200),
                certificate_number: Some("FC-6".to_string()),
                issue_date: Some(date(2024, 2, 20)),
                expiry_date: Some(date(2025, 2, 20)),
            }),
            DocumentRecord::Permit(VehiclePermit {
                id: DocumentId(7),
                vehicle_id: VehicleId(200),
                permit_number: Some("PR-7".to_string()),
                permit_type: Some("Goods".to_string()),
                issue_date: None,
                expiry_date: Some(date(2025, 3, 12)),
            }),
            DocumentRecord::Vltd(VehicleVltd {
                id: DocumentId(8),
                vehicle_id: VehicleId(100),
                vendor_name: Some("Trackon".to_string()),
                issue_date: None,
                expiry_date: None,
            }),
            insurance(9, 200, Some(date(2024, 5, 1))),
            insurance(10, 200, Some(date(2026, 1, 1))),
        ],
        learner_licenses: vec![
            learner(1, 10, Some("LL-2025-001"), Some("APP-1"), Some(date(2025, 1, 29)), Some(date(2025, 7, 29))),
            learner(2, 20, Some("LL-2025-002"), None, Some(date(2025, 1, 30)), Some(date(2025, 2, 15))),
            learner(3, 20, None, None, Some(date(2024, 11, 1)), None),
            learner(4, 999, Some("LL-GHOST"), None, None, None),
        ],
        driving_licenses: vec![DrivingLicense {
            id: LicenseId(1),
            citizen_id: CitizenId(10),
            dl_no: Some("DL-0501".to_string()),
            application_no: Some("APP-DL1".to_string()),
            issue_date: Some(date(2023, 1, 1)),
            expiry_date: Some(date(2025, 1, 1)),
        }],
        registry: vec![
            registry(1, "Ravi Sahu", "9826000001", Some("Kurud desk"), Some("APP-77"), Some("LLR-1"), Some(date(2025, 1, 29)), Some(date(2025, 7, 28)), 50_000, 20_000),
            registry(2, "Sita Devi", "9826000002", None, None, None, Some(date(2025, 1, 30)), Some(date(2025, 3, 20)), 0, 0),
            registry(3, "Arjun Verma", "9826000010", None, None, None, None, None, 1_000, 1_000),
        ],
    }
}

fn user(id: u64, name: &str, role: Role, branch: Option<u64>) -> User {
    User {
        id: UserId(id),
        name: name.to_string(),
        role,
        branch_id: branch.map(BranchId),
    }
}

fn vehicle(id: u64, citizen: u64, registration_no: &str) -> Vehicle {
    Vehicle {
        id: VehicleId(id),
        citizen_id: CitizenId(citizen),
        registration_no: registration_no.to_string(),
        vehicle_type: None,
        make_model: None,
        chassis_no: None,
        engine_no: None,
    }
}

fn insurance(id: u64, vehicle: u64, end: Option<NaiveDate>) -> DocumentRecord {
    DocumentRecord::Insurance(VehicleInsurance {
        id: DocumentId(id),
        vehicle_id: VehicleId(vehicle),
        company_name: Some("National Insurance".to_string()),
        insurance_type: Some("Comprehensive".to_string()),
        policy_number: Some(format!("POL-{id}")),
        start_date: None,
        end_date: end,
        status: None,
    })
}

fn learner(
    id: u64,
    citizen: u64,
    ll_no: Option<&str>,
    application_no: Option<&str>,
    issue_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
) -> LearnerLicense {
    LearnerLicense {
        id: LicenseId(id),
        citizen_id: CitizenId(citizen),
        ll_no: ll_no.map(str::to_string),
        application_no: application_no.map(str::to_string),
        issue_date,
        expiry_date,
    }
}

#[allow(clippy::too_many_arguments)]
fn registry(
    id: u64,
    name: &str,
    mobile: &str,
    given_by: Option<&str>,
    application_no: Option<&str>,
    ll_no: Option<&str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    payment_asked: i64,
    payment_paid: i64,
) -> LlRegistryEntry {
    LlRegistryEntry {
        id: RegistryId(id),
        name: name.to_string(),
        mobile: mobile.to_string(),
        given_by: given_by.map(str::to_string),
        application_no: application_no.map(str::to_string),
        ll_no: ll_no.map(str::to_string),
        dob: None,
        start_date,
        end_date,
        payment_asked,
        payment_paid,
        aadhar_path: None,
    }
}

pub(super) fn store() -> MemoryStore {
    MemoryStore::new(snapshot())
}

pub(super) fn build_service_with<S: RecordStore + 'static>(
    store: S,
    config: EngineConfig,
) -> (ComplianceService<S, MemoryNotices>, Arc<MemoryNotices>) {
    let notices = Arc::new(MemoryNotices::default());
    let service = ComplianceService::new(
        Arc::new(store),
        notices.clone(),
        Arc::new(FixedClock(today())),
        config,
    );
    (service, notices)
}

pub(super) fn build_service() -> (ComplianceService<MemoryStore, MemoryNotices>, Arc<MemoryNotices>)
{
    build_service_with(store(), EngineConfig::default())
}

pub(super) fn compliance_router_with_service<S: RecordStore + 'static, N: NoticePublisher + 'static>(
    service: ComplianceService<S, N>,
) -> axum::Router {
    compliance_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotices {
    events: Arc<Mutex<Vec<ComplianceNotice>>>,
}

impl MemoryNotices {
    pub(super) fn events(&self) -> Vec<ComplianceNotice> {
        self.events.lock().expect("notice mutex poisoned").clone()
    }
}

impl NoticePublisher for MemoryNotices {
    fn publish(&self, notice: ComplianceNotice) -> Result<(), NoticeError> {
        self.events
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct OfflineNotices;

impl NoticePublisher for OfflineNotices {
    fn publish(&self, _notice: ComplianceNotice) -> Result<(), NoticeError> {
        Err(NoticeError::Transport("gateway offline".to_string()))
    }
}

/// Delegates to the fixture store but fails every query against one document
/// collection.
pub(super) struct FailingDocumentStore {
    pub(super) inner: MemoryStore,
    pub(super) failing: DocumentKind,
}

impl FailingDocumentStore {
    pub(super) fn new(failing: DocumentKind) -> Self {
        Self {
            inner: store(),
            failing,
        }
    }

    fn check(&self, kind: DocumentKind) -> Result<(), StoreError> {
        if kind == self.failing {
            Err(StoreError::Unavailable(format!("{} table offline", kind.label())))
        } else {
            Ok(())
        }
    }
}

impl RecordStore for FailingDocumentStore {
    fn count_users(&self, scope: &Scope) -> Result<u64, StoreError> {
        self.inner.count_users(scope)
    }

    fn citizens(&self, query: &CitizenQuery) -> Result<Vec<Citizen>, StoreError> {
        self.inner.citizens(query)
    }

    fn count_citizens(&self, query: &CitizenQuery) -> Result<u64, StoreError> {
        self.inner.count_citizens(query)
    }

    fn vehicles(&self, query: &VehicleQuery) -> Result<Vec<Vehicle>, StoreError> {
        self.inner.vehicles(query)
    }

    fn count_vehicles(&self, query: &VehicleQuery) -> Result<u64, StoreError> {
        self.inner.count_vehicles(query)
    }

    fn documents(
        &self,
        kind: DocumentKind,
        query: &DocumentQuery,
    ) -> Result<Vec<DocumentRecord>, StoreError> {
        self.check(kind)?;
        self.inner.documents(kind, query)
    }

    fn count_documents(
        &self,
        kind: DocumentKind,
        query: &DocumentQuery,
    ) -> Result<u64, StoreError> {
        self.check(kind)?;
        self.inner.count_documents(kind, query)
    }

    fn learner_licenses(&self, query: &LicenseQuery) -> Result<Vec<LearnerLicense>, StoreError> {
        self.inner.learner_licenses(query)
    }

    fn count_learner_licenses(&self, query: &LicenseQuery) -> Result<u64, StoreError> {
        self.inner.count_learner_licenses(query)
    }

    fn driving_licenses(&self, query: &LicenseQuery) -> Result<Vec<DrivingLicense>, StoreError> {
        self.inner.driving_licenses(query)
    }

    fn count_driving_licenses(&self, query: &LicenseQuery) -> Result<u64, StoreError> {
        self.inner.count_driving_licenses(query)
    }

    fn registry_entries(
        &self,
        query: &RegistryQuery,
        limit: Option<usize>,
    ) -> Result<Vec<LlRegistryEntry>, StoreError> {
        self.inner.registry_entries(query, limit)
    }

    fn registry_page(
        &self,
        query: &RegistryQuery,
        page: PageRequest,
    ) -> Result<Page<LlRegistryEntry>, StoreError> {
        self.inner.registry_page(query, page)
    }

    fn count_registry_entries(&self, query: &RegistryQuery) -> Result<u64, StoreError> {
        self.inner.count_registry_entries(query)
    }

    fn registry_entry(&self, id: RegistryId) -> Result<Option<LlRegistryEntry>, StoreError> {
        self.inner.registry_entry(id)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

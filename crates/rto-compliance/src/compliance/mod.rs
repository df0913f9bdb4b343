//! Regional transport office compliance read model: branch scoping, expiry
//! windows, learner-to-driving-license eligibility, dashboard counters,
//! global search and lapsed-document reports.

pub mod clock;
pub mod dashboard;
pub mod domain;
pub mod eligibility;
pub mod expired;
pub mod expiry;
pub mod notify;
pub mod registry;
pub mod router;
pub mod scope;
pub mod search;
pub mod service;

#[cfg(test)]
mod tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dashboard::{DashboardStats, UserStats};
pub use domain::{
    Branch, BranchId, Citizen, CitizenId, DocumentId, DocumentKind, DocumentRecord,
    DrivingLicense, LearnerLicense, LicenseId, LlRegistryEntry, Principal, RegistryId, Role,
    User, UserId, Vehicle, VehicleId,
};
pub use eligibility::{
    DualSourceMerger, EligibleLearner, LearnerRegistry, LegacyLearnerLicenses,
    LicenseEligibilitySource, LicenseSource,
};
pub use expired::{
    ExpiredDocument, ExpiredDocumentsReport, ExpiringDocumentRow, ExpiryReportFilter,
};
pub use expiry::{DateWindow, ExpiryState, VehicleStatusView};
pub use notify::{ComplianceNotice, NoticeError, NoticePublisher, NoticeTemplate};
pub use registry::{RegistryFilter, RegistryRow};
pub use router::{compliance_router, principal_from_headers, PrincipalError};
pub use scope::Scope;
pub use search::ResultCard;
pub use service::{ComplianceService, ExpiryNoticeRequest, ServiceError};

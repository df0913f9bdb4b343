use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{Branch, BranchId, CitizenId, Principal, RegistryId, Role, UserId};
use super::expired::ExpiryReportFilter;
use super::notify::NoticePublisher;
use super::registry::RegistryFilter;
use super::service::{ComplianceService, ExpiryNoticeRequest, ServiceError};
use crate::store::RecordStore;

pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";
pub const BRANCH_ID_HEADER: &str = "x-branch-id";
pub const BRANCH_NAME_HEADER: &str = "x-branch-name";

/// Router builder exposing the compliance read model over HTTP.
pub fn compliance_router<S, N>(service: Arc<ComplianceService<S, N>>) -> Router
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    Router::new()
        .route("/api/v1/dashboard/stats", get(dashboard_handler::<S, N>))
        .route("/api/v1/dashboard/user-stats", get(user_stats_handler::<S, N>))
        .route("/api/v1/search", get(search_handler::<S, N>))
        .route("/api/v1/ll-registry", get(registry_handler::<S, N>))
        .route(
            "/api/v1/ll-registry/dl-eligible",
            get(dl_eligible_handler::<S, N>),
        )
        .route(
            "/api/v1/ll-registry/:id/send-message",
            post(registry_reminder_handler::<S, N>),
        )
        .route(
            "/api/v1/citizens/:id/expired-documents",
            get(expired_documents_handler::<S, N>),
        )
        .route(
            "/api/v1/citizens/:id/vehicles",
            get(citizen_vehicles_handler::<S, N>),
        )
        .route("/api/v1/reports/expiries", get(expiry_report_handler::<S, N>))
        .route(
            "/api/v1/reports/expiries/send-notification",
            post(expiry_notice_handler::<S, N>),
        )
        .with_state(service)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PrincipalError {
    #[error("missing {0} header")]
    Missing(&'static str),
    #[error("malformed {0} header")]
    Malformed(&'static str),
}

/// Reads the caller forwarded by the upstream gateway. Branch headers are
/// optional but must arrive together.
pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, PrincipalError> {
    let id = header_value(headers, PRINCIPAL_ID_HEADER)?
        .ok_or(PrincipalError::Missing(PRINCIPAL_ID_HEADER))?
        .parse::<u64>()
        .map_err(|_| PrincipalError::Malformed(PRINCIPAL_ID_HEADER))?;
    let role = header_value(headers, PRINCIPAL_ROLE_HEADER)?
        .ok_or(PrincipalError::Missing(PRINCIPAL_ROLE_HEADER))
        .and_then(|raw| Role::parse(raw).ok_or(PrincipalError::Malformed(PRINCIPAL_ROLE_HEADER)))?;

    let branch = match (
        header_value(headers, BRANCH_ID_HEADER)?,
        header_value(headers, BRANCH_NAME_HEADER)?,
    ) {
        (None, None) => None,
        (Some(id), Some(name)) => Some(Branch {
            id: BranchId(
                id.parse()
                    .map_err(|_| PrincipalError::Malformed(BRANCH_ID_HEADER))?,
            ),
            name: name.to_string(),
        }),
        (Some(_), None) => return Err(PrincipalError::Missing(BRANCH_NAME_HEADER)),
        (None, Some(_)) => return Err(PrincipalError::Missing(BRANCH_ID_HEADER)),
    };

    Ok(Principal {
        id: UserId(id),
        role,
        branch,
    })
}

fn header_value<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<Option<&'a str>, PrincipalError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|value| Some(value.trim()).filter(|value| !value.is_empty()))
            .map_err(|_| PrincipalError::Malformed(name)),
    }
}

fn authenticate(headers: &HeaderMap) -> Result<Principal, Response> {
    principal_from_headers(headers).map_err(|error| {
        let payload = json!({
            "error": error.to_string(),
        });
        (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
    })
}

fn respond<T: Serialize>(result: Result<T, ServiceError>, status: StatusCode) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) fn service_error_response(error: ServiceError) -> Response {
    match error {
        ServiceError::Validation { field, message } => {
            let payload = json!({
                "error": message,
                "field": field,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        ServiceError::Authorization => {
            let payload = json!({
                "error": "this action is unauthorized",
            });
            (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
        }
        ServiceError::NotFound(what) => {
            let payload = json!({
                "error": format!("{what} not found"),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        other => {
            tracing::error!(error = %other, "compliance request failed");
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchParams {
    #[serde(default)]
    query: String,
}

pub(crate) async fn dashboard_handler<S, N>(
    State(service): State<Arc<ComplianceService<S, N>>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    let principal = match authenticate(&headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    respond(service.dashboard_stats(&principal), StatusCode::OK)
}

pub(crate) async fn user_stats_handler<S, N>(
    State(service): State<Arc<ComplianceService<S, N>>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    let principal = match authenticate(&headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    respond(service.user_stats(&principal), StatusCode::OK)
}

pub(crate) async fn search_handler<S, N>(
    State(service): State<Arc<ComplianceService<S, N>>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    let principal = match authenticate(&headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    respond(service.search(&principal, &params.query), StatusCode::OK)
}

pub(crate) async fn registry_handler<S, N>(
    State(service): State<Arc<ComplianceService<S, N>>>,
    headers: HeaderMap,
    Query(filter): Query<RegistryFilter>,
) -> Response
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    let principal = match authenticate(&headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    respond(service.list_registry(&principal, &filter), StatusCode::OK)
}

pub(crate) async fn dl_eligible_handler<S, N>(
    State(service): State<Arc<ComplianceService<S, N>>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    let principal = match authenticate(&headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    respond(service.list_dl_eligible(&principal), StatusCode::OK)
}

pub(crate) async fn registry_reminder_handler<S, N>(
    State(service): State<Arc<ComplianceService<S, N>>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    let principal = match authenticate(&headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match service.send_registry_reminder(&principal, RegistryId(id)) {
        Ok(notice) => {
            let payload = json!({
                "message": "Message sent successfully",
                "recipient": notice.recipient,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn expired_documents_handler<S, N>(
    State(service): State<Arc<ComplianceService<S, N>>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    let principal = match authenticate(&headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    respond(
        service.expired_documents(&principal, CitizenId(id)),
        StatusCode::OK,
    )
}

pub(crate) async fn citizen_vehicles_handler<S, N>(
    State(service): State<Arc<ComplianceService<S, N>>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    let principal = match authenticate(&headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    respond(
        service.citizen_vehicles(&principal, CitizenId(id)),
        StatusCode::OK,
    )
}

pub(crate) async fn expiry_report_handler<S, N>(
    State(service): State<Arc<ComplianceService<S, N>>>,
    headers: HeaderMap,
    Query(filter): Query<ExpiryReportFilter>,
) -> Response
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    let principal = match authenticate(&headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    respond(
        service.expiring_documents(&principal, &filter),
        StatusCode::OK,
    )
}

pub(crate) async fn expiry_notice_handler<S, N>(
    State(service): State<Arc<ComplianceService<S, N>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ExpiryNoticeRequest>,
) -> Response
where
    S: RecordStore + 'static,
    N: NoticePublisher + 'static,
{
    let principal = match authenticate(&headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match service.send_expiry_notice(&principal, request) {
        Ok(_) => {
            let payload = json!({
                "message": "Notification sent successfully",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use super::common::*;
use crate::compliance::domain::{BranchId, DocumentKind, Role, UserId};
use crate::compliance::router::{self, principal_from_headers, PrincipalError};
use crate::config::EngineConfig;

fn staff_request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-principal-id", "1")
        .header("x-principal-role", "admin")
}

#[test]
fn principal_headers_parse_with_branch() {
    let mut headers = HeaderMap::new();
    headers.insert("x-principal-id", HeaderValue::from_static("3"));
    headers.insert("x-principal-role", HeaderValue::from_static("Manager"));
    headers.insert("x-branch-id", HeaderValue::from_static("2"));
    headers.insert("x-branch-name", HeaderValue::from_static("Kurud"));

    let principal = principal_from_headers(&headers).expect("valid principal");

    assert_eq!(principal.id, UserId(3));
    assert_eq!(principal.role, Role::Manager);
    assert_eq!(principal.branch.map(|branch| branch.id), Some(BranchId(2)));
}

#[test]
fn principal_headers_reject_partial_or_malformed_input() {
    let mut headers = HeaderMap::new();
    assert_eq!(
        principal_from_headers(&headers),
        Err(PrincipalError::Missing("x-principal-id"))
    );

    headers.insert("x-principal-id", HeaderValue::from_static("seven"));
    headers.insert("x-principal-role", HeaderValue::from_static("admin"));
    assert_eq!(
        principal_from_headers(&headers),
        Err(PrincipalError::Malformed("x-principal-id"))
    );

    headers.insert("x-principal-id", HeaderValue::from_static("7"));
    headers.insert("x-branch-id", HeaderValue::from_static("2"));
    assert_eq!(
        principal_from_headers(&headers),
        Err(PrincipalError::Missing("x-branch-name"))
    );
}

#[tokio::test]
async fn dashboard_route_returns_counts() {
    let (service, _) = build_service();
    let router = compliance_router_with_service(service);

    let response = router
        .oneshot(
            staff_request("GET", "/api/v1/dashboard/stats")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total_users"], 4);
    assert_eq!(payload["ll_eligible_for_dl"], 3);
    assert_eq!(payload["docs_expiring_soon"], 2);
}

#[tokio::test]
async fn requests_without_principal_are_unauthorized() {
    let (service, _) = build_service();
    let router = compliance_router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/dashboard/stats")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn short_search_is_unprocessable() {
    let (service, _) = build_service();
    let router = compliance_router_with_service(service);

    let response = router
        .oneshot(
            staff_request("GET", "/api/v1/search?query=a")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["field"], "query");
}

#[tokio::test]
async fn citizen_search_is_forbidden() {
    let (service, _) = build_service();
    let router = compliance_router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/search?query=cg05")
                .header("x-principal-id", "4")
                .header("x-principal-role", "user")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn search_route_returns_typed_cards() {
    let (service, _) = build_service();
    let router = compliance_router_with_service(service);

    let response = router
        .oneshot(
            staff_request("GET", "/api/v1/search?query=cg04")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload[0]["unique_key"], "vehicle-300");
    assert_eq!(payload[0]["type"], "Vehicle");
    assert_eq!(payload[0]["url"], "/citizens/999");
}

#[tokio::test]
async fn registry_route_accepts_screen_filters() {
    let (service, _) = build_service();
    let router = compliance_router_with_service(service);

    let response = router
        .oneshot(
            staff_request(
                "GET",
                "/api/v1/ll-registry?search=&show_unpaid=true&expiry_from=&expiry_to=&cross_31_days=false&expires_in_month=false&page=1",
            )
            .body(Body::empty())
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total"], 1);
    assert_eq!(payload["data"][0]["name"], "Ravi Sahu");
    assert_eq!(payload["data"][0]["balance"], 30_000);
}

#[tokio::test]
async fn registry_route_returns_empty_page_past_the_end() {
    let (service, _) = build_service();
    let router = compliance_router_with_service(service);

    let response = router
        .oneshot(
            staff_request("GET", "/api/v1/ll-registry?page=18446744073709551615")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total"], 3);
    assert_eq!(payload["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn expired_documents_route_hides_out_of_scope_citizens() {
    let (service, _) = build_service();
    let router = compliance_router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/citizens/10/expired-documents")
                .header("x-principal-id", "3")
                .header("x-principal-role", "manager")
                .header("x-branch-id", "2")
                .header("x-branch-name", "Kurud")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_documents_route_embeds_full_record() {
    let (service, _) = build_service();
    let router = compliance_router_with_service(service);

    let response = router
        .oneshot(
            staff_request("GET", "/api/v1/citizens/20/expired-documents")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["citizen"]["name"], "Meena Sahu");
    let fitness = &payload["expired_documents"][1];
    assert_eq!(fitness["type"], "Fitness");
    assert_eq!(fitness["full_record"]["certificate_number"], "FC-6");
}

#[tokio::test]
async fn send_notification_route_validates_mobile() {
    let (service, notices) = build_service();
    let router = compliance_router_with_service(service);

    let response = router
        .oneshot(
            staff_request("POST", "/api/v1/reports/expiries/send-notification")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"type":"PUCC","owner_mobile":"","identifier":"CG05CD5678"}"#,
                ))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(notices.events().is_empty());
}

#[tokio::test]
async fn dashboard_handler_reports_store_failures_as_internal_errors() {
    let (service, _) = build_service_with(
        FailingDocumentStore::new(DocumentKind::Tax),
        EngineConfig::default(),
    );
    let service = Arc::new(service);

    let mut headers = HeaderMap::new();
    headers.insert("x-principal-id", HeaderValue::from_static("1"));
    headers.insert("x-principal-role", HeaderValue::from_static("admin"));

    let response = router::dashboard_handler::<FailingDocumentStore, MemoryNotices>(
        State(service),
        headers,
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

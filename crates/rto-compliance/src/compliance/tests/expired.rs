use super::common::*;
use crate::compliance::domain::{CitizenId, DocumentId, DocumentKind, VehicleId};
use crate::compliance::expired::ExpiryReportFilter;
use crate::compliance::expiry::ExpiryState;
use crate::compliance::notify::NoticeTemplate;
use crate::compliance::{ExpiryNoticeRequest, ServiceError};

#[test]
fn superseded_records_never_count_as_expired() {
    let (service, _) = build_service();

    let report = service
        .expired_documents(&admin(), CitizenId(10))
        .expect("report builds");

    // Two lapsed insurance rows are shadowed by the current 2025-06-15 policy.
    assert_eq!(report.citizen.name, "Arjun Verma");
    assert_eq!(report.expired_documents.len(), 1);
    let lapsed = &report.expired_documents[0];
    assert_eq!(lapsed.kind, "Driving License");
    assert_eq!(lapsed.identifier, "DL-0501");
    assert_eq!(lapsed.expiry_date, date(2025, 1, 1));
}

#[test]
fn licenses_and_vehicle_documents_are_ordered_by_expiry() {
    let (service, _) = build_service();

    let report = service
        .expired_documents(&kurud_manager(), CitizenId(20))
        .expect("report builds");

    let entries: Vec<_> = report
        .expired_documents
        .iter()
        .map(|document| (document.kind, document.identifier.as_str()))
        .collect();
    assert_eq!(
        entries,
        vec![("Learner License", "LL-2025-002"), ("Fitness", "CG05CD5678")]
    );
}

#[test]
fn citizen_outside_scope_is_not_found() {
    let (service, _) = build_service();

    match service.expired_documents(&kurud_manager(), CitizenId(10)) {
        Err(ServiceError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
    match service.expired_documents(&admin(), CitizenId(999)) {
        Err(ServiceError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn expiry_report_defaults_to_the_soon_window() {
    let (service, _) = build_service();

    let rows = service
        .expiring_documents(&admin(), &ExpiryReportFilter::default())
        .expect("report builds");

    let summary: Vec<_> = rows
        .iter()
        .map(|row| (row.kind, row.document_id, row.expiry_date))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Tax", DocumentId(4), date(2025, 3, 5)),
            ("PUCC", DocumentId(5), date(2025, 3, 11)),
        ]
    );
    assert_eq!(rows[0].owner_name, "Arjun Verma");
    assert_eq!(rows[0].registration_no, "CG05AB1234");
    assert_eq!(rows[1].owner_mobile, "9826000020");
}

#[test]
fn expiry_report_narrows_by_type_and_scope() {
    let (service, _) = build_service();
    let filter = ExpiryReportFilter {
        from: Some(date(2025, 2, 1)),
        to: Some(date(2025, 3, 31)),
        kind: Some("fitness".to_string()),
    };

    let rows = service
        .expiring_documents(&kurud_manager(), &filter)
        .expect("report builds");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].vehicle_id, VehicleId(200));

    let all = service
        .expiring_documents(
            &kurud_manager(),
            &ExpiryReportFilter {
                kind: None,
                ..filter
            },
        )
        .expect("report builds");
    assert!(all.iter().all(|row| row.citizen_id == CitizenId(20)));
    assert_eq!(all.len(), 3);
}

#[test]
fn inverted_range_and_unknown_type_are_rejected() {
    let (service, _) = build_service();

    let inverted = ExpiryReportFilter {
        from: Some(date(2025, 4, 1)),
        to: Some(date(2025, 3, 1)),
        kind: None,
    };
    match service.expiring_documents(&admin(), &inverted) {
        Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "from"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let unknown = ExpiryReportFilter {
        kind: Some("licence".to_string()),
        ..ExpiryReportFilter::default()
    };
    match service.expiring_documents(&admin(), &unknown) {
        Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "type"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn open_ended_report_near_the_calendar_end_is_rejected() {
    let (service, _) = build_service();
    let filter = ExpiryReportFilter {
        from: Some(chrono::NaiveDate::MAX),
        ..ExpiryReportFilter::default()
    };

    match service.expiring_documents(&admin(), &filter) {
        Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "from"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let bounded = ExpiryReportFilter {
        from: Some(chrono::NaiveDate::MAX),
        to: Some(chrono::NaiveDate::MAX),
        kind: None,
    };
    let rows = service
        .expiring_documents(&admin(), &bounded)
        .expect("closed window is valid");
    assert!(rows.is_empty());
}

#[test]
fn vehicle_status_reports_latest_expiry_per_kind() {
    let (service, _) = build_service();

    let vehicles = service
        .citizen_vehicles(&citizen_account(), CitizenId(10))
        .expect("own vehicles visible");

    assert_eq!(vehicles.len(), 1);
    let view = &vehicles[0];
    assert_eq!(
        view.latest_expiry(DocumentKind::Insurance),
        Some(date(2025, 6, 15))
    );
    assert_eq!(view.latest_expiry(DocumentKind::Vltd), None);
    let tax = view
        .documents
        .iter()
        .find(|status| status.kind == DocumentKind::Tax)
        .expect("tax status present");
    assert_eq!(tax.state, ExpiryState::ExpiringSoon);
}

#[test]
fn citizens_only_see_their_own_vehicles() {
    let (service, _) = build_service();

    match service.citizen_vehicles(&citizen_account(), CitizenId(20)) {
        Err(ServiceError::Authorization) => {}
        other => panic!("expected authorization error, got {other:?}"),
    }
    match service.citizen_vehicles(&kurud_manager(), CitizenId(10)) {
        Err(ServiceError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn expiry_notice_requires_a_mobile() {
    let (service, notices) = build_service();

    let blank = ExpiryNoticeRequest {
        kind: "Fitness".to_string(),
        owner_mobile: "  ".to_string(),
        identifier: Some("CG05CD5678".to_string()),
        expiry_date: Some(date(2025, 2, 20)),
    };
    match service.send_expiry_notice(&admin(), blank.clone()) {
        Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "owner_mobile"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let notice = service
        .send_expiry_notice(
            &admin(),
            ExpiryNoticeRequest {
                owner_mobile: "9826000020".to_string(),
                ..blank
            },
        )
        .expect("notice sent");
    assert_eq!(notice.template, NoticeTemplate::DocumentExpiry);
    assert_eq!(notice.recipient, "919826000020");
    assert_eq!(
        notices.events()[0].details.get("expiry_date").map(String::as_str),
        Some("2025-02-20")
    );
}

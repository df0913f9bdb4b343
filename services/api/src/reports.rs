use crate::infra::{load_store, parse_date, InMemoryNoticePublisher};
use chrono::NaiveDate;
use clap::Args;
use rto_compliance::compliance::{
    Clock, ComplianceService, EligibleLearner, ExpiringDocumentRow, ExpiryReportFilter,
    FixedClock, Principal, Role, SystemClock, UserId,
};
use rto_compliance::config::AppConfig;
use rto_compliance::error::AppError;
use rto_compliance::store::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ExpiryReportArgs {
    /// First expiry date to include (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) from: Option<NaiveDate>,
    /// Last expiry date to include (defaults to the expiring-soon window)
    #[arg(long, value_parser = parse_date)]
    pub(crate) to: Option<NaiveDate>,
    /// Restrict to one document type (insurance, pucc, fitness, permit, tax, vltd, speed governor)
    #[arg(long = "type")]
    pub(crate) kind: Option<String>,
    /// Evaluation date for the report (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Snapshot directory (defaults to RTO_SNAPSHOT_DIR)
    #[arg(long)]
    pub(crate) snapshot_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DlEligibleArgs {
    /// Evaluation date for the report (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Snapshot directory (defaults to RTO_SNAPSHOT_DIR)
    #[arg(long)]
    pub(crate) snapshot_dir: Option<PathBuf>,
}

type ReportService = ComplianceService<MemoryStore, InMemoryNoticePublisher>;

/// Reports run with head-office visibility.
fn report_principal() -> Principal {
    Principal {
        id: UserId(0),
        role: Role::Admin,
        branch: None,
    }
}

fn report_service(
    snapshot_dir: Option<PathBuf>,
    today: Option<NaiveDate>,
) -> Result<ReportService, AppError> {
    let config = AppConfig::load()?;
    let dir = snapshot_dir.or(config.snapshot_dir);
    let store = load_store(dir.as_deref())?;
    let clock: Arc<dyn Clock> = match today {
        Some(date) => Arc::new(FixedClock(date)),
        None => Arc::new(SystemClock),
    };

    Ok(ComplianceService::new(
        Arc::new(store),
        Arc::new(InMemoryNoticePublisher::default()),
        clock,
        config.engine,
    ))
}

pub(crate) fn run_expiry_report(args: ExpiryReportArgs) -> Result<(), AppError> {
    let ExpiryReportArgs {
        from,
        to,
        kind,
        today,
        snapshot_dir,
    } = args;

    let service = report_service(snapshot_dir, today)?;
    let filter = ExpiryReportFilter { from, to, kind };
    let rows = service.expiring_documents(&report_principal(), &filter)?;

    println!("Document expiries as of {}", service.today());
    print!("{}", render_expiry_rows(&rows));
    Ok(())
}

pub(crate) fn run_dl_eligible_report(args: DlEligibleArgs) -> Result<(), AppError> {
    let DlEligibleArgs {
        today,
        snapshot_dir,
    } = args;

    let service = report_service(snapshot_dir, today)?;
    let learners = service.list_dl_eligible(&report_principal())?;

    println!("Learners eligible for a driving license as of {}", service.today());
    print!("{}", render_eligible(&learners));
    Ok(())
}

fn render_expiry_rows(rows: &[ExpiringDocumentRow]) -> String {
    if rows.is_empty() {
        return "  (no documents expire in this window)\n".to_string();
    }

    rows.iter()
        .map(|row| {
            format!(
                "  {} {:<15} {:<12} {} ({})\n",
                row.expiry_date, row.kind, row.registration_no, row.owner_name, row.owner_mobile
            )
        })
        .collect()
}

fn render_eligible(learners: &[EligibleLearner]) -> String {
    if learners.is_empty() {
        return "  (nobody has crossed the holding period)\n".to_string();
    }

    learners
        .iter()
        .map(|learner| {
            let number = learner
                .ll_no
                .as_deref()
                .or(learner.application_no.as_deref())
                .unwrap_or("N/A");
            format!(
                "  [{}] {} {} since {} ({})\n",
                learner.source.label(),
                learner.holder.as_deref().unwrap_or("Unknown"),
                number,
                learner.reference_date,
                learner.mobile.as_deref().unwrap_or("no mobile"),
            )
        })
        .collect()
}

//! Plain-text presentation of the dashboard.
//!
//! The layout follows the web page the contract was first used from: title, connection line,
//! owner badge, the three forms, the record list, then notices.

use crate::dashboard::{
    Action, ActionState, ConnectionState, Dashboard, FormField, Notice, NoticeLevel,
};
use crate::record::Record;
use chrono::{Local, TimeZone};
use std::fmt::Write;

pub const TITLE: &str = "HealthCare Application";

/// Renders the dashboard with timestamps in the local time zone.
pub fn render(dashboard: &Dashboard) -> String {
    render_in(dashboard, &Local)
}

/// Renders the dashboard with timestamps in `tz`.
pub fn render_in<Tz>(dashboard: &Dashboard, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    let _ = writeln!(out, "{TITLE}");
    let _ = writeln!(out, "{}", "=".repeat(TITLE.len()));

    match dashboard.connection() {
        ConnectionState::Pending => {
            let _ = writeln!(out, "Connecting to wallet...");
        }
        ConnectionState::Connected(session) => {
            let _ = writeln!(out, "Connected Account: {}", session.account());
            if session.is_owner() {
                let _ = writeln!(out, "You are the contract owner");
            }
        }
        ConnectionState::Failed(reason) => {
            let _ = writeln!(out, "Connected Account: (none)");
            let _ = writeln!(out, "Wallet connection failed: {reason}");
        }
    }

    let form = dashboard.form();
    let field = |out: &mut String, f: FormField| {
        let _ = writeln!(out, "  {:<17} {}", format!("{}:", f.label()), form.get(f));
    };

    section(&mut out, "Fetch Patient Records", dashboard.action_state(Action::Fetch));
    field(&mut out, FormField::PatientId);

    section(&mut out, "Add Patient Record", dashboard.action_state(Action::Add));
    for f in [
        FormField::PatientId,
        FormField::PatientName,
        FormField::Diagnosis,
        FormField::Treatment,
    ] {
        field(&mut out, f);
    }

    section(
        &mut out,
        "Authorize HealthCare Provider",
        dashboard.action_state(Action::Authorize),
    );
    field(&mut out, FormField::ProviderAddress);

    let _ = writeln!(out);
    let _ = writeln!(out, "Patient Records");
    out.push_str(&render_records(dashboard.records(), tz));

    let notices: Vec<&Notice> = dashboard.notices().collect();
    if !notices.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Notices");
        for notice in notices {
            let _ = writeln!(out, "  {}", render_notice(notice));
        }
    }

    out
}

fn section(out: &mut String, heading: &str, state: ActionState) {
    let _ = writeln!(out);
    match state {
        ActionState::Pending => {
            let _ = writeln!(out, "{heading} (working...)");
        }
        _ => {
            let _ = writeln!(out, "{heading}");
        }
    }
}

/// One block per record, in the order given. Empty input renders nothing.
pub fn render_records<Tz>(records: &[Record], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    for record in records {
        let _ = writeln!(out, "  Record ID: {}", record.record_id);
        let _ = writeln!(out, "  Patient Name: {}", record.patient_name);
        let _ = writeln!(out, "  Diagnosis: {}", record.diagnosis);
        let _ = writeln!(out, "  Treatment: {}", record.treatment);
        let _ = writeln!(out, "  Timestamp: {}", format_timestamp(record, tz));
        let _ = writeln!(out);
    }
    out
}

/// The record timestamp as a date-time in `tz`, or the raw seconds if out of range.
pub fn format_timestamp<Tz>(record: &Record, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match record.recorded_at() {
        Some(at) => at
            .with_timezone(tz)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string(),
        None => record.timestamp.to_string(),
    }
}

fn render_notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Error => "error",
    };
    format!("[{tag}] {}", notice.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::eth::ReceiptPolicy;
    use crate::testing::MockChain;
    use crate::wallet::WalletConnector;
    use chrono::Utc;
    use healthchain_types::{Address, U256};
    use std::sync::Arc;

    fn account(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn cfg() -> Arc<CoreConfig> {
        Arc::new(CoreConfig::new(None, MockChain::CONTRACT, ReceiptPolicy::default()).unwrap())
    }

    #[test]
    fn test_timestamp_is_rendered_in_given_zone() {
        let record = Record {
            record_id: U256::from(1u64),
            patient_name: "Alice".into(),
            diagnosis: "Flu".into(),
            treatment: "Rest".into(),
            timestamp: 1_700_000_000,
        };
        assert_eq!(format_timestamp(&record, &Utc), "2023-11-14 22:13:20 +00:00");

        let text = render_records(&[record], &Utc);
        assert!(text.contains("Record ID: 1"));
        assert!(text.contains("Patient Name: Alice"));
        assert!(text.contains("Timestamp: 2023-11-14 22:13:20 +00:00"));
    }

    #[test]
    fn test_out_of_range_timestamp_falls_back_to_seconds() {
        let record = Record {
            record_id: U256::from(1u64),
            patient_name: "Alice".into(),
            diagnosis: "Flu".into(),
            treatment: "Rest".into(),
            timestamp: u64::MAX,
        };
        assert_eq!(format_timestamp(&record, &Utc), u64::MAX.to_string());
    }

    #[tokio::test]
    async fn test_owner_view() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(1)]));
        let dashboard = Dashboard::initialise(cfg(), chain.connector()).await;

        let text = render_in(&dashboard, &Utc);
        assert!(text.starts_with(TITLE));
        assert!(text.contains(&format!("Connected Account: {}", account(1))));
        assert!(text.contains("You are the contract owner"));
        assert!(text.contains("Authorize HealthCare Provider"));
    }

    #[tokio::test]
    async fn test_empty_fetch_renders_no_record_rows() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(2)]));
        let mut dashboard = Dashboard::initialise(cfg(), chain.connector()).await;
        dashboard.set_field(FormField::PatientId, "42");
        dashboard.fetch_patient_records().await.unwrap();

        let text = render_in(&dashboard, &Utc);
        assert!(text.contains("Patient Records"));
        assert!(!text.contains("Record ID:"));
        assert!(!text.contains("You are the contract owner"));
    }

    #[tokio::test]
    async fn test_failed_connection_keeps_forms_visible() {
        let dashboard = Dashboard::initialise(cfg(), WalletConnector::new(None)).await;

        let text = render_in(&dashboard, &Utc);
        assert!(text.contains("Connected Account: (none)"));
        assert!(text.contains("Fetch Patient Records"));
        assert!(text.contains("Add Patient Record"));
        assert!(text.contains("Authorize HealthCare Provider"));
        assert!(text.contains("[error] Error connecting to wallet"));
    }
}

//! Error reports and the maintenance flag

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Answer of the reporting endpoint
#[derive(Debug, Deserialize)]
struct ReportResponse {
    #[serde(default)]
    message: String,
    #[serde(rename = "ReportID", default)]
    report_id: Option<serde_json::Value>,
}

/// What happened to an uploaded report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Accepted; carries the id the player quotes when asking for help
    Submitted(String),
    /// The server answered without `Success`
    Rejected,
    /// The upload itself failed
    Failed(String),
}

/// Upload the launcher log as form field `ReportData`
pub async fn upload_report(client: &reqwest::Client, url: &str, log: &str) -> ReportOutcome {
    let response = match client
        .post(url)
        .form(&[("ReportData", log)])
        .send()
        .await
        .and_then(|r| r.error_for_status())
    {
        Ok(response) => response,
        Err(e) => return ReportOutcome::Failed(e.to_string()),
    };

    match response.json::<ReportResponse>().await {
        Ok(body) => parse_outcome(body),
        Err(e) => ReportOutcome::Failed(e.to_string()),
    }
}

fn parse_outcome(body: ReportResponse) -> ReportOutcome {
    if body.message != "Success" {
        return ReportOutcome::Rejected;
    }
    match body.report_id {
        Some(serde_json::Value::String(id)) => ReportOutcome::Submitted(id),
        Some(serde_json::Value::Number(id)) => ReportOutcome::Submitted(id.to_string()),
        _ => ReportOutcome::Rejected,
    }
}

/// Read `latest.log` and upload it
pub async fn report_log(client: &reqwest::Client, url: &str, log_path: &Path) -> ReportOutcome {
    match tokio::fs::read(log_path).await {
        Ok(bytes) => upload_report(client, url, &String::from_utf8_lossy(&bytes)).await,
        Err(e) => {
            tracing::warn!("Could not read {:?} for the error report: {}", log_path, e);
            ReportOutcome::Failed(e.to_string())
        }
    }
}

/// Text appended to a failure message once the report went through (or not)
pub fn report_failure_text(lead: &str, outcome: &ReportOutcome) -> String {
    match outcome {
        ReportOutcome::Submitted(id) => format!(
            "{}\nIf you require further assistance please write this code down and ask on our discord:\n{}",
            lead, id
        ),
        ReportOutcome::Rejected => {
            format!("{} \nWe were not able to make an error report automatically.", lead)
        }
        ReportOutcome::Failed(err) => format!(
            "{}\nWe were not able to make an error report automatically. {}",
            lead, err
        ),
    }
}

/// Whether the data server announces maintenance
pub async fn in_maintenance(client: &reqwest::Client, url: &str) -> Result<bool> {
    let body = client
        .get(url)
        .send()
        .await
        .context("Failed to query maintenance status")?
        .text()
        .await?;
    Ok(maintenance_flag(&body))
}

fn maintenance_flag(body: &str) -> bool {
    body.contains("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(json: &str) -> ReportOutcome {
        parse_outcome(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_parse_outcome() {
        assert_eq!(
            outcome(r#"{"message": "Success", "ReportID": "A1B2"}"#),
            ReportOutcome::Submitted("A1B2".to_string())
        );
        assert_eq!(
            outcome(r#"{"message": "Success", "ReportID": 42}"#),
            ReportOutcome::Submitted("42".to_string())
        );
        assert_eq!(outcome(r#"{"message": "Error"}"#), ReportOutcome::Rejected);
        assert_eq!(outcome(r#"{}"#), ReportOutcome::Rejected);
    }

    #[test]
    fn test_failure_text() {
        let text = report_failure_text("", &ReportOutcome::Submitted("XYZ".to_string()));
        assert!(text.ends_with("ask on our discord:\nXYZ"));

        let text = report_failure_text("", &ReportOutcome::Rejected);
        assert_eq!(text, " \nWe were not able to make an error report automatically.");
    }

    #[test]
    fn test_maintenance_flag() {
        assert!(maintenance_flag("{\"maintenance\": true}"));
        assert!(!maintenance_flag("false"));
    }

    #[tokio::test]
    async fn test_report_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();
        let outcome = report_log(
            &client,
            "http://127.0.0.1:9/report",
            &dir.path().join("latest.log"),
        )
        .await;
        assert!(matches!(outcome, ReportOutcome::Failed(_)));
    }
}

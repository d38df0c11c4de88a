use crate::{ResourceId, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The outcome of a single rule against a single target.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    pub rule_code: String,
    pub status: Status,
    pub message: String,

    /// Stamped by the scanner when the result is collected; rules leave it
    /// at the default.
    #[serde(default)]
    pub checked_at: DateTime<Utc>,
}

/// The outcome of every applicable rule against one target at one point in
/// time.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Assigned by the store when the result is recorded.
    #[serde(default)]
    pub id: u64,
    pub resource_api_version: String,
    pub resource_kind: String,
    pub resource_namespace: String,
    pub resource_name: String,
    pub owning_team: String,
    pub checked_at: DateTime<Utc>,

    /// Unset while this is the current result for its resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    pub overall_status: Status,
    #[serde(default)]
    pub results: Vec<RuleResult>,
}

// === impl RuleResult ===

impl RuleResult {
    pub fn new(rule_code: impl ToString, status: Status, message: impl ToString) -> Self {
        Self {
            rule_code: rule_code.to_string(),
            status,
            message: message.to_string(),
            checked_at: DateTime::<Utc>::default(),
        }
    }

    pub fn compliant(rule_code: impl ToString, message: impl ToString) -> Self {
        Self::new(rule_code, Status::Compliant, message)
    }

    pub fn warning(rule_code: impl ToString, message: impl ToString) -> Self {
        Self::new(rule_code, Status::Warning, message)
    }

    pub fn failure(rule_code: impl ToString, message: impl ToString) -> Self {
        Self::new(rule_code, Status::Failure, message)
    }
}

// === impl ScanResult ===

impl ScanResult {
    /// Starts an empty, compliant result for the given resource.
    pub fn new(id: &ResourceId, owning_team: impl ToString, checked_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            resource_api_version: id.api_version.clone(),
            resource_kind: id.kind.clone(),
            resource_namespace: id.namespace.clone(),
            resource_name: id.name.clone(),
            owning_team: owning_team.to_string(),
            checked_at,
            archived_at: None,
            overall_status: Status::Compliant,
            results: Vec::new(),
        }
    }

    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(
            &self.resource_api_version,
            &self.resource_kind,
            &self.resource_namespace,
            &self.resource_name,
        )
    }

    pub fn is_current(&self) -> bool {
        self.archived_at.is_none()
    }

    /// Appends a rule result, raising the overall status if the result is
    /// worse than everything collected so far.
    pub fn push(&mut self, result: RuleResult) {
        self.overall_status = self.overall_status.max(result.status);
        self.results.push(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> ResourceId {
        ResourceId::new("config.platform.io/v1", "Plan", "platform-admin", "gke-dev")
    }

    #[test]
    fn push_tracks_worst_status() {
        let mut scan = ScanResult::new(&resource(), "admins", Utc::now());
        assert_eq!(scan.overall_status, Status::Compliant);

        scan.push(RuleResult::warning("A-01", "meh"));
        assert_eq!(scan.overall_status, Status::Warning);

        scan.push(RuleResult::compliant("A-02", "fine"));
        assert_eq!(scan.overall_status, Status::Warning);

        scan.push(RuleResult::failure("A-03", "bad"));
        scan.push(RuleResult::warning("A-04", "meh"));
        assert_eq!(scan.overall_status, Status::Failure);

        let codes = scan
            .results
            .iter()
            .map(|r| r.rule_code.as_str())
            .collect::<Vec<_>>();
        assert_eq!(codes, ["A-01", "A-02", "A-03", "A-04"]);
    }

    #[test]
    fn wire_field_names() {
        let mut scan = ScanResult::new(
            &resource(),
            "admins",
            "2024-05-01T10:00:00Z".parse().unwrap(),
        );
        scan.id = 7;
        scan.push(RuleResult {
            checked_at: "2024-05-01T10:00:00Z".parse().unwrap(),
            ..RuleResult::warning("AUTH-01", "No Auth Proxy IP ranges specified by plan")
        });

        let json = serde_json::to_value(&scan).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "resourceApiVersion": "config.platform.io/v1",
                "resourceKind": "Plan",
                "resourceNamespace": "platform-admin",
                "resourceName": "gke-dev",
                "owningTeam": "admins",
                "checkedAt": "2024-05-01T10:00:00Z",
                "overallStatus": "Warning",
                "results": [{
                    "ruleCode": "AUTH-01",
                    "status": "Warning",
                    "message": "No Auth Proxy IP ranges specified by plan",
                    "checkedAt": "2024-05-01T10:00:00Z",
                }],
            })
        );

        let parsed = serde_json::from_value::<ScanResult>(json).unwrap();
        assert_eq!(parsed, scan);
        assert!(parsed.is_current());
    }
}

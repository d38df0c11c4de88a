use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};
use security_controller_core::{ScanResult, Status, TargetKind};

use crate::Outcome;

#[derive(Clone, Debug, Default)]
pub struct ControllerMetrics {
    reconciles: Family<ReconcileLabels, Counter>,
}

#[derive(Clone, Debug, Default)]
pub struct ScanMetrics {
    scans: Family<ScanLabels, Counter>,
    rule_results: Family<ScanLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ReconcileLabels {
    controller: String,
    outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ScanLabels {
    kind: String,
    status: String,
}

// === impl ControllerMetrics ===

impl ControllerMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let reconciles = Family::default();
        prom.register(
            "reconciles",
            "Count of reconciles by controller and outcome",
            reconciles.clone(),
        );
        Self { reconciles }
    }

    pub(crate) fn reconciled(&self, controller: &str, outcome: Option<Outcome>) {
        let outcome = outcome.map_or("error", |o| o.as_str());
        self.reconciles
            .get_or_create(&ReconcileLabels {
                controller: controller.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
    }

    #[cfg(test)]
    pub(crate) fn reconciles(&self, controller: &str, outcome: &str) -> u64 {
        self.reconciles
            .get_or_create(&ReconcileLabels {
                controller: controller.to_string(),
                outcome: outcome.to_string(),
            })
            .get()
    }
}

// === impl ScanMetrics ===

impl ScanMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let scans = Family::default();
        prom.register(
            "scans",
            "Count of recorded scans by resource kind and overall status",
            scans.clone(),
        );

        let rule_results = Family::default();
        prom.register(
            "rule_results",
            "Count of rule results by resource kind and status",
            rule_results.clone(),
        );

        Self {
            scans,
            rule_results,
        }
    }

    pub(crate) fn recorded(&self, kind: TargetKind, scan: &ScanResult) {
        let labels = |status: Status| ScanLabels {
            kind: kind.to_string(),
            status: status.to_string(),
        };
        self.scans.get_or_create(&labels(scan.overall_status)).inc();
        for result in &scan.results {
            self.rule_results.get_or_create(&labels(result.status)).inc();
        }
    }

    #[cfg(test)]
    pub(crate) fn scans(&self, kind: TargetKind, status: Status) -> u64 {
        self.scans
            .get_or_create(&ScanLabels {
                kind: kind.to_string(),
                status: status.to_string(),
            })
            .get()
    }
}

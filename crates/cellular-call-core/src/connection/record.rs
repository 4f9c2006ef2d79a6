use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CallReportInfo, TelCallState};

/// One tracked call leg.
///
/// Records are only created, updated and removed by reconciliation against
/// transport call lists, or dropped wholesale on release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    report: CallReportInfo,
    seen_in_last_report: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConnectionRecord {
    pub fn new(report: CallReportInfo) -> Self {
        let now = Utc::now();
        Self {
            report,
            seen_in_last_report: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn index(&self) -> i32 {
        self.report.index
    }

    pub fn phone_number(&self) -> &str {
        &self.report.account_number
    }

    pub fn state(&self) -> TelCallState {
        self.report.state
    }

    pub fn report(&self) -> &CallReportInfo {
        &self.report
    }

    /// Replace the snapshot, returning whether the state changed
    pub fn update_report(&mut self, report: CallReportInfo) -> bool {
        let changed = self.report.state != report.state;
        if self.report != report {
            self.updated_at = Utc::now();
        }
        self.report = report;
        changed
    }

    pub fn is_ringing(&self) -> bool {
        self.report.state.is_ringing()
    }

    pub fn seen_in_last_report(&self) -> bool {
        self.seen_in_last_report
    }

    pub fn set_seen_in_last_report(&mut self, seen: bool) {
        self.seen_in_last_report = seen;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

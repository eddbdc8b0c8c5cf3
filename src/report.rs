use log::{error, info, warn};
use naist_schedule::{CellError, Schedule};

use crate::sink::SyncReport;

/// What a run did, for the final log lines and the exit code.
#[derive(Debug)]
pub struct Summary {
    pub parsed: usize,
    pub rejected: Vec<CellError>,
    pub sync: Option<SyncReport>,
}

impl Summary {
    #[must_use]
    pub fn new(schedule: &Schedule, sync: Option<SyncReport>) -> Self {
        Self {
            parsed: schedule.events.len(),
            rejected: schedule.rejected.clone(),
            sync,
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.rejected.is_empty()
            && self
                .sync
                .as_ref()
                .map_or(true, |sync| sync.failures.is_empty() && sync.aborted.is_none())
    }

    pub fn log(&self) {
        info!(
            "Parsed {} events, rejected {} cells",
            self.parsed,
            self.rejected.len()
        );

        for cell in &self.rejected {
            warn!("Rejected {cell}");
        }

        if let Some(sync) = &self.sync {
            info!(
                "Inserted {} events, {} failed",
                sync.inserted,
                sync.failures.len()
            );

            for (label, err) in &sync.failures {
                error!("Not inserted: {label}: {err}");
            }

            if let Some(err) = &sync.aborted {
                error!("Sync stopped early, remaining events were not sent: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use naist_schedule::ParseError;

    use super::*;
    use crate::sink::{AuthError, SinkError};

    fn schedule(rejected: Vec<CellError>) -> Schedule {
        Schedule {
            year: 2024,
            month: 4,
            events: Vec::new(),
            rejected,
        }
    }

    #[test]
    fn clean_run_succeeds() {
        let summary = Summary::new(&schedule(Vec::new()), Some(SyncReport::default()));

        assert!(summary.succeeded());
    }

    #[test]
    fn rejected_cells_fail_the_run() {
        let rejected = vec![CellError {
            id: "3-1-1".into(),
            error: ParseError::TooFewFragments(1),
        }];

        assert!(!Summary::new(&schedule(rejected), None).succeeded());
    }

    #[test]
    fn failed_inserts_fail_the_run() {
        let sync = SyncReport {
            inserted: 2,
            failures: vec![("1-0-1 A".into(), SinkError::Rejected("400".into()))],
            aborted: None,
        };

        assert!(!Summary::new(&schedule(Vec::new()), Some(sync)).succeeded());
    }

    #[test]
    fn unreadable_cell_ids_fail_the_run() {
        let rejected = vec![CellError {
            id: "99999999999-0-1".into(),
            error: ParseError::InvalidCellId("99999999999-0-1".into()),
        }];

        assert!(!Summary::new(&schedule(rejected), None).succeeded());
    }

    #[test]
    fn aborted_sync_fails_the_run() {
        let sync = SyncReport {
            inserted: 4,
            failures: Vec::new(),
            aborted: Some(AuthError::Unauthorized("403".into())),
        };

        let summary = Summary::new(&schedule(Vec::new()), Some(sync));

        assert!(!summary.succeeded());
        assert_eq!(summary.sync.as_ref().map(|sync| sync.inserted), Some(4));
    }
}

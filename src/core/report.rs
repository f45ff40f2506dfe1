use serde::Serialize;
use std::io::Write;

use crate::compile::CompileOutcome;

/// Printed once when any unit failed to compile.
pub const FAILURE_MESSAGE: &str = "Plugin(s) failed to compile";

/// Per-unit compile outcomes, in build order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub units: Vec<CompileOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: CompileOutcome) {
        self.units.push(outcome);
    }

    /// Logical AND over every unit. An empty report succeeds.
    pub fn success(&self) -> bool {
        self.units.iter().all(|u| u.success)
    }

    pub fn failed_units(&self) -> Vec<&str> {
        self.units
            .iter()
            .filter(|u| !u.success)
            .map(|u| u.unit.as_str())
            .collect()
    }

    pub fn summary(&self) -> ReportSummary {
        let succeeded = self.units.iter().filter(|u| u.success).count();
        ReportSummary {
            total: self.units.len(),
            succeeded,
            failed: self.units.len() - succeeded,
        }
    }

    /// Write every compile log in unit order, whatever the outcome.
    pub fn write_logs<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for unit in &self.units {
            out.write_all(unit.log.as_bytes())?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(unit: &str, success: bool, log: &str) -> CompileOutcome {
        CompileOutcome {
            unit: unit.to_string(),
            artifact: format!("{}.amxx", unit),
            success,
            exit_code: Some(0),
            log: log.to_string(),
        }
    }

    #[test]
    fn empty_report_succeeds() {
        let report = BuildReport::new();
        assert!(report.success());
        assert_eq!(report.summary().total, 0);
    }

    #[test]
    fn one_failure_fails_the_build() {
        let mut report = BuildReport::new();
        report.record(outcome("a", true, ""));
        report.record(outcome("b", false, ""));
        report.record(outcome("c", true, ""));

        assert!(!report.success());
        assert_eq!(report.failed_units(), vec!["b"]);
        assert_eq!(
            report.summary(),
            ReportSummary {
                total: 3,
                succeeded: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn logs_are_written_in_unit_order() {
        let mut report = BuildReport::new();
        report.record(outcome("a", true, "log a\n"));
        report.record(outcome("b", false, "log b\n"));

        let mut buf = Vec::new();
        report.write_logs(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "log a\nlog b\n");
    }
}

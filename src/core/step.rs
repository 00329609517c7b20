use crate::domain::model::{StepOutcome, StepReport};
use crate::utils::error::Result;

/// Turn a step result into its report, logging failures. The value is handed back on success.
pub fn contain<T>(step: &str, result: Result<T>, reports: &mut Vec<StepReport>) -> Option<T> {
    match result {
        Ok(value) => {
            tracing::debug!("Step '{}' succeeded", step);
            reports.push(StepReport {
                step: step.to_string(),
                outcome: StepOutcome::Succeeded,
            });
            Some(value)
        }
        Err(e) => {
            tracing::error!("Error in step '{}': {}", step, e);
            reports.push(StepReport {
                step: step.to_string(),
                outcome: StepOutcome::Failed {
                    reason: e.to_string(),
                },
            });
            None
        }
    }
}

/// Counts of (succeeded, failed) steps.
pub fn tally(reports: &[StepReport]) -> (usize, usize) {
    let ok = reports.iter().filter(|r| r.is_success()).count();
    (ok, reports.len() - ok)
}

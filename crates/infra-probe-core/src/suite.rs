// crates/infra-probe-core/src/suite.rs
// ============================================================================
// Module: Suite Runner
// Description: Bounded parallel execution of independent test cases.
// Purpose: Run many cases concurrently while each stays strictly sequential.
// Dependencies: tokio, crate::harness
// ============================================================================

//! ## Overview
//! Every case runs its whole lifecycle on tokio's blocking pool, since each
//! tool step is a blocking process wait. A semaphore bounds how many cases are
//! in flight. Cases on the same module directory are serialised by the
//! harness, so they never share live state. Results are returned in input
//! order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::case::TestCase;
use crate::harness::CaseFailure;
use crate::harness::CaseReport;
use crate::harness::Harness;
use crate::tool::ProvisioningTool;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of one case within a suite.
pub type CaseResult = Result<CaseReport, CaseFailure>;

/// Default number of cases in flight.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs `cases` with at most `max_parallel` in flight.
///
/// A `max_parallel` of zero is treated as one. A case whose task panics or is
/// cancelled is reported as [`crate::harness::CaseError::Aborted`].
pub async fn run_suite<T>(
    harness: Arc<Harness<T>>,
    cases: Vec<TestCase>,
    max_parallel: usize,
) -> Vec<CaseResult>
where
    T: ProvisioningTool + 'static,
{
    let cases: Arc<[TestCase]> = cases.into();
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut tasks = JoinSet::new();

    for index in 0 .. cases.len() {
        let harness = Arc::clone(&harness);
        let cases = Arc::clone(&cases);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let result = tokio::task::spawn_blocking(move || {
                cases.get(index).map(|case| harness.run_case(case))
            })
            .await;
            (index, result)
        });
    }

    let mut slots: Vec<Option<CaseResult>> = (0 .. cases.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let Ok((index, result)) = joined else {
            continue;
        };
        let outcome = match result {
            Ok(Some(outcome)) => Some(outcome),
            Ok(None) => None,
            Err(err) => cases.get(index).map(|case| Err(CaseFailure::aborted(case, err.to_string()))),
        };
        if let Some(slot) = slots.get_mut(index) {
            *slot = outcome;
        }
    }

    slots
        .into_iter()
        .zip(cases.iter())
        .map(|(slot, case)| {
            slot.unwrap_or_else(|| Err(CaseFailure::aborted(case, "case task did not complete")))
        })
        .collect()
}

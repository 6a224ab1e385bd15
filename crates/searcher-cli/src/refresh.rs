use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::model::TrackedQuery;
use crate::notifier::{Notifier, product_message};
use crate::runner::QueryRunner;

/// Longest single sleep while waiting between daemon passes.
pub const WAIT_SLICE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOptions {
    pub daemon: bool,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub passes: usize,
    pub new_products: usize,
    pub failed_refreshes: usize,
    pub cancelled: bool,
}

/// Refresh every query once, or repeatedly in daemon mode until `cancel` is set.
///
/// Cancellation is only observed before a pass and between sleep slices, so a
/// pass that has started always completes.
pub fn run_refresh<R, N, S>(
    queries: &mut [TrackedQuery],
    runner: &R,
    notifier: Option<&N>,
    options: RefreshOptions,
    cancel: &AtomicBool,
    mut sleep: S,
) -> RefreshOutcome
where
    R: QueryRunner + ?Sized,
    N: Notifier + ?Sized,
    S: FnMut(Duration),
{
    let mut outcome = RefreshOutcome::default();

    loop {
        if cancel.load(Ordering::SeqCst) {
            outcome.cancelled = true;
            break;
        }

        refresh_pass(queries, runner, notifier, &mut outcome);

        if !options.daemon {
            break;
        }

        if !wait_for(options.delay, cancel, &mut sleep) {
            outcome.cancelled = true;
            break;
        }
    }

    outcome
}

fn refresh_pass<R, N>(
    queries: &mut [TrackedQuery],
    runner: &R,
    notifier: Option<&N>,
    outcome: &mut RefreshOutcome,
) where
    R: QueryRunner + ?Sized,
    N: Notifier + ?Sized,
{
    outcome.passes += 1;
    let mut found = 0;

    for query in queries.iter_mut() {
        let fresh = match runner.refresh(query) {
            Ok(fresh) => fresh,
            Err(error) => {
                tracing::warn!(query = %query.name, %error, "query refresh failed");
                outcome.failed_refreshes += 1;
                continue;
            }
        };

        found += fresh.len();
        if let Some(notifier) = notifier {
            for product in &fresh {
                notifier.notify(&product_message(&query.name, product));
            }
        }
    }

    outcome.new_products += found;
    tracing::info!(
        pass = outcome.passes,
        queries = queries.len(),
        new_products = found,
        "refresh pass finished"
    );
}

/// Sleep for `delay` in slices of at most [`WAIT_SLICE`]. Returns `false` when
/// cancelled before the full delay elapsed.
pub fn wait_for<S>(delay: Duration, cancel: &AtomicBool, sleep: &mut S) -> bool
where
    S: FnMut(Duration),
{
    let mut remaining = delay;
    while !remaining.is_zero() {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        let step = remaining.min(WAIT_SLICE);
        sleep(step);
        remaining -= step;
    }

    !cancel.load(Ordering::SeqCst)
}

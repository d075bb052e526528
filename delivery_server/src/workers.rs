use std::{future::Future, time::Duration};

use chrono::{Duration as ChronoDuration, Utc};
use delivery_engine::{db_types::Order, events::EventProducers, AccrualJobsApi, AccrualOptions, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// How long an interest run may overrun its own deadline before it is abandoned. The deadline itself is only checked
/// between orders.
const ACCRUAL_GRACE: Duration = Duration::from_secs(60);

/// Starts the interest accrual worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The first run happens immediately. A run that fails is logged and retried at the next tick.
pub fn start_interest_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    interval: Duration,
    options: AccrualOptions,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = AccrualJobsApi::new(db, producers);
        info!("🕰️ Interest accrual worker started. Runs every {}h", interval.as_secs() / 3600);
        loop {
            timer.tick().await;
            info!("🕰️ Running interest accrual job");
            let limit = options.deadline.saturating_add(ACCRUAL_GRACE);
            let run = api.run_interest_accrual(Utc::now(), &options);
            let Some(outcome) = run_with_limit("Interest accrual", limit, run).await else {
                continue;
            };
            match outcome {
                Ok(result) if result.deadline_reached => {
                    warn!(
                        "🕰️ Interest accrual stopped at its deadline after {} orders. The rest will be charged on the \
                         next run.",
                        result.examined
                    );
                },
                Ok(result) => {
                    debug!("🕰️ Interest accrual charged {} on {} orders", result.total_interest, result.accrued);
                },
                Err(e) => {
                    error!("🕰️ Error running interest accrual job: {e}");
                },
            }
        }
    })
}

/// Starts the overdue detection worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_overdue_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    interval: Duration,
    overdue_after: ChronoDuration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = AccrualJobsApi::new(db, producers);
        info!("🕰️ Overdue order worker started. Orders are overdue after {} days", overdue_after.num_days());
        loop {
            timer.tick().await;
            info!("🕰️ Running overdue order job");
            let now = Utc::now();
            if log_enabled!(Level::Debug) {
                match api.overdue_candidates(now, overdue_after).await {
                    Ok(orders) => debug!("🕰️ Overdue candidates: {}", order_list(&orders)),
                    Err(e) => debug!("🕰️ Could not list overdue candidates. {e}"),
                }
            }
            match run_with_limit("Overdue detection", interval, api.run_overdue_transition(now, overdue_after)).await {
                Some(Ok(count)) => debug!("🕰️ {count} orders flagged as overdue"),
                Some(Err(e)) => error!("🕰️ Error running overdue order job: {e}"),
                None => {},
            }
        }
    })
}

/// Runs `job` to completion, or drops it once `limit` has passed. Returns `None` if the job was abandoned.
async fn run_with_limit<F: Future>(name: &str, limit: Duration, job: F) -> Option<F::Output> {
    match tokio::time::timeout(limit, job).await {
        Ok(output) => Some(output),
        Err(_) => {
            error!(
                "🕰️ {name} job did not finish within {}s and was abandoned. It will run again at the next tick.",
                limit.as_secs()
            );
            None
        },
    }
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] user: {} balance: {}", o.id, o.user_id, o.total))
        .collect::<Vec<String>>()
        .join(", ")
}

//! Scheduled batch jobs over unpaid orders.
//!
//! * [`AccrualJobsApi::run_interest_accrual`] adds late-payment interest to unpaid gas orders.
//! * [`AccrualJobsApi::run_overdue_transition`] flags old orders that have not received any payment as overdue.
//!
//! Both jobs are safe to run any number of times a day.
use std::{fmt::Debug, time::Duration};

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    db::traits::{AccrualCandidate, DeliveryDatabase, RepositoryError},
    db_types::{BalanceUpdate, Cents, NewTransaction, Order},
    dlv_api::errors::OrderFlowError,
    events::{EventProducers, InterestAccruedEvent},
};

/// Orders younger than this many days accrue no interest.
pub const GRACE_PERIOD_DAYS: i64 = 15;
/// Orders up to this age accrue only the flat fee.
pub const FLAT_FEE_PERIOD_DAYS: i64 = 30;
/// Flat fee in currency units, charged once the grace period ends.
pub const FLAT_FEE_UNITS: i64 = 10;
/// Charged per day once the flat fee period ends.
pub const DAILY_FEE_UNITS: i64 = 1;

/// The total interest an order of the given age should have accrued.
///
/// | age (days) | interest              |
/// |------------|-----------------------|
/// | 0 - 15     | 0                     |
/// | 16 - 30    | 10                    |
/// | 31+        | 10 + 1 per day past 30|
pub fn interest_for_age(days: i64) -> Cents {
    if days <= GRACE_PERIOD_DAYS {
        Cents::zero()
    } else if days <= FLAT_FEE_PERIOD_DAYS {
        Cents::from_units(FLAT_FEE_UNITS)
    } else {
        Cents::from_units(FLAT_FEE_UNITS + DAILY_FEE_UNITS * (days - FLAT_FEE_PERIOD_DAYS))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualOptions {
    /// Number of orders fetched per page.
    pub page_size: i64,
    /// The job stops picking up new orders once it has been running for this long.
    pub deadline: Duration,
}

impl Default for AccrualOptions {
    fn default() -> Self {
        Self { page_size: 200, deadline: Duration::from_secs(300) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualRunResult {
    pub examined: usize,
    pub accrued: usize,
    pub total_interest: Cents,
    /// Orders that changed while the job was working on them. They are picked up on the next run.
    pub conflicts: usize,
    pub deadline_reached: bool,
}

pub struct AccrualJobsApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for AccrualJobsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccrualJobsApi")
    }
}

impl<B> AccrualJobsApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> AccrualJobsApi<B>
where B: DeliveryDatabase
{
    /// Brings the accrued interest of every eligible order up to date as of `now`.
    ///
    /// An order is eligible if it has a gas item, interest is allowed, and it is neither paid nor cancelled. For each
    /// one, the interest it should have according to [`interest_for_age`] is compared with the interest already
    /// accrued by earlier runs. Only a positive difference is written, as a single `Interest` ledger entry.
    pub async fn run_interest_accrual(
        &self,
        now: DateTime<Utc>,
        options: &AccrualOptions,
    ) -> Result<AccrualRunResult, OrderFlowError> {
        let started = Instant::now();
        let page_size = options.page_size.max(1);
        let mut result = AccrualRunResult::default();
        let mut last_id = 0;
        'pages: loop {
            let page = self.db.fetch_accrual_candidates(last_id, page_size).await?;
            let page_len = page.len();
            trace!("🕰️ Interest accrual: {page_len} candidates after order #{last_id}");
            for candidate in page {
                if started.elapsed() >= options.deadline {
                    warn!("🕰️ Interest accrual ran out of time after {} orders", result.examined);
                    result.deadline_reached = true;
                    break 'pages;
                }
                last_id = candidate.order.id;
                result.examined += 1;
                match self.accrue(candidate, now).await {
                    Ok(Some(amount)) => {
                        result.accrued += 1;
                        result.total_interest += amount;
                    },
                    Ok(None) => {},
                    Err(RepositoryError::StaleOrder(id)) => {
                        debug!("🕰️ Order #{id} changed during interest accrual. Skipping it until the next run.");
                        result.conflicts += 1;
                    },
                    Err(e) => return Err(e.into()),
                }
            }
            if page_len < page_size as usize {
                break;
            }
        }
        info!(
            "🕰️ Interest accrual complete. {} orders examined, {} charged {} in total, {} conflicts",
            result.examined, result.accrued, result.total_interest, result.conflicts
        );
        Ok(result)
    }

    async fn accrue(&self, candidate: AccrualCandidate, now: DateTime<Utc>) -> Result<Option<Cents>, RepositoryError> {
        let AccrualCandidate { order, accrued_interest } = candidate;
        let days = (now - order.created_at).num_days();
        let due = interest_for_age(days) - accrued_interest;
        if !due.is_positive() {
            return Ok(None);
        }
        let Some(transaction) = NewTransaction::interest(order.total, due) else {
            warn!("🕰️ Order #{} balance of {} cannot take {due} more interest. Skipping it.", order.id, order.total);
            return Ok(None);
        };
        let transaction = transaction.with_notes(Some(format!("Interest after {days} days unpaid"))).as_accrual();
        let update = BalanceUpdate {
            order_id: order.id,
            expected_version: order.version,
            transaction,
            new_payment_state: order.payment_state,
        };
        let (order, transaction) = self.db.update_balance(update).await?;
        debug!("🕰️ Order #{} accrued {due} of interest. Balance is now {}", order.id, order.total);
        self.producers.publish_interest_accrued(InterestAccruedEvent::new(order, transaction));
        Ok(Some(due))
    }

    /// The orders that [`run_overdue_transition`](Self::run_overdue_transition) would flag right now.
    pub async fn overdue_candidates(
        &self,
        now: DateTime<Utc>,
        overdue_after: chrono::Duration,
    ) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.fetch_overdue_candidates(now - overdue_after).await?;
        Ok(orders)
    }

    /// Moves every order that is still `Pending` payment and was created more than `overdue_after` before `now` to
    /// `Overdue`. No ledger entries are written.
    ///
    /// Returns the number of orders flagged.
    pub async fn run_overdue_transition(
        &self,
        now: DateTime<Utc>,
        overdue_after: chrono::Duration,
    ) -> Result<u64, OrderFlowError> {
        let count = self.db.mark_overdue_orders(now - overdue_after).await?;
        info!("🕰️ {count} orders are now overdue");
        Ok(count)
    }
}

use std::{env, time::Duration};

use chrono::Duration as ChronoDuration;
use delivery_engine::AccrualOptions;
use dlv_common::helpers::parse_boolean_flag;
use log::*;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/delivery_store.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_JOB_INTERVAL_HOURS: u64 = 24;
const MAX_JOB_INTERVAL_HOURS: u64 = 24 * 365;
const DEFAULT_OVERDUE_AFTER_DAYS: i64 = 30;
const MAX_OVERDUE_AFTER_DAYS: i64 = 3650;
const DEFAULT_JOB_PAGE_SIZE: i64 = 200;
const DEFAULT_JOB_DEADLINE_SECS: u64 = 300;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    /// Apply the embedded migrations before starting the workers.
    pub run_migrations: bool,
    /// Time between interest accrual runs.
    pub interest_job_interval: Duration,
    /// Time between overdue detection runs.
    pub overdue_job_interval: Duration,
    /// Age at which an order that has received no payment is flagged as overdue.
    pub overdue_after: ChronoDuration,
    pub job_page_size: i64,
    /// Once an accrual run has taken this long it stops, and the remaining orders wait for the next run.
    pub job_deadline: Duration,
    pub event_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            run_migrations: true,
            interest_job_interval: hours(DEFAULT_JOB_INTERVAL_HOURS),
            overdue_job_interval: hours(DEFAULT_JOB_INTERVAL_HOURS),
            overdue_after: ChronoDuration::days(DEFAULT_OVERDUE_AFTER_DAYS),
            job_page_size: DEFAULT_JOB_PAGE_SIZE,
            job_deadline: Duration::from_secs(DEFAULT_JOB_DEADLINE_SECS),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Missing or invalid values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let database_url = lookup("DLV_DATABASE_URL").unwrap_or_else(|| {
            warn!("🪛️ DLV_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let db_max_connections =
            parse_or_default(&lookup, "DLV_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS).max(1);
        let run_migrations = parse_boolean_flag(lookup("DLV_RUN_MIGRATIONS"), true);
        let interest_job_interval = hours(
            parse_or_default(&lookup, "DLV_INTEREST_JOB_INTERVAL", DEFAULT_JOB_INTERVAL_HOURS)
                .clamp(1, MAX_JOB_INTERVAL_HOURS),
        );
        let overdue_job_interval = hours(
            parse_or_default(&lookup, "DLV_OVERDUE_JOB_INTERVAL", DEFAULT_JOB_INTERVAL_HOURS)
                .clamp(1, MAX_JOB_INTERVAL_HOURS),
        );
        let overdue_after = ChronoDuration::days(
            parse_or_default(&lookup, "DLV_OVERDUE_AFTER_DAYS", DEFAULT_OVERDUE_AFTER_DAYS)
                .clamp(1, MAX_OVERDUE_AFTER_DAYS),
        );
        let job_page_size = parse_or_default(&lookup, "DLV_JOB_PAGE_SIZE", DEFAULT_JOB_PAGE_SIZE).max(1);
        let job_deadline =
            Duration::from_secs(parse_or_default(&lookup, "DLV_JOB_DEADLINE", DEFAULT_JOB_DEADLINE_SECS));
        let event_buffer_size =
            parse_or_default(&lookup, "DLV_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE).max(1);
        Self {
            database_url,
            db_max_connections,
            run_migrations,
            interest_job_interval,
            overdue_job_interval,
            overdue_after,
            job_page_size,
            job_deadline,
            event_buffer_size,
        }
    }

    pub fn accrual_options(&self) -> AccrualOptions {
        AccrualOptions { page_size: self.job_page_size, deadline: self.job_deadline }
    }
}

fn hours(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(3600))
}

fn parse_or_default<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name} ({s}). {e} Using the default, {default}, instead.");
            default
        }),
    }
}

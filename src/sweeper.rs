//! # Status Sweeper
//!
//! Background task that periodically reconciles every organization's bike
//! statuses. Reconciliation already runs after each booking write, so the
//! sweeper only corrects drift: bookings whose start date arrived since the
//! last write, or rows touched outside the API. Each organization's fleet is
//! processed in bounded-size batches.

use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, histogram};
use rand::Rng;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder};
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::AppConfig;
use crate::models::organization::{Column as OrganizationColumn, Entity as Organization};
use crate::status_sync;

/// Background status sweeper service.
pub struct StatusSweeper {
    config: Arc<AppConfig>,
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Default)]
struct TickStats {
    organizations_swept: u64,
    bikes_scanned: u64,
    bikes_updated: u64,
    organizations_with_errors: u64,
}

impl StatusSweeper {
    /// Create a new sweeper instance.
    pub fn new(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Run the sweep loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Starting status sweeper");

        loop {
            let interval = self.jittered_interval();

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Status sweeper shutdown requested");
                    break;
                }
                _ = sleep(interval) => {
                    let tick_started = Instant::now();
                    self.tick().await;
                    let elapsed = tick_started.elapsed();
                    histogram!("status_sweeper_tick_duration_ms")
                        .record(elapsed.as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Status sweeper stopped");
    }

    /// Tick interval with bounded random jitter, so multiple instances do
    /// not sweep in lockstep.
    fn jittered_interval(&self) -> TokioDuration {
        let base = self.config.reconcile.tick_interval_seconds as f64;
        let jitter = self.config.reconcile.jitter_factor;
        let factor = 1.0 + rand::thread_rng().gen_range(-jitter..=jitter);
        TokioDuration::from_secs_f64((base * factor).max(1.0))
    }

    async fn tick(&self) {
        let now = Utc::now();
        let mut stats = TickStats::default();

        let mut pages = Organization::find()
            .order_by_asc(OrganizationColumn::CreatedAt)
            .paginate(self.db.as_ref(), self.config.reconcile.batch_size);

        loop {
            let batch = match pages.fetch_and_next().await {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(err) => {
                    error!(error = ?err, "Failed to load organizations for sweep");
                    counter!("status_sweeper_errors_total").increment(1);
                    return;
                }
            };

            for org in batch {
                match status_sync::reconcile_organization(
                    self.db.as_ref(),
                    &org.id,
                    self.config.reconcile.batch_size,
                    now,
                )
                .await
                {
                    Ok(result) => {
                        stats.organizations_swept += 1;
                        stats.bikes_scanned += result.scanned;
                        stats.bikes_updated += result.updated;
                    }
                    Err(err) => {
                        stats.organizations_with_errors += 1;
                        error!(error = ?err, org_id = %org.id, "Failed to reconcile organization");
                    }
                }
            }
        }

        counter!("status_sweeper_bikes_updated_total").increment(stats.bikes_updated);

        debug!(
            organizations = stats.organizations_swept,
            scanned = stats.bikes_scanned,
            updated = stats.bikes_updated,
            errors = stats.organizations_with_errors,
            "Sweep tick completed"
        );
    }
}

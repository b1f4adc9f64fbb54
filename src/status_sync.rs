//! Bike status reconciliation.
//!
//! A bike's stored status is a derived cache: RENTED while a non-terminal,
//! non-deleted booking has started (even when overdue), AVAILABLE otherwise.
//! MAINTENANCE is an operator override that reconciliation must never clear.
//! Reconciliation is idempotent and runs after every booking write; a bulk
//! sweep covers an organization's whole fleet in bounded batches.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::dates;
use crate::error::BookingError;
use crate::models::bike::{self, BikeStatus, Entity as Bike};
use crate::models::booking::{self, BookingStatus, Entity as Booking};

/// Outcome of a bulk reconciliation sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileStats {
    /// Bikes examined
    pub scanned: u64,
    /// Bikes whose stored status was corrected
    pub updated: u64,
}

/// Whether any non-terminal, non-deleted booking has started by `as_of`.
///
/// An overdue, not-yet-returned booking still occupies the bike, so the end
/// date is deliberately not consulted.
pub async fn is_occupied<C: ConnectionTrait>(
    db: &C,
    org_id: &Uuid,
    bike_id: &Uuid,
    as_of: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let count = Booking::find()
        .filter(booking::Column::OrgId.eq(*org_id))
        .filter(booking::Column::BikeId.eq(*bike_id))
        .filter(booking::Column::DeletedAt.is_null())
        .filter(booking::Column::Status.is_in(BookingStatus::non_terminal()))
        .filter(booking::Column::StartDate.lte(dates::to_fixed(as_of)))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Recomputes and persists a bike's derived status. Returns the status the
/// bike holds after reconciliation.
pub async fn reconcile_bike<C: ConnectionTrait>(
    db: &C,
    bike: &bike::Model,
    as_of: DateTime<Utc>,
) -> Result<BikeStatus, DbErr> {
    // The override persists until an operator clears it.
    if bike.status == BikeStatus::Maintenance {
        return Ok(BikeStatus::Maintenance);
    }

    let derived = if is_occupied(db, &bike.org_id, &bike.id, as_of).await? {
        BikeStatus::Rented
    } else {
        BikeStatus::Available
    };

    if derived != bike.status {
        let mut active: bike::ActiveModel = bike.clone().into();
        active.status = Set(derived);
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;
    }

    Ok(derived)
}

/// Applies an explicit operator status change.
///
/// Entering MAINTENANCE is rejected with `BikeRented` while a booking
/// occupies the bike. Leaving MAINTENANCE (or requesting AVAILABLE/RENTED
/// directly) reconciles instead, so the stored value always matches the
/// derived one.
pub async fn set_operator_status<C: ConnectionTrait>(
    db: &C,
    bike: bike::Model,
    requested: BikeStatus,
    as_of: DateTime<Utc>,
) -> Result<bike::Model, BookingError> {
    match requested {
        BikeStatus::Maintenance => {
            if is_occupied(db, &bike.org_id, &bike.id, as_of).await? {
                return Err(BookingError::BikeRented);
            }

            let bike_id = bike.id;
            let mut active: bike::ActiveModel = bike.into();
            active.status = Set(BikeStatus::Maintenance);
            active.updated_at = Set(Utc::now().into());
            active.update(db).await?;

            Ok(Bike::find_by_id(bike_id)
                .one(db)
                .await?
                .ok_or(BookingError::NotFound { entity: "Bike" })?)
        }
        BikeStatus::Available | BikeStatus::Rented => {
            // Clearing maintenance hands control back to reconciliation.
            let cleared = if bike.status == BikeStatus::Maintenance {
                let mut active: bike::ActiveModel = bike.clone().into();
                active.status = Set(BikeStatus::Available);
                active.updated_at = Set(Utc::now().into());
                active.update(db).await?
            } else {
                bike
            };

            let derived = reconcile_bike(db, &cleared, as_of).await?;
            Ok(bike::Model {
                status: derived,
                ..cleared
            })
        }
    }
}

/// Reconciles every non-deleted bike in an organization, paging through the
/// fleet in `batch_size` chunks so a large fleet cannot exhaust the pool.
pub async fn reconcile_organization<C: ConnectionTrait>(
    db: &C,
    org_id: &Uuid,
    batch_size: u64,
    as_of: DateTime<Utc>,
) -> Result<ReconcileStats, DbErr> {
    let mut stats = ReconcileStats::default();
    let mut pages = Bike::find()
        .filter(bike::Column::OrgId.eq(*org_id))
        .filter(bike::Column::DeletedAt.is_null())
        .paginate(db, batch_size);

    while let Some(batch) = pages.fetch_and_next().await? {
        for bike in batch {
            let before = bike.status;
            let after = reconcile_bike(db, &bike, as_of).await?;
            stats.scanned += 1;
            if before != after {
                stats.updated += 1;
            }
        }
    }

    Ok(stats)
}

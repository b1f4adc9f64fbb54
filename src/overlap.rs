//! Overlap detection for candidate booking date ranges.
//!
//! A candidate range conflicts with an existing booking B (non-terminal, not
//! soft-deleted, same bike and org) iff `B.start <= candidate.end` and
//! `B.end >= next_calendar_day(candidate.start)`. Comparing against the day
//! after the candidate start is the same-day-handover rule: a booking ending
//! on day D and one starting on day D never conflict, because a bike can be
//! returned and re-delivered on the same calendar day.
//!
//! Callers run this inside the same transaction as the subsequent insert or
//! update, with the bike row locked, so two concurrent requests cannot both
//! pass the check before either write commits.

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::dates;
use crate::error::ConflictingBooking;
use crate::models::booking::{self, BookingStatus, Entity as Booking};

/// Finds the earliest-starting booking that truly overlaps the candidate
/// range, if any. `exclude_booking_id` skips the booking being updated so a
/// booking never conflicts with itself.
pub async fn find_conflict<C: ConnectionTrait>(
    db: &C,
    org_id: &Uuid,
    bike_id: &Uuid,
    candidate_start: DateTime<Utc>,
    candidate_end: DateTime<Utc>,
    exclude_booking_id: Option<Uuid>,
) -> Result<Option<booking::Model>, DbErr> {
    let handover_pivot = dates::next_calendar_day(candidate_start);

    let mut query = Booking::find()
        .filter(booking::Column::OrgId.eq(*org_id))
        .filter(booking::Column::BikeId.eq(*bike_id))
        .filter(booking::Column::DeletedAt.is_null())
        .filter(booking::Column::Status.is_in(BookingStatus::non_terminal()))
        .filter(booking::Column::StartDate.lte(dates::to_fixed(candidate_end)))
        .filter(booking::Column::EndDate.gte(dates::to_fixed(handover_pivot)));

    if let Some(exclude_id) = exclude_booking_id {
        query = query.filter(booking::Column::Id.ne(exclude_id));
    }

    query.order_by_asc(booking::Column::StartDate).one(db).await
}

/// Reduces a blocking booking to the summary reported in conflict errors.
pub fn conflict_summary(blocking: &booking::Model) -> ConflictingBooking {
    ConflictingBooking {
        booking_id: blocking.id,
        customer_name: blocking.customer_name.clone(),
        start_date: dates::to_utc(blocking.start_date).date_naive(),
        end_date: dates::to_utc(blocking.end_date).date_naive(),
    }
}

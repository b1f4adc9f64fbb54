//! Availability projection for a single bike.
//!
//! Bookings may be stacked back-to-back (each ending the day the next begins),
//! so the next-available date is never just "end of the current booking"; it
//! is the end of the longest unbroken chain of contiguous reservations. The
//! walk is bounded so a pathological booking set cannot loop forever.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dates;
use crate::models::booking::{self, BookingStatus, Entity as Booking};

/// Chain walk safety bound, in absorbed bookings.
const MAX_CHAIN_ITERATIONS: usize = 365;

/// One booking in a blocking chain.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BlockingBooking {
    /// Identifier of the blocking booking
    pub booking_id: Uuid,
    /// Customer holding the blocking booking
    pub customer_name: String,
    /// Blocking range start day
    pub start_date: NaiveDate,
    /// Blocking range end day
    pub end_date: NaiveDate,
    /// Lifecycle status of the blocking booking
    pub status: BookingStatus,
}

/// Result of projecting a bike's availability at a point in time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailabilityProjection {
    /// Whether the bike can be handed over right now
    pub is_available_now: bool,
    /// The booking occupying the bike at the query instant, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_booking: Option<BlockingBooking>,
    /// First day with no blocking booking; absent when available now
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_available_date: Option<NaiveDate>,
    /// Whole days from today until the next available date, at least 1 while
    /// occupied; 0 when available now
    pub return_in_days: i64,
    /// The occupant plus every contiguous booking absorbed behind it
    pub blocking_chain: Vec<BlockingBooking>,
}

impl AvailabilityProjection {
    fn available_now() -> Self {
        Self {
            is_available_now: true,
            current_booking: None,
            next_available_date: None,
            return_in_days: 0,
            blocking_chain: Vec::new(),
        }
    }
}

/// Loads the non-terminal, non-deleted bookings for a bike ordered by start
/// date. Input to [`project`] and to conflict-error enrichment.
pub async fn load_open_bookings<C: ConnectionTrait>(
    db: &C,
    org_id: &Uuid,
    bike_id: &Uuid,
) -> Result<Vec<booking::Model>, DbErr> {
    Booking::find()
        .filter(booking::Column::OrgId.eq(*org_id))
        .filter(booking::Column::BikeId.eq(*bike_id))
        .filter(booking::Column::DeletedAt.is_null())
        .filter(booking::Column::Status.is_in(BookingStatus::non_terminal()))
        .order_by_asc(booking::Column::StartDate)
        .all(db)
        .await
}

/// Projects availability from a bike's open bookings at `as_of`.
///
/// Pure: takes the already-loaded booking set so it can run inside or outside
/// a transaction and is trivially testable.
pub fn project(open_bookings: &[booking::Model], as_of: DateTime<Utc>) -> AvailabilityProjection {
    let today = as_of.date_naive();

    // Bookings already ended before today cannot block anything.
    let relevant: Vec<&booking::Model> = open_bookings
        .iter()
        .filter(|b| dates::to_utc(b.end_date).date_naive() >= today)
        .collect();

    if relevant.is_empty() {
        return AvailabilityProjection::available_now();
    }

    let occupant = relevant
        .iter()
        .find(|b| dates::to_utc(b.start_date) <= as_of && dates::to_utc(b.end_date) >= as_of);

    // A gap before the next reservation means the bike is available now even
    // though future bookings exist.
    let Some(occupant) = occupant else {
        return AvailabilityProjection::available_now();
    };

    let mut chain = vec![summary(occupant)];
    let mut counted: HashSet<Uuid> = HashSet::from([occupant.id]);
    let mut candidate_day = dates::to_utc(occupant.end_date).date_naive();

    for _ in 0..MAX_CHAIN_ITERATIONS {
        let next = relevant.iter().find(|b| {
            !counted.contains(&b.id)
                && dates::to_utc(b.start_date).date_naive() <= candidate_day
                && dates::to_utc(b.end_date).date_naive() > candidate_day
        });

        match next {
            Some(b) => {
                counted.insert(b.id);
                chain.push(summary(b));
                candidate_day = dates::to_utc(b.end_date).date_naive();
            }
            None => break,
        }
    }

    AvailabilityProjection {
        is_available_now: false,
        current_booking: Some(summary(occupant)),
        next_available_date: Some(candidate_day),
        return_in_days: dates::days_between(today, candidate_day).max(1),
        blocking_chain: chain,
    }
}

fn summary(b: &booking::Model) -> BlockingBooking {
    BlockingBooking {
        booking_id: b.id,
        customer_name: b.customer_name.clone(),
        start_date: dates::to_utc(b.start_date).date_naive(),
        end_date: dates::to_utc(b.end_date).date_naive(),
        status: b.status,
    }
}

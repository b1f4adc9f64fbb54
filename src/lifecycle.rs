//! Booking lifecycle state machine.
//!
//! States: UPCOMING, ACTIVE, RETURNED, CANCELLED. RETURNED and CANCELLED are
//! terminal; soft delete is an orthogonal flag on non-terminal bookings.
//! A booking becomes RETURNED only through an explicit return action, never
//! by time passing. Transition guards live here as pure functions producing
//! ActiveModels; persistence belongs to the callers.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::Set;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::dates;
use crate::error::BookingError;
use crate::models::booking::{self, BookingStatus, FuelLevel};
use crate::settlement::{ReturnCharges, Settlement};

/// Status a freshly created booking starts in: ACTIVE when the start day has
/// already arrived, UPCOMING otherwise.
pub fn initial_status(start: NaiveDate, today: NaiveDate) -> BookingStatus {
    if start <= today {
        BookingStatus::Active
    } else {
        BookingStatus::Upcoming
    }
}

/// Validates a candidate date range before any state is touched.
///
/// `allow_past_start` is set on updates that leave the stored start date
/// unchanged; creation always enforces a today-or-later start.
pub fn validate_range(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    allow_past_start: bool,
) -> Result<(), BookingError> {
    if end < start {
        return Err(BookingError::InvalidDateRange { start, end });
    }
    if !allow_past_start && start < today {
        return Err(BookingError::PastDate(start));
    }
    Ok(())
}

/// Partial update of a booking's editable fields. Absent fields are left
/// untouched; date changes re-run range validation and overlap detection.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BookingPatch {
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_amount: Option<i64>,
    pub paid_amount: Option<i64>,
    pub security_deposit: Option<i64>,
    pub notes: Option<String>,
}

impl BookingPatch {
    /// Whether the patch moves either boundary of the date range.
    pub fn changes_dates(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Handover checkpoint data recorded at delivery.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeliveryInput {
    /// Helmets handed over with the bike
    pub helmets_given: i32,
    /// Fuel level at handover
    pub fuel_level_start: FuelLevel,
    /// Odometer reading at handover
    pub odometer_start: i64,
    /// Pre-existing damage noted before handover
    pub existing_damage: Option<String>,
    /// References to handover photos and documents stored elsewhere
    pub document_refs: Option<Vec<String>>,
    /// Customer identity was verified at handover
    pub identity_verified: bool,
    /// Refundable deposit taken at handover
    pub security_deposit: Option<i64>,
}

/// Records the delivery checkpoint and activates the booking.
pub fn deliver(
    booking: booking::Model,
    input: DeliveryInput,
    as_of: DateTime<Utc>,
) -> Result<booking::ActiveModel, BookingError> {
    if booking.status.is_terminal() {
        return Err(BookingError::InvalidStatus(booking.status));
    }
    if booking.delivered_at.is_some() {
        return Err(BookingError::AlreadyDelivered);
    }

    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(BookingStatus::Active);
    active.delivered_at = Set(Some(dates::to_fixed(as_of)));
    active.helmets_given = Set(Some(input.helmets_given));
    active.fuel_level_start = Set(Some(input.fuel_level_start));
    active.odometer_start = Set(Some(input.odometer_start));
    active.existing_damage = Set(input.existing_damage);
    active.document_refs = Set(input.document_refs.map(serde_json::Value::from));
    active.identity_verified = Set(input.identity_verified);
    if input.security_deposit.is_some() {
        active.security_deposit = Set(input.security_deposit);
    }
    Ok(active)
}

/// Return checkpoint data recorded at settlement.
#[derive(Debug, Clone, Default)]
pub struct ReturnInput {
    pub odometer_end: Option<i64>,
    pub fuel_level_end: Option<FuelLevel>,
    pub helmets_returned: Option<i32>,
    pub new_damage: Option<String>,
    pub fines_note: Option<String>,
    pub charges: ReturnCharges,
}

/// Applies a computed settlement: records the return checkpoint, rewrites the
/// end date to the actual return instant so the occupancy window reflects
/// reality, appends the fines note, and transitions to RETURNED.
pub fn apply_return(
    booking: booking::Model,
    input: &ReturnInput,
    settlement: &Settlement,
    as_of: DateTime<Utc>,
) -> Result<booking::ActiveModel, BookingError> {
    if booking.status.is_terminal() {
        return Err(BookingError::InvalidStatus(booking.status));
    }

    let notes = append_note(booking.notes.clone(), input.fines_note.as_deref());

    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(BookingStatus::Returned);
    active.returned_at = Set(Some(dates::to_fixed(as_of)));
    active.end_date = Set(dates::to_fixed(as_of));
    active.odometer_end = Set(input.odometer_end);
    active.fuel_level_end = Set(input.fuel_level_end);
    active.helmets_returned = Set(input.helmets_returned);
    active.new_damage = Set(input.new_damage.clone());
    active.late_fee = Set(Some(settlement.overdue_fee));
    active.fuel_charge = Set(Some(settlement.fuel_charge));
    active.damage_charge = Set(Some(settlement.damage_charge));
    active.extra_distance_charge = Set(Some(settlement.extra_distance_charge));
    active.total_amount = Set(settlement.new_total);
    active.paid_amount = Set(settlement.new_paid);
    active.notes = Set(notes);
    Ok(active)
}

/// Cancels a booking. Refused once terminal or once any settlement exists.
pub fn cancel(booking: booking::Model) -> Result<booking::ActiveModel, BookingError> {
    ensure_discardable(&booking)?;

    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(BookingStatus::Cancelled);
    Ok(active)
}

/// Guard shared by cancellation and soft delete: only non-terminal bookings
/// with no recorded settlement may be discarded.
pub fn ensure_discardable(booking: &booking::Model) -> Result<(), BookingError> {
    if booking.status.is_terminal() {
        return Err(BookingError::InvalidStatus(booking.status));
    }
    if booking.has_settlement() {
        return Err(BookingError::SettlementRecorded);
    }
    Ok(())
}

fn append_note(existing: Option<String>, addition: Option<&str>) -> Option<String> {
    match (existing, addition) {
        (notes, None) => notes,
        (None, Some(addition)) => Some(addition.to_string()),
        (Some(notes), Some(addition)) => Some(format!("{}\n{}", notes, addition)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{end_of_day, start_of_day};
    use crate::settlement::settle;
    use sea_orm::ActiveValue;
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture(status: BookingStatus) -> booking::Model {
        booking::Model {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            bike_id: Uuid::new_v4(),
            customer_name: "Meera".to_string(),
            phone: "7777777777".to_string(),
            start_date: start_of_day(day(2025, 1, 1)).into(),
            end_date: end_of_day(day(2025, 1, 5)).into(),
            status,
            total_amount: 2500,
            paid_amount: 500,
            security_deposit: None,
            late_fee: None,
            fuel_charge: None,
            damage_charge: None,
            extra_distance_charge: None,
            notes: None,
            delivered_at: None,
            odometer_start: None,
            fuel_level_start: None,
            helmets_given: None,
            existing_damage: None,
            document_refs: None,
            identity_verified: false,
            returned_at: None,
            odometer_end: None,
            fuel_level_end: None,
            helmets_returned: None,
            new_damage: None,
            deleted_at: None,
            created_at: start_of_day(day(2025, 1, 1)).into(),
            updated_at: start_of_day(day(2025, 1, 1)).into(),
        }
    }

    fn delivery_input() -> DeliveryInput {
        DeliveryInput {
            helmets_given: 2,
            fuel_level_start: FuelLevel::Full,
            odometer_start: 12_000,
            existing_damage: None,
            document_refs: Some(vec![
                "licence-front.jpg".to_string(),
                "rental-agreement.pdf".to_string(),
            ]),
            identity_verified: true,
            security_deposit: Some(1000),
        }
    }

    #[test]
    fn initial_status_by_start_day() {
        let today = day(2025, 1, 3);
        assert_eq!(initial_status(day(2025, 1, 4), today), BookingStatus::Upcoming);
        assert_eq!(initial_status(day(2025, 1, 3), today), BookingStatus::Active);
        assert_eq!(initial_status(day(2025, 1, 1), today), BookingStatus::Active);
    }

    #[test]
    fn range_validation() {
        let today = day(2025, 1, 3);
        assert!(validate_range(day(2025, 1, 3), day(2025, 1, 5), today, false).is_ok());
        // Single-day rental
        assert!(validate_range(day(2025, 1, 3), day(2025, 1, 3), today, false).is_ok());

        assert!(matches!(
            validate_range(day(2025, 1, 5), day(2025, 1, 3), today, false),
            Err(BookingError::InvalidDateRange { .. })
        ));
        assert!(matches!(
            validate_range(day(2025, 1, 1), day(2025, 1, 5), today, false),
            Err(BookingError::PastDate(_))
        ));
        // Updates keeping the stored start date may carry a past start.
        assert!(validate_range(day(2025, 1, 1), day(2025, 1, 5), today, true).is_ok());
    }

    #[test]
    fn deliver_activates_and_records_checkpoint() {
        let active = deliver(
            fixture(BookingStatus::Upcoming),
            delivery_input(),
            start_of_day(day(2025, 1, 1)),
        )
        .unwrap();

        assert_eq!(active.status, ActiveValue::Set(BookingStatus::Active));
        assert_eq!(active.helmets_given, ActiveValue::Set(Some(2)));
        assert_eq!(active.identity_verified, ActiveValue::Set(true));
        assert_eq!(active.security_deposit, ActiveValue::Set(Some(1000)));
        assert_eq!(
            active.document_refs,
            ActiveValue::Set(Some(serde_json::json!([
                "licence-front.jpg",
                "rental-agreement.pdf"
            ])))
        );
    }

    #[test]
    fn deliver_twice_is_rejected() {
        let mut booking = fixture(BookingStatus::Active);
        booking.delivered_at = Some(start_of_day(day(2025, 1, 1)).into());

        assert!(matches!(
            deliver(booking, delivery_input(), start_of_day(day(2025, 1, 2))),
            Err(BookingError::AlreadyDelivered)
        ));
    }

    #[test]
    fn deliver_terminal_is_rejected() {
        for status in [BookingStatus::Returned, BookingStatus::Cancelled] {
            assert!(matches!(
                deliver(fixture(status), delivery_input(), start_of_day(day(2025, 1, 2))),
                Err(BookingError::InvalidStatus(_))
            ));
        }
    }

    #[test]
    fn return_rewrites_end_date_and_appends_notes() {
        let mut booking = fixture(BookingStatus::Active);
        booking.notes = Some("helmet scratched at pickup".to_string());

        let as_of = end_of_day(day(2025, 1, 8));
        let settlement = settle(&booking, 500, None, &ReturnCharges::default(), as_of);
        let input = ReturnInput {
            fines_note: Some("returned 3 days late".to_string()),
            ..Default::default()
        };

        let active = apply_return(booking, &input, &settlement, as_of).unwrap();
        assert_eq!(active.status, ActiveValue::Set(BookingStatus::Returned));
        assert_eq!(active.end_date, ActiveValue::Set(as_of.into()));
        assert_eq!(active.total_amount, ActiveValue::Set(4000));
        assert_eq!(
            active.notes,
            ActiveValue::Set(Some(
                "helmet scratched at pickup\nreturned 3 days late".to_string()
            ))
        );
    }

    #[test]
    fn cancel_refused_after_settlement() {
        let mut booking = fixture(BookingStatus::Active);
        booking.late_fee = Some(1500);

        assert!(matches!(
            cancel(booking),
            Err(BookingError::SettlementRecorded)
        ));
    }

    #[test]
    fn cancel_refused_when_terminal() {
        assert!(matches!(
            cancel(fixture(BookingStatus::Returned)),
            Err(BookingError::InvalidStatus(BookingStatus::Returned))
        ));
    }

    #[test]
    fn cancel_flips_status() {
        let active = cancel(fixture(BookingStatus::Upcoming)).unwrap();
        assert_eq!(active.status, ActiveValue::Set(BookingStatus::Cancelled));
    }
}

//! Return settlement arithmetic.
//!
//! All amounts are integer minor currency units. Settlement is a pure
//! computation over the booking, the bike's daily rate, and the operator's
//! return inputs; applying it (rewriting the end date, appending notes,
//! flipping the status) is the lifecycle's job.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::dates;
use crate::models::booking;

/// Operator-supplied charges at return time. Every field defaults to zero
/// when omitted; `late_fee_override` replaces the computed overdue fee.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnCharges {
    pub late_fee_override: Option<i64>,
    pub fuel_charge: Option<i64>,
    pub damage_charge: Option<i64>,
    pub extra_distance_charge: Option<i64>,
    pub misc_fines: Option<i64>,
    pub additional_payment: Option<i64>,
}

/// Computed settlement for a returned booking.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Settlement {
    /// Whole calendar days past the originally scheduled end date
    pub overdue_days: i64,
    /// Overdue fee actually charged (override or days x daily rate)
    pub overdue_fee: i64,
    /// Fuel charge applied
    pub fuel_charge: i64,
    /// Damage charge applied
    pub damage_charge: i64,
    /// Extra-distance charge applied
    pub extra_distance_charge: i64,
    /// Miscellaneous fines applied
    pub misc_fines: i64,
    /// Total owed after settlement
    pub new_total: i64,
    /// Paid amount after any payment taken at return
    pub new_paid: i64,
    /// Odometer distance over the rental, when both readings exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_used: Option<i64>,
}

/// Computes the settlement for returning `booking` at `as_of`.
///
/// `overdue_days = max(0, floor_days(as_of - original_end))`; the fee is
/// `overdue_days x daily_rate` unless an explicit override is supplied.
pub fn settle(
    booking: &booking::Model,
    daily_rate: i64,
    odometer_end: Option<i64>,
    charges: &ReturnCharges,
    as_of: DateTime<Utc>,
) -> Settlement {
    let overdue_days = dates::overdue_days(dates::to_utc(booking.end_date), as_of);
    let overdue_fee = charges
        .late_fee_override
        .unwrap_or(overdue_days * daily_rate);

    let fuel_charge = charges.fuel_charge.unwrap_or(0);
    let damage_charge = charges.damage_charge.unwrap_or(0);
    let extra_distance_charge = charges.extra_distance_charge.unwrap_or(0);
    let misc_fines = charges.misc_fines.unwrap_or(0);

    let distance_used = match (booking.odometer_start, odometer_end) {
        (Some(start), Some(end)) => Some(end - start),
        _ => None,
    };

    Settlement {
        overdue_days,
        overdue_fee,
        fuel_charge,
        damage_charge,
        extra_distance_charge,
        misc_fines,
        new_total: booking.total_amount
            + overdue_fee
            + fuel_charge
            + damage_charge
            + extra_distance_charge
            + misc_fines,
        new_paid: booking.paid_amount + charges.additional_payment.unwrap_or(0),
        distance_used,
    }
}

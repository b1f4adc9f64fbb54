//! Payment repository for database operations
//!
//! Payments are append-only. Writes happen inside booking transactions
//! (advance at creation, settlement payment at return), so `record` is
//! generic over the connection; reads go through the pool-bound repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::payment::{self, Entity as Payment, PaymentMethod};

/// Appends a payment against a booking within the caller's transaction.
pub async fn record<C: ConnectionTrait>(
    db: &C,
    org_id: &Uuid,
    booking_id: &Uuid,
    amount: i64,
    method: PaymentMethod,
) -> Result<payment::Model, DbErr> {
    let active = payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        org_id: Set(*org_id),
        booking_id: Set(*booking_id),
        amount: Set(amount),
        method: Set(method),
        recorded_at: Set(Utc::now().into()),
    };
    active.insert(db).await
}

/// Repository for payment reads
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists payments for a booking in recording order
    pub async fn list_for_booking(
        &self,
        org_id: &Uuid,
        booking_id: &Uuid,
    ) -> Result<Vec<payment::Model>, DbErr> {
        Payment::find()
            .filter(payment::Column::OrgId.eq(*org_id))
            .filter(payment::Column::BookingId.eq(*booking_id))
            .order_by_asc(payment::Column::RecordedAt)
            .order_by_asc(payment::Column::Id)
            .all(&*self.db)
            .await
    }
}

//! Booking repository for database operations
//!
//! Org-scoped finders and persistence over the bookings table. Overlap
//! detection and lifecycle transitions live in the engine modules; this
//! repository only reads and writes rows.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::booking::{self, BookingStatus, Entity as Booking};

/// Repository for booking database operations
#[derive(Debug, Clone)]
pub struct BookingRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl BookingRepository {
    /// Creates a new BookingRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts a fully-populated booking and returns the persisted row
    pub async fn insert(&self, active: booking::ActiveModel) -> Result<booking::Model, DbErr> {
        let id = active
            .id
            .clone()
            .take()
            .ok_or_else(|| DbErr::Custom("booking id must be set".to_string()))?;
        active.insert(&*self.db).await?;

        Booking::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("booking not persisted".to_string()))
    }

    /// Finds a non-deleted booking by its ID within an org scope
    pub async fn find_by_id(
        &self,
        org_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<booking::Model>, DbErr> {
        Booking::find_by_id(*id)
            .filter(booking::Column::OrgId.eq(*org_id))
            .filter(booking::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await
    }

    /// Lists non-deleted bookings for an org, optionally filtered by status
    /// and bike, newest range first
    pub async fn list(
        &self,
        org_id: &Uuid,
        status: Option<BookingStatus>,
        bike_id: Option<Uuid>,
    ) -> Result<Vec<booking::Model>, DbErr> {
        let mut query = Booking::find()
            .filter(booking::Column::OrgId.eq(*org_id))
            .filter(booking::Column::DeletedAt.is_null());

        if let Some(status) = status {
            query = query.filter(booking::Column::Status.eq(status));
        }
        if let Some(bike_id) = bike_id {
            query = query.filter(booking::Column::BikeId.eq(bike_id));
        }

        query
            .order_by_desc(booking::Column::StartDate)
            .order_by_asc(booking::Column::Id)
            .all(&*self.db)
            .await
    }

    /// Persists an updated booking, bumping updated_at
    pub async fn update(&self, mut active: booking::ActiveModel) -> Result<booking::Model, DbErr> {
        active.updated_at = Set(Utc::now().into());
        active.update(&*self.db).await
    }

    /// Soft-deletes a booking. Returns the updated row, or `None` when the
    /// booking does not exist in this org or was already deleted.
    pub async fn soft_delete(
        &self,
        org_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<booking::Model>, DbErr> {
        let Some(existing) = self.find_by_id(org_id, id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        let mut active: booking::ActiveModel = existing.into();
        active.deleted_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        Ok(Some(active.update(&*self.db).await?))
    }
}

//! Bike repository for database operations
//!
//! Org-scoped finders over the bikes table. The status column is a derived
//! cache maintained by the status synchronizer; this repository only persists
//! what it is told.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::bike::{self, BikeStatus, Entity as Bike};
use crate::models::booking::{self, BookingStatus, Entity as Booking};

/// Repository for bike database operations
#[derive(Debug, Clone)]
pub struct BikeRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl BikeRepository {
    /// Creates a new BikeRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a bike and returns the persisted row
    pub async fn create(
        &self,
        org_id: &Uuid,
        registration_number: String,
        model: Option<String>,
        daily_rate: i64,
    ) -> Result<bike::Model, DbErr> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let active = bike::ActiveModel {
            id: Set(id),
            org_id: Set(*org_id),
            registration_number: Set(registration_number),
            model: Set(model),
            daily_rate: Set(daily_rate),
            status: Set(BikeStatus::Available),
            deleted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        active.insert(&*self.db).await?;

        Bike::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("bike not persisted".to_string()))
    }

    /// Finds a non-deleted bike by its ID within an org scope
    pub async fn find_by_id(
        &self,
        org_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<bike::Model>, DbErr> {
        Bike::find_by_id(*id)
            .filter(bike::Column::OrgId.eq(*org_id))
            .filter(bike::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await
    }

    /// Lists non-deleted bikes for an org, optionally filtered by status,
    /// ordered by registration number
    pub async fn list(
        &self,
        org_id: &Uuid,
        status: Option<BikeStatus>,
    ) -> Result<Vec<bike::Model>, DbErr> {
        let mut query = Bike::find()
            .filter(bike::Column::OrgId.eq(*org_id))
            .filter(bike::Column::DeletedAt.is_null());

        if let Some(status) = status {
            query = query.filter(bike::Column::Status.eq(status));
        }

        query
            .order_by_asc(bike::Column::RegistrationNumber)
            .order_by_asc(bike::Column::Id)
            .all(&*self.db)
            .await
    }

    /// Soft-deletes a bike. Returns the updated row, or `None` when the bike
    /// does not exist in this org or was already deleted.
    pub async fn soft_delete(
        &self,
        org_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<bike::Model>, DbErr> {
        let Some(bike) = self.find_by_id(org_id, id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        let mut active: bike::ActiveModel = bike.into();
        active.deleted_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        Ok(Some(active.update(&*self.db).await?))
    }

    /// Counts non-deleted, non-terminal bookings against a bike. Deletion is
    /// refused while this is non-zero.
    pub async fn open_booking_count(&self, org_id: &Uuid, bike_id: &Uuid) -> Result<u64, DbErr> {
        Booking::find()
            .filter(booking::Column::OrgId.eq(*org_id))
            .filter(booking::Column::BikeId.eq(*bike_id))
            .filter(booking::Column::DeletedAt.is_null())
            .filter(booking::Column::Status.is_in(BookingStatus::non_terminal()))
            .count(&*self.db)
            .await
    }
}

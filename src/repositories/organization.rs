//! Organization repository for database operations

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::organization::{self, Entity as Organization};

/// Repository for organization database operations
#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl OrganizationRepository {
    /// Creates a new OrganizationRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates an organization and returns the persisted row
    pub async fn create(
        &self,
        name: String,
        plan_tier: String,
        bike_quota: i32,
    ) -> Result<organization::Model, DbErr> {
        let id = Uuid::new_v4();
        let active = organization::ActiveModel {
            id: Set(id),
            name: Set(name),
            plan_tier: Set(plan_tier),
            bike_quota: Set(bike_quota),
            created_at: Set(Utc::now().into()),
        };
        active.insert(&*self.db).await?;

        // Query the record back so SQLite returns the same shape as Postgres
        Organization::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("organization not persisted".to_string()))
    }

    /// Finds an organization by its ID
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<organization::Model>, DbErr> {
        Organization::find_by_id(*id).one(&*self.db).await
    }

    /// Lists all organizations ordered by creation time then ID
    pub async fn list(&self) -> Result<Vec<organization::Model>, DbErr> {
        Organization::find()
            .order_by_asc(organization::Column::CreatedAt)
            .order_by_asc(organization::Column::Id)
            .all(&*self.db)
            .await
    }

    /// Counts non-deleted bikes registered under an organization, for quota
    /// enforcement at bike creation
    pub async fn bike_count(&self, org_id: &Uuid) -> Result<u64, DbErr> {
        use crate::models::bike::{self, Entity as Bike};

        Bike::find()
            .filter(bike::Column::OrgId.eq(*org_id))
            .filter(bike::Column::DeletedAt.is_null())
            .count(&*self.db)
            .await
    }
}

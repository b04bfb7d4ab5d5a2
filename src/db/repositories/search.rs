use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{prelude::*, searches};
use crate::models::now_timestamp;
use crate::models::result::ResultFilters;

#[derive(Debug, Clone)]
pub struct SearchRecord {
    pub id: i32,
    pub user_id: i32,
    pub query: String,
    pub filters: ResultFilters,
    pub created_at: String,
}

impl From<searches::Model> for SearchRecord {
    fn from(model: searches::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            filters: ResultFilters::from_json(model.filters.as_deref()),
            query: model.query,
            created_at: model.created_at,
        }
    }
}

pub struct SearchRepository {
    conn: DatabaseConnection,
}

impl SearchRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        user_id: i32,
        query: &str,
        filters: &ResultFilters,
    ) -> Result<SearchRecord> {
        let active = searches::ActiveModel {
            user_id: Set(user_id),
            query: Set(query.to_string()),
            filters: Set(filters.to_json()),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to create search")?;

        Ok(SearchRecord::from(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<SearchRecord>> {
        let model = Searches::find_by_id(id).one(&self.conn).await?;
        Ok(model.map(SearchRecord::from))
    }

    /// Newest first; returns the page and the total count.
    pub async fn list_for_user(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<SearchRecord>, u64)> {
        let paginator = Searches::find()
            .filter(searches::Column::UserId.eq(user_id))
            .order_by_desc(searches::Column::CreatedAt)
            .order_by_desc(searches::Column::Id)
            .paginate(&self.conn, page_size.max(1));

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows.into_iter().map(SearchRecord::from).collect(), total))
    }
}

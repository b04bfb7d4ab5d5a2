use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::collections::HashMap;

use crate::entities::{column_values, columns, prelude::*};
use crate::models::now_timestamp;

#[derive(Debug, Clone)]
pub struct ColumnRecord {
    pub id: i32,
    pub search_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub generated_by_ai: bool,
    pub created_at: String,
}

impl From<columns::Model> for ColumnRecord {
    fn from(m: columns::Model) -> Self {
        Self {
            id: m.id,
            search_id: m.search_id,
            name: m.name,
            description: m.description,
            generated_by_ai: m.generated_by_ai,
            created_at: m.created_at,
        }
    }
}

/// Column values keyed by `(column_id, result_id)`.
pub type ValueMap = HashMap<(i32, i32), Option<String>>;

pub struct ColumnRepository {
    conn: DatabaseConnection,
}

impl ColumnRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        search_id: i32,
        name: &str,
        description: Option<&str>,
        generated_by_ai: bool,
    ) -> Result<ColumnRecord> {
        let active = columns::ActiveModel {
            search_id: Set(search_id),
            name: Set(name.to_string()),
            description: Set(description.map(ToString::to_string)),
            generated_by_ai: Set(generated_by_ai),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to create column")?;
        Ok(ColumnRecord::from(model))
    }

    pub async fn find_by_name(&self, search_id: i32, name: &str) -> Result<Option<ColumnRecord>> {
        let model = Columns::find()
            .filter(columns::Column::SearchId.eq(search_id))
            .filter(columns::Column::Name.eq(name))
            .one(&self.conn)
            .await?;
        Ok(model.map(ColumnRecord::from))
    }

    pub async fn list_for_search(&self, search_id: i32) -> Result<Vec<ColumnRecord>> {
        let rows = Columns::find()
            .filter(columns::Column::SearchId.eq(search_id))
            .order_by_asc(columns::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(ColumnRecord::from).collect())
    }

    pub async fn count_for_search(&self, search_id: i32) -> Result<u64> {
        let count = Columns::find()
            .filter(columns::Column::SearchId.eq(search_id))
            .count(&self.conn)
            .await?;
        Ok(count)
    }

    /// Inserts or overwrites one value per `(column_id, result_id)`.
    pub async fn upsert_values(
        &self,
        column_id: i32,
        values: &[(i32, Option<String>)],
    ) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }

        let now = now_timestamp();
        let models = values.iter().map(|(result_id, value)| column_values::ActiveModel {
            column_id: Set(column_id),
            result_id: Set(*result_id),
            value: Set(value.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        });

        ColumnValues::insert_many(models)
            .on_conflict(
                OnConflict::columns([
                    column_values::Column::ColumnId,
                    column_values::Column::ResultId,
                ])
                .update_columns([column_values::Column::Value, column_values::Column::UpdatedAt])
                .to_owned(),
            )
            .exec(&self.conn)
            .await
            .context("Failed to upsert column values")?;

        Ok(())
    }

    pub async fn values_for_columns(&self, column_ids: &[i32]) -> Result<ValueMap> {
        if column_ids.is_empty() {
            return Ok(ValueMap::new());
        }

        let rows = ColumnValues::find()
            .filter(column_values::Column::ColumnId.is_in(column_ids.iter().copied()))
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|v| ((v.column_id, v.result_id), v.value))
            .collect())
    }
}

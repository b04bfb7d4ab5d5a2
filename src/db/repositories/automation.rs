use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{automations, prelude::*};
use crate::models::automation::AutomationInterval;
use crate::models::now_timestamp;

#[derive(Debug, Clone)]
pub struct AutomationRecord {
    pub id: i32,
    pub user_id: i32,
    pub search_id: i32,
    pub frequency: String,
    pub last_run: Option<String>,
    pub next_run: String,
    pub is_active: bool,
    pub last_new_results: i32,
    pub created_at: String,
}

impl From<automations::Model> for AutomationRecord {
    fn from(m: automations::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            search_id: m.search_id,
            frequency: m.frequency,
            last_run: m.last_run,
            next_run: m.next_run,
            is_active: m.is_active,
            last_new_results: m.last_new_results,
            created_at: m.created_at,
        }
    }
}

pub struct AutomationRepository {
    conn: DatabaseConnection,
}

impl AutomationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        user_id: i32,
        search_id: i32,
        interval: AutomationInterval,
        next_run: &str,
    ) -> Result<AutomationRecord> {
        let active = automations::ActiveModel {
            user_id: Set(user_id),
            search_id: Set(search_id),
            frequency: Set(interval.as_str().to_string()),
            last_run: Set(None),
            next_run: Set(next_run.to_string()),
            is_active: Set(true),
            last_new_results: Set(0),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to create automation")?;
        Ok(AutomationRecord::from(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<AutomationRecord>> {
        let model = Automations::find_by_id(id).one(&self.conn).await?;
        Ok(model.map(AutomationRecord::from))
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<AutomationRecord>> {
        let rows = Automations::find()
            .filter(automations::Column::UserId.eq(user_id))
            .order_by_desc(automations::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(AutomationRecord::from).collect())
    }

    /// Active automations with `next_run <= now`, most overdue first.
    pub async fn list_due(&self, now: &str) -> Result<Vec<AutomationRecord>> {
        let rows = Automations::find()
            .filter(automations::Column::IsActive.eq(true))
            .filter(automations::Column::NextRun.lte(now))
            .order_by_asc(automations::Column::NextRun)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(AutomationRecord::from).collect())
    }

    pub async fn deactivate(&self, id: i32) -> Result<bool> {
        let result = Automations::update_many()
            .col_expr(
                automations::Column::IsActive,
                sea_orm::sea_query::Expr::value(false),
            )
            .filter(automations::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn record_run(
        &self,
        id: i32,
        last_run: &str,
        next_run: &str,
        new_results: i32,
    ) -> Result<()> {
        Automations::update_many()
            .col_expr(
                automations::Column::LastRun,
                sea_orm::sea_query::Expr::value(last_run),
            )
            .col_expr(
                automations::Column::NextRun,
                sea_orm::sea_query::Expr::value(next_run),
            )
            .col_expr(
                automations::Column::LastNewResults,
                sea_orm::sea_query::Expr::value(new_results),
            )
            .filter(automations::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record automation run")?;
        Ok(())
    }
}

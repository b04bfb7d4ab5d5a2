use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::models::automation::AutomationInterval;
use crate::models::result::{ResultFilters, SearchHit};

pub mod migrator;
pub mod repositories;

pub use repositories::automation::AutomationRecord;
pub use repositories::column::{ColumnRecord, ValueMap};
pub use repositories::result::{ResultPatch, ResultRecord};
pub use repositories::search::SearchRecord;
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if let Some(path) = sqlite_file_path(db_url) {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !path.exists() {
                std::fs::File::create(path)?;
            }
        }

        // Every connection to an in-memory SQLite URL opens its own database.
        let (max_connections, min_connections) = if db_url.contains(":memory:") {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);
        if !db_url.contains(":memory:") {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn search_repo(&self) -> repositories::search::SearchRepository {
        repositories::search::SearchRepository::new(self.conn.clone())
    }

    fn result_repo(&self) -> repositories::result::ResultRepository {
        repositories::result::ResultRepository::new(self.conn.clone())
    }

    fn column_repo(&self) -> repositories::column::ColumnRepository {
        repositories::column::ColumnRepository::new(self.conn.clone())
    }

    fn automation_repo(&self) -> repositories::automation::AutomationRepository {
        repositories::automation::AutomationRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_token(&self, token: &str) -> Result<Option<User>> {
        self.user_repo().get_by_token(token).await
    }

    pub async fn create_user(&self, email: &str, token: &str) -> Result<User> {
        self.user_repo().create(email, token).await
    }

    // Searches

    pub async fn create_search(
        &self,
        user_id: i32,
        query: &str,
        filters: &ResultFilters,
    ) -> Result<SearchRecord> {
        self.search_repo().create(user_id, query, filters).await
    }

    pub async fn get_search(&self, id: i32) -> Result<Option<SearchRecord>> {
        self.search_repo().get(id).await
    }

    pub async fn list_searches(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<SearchRecord>, u64)> {
        self.search_repo()
            .list_for_user(user_id, page, page_size)
            .await
    }

    // Results

    pub async fn insert_new_results(
        &self,
        search_id: i32,
        hits: &[SearchHit],
    ) -> Result<Vec<ResultRecord>> {
        self.result_repo().insert_new(search_id, hits).await
    }

    pub async fn get_result(&self, id: i32) -> Result<Option<ResultRecord>> {
        self.result_repo().get(id).await
    }

    pub async fn list_results(&self, search_id: i32) -> Result<Vec<ResultRecord>> {
        self.result_repo().list_for_search(search_id).await
    }

    pub async fn list_user_results(&self, user_id: i32, limit: u64) -> Result<Vec<ResultRecord>> {
        self.result_repo().list_for_user(user_id, limit).await
    }

    pub async fn count_results(&self, search_id: i32) -> Result<u64> {
        self.result_repo().count_for_search(search_id).await
    }

    pub async fn update_result(&self, id: i32, patch: ResultPatch) -> Result<Option<ResultRecord>> {
        self.result_repo().update(id, patch).await
    }

    // Columns

    pub async fn create_column(
        &self,
        search_id: i32,
        name: &str,
        description: Option<&str>,
        generated_by_ai: bool,
    ) -> Result<ColumnRecord> {
        self.column_repo()
            .create(search_id, name, description, generated_by_ai)
            .await
    }

    pub async fn find_column(&self, search_id: i32, name: &str) -> Result<Option<ColumnRecord>> {
        self.column_repo().find_by_name(search_id, name).await
    }

    pub async fn list_columns(&self, search_id: i32) -> Result<Vec<ColumnRecord>> {
        self.column_repo().list_for_search(search_id).await
    }

    pub async fn count_columns(&self, search_id: i32) -> Result<u64> {
        self.column_repo().count_for_search(search_id).await
    }

    pub async fn upsert_column_values(
        &self,
        column_id: i32,
        values: &[(i32, Option<String>)],
    ) -> Result<()> {
        self.column_repo().upsert_values(column_id, values).await
    }

    pub async fn column_values(&self, column_ids: &[i32]) -> Result<ValueMap> {
        self.column_repo().values_for_columns(column_ids).await
    }

    // Automations

    pub async fn create_automation(
        &self,
        user_id: i32,
        search_id: i32,
        interval: AutomationInterval,
        next_run: &str,
    ) -> Result<AutomationRecord> {
        self.automation_repo()
            .create(user_id, search_id, interval, next_run)
            .await
    }

    pub async fn get_automation(&self, id: i32) -> Result<Option<AutomationRecord>> {
        self.automation_repo().get(id).await
    }

    pub async fn list_automations(&self, user_id: i32) -> Result<Vec<AutomationRecord>> {
        self.automation_repo().list_for_user(user_id).await
    }

    pub async fn list_due_automations(&self, now: &str) -> Result<Vec<AutomationRecord>> {
        self.automation_repo().list_due(now).await
    }

    pub async fn deactivate_automation(&self, id: i32) -> Result<bool> {
        self.automation_repo().deactivate(id).await
    }

    pub async fn record_automation_run(
        &self,
        id: i32,
        last_run: &str,
        next_run: &str,
        new_results: i32,
    ) -> Result<()> {
        self.automation_repo()
            .record_run(id, last_run, next_run, new_results)
            .await
    }
}

/// File path of a SQLite URL, or `None` for in-memory and non-SQLite URLs.
fn sqlite_file_path(db_url: &str) -> Option<&Path> {
    let rest = db_url.strip_prefix("sqlite:")?;
    let rest = rest.trim_start_matches("//");
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(Path::new(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path("sqlite:data/radar.db?mode=rwc"),
            Some(Path::new("data/radar.db"))
        );
        assert_eq!(
            sqlite_file_path("sqlite:///tmp/x.db"),
            Some(Path::new("/tmp/x.db"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://u@h/db"), None);
    }
}

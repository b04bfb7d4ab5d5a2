use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashSet;

use crate::entities::{prelude::*, results, searches};
use crate::models::now_timestamp;
use crate::models::result::SearchHit;

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub id: i32,
    pub search_id: i32,
    pub hit: SearchHit,
    pub created_at: String,
}

impl From<results::Model> for ResultRecord {
    fn from(m: results::Model) -> Self {
        Self {
            id: m.id,
            search_id: m.search_id,
            hit: SearchHit {
                title: m.title,
                url: m.url,
                snippet: m.snippet.unwrap_or_default(),
                country: m.country,
                language: m.language,
                date: m.date,
                category: m.category,
                status: m.status,
                source: m.source,
                score: m.score,
                metadata: m.metadata.and_then(|raw| serde_json::from_str(&raw).ok()),
            },
            created_at: m.created_at,
        }
    }
}

/// Partial update of the base fields of a result.
#[derive(Debug, Clone, Default)]
pub struct ResultPatch {
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub date: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub score: Option<i32>,
}

impl ResultPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.snippet.is_none()
            && self.country.is_none()
            && self.language.is_none()
            && self.date.is_none()
            && self.category.is_none()
            && self.status.is_none()
            && self.source.is_none()
            && self.score.is_none()
    }
}

pub struct ResultRepository {
    conn: DatabaseConnection,
}

impl ResultRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn existing_urls(&self, search_id: i32) -> Result<HashSet<String>> {
        let urls: Vec<String> = Results::find()
            .select_only()
            .column(results::Column::Url)
            .filter(results::Column::SearchId.eq(search_id))
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(urls.into_iter().collect())
    }

    /// Stores the hits whose URL is not yet stored for `search_id` and returns
    /// the inserted rows in input order. Rows a concurrent writer stored first
    /// are skipped, so only URLs this call actually added are returned.
    pub async fn insert_new(
        &self,
        search_id: i32,
        hits: &[SearchHit],
    ) -> Result<Vec<ResultRecord>> {
        let mut seen = self.existing_urls(search_id).await?;
        let now = now_timestamp();

        let txn = self.conn.begin().await?;
        let mut inserted = Vec::new();

        for hit in hits {
            if hit.url.is_empty() || !seen.insert(hit.url.clone()) {
                continue;
            }

            let active = results::ActiveModel {
                search_id: Set(search_id),
                title: Set(hit.title.clone()),
                url: Set(hit.url.clone()),
                snippet: Set(Some(hit.snippet.clone()).filter(|s| !s.is_empty())),
                country: Set(hit.country.clone()),
                language: Set(hit.language.clone()),
                date: Set(hit.date.clone()),
                category: Set(hit.category.clone()),
                status: Set(hit.status.clone()),
                source: Set(hit.source.clone()),
                score: Set(hit.score),
                metadata: Set(hit.metadata.as_ref().map(ToString::to_string)),
                created_at: Set(now.clone()),
                ..Default::default()
            };

            let affected = Results::insert(active)
                .on_conflict(
                    OnConflict::columns([results::Column::SearchId, results::Column::Url])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .with_context(|| format!("Failed to store result {}", hit.url))?;
            if affected == 0 {
                continue;
            }

            let model = Results::find()
                .filter(results::Column::SearchId.eq(search_id))
                .filter(results::Column::Url.eq(hit.url.as_str()))
                .one(&txn)
                .await?
                .with_context(|| format!("Stored result {} not found", hit.url))?;
            inserted.push(ResultRecord::from(model));
        }

        txn.commit().await?;
        Ok(inserted)
    }

    pub async fn get(&self, id: i32) -> Result<Option<ResultRecord>> {
        let model = Results::find_by_id(id).one(&self.conn).await?;
        Ok(model.map(ResultRecord::from))
    }

    pub async fn list_for_search(&self, search_id: i32) -> Result<Vec<ResultRecord>> {
        let rows = Results::find()
            .filter(results::Column::SearchId.eq(search_id))
            .order_by_asc(results::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(ResultRecord::from).collect())
    }

    /// Results across all of a user's searches, oldest first.
    pub async fn list_for_user(&self, user_id: i32, limit: u64) -> Result<Vec<ResultRecord>> {
        let rows = Results::find()
            .inner_join(Searches)
            .filter(searches::Column::UserId.eq(user_id))
            .order_by_asc(results::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(ResultRecord::from).collect())
    }

    pub async fn count_for_search(&self, search_id: i32) -> Result<u64> {
        let count = Results::find()
            .filter(results::Column::SearchId.eq(search_id))
            .count(&self.conn)
            .await?;
        Ok(count)
    }

    pub async fn update(&self, id: i32, patch: ResultPatch) -> Result<Option<ResultRecord>> {
        let Some(model) = Results::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(ResultRecord::from(model)));
        }

        let mut active: results::ActiveModel = model.into();
        if let Some(v) = patch.title {
            active.title = Set(v);
        }
        if let Some(v) = patch.snippet {
            active.snippet = Set(Some(v));
        }
        if let Some(v) = patch.country {
            active.country = Set(v);
        }
        if let Some(v) = patch.language {
            active.language = Set(v);
        }
        if let Some(v) = patch.date {
            active.date = Set(v);
        }
        if let Some(v) = patch.category {
            active.category = Set(v);
        }
        if let Some(v) = patch.status {
            active.status = Set(v);
        }
        if let Some(v) = patch.source {
            active.source = Set(v);
        }
        if let Some(v) = patch.score {
            active.score = Set(v);
        }

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update result")?;
        Ok(Some(ResultRecord::from(updated)))
    }
}

//! Tag link models: the many-to-many joins between content and tags.
//!
//! Both link kinds are unique on `(entity, tag)`; attaching an existing
//! pair is a no-op rather than an error, which keeps merge and sync
//! re-runs idempotent.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::TaxonomyResult;

/// Link between a mod and a tag.
///
/// `external_link` carries localization-style pointers for externally
/// hosted translations and is only meaningful when `is_external` is set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModTagLink {
    pub mod_id: Uuid,
    pub tag_id: Uuid,
    pub is_external: bool,
    pub external_link: Option<String>,
}

/// Link between a news post and a tag.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewsTagLink {
    pub news_id: Uuid,
    pub tag_id: Uuid,
}

impl ModTagLink {
    /// Attach a tag to a mod. Returns `true` if a link was created,
    /// `false` if one already existed.
    pub async fn attach(
        pool: &PgPool,
        mod_id: Uuid,
        tag_id: Uuid,
        is_external: bool,
        external_link: Option<&str>,
    ) -> TaxonomyResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO mod_tag (mod_id, tag_id, is_external, external_link)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (mod_id, tag_id) DO NOTHING
            "#,
        )
        .bind(mod_id)
        .bind(tag_id)
        .bind(is_external)
        .bind(external_link)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Detach a tag from a mod.
    pub async fn detach(pool: &PgPool, mod_id: Uuid, tag_id: Uuid) -> TaxonomyResult<bool> {
        let result = sqlx::query("DELETE FROM mod_tag WHERE mod_id = $1 AND tag_id = $2")
            .bind(mod_id)
            .bind(tag_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List the links for a mod.
    pub async fn list_for_mod(pool: &PgPool, mod_id: Uuid) -> TaxonomyResult<Vec<Self>> {
        let links = sqlx::query_as::<_, Self>(
            "SELECT mod_id, tag_id, is_external, external_link FROM mod_tag WHERE mod_id = $1",
        )
        .bind(mod_id)
        .fetch_all(pool)
        .await?;

        Ok(links)
    }

    /// Copy every link pointing at `source_tag` over to `target_tag`,
    /// keeping link attributes and skipping mods already linked to the
    /// target (the curated target link wins on collision).
    ///
    /// Returns the number of links created.
    pub async fn migrate_tx(
        tx: &mut Transaction<'_, Postgres>,
        source_tag: Uuid,
        target_tag: Uuid,
    ) -> TaxonomyResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO mod_tag (mod_id, tag_id, is_external, external_link)
            SELECT mod_id, $2, is_external, external_link
            FROM mod_tag
            WHERE tag_id = $1
            ON CONFLICT (mod_id, tag_id) DO NOTHING
            "#,
        )
        .bind(source_tag)
        .bind(target_tag)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}

impl NewsTagLink {
    /// Attach a tag to a news post. Returns `true` if a link was created.
    pub async fn attach(pool: &PgPool, news_id: Uuid, tag_id: Uuid) -> TaxonomyResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO news_tag (news_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT (news_id, tag_id) DO NOTHING
            "#,
        )
        .bind(news_id)
        .bind(tag_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Detach a tag from a news post.
    pub async fn detach(pool: &PgPool, news_id: Uuid, tag_id: Uuid) -> TaxonomyResult<bool> {
        let result = sqlx::query("DELETE FROM news_tag WHERE news_id = $1 AND tag_id = $2")
            .bind(news_id)
            .bind(tag_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List the links for a news post.
    pub async fn list_for_news(pool: &PgPool, news_id: Uuid) -> TaxonomyResult<Vec<Self>> {
        let links = sqlx::query_as::<_, Self>(
            "SELECT news_id, tag_id FROM news_tag WHERE news_id = $1",
        )
        .bind(news_id)
        .fetch_all(pool)
        .await?;

        Ok(links)
    }

    /// Copy every link pointing at `source_tag` over to `target_tag`,
    /// skipping posts already linked to the target.
    ///
    /// Returns the number of links created.
    pub async fn migrate_tx(
        tx: &mut Transaction<'_, Postgres>,
        source_tag: Uuid,
        target_tag: Uuid,
    ) -> TaxonomyResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO news_tag (news_id, tag_id)
            SELECT news_id, $2
            FROM news_tag
            WHERE tag_id = $1
            ON CONFLICT (news_id, tag_id) DO NOTHING
            "#,
        )
        .bind(source_tag)
        .bind(target_tag)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn mod_link_serialization() {
        let link = ModTagLink {
            mod_id: Uuid::nil(),
            tag_id: Uuid::nil(),
            is_external: true,
            external_link: Some("https://translate.example.com/mods/1".to_string()),
        };

        let json = serde_json::to_string(&link).unwrap();
        assert!(json.contains("translate.example.com"));

        let parsed: ModTagLink = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_external);
    }

    #[test]
    fn news_link_serialization() {
        let link = NewsTagLink {
            news_id: Uuid::nil(),
            tag_id: Uuid::nil(),
        };

        let json = serde_json::to_string(&link).unwrap();
        let parsed: NewsTagLink = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.news_id, Uuid::nil());
    }
}

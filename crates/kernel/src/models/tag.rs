//! Tag model and CRUD operations.
//!
//! Tags are the shared vocabulary of the site: categorized labels attached
//! to mods and news posts. `(category, value)` is unique; `value` is the
//! machine key (e.g. `1_10`) and `display_name` the human label (`V1.10`).

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{TaxonomyError, TaxonomyResult};
use crate::services::color;

/// Category holding game-version tags, colored by the gradient engine.
pub const GAMEVER_CATEGORY: &str = "gamever";

/// Category holding author tags, recolored to one constant by the sync job.
pub const AUTHOR_CATEGORY: &str = "author";

/// Navigational categories excluded from category-less popularity queries.
pub const SYSTEM_CATEGORIES: [&str; 5] = ["gamever", "author", "status", "lang", "newscat"];

/// A categorized label attachable to mods and news posts.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Free-form namespace (`gamever`, `author`, `lang`, `status`, `tag`,
    /// `newscat`, ...).
    pub category: String,

    /// Machine-normalized key, unique within its category.
    pub value: String,

    /// Human-readable label.
    pub display_name: String,

    /// Hex color (`#rrggbb`). `gamever` tags stay uncolored until the
    /// gradient engine runs.
    pub color: Option<String>,

    /// Marks externally sourced tags.
    pub is_external: bool,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// Input for creating a tag.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTag {
    pub category: String,
    pub value: String,
    pub display_name: String,
    pub color: Option<String>,
}

/// Input for updating a tag. Unset fields keep their current values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTag {
    pub category: Option<String>,
    pub value: Option<String>,
    pub display_name: Option<String>,
    pub color: Option<String>,
}

/// A tag together with its derived usage count.
///
/// The count is computed per query from the link tables, never cached
/// across a mutation.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TagWithUsage {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub tag: Tag,
    pub usage_count: i64,
}

const TAG_COLUMNS: &str = "id, category, value, display_name, color, is_external, created, changed";

impl Tag {
    /// Find a tag by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> TaxonomyResult<Option<Self>> {
        let tag = sqlx::query_as::<_, Self>(
            "SELECT id, category, value, display_name, color, is_external, created, changed \
             FROM tag WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(tag)
    }

    /// Find a tag by its unique `(category, value)` pair.
    pub async fn find_by_key(
        pool: &PgPool,
        category: &str,
        value: &str,
    ) -> TaxonomyResult<Option<Self>> {
        let tag = sqlx::query_as::<_, Self>(
            "SELECT id, category, value, display_name, color, is_external, created, changed \
             FROM tag WHERE category = $1 AND value = $2",
        )
        .bind(category)
        .bind(value)
        .fetch_optional(pool)
        .await?;

        Ok(tag)
    }

    /// Find a tag by `(category, value)` within a transaction.
    pub async fn find_by_key_tx(
        tx: &mut Transaction<'_, Postgres>,
        category: &str,
        value: &str,
    ) -> TaxonomyResult<Option<Self>> {
        let tag = sqlx::query_as::<_, Self>(
            "SELECT id, category, value, display_name, color, is_external, created, changed \
             FROM tag WHERE category = $1 AND value = $2",
        )
        .bind(category)
        .bind(value)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(tag)
    }

    /// List all tags in a category, alphabetical by display name.
    pub async fn list_by_category(pool: &PgPool, category: &str) -> TaxonomyResult<Vec<Self>> {
        let tags = sqlx::query_as::<_, Self>(
            "SELECT id, category, value, display_name, color, is_external, created, changed \
             FROM tag WHERE category = $1 ORDER BY display_name",
        )
        .bind(category)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    /// List all tags in a category within a transaction.
    pub async fn list_by_category_tx(
        tx: &mut Transaction<'_, Postgres>,
        category: &str,
    ) -> TaxonomyResult<Vec<Self>> {
        let tags = sqlx::query_as::<_, Self>(
            "SELECT id, category, value, display_name, color, is_external, created, changed \
             FROM tag WHERE category = $1 ORDER BY display_name",
        )
        .bind(category)
        .fetch_all(&mut **tx)
        .await?;

        Ok(tags)
    }

    /// Create a new tag.
    ///
    /// Fails with `DuplicateKey` if `(category, value)` already exists.
    /// When no color is given, non-`gamever` tags get the deterministic
    /// palette default; `gamever` tags are left for the gradient engine.
    pub async fn create(pool: &PgPool, input: CreateTag) -> TaxonomyResult<Self> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp();

        let tag_color = match input.color {
            Some(c) => Some(c),
            None if input.category != GAMEVER_CATEGORY => {
                Some(color::default_color(&input.category, &input.value))
            }
            None => None,
        };

        let tag = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO tag (id, category, value, display_name, color, is_external, created, changed)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6)
            RETURNING id, category, value, display_name, color, is_external, created, changed
            "#,
        )
        .bind(id)
        .bind(&input.category)
        .bind(&input.value)
        .bind(&input.display_name)
        .bind(&tag_color)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| TaxonomyError::on_unique_violation(e, &input.category, &input.value))?;

        Ok(tag)
    }

    /// Update a tag. Returns `None` if the tag does not exist.
    pub async fn update(pool: &PgPool, id: Uuid, input: UpdateTag) -> TaxonomyResult<Option<Self>> {
        let now = chrono::Utc::now().timestamp();

        let Some(current) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let category = input.category.unwrap_or(current.category);
        let value = input.value.unwrap_or(current.value);
        let display_name = input.display_name.unwrap_or(current.display_name);
        let tag_color = input.color.or(current.color);

        let tag = sqlx::query_as::<_, Self>(
            r#"
            UPDATE tag
            SET category = $1, value = $2, display_name = $3, color = $4, changed = $5
            WHERE id = $6
            RETURNING id, category, value, display_name, color, is_external, created, changed
            "#,
        )
        .bind(&category)
        .bind(&value)
        .bind(&display_name)
        .bind(&tag_color)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|e| TaxonomyError::on_unique_violation(e, &category, &value))?;

        Ok(Some(tag))
    }

    /// Delete a tag and all links referencing it, in one transaction.
    pub async fn delete(pool: &PgPool, id: Uuid) -> TaxonomyResult<bool> {
        let mut tx = pool.begin().await?;
        let deleted = Self::delete_tx(&mut tx, id).await?;
        tx.commit().await?;

        Ok(deleted)
    }

    /// Delete a tag within a transaction, links first.
    ///
    /// Links are removed explicitly rather than relying on the store's
    /// cascade, inside the same transaction as the tag row.
    pub async fn delete_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> TaxonomyResult<bool> {
        sqlx::query("DELETE FROM mod_tag WHERE tag_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        sqlx::query("DELETE FROM news_tag WHERE tag_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        let result = sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Case-insensitive substring search on display name within a category.
    ///
    /// An empty or whitespace query returns no results rather than all tags.
    pub async fn search(
        pool: &PgPool,
        query: &str,
        category: &str,
        limit: i64,
    ) -> TaxonomyResult<Vec<Self>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", escape_like(query));

        let tags = sqlx::query_as::<_, Self>(
            "SELECT id, category, value, display_name, color, is_external, created, changed \
             FROM tag WHERE category = $1 AND display_name ILIKE $2 \
             ORDER BY display_name LIMIT $3",
        )
        .bind(category)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    /// List tags by descending usage count.
    ///
    /// With no category, the navigational system categories are excluded
    /// so that only descriptive tags surface.
    pub async fn popular(
        pool: &PgPool,
        category: Option<&str>,
        limit: i64,
    ) -> TaxonomyResult<Vec<TagWithUsage>> {
        let tags = match category {
            Some(category) => {
                sqlx::query_as::<_, TagWithUsage>(&popular_sql("t.category = $1"))
                    .bind(category)
                    .bind(limit)
                    .fetch_all(pool)
                    .await?
            }
            None => {
                let excluded: Vec<String> =
                    SYSTEM_CATEGORIES.iter().map(|c| c.to_string()).collect();

                sqlx::query_as::<_, TagWithUsage>(&popular_sql("t.category <> ALL($1)"))
                    .bind(excluded)
                    .bind(limit)
                    .fetch_all(pool)
                    .await?
            }
        };

        Ok(tags)
    }

    /// Count the links referencing a tag, across both link tables.
    pub async fn usage_count(pool: &PgPool, id: Uuid) -> TaxonomyResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM mod_tag WHERE tag_id = $1) \
                  + (SELECT COUNT(*) FROM news_tag WHERE tag_id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// List the tags attached to a mod, alphabetical.
    pub async fn for_mod(pool: &PgPool, mod_id: Uuid) -> TaxonomyResult<Vec<Self>> {
        let tags = sqlx::query_as::<_, Self>(
            r#"
            SELECT t.id, t.category, t.value, t.display_name, t.color, t.is_external, t.created, t.changed
            FROM tag t
            INNER JOIN mod_tag mt ON mt.tag_id = t.id
            WHERE mt.mod_id = $1
            ORDER BY t.category, t.display_name
            "#,
        )
        .bind(mod_id)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    /// List the tags attached to a news post, alphabetical.
    pub async fn for_news(pool: &PgPool, news_id: Uuid) -> TaxonomyResult<Vec<Self>> {
        let tags = sqlx::query_as::<_, Self>(
            r#"
            SELECT t.id, t.category, t.value, t.display_name, t.color, t.is_external, t.created, t.changed
            FROM tag t
            INNER JOIN news_tag nt ON nt.tag_id = t.id
            WHERE nt.news_id = $1
            ORDER BY t.category, t.display_name
            "#,
        )
        .bind(news_id)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }
}

fn popular_sql(filter: &str) -> String {
    format!(
        "SELECT {TAG_COLUMNS}, usage_count FROM ( \
             SELECT t.id, t.category, t.value, t.display_name, t.color, t.is_external, \
                    t.created, t.changed, \
                    COALESCE(m.uses, 0) + COALESCE(n.uses, 0) AS usage_count \
             FROM tag t \
             LEFT JOIN (SELECT tag_id, COUNT(*) AS uses FROM mod_tag GROUP BY tag_id) m \
                    ON m.tag_id = t.id \
             LEFT JOIN (SELECT tag_id, COUNT(*) AS uses FROM news_tag GROUP BY tag_id) n \
                    ON n.tag_id = t.id \
             WHERE {filter} \
         ) ranked \
         ORDER BY usage_count DESC, display_name LIMIT $2"
    )
}

/// Escape LIKE metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

//! Taxonomy service: the tag registry surface and category lifecycle
//! operations, with per-category caching.
//!
//! Every multi-step mutation (merge, rename, category delete) runs inside a
//! single transaction; a partially migrated merge must never be observable.
//! Mutations that can change the membership or ordering of the `gamever`
//! category recompute the version gradient before returning, so callers
//! cannot forget the side effect.

use std::sync::Arc;

use dashmap::DashMap;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{TaxonomyError, TaxonomyResult};
use crate::models::link::{ModTagLink, NewsTagLink};
use crate::models::tag::{CreateTag, GAMEVER_CATEGORY, Tag, TagWithUsage, UpdateTag};
use crate::services::{color, version};

/// Service owning tag registry and category lifecycle operations.
pub struct TaxonomyService {
    pool: PgPool,
    /// Cache: category -> tags in that category, alphabetical.
    tag_cache: DashMap<String, Vec<Tag>>,
}

impl TaxonomyService {
    /// Create a new TaxonomyService.
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self {
            pool,
            tag_cache: DashMap::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Tag registry
    // -------------------------------------------------------------------------

    /// Create a new tag.
    ///
    /// Fails with `DuplicateKey` if `(category, value)` is taken. Creating
    /// a `gamever` tag recomputes the gradient over the enlarged set.
    pub async fn create_tag(&self, input: CreateTag) -> TaxonomyResult<Tag> {
        let tag = Tag::create(&self.pool, input).await?;
        self.invalidate(&tag.category);

        info!(category = %tag.category, value = %tag.value, "created tag");

        if tag.category == GAMEVER_CATEGORY {
            self.recalculate_game_version_colors().await?;

            // The recompute may have assigned this tag its gradient color.
            let tag = Tag::find_by_id(&self.pool, tag.id)
                .await?
                .ok_or(TaxonomyError::NotFound)?;
            return Ok(tag);
        }

        Ok(tag)
    }

    /// Update a tag.
    ///
    /// Fails with `NotFound` if the tag does not exist. Any update touching
    /// the `gamever` category (moving in, out, or changing a value within
    /// it) recomputes the gradient before returning.
    pub async fn update_tag(&self, id: Uuid, patch: UpdateTag) -> TaxonomyResult<Tag> {
        let current = Tag::find_by_id(&self.pool, id)
            .await?
            .ok_or(TaxonomyError::NotFound)?;

        let updated = Tag::update(&self.pool, id, patch)
            .await?
            .ok_or(TaxonomyError::NotFound)?;

        self.invalidate(&current.category);
        self.invalidate(&updated.category);

        if current.category == GAMEVER_CATEGORY || updated.category == GAMEVER_CATEGORY {
            self.recalculate_game_version_colors().await?;
        }

        Ok(updated)
    }

    /// Delete a tag, cascading its links, in one transaction.
    ///
    /// Fails with `NotFound` if the tag does not exist. Deleting a
    /// `gamever` tag recomputes the gradient over the remaining set.
    pub async fn delete_tag(&self, id: Uuid) -> TaxonomyResult<()> {
        let tag = Tag::find_by_id(&self.pool, id)
            .await?
            .ok_or(TaxonomyError::NotFound)?;

        Tag::delete(&self.pool, id).await?;
        self.invalidate(&tag.category);

        info!(category = %tag.category, value = %tag.value, "deleted tag");

        if tag.category == GAMEVER_CATEGORY {
            self.recalculate_game_version_colors().await?;
        }

        Ok(())
    }

    /// List tags in a category, with caching.
    pub async fn fetch_tags_by_category(&self, category: &str) -> TaxonomyResult<Vec<Tag>> {
        if let Some(tags) = self.tag_cache.get(category) {
            return Ok(tags.clone());
        }

        let tags = Tag::list_by_category(&self.pool, category).await?;
        self.tag_cache.insert(category.to_string(), tags.clone());

        Ok(tags)
    }

    /// Case-insensitive substring search on display name within a category.
    ///
    /// An empty query returns no results; this is a guard against unranked
    /// full scans from autocomplete callers.
    pub async fn search_tags(
        &self,
        query: &str,
        category: &str,
        limit: i64,
    ) -> TaxonomyResult<Vec<Tag>> {
        Tag::search(&self.pool, query, category, limit).await
    }

    /// List tags by descending usage count.
    pub async fn fetch_popular_tags(
        &self,
        category: Option<&str>,
        limit: i64,
    ) -> TaxonomyResult<Vec<TagWithUsage>> {
        Tag::popular(&self.pool, category, limit).await
    }

    /// Count the links referencing a tag.
    pub async fn usage_count(&self, id: Uuid) -> TaxonomyResult<i64> {
        Tag::usage_count(&self.pool, id).await
    }

    /// Find a tag by `(category, value)`, creating it if absent.
    ///
    /// Returns the tag and whether it was created. Losing a concurrent
    /// create race is treated as "already exists". Used by the sync job,
    /// which defers the gradient recompute to its final step.
    pub async fn ensure_tag(
        &self,
        category: &str,
        value: &str,
        display_name: &str,
    ) -> TaxonomyResult<(Tag, bool)> {
        if let Some(tag) = Tag::find_by_key(&self.pool, category, value).await? {
            return Ok((tag, false));
        }

        let input = CreateTag {
            category: category.to_string(),
            value: value.to_string(),
            display_name: display_name.to_string(),
            color: None,
        };

        match Tag::create(&self.pool, input).await {
            Ok(tag) => {
                self.invalidate(category);
                debug!(category, value, "created tag during sync");
                Ok((tag, true))
            }
            Err(TaxonomyError::DuplicateKey { .. }) => {
                let tag = Tag::find_by_key(&self.pool, category, value)
                    .await?
                    .ok_or(TaxonomyError::NotFound)?;
                Ok((tag, false))
            }
            Err(e) => Err(e),
        }
    }

    // -------------------------------------------------------------------------
    // Category lifecycle
    // -------------------------------------------------------------------------

    /// Merge one tag into another: migrate every link, then delete the
    /// source, as a single atomic unit.
    ///
    /// Links whose entity is already linked to the target are dropped
    /// without touching the target link, so curated link metadata survives.
    /// Fails with `InvalidMerge` on self-merge or cross-category merge and
    /// `NotFound` if either tag is absent.
    pub async fn merge_tags(&self, source_id: Uuid, target_id: Uuid) -> TaxonomyResult<()> {
        if source_id == target_id {
            return Err(TaxonomyError::InvalidMerge(
                "a tag cannot be merged into itself".to_string(),
            ));
        }

        let source = Tag::find_by_id(&self.pool, source_id)
            .await?
            .ok_or(TaxonomyError::NotFound)?;
        let target = Tag::find_by_id(&self.pool, target_id)
            .await?
            .ok_or(TaxonomyError::NotFound)?;

        if source.category != target.category {
            return Err(TaxonomyError::InvalidMerge(format!(
                "cannot merge `{}` (category `{}`) into `{}` (category `{}`)",
                source.display_name, source.category, target.display_name, target.category
            )));
        }

        let mut tx = self.pool.begin().await?;
        let (mod_links, news_links) = merge_into_tx(&mut tx, source_id, target_id).await?;
        tx.commit().await?;

        self.invalidate(&source.category);

        info!(
            source = %source.display_name,
            target = %target.display_name,
            mod_links,
            news_links,
            "merged tags"
        );

        if source.category == GAMEVER_CATEGORY {
            self.recalculate_game_version_colors().await?;
        }

        Ok(())
    }

    /// Rename a category, merging per value where the new name already has
    /// tags.
    ///
    /// With no collisions this is a pure bulk field update. Otherwise each
    /// source tag whose `value` exists under the new category is merged
    /// into its counterpart and the rest move in place. The whole rename is
    /// one transaction; renaming an empty or absent category is a no-op.
    ///
    /// Returns the number of tags moved or merged.
    pub async fn rename_category(&self, old: &str, new: &str) -> TaxonomyResult<u64> {
        if old == new {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let target_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tag WHERE category = $1)")
                .bind(new)
                .fetch_one(&mut *tx)
                .await?;

        let moved = if !target_exists {
            sqlx::query("UPDATE tag SET category = $1, changed = $2 WHERE category = $3")
                .bind(new)
                .bind(now)
                .bind(old)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            let sources = Tag::list_by_category_tx(&mut tx, old).await?;
            let mut moved = 0;

            for source in sources {
                match Tag::find_by_key_tx(&mut tx, new, &source.value).await? {
                    Some(target) => {
                        // Cross-category by construction; the public
                        // merge guard does not apply inside a rename.
                        merge_into_tx(&mut tx, source.id, target.id).await?;
                    }
                    None => {
                        sqlx::query("UPDATE tag SET category = $1, changed = $2 WHERE id = $3")
                            .bind(new)
                            .bind(now)
                            .bind(source.id)
                            .execute(&mut *tx)
                            .await?;
                    }
                }
                moved += 1;
            }

            moved
        };

        // Every source tag was merged or moved; the old category must be
        // empty now.
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tag WHERE category = $1")
            .bind(old)
            .fetch_one(&mut *tx)
            .await?;
        if remaining > 0 {
            warn!(category = old, remaining, "rename left tags behind");
        }

        tx.commit().await?;

        self.invalidate(old);
        self.invalidate(new);

        info!(old, new, moved, "renamed category");

        if old == GAMEVER_CATEGORY || new == GAMEVER_CATEGORY {
            self.recalculate_game_version_colors().await?;
        }

        Ok(moved)
    }

    /// Delete every tag in a category, links first, in one transaction.
    ///
    /// Deleting an empty or absent category is a no-op. Returns the number
    /// of tags removed.
    pub async fn delete_category(&self, category: &str) -> TaxonomyResult<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM mod_tag WHERE tag_id IN (SELECT id FROM tag WHERE category = $1)",
        )
        .bind(category)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM news_tag WHERE tag_id IN (SELECT id FROM tag WHERE category = $1)",
        )
        .bind(category)
        .execute(&mut *tx)
        .await?;

        let removed = sqlx::query("DELETE FROM tag WHERE category = $1")
            .bind(category)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        self.invalidate(category);

        info!(category, removed, "deleted category");

        if category == GAMEVER_CATEGORY {
            // No-op recompute over the now-empty set.
            self.recalculate_game_version_colors().await?;
        }

        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Gradient color engine
    // -------------------------------------------------------------------------

    /// Recompute the color gradient across the `gamever` category.
    ///
    /// Tags are sorted by the numeric version comparator; rank `i` of `n`
    /// interpolates between the oldest and newest endpoint colors. Only
    /// tags whose stored color differs are written, so a second consecutive
    /// run performs zero writes. Returns the `(tag, color)` pairs written.
    pub async fn recalculate_game_version_colors(
        &self,
    ) -> TaxonomyResult<Vec<(Uuid, String)>> {
        let mut tags = Tag::list_by_category(&self.pool, GAMEVER_CATEGORY).await?;
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        tags.sort_by(|a, b| version::compare_versions(&a.value, &b.value));

        let total = tags.len();
        let mut updates = Vec::new();
        for (rank, tag) in tags.iter().enumerate() {
            let gradient = color::gradient_color(rank, total);
            if tag.color.as_deref() != Some(gradient.as_str()) {
                updates.push((tag.id, gradient));
            }
        }

        if updates.is_empty() {
            debug!(total, "game version colors already current");
            return Ok(updates);
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        for (id, gradient) in &updates {
            sqlx::query("UPDATE tag SET color = $1, changed = $2 WHERE id = $3")
                .bind(gradient)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.invalidate(GAMEVER_CATEGORY);

        info!(updated = updates.len(), total, "recalculated game version colors");

        Ok(updates)
    }

    /// Set every tag in a category to one constant color.
    ///
    /// Write-minimized: rows already carrying the color are untouched.
    /// Returns the number of tags updated.
    pub async fn recolor_category(&self, category: &str, to: &str) -> TaxonomyResult<u64> {
        let now = chrono::Utc::now().timestamp();

        let updated = sqlx::query(
            "UPDATE tag SET color = $1, changed = $2 \
             WHERE category = $3 AND color IS DISTINCT FROM $1",
        )
        .bind(to)
        .bind(now)
        .bind(category)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated > 0 {
            self.invalidate(category);
            info!(category, updated, color = to, "recolored category");
        }

        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // Cache management
    // -------------------------------------------------------------------------

    /// Invalidate the cached tag list for a category.
    pub fn invalidate(&self, category: &str) {
        self.tag_cache.remove(category);
    }

    /// Clear all cached tag lists.
    pub fn clear_cache(&self) {
        self.tag_cache.clear();
    }
}

/// Migrate both link kinds from `source` to `target`, then delete the
/// source tag (remaining source links included) within the transaction.
///
/// Returns the `(mod, news)` link counts created on the target.
async fn merge_into_tx(
    tx: &mut Transaction<'_, Postgres>,
    source_id: Uuid,
    target_id: Uuid,
) -> TaxonomyResult<(u64, u64)> {
    let mod_links = ModTagLink::migrate_tx(tx, source_id, target_id).await?;
    let news_links = NewsTagLink::migrate_tx(tx, source_id, target_id).await?;

    Tag::delete_tx(tx, source_id).await?;

    Ok((mod_links, news_links))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_cache_types() {
        let cache: DashMap<String, Vec<Tag>> = DashMap::new();
        cache.insert("gamever".to_string(), Vec::new());
        assert!(cache.get("gamever").is_some());
    }
}

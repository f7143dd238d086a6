//! Minimal projections of content records consumed by the tag engine.
//!
//! Mods are the source of truth for which game versions exist. The sync
//! job reads their raw version strings and writes normalized forms back;
//! the full mod and news schemas live with the content editors.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::TaxonomyResult;

/// The version-bearing slice of a mod record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModVersion {
    pub id: Uuid,
    pub game_version: String,
}

impl ModVersion {
    /// List every mod's id and raw game-version text.
    pub async fn list(pool: &PgPool) -> TaxonomyResult<Vec<Self>> {
        let mods =
            sqlx::query_as::<_, Self>("SELECT id, game_version FROM mod_listing ORDER BY id")
                .fetch_all(pool)
                .await?;

        Ok(mods)
    }

    /// Persist a normalized game-version string back onto a mod record.
    pub async fn set_game_version(pool: &PgPool, id: Uuid, version: &str) -> TaxonomyResult<()> {
        sqlx::query("UPDATE mod_listing SET game_version = $1 WHERE id = $2")
            .bind(version)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

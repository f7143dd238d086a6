//! Batch reconciliation of tags against the current set of mods.
//!
//! Mods are the source of truth for which game versions exist. The sync
//! job normalizes their version strings, materializes `gamever` tags,
//! links mods to them, and recolors the `author` and `gamever`
//! categories. It is best-effort: one malformed record must not block
//! reconciliation of the rest, so per-record failures land in the report
//! instead of aborting the batch.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::content::ModVersion;
use crate::models::link::ModTagLink;
use crate::models::tag::{AUTHOR_CATEGORY, GAMEVER_CATEGORY};
use crate::services::color::AUTHOR_COLOR;
use crate::services::taxonomy::TaxonomyService;
use crate::services::version;

/// Outcome of one `sync_all_tags` run.
///
/// A second run over an unchanged content set reports every counter zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub game_versions_normalized: u64,
    pub gamever_tags_created: u64,
    pub gamever_links_created: u64,
    pub author_tags_updated: u64,
    pub gamever_colors_updated: u64,
    /// Per-record failures; the batch continues past them.
    pub errors: Vec<String>,
}

impl SyncReport {
    /// True when the run changed nothing and hit no errors.
    pub fn is_noop(&self) -> bool {
        self.game_versions_normalized == 0
            && self.gamever_tags_created == 0
            && self.gamever_links_created == 0
            && self.author_tags_updated == 0
            && self.gamever_colors_updated == 0
            && self.errors.is_empty()
    }
}

/// Service running the on-demand tag reconciliation job.
pub struct SyncService {
    pool: PgPool,
    taxonomy: Arc<TaxonomyService>,
}

impl SyncService {
    /// Create a new SyncService.
    pub fn new(pool: PgPool, taxonomy: Arc<TaxonomyService>) -> Self {
        Self { pool, taxonomy }
    }

    /// Reconcile tag state against the current set of mods.
    ///
    /// Runs five steps in order: normalize stored version strings, ensure
    /// a `gamever` tag per distinct version, ensure a link per mod,
    /// recolor authors to the constant color, and recompute the version
    /// gradient. Each record's work is its own small statement; no lock is
    /// held across the run.
    pub async fn sync_all_tags(&self) -> SyncReport {
        let mut report = SyncReport::default();

        // Step 1: normalize every mod's raw version text, persisting
        // changed forms back onto the mod record.
        let mods = match ModVersion::list(&self.pool).await {
            Ok(mods) => mods,
            Err(e) => {
                warn!(error = %e, "failed to load mods; skipping version sync");
                report.errors.push(format!("loading mods: {e}"));
                Vec::new()
            }
        };

        let mut normalized_mods: Vec<(Uuid, String)> = Vec::with_capacity(mods.len());
        for record in mods {
            let normalized = version::normalize_version(&record.game_version);
            if normalized != record.game_version {
                match ModVersion::set_game_version(&self.pool, record.id, &normalized).await {
                    Ok(()) => report.game_versions_normalized += 1,
                    Err(e) => {
                        warn!(mod_id = %record.id, error = %e, "failed to persist normalized version");
                        report
                            .errors
                            .push(format!("normalizing mod {}: {e}", record.id));
                    }
                }
            }
            // Tags and links target the normalized form either way.
            normalized_mods.push((record.id, normalized));
        }

        // Step 2: ensure a gamever tag per distinct normalized version.
        let versions: BTreeSet<&str> = normalized_mods
            .iter()
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
            .collect();

        let mut tag_ids: HashMap<String, Uuid> = HashMap::new();
        for ver in versions {
            let value = version::version_value(ver);
            if value.is_empty() {
                continue;
            }

            match self
                .taxonomy
                .ensure_tag(GAMEVER_CATEGORY, &value, ver)
                .await
            {
                Ok((tag, created)) => {
                    if created {
                        report.gamever_tags_created += 1;
                    }
                    tag_ids.insert(ver.to_string(), tag.id);
                }
                Err(e) => {
                    warn!(version = ver, error = %e, "failed to ensure game version tag");
                    report
                        .errors
                        .push(format!("ensuring tag for {ver}: {e}"));
                }
            }
        }

        // Step 3: ensure a link per mod to its version tag.
        for (mod_id, display) in &normalized_mods {
            let Some(tag_id) = tag_ids.get(display.as_str()) else {
                continue;
            };

            match ModTagLink::attach(&self.pool, *mod_id, *tag_id, false, None).await {
                Ok(true) => report.gamever_links_created += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(mod_id = %mod_id, error = %e, "failed to link mod to game version");
                    report.errors.push(format!("linking mod {mod_id}: {e}"));
                }
            }
        }

        // Step 4: authors are unordered, so no gradient; one constant color.
        match self
            .taxonomy
            .recolor_category(AUTHOR_CATEGORY, AUTHOR_COLOR)
            .await
        {
            Ok(updated) => report.author_tags_updated = updated,
            Err(e) => {
                warn!(error = %e, "failed to recolor author tags");
                report.errors.push(format!("recoloring authors: {e}"));
            }
        }

        // Step 5: gradient recompute over the full gamever category.
        match self.taxonomy.recalculate_game_version_colors().await {
            Ok(updates) => report.gamever_colors_updated = updates.len() as u64,
            Err(e) => {
                warn!(error = %e, "failed to recalculate game version colors");
                report.errors.push(format!("recalculating colors: {e}"));
            }
        }

        info!(
            normalized = report.game_versions_normalized,
            tags_created = report.gamever_tags_created,
            links_created = report.gamever_links_created,
            authors_updated = report.author_tags_updated,
            colors_updated = report.gamever_colors_updated,
            errors = report.errors.len(),
            "tag sync complete"
        );

        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn fresh_report_is_noop() {
        let report = SyncReport::default();
        assert!(report.is_noop());
    }

    #[test]
    fn any_counter_breaks_noop() {
        let report = SyncReport {
            gamever_links_created: 1,
            ..SyncReport::default()
        };
        assert!(!report.is_noop());

        let report = SyncReport {
            errors: vec!["loading mods: connection refused".to_string()],
            ..SyncReport::default()
        };
        assert!(!report.is_noop());
    }

    #[test]
    fn report_serialization() {
        let report = SyncReport {
            game_versions_normalized: 3,
            gamever_tags_created: 2,
            ..SyncReport::default()
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"game_versions_normalized\":3"));
        assert!(json.contains("\"errors\":[]"));
    }
}

//! Cache command - inspect or clear the persistent transform cache

use crate::cache::{FsCacheStore, StoreStats};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager, ProjectPaths};
use crate::error::CssModResult;
use crate::ui::{self, format_bytes, TaskSpinner, UiContext};
use serde::Serialize;
use std::path::Path;

/// Execute the cache command
pub async fn execute(args: CacheArgs, manager: &ConfigManager, config: &Config) -> CssModResult<()> {
    let paths = ProjectPaths::resolve(manager.project_root(), &config.project);
    let store = FsCacheStore::new(&paths.cache_directory);

    match args.action {
        CacheAction::Info { format } => show_info(&store, format).await,
        CacheAction::Clear { yes } => clear_cache(&store, yes).await,
    }
}

async fn show_info(store: &FsCacheStore, format: OutputFormat) -> CssModResult<()> {
    let stats = store.stats().await?;

    match format {
        OutputFormat::Json => print_info_json(store.root(), &stats)?,
        OutputFormat::Plain => print_info_plain(store.root(), &stats),
    }

    Ok(())
}

fn print_info_json(root: &Path, stats: &StoreStats) -> CssModResult<()> {
    #[derive(Serialize)]
    struct InfoJson<'a> {
        location: &'a Path,
        #[serde(flatten)]
        stats: &'a StoreStats,
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&InfoJson {
            location: root,
            stats
        })?
    );
    Ok(())
}

fn print_info_plain(root: &Path, stats: &StoreStats) {
    let ctx = UiContext::detect();
    let last_written = stats
        .last_written
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());

    ui::key_value(&ctx, "Location", &root.display().to_string());
    ui::key_value(&ctx, "Entries", &stats.entries.to_string());
    ui::key_value(&ctx, "Size", &format_bytes(stats.bytes));
    ui::key_value(&ctx, "Last written", &last_written);
}

async fn clear_cache(store: &FsCacheStore, yes: bool) -> CssModResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let stats = store.stats().await?;

    if stats.entries == 0 {
        ui::step_info(&ctx, "Cache is already empty");
        return Ok(());
    }

    let prompt = format!(
        "Remove {} cache entries ({})?",
        stats.entries,
        format_bytes(stats.bytes)
    );
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn_hint(&ctx, "Cache left untouched", "Pass --yes to clear without asking");
        return Ok(());
    }

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Clearing cache...");
    let removed = store.clear().await?;
    spinner.stop(&format!("Removed {} cache entries", removed));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, CacheKey, CacheStore, ContentDigest};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    async fn seeded_store(temp: &TempDir) -> FsCacheStore {
        let store = FsCacheStore::new(temp.path());
        let entry = CacheEntry {
            digest: ContentDigest::of(b".foo{}"),
            class_map: BTreeMap::new(),
            output_text: ".foo{}".to_string(),
        };
        let key = CacheKey::for_path(temp.path(), &temp.path().join("app/a.module.css"));
        store.put(&key, &entry).await;
        store
    }

    #[tokio::test]
    async fn clear_requires_confirmation() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp).await;

        clear_cache(&store, false).await.unwrap();
        assert_eq!(store.stats().await.unwrap().entries, 1);

        clear_cache(&store, true).await.unwrap();
        assert_eq!(store.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn info_on_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = FsCacheStore::new(temp.path());

        show_info(&store, OutputFormat::Plain).await.unwrap();
        show_info(&store, OutputFormat::Json).await.unwrap();
    }
}

//! One crawl cycle: fetch, dedup, extract, normalize, enrich, persist
//!
//! Categories are processed sequentially, and within a category each enabled
//! language in turn. A failed search aborts only the current category. A
//! failure on one item is recorded and the cycle moves on.

use crate::config::{CrawlConfig, SaveStrategy};
use crate::crawler::status::{CycleReport, CycleStats, ErrorEntry};
use crate::dedup::{self, SaveDecision, SeenItems};
use crate::extract::{extract_content, ExtractContext};
use crate::models::{NewsRecord, RawWireItem};
use crate::normalize::{map_category, normalize_external_id, normalize_item, slugify};
use crate::services::{merge_enhancement, ContentEnhancer, PhotoSearch};
use crate::storage::{lock_storage, SharedStorage, TriggerKind};
use crate::wire::WireClient;
use crate::{IngestError, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Everything a cycle talks to
pub struct Pipeline {
    pub client: WireClient,
    pub storage: SharedStorage,
    pub enhancer: Option<Arc<dyn ContentEnhancer>>,
    pub photo_search: Option<Arc<dyn PhotoSearch>>,
}

impl Pipeline {
    pub fn new(client: WireClient, storage: SharedStorage) -> Self {
        Self {
            client,
            storage,
            enhancer: None,
            photo_search: None,
        }
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn ContentEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn with_photo_search(mut self, photo_search: Arc<dyn PhotoSearch>) -> Self {
        self.photo_search = Some(photo_search);
        self
    }
}

/// How one item ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Inserted,
    Overwritten,
    Duplicate,
}

/// Serializes the crawl configuration and hashes it
pub fn config_snapshot(config: &CrawlConfig) -> Result<(String, String)> {
    let snapshot = serde_json::to_string(config)?;
    let mut hasher = Sha256::new();
    hasher.update(snapshot.as_bytes());
    Ok((snapshot, hex::encode(hasher.finalize())))
}

/// Runs one full cycle and persists it as a run record
pub async fn run_cycle(
    pipeline: &Pipeline,
    config: &CrawlConfig,
    trigger: TriggerKind,
) -> Result<CycleReport> {
    let started_at = Utc::now();
    let (snapshot, hash) = config_snapshot(config)?;
    let run_id = lock_storage(&pipeline.storage)?.create_run(trigger, &snapshot, &hash)?;

    tracing::info!(
        "Starting {} crawl cycle {} over {} categories",
        trigger.to_db_string(),
        run_id,
        config.categories.len()
    );

    let mut stats = CycleStats::default();
    let mut seen = SeenItems::new();

    for &category in &config.categories {
        process_category(pipeline, config, category, &mut seen, &mut stats).await;
    }

    lock_storage(&pipeline.storage)?.complete_run(run_id, &stats)?;

    tracing::info!(
        "Cycle {} finished: processed={}, success={}, duplicates={}, errors={}",
        run_id,
        stats.total_processed,
        stats.success,
        stats.duplicates,
        stats.error_count()
    );

    Ok(CycleReport {
        run_id,
        trigger,
        started_at,
        finished_at: Utc::now(),
        stats,
    })
}

async fn process_category(
    pipeline: &Pipeline,
    config: &CrawlConfig,
    category: i64,
    seen: &mut SeenItems,
    stats: &mut CycleStats,
) {
    for &language in config.languages_for(category) {
        let items = match pipeline
            .client
            .fetch_batch(category, language, 0, config.batch_size)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(
                    "Category {} (language {}) aborted for this cycle: {}",
                    category,
                    language,
                    e
                );
                stats
                    .errors
                    .push(ErrorEntry::new(Some(category), None, e.to_string()));
                return;
            }
        };

        tracing::info!(
            "Category {} language {}: {} items",
            category,
            language,
            items.len()
        );

        for item in items {
            stats.total_processed += 1;

            let first_sighting =
                normalize_external_id(&item.id).map_or(true, |id| seen.first_sighting(&id));
            if !first_sighting {
                tracing::debug!("Item {} already handled this cycle", item.id);
                stats.duplicates += 1;
                continue;
            }

            match ingest_item(pipeline, config, &item).await {
                Ok(ItemOutcome::Inserted) | Ok(ItemOutcome::Overwritten) => stats.success += 1,
                Ok(ItemOutcome::Duplicate) => stats.duplicates += 1,
                Err(e) => {
                    tracing::warn!("Item {} failed: {}", item.id, e);
                    stats.errors.push(ErrorEntry::new(
                        Some(category),
                        Some(item.id.clone()),
                        e.to_string(),
                    ));
                }
            }
        }
    }
}

async fn ingest_item(
    pipeline: &Pipeline,
    config: &CrawlConfig,
    item: &RawWireItem,
) -> Result<ItemOutcome> {
    let existing = if config.enable_duplicate_check {
        let guard = lock_storage(&pipeline.storage)?;
        dedup::find_existing_item(&*guard, item, &config.source)?
    } else {
        None
    };

    // Under the default strategy an existing record settles it before any fetch
    if existing.is_some() && config.save_strategy == SaveStrategy::Skip {
        tracing::debug!("Item {} already stored, skipping", item.id);
        return Ok(ItemOutcome::Duplicate);
    }

    let markup = match item.body.as_deref().filter(|b| !b.trim().is_empty()) {
        Some(body) => body.to_string(),
        None => pipeline.client.fetch_document(&item.id, None).await?,
    };

    let published_at = item.published_at();
    let extracted = extract_content(
        &markup,
        &ExtractContext {
            title: &item.title,
            published_at,
            category: map_category(item.category),
        },
    );
    let mut record = normalize_item(item, extracted, config);

    if let Some(existing) = &existing {
        if dedup::resolve_incoming(config.save_strategy, existing, &record) == SaveDecision::Skip {
            tracing::debug!("Item {} is not newer than the stored copy", item.id);
            return Ok(ItemOutcome::Duplicate);
        }
    }

    if config.enable_ai {
        if let Some(enhancer) = &pipeline.enhancer {
            match enhancer.enhance(&record).await {
                Ok(enhancement) => {
                    let title_before = record.title.clone();
                    merge_enhancement(&mut record, enhancement);
                    if record.title != title_before {
                        record.slug = slugify(&record.title);
                    }
                }
                Err(e) => tracing::warn!("Enhancement failed for {}: {}", item.id, e),
            }
        }
    }

    if config.enable_photo_search && record.images.is_empty() {
        if let Some(photo_search) = &pipeline.photo_search {
            match photo_search
                .search(&record.title, &record.keywords, record.category)
                .await
            {
                Ok(urls) => {
                    for url in urls {
                        if !record.images.contains(&url) {
                            record.images.push(url);
                        }
                    }
                }
                Err(e) => tracing::warn!("Photo search failed for {}: {}", item.id, e),
            }
        }
    }

    let existing_id = existing.and_then(|r| r.id);
    persist_with_retry(&pipeline.storage, existing_id, &record)?;

    Ok(match existing_id {
        Some(_) => ItemOutcome::Overwritten,
        None => ItemOutcome::Inserted,
    })
}

fn persist_once(
    storage: &SharedStorage,
    existing_id: Option<i64>,
    record: &NewsRecord,
) -> Result<i64> {
    let mut guard = lock_storage(storage)?;
    match existing_id {
        Some(id) => {
            dedup::overwrite(&mut *guard, id, record)?;
            Ok(id)
        }
        None => Ok(guard.upsert_record(record)?),
    }
}

/// Persists a record, retrying once before giving up
fn persist_with_retry(
    storage: &SharedStorage,
    existing_id: Option<i64>,
    record: &NewsRecord,
) -> Result<i64> {
    match persist_once(storage, existing_id, record) {
        Ok(id) => Ok(id),
        Err(first) => {
            tracing::warn!("Persist failed for '{}', retrying: {}", record.title, first);
            persist_once(storage, existing_id, record)
                .map_err(|e| IngestError::Persistence(e.to_string()))
        }
    }
}

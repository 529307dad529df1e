//! Resolution of duplicate groups and identity duplicates
//!
//! Group operations validate everything before touching the store, so a
//! rejected call leaves both the group and its records unchanged.

use crate::config::SaveStrategy;
use crate::models::{DuplicateGroup, GroupStatus, NewsRecord};
use crate::storage::Storage;
use crate::{IngestError, Result};
use chrono::Utc;

/// What to do with an incoming record that duplicates a stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDecision {
    /// Keep the stored record as is
    Skip,

    /// Replace the stored record's mutable fields
    Overwrite,
}

/// Decides how an identity duplicate is saved
///
/// `OverwriteIfNewer` overwrites only when both records carry a publish time
/// and the incoming one is strictly later.
pub fn resolve_incoming(
    strategy: SaveStrategy,
    existing: &NewsRecord,
    incoming: &NewsRecord,
) -> SaveDecision {
    match strategy {
        SaveStrategy::Skip => SaveDecision::Skip,
        SaveStrategy::OverwriteAlways => SaveDecision::Overwrite,
        SaveStrategy::OverwriteIfNewer => match (existing.published_at, incoming.published_at) {
            (Some(stored), Some(new)) if new > stored => SaveDecision::Overwrite,
            _ => SaveDecision::Skip,
        },
    }
}

/// Loads a group that is still awaiting a decision
fn pending_group(storage: &dyn Storage, group_id: i64) -> Result<DuplicateGroup> {
    let group = storage
        .get_group(group_id)?
        .ok_or(IngestError::GroupNotFound(group_id))?;

    if group.status != GroupStatus::Pending {
        return Err(IngestError::GroupNotPending {
            group_id,
            status: group.status.to_string(),
        });
    }
    Ok(group)
}

/// Merges a group by keeping one member and deleting all others
///
/// An empty `remove_ids` removes every member except `keep_id`. A non-empty
/// list must name exactly those members; a merged group never leaves more
/// than one survivor. The status change and the deletions are applied as a
/// single storage transaction.
pub fn merge(
    storage: &mut dyn Storage,
    group_id: i64,
    keep_id: i64,
    remove_ids: &[i64],
) -> Result<DuplicateGroup> {
    let group = pending_group(storage, group_id)?;

    if !group.contains(keep_id) {
        return Err(IngestError::MemberNotInGroup {
            group_id,
            record_id: keep_id,
        });
    }
    if let Some(&bad) = remove_ids
        .iter()
        .find(|&&id| id == keep_id || !group.contains(id))
    {
        return Err(IngestError::MemberNotInGroup {
            group_id,
            record_id: bad,
        });
    }

    let removals: Vec<i64> = group
        .members
        .iter()
        .copied()
        .filter(|&id| id != keep_id)
        .collect();
    if !remove_ids.is_empty() {
        if let Some(&left) = removals.iter().find(|&&id| !remove_ids.contains(&id)) {
            return Err(IngestError::IncompleteMerge {
                group_id,
                record_id: left,
            });
        }
    }

    let deleted = storage.merge_group(group_id, keep_id, &removals)?;
    if deleted < removals.len() {
        tracing::warn!(
            "Group {}: {} of {} removed records were already gone",
            group_id,
            removals.len() - deleted,
            removals.len()
        );
    }

    tracing::info!(
        "Merged duplicate group {}: kept {}, removed {:?}",
        group_id,
        keep_id,
        removals
    );

    storage
        .get_group(group_id)?
        .ok_or(IngestError::GroupNotFound(group_id))
}

/// Merges a group by keeping its most recently published member
///
/// Fails with [`IngestError::AmbiguousMerge`] when a member has no publish
/// time or the latest time is shared; the group then stays pending.
pub fn auto_merge_by_recency(storage: &mut dyn Storage, group_id: i64) -> Result<DuplicateGroup> {
    let group = pending_group(storage, group_id)?;

    let mut latest: Option<(i64, chrono::DateTime<Utc>)> = None;
    let mut tied = false;

    for &member in &group.members {
        let record = storage
            .get_record(member)?
            .ok_or(IngestError::RecordNotFound(member))?;
        let Some(published_at) = record.published_at else {
            return Err(IngestError::AmbiguousMerge {
                group_id,
                reason: format!("record {} has no publish time", member),
            });
        };

        match latest {
            Some((_, best)) if published_at == best => tied = true,
            Some((_, best)) if published_at < best => {}
            _ => {
                latest = Some((member, published_at));
                tied = false;
            }
        }
    }

    let Some((keep_id, _)) = latest else {
        return Err(IngestError::AmbiguousMerge {
            group_id,
            reason: "group has no members".to_string(),
        });
    };
    if tied {
        return Err(IngestError::AmbiguousMerge {
            group_id,
            reason: "several members share the latest publish time".to_string(),
        });
    }

    merge(storage, group_id, keep_id, &[])
}

/// Replaces a stored record's mutable fields with an incoming version
///
/// The stored id, creation time, view count and publication status are kept.
pub fn overwrite(
    storage: &mut dyn Storage,
    existing_id: i64,
    incoming: &NewsRecord,
) -> Result<NewsRecord> {
    let existing = storage
        .get_record(existing_id)?
        .ok_or(IngestError::RecordNotFound(existing_id))?;

    let mut updated = incoming.clone();
    updated.id = Some(existing_id);
    updated.external_id = incoming.external_id.clone().or(existing.external_id);
    updated.created_at = existing.created_at;
    updated.views = existing.views;
    updated.status = existing.status;
    updated.updated_at = Utc::now();

    storage.upsert_record(&updated)?;
    Ok(updated)
}

/// Marks a group as distinct stories; no record changes
///
/// Ignored groups are sticky: later scans never link their members again.
pub fn ignore(storage: &mut dyn Storage, group_id: i64) -> Result<()> {
    pending_group(storage, group_id)?;
    storage.set_group_status(group_id, GroupStatus::Ignored, None)?;
    tracing::info!("Ignored duplicate group {}", group_id);
    Ok(())
}

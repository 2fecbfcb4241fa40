//! Pull, push and reconcile passes between a local store and one provider.
//!
//! A session processes one provider connection and one area directory
//! sequentially. Per-item failures are logged and counted; only failures to
//! list the remote side or to read the area directory abort a pass.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Serialize;

use crate::cache::SyncCache;
use crate::conflict::{detect_all_conflicts, detect_conflict, resolve_conflict, Resolution, Side};
use crate::error::{Error, Result};
use crate::models::{clean_title, ConflictPolicy, FeedbackItem, SyncConflict};
use crate::provider::FeedbackProvider;
use crate::store::{slug_from_file_stem, slug_from_title, slugs_overlap, LocalStore};

const UNCHANGED_LOCALLY: &str = "accepted remote (local unchanged)";

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Decide everything, write nothing
    pub dry_run: bool,
    /// Recorded as `Author` when stamping an external id
    pub author: Option<String>,
    pub policy: ConflictPolicy,
}

/// Counts reported by every pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// New local files (pull) or new remote items (push)
    pub created: usize,
    /// Local files stamped with an existing remote id
    pub linked: usize,
    /// Conflicts settled by a policy or by an unchanged cache entry
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Conflicts left for a human under the manual policy
    pub manual: usize,
    /// Remote items created whose local file could not be stamped.
    /// Already included in `failed`.
    pub unstamped: usize,
}

impl SyncReport {
    pub const fn total(&self) -> usize {
        self.created + self.linked + self.updated + self.skipped + self.failed + self.manual
    }
}

pub struct SyncSession<'a, P: FeedbackProvider> {
    provider: &'a P,
    store: &'a LocalStore,
    cache: Option<&'a mut SyncCache>,
    options: SyncOptions,
}

impl<'a, P: FeedbackProvider> SyncSession<'a, P> {
    /// Session over a connected provider.
    pub const fn new(provider: &'a P, store: &'a LocalStore, options: SyncOptions) -> Self {
        Self {
            provider,
            store,
            cache: None,
            options,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: &'a mut SyncCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Materialize remote items that have no local record yet.
    pub async fn pull(&mut self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        if !self.provider.is_remote() {
            tracing::debug!(provider = self.provider.name(), "Local-only provider, nothing to pull");
            return Ok(report);
        }

        let remotes = self.provider.list().await?;
        tracing::info!(
            provider = self.provider.name(),
            area = %self.store.area(),
            remote_items = remotes.len(),
            "Pulling"
        );
        if remotes.is_empty() {
            return Ok(report);
        }

        let scan = self.store.scan()?;
        let mut known_ids: HashSet<String> = scan
            .items
            .iter()
            .filter_map(FeedbackItem::external_id)
            .map(ToString::to_string)
            .collect();
        let mut stems: Vec<String> = scan
            .items
            .iter()
            .filter_map(|item| item.file_path.as_deref())
            .chain(scan.failures.iter().map(std::path::PathBuf::as_path))
            .filter_map(file_stem)
            .collect();
        let mut sequence = self.store.next_sequence()?;

        for remote in &remotes {
            let external_id = remote.external_id().unwrap_or(&remote.id).to_string();
            if known_ids.contains(&external_id) {
                tracing::debug!(%external_id, "Skipping remote item already linked locally");
                report.skipped += 1;
                continue;
            }

            let slug = slug_from_title(&remote.clean_title());
            if let Some(stem) = stems.iter().find(|stem| {
                slug_from_file_stem(stem).is_some_and(|file_slug| slugs_overlap(file_slug, &slug))
            }) {
                tracing::debug!(%external_id, file = %stem, "Skipping remote item matching local file name");
                report.skipped += 1;
                continue;
            }

            let file_name = self.store.file_name(sequence, &remote.title);
            let path = self.store.path_for(&file_name);
            let this_sequence = sequence;
            sequence = sequence.saturating_add(1);
            if path.is_file() {
                tracing::debug!(file = %path.display(), "Skipping, record file already exists");
                report.skipped += 1;
                continue;
            }

            if self.options.dry_run {
                tracing::info!(%external_id, file = %file_name, "Would create");
            } else {
                match self.store.create_item(remote, this_sequence, self.provider.name()) {
                    Ok(path) => {
                        tracing::info!(%external_id, file = %path.display(), "Created");
                        self.record(&path);
                    }
                    Err(error) => {
                        tracing::warn!(%external_id, file = %path.display(), %error, "Failed to create local record");
                        report.failed += 1;
                        continue;
                    }
                }
            }

            report.created += 1;
            known_ids.insert(external_id);
            if let Some(stem) = file_stem(&path) {
                stems.push(stem);
            }
        }

        tracing::info!(
            created = report.created,
            skipped = report.skipped,
            failed = report.failed,
            "Pull finished"
        );
        Ok(report)
    }

    /// Create remote items for local records that have no external id.
    ///
    /// A record whose slug matches an existing remote title is linked to it
    /// instead of being created again.
    pub async fn push(&mut self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let scan = self.store.scan()?;
        report.failed += scan.failures.len();

        if !self.provider.is_remote() {
            tracing::debug!(provider = self.provider.name(), "Local-only provider, nothing to push");
            report.skipped += scan.items.len();
            return Ok(report);
        }

        let (synced, pending): (Vec<_>, Vec<_>) =
            scan.items.iter().partition(|item| item.is_synced());
        report.skipped += synced.len();
        if pending.is_empty() {
            return Ok(report);
        }

        let remotes = self.provider.list().await?;
        tracing::info!(
            provider = self.provider.name(),
            area = %self.store.area(),
            pending = pending.len(),
            remote_items = remotes.len(),
            "Pushing"
        );
        let mut remote_slugs: HashMap<String, String> = HashMap::new();
        for remote in &remotes {
            let slug = slug_from_title(&remote.clean_title());
            if !slug.is_empty() {
                remote_slugs
                    .entry(slug)
                    .or_insert_with(|| remote.external_id().unwrap_or(&remote.id).to_string());
            }
        }

        for item in pending {
            let outgoing = if item.title.trim().is_empty() {
                Cow::Owned(FeedbackItem {
                    title: clean_title(&item.id),
                    ..item.clone()
                })
            } else {
                Cow::Borrowed(item)
            };
            let title = outgoing.clean_title();
            let slug = slug_from_title(&title);
            let matched = remote_slugs.get(&slug).cloned().or_else(|| {
                slug_from_file_stem(&item.id).and_then(|stem| remote_slugs.get(stem).cloned())
            });

            if let Some(external_id) = matched {
                if self.options.dry_run {
                    tracing::info!(item = %item.id, %external_id, "Would link to existing remote item");
                    report.linked += 1;
                } else if self.stamp(item, &external_id) {
                    tracing::info!(item = %item.id, %external_id, "Linked to existing remote item");
                    report.linked += 1;
                } else {
                    report.failed += 1;
                }
                continue;
            }

            if self.options.dry_run {
                tracing::info!(item = %item.id, title = %title, "Would push");
                report.created += 1;
                remote_slugs.insert(slug, String::new());
                continue;
            }

            let created = match self.provider.create(&outgoing).await {
                Ok(created) => created,
                Err(error) => {
                    tracing::warn!(item = %item.id, %error, "Failed to push");
                    report.failed += 1;
                    continue;
                }
            };
            let external_id = created.external_id().unwrap_or(&created.id).to_string();
            if self.stamp(item, &external_id) {
                tracing::info!(item = %item.id, %external_id, "Pushed");
                report.created += 1;
            } else {
                tracing::warn!(
                    item = %item.id,
                    %external_id,
                    "Created remotely but not stamped locally; link it by hand before the next push"
                );
                report.failed += 1;
                report.unstamped += 1;
            }
            remote_slugs.insert(slug, external_id);
        }

        tracing::info!(
            created = report.created,
            linked = report.linked,
            skipped = report.skipped,
            failed = report.failed,
            unstamped = report.unstamped,
            "Push finished"
        );
        Ok(report)
    }

    /// Settle divergence between linked local records and their remote items.
    ///
    /// When the cache shows the local record untouched since the last sync,
    /// the remote version is taken without consulting the policy.
    pub async fn reconcile(&mut self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let scan = self.store.scan()?;
        report.failed += scan.failures.len();

        if !self.provider.is_remote() {
            report.skipped += scan.items.len();
            return Ok(report);
        }

        let linked: Vec<&FeedbackItem> = scan.items.iter().filter(|item| item.is_synced()).collect();
        report.skipped += scan.items.len() - linked.len();
        if linked.is_empty() {
            return Ok(report);
        }

        let remotes = self.provider.list().await?;
        let by_id = index_remotes(&remotes);
        let modified: Option<HashSet<String>> = self.cache.as_deref().map(|cache| {
            cache
                .find_modified_items(&scan.items)
                .into_iter()
                .map(|item| item.id.clone())
                .collect()
        });

        for local in linked {
            let Some(remote) = local.external_id().and_then(|id| by_id.get(id)) else {
                tracing::debug!(item = %local.id, "Linked remote item not listed");
                report.skipped += 1;
                continue;
            };

            let view = local.remote_view();
            let Some(mut conflict) = detect_conflict(&view, remote) else {
                report.skipped += 1;
                if !self.options.dry_run {
                    self.record_item(local);
                }
                continue;
            };

            let unchanged = modified
                .as_ref()
                .is_some_and(|modified| !modified.contains(&local.id));
            let resolution = if unchanged {
                conflict.resolution = Some(UNCHANGED_LOCALLY.to_string());
                Resolution {
                    winner: Side::Remote,
                    item: (*remote).clone(),
                    label: UNCHANGED_LOCALLY,
                }
            } else {
                match resolve_conflict(&mut conflict, self.options.policy) {
                    Ok(resolution) => resolution,
                    Err(Error::ManualResolutionRequired(item)) => {
                        tracing::info!(%item, reason = %conflict.reason(), "Manual resolution required");
                        report.manual += 1;
                        continue;
                    }
                    Err(error) => return Err(error),
                }
            };

            if self.options.dry_run {
                tracing::info!(item = %local.id, resolution = resolution.label, "Would resolve");
                report.updated += 1;
                continue;
            }

            let applied = match resolution.winner {
                Side::Remote => self.store.apply_remote(local, remote),
                Side::Local => self.provider.update(&view).await.map_err(Error::from),
            };
            match applied {
                Ok(()) => {
                    tracing::info!(item = %local.id, resolution = resolution.label, reason = %conflict.reason(), "Resolved");
                    report.updated += 1;
                    match (resolution.winner, local.file_path.as_deref()) {
                        (Side::Remote, Some(path)) => self.record(path),
                        _ => self.record_item(local),
                    }
                }
                Err(error) => {
                    tracing::warn!(item = %local.id, %error, "Failed to apply resolution");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            updated = report.updated,
            manual = report.manual,
            skipped = report.skipped,
            failed = report.failed,
            "Reconcile finished"
        );
        Ok(report)
    }

    /// Read-only report of every linked record that diverges from its remote item.
    pub async fn conflicts(&self) -> Result<Vec<SyncConflict>> {
        if !self.provider.is_remote() {
            return Ok(Vec::new());
        }
        let scan = self.store.scan()?;
        let views: Vec<FeedbackItem> = scan.items.iter().map(FeedbackItem::remote_view).collect();
        let remotes = self.provider.list().await?;
        Ok(detect_all_conflicts(&views, &remotes))
    }

    fn stamp(&mut self, item: &FeedbackItem, external_id: &str) -> bool {
        let author = self.options.author.as_deref();
        match self
            .store
            .stamp_external_id(item, external_id, self.provider.name(), author)
        {
            Ok(_) => {
                if let Some(path) = item.file_path.as_deref() {
                    self.record(path);
                }
                true
            }
            Err(error) => {
                tracing::warn!(
                    item = %item.id,
                    %external_id,
                    %error,
                    "Remote item exists but the local record could not be stamped"
                );
                false
            }
        }
    }

    /// Re-read a written record and remember it in the cache.
    fn record(&mut self, path: &Path) {
        if self.cache.is_none() {
            return;
        }
        match self.store.read_item(path) {
            Ok(item) => self.record_item(&item),
            Err(error) => {
                tracing::warn!(file = %path.display(), %error, "Could not re-read record for the cache");
            }
        }
    }

    fn record_item(&mut self, item: &FeedbackItem) {
        if let Some(cache) = self.cache.as_deref_mut() {
            cache.record_sync(item);
        }
    }
}

fn index_remotes(remotes: &[FeedbackItem]) -> HashMap<&str, &FeedbackItem> {
    let mut by_id = HashMap::new();
    for remote in remotes {
        if let Some(external_id) = remote.external_id() {
            by_id.entry(external_id).or_insert(remote);
        }
        by_id.entry(remote.id.as_str()).or_insert(remote);
    }
    by_id
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(ToString::to_string)
}

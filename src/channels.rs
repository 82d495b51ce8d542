//! Channel identity resolution and duplicate cleanup.
//!
//! Two upsert modes with very different contracts: the full upsert is
//! authoritative and overwrites supplied fields, while the identity-only
//! upsert used by discovery never touches an existing row. Discovery runs
//! at high volume and must stay cheap and non-destructive.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::app::Result;
use crate::domain::{handle, Channel, ChannelIdentity, ChannelPatch, Platform};
use crate::store::Store;

/// Sentinel title for rows discovered before hydration.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Outcome of a duplicate-handle cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub duplicates_found: usize,
    pub duplicates_removed: usize,
}

pub struct ChannelService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> ChannelService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Authoritative upsert: find by (platform, platform_id) and overwrite
    /// every supplied non-empty field, or insert a new row.
    pub fn upsert_full(&self, identity: &ChannelIdentity) -> Result<Channel> {
        if let Some(existing) = self
            .store
            .find_channel(identity.platform, &identity.platform_id)?
        {
            return self.apply_patch(existing, identity);
        }

        let (channel, created) = self.store.insert_channel(&Self::minimal(identity))?;
        if created {
            debug!(
                platform = %channel.platform,
                handle = %channel.handle,
                "inserted channel"
            );
            Ok(channel)
        } else {
            // Lost an insert race; the supplied fields still win.
            self.apply_patch(channel, identity)
        }
    }

    /// Non-destructive upsert: an existing row is returned unchanged, a
    /// missing one is inserted with sentinel defaults. The flag reports
    /// whether a row was created.
    pub fn upsert_identity_only(&self, identity: &ChannelIdentity) -> Result<(Channel, bool)> {
        if let Some(existing) = self
            .store
            .find_channel(identity.platform, &identity.platform_id)?
        {
            return Ok((existing, false));
        }
        self.store.insert_channel(&Self::minimal(identity))
    }

    /// Group channels by (platform, lower-cased handle); in any group larger
    /// than one, keep the member with the freshest snapshot and delete the
    /// rest. Members with stats beat members without; remaining ties go to
    /// the oldest row.
    pub fn cleanup_duplicates(&self) -> Result<CleanupReport> {
        let mut groups: HashMap<(Platform, String), Vec<Channel>> = HashMap::new();
        for channel in self.store.all_channels()? {
            groups
                .entry((channel.platform, channel.handle.to_lowercase()))
                .or_default()
                .push(channel);
        }

        let mut report = CleanupReport::default();
        for ((platform, handle), group) in groups {
            if group.len() < 2 {
                continue;
            }

            let mut scored: Vec<(Channel, Option<NaiveDate>)> = Vec::with_capacity(group.len());
            for channel in group {
                let latest = self.store.latest_stat(channel.id)?.map(|s| s.snapshot_date);
                scored.push((channel, latest));
            }
            let keeper = scored
                .iter()
                .map(|(ch, latest)| (*latest, Reverse(ch.id)))
                .max()
                .map(|(_, Reverse(id))| id)
                .unwrap_or_default();

            for (channel, _) in &scored {
                if channel.id == keeper {
                    continue;
                }
                self.store.delete_channel(channel.id)?;
                report.duplicates_removed += 1;
            }
            report.duplicates_found += scored.len() - 1;
            debug!(%platform, %handle, kept = keeper, "deduplicated handle group");
        }

        if report.duplicates_found > 0 {
            info!(
                found = report.duplicates_found,
                removed = report.duplicates_removed,
                "cleanup complete"
            );
        }
        Ok(report)
    }

    fn minimal(identity: &ChannelIdentity) -> Channel {
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(String::from);
        let mut channel = Channel::new(
            identity.platform,
            identity.platform_id.clone(),
            non_empty(&identity.handle).unwrap_or_else(handle::placeholder),
            non_empty(&identity.title).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        );
        channel.avatar_url = non_empty(&identity.avatar_url);
        channel.country = non_empty(&identity.country);
        channel
    }

    fn apply_patch(&self, existing: Channel, identity: &ChannelIdentity) -> Result<Channel> {
        let patch = ChannelPatch::from_identity(identity);
        if patch.is_empty() {
            return Ok(existing);
        }
        self.store.update_channel(existing.id, &patch)?;
        Ok(self.store.get_channel(existing.id)?.unwrap_or(existing))
    }
}

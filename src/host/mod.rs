//! Host player seam: playlist selection and per-track metadata.
//!
//! The host owns the playlist. The sync core only ever:
//! - takes the host's playlist-wide lock while it walks the selection,
//! - holds reference-counted handles to the tracks it is copying,
//! - reads metadata from those handles by key.
//!
//! Locking and reference counting are wrapped in scoped types
//! ([`PlaylistLock`], [`TrackHandle`]) so every exit path releases them.

pub mod local;

use std::fmt;
use std::sync::Arc;

pub use local::{LocalPlaylist, PlaylistEntry};

/// Opaque identifier of one playlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Playlist and metadata provider implemented by the host player.
///
/// Mirrors the primitives a player plugin API hands out. `first`/`next`
/// walk the main playlist in display order and do not take references;
/// callers that keep an item beyond the walk must `item_ref` it.
pub trait PlaylistHost: Send + Sync {
    /// Acquire the playlist-wide lock.
    fn lock(&self);

    /// Release the playlist-wide lock.
    fn unlock(&self);

    /// Number of currently selected items.
    fn selection_count(&self) -> usize;

    /// First item of the main playlist.
    fn first(&self) -> Option<ItemId>;

    /// Item following `item` in the main playlist.
    fn next(&self, item: ItemId) -> Option<ItemId>;

    /// Whether `item` is selected.
    fn is_selected(&self, item: ItemId) -> bool;

    /// Increment the reference count of `item`.
    fn item_ref(&self, item: ItemId);

    /// Decrement the reference count of `item`.
    fn item_unref(&self, item: ItemId);

    /// Metadata lookup by key (`title`, `artist`, `:URI`, `:FILETYPE`, ...).
    fn find_meta(&self, item: ItemId, key: &str) -> Option<String>;

    /// Playback duration in seconds; negative when unknown.
    fn duration_secs(&self, item: ItemId) -> f64;
}

/// Scoped hold on the host's playlist lock. Unlocks on drop.
pub struct PlaylistLock<'a> {
    host: &'a dyn PlaylistHost,
}

impl<'a> PlaylistLock<'a> {
    pub fn acquire(host: &'a dyn PlaylistHost) -> Self {
        host.lock();
        Self { host }
    }
}

impl Drop for PlaylistLock<'_> {
    fn drop(&mut self) {
        self.host.unlock();
    }
}

/// A referenced playlist item.
///
/// Acquiring takes one host reference; dropping releases exactly one.
/// Cloning takes another reference.
pub struct TrackHandle {
    host: Arc<dyn PlaylistHost>,
    item: ItemId,
}

impl TrackHandle {
    /// Take a reference on `item`.
    pub fn acquire(host: Arc<dyn PlaylistHost>, item: ItemId) -> Self {
        host.item_ref(item);
        Self { host, item }
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    /// Raw metadata lookup.
    pub fn meta(&self, key: &str) -> Option<String> {
        self.host.find_meta(self.item, key)
    }

    /// Duration in seconds as reported by the host.
    pub fn duration_secs(&self) -> f64 {
        self.host.duration_secs(self.item)
    }
}

impl Clone for TrackHandle {
    fn clone(&self) -> Self {
        Self::acquire(Arc::clone(&self.host), self.item)
    }
}

impl Drop for TrackHandle {
    fn drop(&mut self) {
        self.host.item_unref(self.item);
    }
}

impl fmt::Debug for TrackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackHandle").field("item", &self.item).finish()
    }
}

/// Immutable, reference-holding copy of the selection at capture time.
///
/// Later changes to the live selection don't affect it. Dropping the
/// snapshot releases every reference it holds.
#[derive(Debug, Default)]
pub struct SelectionSnapshot {
    tracks: Vec<TrackHandle>,
}

impl SelectionSnapshot {
    /// Capture the selected items in playlist order.
    ///
    /// The playlist lock is held for the walk only.
    pub fn capture(host: &Arc<dyn PlaylistHost>) -> Self {
        let _lock = PlaylistLock::acquire(host.as_ref());

        let count = host.selection_count();
        if count == 0 {
            return Self::default();
        }

        let mut tracks = Vec::with_capacity(count);
        let mut cursor = host.first();
        while let Some(item) = cursor {
            if host.is_selected(item) {
                tracks.push(TrackHandle::acquire(Arc::clone(host), item));
            }
            cursor = host.next(item);
        }

        tracing::debug!(target: "podsync::sync", "Captured selection of {} tracks", tracks.len());
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackHandle> {
        self.tracks.iter()
    }

    /// Item ids in snapshot order.
    pub fn items(&self) -> Vec<ItemId> {
        self.tracks.iter().map(TrackHandle::item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(titles: &[&str]) -> (Arc<LocalPlaylist>, Vec<ItemId>) {
        let playlist = Arc::new(LocalPlaylist::new());
        let ids = titles
            .iter()
            .map(|t| playlist.push(PlaylistEntry::new().with_meta("title", *t)))
            .collect();
        (playlist, ids)
    }

    #[test]
    fn test_snapshot_of_empty_selection() {
        let (playlist, _) = playlist(&["a", "b"]);
        let host: Arc<dyn PlaylistHost> = playlist.clone();

        let snapshot = SelectionSnapshot::capture(&host);
        assert!(snapshot.is_empty());
        assert_eq!(playlist.refs_taken(), 0);
        assert!(!playlist.is_locked());
    }

    #[test]
    fn test_snapshot_follows_playlist_order() {
        let (playlist, ids) = playlist(&["a", "b", "c", "d"]);
        // Selection click order differs from playlist order
        playlist.set_selected(ids[3], true);
        playlist.set_selected(ids[0], true);
        playlist.set_selected(ids[2], true);
        let host: Arc<dyn PlaylistHost> = playlist.clone();

        let snapshot = SelectionSnapshot::capture(&host);
        assert_eq!(snapshot.items(), vec![ids[0], ids[2], ids[3]]);
        assert!(!playlist.is_locked());
    }

    #[test]
    fn test_snapshot_holds_references_until_dropped() {
        let (playlist, ids) = playlist(&["a", "b"]);
        playlist.select_all();
        let host: Arc<dyn PlaylistHost> = playlist.clone();

        let snapshot = SelectionSnapshot::capture(&host);
        assert_eq!(playlist.refcount(ids[0]), 1);
        assert_eq!(playlist.refcount(ids[1]), 1);

        drop(snapshot);
        assert_eq!(playlist.refcount(ids[0]), 0);
        assert_eq!(playlist.refcount(ids[1]), 0);
        assert_eq!(playlist.refs_taken(), playlist.refs_released());
    }

    #[test]
    fn test_snapshot_ignores_later_selection_changes() {
        let (playlist, ids) = playlist(&["a", "b", "c"]);
        playlist.set_selected(ids[0], true);
        playlist.set_selected(ids[1], true);
        let host: Arc<dyn PlaylistHost> = playlist.clone();

        let snapshot = SelectionSnapshot::capture(&host);
        playlist.clear_selection();
        playlist.set_selected(ids[2], true);

        assert_eq!(snapshot.items(), vec![ids[0], ids[1]]);
    }

    #[test]
    fn test_handle_clone_takes_extra_reference() {
        let (playlist, ids) = playlist(&["a"]);
        let host: Arc<dyn PlaylistHost> = playlist.clone();

        let handle = TrackHandle::acquire(host, ids[0]);
        let copy = handle.clone();
        assert_eq!(playlist.refcount(ids[0]), 2);
        drop(handle);
        assert_eq!(playlist.refcount(ids[0]), 1);
        assert_eq!(copy.meta("title").as_deref(), Some("a"));
        drop(copy);
        assert_eq!(playlist.refcount(ids[0]), 0);
    }

    #[test]
    fn test_item_id_display() {
        assert_eq!(ItemId(7).to_string(), "#7");
    }
}

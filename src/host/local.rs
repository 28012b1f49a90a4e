//! In-memory playlist host.
//!
//! Backs the CLI (a playlist built from files on disk) and doubles as the
//! host in tests: it counts every reference taken and released so leaks
//! and double releases are observable.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, RwLock};

use super::{ItemId, PlaylistHost, PlaylistLock};
use crate::metadata::tags;

/// One playlist entry: metadata by key, duration and selection flag.
#[derive(Debug, Clone, Default)]
pub struct PlaylistEntry {
    pub meta: HashMap<String, String>,
    /// Duration in seconds (-1.0 when unknown)
    pub duration: f64,
    pub selected: bool,
}

impl PlaylistEntry {
    pub fn new() -> Self {
        Self {
            meta: HashMap::new(),
            duration: -1.0,
            selected: false,
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }
}

/// Recursive playlist-wide lock with separate `lock` and `unlock` calls.
///
/// Only the owning thread can release it. Unlocking from any other thread,
/// or when nothing is held, is ignored.
#[derive(Default)]
struct PlaylistMutex {
    state: Mutex<LockState>,
    released: Condvar,
}

#[derive(Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
}

impl PlaylistMutex {
    fn lock(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while matches!(state.owner, Some(owner) if owner != me) {
            self.released.wait(&mut state);
        }
        state.owner = Some(me);
        state.depth += 1;
    }

    /// Returns false when the calling thread does not hold the lock.
    fn unlock(&self) -> bool {
        let mut state = self.state.lock();
        if state.owner != Some(thread::current().id()) {
            return false;
        }
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            self.released.notify_all();
        }
        true
    }

    fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }
}

struct Slot {
    id: ItemId,
    entry: PlaylistEntry,
    refs: usize,
}

/// Ordered in-memory playlist implementing [`PlaylistHost`].
pub struct LocalPlaylist {
    /// Playlist-wide lock handed out through `lock`/`unlock`. Every
    /// mutation below takes it as well.
    playlist_lock: PlaylistMutex,
    slots: RwLock<Vec<Slot>>,
    next_id: AtomicU64,
    refs_taken: AtomicUsize,
    refs_released: AtomicUsize,
    meta_lookups: AtomicUsize,
}

impl Default for LocalPlaylist {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalPlaylist {
    pub fn new() -> Self {
        Self {
            playlist_lock: PlaylistMutex::default(),
            slots: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            refs_taken: AtomicUsize::new(0),
            refs_released: AtomicUsize::new(0),
            meta_lookups: AtomicUsize::new(0),
        }
    }

    /// Build a playlist from audio files, reading their tags.
    ///
    /// Unreadable files are skipped with a warning. Nothing is selected.
    pub fn from_files(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let playlist = Self::new();
        for path in paths {
            match tags::read_entry(&path) {
                Ok(entry) => {
                    playlist.push(entry);
                }
                Err(e) => tracing::warn!("Skipping {:?}: {}", path, e),
            }
        }
        playlist
    }

    /// Append an entry and return its id.
    pub fn push(&self, entry: PlaylistEntry) -> ItemId {
        let _lock = PlaylistLock::acquire(self);
        let id = ItemId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.write().push(Slot {
            id,
            entry,
            refs: 0,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    pub fn set_selected(&self, item: ItemId, selected: bool) {
        let _lock = PlaylistLock::acquire(self);
        if let Some(slot) = self.slots.write().iter_mut().find(|s| s.id == item) {
            slot.entry.selected = selected;
        }
    }

    pub fn select_all(&self) {
        let _lock = PlaylistLock::acquire(self);
        for slot in self.slots.write().iter_mut() {
            slot.entry.selected = true;
        }
    }

    pub fn clear_selection(&self) {
        let _lock = PlaylistLock::acquire(self);
        for slot in self.slots.write().iter_mut() {
            slot.entry.selected = false;
        }
    }

    /// Current reference count of `item`.
    pub fn refcount(&self, item: ItemId) -> usize {
        self.slots
            .read()
            .iter()
            .find(|s| s.id == item)
            .map(|s| s.refs)
            .unwrap_or(0)
    }

    /// Total `item_ref` calls so far.
    pub fn refs_taken(&self) -> usize {
        self.refs_taken.load(Ordering::SeqCst)
    }

    /// Total `item_unref` calls so far.
    pub fn refs_released(&self) -> usize {
        self.refs_released.load(Ordering::SeqCst)
    }

    /// Total `find_meta` calls so far.
    pub fn meta_lookups(&self) -> usize {
        self.meta_lookups.load(Ordering::SeqCst)
    }

    /// Whether any thread currently holds the playlist lock.
    pub fn is_locked(&self) -> bool {
        self.playlist_lock.is_locked()
    }

    fn with_entry<T>(&self, item: ItemId, f: impl FnOnce(&PlaylistEntry) -> T) -> Option<T> {
        self.slots
            .read()
            .iter()
            .find(|s| s.id == item)
            .map(|s| f(&s.entry))
    }
}

impl PlaylistHost for LocalPlaylist {
    fn lock(&self) {
        self.playlist_lock.lock();
    }

    fn unlock(&self) {
        if !self.playlist_lock.unlock() {
            tracing::warn!("Ignoring release of a playlist lock this thread does not hold");
        }
    }

    fn selection_count(&self) -> usize {
        self.slots
            .read()
            .iter()
            .filter(|s| s.entry.selected)
            .count()
    }

    fn first(&self) -> Option<ItemId> {
        self.slots.read().first().map(|s| s.id)
    }

    fn next(&self, item: ItemId) -> Option<ItemId> {
        let slots = self.slots.read();
        let pos = slots.iter().position(|s| s.id == item)?;
        slots.get(pos + 1).map(|s| s.id)
    }

    fn is_selected(&self, item: ItemId) -> bool {
        self.with_entry(item, |e| e.selected).unwrap_or(false)
    }

    fn item_ref(&self, item: ItemId) {
        self.refs_taken.fetch_add(1, Ordering::SeqCst);
        if let Some(slot) = self.slots.write().iter_mut().find(|s| s.id == item) {
            slot.refs += 1;
        }
    }

    fn item_unref(&self, item: ItemId) {
        self.refs_released.fetch_add(1, Ordering::SeqCst);
        if let Some(slot) = self.slots.write().iter_mut().find(|s| s.id == item) {
            if slot.refs == 0 {
                tracing::warn!("Unbalanced release of playlist item {}", item);
            }
            slot.refs = slot.refs.saturating_sub(1);
        }
    }

    fn find_meta(&self, item: ItemId, key: &str) -> Option<String> {
        self.meta_lookups.fetch_add(1, Ordering::SeqCst);
        self.with_entry(item, |e| e.meta.get(key).cloned()).flatten()
    }

    fn duration_secs(&self, item: ItemId) -> f64 {
        self.with_entry(item, |e| e.duration).unwrap_or(-1.0)
    }
}

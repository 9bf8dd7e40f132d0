use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{ConversationTurn, Role};

pub type UserId = i64;

pub const DEFAULT_HISTORY_CAPACITY: usize = 24;

/// Per-user rolling chat history with FIFO eviction.
///
/// Every operation is total: a user that was never seen behaves like an empty
/// history. The map sits behind one mutex, so `append`, `reset` and
/// `snapshot` on the same user never interleave.
pub struct ConversationStore {
    capacity: usize,
    histories: Mutex<HashMap<UserId, VecDeque<ConversationTurn>>>,
}

impl ConversationStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            histories: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, VecDeque<ConversationTurn>>> {
        // A panic while holding the lock cannot leave a history longer than capacity.
        self.histories.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn ensure(&self, user: UserId) {
        let capacity = self.capacity;
        self.lock()
            .entry(user)
            .or_insert_with(|| VecDeque::with_capacity(capacity));
    }

    pub fn append(&self, user: UserId, role: Role, text: impl Into<String>) {
        let capacity = self.capacity;
        let mut histories = self.lock();
        let history = histories
            .entry(user)
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        while history.len() >= capacity {
            history.pop_front();
        }
        history.push_back(ConversationTurn::new(role, text));
    }

    pub fn push_user(&self, user: UserId, text: impl Into<String>) {
        self.append(user, Role::User, text);
    }

    pub fn push_assistant(&self, user: UserId, text: impl Into<String>) {
        self.append(user, Role::Assistant, text);
    }

    pub fn snapshot(&self, user: UserId) -> Vec<ConversationTurn> {
        self.lock()
            .get(&user)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn reset(&self, user: UserId) {
        let capacity = self.capacity;
        self.lock()
            .entry(user)
            .or_insert_with(|| VecDeque::with_capacity(capacity))
            .clear();
    }

    pub fn len(&self, user: UserId) -> usize {
        self.lock().get(&user).map(VecDeque::len).unwrap_or(0)
    }

    /// Users with a non-empty history.
    pub fn active_users(&self) -> usize {
        self.lock().values().filter(|h| !h.is_empty()).count()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Shared with the actix-web workers.
#[derive(Clone)]
pub struct AppState {
    pub conversations: Arc<ConversationStore>,
    pub media_dir: PathBuf,
}

impl AppState {
    pub fn new(conversations: Arc<ConversationStore>, media_dir: PathBuf) -> Self {
        Self { conversations, media_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(store: &ConversationStore, user: UserId) -> Vec<String> {
        store.snapshot(user).iter().map(|t| t.content().to_string()).collect()
    }

    #[test]
    fn unknown_user_is_empty() {
        let store = ConversationStore::default();
        assert!(store.snapshot(7).is_empty());
        assert_eq!(store.len(7), 0);
    }

    #[test]
    fn ensure_is_idempotent() {
        let store = ConversationStore::default();
        store.push_user(1, "a");
        store.ensure(1);
        store.ensure(1);
        assert_eq!(contents(&store, 1), vec!["a"]);
    }

    #[test]
    fn overflow_keeps_last_appended_in_order() {
        let store = ConversationStore::default();
        for i in 1..=40 {
            store.push_user(1, format!("m{}", i));
            assert!(store.len(1) <= DEFAULT_HISTORY_CAPACITY);
        }
        let expected: Vec<String> = (17..=40).map(|i| format!("m{}", i)).collect();
        assert_eq!(contents(&store, 1), expected);
    }

    #[test]
    fn reset_clears_regardless_of_content() {
        let store = ConversationStore::default();
        for i in 0..30 {
            store.push_assistant(5, format!("a{}", i));
        }
        store.reset(5);
        assert!(store.snapshot(5).is_empty());

        store.reset(99);
        assert!(store.snapshot(99).is_empty());
    }

    #[test]
    fn users_are_isolated() {
        let store = ConversationStore::new(2);
        store.push_user(1, "one");
        store.push_user(2, "two");
        store.push_user(1, "three");
        store.push_user(1, "four");
        assert_eq!(contents(&store, 1), vec!["three", "four"]);
        assert_eq!(contents(&store, 2), vec!["two"]);
        assert_eq!(store.active_users(), 2);

        store.reset(2);
        assert_eq!(store.active_users(), 1);
    }

    #[test]
    fn snapshot_is_detached_copy() {
        let store = ConversationStore::default();
        store.push_user(1, "first");
        let mut snap = store.snapshot(1);
        snap.clear();
        assert_eq!(store.len(1), 1);
    }

    #[test]
    fn concurrent_appends_respect_capacity() {
        let store = Arc::new(ConversationStore::new(24));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.push_user(1, format!("{}-{}", t, i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(1), 24);
    }
}

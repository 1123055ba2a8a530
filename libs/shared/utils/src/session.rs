use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

struct SessionEntry<T> {
    value: T,
    last_access: Instant,
}

/// Bounded, expiring key-value store for conversation state.
///
/// Entries idle for longer than `ttl` are dropped on access and by
/// [`SessionStore::purge_expired`]. When the store is full, inserting a new
/// session evicts the least recently used one.
pub struct SessionStore<T> {
    entries: Mutex<HashMap<Uuid, SessionEntry<T>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<T: Clone + Send + 'static> SessionStore<T> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the session and marks it as recently used.
    pub async fn get(&self, id: &Uuid) -> Option<T> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let expired = match entries.get_mut(id) {
            Some(entry) if now.duration_since(entry.last_access) < self.ttl => {
                entry.last_access = now;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(id);
            debug!("Session {} expired", id);
        }
        None
    }

    pub async fn insert(&self, id: Uuid, value: T) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        if !entries.contains_key(&id) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, entry| now.duration_since(entry.last_access) < ttl);

            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_access)
                    .map(|(key, _)| *key);
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                    debug!("Evicted least recently used session {}", oldest);
                }
            }
        }

        entries.insert(id, SessionEntry { value, last_access: now });
    }

    pub async fn remove(&self, id: &Uuid) -> Option<T> {
        self.entries.lock().await.remove(id).map(|entry| entry.value)
    }

    /// Drops every expired session; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let ttl = self.ttl;
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.last_access) < ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn spawn_purge(self: Arc<Self>, every: Duration) -> JoinHandle<()>
    where
        T: Sync,
    {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let purged = self.purge_expired().await;
                if purged > 0 {
                    debug!("Purged {} expired sessions", purged);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire() {
        let store = SessionStore::new(Duration::from_secs(60), 10);
        let id = Uuid::new_v4();
        store.insert(id, vec!["hello".to_string()]).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get(&id).await.is_some());

        // The read above refreshed the entry.
        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get(&id).await.is_some());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(store.get(&id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn full_store_evicts_least_recently_used() {
        let store = SessionStore::new(Duration::from_secs(600), 2);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store.insert(a, 1).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        store.insert(b, 2).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get(&a).await, Some(1));
        tokio::time::advance(Duration::from_secs(1)).await;

        store.insert(c, 3).await;

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get(&b).await, None);
        assert_eq!(store.get(&a).await, Some(1));
        assert_eq!(store.get(&c).await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_expired() {
        let store = SessionStore::new(Duration::from_secs(30), 10);
        let stale = Uuid::new_v4();
        let fresh = Uuid::new_v4();

        store.insert(stale, "old").await;
        tokio::time::advance(Duration::from_secs(20)).await;
        store.insert(fresh, "new").await;
        tokio::time::advance(Duration::from_secs(15)).await;

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.get(&fresh).await, Some("new"));
    }
}

//! Pool of reusable `name -> value` maps.
//!
//! Serializers ask the builder for a map view of a line's labels. Building a
//! fresh `HashMap` per line is wasteful, so modified lines borrow a map from
//! here. Borrow and return may happen on different threads.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::LazyLock;
use parking_lot::Mutex;

const MAX_IDLE_MAPS: usize = 64;

static GLOBAL_POOL: LazyLock<StringMapPool> = LazyLock::new(StringMapPool::new);

/// Process-wide pool used by `LabelsBuilder::map`.
pub fn global() -> &'static StringMapPool {
    &GLOBAL_POOL
}

#[derive(Debug)]
pub struct StringMapPool {
    idle: Mutex<Vec<HashMap<String, String>>>,
    max_idle: usize,
}

impl StringMapPool {
    pub fn new() -> Self {
        Self::with_max_idle(MAX_IDLE_MAPS)
    }

    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// An empty map, reused when one is idle.
    pub fn get(&self) -> HashMap<String, String> {
        match self.idle.lock().pop() {
            Some(mut m) => {
                m.clear();
                m
            }
            None => HashMap::new(),
        }
    }

    /// Give a map back. Dropped instead when enough maps are idle.
    pub fn put(&self, mut m: HashMap<String, String>) {
        m.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(m);
        }
    }

    /// Borrow a map that goes back to this pool when dropped.
    pub fn get_pooled(&self) -> PooledMap<'_> {
        PooledMap {
            map: Some(self.get()),
            pool: self,
        }
    }

    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

impl Default for StringMapPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A map on loan from a [`StringMapPool`]; returned exactly once, on drop.
#[derive(Debug)]
pub struct PooledMap<'p> {
    map: Option<HashMap<String, String>>,
    pool: &'p StringMapPool,
}

impl PooledMap<'_> {
    /// Keep the map instead of returning it.
    pub fn into_inner(mut self) -> HashMap<String, String> {
        self.map.take().unwrap_or_default()
    }
}

impl Deref for PooledMap<'_> {
    type Target = HashMap<String, String>;

    fn deref(&self) -> &Self::Target {
        // Only `into_inner` and `drop` take the map, and both consume `self`.
        self.map.as_ref().expect("pooled map already returned")
    }
}

impl DerefMut for PooledMap<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.map.as_mut().expect("pooled map already returned")
    }
}

impl Drop for PooledMap<'_> {
    fn drop(&mut self) {
        if let Some(m) = self.map.take() {
            self.pool.put(m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_cleared_map() {
        let pool = StringMapPool::new();
        let mut m = pool.get();
        m.insert("app".into(), "x".into());
        pool.put(m);
        assert_eq!(pool.idle(), 1);

        let m = pool.get();
        assert!(m.is_empty());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_idle_is_bounded() {
        let pool = StringMapPool::with_max_idle(2);
        for _ in 0..5 {
            pool.put(HashMap::new());
        }
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_pooled_map_returns_on_drop() {
        let pool = StringMapPool::new();
        {
            let mut m = pool.get_pooled();
            m.insert("env".into(), "prod".into());
            assert_eq!(m.get("env").map(String::as_str), Some("prod"));
        }
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_into_inner_keeps_map() {
        let pool = StringMapPool::new();
        let mut m = pool.get_pooled();
        m.insert("env".into(), "prod".into());
        let owned = m.into_inner();
        assert_eq!(owned.len(), 1);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_pool_crosses_threads() {
        let pool = std::sync::Arc::new(StringMapPool::new());
        let m = pool.get();
        let p = std::sync::Arc::clone(&pool);
        std::thread::spawn(move || p.put(m)).join().unwrap();
        assert_eq!(pool.idle(), 1);
    }
}

//! Response cache
//!
//! Successful responses are kept in memory for `ttl`, keyed on the canonical
//! request (messages and sampling options, never the request id). Identical
//! requests within that window are answered without calling a provider.

use crate::llm::messages::Role;
use crate::llm::request::CompletionRequest;
use crate::llm::response::CompletionResponse;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

/// `[cache]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// How long a response stays valid
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Maximum number of responses kept; least recently used go first
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: Duration::from_secs(600),
            capacity: 256,
        }
    }
}

/// Everything that determines what a provider is asked
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    messages: Vec<(Role, String)>,
    model: Option<String>,
    max_tokens: u32,
    temperature_bits: u32,
    top_p_bits: Option<u32>,
    stop: Vec<String>,
}

impl CacheKey {
    pub fn for_request(request: &CompletionRequest) -> Self {
        Self {
            messages: request
                .messages()
                .iter()
                .map(|m| (m.role, m.content.clone()))
                .collect(),
            model: request.model().map(str::to_string),
            max_tokens: request.max_tokens(),
            temperature_bits: request.temperature().to_bits(),
            top_p_bits: request.top_p().map(f32::to_bits),
            stop: request.stop().to_vec(),
        }
    }
}

struct Entry {
    response: CompletionResponse,
    expires_at: Instant,
}

/// Bounded, TTL-based cache of successful responses
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<LruCache<CacheKey, Entry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// A cache when `[cache] enabled` is set
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.ttl, config.capacity))
    }

    /// Fresh response for `key`; an expired entry is evicted
    pub fn get(&self, key: &CacheKey) -> Option<CompletionResponse> {
        let mut entries = self.entries.lock();
        let fresh = entries.get(key).map(|e| e.expires_at > Instant::now())?;
        if fresh {
            entries.get(key).map(|e| e.response.clone())
        } else {
            entries.pop(key);
            None
        }
    }

    pub fn insert(&self, key: CacheKey, response: CompletionResponse) {
        let entry = Entry {
            response,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.lock().put(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}

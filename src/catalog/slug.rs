//! Slug normalization and allocation.
//!
//! A title is transliterated to ASCII, lowercased and collapsed to
//! `a-z0-9` runs joined by single hyphens. Allocation probes a
//! namespace-bound [`SlugOracle`] with `base`, `base-2`, `base-3`, ... and
//! returns the first free candidate. The probe is a best-effort pre-check:
//! [`SlugAllocator::insert_unique`] re-probes past any candidate the store
//! rejects with [`StoreError::SlugTaken`].

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use std::future::Future;
use tracing::{debug, warn};

use super::{CatalogStore, SlugNamespace, StoreError};

pub const SLUG_MAX_LEN: usize = 96;
pub const DEFAULT_MAX_PROBES: usize = 1000;
pub const DEFAULT_MAX_INSERT_ATTEMPTS: usize = 8;

const FALLBACK_LEN: usize = 6;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, thiserror::Error)]
pub enum SlugError {
    #[error("no free slug for base `{base}` after {attempts} attempts")]
    Exhausted { base: String, attempts: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Existence check used while probing candidates.
#[async_trait]
pub trait SlugOracle: Send + Sync {
    async fn exists(&self, candidate: &str) -> Result<bool, StoreError>;
}

/// Oracle bound to one namespace of a catalog store.
pub struct NamespaceOracle<'a> {
    store: &'a dyn CatalogStore,
    namespace: SlugNamespace,
}

impl<'a> NamespaceOracle<'a> {
    #[must_use]
    pub fn new(store: &'a dyn CatalogStore, namespace: SlugNamespace) -> Self {
        Self { store, namespace }
    }
}

#[async_trait]
impl SlugOracle for NamespaceOracle<'_> {
    async fn exists(&self, candidate: &str) -> Result<bool, StoreError> {
        self.store.slug_exists(self.namespace, candidate).await
    }
}

/// Normalizes user input into a URL-safe slug (`a-z0-9-`).
/// Returns `None` when nothing alphanumeric survives transliteration.
#[must_use]
pub fn normalize(input: &str) -> Option<String> {
    let ascii = deunicode::deunicode(input);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    let truncated: String = slug.chars().take(SLUG_MAX_LEN).collect();
    let normalized = truncated.trim_end_matches('-');
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

/// Random six character base-36 token used when a title has no usable characters.
#[must_use]
pub fn fallback_base() -> String {
    let mut rng = rand::thread_rng();
    (0..FALLBACK_LEN)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect()
}

/// Base candidate for a title; never empty.
#[must_use]
pub fn base_for(title: &str) -> String {
    normalize(title).unwrap_or_else(fallback_base)
}

/// Builds a slug by appending a numeric `-{suffix}` to an existing base,
/// shortening the base so the result stays within [`SLUG_MAX_LEN`].
/// Returns `None` if no non-empty base segment remains.
#[must_use]
pub fn with_suffix(base: &str, suffix: usize) -> Option<String> {
    let suffix = format!("-{suffix}");
    if suffix.len() >= SLUG_MAX_LEN {
        return None;
    }
    let allowed = SLUG_MAX_LEN - suffix.len();
    let base_part: String = base.chars().take(allowed).collect();
    let base_part = base_part.trim_end_matches('-');
    if base_part.is_empty() {
        return None;
    }
    Some(format!("{base_part}{suffix}"))
}

/// Candidate at probe position `index`: the base itself, then `base-2`, `base-3`, ...
#[must_use]
pub fn candidate(base: &str, index: usize) -> Option<String> {
    if index == 0 {
        Some(base.to_string())
    } else {
        with_suffix(base, index + 1)
    }
}

/// Returns `true` for strings shaped like a slug.
#[must_use]
pub fn is_valid(slug: &str) -> bool {
    slug.len() <= SLUG_MAX_LEN
        && Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").is_ok_and(|re| re.is_match(slug))
}

#[derive(Debug, Clone, Copy)]
pub struct SlugAllocator {
    max_probes: usize,
    max_insert_attempts: usize,
}

impl Default for SlugAllocator {
    fn default() -> Self {
        Self {
            max_probes: DEFAULT_MAX_PROBES,
            max_insert_attempts: DEFAULT_MAX_INSERT_ATTEMPTS,
        }
    }
}

impl SlugAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_probes(mut self, max_probes: usize) -> Self {
        self.max_probes = max_probes;
        self
    }

    #[must_use]
    pub fn with_max_insert_attempts(mut self, attempts: usize) -> Self {
        self.max_insert_attempts = attempts;
        self
    }

    /// Returns the first candidate for `title` the oracle reports as free.
    ///
    /// # Errors
    /// Returns `SlugError::Exhausted` once the probe budget is spent, or the
    /// oracle's storage error.
    pub async fn allocate<O>(&self, title: &str, oracle: &O) -> Result<String, SlugError>
    where
        O: SlugOracle + ?Sized,
    {
        let base = base_for(title);
        let (_, slug) = self.probe(&base, 0, oracle).await?;
        Ok(slug)
    }

    /// Allocates a slug for `source` and hands it to `insert`. When the store
    /// rejects the slug as taken (a concurrent insert won the race), probing
    /// resumes after the rejected candidate.
    ///
    /// # Errors
    /// Returns `SlugError::Exhausted` when probes or insert attempts run out,
    /// or the first non-slug storage error from `insert`.
    pub async fn insert_unique<O, T, F, Fut>(
        &self,
        source: &str,
        oracle: &O,
        mut insert: F,
    ) -> Result<T, SlugError>
    where
        O: SlugOracle + ?Sized,
        F: FnMut(String) -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
    {
        let base = base_for(source);
        let mut start = 0;
        for _ in 0..self.max_insert_attempts {
            let (index, slug) = self.probe(&base, start, oracle).await?;
            match insert(slug.clone()).await {
                Ok(record) => return Ok(record),
                Err(StoreError::SlugTaken) => {
                    warn!(slug = %slug, "slug claimed concurrently, retrying with next suffix");
                    start = index + 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(SlugError::Exhausted {
            base,
            attempts: self.max_insert_attempts,
        })
    }

    async fn probe<O>(
        &self,
        base: &str,
        start: usize,
        oracle: &O,
    ) -> Result<(usize, String), SlugError>
    where
        O: SlugOracle + ?Sized,
    {
        for index in start..self.max_probes {
            let Some(slug) = candidate(base, index) else {
                break;
            };
            if !oracle.exists(&slug).await? {
                debug!(slug = %slug, attempt = index, "allocated slug");
                return Ok((index, slug));
            }
        }
        Err(SlugError::Exhausted {
            base: base.to_string(),
            attempts: self.max_probes,
        })
    }
}

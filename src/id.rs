//! Identifier allocation and the shared identifier registry.
//!
//! Identifiers have the shape `PREFIX-NNNNNN` with a 6-digit zero-padded
//! suffix. The allocator owns the set of identifiers known across every
//! tracked document; every successful allocation reserves its result in
//! that set before returning, so a tight allocation loop can never hand
//! out the same value twice.

use std::collections::HashSet;

use tracing::warn;

/// Default floor for the numeric suffix: generated identifiers start at
/// `PREFIX-100001`.
pub const DEFAULT_ID_FLOOR: u32 = 100_000;

/// Bounded attempts for sequential probing in [`IdAllocator::allocate_after`].
const MAX_PROBE_ATTEMPTS: u32 = 100;

/// Allocator and registry for task identifiers.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    prefix: String,
    floor: u32,
    known: HashSet<String>,
}

impl IdAllocator {
    /// Create an empty allocator for the given prefix and suffix floor.
    #[must_use]
    pub fn new(prefix: impl Into<String>, floor: u32) -> Self {
        Self {
            prefix: prefix.into(),
            floor,
            known: HashSet::new(),
        }
    }

    /// The identifier prefix this allocator generates.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of identifiers currently claimed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Whether no identifiers are claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Whether an identifier is already claimed.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    /// Claim an identifier. Returns false if it was already claimed.
    pub fn claim(&mut self, id: impl Into<String>) -> bool {
        self.known.insert(id.into())
    }

    /// Release an identifier, e.g. when its document is reparsed or
    /// dropped from tracking. Returns false if it was not claimed.
    pub fn release(&mut self, id: &str) -> bool {
        self.known.remove(id)
    }

    /// Allocate a fresh identifier strictly above the current maximum
    /// suffix (gaps are never filled), claiming it before returning.
    pub fn allocate(&mut self) -> String {
        let max = self
            .known
            .iter()
            .filter_map(|id| self.suffix(id))
            .max()
            .unwrap_or(self.floor);
        let id = self.format(max + 1);
        self.known.insert(id.clone());
        id
    }

    /// Allocate the next free identifier after `after`, probing linearly
    /// with a bounded attempt count.
    ///
    /// A malformed `after` falls back to [`IdAllocator::allocate`]; probe
    /// exhaustion falls back to a timestamp-suffixed identifier that is
    /// unique but does not follow the 6-digit convention.
    pub fn allocate_after(&mut self, after: &str) -> String {
        let Some(base) = self.suffix(after) else {
            return self.allocate();
        };

        for n in base + 1..=base + MAX_PROBE_ATTEMPTS {
            let candidate = self.format(n);
            if !self.known.contains(&candidate) {
                self.known.insert(candidate.clone());
                return candidate;
            }
        }

        let fallback = self.fallback_id();
        warn!(after, %fallback, "sequential probe exhausted, using fallback identifier");
        self.known.insert(fallback.clone());
        fallback
    }

    /// Extract the numeric suffix of a conforming identifier.
    ///
    /// Timestamp fallback identifiers overflow `u32` on purpose and are
    /// excluded from the max scan.
    fn suffix(&self, id: &str) -> Option<u32> {
        id.strip_prefix(&self.prefix)?
            .strip_prefix('-')?
            .parse()
            .ok()
    }

    fn format(&self, suffix: u32) -> String {
        format!("{}-{:06}", self.prefix, suffix)
    }

    fn fallback_id(&self) -> String {
        format!("{}-{}", self.prefix, chrono::Utc::now().timestamp_millis())
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new("PRD", DEFAULT_ID_FLOOR)
    }
}

// ============================================================================
// Tests
// ============================================================================

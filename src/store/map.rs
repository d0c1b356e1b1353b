//! Two-table store with progressive rehashing
//!
//! ## Rehash strategy
//! When the live table crosses `MAX_LOAD_FACTOR` entries per bucket it is
//! frozen as `legacy` and a doubled `current` table takes over inserts.
//! Every subsequent operation relinks up to `MIGRATION_WORK` entries from
//! `legacy` into `current`, bounding the worst-case latency of any single
//! operation while the growth cost amortizes. A new rehash cannot start
//! until `legacy` has drained.
//!
//! Relinking moves the owned chain nodes; keys and values keep their heap
//! addresses, so borrowed views handed out earlier stay valid until the key
//! itself is overwritten or removed.

use super::table::{Entry, HashTable};

/// Initial bucket count for a fresh table
const START_BUCKETS: usize = 8;

/// Average chain length that triggers a rehash
const MAX_LOAD_FACTOR: usize = 8;

/// Entries relinked per operation while a rehash is in progress
const MIGRATION_WORK: usize = 128;

/// Ceiling on the bucket count; growth stops here and the table keeps
/// operating at whatever load that implies
const MAX_BUCKETS: usize = 1 << 31;

/// FNV-1a over the key bytes, narrowed to 32 bits
pub(crate) fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash = 0x811c_9dc5u32;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Process-wide mapping from keys to values.
///
/// Owns the heap storage for both. References returned by the read paths
/// borrow from the store and are valid until the next mutation of the same
/// key.
pub struct Store {
    current: HashTable,
    /// Non-empty exactly while a rehash is in progress
    legacy: Option<HashTable>,
    /// Bucket index in `legacy` where migration resumes
    migrate_pos: usize,
}

impl Store {
    pub fn new() -> Store {
        Store {
            current: HashTable::with_buckets(START_BUCKETS),
            legacy: None,
            migrate_pos: 0,
        }
    }

    /// Look up a key.
    ///
    /// Consults `legacy` first while a rehash is in progress; a miss there
    /// advances the migration before probing `current`, so reads make rehash
    /// progress too.
    pub fn get(&mut self, key: &[u8]) -> Option<&[u8]> {
        let hash = fnv1a(key);
        let hit_legacy = match &self.legacy {
            Some(table) => table.lookup(hash, key).is_some(),
            None => false,
        };
        if hit_legacy {
            return self
                .legacy
                .as_ref()?
                .lookup(hash, key)
                .map(Entry::value);
        }
        self.migrate_step();
        self.current.lookup(hash, key).map(Entry::value)
    }

    /// Insert a key or overwrite its value.
    ///
    /// The store clones both key and value so it owns their storage; an
    /// overwrite drops the old value. An entry found in `legacy` is relinked
    /// into `current` on the spot.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        let hash = fnv1a(key);
        if let Some(entry) = self.current.lookup_mut(hash, key) {
            entry.set_value(value);
        } else if let Some(mut entry) = self
            .legacy
            .as_mut()
            .and_then(|table| table.detach(hash, key))
        {
            entry.set_value(value);
            self.current.insert(entry);
        } else {
            self.current.insert(Entry::new(key, value, hash));
            self.maybe_grow();
        }
        self.migrate_step();
    }

    /// Remove a key, dropping its entry and storage.
    ///
    /// Returns whether the key existed. Falls back to `legacy` while a
    /// rehash is in progress so a key that has not migrated yet is still
    /// found.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        let hash = fnv1a(key);
        let removed = self
            .current
            .detach(hash, key)
            .or_else(|| {
                self.legacy
                    .as_mut()
                    .and_then(|table| table.detach(hash, key))
            })
            .is_some();
        self.migrate_step();
        removed
    }

    /// Number of live keys across both tables
    pub fn len(&self) -> usize {
        self.current.len() + self.legacy.as_ref().map_or(0, HashTable::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a rehash is currently in progress
    pub fn is_rehashing(&self) -> bool {
        self.legacy.is_some()
    }

    /// Bucket count of the live table
    pub fn bucket_count(&self) -> usize {
        self.current.bucket_count()
    }

    /// Visit every stored pair exactly once, `legacy` first then `current`.
    ///
    /// No snapshot promise: the store must not be mutated while iterating.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.legacy
            .iter()
            .flat_map(HashTable::iter)
            .chain(self.current.iter())
    }

    /// Freeze `current` as `legacy` and install a doubled table when the
    /// load threshold is crossed. Only fires between rehashes.
    fn maybe_grow(&mut self) {
        if self.legacy.is_some() {
            return;
        }
        if self.current.len() < self.current.bucket_count() * MAX_LOAD_FACTOR {
            return;
        }
        let doubled = self.current.bucket_count() * 2;
        if doubled > MAX_BUCKETS {
            return;
        }
        let fresh = HashTable::with_buckets(doubled);
        self.legacy = Some(std::mem::replace(&mut self.current, fresh));
        self.migrate_pos = 0;
    }

    /// Relink up to `MIGRATION_WORK` entries from `legacy` into `current`
    fn migrate_step(&mut self) {
        let Some(legacy) = &mut self.legacy else {
            return;
        };
        for _ in 0..MIGRATION_WORK {
            match legacy.detach_from(self.migrate_pos) {
                Some((slot, entry)) => {
                    self.migrate_pos = slot;
                    self.current.insert(entry);
                }
                None => break,
            }
        }
        if legacy.is_empty() {
            self.legacy = None;
            self.migrate_pos = 0;
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

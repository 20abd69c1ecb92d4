//! Memory slot identity tokens.
//!
//! A [`MemoryModuleType<T>`] names one typed slot in an actor's memory. Every
//! construction draws a fresh id, so two slots never compare equal just
//! because they share a name. Declare them once, typically in a
//! `LazyLock` static, and reuse the token everywhere.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

use super::MemoryValue;

static NEXT_SLOT_ID: AtomicU32 = AtomicU32::new(0);

/// Type-erased handle to a memory slot.
///
/// Equality, ordering and hashing use the interned id only.
#[derive(Debug, Clone, Copy)]
pub struct MemoryKey {
    id: u32,
    name: &'static str,
}

impl MemoryKey {
    /// Human-readable slot name (also the persistence key).
    #[must_use]
    pub fn name(self) -> &'static str {
        self.name
    }

    /// Interned id.
    #[must_use]
    pub fn id(self) -> u32 {
        self.id
    }
}

impl PartialEq for MemoryKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MemoryKey {}

impl Hash for MemoryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for MemoryKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MemoryKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for MemoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A typed memory slot token. The type parameter is the value type stored in
/// the slot; one token always maps to exactly one value type.
pub struct MemoryModuleType<T> {
    key: MemoryKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: MemoryValue> MemoryModuleType<T> {
    /// Intern a new slot token.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let id = NEXT_SLOT_ID.fetch_add(1, AtomicOrdering::Relaxed);
        Self {
            key: MemoryKey { id, name },
            _marker: PhantomData,
        }
    }
}

impl<T> MemoryModuleType<T> {
    /// The erased key of this slot.
    #[must_use]
    pub fn key(&self) -> MemoryKey {
        self.key
    }

    /// Slot name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.key.name
    }
}

impl<T> Clone for MemoryModuleType<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MemoryModuleType<T> {}

impl<T> PartialEq for MemoryModuleType<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for MemoryModuleType<T> {}

impl<T> fmt::Debug for MemoryModuleType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryModuleType")
            .field("name", &self.key.name)
            .field("id", &self.key.id)
            .field("value_type", &std::any::type_name::<T>())
            .finish()
    }
}

/// Status a slot can be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryStatus {
    /// The slot exists in this brain, whatever its content.
    Registered,
    /// The slot exists and holds a value.
    ValuePresent,
    /// The slot exists and is empty.
    ValueAbsent,
}

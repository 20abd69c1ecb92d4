//! The per-actor memory store.
//!
//! A [`MemoryStore`] is a fixed set of typed slots, each holding at most one
//! [`Memory`]. The set of slots is decided when the brain is built; writes to
//! a slot that was never registered are ignored and reads of it come back
//! empty, so a misconfigured profile degrades instead of crashing the tick
//! loop.

mod module_type;
mod value;

pub use module_type::{MemoryKey, MemoryModuleType, MemoryStatus};
pub use value::{Memory, MemoryValue};

pub(crate) use value::ErasedValue;

use std::collections::{BTreeMap, HashMap};

use tracing::{trace, warn};

use crate::persistence::{MemorySnapshot, SavedMemory, SlotCodec};

struct Slot {
    memory: Option<Memory<Box<dyn ErasedValue>>>,
    codec: Option<SlotCodec>,
}

/// Typed slots with optional expiry.
#[derive(Default)]
pub struct MemoryStore {
    slots: BTreeMap<MemoryKey, Slot>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (key, slot) in &self.slots {
            let state = match &slot.memory {
                None => "absent".to_string(),
                Some(m) => match m.time_to_live() {
                    Some(ttl) => format!("present (ttl {ttl})"),
                    None => "present".to_string(),
                },
            };
            map.entry(&key.name(), &state);
        }
        map.finish()
    }
}

impl MemoryStore {
    /// Create a store with no slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a slot. Registering twice is harmless.
    pub fn register<T: MemoryValue>(&mut self, slot: &MemoryModuleType<T>) {
        self.register_key(slot.key());
    }

    /// Register a slot by its erased key.
    pub fn register_key(&mut self, key: MemoryKey) {
        self.slots.entry(key).or_insert(Slot {
            memory: None,
            codec: None,
        });
    }

    pub(crate) fn register_persistent(&mut self, key: MemoryKey, codec: SlotCodec) {
        self.register_key(key);
        if let Some(slot) = self.slots.get_mut(&key) {
            slot.codec = Some(codec);
        }
    }

    /// Whether `key` is one of this store's slots.
    #[must_use]
    pub fn is_registered(&self, key: MemoryKey) -> bool {
        self.slots.contains_key(&key)
    }

    /// All registered slots, in registration-id order.
    pub fn registered_slots(&self) -> impl Iterator<Item = MemoryKey> + '_ {
        self.slots.keys().copied()
    }

    /// Number of slots currently holding a value.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.slots.values().filter(|s| s.memory.is_some()).count()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Store a value that never expires.
    pub fn set<T: MemoryValue>(&mut self, slot: &MemoryModuleType<T>, value: T) {
        self.insert(slot.key(), Box::new(value), None);
    }

    /// Store a value that expires after `ttl` aging passes.
    pub fn set_with_expiry<T: MemoryValue>(&mut self, slot: &MemoryModuleType<T>, value: T, ttl: u64) {
        self.insert(slot.key(), Box::new(value), Some(ttl));
    }

    /// Store `Some(value)` or erase on `None`.
    pub fn set_optional<T: MemoryValue>(&mut self, slot: &MemoryModuleType<T>, value: Option<T>) {
        match value {
            Some(value) => self.set(slot, value),
            None => self.erase(slot),
        }
    }

    /// Clear a slot.
    pub fn erase<T>(&mut self, slot: &MemoryModuleType<T>) {
        self.erase_key(slot.key());
    }

    /// Clear a slot by its erased key.
    pub fn erase_key(&mut self, key: MemoryKey) {
        match self.slots.get_mut(&key) {
            Some(slot) => slot.memory = None,
            None => trace!(slot = %key, "erase of unregistered memory slot ignored"),
        }
    }

    fn insert(&mut self, key: MemoryKey, value: Box<dyn ErasedValue>, ttl: Option<u64>) {
        let Some(slot) = self.slots.get_mut(&key) else {
            trace!(slot = %key, "write to unregistered memory slot ignored");
            return;
        };
        if value.is_empty_value() {
            slot.memory = None;
            return;
        }
        slot.memory = Some(match ttl {
            Some(ttl) => Memory::with_expiry(value, ttl),
            None => Memory::new(value),
        });
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The value in `slot`, if registered and present.
    #[must_use]
    pub fn get<T: MemoryValue>(&self, slot: &MemoryModuleType<T>) -> Option<&T> {
        self.slots
            .get(&slot.key())?
            .memory
            .as_ref()?
            .value()
            .as_ref()
            .as_any()
            .downcast_ref::<T>()
    }

    /// Whether `slot` holds a value.
    #[must_use]
    pub fn has_value<T>(&self, slot: &MemoryModuleType<T>) -> bool {
        self.has(slot.key(), MemoryStatus::ValuePresent)
    }

    /// Whether `slot` holds exactly `value`.
    #[must_use]
    pub fn is_value<T: MemoryValue + PartialEq>(&self, slot: &MemoryModuleType<T>, value: &T) -> bool {
        self.get(slot).is_some_and(|stored| stored == value)
    }

    /// Check a slot against a status. Every check on an unregistered slot is
    /// false.
    #[must_use]
    pub fn has(&self, key: MemoryKey, status: MemoryStatus) -> bool {
        let Some(slot) = self.slots.get(&key) else {
            return false;
        };
        match status {
            MemoryStatus::Registered => true,
            MemoryStatus::ValuePresent => slot.memory.is_some(),
            MemoryStatus::ValueAbsent => slot.memory.is_none(),
        }
    }

    /// Remaining ticks before `slot` expires; `None` if empty or unbounded.
    #[must_use]
    pub fn time_until_expiry<T>(&self, slot: &MemoryModuleType<T>) -> Option<u64> {
        self.slots.get(&slot.key())?.memory.as_ref()?.time_to_live()
    }

    /// Remaining TTL per present slot, for debug views.
    pub(crate) fn present_entries(&self) -> impl Iterator<Item = (MemoryKey, Option<u64>)> + '_ {
        self.slots
            .iter()
            .filter_map(|(key, slot)| slot.memory.as_ref().map(|m| (*key, m.time_to_live())))
    }

    // ------------------------------------------------------------------
    // Aging
    // ------------------------------------------------------------------

    /// Count down every present memory and erase the expired ones.
    ///
    /// Returns the number of memories that expired.
    pub fn age_all(&mut self) -> usize {
        let mut expired = 0;
        for (key, slot) in &mut self.slots {
            let Some(memory) = slot.memory.as_mut() else {
                continue;
            };
            memory.tick();
            if memory.has_expired() {
                slot.memory = None;
                expired += 1;
                trace!(slot = %key, "memory expired");
            }
        }
        expired
    }

    // ------------------------------------------------------------------
    // Persistence hook
    // ------------------------------------------------------------------

    /// Export every present persistent slot, keyed by slot name.
    #[must_use]
    pub fn snapshot(&self) -> MemorySnapshot {
        let mut snapshot = MemorySnapshot::default();
        for (key, slot) in &self.slots {
            let (Some(codec), Some(memory)) = (slot.codec, slot.memory.as_ref()) else {
                continue;
            };
            match codec.encode(memory.value().as_ref().as_any()) {
                Some(Ok(value)) => {
                    snapshot.entries.insert(
                        key.name().to_string(),
                        SavedMemory {
                            value,
                            ttl: memory.time_to_live(),
                        },
                    );
                }
                Some(Err(e)) => warn!(slot = %key, error = %e, "Failed to encode memory"),
                None => warn!(slot = %key, "Stored value does not match its slot type"),
            }
        }
        snapshot
    }

    /// Load persistent slots from `snapshot`. Entries with no matching
    /// persistent slot, or that fail to decode, are skipped.
    ///
    /// Returns the number of memories restored.
    pub fn restore(&mut self, snapshot: &MemorySnapshot) -> usize {
        let persistent: HashMap<&'static str, (MemoryKey, SlotCodec)> = self
            .slots
            .iter()
            .filter_map(|(key, slot)| slot.codec.map(|codec| (key.name(), (*key, codec))))
            .collect();

        let mut restored = 0;
        for (name, saved) in &snapshot.entries {
            let Some(&(key, codec)) = persistent.get(name.as_str()) else {
                warn!(slot = %name, "Snapshot entry has no persistent slot, skipping");
                continue;
            };
            match codec.decode(saved.value.clone()) {
                Ok(value) => {
                    self.insert(key, value, saved.ttl);
                    if self.has(key, MemoryStatus::ValuePresent) {
                        restored += 1;
                    }
                }
                Err(e) => warn!(slot = %name, error = %e, "Failed to decode memory, skipping"),
            }
        }
        restored
    }
}

//! Memory values and their expiry countdown.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// A value that can live in a memory slot.
///
/// Collections report emptiness so that storing an empty collection erases
/// the slot instead of keeping a present-but-empty value. Scalar types use the
/// default (never empty); implement it with an empty `impl` block for your
/// own types.
pub trait MemoryValue: Any + Send {
    /// Whether this value counts as "nothing" for presence checks.
    fn is_empty_value(&self) -> bool {
        false
    }
}

macro_rules! scalar_memory_values {
    ($($ty:ty),* $(,)?) => {
        $(impl MemoryValue for $ty {})*
    };
}

scalar_memory_values!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    &'static str, String,
);

impl<T: Send + 'static> MemoryValue for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Send + 'static> MemoryValue for VecDeque<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Send + 'static, S: Send + 'static> MemoryValue for HashSet<T, S> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Send + 'static> MemoryValue for BTreeSet<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K: Send + 'static, V: Send + 'static, S: Send + 'static> MemoryValue for HashMap<K, V, S> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K: Send + 'static, V: Send + 'static> MemoryValue for BTreeMap<K, V> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<A: MemoryValue, B: MemoryValue> MemoryValue for (A, B) {}

/// Object-safe view of a stored value.
pub(crate) trait ErasedValue: Send {
    fn as_any(&self) -> &dyn Any;
    fn is_empty_value(&self) -> bool;
}

impl<T: MemoryValue> ErasedValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_empty_value(&self) -> bool {
        MemoryValue::is_empty_value(self)
    }
}

/// A remembered value with an optional time-to-live.
///
/// Memories created without a TTL never expire. A memory created with a TTL
/// of `n` ticks expires after `n` calls to [`Memory::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct Memory<T> {
    value: T,
    ttl: Option<u64>,
}

impl<T> Memory<T> {
    /// A memory that never expires.
    pub fn new(value: T) -> Self {
        Self { value, ttl: None }
    }

    /// A memory that expires after `ttl` ticks.
    pub fn with_expiry(value: T, ttl: u64) -> Self {
        Self {
            value,
            ttl: Some(ttl),
        }
    }

    /// The remembered value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Take the remembered value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Count down one tick.
    pub fn tick(&mut self) {
        if let Some(ttl) = self.ttl.as_mut() {
            *ttl = ttl.saturating_sub(1);
        }
    }

    /// Whether a finite countdown has reached zero.
    pub fn has_expired(&self) -> bool {
        self.ttl == Some(0)
    }

    /// Whether this memory was created with a TTL.
    pub fn can_expire(&self) -> bool {
        self.ttl.is_some()
    }

    /// Remaining ticks, `None` for memories without TTL.
    pub fn time_to_live(&self) -> Option<u64> {
        self.ttl
    }
}

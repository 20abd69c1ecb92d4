//! Perception: sensors that refresh memory from the world.
//!
//! Sensors run once per brain tick, after aging and before task scheduling.
//! A sensor registered with a scan rate of N refreshes every N brain ticks.

use std::fmt;

use tracing::trace;

use crate::memory::{MemoryKey, MemoryStore};

/// A world → memory refresh routine.
pub trait Sensor<W, A>: Send {
    /// Name for logs and debug views.
    fn name(&self) -> &'static str;

    /// Memory slots this sensor writes. They are registered on the brain
    /// when the sensor is added.
    fn requires(&self) -> Vec<MemoryKey>;

    /// Read the world and update memory.
    fn tick(&mut self, world: &W, actor: &A, memory: &mut MemoryStore, now: u64);
}

struct SensorSlot<W, A> {
    sensor: Box<dyn Sensor<W, A>>,
    scan_rate: u64,
    time_to_tick: u64,
}

/// Ordered sensors with per-sensor scan rates.
pub struct SensorRegistry<W, A> {
    slots: Vec<SensorSlot<W, A>>,
}

impl<W, A> Default for SensorRegistry<W, A> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<W, A> fmt::Debug for SensorRegistry<W, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|s| (s.sensor.name(), s.scan_rate, s.time_to_tick)))
            .finish()
    }
}

impl<W, A> SensorRegistry<W, A> {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sensor. `initial_phase` is the number of brain ticks until
    /// its first refresh, clamped to `1..=scan_rate`.
    pub fn push(&mut self, sensor: Box<dyn Sensor<W, A>>, scan_rate: u64, initial_phase: u64) {
        let scan_rate = scan_rate.max(1);
        self.slots.push(SensorSlot {
            sensor,
            scan_rate,
            time_to_tick: initial_phase.clamp(1, scan_rate),
        });
    }

    /// Advance every sensor by one brain tick, refreshing those that are due.
    ///
    /// Returns the number of sensors refreshed.
    pub fn tick_all(&mut self, world: &W, actor: &A, memory: &mut MemoryStore, now: u64) -> usize {
        let mut refreshed = 0;
        for slot in &mut self.slots {
            slot.time_to_tick -= 1;
            if slot.time_to_tick == 0 {
                slot.time_to_tick = slot.scan_rate;
                trace!(sensor = slot.sensor.name(), "sensor refresh");
                slot.sensor.tick(world, actor, memory, now);
                refreshed += 1;
            }
        }
        refreshed
    }

    /// Number of sensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no sensors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Sensor names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|s| s.sensor.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryModuleType;

    struct Counter {
        slot: MemoryModuleType<u64>,
    }

    impl Sensor<(), ()> for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn requires(&self) -> Vec<MemoryKey> {
            vec![self.slot.key()]
        }

        fn tick(&mut self, _world: &(), _actor: &(), memory: &mut MemoryStore, _now: u64) {
            let seen = memory.get(&self.slot).copied().unwrap_or(0);
            memory.set(&self.slot, seen + 1);
        }
    }

    fn store_for(slot: &MemoryModuleType<u64>) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.register(slot);
        store
    }

    #[test]
    fn default_rate_refreshes_every_tick() {
        let slot = MemoryModuleType::<u64>::new("count");
        let mut memory = store_for(&slot);
        let mut registry = SensorRegistry::new();
        registry.push(Box::new(Counter { slot }), 1, 1);

        for now in 0..5 {
            assert_eq!(registry.tick_all(&(), &(), &mut memory, now), 1);
        }
        assert_eq!(memory.get(&slot), Some(&5));
    }

    #[test]
    fn scan_rate_spaces_refreshes() {
        let slot = MemoryModuleType::<u64>::new("count");
        let mut memory = store_for(&slot);
        let mut registry = SensorRegistry::new();
        registry.push(Box::new(Counter { slot }), 4, 1);

        let refreshed: Vec<usize> = (0..9).map(|now| registry.tick_all(&(), &(), &mut memory, now)).collect();
        assert_eq!(refreshed, vec![1, 0, 0, 0, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn phase_delays_first_refresh() {
        let slot = MemoryModuleType::<u64>::new("count");
        let mut memory = store_for(&slot);
        let mut registry = SensorRegistry::new();
        registry.push(Box::new(Counter { slot }), 3, 3);

        assert_eq!(registry.tick_all(&(), &(), &mut memory, 0), 0);
        assert_eq!(registry.tick_all(&(), &(), &mut memory, 1), 0);
        assert_eq!(registry.tick_all(&(), &(), &mut memory, 2), 1);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["counter"]);
    }
}

//! Activities of the village brains.

use std::sync::LazyLock;

use synapse_core::Activity;

/// Always active: threat reactions and movement.
pub static CORE: LazyLock<Activity> = LazyLock::new(|| Activity::new("core"));
/// Loitering around home.
pub static IDLE: LazyLock<Activity> = LazyLock::new(|| Activity::new("idle"));
/// Daytime chores close to home.
pub static WORK: LazyLock<Activity> = LazyLock::new(|| Activity::new("work"));
/// Night: go home and stay there.
pub static REST: LazyLock<Activity> = LazyLock::new(|| Activity::new("rest"));
/// Engaging an attack target.
pub static FIGHT: LazyLock<Activity> = LazyLock::new(|| Activity::new("fight"));
/// Running away from a threat.
pub static PANIC: LazyLock<Activity> = LazyLock::new(|| Activity::new("panic"));

//! Delayed work scheduled on the game clock.

use folio_core::schedule::TaskScheduler;

/// Something to do later. Entity-bound tasks are scheduled with
/// `schedule_for` so they die with their entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameTask {
    /// Undo a hit flash on a target.
    RestoreColor(hecs::Entity),
    /// Remove a transient effect (impact marker, tracer).
    Despawn(hecs::Entity),
    /// Weapon returns to rest and can fire again.
    EndRecoil,
    EndMuzzleFlash,
    /// Re-capture the cursor after a popup closed, if still playing.
    RelockCursor,
}

pub type Scheduler = TaskScheduler<GameTask>;

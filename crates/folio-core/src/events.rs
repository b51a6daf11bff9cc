use std::collections::VecDeque;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Everything one part of the game announces to the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    WorldLoaded { surfaces: usize },
    WorldFailed { error: String },
    TargetSpawned { name: String, fallback: bool },
    AllTargetsLoaded { count: usize },
    ShotFired,
    ShotMissed,
    TargetHit { name: String, health: i32 },
    TargetKilled { name: String },
    TargetUnlocked { name: String },
    TargetRemoved { name: String },
    PlayerReset { position: [f32; 3] },
    PositionSaved { position: [f32; 3] },
    PositionDiscarded,
    StateChanged { state: String },
    PopupOpened { name: String },
    PopupClosed,
}

impl GameEvent {
    /// Dotted event type, used in log lines and scripted expectations.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::WorldLoaded { .. } => "world.loaded",
            Self::WorldFailed { .. } => "world.failed",
            Self::TargetSpawned { .. } => "target.spawned",
            Self::AllTargetsLoaded { .. } => "target.all_loaded",
            Self::ShotFired => "weapon.fired",
            Self::ShotMissed => "weapon.missed",
            Self::TargetHit { .. } => "target.hit",
            Self::TargetKilled { .. } => "target.killed",
            Self::TargetUnlocked { .. } => "target.unlocked",
            Self::TargetRemoved { .. } => "target.removed",
            Self::PlayerReset { .. } => "player.reset",
            Self::PositionSaved { .. } => "player.saved",
            Self::PositionDiscarded => "player.discarded",
            Self::StateChanged { .. } => "ui.state",
            Self::PopupOpened { .. } => "ui.popup_opened",
            Self::PopupClosed => "ui.popup_closed",
        }
    }
}

/// An event stamped with the bus clock at emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(flatten)]
    pub event: GameEvent,
    pub timestamp: f64,
}

/// Central event bus with ring buffer logging.
pub struct EventBus {
    log: VecDeque<EventRecord>,
    log_capacity: usize,
    /// Append flushed events as JSON lines when set.
    log_file: Option<PathBuf>,
    total_time: f64,
    pending: Vec<EventRecord>,
}

impl EventBus {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            log: VecDeque::with_capacity(log_capacity),
            log_capacity,
            log_file: None,
            total_time: 0.0,
            pending: Vec::new(),
        }
    }

    pub fn enable_file_logging(&mut self, path: PathBuf) {
        tracing::info!("Event log file: {}", path.display());
        self.log_file = Some(path);
    }

    /// Queue an event until the next flush.
    pub fn emit(&mut self, event: GameEvent) {
        tracing::debug!("event {}: {:?}", event.event_type(), event);
        self.pending.push(EventRecord {
            event,
            timestamp: self.total_time,
        });
    }

    /// Flush pending events into the ring buffer and the log file.
    /// Returns the flushed events so the frame loop can route them.
    pub fn flush(&mut self) -> Vec<EventRecord> {
        let records: Vec<EventRecord> = self.pending.drain(..).collect();

        for record in &records {
            if self.log.len() >= self.log_capacity {
                self.log.pop_front();
            }
            self.log.push_back(record.clone());

            if let Some(log_path) = &self.log_file {
                if let Err(e) = append_json_line(log_path, record) {
                    tracing::warn!("Failed to append event log {}: {}", log_path.display(), e);
                }
            }
        }

        records
    }

    pub fn tick(&mut self, dt: f64) {
        self.total_time += dt;
    }

    /// Count logged events matching `pred`.
    pub fn count<P>(&self, pred: P) -> usize
    where
        P: Fn(&GameEvent) -> bool,
    {
        self.log.iter().filter(|r| pred(&r.event)).count()
    }

}

fn append_json_line(path: &PathBuf, record: &EventRecord) -> std::io::Result<()> {
    use std::io::Write;
    let json = serde_json::to_string(record)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_returns_pending_in_order() {
        let mut bus = EventBus::new(100);
        bus.emit(GameEvent::TargetUnlocked {
            name: "MERITOS".into(),
        });
        bus.emit(GameEvent::ShotMissed);
        assert_eq!(bus.count(|_| true), 0);

        let flushed = bus.flush();
        assert_eq!(flushed.len(), 2);
        assert_eq!(
            flushed[0].event,
            GameEvent::TargetUnlocked {
                name: "MERITOS".into()
            }
        );
        assert_eq!(bus.count(|e| e.event_type() == "weapon.missed"), 1);
        assert!(bus.flush().is_empty());
    }

    #[test]
    fn test_ring_buffer_capacity() {
        let mut bus = EventBus::new(3);
        for i in 0..5 {
            bus.emit(GameEvent::TargetHit {
                name: "t".into(),
                health: i,
            });
        }
        bus.flush();

        assert_eq!(bus.count(|_| true), 3);
        assert_eq!(
            bus.count(|e| matches!(e, GameEvent::TargetHit { health, .. } if *health < 2)),
            0
        );
    }

    #[test]
    fn test_timestamps_follow_tick() {
        let mut bus = EventBus::new(10);
        bus.tick(1.5);
        bus.emit(GameEvent::PopupClosed);
        let flushed = bus.flush();
        assert_eq!(flushed[0].timestamp, 1.5);
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = EventRecord {
            event: GameEvent::TargetRemoved { name: "x".into() },
            timestamp: 2.0,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "target_removed");
        assert_eq!(json["name"], "x");
        assert_eq!(json["timestamp"], 2.0);
    }
}

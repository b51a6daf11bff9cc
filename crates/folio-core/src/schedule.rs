//! Game-time scheduling: one-shot delayed tasks and repeating intervals.
//!
//! Tasks may be owned by an entity. Removing the entity cancels everything it
//! owns, so a delayed color restore can never touch a despawned target.

/// Handle returned by [`TaskScheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug)]
struct ScheduledTask<T> {
    id: TaskId,
    owner: Option<hecs::Entity>,
    due: f64,
    task: T,
}

/// Delayed tasks keyed on game time, advanced by the frame loop.
#[derive(Debug)]
pub struct TaskScheduler<T> {
    tasks: Vec<ScheduledTask<T>>,
    next_id: u64,
    now: f64,
}

impl<T> Default for TaskScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskScheduler<T> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 0,
            now: 0.0,
        }
    }

    /// Run `task` after `delay` seconds of game time.
    pub fn schedule(&mut self, delay: f32, task: T) -> TaskId {
        self.insert(None, delay, task)
    }

    /// Like [`schedule`](Self::schedule), but cancelled along with `owner`.
    pub fn schedule_for(&mut self, owner: hecs::Entity, delay: f32, task: T) -> TaskId {
        self.insert(Some(owner), delay, task)
    }

    fn insert(&mut self, owner: Option<hecs::Entity>, delay: f32, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(ScheduledTask {
            id,
            owner,
            due: self.now + delay.max(0.0) as f64,
            task,
        });
        id
    }

    /// Drop every pending task owned by `owner`. Returns how many were dropped.
    pub fn cancel_owned_by(&mut self, owner: hecs::Entity) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.owner != Some(owner));
        before - self.tasks.len()
    }

    /// Advance the clock and return every task that came due, earliest first.
    /// Tasks due at the same instant keep scheduling order.
    pub fn advance(&mut self, dt: f32) -> Vec<T> {
        self.now += dt as f64;
        let now = self.now;

        let mut due = Vec::new();
        let mut i = 0;
        while i < self.tasks.len() {
            if self.tasks[i].due <= now {
                due.push(self.tasks.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.id.0.cmp(&b.id.0)));
        due.into_iter().map(|t| t.task).collect()
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn now(&self) -> f64 {
        self.now
    }
}

/// Repeating timer, e.g. autosave every 10 s.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    period: f32,
    elapsed: f32,
}

impl IntervalTimer {
    pub fn new(period: f32) -> Self {
        Self {
            period: period.max(f32::EPSILON),
            elapsed: 0.0,
        }
    }

    /// Advance by `dt`. True when at least one period boundary was crossed.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        if self.elapsed >= self.period {
            self.elapsed %= self.period;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_fire_in_due_order() {
        let mut sched = TaskScheduler::new();
        sched.schedule(0.3, "late");
        sched.schedule(0.1, "early");
        sched.schedule(0.1, "early-second");

        assert!(sched.advance(0.05).is_empty());
        assert_eq!(sched.advance(0.3), vec!["early", "early-second", "late"]);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn test_cancel_owned_by() {
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let mut sched = TaskScheduler::new();
        sched.schedule_for(a, 0.2, "restore a");
        sched.schedule_for(b, 0.2, "restore b");
        sched.schedule(0.2, "global");

        assert_eq!(sched.pending(), 3);
        assert_eq!(sched.cancel_owned_by(a), 1);
        assert_eq!(sched.cancel_owned_by(a), 0);
        assert_eq!(sched.advance(0.5), vec!["restore b", "global"]);
    }

    #[test]
    fn test_interval_timer() {
        let mut timer = IntervalTimer::new(2.0);
        assert!(!timer.tick(1.0));
        assert!(timer.tick(1.5));
        assert!(!timer.tick(1.0));
        assert!(timer.tick(0.6));
    }
}

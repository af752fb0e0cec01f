use std::time::Duration;

/// Handle to a scheduled alarm, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug)]
struct Entry<T> {
    id: TaskId,
    due: Duration,
    task: T,
}

/// Virtual-time alarm queue.
///
/// Time only moves when the owner drains it with [`Scheduler::pop_due`] and
/// [`Scheduler::settle`]. Alarms due at the same instant fire in the order
/// they were scheduled.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    pending: Vec<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.pending.push(Entry {
            id,
            due: self.now + delay,
            task,
        });
        id
    }

    /// Remove a pending alarm. Returns false if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|e| e.id != id);
        self.pending.len() != before
    }

    pub fn cancel_all<I: IntoIterator<Item = TaskId>>(&mut self, ids: I) {
        for id in ids {
            self.cancel(id);
        }
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.pending.iter().any(|e| e.id == id)
    }

    /// When `id` is due, if it is still pending.
    pub fn due_at(&self, id: TaskId) -> Option<Duration> {
        self.pending.iter().find(|e| e.id == id).map(|e| e.due)
    }

    /// Remove and return the earliest alarm due at or before `deadline`,
    /// moving the clock to its due time.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<T> {
        let (pos, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= deadline)
            .min_by_key(|(_, e)| (e.due, e.id))?;

        let entry = self.pending.remove(pos);
        self.now = self.now.max(entry.due);
        Some(entry.task)
    }

    /// Move the clock to `deadline` once everything due has been popped.
    pub fn settle(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(s: &mut Scheduler<&'static str>, deadline: Duration) -> Vec<&'static str> {
        let mut fired = Vec::new();
        while let Some(t) = s.pop_due(deadline) {
            fired.push(t);
        }
        s.settle(deadline);
        fired
    }

    #[test]
    fn fires_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_millis(300), "c");
        s.schedule(Duration::from_millis(100), "a");
        s.schedule(Duration::from_millis(200), "b");

        assert_eq!(drain(&mut s, Duration::from_millis(250)), vec!["a", "b"]);
        assert_eq!(s.now(), Duration::from_millis(250));
        assert_eq!(drain(&mut s, Duration::from_secs(1)), vec!["c"]);
        assert!(s.is_empty());
    }

    #[test]
    fn ties_fire_in_schedule_order() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_secs(2), "tick");
        s.schedule(Duration::from_secs(2), "react");

        assert_eq!(drain(&mut s, Duration::from_secs(2)), vec!["tick", "react"]);
    }

    #[test]
    fn cancelled_alarms_never_fire() {
        let mut s = Scheduler::new();
        let id = s.schedule(Duration::from_secs(1), "gone");
        s.schedule(Duration::from_secs(1), "kept");

        assert!(s.is_pending(id));
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(!s.is_pending(id));
        assert_eq!(drain(&mut s, Duration::from_secs(5)), vec!["kept"]);
    }

    #[test]
    fn delays_are_relative_to_the_moving_clock() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_secs(1), "first");
        assert_eq!(s.pop_due(Duration::from_secs(10)), Some("first"));

        // scheduled while handling "first", so relative to t=1s
        let id = s.schedule(Duration::from_secs(1), "second");
        assert_eq!(s.due_at(id), Some(Duration::from_secs(2)));
    }

    #[test]
    fn nothing_due_leaves_clock_for_settle() {
        let mut s: Scheduler<&str> = Scheduler::new();
        s.schedule(Duration::from_secs(5), "later");

        assert_eq!(s.pop_due(Duration::from_secs(1)), None);
        s.settle(Duration::from_secs(1));
        assert_eq!(s.now(), Duration::from_secs(1));
        assert_eq!(s.len(), 1);
    }
}

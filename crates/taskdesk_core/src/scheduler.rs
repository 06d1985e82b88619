//! Single-threaded cooperative scheduler.
//!
//! # Responsibility
//! - Run spawned request continuations on one thread (`futures` local pool).
//! - Fire deferred callbacks against a virtual clock driven by the embedder.
//!
//! # Invariants
//! - Nothing runs unless the owner drives [`Scheduler::run_until_stalled`] or
//!   [`Scheduler::advance`].
//! - Timers fire in deadline order, ties in scheduling order.
//! - After each timer callback, spawned tasks run until stalled before the next
//!   timer fires.

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use log::error;
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

type Callback = Box<dyn FnOnce()>;

#[derive(Default)]
struct TimerQueue {
    now: Duration,
    next_seq: u64,
    deadlines: BinaryHeap<Reverse<(Duration, u64)>>,
    callbacks: HashMap<u64, Callback>,
}

impl TimerQueue {
    fn pop_due(&mut self, limit: Duration) -> Option<(Duration, Callback)> {
        loop {
            let Reverse((deadline, seq)) = *self.deadlines.peek()?;
            if deadline > limit {
                return None;
            }
            self.deadlines.pop();
            if let Some(callback) = self.callbacks.remove(&seq) {
                return Some((deadline, callback));
            }
        }
    }
}

/// Cloneable handle given to components for spawning and deferring work.
#[derive(Clone)]
pub struct SchedulerHandle {
    spawner: LocalSpawner,
    timers: Rc<RefCell<TimerQueue>>,
}

impl SchedulerHandle {
    /// Spawns a continuation; it starts on the next drive of the owner.
    pub fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        if let Err(err) = self.spawner.spawn_local(task) {
            error!("event=task_spawn module=scheduler status=error error={err}");
        }
    }

    /// Runs `callback` once `delay` of virtual time has elapsed.
    pub fn defer(&self, delay: Duration, callback: impl FnOnce() + 'static) {
        let mut timers = self.timers.borrow_mut();
        timers.next_seq += 1;
        let seq = timers.next_seq;
        let deadline = timers.now + delay;
        timers.deadlines.push(Reverse((deadline, seq)));
        timers.callbacks.insert(seq, Box::new(callback));
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.timers.borrow().now
    }
}

pub struct Scheduler {
    pool: LocalPool,
    handle: SchedulerHandle,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let handle = SchedulerHandle {
            spawner: pool.spawner(),
            timers: Rc::new(RefCell::new(TimerQueue::default())),
        };
        Self { pool, handle }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Runs spawned tasks until none can make progress.
    pub fn run_until_stalled(&mut self) {
        self.pool.run_until_stalled();
    }

    /// Moves the virtual clock forward by `delta`, firing due timers.
    ///
    /// Returns how many timer callbacks ran.
    pub fn advance(&mut self, delta: Duration) -> usize {
        self.run_until_stalled();
        let target = self.handle.now() + delta;
        let mut fired = 0;

        loop {
            let due = self.handle.timers.borrow_mut().pop_due(target);
            let Some((deadline, callback)) = due else {
                break;
            };
            self.handle.timers.borrow_mut().now = deadline;
            callback();
            fired += 1;
            self.run_until_stalled();
        }

        self.handle.timers.borrow_mut().now = target;
        fired
    }

    pub fn pending_timers(&self) -> usize {
        self.handle.timers.borrow().callbacks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Scheduler;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[test]
    fn timers_fire_in_deadline_order_once_due() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.handle();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (label, ms) in [("late", 100), ("early", 10), ("tie", 10)] {
            let sink = log.clone();
            handle.defer(Duration::from_millis(ms), move || sink.borrow_mut().push(label));
        }

        assert_eq!(scheduler.advance(Duration::from_millis(50)), 2);
        assert_eq!(*log.borrow(), vec!["early", "tie"]);
        assert_eq!(scheduler.pending_timers(), 1);

        assert_eq!(scheduler.advance(Duration::from_millis(50)), 1);
        assert_eq!(*log.borrow(), vec!["early", "tie", "late"]);
        assert_eq!(handle.now(), Duration::from_millis(100));
    }

    #[test]
    fn spawned_tasks_wait_for_the_owner() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.handle();
        let done = Rc::new(RefCell::new(false));
        let flag = done.clone();
        handle.spawn(async move {
            *flag.borrow_mut() = true;
        });

        assert!(!*done.borrow());
        scheduler.run_until_stalled();
        assert!(*done.borrow());
    }

    #[test]
    fn timer_callbacks_can_spawn_and_defer() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.handle();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_handle = handle.clone();
        let sink = log.clone();
        handle.defer(Duration::ZERO, move || {
            let spawned = sink.clone();
            inner_handle.spawn(async move { spawned.borrow_mut().push("spawned") });
            let deferred = sink.clone();
            inner_handle.defer(Duration::from_millis(5), move || {
                deferred.borrow_mut().push("deferred")
            });
        });

        scheduler.advance(Duration::from_millis(10));
        assert_eq!(*log.borrow(), vec!["spawned", "deferred"]);
    }
}

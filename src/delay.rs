//! Delay scheduler: a due-time ordered queue shared between the interactive
//! loop (producer) and a background poller thread (consumer).

use crate::command::Command;
use crate::error::QueueError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayedCommand {
    pub command: Command,
    pub due_at: SystemTime,
}

impl DelayedCommand {
    /// Ties are not yet due.
    pub fn is_due(&self, now: SystemTime) -> bool {
        now > self.due_at
    }
}

/// Bounded queue kept in ascending `due_at` order at all times.
#[derive(Debug)]
pub struct DelayQueue {
    entries: Vec<DelayedCommand>,
    capacity: usize,
}

impl DelayQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        DelayQueue { entries: Vec::with_capacity(capacity), capacity }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn front(&self) -> Option<&DelayedCommand> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DelayedCommand> {
        self.entries.iter()
    }

    /// Inserts an independent copy of `command` before the first entry due
    /// strictly later, so equal due times keep arrival order. Returns the slot.
    pub fn insert(&mut self, command: &Command, due_at: SystemTime) -> Result<usize, QueueError> {
        if self.entries.len() >= self.capacity {
            return Err(QueueError::Full { capacity: self.capacity });
        }
        let pos = self.entries.iter().position(|e| e.due_at > due_at).unwrap_or(self.entries.len());
        self.entries.insert(pos, DelayedCommand { command: command.clone(), due_at });
        Ok(pos)
    }

    /// Removes the front entry if it is due at `now`. Later entries are never
    /// inspected, even if they are overdue too.
    pub fn pop_due(&mut self, now: SystemTime) -> Option<DelayedCommand> {
        if self.entries.first()?.is_due(now) {
            Some(self.entries.remove(0))
        } else {
            None
        }
    }
}

/// Cheap to clone; every clone talks to the same queue.
#[derive(Debug, Clone)]
pub struct Scheduler {
    queue: Arc<Mutex<DelayQueue>>,
    tick: Duration,
}

impl Scheduler {
    pub fn new(capacity: usize, tick: Duration) -> Self {
        Scheduler { queue: Arc::new(Mutex::new(DelayQueue::with_capacity(capacity))), tick }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    fn lock(&self) -> MutexGuard<'_, DelayQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, command: &Command, due_at: SystemTime) -> Result<(), QueueError> {
        let mut queue = self.lock();
        let pos = queue.insert(command, due_at)?;
        tracing::debug!(pos, pending = queue.len(), argv = ?command.argv, "delayed command queued");
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Due times of the queued entries, front to back.
    pub fn due_times(&self) -> Vec<SystemTime> {
        self.lock().iter().map(|e| e.due_at).collect()
    }

    /// Matures at most one entry. `run` is called with the lock still held, so
    /// an enqueue racing with this tick waits until execution has returned.
    /// Returns whether an entry matured.
    pub fn poll_tick<F: FnOnce(&DelayedCommand)>(&self, now: SystemTime, run: F) -> bool {
        let mut queue = self.lock();
        match queue.pop_due(now) {
            Some(entry) => {
                tracing::debug!(argv = ?entry.command.argv, remaining = queue.len(), "delayed command matured");
                run(&entry);
                true
            }
            None => false,
        }
    }

    /// Starts the poller thread: sleep one tick, poll, repeat. The lock is
    /// never held across the sleep.
    pub fn spawn_poller<F>(&self, mut run: F) -> std::io::Result<JoinHandle<()>>
    where
        F: FnMut(&DelayedCommand) + Send + 'static,
    {
        let scheduler = self.clone();
        thread::Builder::new().name("delay-poller".into()).spawn(move || {
            tracing::debug!(tick_ms = scheduler.tick.as_millis() as u64, "delay poller started");
            loop {
                thread::sleep(scheduler.tick);
                scheduler.poll_tick(SystemTime::now(), &mut run);
            }
        })
    }

    /// Blocks until every queued command has matured and finished.
    pub fn wait_idle(&self) {
        while self.pending() > 0 {
            thread::sleep(self.tick);
        }
    }
}

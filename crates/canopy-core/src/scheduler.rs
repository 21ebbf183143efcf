//! Single-threaded cooperative scheduler.
//!
//! Concurrency in the core arises only from interleaved asynchronous
//! continuations: mount/update calls return futures, and something has to
//! poll them. The [`Scheduler`] holds a queue of local tasks and
//! [`Scheduler::run_until_settled`] drives them until no task makes progress
//! in a full pass; at that point every remaining task is waiting on work
//! external to the scheduler (e.g. a gated `will_start` hook). There is no
//! parallelism; component logic never runs on two threads.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker;
use futures::FutureExt;

struct SchedulerInner {
    tasks: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
}

pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                tasks: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle(Rc::downgrade(&self.inner))
    }

    pub fn spawn(&self, task: impl std::future::Future<Output = ()> + 'static) {
        self.inner.tasks.borrow_mut().push(task.boxed_local());
    }

    pub fn pending_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    pub fn has_pending(&self) -> bool {
        self.pending_tasks() > 0
    }

    /// Polls every task repeatedly until a full pass completes nothing and
    /// spawns nothing. Tasks blocked on external events stay queued.
    pub fn run_until_settled(&self) {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        loop {
            let mut batch: Vec<LocalBoxFuture<'static, ()>> =
                self.inner.tasks.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                break;
            }
            let mut progressed = false;
            let mut still_pending = Vec::with_capacity(batch.len());
            for mut task in batch.drain(..) {
                match task.as_mut().poll(&mut cx) {
                    Poll::Ready(()) => progressed = true,
                    Poll::Pending => still_pending.push(task),
                }
            }
            let spawned = {
                let mut queue = self.inner.tasks.borrow_mut();
                let spawned = !queue.is_empty();
                still_pending.extend(queue.drain(..));
                *queue = still_pending;
                spawned
            };
            if !progressed && !spawned {
                break;
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Weak handle for spawning from inside components or engines without
/// keeping the scheduler alive.
#[derive(Clone)]
pub struct SchedulerHandle(Weak<SchedulerInner>);

impl SchedulerHandle {
    pub fn spawn(&self, task: impl std::future::Future<Output = ()> + 'static) {
        if let Some(inner) = self.0.upgrade() {
            inner.tasks.borrow_mut().push(task.boxed_local());
        }
    }

    pub fn has_pending(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| !inner.tasks.borrow().is_empty())
            .unwrap_or(false)
    }
}

//! Single-threaded cooperative job queue.
//!
//! Every promise continuation runs as a job on a [`Scheduler`]. Jobs are never
//! executed inside the call that queued them; they run when the owner drains
//! the queue with [`Scheduler::run_until_idle`] or when [`Scheduler::run`] is
//! driving it on a tokio `LocalSet`.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    future::Future,
    panic::{self, AssertUnwindSafe},
    rc::{Rc, Weak},
    time::Duration,
};

use tokio::sync::Notify;
use tracing::{debug, error, trace};

use crate::promise::{Deferred, Promise};

type Job = Box<dyn FnOnce()>;

#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

/// Non-owning handle kept by promise state, so queued jobs never keep their
/// scheduler alive.
#[derive(Clone)]
pub(crate) struct WeakScheduler {
    inner: Weak<SchedulerInner>,
}

impl WeakScheduler {
    pub(crate) fn upgrade(&self) -> Option<Scheduler> {
        self.inner.upgrade().map(|inner| Scheduler { inner })
    }

    /// Queues `job`, or drops it when the scheduler is gone.
    pub(crate) fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            inner: Weak::clone(&self.inner),
        }
    }

    pub(crate) fn schedule(&self, job: impl FnOnce() + 'static) {
        match self.upgrade() {
            Some(scheduler) => scheduler.schedule(job),
            None => debug!("scheduler dropped; continuation discarded"),
        }
    }
}

/// Clears the draining flag even when a job unwinds.
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[derive(Default)]
struct SchedulerInner {
    queue: RefCell<VecDeque<Job>>,
    draining: Cell<bool>,
    jobs_run: Cell<u64>,
    wakeup: Notify,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub(crate) fn schedule(&self, job: impl FnOnce() + 'static) {
        self.inner.queue.borrow_mut().push_back(Box::new(job));
        self.inner.wakeup.notify_one();
    }

    pub fn pending_jobs(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Total number of jobs executed since construction.
    pub fn jobs_run(&self) -> u64 {
        self.inner.jobs_run.get()
    }

    /// Runs queued jobs, including ones queued by those jobs, until the queue
    /// is empty. Returns the number of jobs executed.
    ///
    /// A nested call from inside a running job is a no-op returning `0`; the
    /// outer drain picks up whatever the job queued. A panicking job unwinds
    /// out of this call; jobs still queued run on the next drain.
    pub fn run_until_idle(&self) -> usize {
        if self.inner.draining.replace(true) {
            trace!("nested drain ignored");
            return 0;
        }
        let _guard = DrainGuard(&self.inner.draining);

        let mut executed = 0;
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(job) = next else {
                break;
            };
            self.inner.jobs_run.set(self.inner.jobs_run.get() + 1);
            job();
            executed += 1;
        }

        if executed > 0 {
            debug!(jobs = executed, "scheduler drained");
        }
        executed
    }

    /// Drives the queue forever: drains, then sleeps until another job is
    /// scheduled. Spawn it with `tokio::task::spawn_local`.
    ///
    /// A panicking job is logged and the drain resumes with the next one, so
    /// one faulty continuation cannot strand every other promise.
    pub async fn run(self) {
        loop {
            while panic::catch_unwind(AssertUnwindSafe(|| self.run_until_idle())).is_err() {
                error!("scheduler job panicked; continuing with the next job");
            }
            self.inner.wakeup.notified().await;
        }
    }

    pub fn deferred<T, E>(&self) -> (Deferred<T, E>, Promise<T, E>)
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        Deferred::new(self)
    }

    pub fn resolved<T, E>(&self, value: T) -> Promise<T, E>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        let (deferred, promise) = self.deferred();
        deferred.resolve(value);
        promise
    }

    pub fn rejected<T, E>(&self, reason: E) -> Promise<T, E>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        let (deferred, promise) = self.deferred();
        deferred.reject(reason);
        promise
    }

    /// Adapts a future into a promise. The future runs as a local tokio task,
    /// so this must be called from within a `LocalSet`.
    pub fn spawn<F, T, E>(&self, future: F) -> Promise<T, E>
    where
        F: Future<Output = Result<T, E>> + 'static,
        T: Clone + 'static,
        E: Clone + 'static,
    {
        let (deferred, promise) = self.deferred();
        tokio::task::spawn_local(async move {
            deferred.settle(future.await);
        });
        promise
    }

    /// A promise that settles with `outcome` once `duration` has elapsed.
    pub fn delay<T, E>(&self, duration: Duration, outcome: Result<T, E>) -> Promise<T, E>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(duration).await;
            outcome
        })
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending_jobs", &self.pending_jobs())
            .field("jobs_run", &self.jobs_run())
            .finish()
    }
}

//! Promise combinators.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use crate::{
    promise::{Deferred, Promise},
    scheduler::Scheduler,
};

/// Fulfills with every input value, in input order, once all inputs have
/// fulfilled. Rejects with the first rejection observed; the other inputs keep
/// running but no longer affect the result.
///
/// An empty input fulfills with an empty vector. The same promise may appear
/// at several positions and fills each of them.
pub fn wait_all<T, E, I>(scheduler: &Scheduler, promises: I) -> Promise<Vec<T>, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    I: IntoIterator<Item = Promise<T, E>>,
{
    let promises: Vec<_> = promises.into_iter().collect();
    let (deferred, combined) = Deferred::new(scheduler);

    if promises.is_empty() {
        deferred.resolve(Vec::new());
        return combined;
    }

    let slots: Rc<RefCell<Vec<Option<T>>>> = Rc::new(RefCell::new(vec![None; promises.len()]));
    let remaining = Rc::new(Cell::new(promises.len()));

    for (index, promise) in promises.into_iter().enumerate() {
        let deferred = deferred.clone();
        let slots = slots.clone();
        let remaining = remaining.clone();
        promise.subscribe(move |outcome| {
            if deferred.is_settled() {
                return;
            }
            match outcome {
                Ok(value) => {
                    slots.borrow_mut()[index] = Some(value);
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let values = slots.borrow_mut().drain(..).flatten().collect();
                        deferred.resolve(values);
                    }
                }
                Err(reason) => deferred.reject(reason),
            }
        });
    }

    combined
}

/// Settles with whichever input settles first. An empty input never settles.
pub fn race<T, E, I>(scheduler: &Scheduler, promises: I) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    I: IntoIterator<Item = Promise<T, E>>,
{
    let (deferred, winner) = Deferred::new(scheduler);
    for promise in promises {
        let deferred = deferred.clone();
        promise.subscribe(move |outcome| deferred.settle(outcome));
    }
    winner
}

/// Rejects with `reason` unless `promise` settles within `duration`. The
/// original operation is not stopped; its late outcome is ignored.
///
/// Uses [`Scheduler::delay`], so it must run inside a tokio `LocalSet`. If
/// the promise's scheduler is already gone, no timer is armed and the promise
/// is returned as is.
pub fn timeout<T, E>(promise: &Promise<T, E>, duration: Duration, reason: E) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let Some(scheduler) = promise.scheduler() else {
        return promise.clone();
    };
    let timer = scheduler.delay(duration, Err(reason));
    race(&scheduler, [promise.clone(), timer])
}

//! Asynchronous activity handles
//!
//! An [`Activity`] is the one-shot completion cell returned by the
//! asynchronous workflow entry points. It reaches exactly one terminal
//! state, observable by blocking waits or a single completion callback, and
//! carries a cooperative cancellation flag that workflows poll between
//! finger checks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::error::Result;

/// Cooperative cancellation flag shared between an activity and the
/// workflow running on its behalf.
#[derive(Clone, Default)]
pub(crate) struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

struct State<T> {
    done: bool,
    outcome: Option<Result<T>>,
    handler: Option<Box<dyn FnOnce() + Send>>,
    handler_registered: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    completed: Condvar,
    cancel: CancelFlag,
}

/// Handle to an in-flight asynchronous workflow.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use fpm10::{HumanActionListener, Sensor};
///
/// struct Console;
///
/// impl HumanActionListener for Console {
///     fn put_finger(&self) {
///         println!("Put your finger on the sensor");
///     }
///
///     fn remove_finger(&self) {
///         println!("Remove your finger");
///     }
/// }
///
/// fn main() -> fpm10::Result<()> {
///     let sensor = Arc::new(Sensor::new("/dev/ttyUSB0"));
///     sensor.open()?;
///
///     let activity = sensor.search_fingerprint_async(Arc::new(Console));
///     // ... the calling thread stays free; cancel or wait as needed
///     match activity.join()? {
///         Some(result) => println!("Found {}", result),
///         None => println!("No match"),
///     }
///     Ok(())
/// }
/// ```
pub struct Activity<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Activity<T> {
    /// Create a pending activity together with its completion side.
    pub(crate) fn pending() -> (Self, Completer<T>) {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                done: false,
                outcome: None,
                handler: None,
                handler_registered: false,
            }),
            completed: Condvar::new(),
            cancel: CancelFlag::new(),
        });

        (
            Self {
                shared: Arc::clone(&shared),
            },
            Completer { shared },
        )
    }

    pub(crate) fn cancel_flag(&self) -> CancelFlag {
        self.shared.cancel.clone()
    }

    /// Request cancellation of the workflow.
    ///
    /// Non-blocking and best-effort: the workflow observes the flag only
    /// between finger polls, and a workflow blocked inside a single sensor
    /// command finishes that command first.
    pub fn cancel(&self) {
        self.shared.cancel.set();
    }

    /// `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancellation_requested(&self) -> bool {
        self.shared.cancel.is_set()
    }

    /// `true` once the activity has completed or failed.
    pub fn is_done(&self) -> bool {
        self.shared.state.lock().done
    }

    /// Block until the activity reaches its terminal state.
    pub fn wait(&self) {
        let mut state = self.shared.state.lock();
        while !state.done {
            self.shared.completed.wait(&mut state);
        }
    }

    /// Block up to `timeout`; returns whether the activity is done.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut state = self.shared.state.lock();
        if !state.done {
            self.shared.completed.wait_for(&mut state, timeout);
        }

        state.done
    }

    /// Block until completion and take the outcome.
    pub fn join(self) -> Result<T> {
        let mut state = self.shared.state.lock();
        while !state.done {
            self.shared.completed.wait(&mut state);
        }

        match state.outcome.take() {
            Some(outcome) => outcome,
            None => unreachable!("a completed activity always holds its outcome"),
        }
    }

    /// Register the completion callback.
    ///
    /// The callback runs exactly once, on the worker thread that completes
    /// the activity, or immediately on the calling thread if the activity
    /// is already done.
    ///
    /// # Panics
    ///
    /// Panics if a callback has already been registered.
    pub fn on_done(&self, handler: impl FnOnce() + Send + 'static) {
        let ready = {
            let mut state = self.shared.state.lock();
            if state.handler_registered {
                panic!("completion handler has already been set");
            }
            state.handler_registered = true;

            if state.done {
                Some(handler)
            } else {
                state.handler = Some(Box::new(handler));
                None
            }
        };

        if let Some(handler) = ready {
            handler();
        }
    }
}

/// Completion side of an [`Activity`]; consuming it guarantees the single
/// terminal transition.
pub(crate) struct Completer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Completer<T> {
    pub(crate) fn complete(self, outcome: Result<T>) {
        let handler = {
            let mut state = self.shared.state.lock();
            debug_assert!(!state.done, "activity completed twice");

            state.outcome = Some(outcome);
            state.done = true;
            self.shared.completed.notify_all();

            state.handler.take()
        };

        if let Some(handler) = handler {
            handler();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_starts_pending() {
        let (activity, _completer) = Activity::<u32>::pending();

        assert!(!activity.is_done());
        assert!(!activity.is_cancellation_requested());
        assert!(!activity.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_join_returns_outcome() {
        let (activity, completer) = Activity::<u32>::pending();

        let worker = thread::spawn(move || {
            completer.complete(Ok(42));
        });

        assert_eq!(activity.join().unwrap(), 42);
        worker.join().unwrap();
    }

    #[test]
    fn test_wait_observes_completion() {
        let (activity, completer) = Activity::<()>::pending();
        completer.complete(Ok(()));

        activity.wait();
        assert!(activity.is_done());
        assert!(activity.wait_timeout(Duration::ZERO));
    }

    #[test]
    fn test_handler_runs_on_completion() {
        let (activity, completer) = Activity::<()>::pending();

        let fired = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&fired);
        activity.on_done(move || observed.store(true, Ordering::Release));

        assert!(!fired.load(Ordering::Acquire));
        completer.complete(Ok(()));
        assert!(fired.load(Ordering::Acquire));
    }

    #[test]
    fn test_handler_registered_after_completion_runs_immediately() {
        let (activity, completer) = Activity::<()>::pending();
        completer.complete(Ok(()));

        let fired = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&fired);
        activity.on_done(move || observed.store(true, Ordering::Release));

        assert!(fired.load(Ordering::Acquire));
    }

    #[test]
    #[should_panic(expected = "completion handler has already been set")]
    fn test_second_handler_panics() {
        let (activity, _completer) = Activity::<()>::pending();

        activity.on_done(|| {});
        activity.on_done(|| {});
    }

    #[test]
    fn test_cancel_sets_flag() {
        let (activity, _completer) = Activity::<()>::pending();
        let flag = activity.cancel_flag();

        assert!(!flag.is_set());
        activity.cancel();
        assert!(flag.is_set());
        assert!(activity.is_cancellation_requested());
    }
}

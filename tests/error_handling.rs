//! Error handling and edge case tests.

use actionflow::{
    Action, DispatchError, DispatchMode, Dispatcher, DispatcherConfig, MainContext, Middleware,
    Next, Result,
};
use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct Tagged(&'static str);

impl Action for Tagged {
    fn tag(&self) -> &str {
        self.0
    }
}

fn counting(
    hits: &Arc<AtomicUsize>,
) -> impl Fn(&dyn Action) -> Result<()> + Send + Sync + 'static {
    let hits = Arc::clone(hits);
    move |_: &dyn Action| {
        hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// --- Tolerated Absence ---

#[test]
fn test_dispatch_without_subscribers() {
    let dispatcher = Dispatcher::new().unwrap();
    dispatcher.dispatch(Tagged("Nobody"), DispatchMode::Sync).unwrap();
    assert_eq!(dispatcher.subscription_count(), 0);
}

#[test]
fn test_remove_unknown_middleware_is_noop() {
    struct Passthrough;

    impl Middleware for Passthrough {
        fn apply(&self, action: &dyn Action, next: Next<'_>) -> Result<()> {
            next.proceed(action)
        }
    }

    let dispatcher = Dispatcher::new().unwrap();
    let installed = Arc::new(Passthrough);
    let stranger = Arc::new(Passthrough);
    dispatcher.add_middleware(Arc::clone(&installed));

    assert!(!dispatcher.remove_middleware(&stranger));
    assert_eq!(dispatcher.middleware_count(), 1);
}

#[test]
fn test_dispose_after_dispatcher_dropped() {
    let dispatcher = Dispatcher::new().unwrap();
    let handle = dispatcher.subscribe_default("Gone", |_: &dyn Action| Ok(()));
    drop(dispatcher);

    // Nothing left to remove from
    handle.dispose();
}

// --- Programmer Errors ---

#[test]
fn test_double_unsubscribe_is_detected() {
    let dispatcher = Dispatcher::new().unwrap();
    let handle = dispatcher.subscribe_default("Counter", |_: &dyn Action| Ok(()));
    dispatcher.unsubscribe(&handle);

    let result = panic::catch_unwind(AssertUnwindSafe(|| dispatcher.unsubscribe(&handle)));
    assert!(result.is_err());

    // Dispatcher is still usable
    assert_eq!(dispatcher.subscription_count(), 0);
    dispatcher.dispatch(Tagged("Counter"), DispatchMode::Sync).unwrap();
}

#[test]
fn test_reentrant_dispatch_fails_fast() {
    let dispatcher = Dispatcher::new().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let inner = dispatcher.clone();
    let reentrant = dispatcher.subscribe_default("Outer", move |_: &dyn Action| {
        inner.dispatch(Tagged("Inner"), DispatchMode::Sync)
    });
    let _inner_sub = dispatcher.subscribe_default("Inner", counting(&hits));

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        dispatcher.dispatch(Tagged("Outer"), DispatchMode::Sync)
    }));
    let payload = result.unwrap_err();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    assert!(message.contains("Already dispatching"), "got {:?}", message);

    // The inner action never reached its subscriber
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    // The guard was released
    assert!(!dispatcher.is_dispatching());
    reentrant.dispose();
    dispatcher.dispatch(Tagged("Inner"), DispatchMode::Sync).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reentrant_dispatch_from_middleware_fails_fast() {
    struct Echo {
        dispatcher: Mutex<Option<Dispatcher>>,
    }

    impl Middleware for Echo {
        fn apply(&self, action: &dyn Action, next: Next<'_>) -> Result<()> {
            if let Some(d) = self.dispatcher.lock().as_ref() {
                d.dispatch(Tagged("Echo"), DispatchMode::Sync)?;
            }
            next.proceed(action)
        }
    }

    let dispatcher = Dispatcher::new().unwrap();
    let echo = Arc::new(Echo {
        dispatcher: Mutex::new(Some(dispatcher.clone())),
    });
    dispatcher.add_middleware(Arc::clone(&echo));

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        dispatcher.dispatch(Tagged("Start"), DispatchMode::Sync)
    }));
    assert!(result.is_err());

    // Break the cycle and make sure the dispatcher recovered
    echo.dispatcher.lock().take();
    dispatcher.remove_middleware(&echo);
    dispatcher.dispatch(Tagged("Start"), DispatchMode::Sync).unwrap();
}

// --- Propagated Errors ---

#[test]
fn test_subscriber_error_propagates_and_dispatcher_recovers() {
    let dispatcher = Dispatcher::new().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let failing = dispatcher.subscribe(200, "Save", |_: &dyn Action| {
        Err(DispatchError::handler("disk full"))
    });
    let _lower = dispatcher.subscribe(100, "Save", counting(&hits));

    let result = dispatcher.dispatch(Tagged("Save"), DispatchMode::Sync);
    match result {
        Err(DispatchError::Handler(msg)) => assert_eq!(msg, "disk full"),
        other => panic!("Expected Handler error, got {:?}", other),
    }
    // Lower priority subscriber was skipped
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    failing.dispose();
    dispatcher.dispatch(Tagged("Save"), DispatchMode::Sync).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_subscriber_panic_resumes_on_caller_and_dispatcher_recovers() {
    let dispatcher = Dispatcher::new().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let exploding = dispatcher.subscribe_default("Boom", |_: &dyn Action| -> Result<()> {
        panic!("subscriber exploded")
    });
    let _other = dispatcher.subscribe_default("Other", counting(&hits));

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        dispatcher.dispatch(Tagged("Boom"), DispatchMode::Sync)
    }));
    assert!(result.is_err());
    assert!(!dispatcher.is_dispatching());

    dispatcher.dispatch(Tagged("Other"), DispatchMode::Sync).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    exploding.dispose();
}

#[test]
fn test_middleware_error_stops_delivery() {
    struct Gatekeeper;

    impl Middleware for Gatekeeper {
        fn apply(&self, action: &dyn Action, next: Next<'_>) -> Result<()> {
            if action.tag() == "Forbidden" {
                return Err(DispatchError::middleware("not allowed"));
            }
            next.proceed(action)
        }
    }

    let dispatcher = Dispatcher::new().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    dispatcher.add_middleware(Arc::new(Gatekeeper));
    let _a = dispatcher.subscribe_default("Forbidden", counting(&hits));
    let _b = dispatcher.subscribe_default("Allowed", counting(&hits));

    let result = dispatcher.dispatch(Tagged("Forbidden"), DispatchMode::Sync);
    assert!(matches!(result, Err(DispatchError::Middleware(_))));
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    dispatcher.dispatch(Tagged("Allowed"), DispatchMode::Sync).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_async_failure_does_not_block_later_dispatches() {
    let dispatcher = Dispatcher::new().unwrap();
    let (tx, rx) = unbounded();

    let _fail = dispatcher.subscribe_default("Fail", |_: &dyn Action| {
        Err(DispatchError::handler("async failure"))
    });
    let _panic = dispatcher.subscribe_default("Panic", |_: &dyn Action| -> Result<()> {
        panic!("async panic")
    });
    let _ok = dispatcher.subscribe_default("Ok", move |_: &dyn Action| {
        tx.send(()).unwrap();
        Ok(())
    });

    dispatcher.dispatch(Tagged("Fail"), DispatchMode::Async).unwrap();
    dispatcher.dispatch(Tagged("Panic"), DispatchMode::Async).unwrap();
    dispatcher.dispatch(Tagged("Ok"), DispatchMode::Async).unwrap();

    rx.recv_timeout(Duration::from_secs(2)).unwrap();
}

// --- Main Context ---

#[test]
fn test_dispatch_after_main_loop_dropped() {
    let (main, main_loop) = MainContext::current();
    let dispatcher = Dispatcher::with_main_context(main, DispatcherConfig::default());
    drop(main_loop);

    let result = dispatcher.dispatch(Tagged("Late"), DispatchMode::Async);
    assert!(matches!(result, Err(DispatchError::MainContextClosed)));
}

#[test]
fn test_invalid_config_rejected() {
    let result = Dispatcher::with_config(DispatcherConfig {
        main_thread_name: String::new(),
        ..Default::default()
    });
    assert!(matches!(result, Err(DispatchError::InvalidConfig(_))));
}

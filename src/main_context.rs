//! The single execution context that performs all action delivery.
//!
//! A [`MainContext`] is a FIFO job queue bound to exactly one thread. It is
//! either a dedicated worker thread ([`MainContext::spawn`]) or the calling
//! thread, pumped by the application through a [`MainLoop`]
//! ([`MainContext::current`]).
//!
//! Jobs never take the thread down: a panicking job is caught and logged,
//! and `run_sync` resumes the panic on the waiting caller instead.

use crate::error::{DispatchError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    name: String,
    thread: ThreadId,
    sender: Option<Sender<Job>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Closing the queue lets the worker drain and exit.
        self.sender.take();

        if let Some(worker) = self.worker.get_mut().take() {
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                tracing::error!(name = %self.name, "main context worker panicked");
            }
        }
    }
}

/// Handle to the main execution context. Cheap to clone.
#[derive(Clone)]
pub struct MainContext {
    inner: Arc<Inner>,
}

impl MainContext {
    /// Start a dedicated worker thread and make it the main context.
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = unbounded::<Job>();

        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                for job in receiver.iter() {
                    run_job(job);
                }
            })?;

        tracing::debug!(%name, "main context started");

        Ok(Self {
            inner: Arc::new(Inner {
                thread: worker.thread().id(),
                name,
                sender: Some(sender),
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    /// Adopt the calling thread as the main context.
    ///
    /// Queued work only runs while the returned [`MainLoop`] is pumped on
    /// this same thread.
    pub fn current() -> (Self, MainLoop) {
        let (sender, receiver) = unbounded::<Job>();
        let current = thread::current();
        let name = current.name().unwrap_or("main").to_string();

        let context = Self {
            inner: Arc::new(Inner {
                name,
                thread: current.id(),
                sender: Some(sender),
                worker: Mutex::new(None),
            }),
        };
        let main_loop = MainLoop {
            thread: current.id(),
            receiver,
        };
        (context, main_loop)
    }

    /// Name of the context's thread.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the caller is running on this context.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.thread
    }

    /// Queue a job and return immediately. Jobs run in submission order.
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .inner
            .sender
            .as_ref()
            .ok_or(DispatchError::MainContextClosed)?;
        sender
            .send(Box::new(job))
            .map_err(|_| DispatchError::MainContextClosed)
    }

    /// Run `f` on this context and wait for its result.
    ///
    /// Runs inline when already on the context. Otherwise blocks until the
    /// context gets to the job; a panic inside `f` is resumed here.
    pub fn run_sync<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return Ok(f());
        }

        let (reply_tx, reply_rx) = bounded::<thread::Result<R>>(1);
        self.execute(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            let _ = reply_tx.send(outcome);
        })?;

        // The job is dropped unrun if the context shuts down first.
        match reply_rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => Err(DispatchError::MainContextClosed),
        }
    }
}

impl fmt::Debug for MainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainContext")
            .field("name", &self.inner.name)
            .field("thread", &self.inner.thread)
            .finish()
    }
}

/// Pump for a context adopted with [`MainContext::current`].
pub struct MainLoop {
    thread: ThreadId,
    receiver: Receiver<Job>,
}

impl MainLoop {
    /// Run every job queued so far, returning how many ran.
    ///
    /// # Panics
    ///
    /// When called from a thread other than the one that created the loop.
    pub fn run_pending(&self) -> usize {
        self.assert_owner();

        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            run_job(job);
            ran += 1;
        }
        ran
    }

    /// Run jobs until every [`MainContext`] handle has been dropped.
    pub fn run(self) {
        self.assert_owner();

        for job in self.receiver.iter() {
            run_job(job);
        }
    }

    fn assert_owner(&self) {
        assert_eq!(
            thread::current().id(),
            self.thread,
            "MainLoop must be pumped on the thread that created it"
        );
    }
}

fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        tracing::error!(panic = panic_message(&*payload), "main context job panicked");
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

//! Event delivery thread
//!
//! Process launches, output pumping and gate evaluation all run on one
//! dedicated thread. Callers block on their own rendezvous, never on this
//! thread, so a launch can never wait on events it is itself holding up.

use crate::error::{Error, Result};
use async_channel::Sender;
use smol::{Executor, Task};
use std::future::Future;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Handle for scheduling work onto a [`Dispatcher`]
///
/// Tasks may hold this to schedule follow-up work; holding it does not keep
/// the dispatcher thread alive.
#[derive(Clone)]
pub struct DispatchHandle {
    executor: Arc<Executor<'static>>,
}

impl DispatchHandle {
    /// Schedule a future on the dispatcher thread
    ///
    /// Dropping the returned task cancels it; detach it to let it run on.
    pub fn spawn<T, F>(&self, future: F) -> Task<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.executor.spawn(future)
    }
}

/// Owner of the event delivery thread
pub struct Dispatcher {
    handle: DispatchHandle,
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start the delivery thread
    pub fn start(name: impl Into<String>) -> Result<Self> {
        let executor = Arc::new(Executor::new());
        let (shutdown, shutdown_rx) = async_channel::bounded::<()>(1);

        let name = name.into();
        let thread_executor = executor.clone();
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                smol::block_on(thread_executor.run(async move {
                    let _ = shutdown_rx.recv().await;
                }));
            })
            .map_err(Error::Dispatcher)?;
        debug!(thread = %name, "dispatcher started");

        Ok(Self {
            handle: DispatchHandle { executor },
            shutdown,
            thread: Some(thread),
        })
    }

    /// Handle for scheduling work
    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Schedule a future on the delivery thread
    pub fn spawn<T, F>(&self, future: F) -> Task<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown.close();
        if let Some(thread) = self.thread.take() {
            // Never join from the delivery thread itself
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

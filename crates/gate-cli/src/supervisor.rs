//! Keeps track of every process a run starts so they can be stopped together

use async_trait::async_trait;
use futures::lock::Mutex as AsyncMutex;
use process_launcher::ProcessHandle;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use text_gate::{
    ChannelEvent, ExecutionEnvironment, LaunchedProcess, OutputChannel, ProcessSpawner,
    Subscription,
};
use tracing::{info, warn};

/// How long a process gets to exit after SIGTERM before it is killed
pub const STOP_GRACE: Duration = Duration::from_secs(5);

/// A process handle shared between its launcher and the supervisor
#[derive(Clone)]
struct SharedHandle {
    pid: Option<u32>,
    inner: Arc<AsyncMutex<Box<dyn ProcessHandle>>>,
}

impl SharedHandle {
    fn new(handle: Box<dyn ProcessHandle>) -> Self {
        Self {
            pid: handle.pid(),
            inner: Arc::new(AsyncMutex::new(handle)),
        }
    }
}

#[async_trait]
impl ProcessHandle for SharedHandle {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    async fn terminate(&mut self) -> process_launcher::Result<()> {
        self.inner.lock().await.terminate().await
    }

    async fn kill(&mut self) -> process_launcher::Result<()> {
        self.inner.lock().await.kill().await
    }
}

#[derive(Clone)]
struct Supervised {
    name: String,
    handle: SharedHandle,
    channel: OutputChannel,
}

/// Spawner that remembers what it started
pub struct Supervisor {
    spawner: Arc<dyn ProcessSpawner>,
    started: Mutex<Vec<Supervised>>,
    grace: Duration,
}

impl Supervisor {
    /// Supervise processes started through `spawner`
    pub fn new(spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self {
            spawner,
            started: Mutex::new(Vec::new()),
            grace: STOP_GRACE,
        }
    }

    /// Change how long [`stop_all`](Self::stop_all) waits before killing
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Number of processes started so far
    pub fn started(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    fn running(&self) -> Vec<Supervised> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .filter(|p| !p.channel.is_ended())
            .cloned()
            .collect()
    }

    /// Wait for every started process to exit on its own
    pub async fn wait_all(&self) {
        for process in self.running() {
            info!(configuration = %process.name, pid = ?process.handle.pid(), "waiting for process to exit");
            wait_until_ended(&process.channel).await;
        }
    }

    /// Stop every process that is still running
    ///
    /// Each process is sent SIGTERM and killed if it has not exited within
    /// the grace period.
    pub async fn stop_all(&self) {
        for mut process in self.running() {
            let pid = process.handle.pid();
            if let Err(e) = process.handle.terminate().await {
                warn!(configuration = %process.name, ?pid, "failed to stop process: {}", e);
                continue;
            }
            if ended_within(&process.channel, self.grace).await {
                continue;
            }

            warn!(configuration = %process.name, ?pid, grace = ?self.grace, "process ignored SIGTERM, killing");
            if let Err(e) = process.handle.kill().await {
                warn!(configuration = %process.name, ?pid, "failed to kill process: {}", e);
                continue;
            }
            if !ended_within(&process.channel, self.grace).await {
                warn!(configuration = %process.name, ?pid, "no exit reported after SIGKILL");
            }
        }
    }
}

#[async_trait]
impl ProcessSpawner for Supervisor {
    async fn spawn(
        &self,
        environment: &ExecutionEnvironment,
    ) -> process_launcher::Result<LaunchedProcess> {
        let launched = self.spawner.spawn(environment).await?;
        let handle = SharedHandle::new(launched.handle);
        self.started.lock().unwrap().push(Supervised {
            name: environment.configuration.name.clone(),
            handle: handle.clone(),
            channel: launched.channel.clone(),
        });
        Ok(LaunchedProcess {
            channel: launched.channel,
            events: launched.events,
            handle: Box::new(handle),
        })
    }
}

/// Wait for the channel's terminal event
///
/// Returns the exit code and signal, or `None` if the channel had already
/// ended or went away first.
pub async fn wait_until_ended(channel: &OutputChannel) -> Option<(Option<i32>, Option<i32>)> {
    // An ended channel refuses subscribers.
    let subscription = channel.subscribe().ok()?;
    wait_for_end(subscription).await
}

/// Drain a subscription up to the terminal event
pub async fn wait_for_end(mut subscription: Subscription) -> Option<(Option<i32>, Option<i32>)> {
    while let Some(event) = subscription.next().await {
        if let ChannelEvent::Ended { code, signal } = event {
            return Some((code, signal));
        }
    }
    None
}

async fn ended_within(channel: &OutputChannel, grace: Duration) -> bool {
    smol::future::or(
        async {
            wait_until_ended(channel).await;
            true
        },
        async {
            smol::Timer::after(grace).await;
            false
        },
    )
    .await
}

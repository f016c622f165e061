//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use process_launcher::{CommandLine, OutputStream, ProcessEvent, ProcessHandle};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use text_gate::spawner::{LaunchedProcess, ProcessSpawner};
use text_gate::{
    Collaborators, Dispatcher, ExecutionEnvironment, ExecutionTarget, Executor, ExecutorRunner,
    HookError, LaunchOrchestrator, MemoryRegistry, MemoryTargetManager, Notification, Notifier,
    OutputChannel, PreLaunchHook, RunConfiguration,
};

/// One scripted step of a fake process
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Out(&'static str),
    Err(&'static str),
    Sleep(u64),
    Exit(i32),
    /// Never produce anything again
    Hang,
}

/// Notifier that remembers everything it was asked to show
#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<Notification>>);

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

/// Process handle that does nothing
pub struct FakeHandle(u32);

#[async_trait]
impl ProcessHandle for FakeHandle {
    fn pid(&self) -> Option<u32> {
        Some(self.0)
    }

    async fn terminate(&mut self) -> process_launcher::Result<()> {
        Ok(())
    }

    async fn kill(&mut self) -> process_launcher::Result<()> {
        Ok(())
    }
}

/// Spawner that plays back scripts instead of starting processes
#[derive(Default)]
pub struct ScriptedSpawner {
    scripts: Mutex<HashMap<String, Vec<Step>>>,
    failing: Mutex<HashSet<String>>,
    launched: Mutex<Vec<(ExecutionEnvironment, OutputChannel)>>,
}

impl ScriptedSpawner {
    pub fn script(&self, name: &str, steps: &[Step]) {
        self.scripts
            .lock()
            .unwrap()
            .insert(name.to_string(), steps.to_vec());
    }

    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn launched(&self) -> Vec<(ExecutionEnvironment, OutputChannel)> {
        self.launched.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessSpawner for ScriptedSpawner {
    async fn spawn(
        &self,
        environment: &ExecutionEnvironment,
    ) -> process_launcher::Result<LaunchedProcess> {
        let name = environment.configuration.name.clone();
        if self.failing.lock().unwrap().contains(&name) {
            return Err(process_launcher::Error::CommandNotFound { program: name });
        }
        let steps = self
            .scripts
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or_else(|| vec![Step::Exit(0)]);

        let events = stream::once(async { Some(ProcessEvent::started(4242)) })
            .chain(stream::iter(steps).then(|step| async move {
                match step {
                    Step::Out(text) => Some(ProcessEvent::output(OutputStream::Stdout, text)),
                    Step::Err(text) => Some(ProcessEvent::output(OutputStream::Stderr, text)),
                    Step::Sleep(ms) => {
                        smol::Timer::after(Duration::from_millis(ms)).await;
                        None
                    }
                    Step::Exit(code) => Some(ProcessEvent::exited(Some(code), None)),
                    Step::Hang => {
                        futures::future::pending::<()>().await;
                        None
                    }
                }
            }))
            .filter_map(|event| async move { event })
            .boxed();

        let channel = OutputChannel::new(name);
        self.launched
            .lock()
            .unwrap()
            .push((environment.clone(), channel.clone()));
        Ok(LaunchedProcess {
            channel,
            events,
            handle: Box::new(FakeHandle(4242)),
        })
    }
}

/// Hook that appends its name to a shared journal and tags the environment
pub struct JournalHook {
    pub name: String,
    pub journal: Arc<Mutex<Vec<String>>>,
}

impl PreLaunchHook for JournalHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn before_launch(&self, environment: &mut ExecutionEnvironment) -> Result<(), HookError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, environment.configuration.name));
        environment
            .user_data
            .insert(format!("env.HOOK_{}", self.name.to_uppercase()), "1".into());
        Ok(())
    }
}

/// Hook that always fails
pub struct FailingHook;

impl PreLaunchHook for FailingHook {
    fn name(&self) -> &str {
        "failing"
    }

    fn before_launch(&self, _environment: &mut ExecutionEnvironment) -> Result<(), HookError> {
        Err("hook exploded".into())
    }
}

/// Registry, targets, spawner and notifier wired into one orchestrator
pub struct Fixture {
    pub registry: Arc<MemoryRegistry>,
    pub targets: Arc<MemoryTargetManager>,
    pub spawner: Arc<ScriptedSpawner>,
    pub notifier: Arc<RecordingNotifier>,
    pub hooks: Vec<Arc<dyn PreLaunchHook>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(MemoryRegistry::new()),
            targets: Arc::new(MemoryTargetManager::new([ExecutionTarget::ready("local")])),
            spawner: Arc::new(ScriptedSpawner::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            hooks: Vec::new(),
        }
    }

    /// Register a configuration named `name` running `true`
    pub fn add(&self, name: &str) -> Arc<RunConfiguration> {
        self.registry.insert(config(name))
    }

    pub fn orchestrator(&self) -> LaunchOrchestrator {
        let collaborators = Collaborators {
            registry: self.registry.clone(),
            targets: self.targets.clone(),
            runner: Arc::new(ExecutorRunner),
            hooks: self.hooks.clone(),
            spawner: self.spawner.clone(),
            notifier: self.notifier.clone(),
        };
        let dispatcher = Dispatcher::start("gate-test-dispatch").unwrap();
        LaunchOrchestrator::new(collaborators, Arc::new(dispatcher))
    }
}

pub fn config(name: &str) -> RunConfiguration {
    RunConfiguration::new("command", name, CommandLine::new("true"))
}

/// Environment of the configuration that asks for its prerequisites
pub fn requesting(executor: Executor) -> ExecutionEnvironment {
    ExecutionEnvironment::new(
        Arc::new(config("app")),
        executor,
        Some(ExecutionTarget::ready("local")),
    )
}

/// Poll `condition` until it holds or `timeout` passes
pub fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

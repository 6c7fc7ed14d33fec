//! In-process test doubles shared by unit tests

use crate::error::{WeavrError, WeavrResult};
use crate::isolation::{ContextFactory, IsolatedContext, RunReport};
use crate::logger::{BuildHost, LogMessage, Severity};
use crate::plugin::{identities, PluginDescriptor, PluginIdentity};
use crate::request::RunConfiguration;
use crate::workspace::WorkspaceKey;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Build host that keeps everything it is sent
#[derive(Default)]
pub struct MemoryHost {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl MemoryHost {
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.messages()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.messages().iter().any(|(_, t)| t.contains(text))
    }
}

impl BuildHost for MemoryHost {
    fn emit(&self, severity: Severity, text: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((severity, text.to_string()));
    }
}

/// Counters and switches shared between a `FakeFactory` and the test
#[derive(Default)]
pub struct FakeStats {
    created: AtomicUsize,
    unloaded: AtomicUsize,
    runs: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_runs: AtomicBool,
    fail_create: AtomicBool,
    panic_on_create: AtomicBool,
    scripted: Mutex<Option<RunReport>>,
}

impl FakeStats {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn unloaded(&self) -> usize {
        self.unloaded.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Highest number of runs that were executing at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fail_runs(&self, fail: bool) {
        self.fail_runs.store(fail, Ordering::SeqCst);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn panic_on_create(&self, panic: bool) {
        self.panic_on_create.store(panic, Ordering::SeqCst);
    }

    /// Make every following run return `report` as-is
    pub fn script(&self, report: Option<RunReport>) {
        *self.scripted.lock().unwrap() = report;
    }
}

/// Factory producing in-process contexts that only count what happens
pub struct FakeFactory {
    stats: Arc<FakeStats>,
}

impl FakeFactory {
    pub fn new() -> (Self, Arc<FakeStats>) {
        let stats = Arc::new(FakeStats::default());
        (
            Self {
                stats: Arc::clone(&stats),
            },
            stats,
        )
    }
}

#[async_trait]
impl ContextFactory for FakeFactory {
    async fn create(
        &self,
        workspace: &WorkspaceKey,
        plugins: &[PluginDescriptor],
    ) -> WeavrResult<Box<dyn IsolatedContext>> {
        if self.stats.panic_on_create.load(Ordering::SeqCst) {
            panic!("fake factory exploded");
        }
        if self.stats.fail_create.load(Ordering::SeqCst) {
            return Err(WeavrError::ContextStart {
                workspace: workspace.to_string(),
                reason: "fake failure".to_string(),
            });
        }
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeContext {
            plugins: identities(plugins),
            stats: Arc::clone(&self.stats),
        }))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct FakeContext {
    plugins: Vec<PluginIdentity>,
    stats: Arc<FakeStats>,
}

#[async_trait]
impl IsolatedContext for FakeContext {
    fn plugins(&self) -> &[PluginIdentity] {
        &self.plugins
    }

    async fn run(
        &mut self,
        _config: &RunConfiguration,
        plugins: &[PluginDescriptor],
    ) -> WeavrResult<RunReport> {
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(15)).await;
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.stats.runs.fetch_add(1, Ordering::SeqCst);

        if let Some(report) = self.stats.scripted.lock().unwrap().clone() {
            return Ok(report);
        }
        if self.stats.fail_runs.load(Ordering::SeqCst) {
            return Ok(RunReport {
                success: false,
                messages: vec![LogMessage::new(Severity::Error, "weaving failed", "fake")],
            });
        }

        let messages = plugins
            .iter()
            .map(|p| LogMessage::new(Severity::Info, format!("{} woven", p.name), p.name.as_str()))
            .collect();
        Ok(RunReport {
            success: true,
            messages,
        })
    }

    async fn unload(self: Box<Self>) -> WeavrResult<()> {
        self.stats.unloaded.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

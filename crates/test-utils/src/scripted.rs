use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use polldag::operators::{BoxFuture, Operator, TaskContext};

/// Tracks how many operators are executing at the same moment.
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An operator that plays back a fixed list of results.
///
/// Once the script is exhausted every further call returns the fallback.
pub struct ScriptedOperator {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
    delay: Option<Duration>,
    calls: AtomicU32,
    probe: Option<Arc<ConcurrencyProbe>>,
    log: Option<(String, Arc<Mutex<Vec<String>>>)>,
    panic_on: Option<u32>,
}

impl ScriptedOperator {
    pub fn succeeding() -> Self {
        Self::with_fallback(true)
    }

    pub fn failing() -> Self {
        Self::with_fallback(false)
    }

    /// Plays `results` (true = success) in order, then keeps succeeding.
    pub fn from_results(results: impl IntoIterator<Item = bool>) -> Self {
        let op = Self::with_fallback(true);
        op.script
            .lock()
            .expect("fresh mutex")
            .extend(results);
        op
    }

    fn with_fallback(fallback: bool) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            delay: None,
            calls: AtomicU32::new(0),
            probe: None,
            log: None,
            panic_on: None,
        }
    }

    /// Panic on the given 1-based call instead of returning.
    pub fn panicking_on(mut self, call: u32) -> Self {
        self.panic_on = Some(call);
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_probe(mut self, probe: Arc<ConcurrencyProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Append `name` to `log` on every call.
    pub fn with_log(mut self, name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = Some((name.to_string(), log));
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Operator for ScriptedOperator {
    fn kind(&self) -> &'static str {
        "scripted"
    }

    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((name, log)) = &self.log {
                log.lock().expect("log mutex").push(name.clone());
            }

            if self.panic_on == Some(call) {
                panic!("{} blew up on call {}", ctx.task, call);
            }

            if let Some(probe) = &self.probe {
                probe.enter();
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(probe) = &self.probe {
                probe.exit();
            }

            let succeed = self
                .script
                .lock()
                .expect("script mutex")
                .pop_front()
                .unwrap_or(self.fallback);

            if succeed {
                Ok(())
            } else {
                Err(anyhow!("{} failed on call {}", ctx.task, call))
            }
        })
    }
}

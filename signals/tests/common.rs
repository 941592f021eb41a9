use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, Once};

use tracing::Level;

static TRACING: Once = Once::new();

/// Initializes tracing once per test binary; `LOG_LEVEL` overrides the default of INFO
#[allow(unused)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let level = std::env::var("LOG_LEVEL").ok().and_then(|level| level.parse().ok()).unwrap_or(Level::INFO);
        let _ = tracing_subscriber::fmt().with_max_level(level).with_test_writer().try_init();
    });
}

/// Shared record of which recorders were invoked, in invocation order
#[derive(Clone, Debug, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

#[allow(unused)]
impl Log {
    pub fn push(&self, entry: impl Into<String>) { self.0.lock().unwrap().push(entry.into()); }

    /// Drains the log
    pub fn take(&self) -> Vec<String> { self.0.lock().unwrap().drain(..).collect() }
}

/// Test listener; identity is its name only
#[derive(Clone, Debug)]
pub struct Recorder {
    pub name: &'static str,
    pub log: Log,
}

#[allow(unused)]
impl Recorder {
    pub fn new(name: &'static str, log: &Log) -> Self { Self { name, log: log.clone() } }

    pub fn hit(&self) { self.log.push(self.name); }

    pub fn record(&self, value: &i32) { self.log.push(format!("{}:{value}", self.name)); }
}

impl PartialEq for Recorder {
    fn eq(&self, other: &Self) -> bool { self.name == other.name }
}

impl Eq for Recorder {}

impl Hash for Recorder {
    fn hash<H: Hasher>(&self, state: &mut H) { self.name.hash(state); }
}

/// Listener whose hash is the same for every value; equality still tells them apart
#[allow(unused)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Colliding(pub u32);

impl Hash for Colliding {
    fn hash<H: Hasher>(&self, state: &mut H) { 0u8.hash(state); }
}

/// Runs a closure when dropped; captured by callbacks to observe when their state is released
#[allow(unused)]
pub struct OnDrop<F: Fn()>(pub F);

impl<F: Fn()> Drop for OnDrop<F> {
    fn drop(&mut self) { (self.0)() }
}

/// Shared test utilities for shardconn integration tests
use shardconn::{ConnectionConfig, Driver, DriverError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Connection produced by [`FakeDriver`]
#[derive(Debug)]
pub struct FakeConnection {
    pub host: String,
    pub serial: u32,
}

/// Driver that counts `open()` calls and fails on demand
#[derive(Clone, Default)]
pub struct FakeDriver {
    opens: Arc<AtomicU32>,
    failing_hosts: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every open sleep for `delay` first
    #[allow(dead_code)]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `open()` calls so far, failed ones included
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Make opens against `host` fail until [`FakeDriver::recover`] is called
    #[allow(dead_code)]
    pub fn fail_host(&self, host: &str) {
        self.failing_hosts.lock().unwrap().insert(host.to_string());
    }

    #[allow(dead_code)]
    pub fn recover(&self, host: &str) {
        self.failing_hosts.lock().unwrap().remove(host);
    }
}

impl Driver for FakeDriver {
    type Connection = FakeConnection;

    fn open(&self, config: &ConnectionConfig) -> Result<FakeConnection, DriverError> {
        let serial = self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.failing_hosts.lock().unwrap().contains(&config.host) {
            return Err(DriverError::other(format!("{} refused connection", config.host)));
        }
        Ok(FakeConnection {
            host: config.host.clone(),
            serial,
        })
    }
}

//! # Connection Registry
//!
//! Caches one [`ConnectionHandle`] per normalized connection name.
//!
//! A registry belongs to one execution unit (a worker, a request, a job).
//! Create one at the start of the unit's work and drop or [`reset`] it at the
//! end; registries never share cache state with each other.
//!
//! Within a registry, the first `connect` for a name builds the handle while
//! holding that name's slot lock, so concurrent callers for the same name
//! wait and then receive the same handle. Callers for other names are not
//! held up. A failed build caches nothing.
//!
//! ```rust,no_run
//! use shardconn::{Config, ConnectionBuilder, PostgresDriver, Registry};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file("shardconn.toml")?;
//! let builder = ConnectionBuilder::new(PostgresDriver::new()?, config);
//!
//! let registry = Registry::new(&builder);
//! let reports = registry.connect("reports")?;
//! let again = registry.connect("Reports")?;
//! assert!(std::sync::Arc::ptr_eq(&reports, &again));
//! # Ok(())
//! # }
//! ```
//!
//! [`reset`]: Registry::reset

use crate::builder::ConnectionBuilder;
use crate::config::ConnectionConfig;
use crate::connection::ConnectionHandle;
use crate::database::Driver;
use crate::error::Result;
use crate::name::ConnectionName;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

/// Shared handle type returned by the registry
pub type SharedHandle<C> = Arc<ConnectionHandle<C>>;

struct Slot<C> {
    handle: OnceLock<SharedHandle<C>>,
    building: Mutex<()>,
}

impl<C> Default for Slot<C> {
    fn default() -> Self {
        Self {
            handle: OnceLock::new(),
            building: Mutex::new(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-scope cache of connection handles keyed by normalized name
pub struct Registry<D: Driver> {
    builder: ConnectionBuilder<D>,
    scope_id: Uuid,
    slots: Mutex<HashMap<ConnectionName, Arc<Slot<D::Connection>>>>,
}

impl<D: Driver> Registry<D> {
    /// Create an empty registry for a new scope
    #[must_use]
    pub fn new(builder: &ConnectionBuilder<D>) -> Self {
        let scope_id = Uuid::new_v4();
        debug!("Creating connection registry for scope {}", scope_id);
        Self {
            builder: builder.with_scope(scope_id),
            scope_id,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Identifier of this registry's scope
    #[must_use]
    pub const fn scope_id(&self) -> Uuid {
        self.scope_id
    }

    /// Connect to a configured connection, which must exist
    pub fn connect(&self, name: &str) -> Result<SharedHandle<D::Connection>> {
        self.connect_opt(name, true)
    }

    /// Connect to a configured connection
    ///
    /// When `should_exist` is false and nothing is configured for `name`, a
    /// deferred handle is cached instead of failing.
    pub fn connect_opt(
        &self,
        name: &str,
        should_exist: bool,
    ) -> Result<SharedHandle<D::Connection>> {
        self.get_or_build(name, |builder, name| builder.establish(name, should_exist))
    }

    /// Connect with an explicit configuration, bypassing the config source
    ///
    /// The cache is keyed on the name alone: if `name` is already connected,
    /// the cached handle is returned and `config` is ignored.
    pub fn connect_with_config(
        &self,
        name: &str,
        config: ConnectionConfig,
    ) -> Result<SharedHandle<D::Connection>> {
        self.get_or_build(name, |builder, name| {
            builder.establish_from_config(name, config)
        })
    }

    /// Cached handle for `name`, without connecting
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SharedHandle<D::Connection>> {
        let name = ConnectionName::parse(name).ok()?;
        let slots = lock(&self.slots);
        slots.get(&name)?.handle.get().cloned()
    }

    /// Number of cached handles
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| slot.handle.get().is_some())
            .count()
    }

    /// Whether no handle is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalized names of cached handles, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.slots)
            .iter()
            .filter(|(_, slot)| slot.handle.get().is_some())
            .map(|(name, _)| name.as_str().to_string())
            .collect();
        names.sort();
        names
    }

    /// Forget every cached handle
    ///
    /// Handles are not closed here. A driver connection closes once the last
    /// outstanding reference to its handle is dropped. A build still in
    /// progress during a reset completes for its caller but is not cached.
    pub fn reset(&self) {
        let mut slots = lock(&self.slots);
        debug!(
            "Resetting connection registry for scope {} ({} entries)",
            self.scope_id,
            slots.len()
        );
        slots.clear();
    }

    fn get_or_build<F>(&self, raw: &str, build: F) -> Result<SharedHandle<D::Connection>>
    where
        F: FnOnce(&ConnectionBuilder<D>, &ConnectionName) -> Result<ConnectionHandle<D::Connection>>,
    {
        let name = ConnectionName::parse(raw)?;

        loop {
            let slot = {
                let mut slots = lock(&self.slots);
                Arc::clone(slots.entry(name.clone()).or_default())
            };

            if let Some(handle) = slot.handle.get() {
                debug!("Connection cache hit for '{}'", name);
                return Ok(Arc::clone(handle));
            }

            let building = lock(&slot.building);
            if let Some(handle) = slot.handle.get() {
                debug!("Connection '{}' was established while waiting", name);
                return Ok(Arc::clone(handle));
            }
            // The slot was discarded after a failed build, or by a reset.
            if !self.is_current(&name, &slot) {
                drop(building);
                continue;
            }

            return match build(&self.builder, &name) {
                Ok(handle) => {
                    let handle = Arc::new(handle);
                    let stored = slot.handle.get_or_init(|| Arc::clone(&handle));
                    info!(
                        "Established connection '{}' as {}",
                        name,
                        stored.label()
                    );
                    Ok(Arc::clone(stored))
                }
                Err(e) => {
                    self.discard_empty_slot(&name, &slot);
                    drop(building);
                    Err(e)
                }
            };
        }
    }

    fn is_current(&self, name: &ConnectionName, slot: &Arc<Slot<D::Connection>>) -> bool {
        lock(&self.slots)
            .get(name)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Drop a slot whose build failed
    ///
    /// Called with the slot's build lock held, so callers already waiting on
    /// it see it is no longer current and start over on a fresh slot.
    fn discard_empty_slot(&self, name: &ConnectionName, slot: &Arc<Slot<D::Connection>>) {
        let mut slots = lock(&self.slots);
        let is_ours = slots.get(name).is_some_and(|current| Arc::ptr_eq(current, slot));
        if is_ours && slot.handle.get().is_none() {
            slots.remove(name);
        }
    }
}

impl<D: Driver> fmt::Debug for Registry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("scope_id", &self.scope_id)
            .field("names", &self.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DriverError, ShardConnError};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingDriver {
        opens: AtomicU32,
    }

    impl Driver for CountingDriver {
        type Connection = u32;

        fn open(&self, config: &ConnectionConfig) -> std::result::Result<u32, DriverError> {
            if config.host == "down" {
                return Err(DriverError::other("refused"));
            }
            Ok(self.opens.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn registry() -> Registry<CountingDriver> {
        let mut source = HashMap::new();
        source.insert("a".to_string(), ConnectionConfig::new("host-a"));
        source.insert("b".to_string(), ConnectionConfig::new("host-b"));
        source.insert("broken".to_string(), ConnectionConfig::new("down"));
        Registry::new(&ConnectionBuilder::new(CountingDriver::default(), source))
    }

    #[test]
    fn test_invalid_name_fails_before_driver_call() {
        let registry = registry();
        assert!(matches!(
            registry.connect("  "),
            Err(ShardConnError::InvalidName { .. })
        ));
        assert_eq!(registry.builder.driver().opens.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_build_leaves_no_slot_behind() {
        let registry = registry();
        assert!(registry.connect("broken").is_err());
        assert!(lock(&registry.slots).is_empty());
    }

    #[test]
    fn test_failed_build_discards_slot_even_when_shared() {
        let registry = registry();
        let name = ConnectionName::parse("broken").unwrap();
        let waiter = {
            let mut slots = lock(&registry.slots);
            Arc::clone(slots.entry(name.clone()).or_default())
        };

        assert!(registry.connect("broken").is_err());
        assert!(lock(&registry.slots).is_empty());
        assert!(!registry.is_current(&name, &waiter));
    }

    #[test]
    fn test_get_does_not_connect() {
        let registry = registry();
        assert!(registry.get("a").is_none());
        let handle = registry.connect("a").unwrap();
        assert!(Arc::ptr_eq(&registry.get("A").unwrap(), &handle));
        assert_eq!(registry.builder.driver().opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_names_are_sorted_and_normalized() {
        let registry = registry();
        registry.connect("B").unwrap();
        registry.connect("a").unwrap();
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_labels_carry_scope() {
        let registry = registry();
        let handle = registry.connect("a").unwrap();
        assert!(handle
            .label()
            .ends_with(&registry.scope_id().simple().to_string()));
    }
}

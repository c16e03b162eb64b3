//! Named-implementation plugin loader.
//!
//! Every pluggable seam of the framework (serializers, load balancers,
//! registries, retry and tolerance strategies) is resolved through one
//! mechanism: a per-interface registry mapping configuration keys to
//! implementation constructors.
//!
//! Two descriptor roots feed each registry:
//!
//! 1. A **system root**: descriptor text compiled into the crate that owns
//!    the interface (the framework-provided defaults).
//! 2. A **custom root**: an optional on-disk directory
//!    ([`CUSTOM_DESCRIPTOR_DIR`], relative to the working directory) whose
//!    files are named by the interface identifier. Custom bindings are
//!    applied after the system ones, so later writes win.
//!
//! Descriptor lines have the form `key=impl.path`; blank lines, `#` comments
//! and malformed lines are skipped with a logged warning.
//!
//! Instances are lazily constructed singletons: `get` returns the same
//! `Arc` for a given implementation across all calls.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{RpcError, RpcResult};

/// Default on-disk root scanned for user descriptor overrides.
pub const CUSTOM_DESCRIPTOR_DIR: &str = "spi/custom";

/// Constructor registered for one implementation path.
pub type Constructor<T> = fn() -> Arc<T>;

/// Plugin registry for a single pluggable interface.
pub struct SpiRegistry<T: ?Sized + Send + Sync> {
    interface: &'static str,
    constructors: HashMap<&'static str, Constructor<T>>,
    /// key -> implementation path, write-once-per-key after loading.
    bindings: RwLock<HashMap<String, String>>,
    /// implementation path -> cached singleton.
    instances: RwLock<HashMap<String, Arc<T>>>,
}

impl<T: ?Sized + Send + Sync> SpiRegistry<T> {
    /// Builds the registry for `interface`, applies the embedded system
    /// descriptor and then any override file under the default custom root.
    pub fn new(
        interface: &'static str,
        system_descriptor: &'static str,
        constructors: &[(&'static str, Constructor<T>)],
    ) -> Self {
        let registry = SpiRegistry {
            interface,
            constructors: constructors.iter().copied().collect(),
            bindings: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
        };
        registry.apply_descriptor(system_descriptor);
        registry.load_custom_dir(Path::new(CUSTOM_DESCRIPTOR_DIR));
        registry
    }

    /// Applies the descriptor file for this interface found under `dir`, if
    /// any. Bindings read here override earlier ones.
    pub fn load_custom_dir(&self, dir: &Path) {
        let path = dir.join(self.interface);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => return,
        };
        debug!(interface = self.interface, path = %path.display(), "loading custom plugin descriptor");
        self.apply_descriptor(&text);
    }

    fn apply_descriptor(&self, text: &str) {
        let mut bindings = self.bindings.write();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once('=') {
                Some((key, impl_path))
                    if !key.trim().is_empty() && !impl_path.trim().is_empty() =>
                {
                    bindings.insert(key.trim().to_string(), impl_path.trim().to_string());
                }
                _ => warn!(
                    interface = self.interface,
                    line, "skipping malformed plugin descriptor line"
                ),
            }
        }
    }

    /// Resolves `key` to its cached singleton, constructing it on first use.
    pub fn get(&self, key: &str) -> RpcResult<Arc<T>> {
        let impl_path = self
            .bindings
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| RpcError::PluginNotFound {
                interface: self.interface.to_string(),
                key: key.to_string(),
            })?;

        if let Some(instance) = self.instances.read().get(&impl_path) {
            return Ok(instance.clone());
        }

        let constructor =
            *self
                .constructors
                .get(impl_path.as_str())
                .ok_or_else(|| RpcError::PluginNotFound {
                    interface: self.interface.to_string(),
                    key: impl_path.clone(),
                })?;

        let mut instances = self.instances.write();
        Ok(instances.entry(impl_path).or_insert_with(constructor).clone())
    }

    /// All currently bound keys, for diagnostics.
    pub fn keys(&self) -> Vec<String> {
        self.bindings.read().keys().cloned().collect()
    }
}

//! Load-once compiler cache keyed by normalized version string.
//!
//! The cache is append-only for the process lifetime: once a version is
//! resolved and loaded it stays loaded, so re-entering `pragma solidity`
//! lines never pays the lookup twice.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::registry::{Registry, RegistryError};
use super::Compiler;
use crate::error::ShellError;

/// Cache keys: the request with a leading `^` (and the conventional `v`
/// prefix) stripped. `^0.8.21`, `v0.8.21`, and `0.8.21` share one slot.
pub fn normalize_version(spec: &str) -> String {
    let first = spec.split_whitespace().next().unwrap_or("");
    let first = first.strip_prefix('^').unwrap_or(first);
    let first = first.strip_prefix('v').unwrap_or(first);
    first.to_string()
}

pub struct CompilerCache {
    registry: Box<dyn Registry>,
    loaded: HashMap<String, Box<dyn Compiler>>,
}

impl CompilerCache {
    pub fn new(registry: Box<dyn Registry>) -> Self {
        Self {
            registry,
            loaded: HashMap::new(),
        }
    }

    /// Seed the cache with an already-loaded compiler (the installed one),
    /// keyed under its own version.
    pub fn preseed(&mut self, compiler: Box<dyn Compiler>) {
        self.loaded
            .insert(normalize_version(compiler.version()), compiler);
    }

    /// Versions currently loaded, unordered.
    pub fn loaded_versions(&self) -> Vec<&str> {
        self.loaded.keys().map(String::as_str).collect()
    }

    /// Resolve a version request to a loaded compiler, consulting the
    /// registry and loading on a cache miss.
    pub fn resolve(&mut self, version_spec: &str) -> Result<&dyn Compiler, ShellError> {
        let key = normalize_version(version_spec);
        match self.loaded.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut().as_ref()),
            Entry::Vacant(entry) => {
                let build = self.registry.resolve_build(entry.key()).map_err(|e| match e {
                    RegistryError::NotFound(_) => {
                        ShellError::UnresolvedVersion(version_spec.to_string())
                    }
                    RegistryError::Io(msg) => ShellError::Infrastructure(msg),
                })?;
                let compiler = self
                    .registry
                    .load(&build)
                    .map_err(ShellError::Infrastructure)?;
                Ok(entry.insert(compiler).as_ref())
            }
        }
    }
}

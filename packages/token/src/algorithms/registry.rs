//! Signing method registry
//!
//! The registry is an explicit table rather than process-wide state: build
//! it once at startup, register every method, then share it read-only
//! (typically behind an `Arc`) with whatever builds signatories.

use super::hmac_method::HmacMethod;
use super::method::SigningMethod;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Produces the shared instance of a signing method.
pub type MethodConstructor = fn() -> Arc<dyn SigningMethod>;

/// Algorithm name to signing method table.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: BTreeMap<String, MethodConstructor>,
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("algorithms", &self.algorithms())
            .finish()
    }
}

impl MethodRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding HS256, HS384 and HS512.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("HS256", hs256);
        registry.register("HS384", hs384);
        registry.register("HS512", hs512);
        registry
    }

    /// Register `constructor` under `name`, replacing any earlier entry.
    pub fn register(&mut self, name: impl Into<String>, constructor: MethodConstructor) {
        let name = name.into();
        tracing::trace!(alg = %name, "signing method registered");
        self.methods.insert(name, constructor);
    }

    /// Method registered under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn SigningMethod>> {
        self.methods.get(name).map(|constructor| constructor())
    }

    /// True when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered algorithm names, sorted.
    #[must_use]
    pub fn algorithms(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }
}

fn hs256() -> Arc<dyn SigningMethod> {
    Arc::new(HmacMethod::hs256())
}

fn hs384() -> Arc<dyn SigningMethod> {
    Arc::new(HmacMethod::hs384())
}

fn hs512() -> Arc<dyn SigningMethod> {
    Arc::new(HmacMethod::hs512())
}

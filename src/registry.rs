//! Contract registry: method name to parameter contract.
//!
//! The registry is filled once, when a handler is hosted, and is read-only
//! afterwards. Share it behind an `Arc` to serve concurrent messages.
//!
//! ```rust
//! use ash_rpc_dispatch::*;
//!
//! let mut registry = ContractRegistry::new();
//! registry
//!     .register("add", MethodContract::positional([ParamKind::Integer, ParamKind::Integer]))
//!     .unwrap();
//!
//! assert!(registry.lookup("add").is_some());
//! assert!(registry.register("rpc.discover", MethodContract::no_params()).is_err());
//! ```

use crate::contract::MethodContract;
use crate::error::ConfigurationError;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Method names with this prefix belong to the protocol itself
pub const RESERVED_METHOD_PREFIX: &str = "rpc.";

/// Check if a method name is reserved for protocol-internal use
pub fn is_system_method(name: &str) -> bool {
    name.starts_with(RESERVED_METHOD_PREFIX)
}

/// Registry of method contracts keyed by method name
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    contracts: HashMap<String, MethodContract>,
}

impl ContractRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a set of contracts, failing on the first invalid name
    pub fn from_contracts<K, I>(contracts: I) -> Result<Self, ConfigurationError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, MethodContract)>,
    {
        let mut registry = Self::new();
        for (name, contract) in contracts {
            registry.register(name, contract)?;
        }
        tracing::debug!(method_count = registry.len(), "contract registry created");
        Ok(registry)
    }

    /// Register a contract for a method
    pub fn register(
        &mut self,
        name: impl Into<String>,
        contract: MethodContract,
    ) -> Result<(), ConfigurationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigurationError::EmptyMethodName);
        }
        if is_system_method(&name) {
            return Err(ConfigurationError::ReservedMethodName(name));
        }

        match self.contracts.entry(name) {
            Entry::Occupied(entry) => Err(ConfigurationError::DuplicateMethod(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::trace!(method = %entry.key(), arity = contract.arity(), "registering contract");
                entry.insert(contract);
                Ok(())
            }
        }
    }

    /// Look up the contract of a method; `None` means the method is unknown
    pub fn lookup(&self, name: &str) -> Option<&MethodContract> {
        self.contracts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.contracts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Aggregation of per-module genesis initializers.
//!
//! Before a chain produces or accepts its first block, each module of the application writes its
//! starting state. Modules register an initializer under their name in a [`GenesisRegistry`], and the
//! registry runs every initializer exactly once with that module's raw genesis payload.
//!
//! ## Ordering
//!
//! Initializers must be independent of each other. The registry happens to run them in ascending order
//! of module name, but this is not part of its contract: an initializer that needs to read state written
//! by another module's initializer is a bug in the application, not something the registry resolves.
//!
//! ## Failure
//!
//! The first initializer that fails aborts the run. The remaining initializers are not called, and the
//! returned [`GenesisError::ModuleFailed`] names both the failing module and the modules that had
//! already completed. The registry does not undo anything; the
//! [`AppManager`](crate::app_manager::AppManager) simply never commits the state written during a
//! failed run.

use std::collections::BTreeMap;

use borsh::BorshDeserialize;

/// Raw genesis payloads, keyed by module name.
pub type GenesisPayloads = BTreeMap<String, Vec<u8>>;

/// Error type returned by a module's genesis initializer.
pub type InitGenesisError = Box<dyn std::error::Error + Send + Sync>;

/// A module's genesis initializer: writes the module's starting state into the given state view, using
/// the module's raw genesis payload.
pub type InitGenesis<W> = Box<dyn Fn(&mut W, &[u8]) -> Result<(), InitGenesisError> + Send + Sync>;

/// Named set of genesis initializers that write into state views of type `W`.
pub struct GenesisRegistry<W> {
    initializers: BTreeMap<String, InitGenesis<W>>,
}

impl<W> GenesisRegistry<W> {
    /// Create a new, empty `GenesisRegistry`.
    pub fn new() -> Self {
        Self {
            initializers: BTreeMap::new(),
        }
    }

    /// Register `init_genesis` as the genesis initializer of `module`.
    ///
    /// Each module can only register once.
    pub fn register(
        &mut self,
        module: impl Into<String>,
        init_genesis: impl Fn(&mut W, &[u8]) -> Result<(), InitGenesisError> + Send + Sync + 'static,
    ) -> Result<(), GenesisError> {
        let module = module.into();
        if self.initializers.contains_key(&module) {
            return Err(GenesisError::DuplicateModule { module });
        }
        self.initializers.insert(module, Box::new(init_genesis));
        Ok(())
    }

    /// Iterate through the names of every registered module.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.initializers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.initializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initializers.is_empty()
    }

    /// Run every registered initializer exactly once against `state`.
    ///
    /// A module without an entry in `payloads` is passed an empty payload. Entries in `payloads` for
    /// modules that were never registered are ignored.
    pub fn run(&self, state: &mut W, payloads: &GenesisPayloads) -> Result<(), GenesisError> {
        for module in payloads.keys() {
            if !self.initializers.contains_key(module) {
                log::warn!("Ignoring genesis payload for unregistered module: {}", module);
            }
        }

        let mut completed = Vec::with_capacity(self.initializers.len());
        for (module, init_genesis) in &self.initializers {
            let payload = payloads.get(module).map(Vec::as_slice).unwrap_or_default();
            if let Err(source) = init_genesis(state, payload) {
                return Err(GenesisError::ModuleFailed {
                    module: module.clone(),
                    completed,
                    source,
                });
            }
            log::debug!("Initialized genesis of module: {}", module);
            completed.push(module.clone());
        }

        Ok(())
    }
}

impl<W> Default for GenesisRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a Borsh-encoded map from module name to raw genesis payload.
pub fn decode_payloads(bytes: &[u8]) -> Result<GenesisPayloads, GenesisError> {
    GenesisPayloads::try_from_slice(bytes).map_err(GenesisError::Decode)
}

/// The different ways running genesis can fail.
#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    /// Two initializers were registered under the same module name.
    #[error("genesis initializer already registered for module: {module}")]
    DuplicateModule { module: String },

    /// A module's initializer failed. `completed` lists the modules whose initializers had already
    /// succeeded, in the order they ran.
    #[error("failed to init genesis on module: {module}")]
    ModuleFailed {
        module: String,
        completed: Vec<String>,
        #[source]
        source: InitGenesisError,
    },

    /// The genesis payload map could not be decoded.
    #[error("failed to decode genesis payloads")]
    Decode(#[source] std::io::Error),
}

impl GenesisError {
    /// Get the name of the module whose initializer failed, if this error came from an initializer.
    pub fn failed_module(&self) -> Option<&str> {
        match self {
            GenesisError::ModuleFailed { module, .. } => Some(module),
            _ => None,
        }
    }
}

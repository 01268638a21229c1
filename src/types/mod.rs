//! Types and traits that are used across multiple components of the coordinator.
//!
//! Other types and traits, specific to single components, can be found next to those components,
//! e.g., [`crate::store::pluggables`].

pub mod block;

pub mod change_set;

pub mod data_types;

pub mod gas;

pub mod transaction;

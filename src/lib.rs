/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A block-lifecycle coordinator for replicated state machines.
//!
//! An [`AppManager`](app_manager::AppManager) sits between a consensus layer, which decides the order
//! of blocks, and a deterministic [state transition function](stf) backed by a [versioned
//! store](store). It builds blocks from a [transaction pool](tx_pool), executes and commits delivered
//! blocks exactly once per height, serves queries and simulations against the last committed state, and
//! writes the application's [genesis](genesis) state.
//!
//! Blocks built by a replica are executed speculatively, and the result is [cached](cache) so that
//! delivering the same block later does not execute it a second time.

pub mod app_manager;

pub(crate) mod cache;

pub(crate) mod event_bus;

pub mod events;

pub mod genesis;

pub(crate) mod height;

pub mod logging;

pub mod stf;

pub mod store;

pub mod tx_pool;

pub mod types;

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events emitted by the coordinator for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Events are published to
//! the [event bus](crate::event_bus) thread, which calls the handlers registered through the setters
//! of [`AppManagerSpec`](crate::app_manager::AppManagerSpec), and, if
//! [`log_events`](crate::app_manager::Configuration::log_events) is set, the default
//! [loggers](crate::logging).

use std::{sync::mpsc::Sender, time::SystemTime};

use crate::types::data_types::{BlockHeight, StateRoot};

/// Enumerates all events defined for the coordinator.
pub enum Event {
    InitGenesis(InitGenesisEvent),
    BuildBlock(BuildBlockEvent),
    DeliverBlock(DeliverBlockEvent),
    CommitBlock(CommitBlockEvent),
    DiscardCache(DiscardCacheEvent),
}

impl Event {
    /// Send this event to the event bus, if there is one. Publishing never fails: events published after
    /// the event bus has shut down are dropped.
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            let _ = event_publisher.send(self);
        }
    }
}

/// Every registered genesis initializer succeeded, and the resulting state was committed at the genesis
/// height.
pub struct InitGenesisEvent {
    pub timestamp: SystemTime,
    pub modules: Vec<String>,
    pub state_root: StateRoot,
}

/// A block was built for `height`. `cached` tells whether its execution result was stored for reuse.
pub struct BuildBlockEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub tx_count: usize,
    pub cached: bool,
}

/// A block was delivered and committed. `reused_cache` tells whether the committed change set came from
/// a built block instead of re-execution.
pub struct DeliverBlockEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub tx_count: usize,
    pub reused_cache: bool,
}

/// A change set was committed into the store, advancing the last committed height to `height`.
pub struct CommitBlockEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub state_root: StateRoot,
}

/// A cached block built for `cached_height` was thrown away because the block delivered at
/// `requested_height` did not match it.
pub struct DiscardCacheEvent {
    pub timestamp: SystemTime,
    pub cached_height: BlockHeight,
    pub requested_height: BlockHeight,
}

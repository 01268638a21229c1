/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The thread that receives published [events](crate::events) and fires their handlers.
//!
//! Handlers run off the caller's thread, so a slow handler never delays a block delivery. Handlers of
//! the same event type run in the order they were registered, with the default logger (if enabled)
//! first.

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{events::*, logging::Logger};

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

// How long the event bus waits for an event before checking for a shutdown signal again.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) struct EventHandlers {
    pub(crate) init_genesis_handlers: Vec<HandlerPtr<InitGenesisEvent>>,
    pub(crate) build_block_handlers: Vec<HandlerPtr<BuildBlockEvent>>,
    pub(crate) deliver_block_handlers: Vec<HandlerPtr<DeliverBlockEvent>>,
    pub(crate) commit_block_handlers: Vec<HandlerPtr<CommitBlockEvent>>,
    pub(crate) discard_cache_handlers: Vec<HandlerPtr<DiscardCacheEvent>>,
}

impl EventHandlers {
    /// Collect the user-defined handlers, preceded by the default loggers if `log_events` is set.
    pub(crate) fn new(
        log_events: bool,
        init_genesis_handler: Option<HandlerPtr<InitGenesisEvent>>,
        build_block_handler: Option<HandlerPtr<BuildBlockEvent>>,
        deliver_block_handler: Option<HandlerPtr<DeliverBlockEvent>>,
        commit_block_handler: Option<HandlerPtr<CommitBlockEvent>>,
        discard_cache_handler: Option<HandlerPtr<DiscardCacheEvent>>,
    ) -> EventHandlers {
        fn handlers<T: Logger>(log_events: bool, user_handler: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
            let mut handlers: Vec<HandlerPtr<T>> = Vec::new();
            if log_events {
                handlers.push(T::get_logger());
            }
            handlers.extend(user_handler);
            handlers
        }

        EventHandlers {
            init_genesis_handlers: handlers(log_events, init_genesis_handler),
            build_block_handlers: handlers(log_events, build_block_handler),
            deliver_block_handlers: handlers(log_events, deliver_block_handler),
            commit_block_handlers: handlers(log_events, commit_block_handler),
            discard_cache_handlers: handlers(log_events, discard_cache_handler),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.init_genesis_handlers.is_empty()
            && self.build_block_handlers.is_empty()
            && self.deliver_block_handlers.is_empty()
            && self.commit_block_handlers.is_empty()
            && self.discard_cache_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::InitGenesis(init_genesis_event) => self
                .init_genesis_handlers
                .iter()
                .for_each(|handler| handler(&init_genesis_event)),

            Event::BuildBlock(build_block_event) => self
                .build_block_handlers
                .iter()
                .for_each(|handler| handler(&build_block_event)),

            Event::DeliverBlock(deliver_block_event) => self
                .deliver_block_handlers
                .iter()
                .for_each(|handler| handler(&deliver_block_event)),

            Event::CommitBlock(commit_block_event) => self
                .commit_block_handlers
                .iter()
                .for_each(|handler| handler(&commit_block_event)),

            Event::DiscardCache(discard_cache_event) => self
                .discard_cache_handlers
                .iter()
                .for_each(|handler| handler(&discard_cache_event)),
        }
    }
}

/// Start the event bus thread. The thread fires handlers for every event received from
/// `event_subscriber` until `shutdown_signal` fires or every publisher is dropped. Events already
/// published when the shutdown signal arrives are still handled.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                event_subscriber
                    .try_iter()
                    .for_each(|event| event_handlers.fire_handlers(event));
                return;
            }
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => return,
        }
    })
}

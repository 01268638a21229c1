/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the coordinator's
//! [configuration](crate::app_manager::Configuration).
//!
//! The coordinator logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [CommitBlock](crate::events::CommitBlockEvent) is printed:
//!
//! ```text
//! CommitBlock, 1701329264, 5, fNGCJyk
//! ```
//!
//! In the snippet:
//! - The third value is the committed height.
//! - The fourth value is the first seven characters of the Base64 encoding of the resulting state root.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const INIT_GENESIS: &str = "InitGenesis";
pub const BUILD_BLOCK: &str = "BuildBlock";
pub const DELIVER_BLOCK: &str = "DeliverBlock";
pub const COMMIT_BLOCK: &str = "CommitBlock";
pub const DISCARD_CACHE: &str = "DiscardCache";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for InitGenesisEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |init_genesis_event: &InitGenesisEvent| {
            log::info!(
                "{}, {}, {}, {}",
                INIT_GENESIS,
                secs_since_unix_epoch(init_genesis_event.timestamp),
                init_genesis_event.modules.len(),
                first_seven_base64_chars(&init_genesis_event.state_root.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for BuildBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |build_block_event: &BuildBlockEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                BUILD_BLOCK,
                secs_since_unix_epoch(build_block_event.timestamp),
                build_block_event.height,
                build_block_event.tx_count,
                build_block_event.cached
            )
        };
        Box::new(logger)
    }
}

impl Logger for DeliverBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |deliver_block_event: &DeliverBlockEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                DELIVER_BLOCK,
                secs_since_unix_epoch(deliver_block_event.timestamp),
                deliver_block_event.height,
                deliver_block_event.tx_count,
                deliver_block_event.reused_cache
            )
        };
        Box::new(logger)
    }
}

impl Logger for CommitBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |commit_block_event: &CommitBlockEvent| {
            log::info!(
                "{}, {}, {}, {}",
                COMMIT_BLOCK,
                secs_since_unix_epoch(commit_block_event.timestamp),
                commit_block_event.height,
                first_seven_base64_chars(&commit_block_event.state_root.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for DiscardCacheEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |discard_cache_event: &DiscardCacheEvent| {
            log::info!(
                "{}, {}, {}, {}",
                DISCARD_CACHE,
                secs_since_unix_epoch(discard_cache_event.timestamp),
                discard_cache_event.cached_height,
                discard_cache_event.requested_height
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

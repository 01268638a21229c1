//! The coordinator's narrow view of the versioned key-value store.
//!
//! # Pluggable persistence
//!
//! The versioned store is an external collaborator. Library users get to choose how exactly state is
//! persisted and how state roots are derived. The coordinator merely requires that whatever they
//! provide implements the three capabilities described by the traits in [`pluggables`]:
//! 1. Open a mutable state view anchored at a height ([`Store::new_state_at`]).
//! 2. Open a read-only state view at a committed height ([`Store::readonly_state_at`]).
//! 3. Atomically commit a [`ChangeSet`](crate::types::change_set::ChangeSet) and return the
//!    resulting [`StateRoot`](crate::types::data_types::StateRoot) ([`Store::commit_state`]).
//!
//! # Branching
//!
//! [`branch::BranchState`] layers writes over any [`ReadonlyState`], without touching it, and turns
//! the writes into a change set. Stores can use it as their [`Store::WritableState`], and the
//! coordinator uses it to give simulations and transaction validation a scratch space over the latest
//! committed state.
//!
//! [`Store::new_state_at`]: pluggables::Store::new_state_at
//! [`Store::readonly_state_at`]: pluggables::Store::readonly_state_at
//! [`Store::commit_state`]: pluggables::Store::commit_state
//! [`Store::WritableState`]: pluggables::Store::WritableState
//! [`ReadonlyState`]: pluggables::ReadonlyState

pub mod branch;

pub mod pluggables;

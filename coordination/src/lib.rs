//! Core of the Claude-hooks coordination layer: a process-agnostic JSON
//! store (KV + claims), project/session identity, an orchestrator gateway,
//! and the five hook subsystems built on top of them (session, trajectory,
//! learning, claim, swarm).
//!
//! This crate carries no process-entry code. Every `fn main` lives in the
//! sibling `hooks-cli` crate, one binary per hook event; this library is
//! the only thing that knows how the store, claims, and gateway actually
//! work, so binaries stay thin argument-parsing shells around it.

#![allow(clippy::uninlined_format_args)]

pub mod claim;
pub mod config;
pub mod error;
pub mod gateway;
pub mod hookio;
pub mod identity;
pub mod learning;
pub mod metrics;
pub mod session;
pub mod store;
pub mod swarm;
pub mod timeutil;
pub mod trajectory;

pub use config::Config;
pub use error::{HookError, HookResult};
pub use store::{ScratchDir, StoreRoot};

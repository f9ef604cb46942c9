//! Worker execution for the colony task engine.
//!
//! A [`Worker`] pulls parts from the task it is bound to, walks to each
//! usable cell through its [`Navigator`](colony_world::Navigator) and digs
//! or places there. Task work competes with other behaviours through a
//! priority [`BehaviourSelector`]; a higher-priority behaviour suspends the
//! task without giving up the binding or the held part.
//!
//! # Modules
//!
//! - [`worker`] -- [`Worker`] state machine and [`WorkContext`].
//! - [`behaviour`] -- [`Behaviour`] priorities and the selector.
//! - [`control`] -- Multi-tick dig and place actions.
//! - [`config`] -- [`WorkerConfig`].

pub mod behaviour;
pub mod config;
pub mod control;
pub mod worker;

// Re-export primary types at crate root.
pub use behaviour::{Behaviour, BehaviourSelector, Conditions, Transition};
pub use config::WorkerConfig;
pub use control::{ActionControl, ControlStatus};
pub use worker::{WorkContext, Worker};

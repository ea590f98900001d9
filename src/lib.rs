//! Aligns free-text scenario steps onto a recorded scene/action graph.
//!
//! Scene steps are ranked against every recorded scene, action steps against
//! the actions leaving the current scene; an arbiter picks among the top
//! candidates and a bounded rollback retries earlier steps when an action
//! cannot be matched.

pub mod arbiter;
pub mod cli;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod graph;
pub mod index;
pub mod rank;
pub mod retry;
pub mod scenario;
pub mod trace;

//! Turning an agent's code reference into something that answers `state -> action`.
//!
//! The core never interprets [`CodeRef`](crate::agent::CodeRef) itself: an
//! [`AgentRuntime`] is injected into the [`Arena`](crate::server::Arena) and
//! opens one [`AgentSession`] per agent per match.
//!
//! Two runtimes ship with the crate:
//! - [`InProcessRuntime`]: policies registered in the current process, keyed by code reference.
//! - [`ProcessRuntime`]: the code reference is the path of an executable, spoken to over TCP.

use std::time::Instant;

use crate::agent::Agent;
use crate::game_interface::GameKind;
use crate::model::FaultKind;

mod client_handler;
mod in_process;

pub use client_handler::ProcessRuntime;
pub use in_process::{InProcessRuntime, Policy};

/// Why an agent failed to produce a usable action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentFault {
    #[error("no action before the deadline")]
    Timeout,
    #[error("agent crashed: {0}")]
    Crashed(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl AgentFault {
    /// Fault kind recorded on the match.
    pub fn kind(&self) -> FaultKind {
        match self {
            AgentFault::Timeout => FaultKind::ExecutionTimeout,
            AgentFault::Crashed(_) => FaultKind::Crashed,
            AgentFault::Malformed(_) => FaultKind::InvalidMove,
        }
    }
}

/// Capability to start agents.
pub trait AgentRuntime: Send + Sync {
    /// Starts `agent` for one match of `game`.
    ///
    /// # Errors
    /// Any launch problem. The caller retries and eventually forfeits the agent.
    fn launch(&self, agent: &Agent, game: GameKind) -> anyhow::Result<Box<dyn AgentSession>>;
}

/// A live agent for the duration of one match. Dropping it stops the agent.
pub trait AgentSession: Send {
    /// Sends `state` and waits for the agent's action until `deadline`.
    fn select_action(&mut self, state: &str, deadline: Instant) -> Result<String, AgentFault>;
}

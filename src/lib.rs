//! # Agent Arena
//!
//! Orchestration core for competitions between programmatic agents playing
//! two-player games (Connect-4, Tic-Tac-Toe, Rock-Paper-Scissors).
//!
//! It provides:
//! - Knockout tournaments advanced one round at a time, with byes for odd fields
//! - Round-robin runs where every pair of eligible agents plays once
//! - One-off contests between two agents, re-runnable
//! - A match executor driving agents through a game with per-action and per-match timeouts
//! - Standings recomputed from stored results, and replayable action histories
//!
//! Agents are either separate OS processes talking over a local TCP socket
//! ([`ProcessRuntime`](crate::agent_runtime::ProcessRuntime)) or in-process policies
//! ([`InProcessRuntime`](crate::agent_runtime::InProcessRuntime)).
//!
//! # Documentation Overview
//!
//! - The operation surface is [`Arena`](crate::server::Arena), see the [`server`] module.
//! - Behavior knobs live in [`Configuration`](crate::configuration::Configuration).
//! - Games implement the [`Game`](crate::game_interface::Game) and
//!   [`GameFactory`](crate::game_interface::GameFactory) traits.
//! - Storage goes through the [`ArenaStore`](crate::store::ArenaStore) port.
//!
//! # Example Agent
//!
//! A process agent receives the port to connect to and the game name as arguments,
//! then answers every state string with an action string:
//!
//! ```no_run
//! use std::{
//!     env,
//!     io::{BufRead, BufReader, Write},
//!     net::{Ipv4Addr, SocketAddrV4, TcpStream},
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut args = env::args().skip(1);
//!     let port = args.next().unwrap_or_default().parse()?;
//!     let _game = args.next();
//!     let mut stream = TcpStream::connect(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))?;
//!
//!     for state in BufReader::new(stream.try_clone()?).lines() {
//!         let _state = state?;
//!         stream.write_all(b"rock\n")?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Agent Requirements
//!
//! - Answer within the action timeout, and finish the match within the match timeout
//! - Communication is done over TCP using a basic protocol:
//!  * Server -> Agent : game state string, ending with a newline
//!  * Agent -> Server : action string, ending with a newline

pub use anyhow;

pub mod agent;
pub mod agent_collector;
pub mod agent_runtime;
pub mod bracket;
pub mod configuration;
pub mod error;
pub mod events;
pub mod game_interface;
pub mod games;
pub mod history;
mod logger;
pub mod match_executor;
pub mod match_pool;
pub mod model;
pub mod registry;
pub mod round_robin;
pub mod server;
pub mod standings;
pub mod store;

/// Commonly used types and traits for quick access.
///
/// ```rust
/// use agent_arena::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agent::{Agent, AgentId, ContestId, GroupId, MatchId, RoundId, TournamentId};
    pub use crate::agent_collector::FsDirectory;
    pub use crate::agent_runtime::{AgentRuntime, InProcessRuntime, Policy, ProcessRuntime};
    pub use crate::bracket::Seeding;
    pub use crate::configuration::Configuration;
    pub use crate::error::{ArenaError, ArenaResult, ErrorKind};
    pub use crate::events::ArenaEvent;
    pub use crate::game_interface::{Game, GameFactory, GameKind};
    pub use crate::match_pool::CancelToken;
    pub use crate::registry::{AgentDirectory, StaticDirectory};
    pub use crate::server::{Advance, Arena, ContestPairing};
    pub use crate::standings::ScoringScheme;
    pub use crate::store::{ArenaStore, InMemoryStore};
}

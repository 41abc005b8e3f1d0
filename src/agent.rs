//! Identifiers and the agent/group records handed to the core by the directory.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::game_interface::GameKind;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $prefix, self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a registered agent.
    AgentId,
    "agent"
);
id_type!(
    /// Identifier of a group owning agents.
    GroupId,
    "group"
);
id_type!(
    /// Identifier of a tournament.
    TournamentId,
    "tournament"
);
id_type!(
    /// Identifier of a tournament round.
    RoundId,
    "round"
);
id_type!(
    /// Identifier of a match (tournament match or contest run).
    MatchId,
    "match"
);
id_type!(
    /// Identifier of a one-off contest.
    ContestId,
    "contest"
);

/// Opaque reference to an agent's executable code. Only the agent runtime interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeRef(pub String);

impl CodeRef {
    pub fn new(s: impl Into<String>) -> Self {
        CodeRef(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A group owning zero or more agents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// A registered agent. Immutable once registered.
///
/// Two agents are equal when their ids are equal; the remaining fields are a
/// snapshot of the directory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub group: Group,
    pub game: GameKind,
    pub code: CodeRef,
}

impl PartialEq for Agent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Agent {}

impl std::hash::Hash for Agent {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Agent {
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        group: Group,
        game: GameKind,
        code: CodeRef,
    ) -> Agent {
        Agent {
            id,
            name: name.into(),
            group,
            game,
            code,
        }
    }

    /// `"group/name"`, used in log lines and match labels.
    pub fn label(&self) -> String {
        format!("{}/{}", self.group.name, self.name)
    }
}

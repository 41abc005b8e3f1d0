//! Read-only lookup of agents and groups.
//!
//! The arena never registers agents itself; it asks an [`AgentDirectory`] for the
//! eligible agents of a game every time a tournament, round-robin or contest starts.

use std::collections::BTreeMap;

use crate::agent::{Agent, AgentId, CodeRef, Group, GroupId};
use crate::error::{ArenaError, ArenaResult};
use crate::game_interface::GameKind;

/// Source of agent and group metadata.
pub trait AgentDirectory: Send + Sync {
    /// Agents registered for `game`, in registration order.
    fn list_agents(&self, game: GameKind) -> ArenaResult<Vec<Agent>>;

    /// Group `id`, `None` when unknown.
    fn get_group(&self, id: GroupId) -> ArenaResult<Option<Group>>;

    /// Agent `id` of `game`.
    fn get_agent(&self, game: GameKind, id: AgentId) -> ArenaResult<Agent> {
        self.list_agents(game)?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ArenaError::NotFound(id.to_string()))
    }
}

/// Directory built in code. Agents get increasing ids in registration order.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    groups: BTreeMap<GroupId, Group>,
    agents: Vec<Agent>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group and returns its id.
    pub fn add_group(&mut self, name: impl Into<String>) -> GroupId {
        let id = GroupId(self.groups.len() as u64 + 1);
        self.groups.insert(
            id,
            Group {
                id,
                name: name.into(),
            },
        );
        id
    }

    /// Adds an agent to an existing group and returns its id.
    ///
    /// # Errors
    /// [`ArenaError::NotFound`] when `group` was never added.
    pub fn add_agent(
        &mut self,
        group: GroupId,
        name: impl Into<String>,
        game: GameKind,
        code: impl Into<String>,
    ) -> ArenaResult<AgentId> {
        let group = self
            .groups
            .get(&group)
            .cloned()
            .ok_or_else(|| ArenaError::NotFound(group.to_string()))?;
        let id = AgentId(self.agents.len() as u64 + 1);
        self.agents
            .push(Agent::new(id, name, group, game, CodeRef::new(code)));
        Ok(id)
    }

    /// Adds an already built agent, keeping its id. Its group is registered too.
    pub fn insert(&mut self, agent: Agent) {
        self.groups
            .entry(agent.group.id)
            .or_insert_with(|| agent.group.clone());
        self.agents.push(agent);
    }
}

impl AgentDirectory for StaticDirectory {
    fn list_agents(&self, game: GameKind) -> ArenaResult<Vec<Agent>> {
        Ok(self
            .agents
            .iter()
            .filter(|a| a.game == game)
            .cloned()
            .collect())
    }

    fn get_group(&self, id: GroupId) -> ArenaResult<Option<Group>> {
        Ok(self.groups.get(&id).cloned())
    }
}

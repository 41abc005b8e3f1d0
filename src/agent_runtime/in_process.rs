use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use anyhow::anyhow;
use tracing::{instrument, warn};

use super::{AgentFault, AgentRuntime, AgentSession};
use crate::agent::Agent;
use crate::game_interface::GameKind;

/// Decision logic of an in-process agent.
pub trait Policy: Send {
    /// Returns the action for `state`. An `Err` is treated as a crash.
    fn select_action(&mut self, state: &str) -> Result<String, String>;
}

impl<F> Policy for F
where
    F: FnMut(&str) -> Result<String, String> + Send,
{
    fn select_action(&mut self, state: &str) -> Result<String, String> {
        self(state)
    }
}

type PolicyFactory = Arc<dyn Fn(GameKind) -> Box<dyn Policy> + Send + Sync>;

/// Runs agents as policies registered under their code reference.
///
/// A fresh policy is built for every match, so policies may keep per-match state.
#[derive(Default, Clone)]
pub struct InProcessRuntime {
    policies: Arc<RwLock<HashMap<String, PolicyFactory>>>,
}

impl InProcessRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the policy built by `factory` for agents whose code reference is `code`.
    pub fn register<F>(&self, code: impl Into<String>, factory: F)
    where
        F: Fn(GameKind) -> Box<dyn Policy> + Send + Sync + 'static,
    {
        let mut policies = match self.policies.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        policies.insert(code.into(), Arc::new(factory));
    }

    /// Builder flavor of [`register`](Self::register).
    pub fn with_policy<F>(self, code: impl Into<String>, factory: F) -> Self
    where
        F: Fn(GameKind) -> Box<dyn Policy> + Send + Sync + 'static,
    {
        self.register(code, factory);
        self
    }
}

impl std::fmt::Debug for InProcessRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self
            .policies
            .read()
            .map(|p| {
                let mut names: Vec<_> = p.keys().cloned().collect();
                names.sort();
                names
            })
            .unwrap_or_default();
        f.debug_struct("InProcessRuntime")
            .field("policies", &names)
            .finish()
    }
}

impl AgentRuntime for InProcessRuntime {
    #[instrument(skip_all, fields(agent = %agent.id, code = agent.code.as_str()))]
    fn launch(&self, agent: &Agent, game: GameKind) -> anyhow::Result<Box<dyn AgentSession>> {
        let factory = self
            .policies
            .read()
            .map_err(|_| anyhow!("policy table poisoned"))?
            .get(agent.code.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("no policy registered for '{}'", agent.code.as_str()))?;
        let policy = catch_unwind(AssertUnwindSafe(|| factory(game)))
            .map_err(|_| anyhow!("policy constructor panicked"))?;
        Ok(Box::new(InProcessSession { policy }))
    }
}

struct InProcessSession {
    policy: Box<dyn Policy>,
}

impl AgentSession for InProcessSession {
    fn select_action(&mut self, state: &str, deadline: Instant) -> Result<String, AgentFault> {
        let policy = &mut self.policy;
        let answer = catch_unwind(AssertUnwindSafe(|| policy.select_action(state)))
            .map_err(|_| AgentFault::Crashed("policy panicked".into()))?
            .map_err(AgentFault::Crashed)?;
        if Instant::now() > deadline {
            warn!("in-process policy answered after its deadline");
            return Err(AgentFault::Timeout);
        }
        Ok(answer)
    }
}

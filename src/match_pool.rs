//! Concurrent execution of a batch of independent matches.
//!
//! Every match runs on its own thread, at most `max_parallel_matches` at a time.
//! Results come back through a channel; a watchdog forfeits matches that run past
//! their match timeout and ignores whatever they report afterwards.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, trace, warn};

use crate::agent_runtime::AgentRuntime;
use crate::configuration::Configuration;
use crate::game_interface::GameFactory;
use crate::match_executor::{run_match, MatchOutcome, MatchProgress, MatchSettings};

/// Shared flag asking a batch to stop issuing new matches.
///
/// Matches already running are allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Finished batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Played matches in submission order. Matches never started are absent.
    pub played: Vec<(MatchSettings, MatchOutcome)>,
    /// The batch was cancelled before every match was started.
    pub cancelled: bool,
}

struct Running {
    settings: MatchSettings,
    progress: Arc<MatchProgress>,
    started: Instant,
}

/// Runs batches of matches with bounded parallelism.
#[derive(Clone)]
pub struct MatchPool {
    config: Configuration,
    runtime: Arc<dyn AgentRuntime>,
    games: Arc<dyn GameFactory>,
}

impl MatchPool {
    /// Extra time given to a match past its own timeout before the watchdog steps in.
    const WATCHDOG_GRACE: Duration = Duration::from_millis(500);
    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    pub fn new(
        config: Configuration,
        runtime: Arc<dyn AgentRuntime>,
        games: Arc<dyn GameFactory>,
    ) -> Self {
        MatchPool {
            config,
            runtime,
            games,
        }
    }

    /// Runs `batch` and waits for every started match.
    #[instrument(skip_all, fields(matches = batch.len()))]
    pub fn run(&self, batch: Vec<MatchSettings>, cancel: &CancelToken) -> BatchResult {
        let mut pending: VecDeque<(usize, MatchSettings)> = batch.into_iter().enumerate().collect();
        let mut running: HashMap<usize, Running> = HashMap::new();
        let mut played: Vec<(usize, MatchSettings, MatchOutcome)> = vec![];
        let (tx_result, rx_result) = mpsc::channel();
        let mut cancelled = false;

        loop {
            if !pending.is_empty() && cancel.is_cancelled() {
                info!(skipped = pending.len(), "batch cancelled");
                pending.clear();
                cancelled = true;
            }
            while running.len() < self.config.max_parallel_matches {
                let Some((index, settings)) = pending.pop_front() else {
                    break;
                };
                let progress = self.launch_match(index, settings.clone(), tx_result.clone());
                running.insert(
                    index,
                    Running {
                        settings,
                        progress,
                        started: Instant::now(),
                    },
                );
                if self.config.verbose {
                    print_running_matches(&running);
                }
            }

            if running.is_empty() {
                break;
            }

            match rx_result.recv_timeout(Self::POLL_INTERVAL) {
                Ok((index, outcome)) => {
                    let Some(finished) = running.remove(&index) else {
                        warn!(index, "result of a match already settled by the watchdog");
                        continue;
                    };
                    if self.config.verbose {
                        print_outcome(&finished.settings, &outcome);
                    }
                    played.push((index, finished.settings, outcome));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    error!("all match threads hung up");
                    break;
                }
            }

            self.check_timeouts(&mut running, &mut played);
        }

        played.sort_by_key(|(index, _, _)| *index);
        BatchResult {
            played: played.into_iter().map(|(_, s, o)| (s, o)).collect(),
            cancelled,
        }
    }

    fn check_timeouts(
        &self,
        running: &mut HashMap<usize, Running>,
        played: &mut Vec<(usize, MatchSettings, MatchOutcome)>,
    ) {
        let limit = self.config.match_timeout + Self::WATCHDOG_GRACE;
        let expired: Vec<usize> = running
            .iter()
            .filter(|(_, r)| r.started.elapsed() > limit)
            .map(|(index, _)| *index)
            .collect();
        for index in expired {
            if let Some(r) = running.remove(&index) {
                warn!(match_id = %r.settings.match_id, "match timeout, forfeiting agent on move");
                let outcome = MatchOutcome::timed_out(&r.settings, &r.progress);
                if self.config.verbose {
                    print_outcome(&r.settings, &outcome);
                }
                played.push((index, r.settings, outcome));
            }
        }
    }

    fn launch_match(
        &self,
        index: usize,
        settings: MatchSettings,
        tx_result: Sender<(usize, MatchOutcome)>,
    ) -> Arc<MatchProgress> {
        let progress = MatchProgress::new();
        let shared = progress.clone();
        let config = self.config;
        let runtime = self.runtime.clone();
        let games = self.games.clone();
        trace!(match_id = %settings.match_id, "launching match");

        std::thread::spawn(move || {
            let outcome = run_match(&settings, &config, runtime.as_ref(), games.as_ref(), &shared);
            // receiver is gone once the batch gave up on this match
            let _ = tx_result.send((index, outcome));
        });
        progress
    }
}

fn print_outcome(settings: &MatchSettings, outcome: &MatchOutcome) {
    let faults = outcome
        .metadata
        .faults
        .iter()
        .map(|f| f.detail.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    // clear line, green match, results, red errors, start of line
    println!(
        "\x1b[2K\x1b[32m{settings}: \x1b[39m{}-{} \x1b[31m{faults}\x1b[39m\x1b[0G",
        outcome.agent1_score, outcome.agent2_score
    );
}

fn print_running_matches(running: &HashMap<usize, Running>) {
    let mut names: Vec<_> = running.iter().collect();
    names.sort_by_key(|(index, _)| **index);
    // clear, green, default, start of line
    print!(
        "\x1b[2K\x1b[32mRunning...:\x1b[39m {}\x1b[0G",
        names
            .iter()
            .map(|(_, r)| r.settings.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, AgentId, CodeRef, Group, GroupId, MatchId};
    use crate::agent_runtime::{InProcessRuntime, Policy};
    use crate::game_interface::GameKind;
    use crate::games::StandardGames;
    use crate::model::{FaultKind, MatchResult};

    fn agent(id: u64, code: &str) -> Agent {
        Agent::new(
            AgentId(id),
            format!("{code}{id}"),
            Group {
                id: GroupId(id),
                name: format!("g{id}"),
            },
            GameKind::RockPaperScissors,
            CodeRef::new(code),
        )
    }

    fn constant(answer: &'static str) -> impl Fn(GameKind) -> Box<dyn Policy> {
        move |_| -> Box<dyn Policy> {
            Box::new(move |_: &str| -> Result<String, String> { Ok(answer.to_string()) })
        }
    }

    fn pool(config: Configuration, runtime: InProcessRuntime) -> MatchPool {
        MatchPool::new(
            config,
            Arc::new(runtime),
            Arc::new(StandardGames::new(&config)),
        )
    }

    fn batch(pairs: &[(&str, &str)]) -> Vec<MatchSettings> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (a, b))| MatchSettings {
                match_id: MatchId(i as u64 + 1),
                game: GameKind::RockPaperScissors,
                agent1: agent(2 * i as u64 + 1, a),
                agent2: agent(2 * i as u64 + 2, b),
            })
            .collect()
    }

    #[test]
    fn results_keep_submission_order() {
        let runtime = InProcessRuntime::new()
            .with_policy("rock", constant("rock"))
            .with_policy("paper", constant("paper"));
        let config = Configuration::new().with_max_parallel_matches(2);
        let result = pool(config, runtime).run(
            batch(&[("rock", "paper"), ("paper", "rock"), ("rock", "rock")]),
            &CancelToken::new(),
        );
        assert!(!result.cancelled);
        let ids: Vec<_> = result.played.iter().map(|(s, _)| s.match_id.0).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(result.played[0].1.result, MatchResult::Loss);
        assert_eq!(result.played[1].1.result, MatchResult::Win);
        assert_eq!(result.played[2].1.result, MatchResult::Draw);
    }

    #[test]
    fn cancelled_before_start_runs_nothing() {
        let runtime = InProcessRuntime::new().with_policy("rock", constant("rock"));
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = pool(Configuration::new(), runtime).run(batch(&[("rock", "rock")]), &cancel);
        assert!(result.cancelled);
        assert!(result.played.is_empty());
    }

    #[test]
    fn watchdog_forfeits_stuck_match() {
        let runtime = InProcessRuntime::new()
            .with_policy("rock", constant("rock"))
            .with_policy("stuck", |_| {
                Box::new(|_: &str| -> Result<String, String> {
                    std::thread::sleep(Duration::from_secs(3));
                    Ok("rock".into())
                })
            });
        let config = Configuration::new()
            .with_match_timeout(Duration::from_millis(100))
            .with_action_timeout(Duration::from_secs(10));
        let started = Instant::now();
        let result = pool(config, runtime).run(batch(&[("rock", "stuck")]), &CancelToken::new());
        assert!(started.elapsed() < Duration::from_secs(2));
        let (_, outcome) = &result.played[0];
        assert_eq!(outcome.winner, Some(AgentId(1)));
        assert_eq!(outcome.actions.len(), 1);
        assert!(outcome.metadata.incomplete_round);
        assert_eq!(outcome.metadata.faults[0].kind, FaultKind::ExecutionTimeout);
    }
}

//! Config for the arena behaviors
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! All values are optional. Flags are case-insensitive, set them to `"true"` to enable.
//! Numbers that fail to parse fall back to their default.
//!
//! - `ARENA_VERBOSE` — Print match progress to stdout (default: `false`)
//! - `ARENA_LOG` — Enable logging to a file (default: `false`)
//! - `ARENA_MAX_PARALLEL_MATCHES` — Matches run at the same time (default: physical CPU count)
//! - `ARENA_ACTION_TIMEOUT_MS` — Time allowed for a single action (default: `1000`)
//! - `ARENA_MATCH_TIMEOUT_SECS` — Time allowed for a whole match (default: `60`)
//! - `ARENA_MAX_MOVES` — Move cap for a match, reaching it ends the game (default: `200`)
//! - `ARENA_RPS_TARGET_WINS` — Round wins needed to take a rock-paper-scissors match (default: `2`)
//! - `ARENA_RPS_MAX_ROUNDS` — Round cap for rock-paper-scissors (default: `9`)
//! - `ARENA_LAUNCH_RETRIES` — Extra attempts when an agent cannot be started (default: `1`)
//! - `ARENA_PERSIST_ROUND_ROBIN` — Store round-robin runs as tournaments (default: `true`)
//! - `ARENA_WIN_POINTS`, `ARENA_DRAW_POINTS`, `ARENA_LOSS_POINTS` — Default scoring (2/1/0)
//! - `ARENA_DEBUG_AGENT_STDERR` — Let agent processes write to stderr (default: `false`)

use std::time::Duration;

use crate::standings::ScoringScheme;

/// Configuration for arena behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub(crate) verbose: bool,
    pub(crate) log: bool,
    pub(crate) max_parallel_matches: usize,
    pub(crate) action_timeout: Duration,
    pub(crate) match_timeout: Duration,
    pub(crate) max_moves: u32,
    pub(crate) rps_target_wins: u32,
    pub(crate) rps_max_rounds: u32,
    pub(crate) launch_retries: u32,
    pub(crate) persist_round_robin: bool,
    pub(crate) scoring: ScoringScheme,
    pub(crate) debug_agent_stderr: bool,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - Nothing is printed to stdout and logging to file is disabled.
    /// - As many matches as physical CPUs run concurrently.
    /// - Agents get one second per action and a minute per match.
    /// - Games stop after 200 moves; rock-paper-scissors is best of three, nine rounds at most.
    /// - A failed agent launch is retried once.
    /// - Round-robin runs are persisted.
    /// - Scoring is 2 points per win, 1 per draw, 0 per loss.
    pub fn new() -> Self {
        Self {
            verbose: false,
            log: false,
            max_parallel_matches: num_cpus::get_physical().max(1),
            action_timeout: Duration::from_millis(1000),
            match_timeout: Duration::from_secs(60),
            max_moves: 200,
            rps_target_wins: 2,
            rps_max_rounds: 9,
            launch_retries: 1,
            persist_round_robin: true,
            scoring: ScoringScheme::default(),
            debug_agent_stderr: false,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the recognized variables. Any other value
    /// (including unset) results in the default value for each field.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        fn get_env_number<T: std::str::FromStr>(var: &str, default: T) -> T {
            std::env::var(var)
                .ok()
                .and_then(|val| val.trim().parse().ok())
                .unwrap_or(default)
        }

        let defaults = Self::new();
        Self {
            verbose: get_env_flag("ARENA_VERBOSE", defaults.verbose),
            log: get_env_flag("ARENA_LOG", defaults.log),
            max_parallel_matches: get_env_number(
                "ARENA_MAX_PARALLEL_MATCHES",
                defaults.max_parallel_matches,
            )
            .max(1),
            action_timeout: Duration::from_millis(get_env_number(
                "ARENA_ACTION_TIMEOUT_MS",
                defaults.action_timeout.as_millis() as u64,
            )),
            match_timeout: Duration::from_secs(get_env_number(
                "ARENA_MATCH_TIMEOUT_SECS",
                defaults.match_timeout.as_secs(),
            )),
            max_moves: get_env_number("ARENA_MAX_MOVES", defaults.max_moves),
            rps_target_wins: get_env_number("ARENA_RPS_TARGET_WINS", defaults.rps_target_wins),
            rps_max_rounds: get_env_number("ARENA_RPS_MAX_ROUNDS", defaults.rps_max_rounds),
            launch_retries: get_env_number("ARENA_LAUNCH_RETRIES", defaults.launch_retries),
            persist_round_robin: get_env_flag(
                "ARENA_PERSIST_ROUND_ROBIN",
                defaults.persist_round_robin,
            ),
            scoring: ScoringScheme {
                win: get_env_number("ARENA_WIN_POINTS", defaults.scoring.win),
                draw: get_env_number("ARENA_DRAW_POINTS", defaults.scoring.draw),
                loss: get_env_number("ARENA_LOSS_POINTS", defaults.scoring.loss),
            },
            debug_agent_stderr: get_env_flag(
                "ARENA_DEBUG_AGENT_STDERR",
                defaults.debug_agent_stderr,
            ),
        }
    }

    /// Enable or disable progress output on stdout.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Number of matches allowed to run at the same time (at least one).
    pub fn with_max_parallel_matches(mut self, value: usize) -> Self {
        self.max_parallel_matches = value.max(1);
        self
    }

    /// Maximum duration allowed for a single action.
    pub fn with_action_timeout(mut self, value: Duration) -> Self {
        self.action_timeout = value;
        self
    }

    /// Maximum duration of a whole match. When exceeded, the agent on move loses.
    pub fn with_match_timeout(mut self, value: Duration) -> Self {
        self.match_timeout = value;
        self
    }

    /// Number of recorded actions after which a game is stopped.
    pub fn with_max_moves(mut self, value: u32) -> Self {
        self.max_moves = value;
        self
    }

    /// Round wins needed to take a rock-paper-scissors match.
    pub fn with_rps_target_wins(mut self, value: u32) -> Self {
        self.rps_target_wins = value.max(1);
        self
    }

    /// Maximum number of rock-paper-scissors rounds.
    pub fn with_rps_max_rounds(mut self, value: u32) -> Self {
        self.rps_max_rounds = value.max(1);
        self
    }

    /// Extra attempts when an agent cannot be started.
    pub fn with_launch_retries(mut self, value: u32) -> Self {
        self.launch_retries = value;
        self
    }

    /// Persist round-robin runs as `round_robin` tournaments.
    pub fn with_persist_round_robin(mut self, value: bool) -> Self {
        self.persist_round_robin = value;
        self
    }

    /// Default scoring scheme for new tournaments and round-robin runs.
    pub fn with_scoring(mut self, value: ScoringScheme) -> Self {
        self.scoring = value;
        self
    }

    /// Enable or disable agent stderr output (debug purposes only).
    pub fn with_debug_agent_stderr(mut self, value: bool) -> Self {
        self.debug_agent_stderr = value;
        self
    }

    /// Scoring scheme used when none is given explicitly.
    pub fn scoring(&self) -> ScoringScheme {
        self.scoring
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

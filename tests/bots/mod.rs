//! In-process bots and arena builders shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use agent_arena::prelude::*;
use tracing::{Level, Metadata};
use tracing_subscriber::{
    fmt,
    layer::{Context, Filter, SubscriberExt},
    Layer, Registry,
};

struct WarnAndAbove;
impl<S> Filter<S> for WarnAndAbove {
    fn enabled(&self, meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        meta.level() <= &Level::WARN
    }
}

/// Prints warnings of the crate while a test runs. Safe to call from every test.
pub fn init_test_logger() {
    let format = fmt::format()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_thread_names(true)
        .with_target(false);
    let reg = Registry::default().with(
        fmt::layer()
            .with_test_writer()
            .event_format(format)
            .with_filter(WarnAndAbove),
    );
    let _ = tracing::subscriber::set_global_default(reg);
}

fn constant(answer: &'static str) -> impl Fn(GameKind) -> Box<dyn Policy> {
    move |_| -> Box<dyn Policy> {
        Box::new(move |_: &str| -> Result<String, String> { Ok(answer.to_string()) })
    }
}

/// Plays the first free cell of a tic-tac-toe board.
fn first_free_cell(state: &str) -> Result<String, String> {
    let (_, cells) = state.split_once(';').ok_or("no board")?;
    cells
        .chars()
        .position(|c| c == '.')
        .map(|i| i.to_string())
        .ok_or_else(|| "board full".to_string())
}

/// Drops into the leftmost column that is not full.
fn leftmost_column(state: &str) -> Result<String, String> {
    let board = state.rsplit(';').next().ok_or("no board")?;
    let top = board.split('/').next().ok_or("no rows")?;
    top.chars()
        .position(|c| c == '.')
        .map(|i| i.to_string())
        .ok_or_else(|| "board full".to_string())
}

/// Runtime knowing every bot used by the tests, by code reference:
///
/// - `rock`, `paper`, `scissors`: constant rock-paper-scissors players
/// - `garbage`: answers something no game accepts
/// - `first-free`: first free tic-tac-toe cell
/// - `leftmost`: leftmost open Connect-4 column
/// - `slow`: answers `rock` after 150ms
/// - `panics`: panics on its first action
pub fn runtime() -> InProcessRuntime {
    InProcessRuntime::new()
        .with_policy("rock", constant("rock"))
        .with_policy("paper", constant("paper"))
        .with_policy("scissors", constant("scissors"))
        .with_policy("garbage", constant("lizard"))
        .with_policy("first-free", |_| -> Box<dyn Policy> { Box::new(first_free_cell) })
        .with_policy("leftmost", |_| -> Box<dyn Policy> { Box::new(leftmost_column) })
        .with_policy("slow", |_| -> Box<dyn Policy> {
            Box::new(|_: &str| -> Result<String, String> {
                std::thread::sleep(Duration::from_millis(150));
                Ok("rock".to_string())
            })
        })
        .with_policy("panics", |_| -> Box<dyn Policy> {
            Box::new(|_: &str| -> Result<String, String> { panic!("bot exploded") })
        })
}

pub fn config() -> Configuration {
    Configuration::new()
        .with_verbose(false)
        .with_log(false)
        .with_max_parallel_matches(4)
        .with_action_timeout(Duration::from_secs(2))
        .with_match_timeout(Duration::from_secs(10))
}

/// One agent per `(group, code)` entry, all playing `game`, one group per distinct name.
pub fn directory(game: GameKind, entries: &[(&str, &str)]) -> (StaticDirectory, Vec<AgentId>) {
    let mut dir = StaticDirectory::new();
    let mut groups: Vec<(String, GroupId)> = vec![];
    let mut ids = vec![];
    for (i, (group, code)) in entries.iter().enumerate() {
        let group_id = match groups.iter().find(|(name, _)| name == group) {
            Some((_, id)) => *id,
            None => {
                let id = dir.add_group(*group);
                groups.push((group.to_string(), id));
                id
            }
        };
        let id = dir
            .add_agent(group_id, format!("{code}-{i}"), game, *code)
            .unwrap();
        ids.push(id);
    }
    (dir, ids)
}

/// `n` agents of distinct groups all playing `code`.
pub fn field(game: GameKind, n: usize, code: &str) -> (StaticDirectory, Vec<AgentId>) {
    let groups: Vec<String> = (0..n).map(|i| format!("group-{i}")).collect();
    let entries: Vec<(&str, &str)> = groups.iter().map(|g| (g.as_str(), code)).collect();
    directory(game, &entries)
}

pub fn arena(dir: StaticDirectory, store: Arc<InMemoryStore>, config: Configuration) -> Arena {
    init_test_logger();
    Arena::new(Arc::new(dir), Arc::new(runtime()), store, config)
}

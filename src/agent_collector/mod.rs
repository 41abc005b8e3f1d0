//! Agent directory read from the filesystem.
//!
//! Expected layout:
//!
//! ```text
//! <root>/<game>/<group>/<agent executable>
//! ```
//!
//! `<game>` is one of `conn4`, `tictactoe` or `rps` (aliases accepted). Every
//! executable file of a group directory is an agent named after the file. Groups
//! with the same directory name share one group id across games. Entries are
//! visited in name order, so ids are stable between two scans of the same tree.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tracing::{info, instrument, warn};

use crate::agent::{Agent, AgentId, CodeRef, Group, GroupId};
use crate::configuration::Configuration;
use crate::error::{ArenaError, ArenaResult};
use crate::game_interface::GameKind;
use crate::registry::{AgentDirectory, StaticDirectory};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Directory of agent executables found under a root path.
#[derive(Debug, Clone)]
pub struct FsDirectory {
    root: PathBuf,
    inner: StaticDirectory,
}

impl FsDirectory {
    /// Scans `root` once. Unreadable or unexpected entries are skipped with a warning.
    ///
    /// # Errors
    /// `root` is not a readable directory.
    #[instrument(skip(config))]
    pub fn scan(
        root: impl AsRef<Path> + std::fmt::Debug,
        config: Configuration,
    ) -> anyhow::Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            bail!("'{root:?}' is not a valid directory");
        }
        let verbose = config.verbose;
        if verbose {
            println!("Collecting agents...");
        }

        let mut inner = StaticDirectory::new();
        let mut groups: BTreeMap<String, GroupId> = BTreeMap::new();
        let mut next_agent = 1;

        for game_dir in sorted_entries(root)? {
            let name = file_name(&game_dir);
            if !game_dir.is_dir() {
                warn!("Not a directory: '{name}'");
                continue;
            }
            let Ok(game) = name.parse::<GameKind>() else {
                warn!("Unknown game directory: '{name}'");
                if verbose {
                    println!("{RED}Unknown game '{name}'{RESET}");
                }
                continue;
            };

            for group_dir in sorted_entries(&game_dir)? {
                let group_name = file_name(&group_dir);
                if !group_dir.is_dir() {
                    warn!("Not a directory: '{group_name}'");
                    continue;
                }
                let group = *groups
                    .entry(group_name.clone())
                    .or_insert_with(|| inner.add_group(group_name.clone()));

                for exe in sorted_entries(&group_dir)? {
                    let agent_name = file_name(&exe);
                    if verbose {
                        print!("Collecting {game}/{group_name}/{agent_name} ");
                        let _ = std::io::stdout().flush(); // try to flush stdout
                    }
                    if let Err(e) = check_executable(&exe) {
                        warn!("skipping '{}': {e}", exe.display());
                        if verbose {
                            println!("{RED}{e}{RESET}");
                        }
                        continue;
                    }
                    let Some(group) = inner.get_group(group).ok().flatten() else {
                        continue;
                    };
                    inner.insert(Agent::new(
                        AgentId(next_agent),
                        agent_name,
                        group,
                        game,
                        CodeRef::new(exe.to_string_lossy()),
                    ));
                    next_agent += 1;
                    if verbose {
                        println!("{GREEN}Ok{RESET}");
                    }
                }
            }
        }
        info!(agents = next_agent - 1, "agent directory scanned");

        Ok(FsDirectory {
            root: root.to_path_buf(),
            inner,
        })
    }

    /// Root the directory was scanned from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AgentDirectory for FsDirectory {
    fn list_agents(&self, game: GameKind) -> ArenaResult<Vec<Agent>> {
        self.inner.list_agents(game)
    }

    fn get_group(&self, id: GroupId) -> ArenaResult<Option<Group>> {
        self.inner.get_group(id)
    }
}

fn sorted_entries(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read '{}'", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| !file_name(path).starts_with('.'))
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn check_executable(path: &Path) -> anyhow::Result<()> {
    let metadata = path.metadata().context("cannot read metadata")?;
    if !metadata.is_file() {
        bail!("not a file");
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            bail!("not executable");
        }
    }
    Ok(())
}

/// Maps a failed scan to the directory error kind.
pub fn scan_error(err: anyhow::Error) -> ArenaError {
    ArenaError::directory(format!("{err:#}"))
}

use std::sync::Arc;

use anyhow::{anyhow, bail};

use agent_arena::prelude::*;

const USAGE: &str = "usage: arena <agents-dir> <game> [knockout|round-robin]";

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(root), Some(game)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };
    let game: GameKind = game.parse().map_err(|e| anyhow!("{e}\n{USAGE}"))?;
    let mode = args.next().unwrap_or_else(|| "knockout".to_string());

    let config = Configuration::from_env();
    let directory = FsDirectory::scan(&root, config)?;
    let arena = Arena::new(
        Arc::new(directory),
        Arc::new(ProcessRuntime::new(&config)),
        Arc::new(InMemoryStore::new()),
        config,
    );

    match mode.as_str() {
        "knockout" => {
            let id = arena.create_tournament(game)?;
            while let Advance::Round(round) = arena.advance_round(id)? {
                println!("{round} played");
            }
            let detail = arena.get_tournament(id)?;
            for entry in &detail.standings {
                println!(
                    "{:>4} pts  {} ({})",
                    entry.points, entry.agent_name, entry.group_name
                );
            }
            match detail.tournament.winner {
                Some(winner) => println!("winner: {winner}"),
                None => println!("no winner"),
            }
        }
        "round-robin" => {
            let report = arena.run_round_robin(game)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        other => bail!("unknown mode '{other}'\n{USAGE}"),
    }
    Ok(())
}

use std::sync::Arc;
use std::time::Duration;

use agent_arena::model::{
    Match, MatchMetadata, MatchResult, MatchStatus, Round, Tournament, TournamentKind,
    TournamentStatus,
};
use agent_arena::prelude::*;
use agent_arena::store::{EntityKind, RoundCommit};
use time::OffsetDateTime;

mod bots;

fn play_out(arena: &Arena, id: TournamentId) -> usize {
    let mut rounds = 0;
    while let Advance::Round(_) = arena.advance_round(id).unwrap() {
        rounds += 1;
        assert!(rounds <= 10, "tournament does not converge");
    }
    rounds
}

#[test]
fn round_count_is_log2_of_field() {
    for n in 1..=9usize {
        let (dir, _) = bots::field(GameKind::RockPaperScissors, n, "rock");
        let arena = bots::arena(dir, Arc::new(InMemoryStore::new()), bots::config());
        let id = arena.create_tournament(GameKind::RockPaperScissors).unwrap();

        let expected = (n as f64).log2().ceil() as usize;
        assert_eq!(play_out(&arena, id), expected, "field of {n}");

        let detail = arena.get_tournament(id).unwrap();
        assert_eq!(detail.tournament.status, TournamentStatus::Completed);
        assert!(detail.tournament.winner.is_some());
        for round in &detail.rounds {
            let byes = round.matches.iter().filter(|m| m.is_bye()).count();
            assert!(byes <= 1, "round {} has {byes} byes", round.number);
        }
    }
}

#[test]
fn three_agents_go_pending_running_completed() {
    let (dir, ids) = bots::directory(
        GameKind::RockPaperScissors,
        &[("a", "rock"), ("b", "paper"), ("c", "scissors")],
    );
    let arena = bots::arena(dir, Arc::new(InMemoryStore::new()), bots::config());
    let events = arena.subscribe();
    let id = arena.create_tournament(GameKind::RockPaperScissors).unwrap();
    let status = |arena: &Arena| arena.get_tournament(id).unwrap().tournament.status;

    assert_eq!(status(&arena), TournamentStatus::Pending);

    // rock vs paper, scissors gets the bye
    assert!(matches!(arena.advance_round(id).unwrap(), Advance::Round(_)));
    assert_eq!(status(&arena), TournamentStatus::Running);
    let detail = arena.get_tournament(id).unwrap();
    let first = &detail.rounds[0];
    assert_eq!(first.matches.len(), 2);
    assert_eq!(first.matches[0].winner, Some(ids[1]));
    assert!(first.matches[1].is_bye());
    assert_eq!(first.matches[1].agent1, ids[2]);

    // paper vs scissors
    assert!(matches!(arena.advance_round(id).unwrap(), Advance::Round(_)));
    let detail = arena.get_tournament(id).unwrap();
    assert_eq!(detail.tournament.status, TournamentStatus::Completed);
    assert_eq!(detail.tournament.winner, Some(ids[2]));
    assert_eq!(detail.standings[0].agent_id, ids[2]);
    assert_eq!(detail.standings[0].wins, 1);
    assert_eq!(detail.standings[0].byes, 1);

    assert_eq!(arena.advance_round(id).unwrap(), Advance::NoOp);

    let received: Vec<ArenaEvent> = events.try_iter().collect();
    assert!(matches!(
        received.first(),
        Some(ArenaEvent::TournamentCreated { entrants: 3, .. })
    ));
    assert_eq!(
        received.last(),
        Some(&ArenaEvent::TournamentCompleted {
            tournament: id,
            winner: Some(ids[2]),
        })
    );
}

#[test]
fn single_entrant_wins_without_playing() {
    let (dir, ids) = bots::field(GameKind::Connect4, 1, "leftmost");
    let arena = bots::arena(dir, Arc::new(InMemoryStore::new()), bots::config());
    let id = arena.create_tournament(GameKind::Connect4).unwrap();

    assert_eq!(arena.advance_round(id).unwrap(), Advance::NoOp);
    let detail = arena.get_tournament(id).unwrap();
    assert_eq!(detail.tournament.status, TournamentStatus::Completed);
    assert_eq!(detail.tournament.winner, Some(ids[0]));
    assert!(detail.rounds.is_empty());
}

#[test]
fn two_agents_are_decided_by_the_first_round() {
    let (dir, ids) = bots::directory(
        GameKind::RockPaperScissors,
        &[("a", "rock"), ("b", "paper")],
    );
    let arena = bots::arena(dir, Arc::new(InMemoryStore::new()), bots::config());
    let id = arena.create_tournament(GameKind::RockPaperScissors).unwrap();
    let status = |arena: &Arena| arena.get_tournament(id).unwrap().tournament.status;

    assert_eq!(status(&arena), TournamentStatus::Pending);
    assert!(matches!(arena.advance_round(id).unwrap(), Advance::Round(_)));
    assert_eq!(status(&arena), TournamentStatus::Completed);

    let detail = arena.get_tournament(id).unwrap();
    assert_eq!(detail.tournament.winner, Some(ids[1]));
    assert_eq!(detail.rounds.len(), 1);
    assert_eq!(arena.advance_round(id).unwrap(), Advance::NoOp);
}

#[test]
fn empty_field_creates_nothing() {
    let store = Arc::new(InMemoryStore::new());
    let arena = bots::arena(StaticDirectory::new(), store.clone(), bots::config());
    let err = arena.create_tournament(GameKind::TicTacToe).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoEligibleAgents);
    assert!(arena.list_tournaments().unwrap().is_empty());
}

#[test]
fn first_seat_advances_on_win_or_draw() {
    let (dir, ids) = bots::field(GameKind::TicTacToe, 2, "first-free");
    let arena = bots::arena(dir, Arc::new(InMemoryStore::new()), bots::config());
    let id = arena.create_tournament(GameKind::TicTacToe).unwrap();
    play_out(&arena, id);

    let detail = arena.get_tournament(id).unwrap();
    let played = &detail.rounds[0].matches[0];
    // X takes 0, 2, 4, 6 and wins on the anti-diagonal
    assert_eq!(played.winner, Some(ids[0]));
    assert_eq!(detail.tournament.winner, Some(ids[0]));

    let (dir, ids) = bots::field(GameKind::RockPaperScissors, 2, "rock");
    let arena = bots::arena(dir, Arc::new(InMemoryStore::new()), bots::config());
    let id = arena.create_tournament(GameKind::RockPaperScissors).unwrap();
    play_out(&arena, id);
    let detail = arena.get_tournament(id).unwrap();
    let played = &detail.rounds[0].matches[0];
    assert_eq!(played.result, MatchResult::Draw);
    assert_eq!(played.winner, None);
    assert_eq!(played.metadata.advanced_by_tiebreak, Some(ids[0]));
    assert_eq!(detail.tournament.winner, Some(ids[0]));
}

#[test]
fn faulty_agents_lose_their_match() {
    let (dir, ids) = bots::directory(
        GameKind::RockPaperScissors,
        &[("a", "panics"), ("b", "rock"), ("c", "rock"), ("d", "garbage")],
    );
    let arena = bots::arena(dir, Arc::new(InMemoryStore::new()), bots::config());
    let id = arena.create_tournament(GameKind::RockPaperScissors).unwrap();
    arena.advance_round(id).unwrap();

    let detail = arena.get_tournament(id).unwrap();
    let round = &detail.rounds[0];
    assert_eq!(round.matches[0].winner, Some(ids[1]));
    assert!(round.matches[0].metadata.faults.iter().any(|f| f.agent == ids[0]));
    assert_eq!(round.matches[1].winner, Some(ids[2]));
    assert!(round.matches[1].metadata.faults.iter().any(|f| f.agent == ids[3]));
}

#[test]
fn concurrent_advance_is_rejected() {
    let (dir, _) = bots::field(GameKind::RockPaperScissors, 2, "slow");
    let arena = bots::arena(dir, Arc::new(InMemoryStore::new()), bots::config());
    let id = arena.create_tournament(GameKind::RockPaperScissors).unwrap();

    std::thread::scope(|s| {
        let first = s.spawn(|| arena.advance_round(id));
        std::thread::sleep(Duration::from_millis(100));
        let err = arena.advance_round(id).unwrap_err();
        assert_eq!(err, ArenaError::TournamentBusy(id));
        assert!(matches!(first.join().unwrap(), Ok(Advance::Round(_))));
    });

    let detail = arena.get_tournament(id).unwrap();
    assert_eq!(detail.rounds.len(), 1);
    assert_eq!(detail.tournament.status, TournamentStatus::Completed);
}

#[test]
fn persistence_failure_commits_nothing() {
    let store = Arc::new(InMemoryStore::new());
    let (dir, _) = bots::field(GameKind::RockPaperScissors, 4, "rock");
    let arena = bots::arena(dir, store.clone(), bots::config());
    let id = arena.create_tournament(GameKind::RockPaperScissors).unwrap();

    store.fail_writes(true);
    let err = arena.advance_round(id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PersistenceFailure);

    store.fail_writes(false);
    let detail = arena.get_tournament(id).unwrap();
    assert!(detail.rounds.is_empty());
    assert_eq!(detail.tournament.status, TournamentStatus::Pending);

    assert_eq!(play_out(&arena, id), 2);
    let rounds = arena.get_tournament(id).unwrap().rounds;
    let numbers: Vec<u32> = rounds.iter().map(|r| r.number).collect();
    assert_eq!(numbers, [1, 2]);
}

#[test]
fn failed_matches_block_until_resolved() {
    let store = Arc::new(InMemoryStore::new());
    let (dir, ids) = bots::field(GameKind::RockPaperScissors, 4, "rock");
    let agents = dir.list_agents(GameKind::RockPaperScissors).unwrap();

    let id = TournamentId(store.next_id(EntityKind::Tournament).unwrap());
    store
        .insert_tournament(Tournament {
            id,
            name: "seeded".into(),
            game: GameKind::RockPaperScissors,
            kind: TournamentKind::Knockout,
            status: TournamentStatus::Pending,
            scoring: ScoringScheme::default(),
            seeding: Seeding::InputOrder,
            entrants: agents.clone(),
            winner: None,
            created_at: OffsetDateTime::now_utc(),
        })
        .unwrap();

    let played = |agent1: usize, agent2: usize, status: MatchStatus| Match {
        id: MatchId(store.next_id(EntityKind::Match).unwrap()),
        agent1: ids[agent1],
        agent2: Some(ids[agent2]),
        agent1_score: 0,
        agent2_score: 0,
        result: MatchResult::Draw,
        winner: None,
        status,
        metadata: MatchMetadata::new(
            GameKind::RockPaperScissors,
            &agents[agent1],
            Some(&agents[agent2]),
        ),
        created_at: OffsetDateTime::now_utc(),
    };
    let mut decided = played(0, 1, MatchStatus::Completed);
    decided.result = MatchResult::Loss;
    decided.winner = Some(ids[1]);
    let failed = played(2, 3, MatchStatus::Failed);
    let failed_id = failed.id;
    store
        .commit_round(RoundCommit {
            round: Round {
                id: RoundId(store.next_id(EntityKind::Round).unwrap()),
                tournament: id,
                number: 1,
                created_at: OffsetDateTime::now_utc(),
                matches: vec![decided, failed],
            },
            actions: vec![],
            status: TournamentStatus::Running,
            winner: None,
        })
        .unwrap();

    let arena = bots::arena(dir, store, bots::config());
    let err = arena.advance_round(id).unwrap_err();
    assert_eq!(
        err,
        ArenaError::UnresolvedMatches {
            tournament: id,
            matches: vec![failed_id],
        }
    );

    let err = arena.resolve_match(failed_id, ids[0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    arena.resolve_match(failed_id, ids[3]).unwrap();

    let resolved = arena.get_match(failed_id).unwrap();
    assert_eq!(resolved.record.status, MatchStatus::Completed);
    assert_eq!(resolved.record.winner, Some(ids[3]));
    assert!(resolved.record.metadata.resolved_by_operator);

    assert!(matches!(arena.advance_round(id).unwrap(), Advance::Round(_)));
    let detail = arena.get_tournament(id).unwrap();
    let last = &detail.rounds[1].matches[0];
    assert_eq!((last.agent1, last.agent2), (ids[1], Some(ids[3])));
    assert_eq!(detail.tournament.status, TournamentStatus::Completed);
}

#[test]
fn match_history_is_replayable() {
    let (dir, ids) = bots::directory(
        GameKind::RockPaperScissors,
        &[("a", "rock"), ("b", "paper")],
    );
    let arena = bots::arena(dir, Arc::new(InMemoryStore::new()), bots::config());
    let id = arena.create_tournament(GameKind::RockPaperScissors).unwrap();
    arena.advance_round(id).unwrap();

    let match_id = arena.get_tournament(id).unwrap().rounds[0].matches[0].id;
    let detail = arena.get_match(match_id).unwrap();
    assert_eq!(detail.tournament, id);
    assert_eq!(detail.record.winner, Some(ids[1]));

    let numbers: Vec<u32> = detail.actions.iter().map(|a| a.move_number).collect();
    assert_eq!(numbers, (0..detail.actions.len() as u32).collect::<Vec<_>>());
    assert_eq!(detail.actions.len(), 4);
    assert!(detail.playback.is_some());
}

#[test]
fn seeded_shuffle_is_reproducible() {
    let entrants = |seed| {
        let (dir, _) = bots::field(GameKind::RockPaperScissors, 6, "rock");
        let arena = bots::arena(dir, Arc::new(InMemoryStore::new()), bots::config());
        let id = arena
            .create_tournament_with(
                GameKind::RockPaperScissors,
                ScoringScheme::default(),
                Seeding::Shuffled { seed },
            )
            .unwrap();
        let detail = arena.get_tournament(id).unwrap();
        detail
            .tournament
            .entrants
            .iter()
            .map(|a| a.id)
            .collect::<Vec<_>>()
    };
    assert_eq!(entrants(7), entrants(7));
    let mut sorted = entrants(7);
    sorted.sort();
    assert_eq!(sorted.len(), 6);
}

#[test]
fn listing_reports_every_tournament() {
    let (dir, _) = bots::field(GameKind::RockPaperScissors, 2, "rock");
    let arena = bots::arena(dir, Arc::new(InMemoryStore::new()), bots::config());
    let done = arena.create_tournament(GameKind::RockPaperScissors).unwrap();
    play_out(&arena, done);
    let waiting = arena.create_tournament(GameKind::RockPaperScissors).unwrap();

    let list = arena.list_tournaments().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, done);
    assert_eq!(list[0].status, TournamentStatus::Completed);
    assert_eq!(list[0].completed_rounds, 1);
    assert_eq!(list[1].id, waiting);
    assert_eq!(list[1].status, TournamentStatus::Pending);
    assert_eq!(list[1].leaderboard.len(), 2);
}

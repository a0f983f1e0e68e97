/// Concurrency tests: many callers sharing one engine behind an `Arc`.

use std::sync::Arc;

use blackbook_noloss_wagers::{
    AuthorizationError, BetEngine, BetError, EngineConfig, Ledger, SimulatedYieldVenue,
    SystemClock, YieldRate,
};

const BETS: usize = 8;
const JOINERS: usize = 16;
const STAKE: u64 = 1_500;

fn shared_engine(ledger: Arc<Ledger>) -> Arc<BetEngine> {
    let rate = YieldRate::default();
    let venue = Arc::new(SimulatedYieldVenue::new(rate.clone()));
    Arc::new(BetEngine::new(
        EngineConfig::with_owner("OWNER"),
        ledger,
        venue,
        Arc::new(SystemClock),
        rate,
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_joins_on_distinct_bets() {
    let ledger = Arc::new(Ledger::new());
    for b in 0..BETS {
        ledger.mint(&format!("CREATOR{}", b), 10_000);
        for j in 0..JOINERS {
            ledger.mint(&format!("P{}_{}", b, j), STAKE);
        }
    }
    let engine = shared_engine(ledger.clone());

    let ids: Vec<u64> = (0..BETS)
        .map(|b| {
            engine
                .create_bet(&format!("CREATOR{}", b), 10_000, "parallel", 3, b % 2 == 0)
                .unwrap()
        })
        .collect();

    let mut tasks = Vec::new();
    for (b, id) in ids.iter().copied().enumerate() {
        for j in 0..JOINERS {
            let engine = engine.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                engine.join_bet(id, &format!("P{}_{}", b, j), STAKE, j % 3 == 0)
            }));
        }
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for id in &ids {
        let details = engine.get_bet_details(*id).unwrap();
        assert_eq!(details.participant_count, JOINERS + 1);
        assert_eq!(
            details.stake_true + details.stake_false,
            10_000 + STAKE * JOINERS as u64
        );
    }
    assert_eq!(ledger.stats().total_available, 0);
    assert_eq!(engine.list_bets().len(), BETS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_duplicate_joins_admit_one() {
    let ledger = Arc::new(Ledger::new());
    ledger.mint("CREATOR", 10_000);
    ledger.mint("ALICE", STAKE * 8);
    let engine = shared_engine(ledger.clone());
    let id = engine.create_bet("CREATOR", 10_000, "race", 3, true).unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        tasks.push(tokio::task::spawn_blocking(move || engine.join_bet(id, "ALICE", STAKE, false)));
    }

    let mut admitted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => admitted += 1,
            Err(BetError::Authorization(AuthorizationError::AlreadyJoined(_))) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(admitted, 1);
    assert_eq!(engine.get_participant_stake(id, "ALICE").unwrap(), STAKE);
    assert_eq!(ledger.balance("ALICE"), STAKE * 7);
}

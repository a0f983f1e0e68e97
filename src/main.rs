// BlackBook No-Loss Wagers - demo entry point
// Runs one wager end to end against the in-memory ledger and the simulated yield venue

use std::sync::Arc;

use blackbook_noloss_wagers::{
    from_tokens, to_tokens, BetEngine, BetError, EngineConfig, Ledger, ManualClock,
    SettlementReport, SimulatedYieldVenue, YieldRate,
};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use tracing::error;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(EngineConfig::log_level_from_env())
        .init();
    let config = EngineConfig::from_env();

    println!("\n═══════════════════════════════════════════════");
    println!("     🎲 BlackBook No-Loss Wagers");
    println!("═══════════════════════════════════════════════\n");

    let snapshot_path = config.snapshot_path.clone();
    let ledger = Arc::new(Ledger::new());
    let rate = YieldRate::default();
    let venue = Arc::new(SimulatedYieldVenue::new(rate.clone()));
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = BetEngine::new(config, ledger.clone(), venue, clock.clone(), rate);

    let players = ["CREATOR", "ALICE", "BOB"];
    let funding = from_tokens(dec!(500)).unwrap_or(50_000);
    for who in players {
        ledger.mint(who, funding);
    }

    match run_wager(&engine, &clock) {
        Ok(report) => print_report(&report),
        Err(e) => {
            error!(error = %e, "demo wager failed");
            std::process::exit(1);
        }
    }

    println!("\n📋 Balances:");
    for who in players {
        println!("   {:<8} {:>10} BB", who, to_tokens(ledger.balance(who)));
    }
    println!("   reserve  {:>10} BB", to_tokens(engine.retained_yield()));

    println!("\n📜 Recent ledger activity:");
    for tx in ledger.recent_transactions(5) {
        println!("   {:?} {} {}", tx.tx_type, tx.identity, tx.description.unwrap_or_default());
    }

    if let Some(path) = snapshot_path {
        if let Err(e) = engine.save_snapshot(&path) {
            eprintln!("❌ Failed to save snapshot: {}", e);
        }
    }
    println!("\n👋 Done\n");
}

/// Creator and Alice back "yes", Bob backs "no"; the yes side holds a supermajority.
fn run_wager(engine: &BetEngine, clock: &ManualClock) -> Result<SettlementReport, BetError> {
    let tokens = |t| from_tokens(t).unwrap_or(0);

    let bet_id = engine.create_bet("CREATOR", tokens(dec!(100)), "Will it rain on Friday?", 7, true)?;
    engine.join_bet(bet_id, "ALICE", tokens(dec!(350)), true)?;
    engine.join_bet(bet_id, "BOB", tokens(dec!(75)), false)?;

    clock.advance(Duration::days(7));
    engine.submit_resolution_outcome(bet_id, "ALICE", true)?;

    clock.advance(Duration::hours(24));
    engine.finalize_resolution(bet_id, "KEEPER")
}

fn print_report(report: &SettlementReport) {
    println!("\n✅ Bet {} settled ({:?})", report.bet_id, report.mode);
    println!("   stake:      {} BB", to_tokens(report.total_stake));
    println!("   yield:      {} BB", to_tokens(report.yield_amount));
    println!("   winners:    {} BB", to_tokens(report.yield_for_winners));
    println!("   losers:     {} BB", to_tokens(report.yield_for_losers));
    println!("   retained:   {} BB", to_tokens(report.retained));
    for payout in &report.payouts {
        println!(
            "   {:<8} staked {:>8} BB on {:<5} → paid {:>8} BB",
            payout.identity,
            to_tokens(payout.stake),
            payout.side,
            to_tokens(payout.amount)
        );
    }
}

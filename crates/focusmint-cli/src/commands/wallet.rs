use chrono::Utc;
use clap::Subcommand;
use focusmint_core::RewardSource;

use super::{open_state, print_events};

#[derive(Subcommand)]
pub enum WalletAction {
    /// Print the derived wallet (balance and per-source breakdown)
    Balance,
    /// Spend currency units
    Spend {
        amount: u64,
        /// What the units are being spent on
        #[arg(long, default_value = "unspecified")]
        reason: String,
    },
    /// Grant an out-of-band manual bonus
    Bonus {
        amount: u64,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Print all reward events as JSON
    Events,
    /// Print units earned today
    Today,
}

pub fn run(action: WalletAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut orch, db) = open_state()?;
    let now = Utc::now();
    orch.tick(now);

    match action {
        WalletAction::Balance => {
            println!("{}", serde_json::to_string_pretty(&orch.ledger().wallet())?);
        }
        WalletAction::Spend { amount, reason } => {
            let outcome = orch.spend(amount, &reason, now);
            if !outcome.is_committed() {
                eprintln!("insufficient balance");
            }
        }
        WalletAction::Bonus { amount, note } => {
            orch.grant_bonus(amount, RewardSource::ManualBonus, &note, now);
        }
        WalletAction::Events => {
            println!(
                "{}",
                serde_json::to_string_pretty(orch.ledger().events())?
            );
        }
        WalletAction::Today => {
            println!("{}", orch.ledger().total_today(now));
        }
    }

    print_events(&orch.drain_events())?;
    orch.save(&db)?;
    Ok(())
}

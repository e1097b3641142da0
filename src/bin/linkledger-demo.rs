#![forbid(unsafe_code)]
//! Walks a fresh ledger through wallet creation, signed transfers and mining.

use clap::Parser;
use colored::*;
use linkledger::blockchain::Ledger;
use linkledger::config::{load_config, DEFAULT_CONFIG_PATH};
use linkledger::crypto::Secp256k1Verifier;
use linkledger::miner::{AutoMiner, Difficulty};
use linkledger::transaction::Amount;
use linkledger::wallet::Wallet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "linkledger-demo", about = "Mine a small chain and print balances")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the number of leading zero hex digits required per block
    #[arg(long)]
    difficulty: Option<u32>,

    /// Override the mining reward
    #[arg(long)]
    reward: Option<f64>,

    /// Mine through the background miner instead of explicit calls
    /// (also enabled by `miner.enabled` in the config file)
    #[arg(long)]
    auto_mine: bool,

    /// Dump the final chain as JSON
    #[arg(long)]
    json: bool,
}

fn print_balances(ledger: &Ledger, wallets: &[(&str, &Wallet)]) {
    println!("{}", "Balances".bright_green().underline());
    for (name, wallet) in wallets {
        println!(
            "  {} {:>12}",
            format!("{:<2}", name).bright_white(),
            ledger.calculate_balance(wallet.address()).to_string().yellow()
        );
    }
    println!();
}

fn submit(
    ledger: &Ledger,
    label: &str,
    from: &Wallet,
    to: &Wallet,
    value: Amount,
) -> Result<(), Box<dyn std::error::Error>> {
    let transfer = from.sign_transfer(to.address(), value)?;
    let added = ledger.add_signed_transfer(&transfer);
    let status = if added { "added".green() } else { "rejected".red() };
    println!(
        "{} {} {} (pending: {})",
        label.bright_cyan(),
        value,
        status,
        ledger.pending_len()
    );
    Ok(())
}

fn mine(ledger: &Ledger) {
    if ledger.mine() {
        let height = ledger.chain_len() - 1;
        println!("{} block #{}", "⛏️  mined".bright_yellow(), height);
    } else {
        println!("{}", "mining failed".red());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = load_config(&args.config)?.with_overrides(args.difficulty, args.reward, args.auto_mine);
    let ledger_config = config.validate()?;

    let miner_wallet = Wallet::generate()?;
    let alice = Wallet::generate()?;
    let bob = Wallet::generate()?;

    let ledger = Arc::new(Ledger::new_with_options(
        miner_wallet.address(),
        ledger_config,
        Box::new(Secp256k1Verifier),
        tracing::info_span!("ledger", reward_address = %miner_wallet.address()),
    ));

    println!("{}", "linkledger demo".bright_cyan().bold());
    println!("{}", "---------------".bright_cyan());
    println!(
        "difficulty {}  reward {}\n",
        Difficulty::new(config.ledger.difficulty)?,
        ledger.mining_reward()
    );

    let wallets = [("M", &miner_wallet), ("A", &alice), ("B", &bob)];

    // A has nothing yet, so this is refused.
    submit(&ledger, "A pays B", &alice, &bob, Amount::from_num(1))?;

    if config.miner.enabled {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let miner = AutoMiner::start(ledger.clone(), config.miner.interval());
            // The auto miner only mines when transactions are pending.
            let worker = ledger.clone();
            tokio::task::spawn_blocking(move || mine(&worker)).await?;
            submit(&ledger, "M pays A", &miner_wallet, &alice, ledger.mining_reward())?;
            while ledger.pending_len() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            submit(&ledger, "A pays B", &alice, &bob, Amount::from_num(1))?;
            while ledger.pending_len() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let mined = miner.stop().await;
            println!("auto miner mined {} blocks", mined);
            Ok::<(), Box<dyn std::error::Error>>(())
        })?;
    } else {
        mine(&ledger);
        print_balances(&ledger, &wallets);

        submit(&ledger, "M pays A", &miner_wallet, &alice, ledger.mining_reward())?;
        mine(&ledger);

        submit(&ledger, "A pays B", &alice, &bob, Amount::from_num(1))?;
        mine(&ledger);
    }

    println!();
    print!("{}", ledger);
    print_balances(&ledger, &wallets);

    let valid = ledger.valid_chain();
    println!(
        "chain valid: {}",
        if valid { "yes".green() } else { "no".red() }
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ledger.blocks())?);
    }

    Ok(())
}

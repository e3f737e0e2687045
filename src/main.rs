use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use levy_ledger::{AccountId, Amount, Ledger, LedgerConfig, DECIMALS};
use log::info;
use serde::Serialize;

mod keys;
mod store;

#[derive(Parser)]
#[command(name = "levy", version, about = "Operate a Levy token ledger stored as JSON")]
struct Cli {
    /// Ledger state file.
    #[arg(long, global = true, env = "LEVY_STATE", default_value = store::DEFAULT_STATE)]
    state: PathBuf,

    /// Expected calling account (0x-prefixed hex); checked against `--sk-hex`.
    #[arg(long, global = true)]
    caller: Option<AccountId>,

    /// Ed25519 secret of the calling account (64 hex chars).
    #[arg(long, global = true, env = "LEVY_SK_HEX", hide_env_values = true)]
    sk_hex: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate an ed25519 keypair and its ledger account.
    Keygen {
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Deploy a new ledger owned by the caller.
    Init {
        /// JSON `LedgerConfig`; defaults apply to missing fields.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_parser = parse_amount)]
        supply: Amount,
        #[arg(long)]
        force: bool,
    },
    /// Print ledger configuration and totals.
    Info,
    Balance {
        account: AccountId,
    },
    Allowance {
        owner: AccountId,
        spender: AccountId,
    },
    SnapshotBalance {
        id: u64,
        account: AccountId,
    },
    /// Print the event log as JSON lines.
    Events {
        /// Only the most recent N records.
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Print the state root.
    Root,
    /// Recompute supply invariants; exits non-zero if they are broken.
    Audit,
    Pause,
    Unpause,
    Snapshot,
    /// Units a deposit would mint now.
    QuoteMint {
        #[arg(value_parser = parse_amount)]
        deposit: Amount,
    },
    Mint {
        #[arg(value_parser = parse_amount)]
        deposit: Amount,
    },
    Burn {
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },
    Transfer {
        to: AccountId,
        #[arg(value_parser = parse_amount)]
        value: Amount,
    },
    Approve {
        spender: AccountId,
        #[arg(value_parser = parse_amount)]
        value: Amount,
    },
    TransferFrom {
        from: AccountId,
        to: AccountId,
        #[arg(value_parser = parse_amount)]
        value: Amount,
    },
    SetTreasury {
        account: AccountId,
    },
    SetTax {
        percent: u8,
    },
}

#[derive(Serialize)]
struct LedgerInfo<'a> {
    name: &'a str,
    symbol: &'a str,
    decimals: u8,
    owner: AccountId,
    treasury: AccountId,
    total_supply: Amount,
    cap: Amount,
    tax_percent: u8,
    paused: bool,
    current_snapshot_id: u64,
    native_reserve: Amount,
    burned: Amount,
    state_root: String,
}

impl<'a> LedgerInfo<'a> {
    fn of(ledger: &'a Ledger) -> Self {
        Self {
            name: ledger.name(),
            symbol: ledger.symbol(),
            decimals: ledger.decimals(),
            owner: ledger.owner(),
            treasury: ledger.treasury(),
            total_supply: ledger.total_supply(),
            cap: ledger.cap(),
            tax_percent: ledger.tax_percent(),
            paused: ledger.paused(),
            current_snapshot_id: ledger.current_snapshot_id(),
            native_reserve: ledger.native_reserve(),
            burned: ledger.burned(),
            state_root: hex::encode(ledger.state_root()),
        }
    }
}

/// Parse a base-unit integer, or a decimal such as `1.5` in whole units.
fn parse_amount(s: &str) -> Result<Amount, String> {
    let s = s.trim().replace('_', "");
    let Some((whole, frac)) = s.split_once('.') else {
        return s.parse::<Amount>().map_err(|e| format!("{e}"));
    };
    if frac.len() > DECIMALS as usize || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("at most {DECIMALS} fractional digits"));
    }
    let scale = 10u128.pow(u32::from(DECIMALS));
    let whole: Amount = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|e| format!("{e}"))?
    };
    let frac_units: Amount = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = DECIMALS as usize);
        padded.parse().map_err(|e| format!("{e}"))?
    };
    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| "amount overflows".to_string())
}

fn run(cli: Cli) -> Result<()> {
    let state = cli.state.as_path();
    let caller = || keys::resolve_caller(cli.caller, cli.sk_hex.as_deref());

    match cli.command {
        Command::Keygen { out_dir } => {
            let account = keys::keygen(&out_dir)?;
            println!("keypair written → {} (account {account})", out_dir.display());
        }
        Command::Init {
            config,
            supply,
            force,
        } => {
            let deployer = caller()?;
            let config = match config {
                Some(path) => store::read_config(&path)?,
                None => LedgerConfig::default(),
            };
            let ledger = Ledger::new(deployer, config, supply).context("deploy ledger")?;
            store::create(state, &ledger, force)?;
            info!("ledger deployed by {deployer} → {}", state.display());
            println!("{}", serde_json::to_string_pretty(&LedgerInfo::of(&ledger))?);
        }
        Command::Info => {
            let ledger = store::load(state)?;
            println!("{}", serde_json::to_string_pretty(&LedgerInfo::of(&ledger))?);
        }
        Command::Balance { account } => {
            println!("{}", store::load(state)?.balance_of(&account));
        }
        Command::Allowance { owner, spender } => {
            println!("{}", store::load(state)?.allowance(&owner, &spender));
        }
        Command::SnapshotBalance { id, account } => {
            println!("{}", store::load(state)?.snapshot_balance_of(id, &account));
        }
        Command::Events { tail } => {
            let ledger = store::load(state)?;
            let events = ledger.events();
            let skip = tail.map_or(0, |n| events.len().saturating_sub(n));
            for event in &events[skip..] {
                println!("{}", serde_json::to_string(event)?);
            }
        }
        Command::Root => {
            println!("{}", hex::encode(store::load(state)?.state_root()));
        }
        Command::Audit => {
            let report = store::load(state)?.audit();
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_healthy() {
                anyhow::bail!("ledger invariants violated");
            }
        }
        Command::Pause => {
            let by = caller()?;
            store::mutate(state, |l| l.pause(by))?;
            info!("paused by {by}");
        }
        Command::Unpause => {
            let by = caller()?;
            store::mutate(state, |l| l.unpause(by))?;
            info!("unpaused by {by}");
        }
        Command::Snapshot => {
            let by = caller()?;
            let id = store::mutate(state, |l| l.snapshot(by))?;
            println!("{id}");
        }
        Command::QuoteMint { deposit } => {
            let minted = store::load(state)?.quote_mint(deposit)?;
            println!("{minted}");
        }
        Command::Mint { deposit } => {
            let by = caller()?;
            let minted = store::mutate(state, |l| l.mint(by, deposit))?;
            info!("{by} deposited {deposit} native");
            println!("{minted}");
        }
        Command::Burn { amount } => {
            let by = caller()?;
            println!("{}", store::mutate(state, |l| l.burn(by, amount))?);
        }
        Command::Transfer { to, value } => {
            let by = caller()?;
            println!("{}", store::mutate(state, |l| l.transfer(by, to, value))?);
        }
        Command::Approve { spender, value } => {
            let by = caller()?;
            println!("{}", store::mutate(state, |l| l.approve(by, spender, value))?);
        }
        Command::TransferFrom { from, to, value } => {
            let by = caller()?;
            println!(
                "{}",
                store::mutate(state, |l| l.transfer_from(by, from, to, value))?
            );
        }
        Command::SetTreasury { account } => {
            let by = caller()?;
            store::mutate(state, |l| l.set_treasury(by, account))?;
            info!("treasury set to {account}");
        }
        Command::SetTax { percent } => {
            let by = caller()?;
            store::mutate(state, |l| l.set_tax_percent(by, percent))?;
            info!("tax set to {percent}%");
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_accept_integers_and_decimals() {
        assert_eq!(parse_amount("42"), Ok(42));
        assert_eq!(parse_amount("1_000"), Ok(1_000));
        assert_eq!(parse_amount("1.5"), Ok(1_500_000_000_000_000_000));
        assert_eq!(parse_amount(".25"), Ok(250_000_000_000_000_000));
        assert_eq!(parse_amount("2."), Ok(2_000_000_000_000_000_000));
        assert!(parse_amount("1.0000000000000000001").is_err());
        assert!(parse_amount("1.-5").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn cli_parses_transfer_with_global_caller() {
        let cli = Cli::try_parse_from([
            "levy",
            "transfer",
            "0x0202020202020202020202020202020202020202",
            "1.0",
            "--caller",
            "0x0101010101010101010101010101010101010101",
        ])
        .unwrap();
        assert_eq!(cli.caller, Some(AccountId::new([1; 20])));
        match cli.command {
            Command::Transfer { to, value } => {
                assert_eq!(to, AccountId::new([2; 20]));
                assert_eq!(value, 1_000_000_000_000_000_000);
            }
            _ => panic!("expected transfer"),
        }
    }

    #[test]
    fn end_to_end_through_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("levy.json");
        let sk_hex = hex::encode([1u8; 32]);
        let owner = keys::account_of(&keys::parse_sk_hex(&sk_hex).unwrap());
        let alice = AccountId::new([2; 20]);
        let cli = |command: Command| Cli {
            state: state.clone(),
            caller: Some(owner),
            sk_hex: Some(sk_hex.clone()),
            command,
        };

        run(cli(Command::Init {
            config: None,
            supply: 1_000,
            force: false,
        }))
        .unwrap();
        run(cli(Command::Transfer {
            to: alice,
            value: 100,
        }))
        .unwrap();
        run(cli(Command::Pause)).unwrap();
        assert!(run(cli(Command::Transfer {
            to: alice,
            value: 1,
        }))
        .is_err());
        run(cli(Command::Audit)).unwrap();

        let ledger = store::load(&state).unwrap();
        assert!(ledger.paused());
        assert_eq!(ledger.owner(), owner);
        assert_eq!(ledger.balance_of(&alice), 98);
    }

    #[test]
    fn owner_address_alone_cannot_unpause() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("levy.json");
        let sk_hex = hex::encode([5u8; 32]);
        let owner = keys::account_of(&keys::parse_sk_hex(&sk_hex).unwrap());
        let as_owner = |command: Command, sk_hex: Option<String>| Cli {
            state: state.clone(),
            caller: Some(owner),
            sk_hex,
            command,
        };

        run(as_owner(
            Command::Init {
                config: None,
                supply: 1_000,
                force: false,
            },
            Some(sk_hex.clone()),
        ))
        .unwrap();
        run(as_owner(Command::Pause, Some(sk_hex.clone()))).unwrap();
        let before = store::load(&state).unwrap();

        assert!(run(as_owner(Command::Unpause, None)).is_err());
        assert!(run(as_owner(
            Command::SetTreasury {
                account: AccountId::new([6; 20])
            },
            None
        ))
        .is_err());
        assert_eq!(store::load(&state).unwrap(), before);

        let stranger = hex::encode([7u8; 32]);
        assert!(run(as_owner(Command::Unpause, Some(stranger))).is_err());
        assert!(store::load(&state).unwrap().paused());
    }
}

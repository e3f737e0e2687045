use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use ed25519_dalek::SigningKey;
use levy_ledger::AccountId;
use rand::{rngs::OsRng, RngCore};

pub fn parse_sk_hex(sk_hex: &str) -> Result<SigningKey> {
    let sk_bytes = hex::decode(sk_hex.trim()).context("invalid sk-hex")?;
    let Ok(arr) = <[u8; 32]>::try_from(sk_bytes.as_slice()) else {
        bail!("sk-hex must be 32 bytes (64 hex chars), got {}", sk_bytes.len());
    };
    Ok(SigningKey::from_bytes(&arr))
}

pub fn account_of(sk: &SigningKey) -> AccountId {
    AccountId::from_public_key(sk.verifying_key().as_bytes())
}

/// Caller identity for a state-changing command.
///
/// Only holding the secret proves the identity. `--caller`, when given, must
/// name the account the secret derives to.
pub fn resolve_caller(caller: Option<AccountId>, sk_hex: Option<&str>) -> Result<AccountId> {
    let Some(sk_hex) = sk_hex else {
        match caller {
            Some(account) => bail!("acting as {account} needs --sk-hex for that account"),
            None => bail!("this command needs --sk-hex"),
        }
    };
    let derived = account_of(&parse_sk_hex(sk_hex)?);
    if let Some(account) = caller {
        if derived != account {
            bail!("--caller {account} does not match the key's account {derived}");
        }
    }
    Ok(derived)
}

/// Generate a fresh keypair and write `sk.hex`, `pk.hex` and `account.txt`.
pub fn keygen(out_dir: &Path) -> Result<AccountId> {
    fs::create_dir_all(out_dir).with_context(|| format!("mkdir {}", out_dir.display()))?;

    let mut sk_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut sk_bytes);
    let sk = SigningKey::from_bytes(&sk_bytes);
    let pk = sk.verifying_key();
    let account = account_of(&sk);

    fs::write(out_dir.join("sk.hex"), hex::encode(sk_bytes)).context("write sk.hex")?;
    fs::write(out_dir.join("pk.hex"), hex::encode(pk.as_bytes())).context("write pk.hex")?;
    fs::write(out_dir.join("account.txt"), account.to_string()).context("write account.txt")?;
    Ok(account)
}

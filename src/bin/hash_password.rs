//! Print an argon2 hash for `auth.admin_password_hash`
//!
//! Usage: `cargo run --bin hash_password -- '<password>'`

use anyhow::{Context, bail};
use intercity_carpool::auth::password::hash_password;

fn main() -> anyhow::Result<()> {
    let Some(password) = std::env::args().nth(1) else {
        bail!("usage: hash_password <password>");
    };
    let phc = hash_password(&password).context("Failed to hash password")?;
    println!("{}", phc);
    Ok(())
}

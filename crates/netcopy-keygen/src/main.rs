//! Key generator: derives the pre-shared key from a master password.
//!
//! The derivation uses a fixed salt, so the same password produces the same
//! key on every machine; run this once and paste the printed key into both
//! the client and server configuration.

use anyhow::Context;
use clap::Parser;

use netcopy_core::crypto::kdf;

/// netcopy key generator.
#[derive(Debug, Parser)]
#[command(
    name = "netcopy-keygen",
    version,
    about = "Generate the netcopy pre-shared key from a master password"
)]
struct Cli {
    /// Read the password from this argument instead of prompting
    /// (visible in the process list; prefer the interactive prompt).
    #[arg(long = "password", value_name = "PASSWORD")]
    password: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let password = match cli.password {
        Some(password) => password,
        None => {
            eprint!("Please enter the master password to generate the secret key: ");
            rpassword::read_password().context("failed to read password")?
        }
    };

    if password.is_empty() {
        anyhow::bail!("password cannot be empty");
    }

    let key = kdf::derive_key(&password);
    println!(
        "Insert \"0x{}\" as secret_key in your client and server configuration.",
        hex::encode(*key)
    );
    Ok(())
}

//! popsig CLI Library
//!
//! Argument definitions and command implementations for the `popsig` binary.
//! Commands return their stdout text so they can be driven without a process.

pub mod args;

use anyhow::{bail, Context, Result};
use args::{Command, SecretArg};
use popsig::{builtin_vectors, ConformanceHarness};
use popsig_bls12_381::{Ciphersuite, PublicKey, SecretKey, Signature};
use popsig_config::Config;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What a command printed and whether the process should exit successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub output: String,
    pub success: bool,
}

impl Outcome {
    fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
        }
    }

    fn verdict(valid: bool) -> Self {
        Self {
            output: valid.to_string(),
            success: valid,
        }
    }
}

/// Loads the configuration file, or the defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Decodes hex with an optional `0x` prefix and surrounding whitespace
pub fn decode_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).with_context(|| format!("invalid hex input '{trimmed}'"))
}

/// Runs one command. Inputs omitted on the command line are read as hex from `stdin`.
pub fn run<R: Read>(command: &Command, config: &Config, stdin: &mut R) -> Result<Outcome> {
    let ciphersuite =
        Ciphersuite::from_config(&config.ciphersuite).context("invalid ciphersuite config")?;

    match command {
        Command::Keygen { seed, seed_hex } => {
            let secret_key = match (seed, seed_hex) {
                (Some(seed), _) => ciphersuite.key_gen(seed.as_bytes(), b"")?,
                (None, Some(seed)) => ciphersuite.key_gen(&decode_hex(seed)?, b"")?,
                (None, None) => {
                    debug!("no seed given, sampling a random secret key");
                    SecretKey::generate(&mut rand::thread_rng())
                }
            };
            Ok(Outcome::ok(secret_key.to_hex()))
        }
        Command::Pubkey(secret) => {
            let secret_key = read_secret(secret, stdin)?;
            Ok(Outcome::ok(ciphersuite.sk_to_pk(&secret_key).to_hex()))
        }
        Command::Sign { secret, message } => {
            if secret.secret.is_none() && message.is_none() {
                bail!("secret key and message cannot both be read from stdin");
            }
            let secret_key = read_secret(secret, stdin)?;
            let message = input_or_stdin(message.as_deref(), stdin)?;
            let signature = ciphersuite.sign(&secret_key, &message)?;
            Ok(Outcome::ok(signature.to_hex()))
        }
        Command::Verify {
            public_key,
            message,
            signature,
        } => {
            let message = input_or_stdin(message.as_deref(), stdin)?;
            let valid =
                ciphersuite.verify_bytes(&decode_hex(public_key)?, &message, &decode_hex(signature)?)?;
            Ok(Outcome::verdict(valid))
        }
        Command::PopProve(secret) => {
            let secret_key = read_secret(secret, stdin)?;
            Ok(Outcome::ok(ciphersuite.pop_prove(&secret_key)?.to_hex()))
        }
        Command::PopVerify { public_key, proof } => {
            let valid = match (
                PublicKey::from_bytes(&decode_hex(public_key)?),
                Signature::from_bytes(&decode_hex(proof)?),
            ) {
                (Ok(public_key), Ok(proof)) => ciphersuite.pop_verify(&public_key, &proof),
                (Err(err), _) | (_, Err(err)) => {
                    debug!(%err, "rejecting proof of possession");
                    false
                }
            };
            Ok(Outcome::verdict(valid))
        }
        Command::Conformance => {
            let mut harness = ConformanceHarness::from_config(config)?;
            info!(
                library = %harness.deployment().library,
                consumer = %harness.deployment().consumer,
                "verifier deployed"
            );
            let report = harness.run(&builtin_vectors()?)?;
            Ok(Outcome {
                output: report.to_string(),
                success: report.all_passed(),
            })
        }
    }
}

fn input_or_stdin<R: Read>(arg: Option<&str>, stdin: &mut R) -> Result<Vec<u8>> {
    match arg {
        Some(value) => decode_hex(value),
        None => {
            let mut buffer = String::new();
            stdin
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            decode_hex(&buffer)
        }
    }
}

fn read_secret<R: Read>(arg: &SecretArg, stdin: &mut R) -> Result<SecretKey> {
    let bytes = input_or_stdin(arg.secret.as_deref(), stdin)?;
    Ok(SecretKey::from_bytes(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_accepts_prefix_and_whitespace() {
        assert_eq!(decode_hex(" 0xdead\n").unwrap(), vec![0xde, 0xad]);
        assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
        assert!(decode_hex("0xabc").is_err());
        assert!(decode_hex("zz").is_err());
    }

    #[test]
    fn test_load_config_defaults() {
        assert_eq!(load_config(None).unwrap(), Config::default());
        assert!(load_config(Some(Path::new("/nonexistent/popsig.toml"))).is_err());
    }
}

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for popsig
#[derive(Parser, Debug, Clone)]
#[command(
    name = "popsig",
    version = env!("CARGO_PKG_VERSION"),
    about = "BLS12-381 proof-of-possession signatures",
    long_about = "Generates keys, signs and verifies under BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_, and checks the on-chain verifier against the off-chain library. Binary values are hex on stdin/stdout."
)]
pub struct CliArgs {
    /// Specifies the TOML config file
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level; RUST_LOG applies when omitted
    #[arg(long = "log-level", value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Derives a secret key from a seed, or samples one at random
    Keygen {
        /// Seed as UTF-8 text
        #[arg(long, value_name = "TEXT", conflicts_with = "seed_hex")]
        seed: Option<String>,

        /// Seed as hex
        #[arg(long = "seed-hex", value_name = "HEX")]
        seed_hex: Option<String>,
    },

    /// Prints the compressed public key of a secret key
    Pubkey(SecretArg),

    /// Signs a message
    Sign {
        #[command(flatten)]
        secret: SecretArg,

        /// Message as hex; read from stdin when omitted
        #[arg(long, value_name = "HEX")]
        message: Option<String>,
    },

    /// Verifies a signature; exits with status 1 when it is invalid
    Verify {
        /// Compressed G1 public key as hex
        #[arg(long = "public-key", value_name = "HEX")]
        public_key: String,

        /// Message as hex; read from stdin when omitted
        #[arg(long, value_name = "HEX")]
        message: Option<String>,

        /// Compressed G2 signature as hex
        #[arg(long, value_name = "HEX")]
        signature: String,
    },

    /// Proves possession of a secret key
    PopProve(SecretArg),

    /// Verifies a proof of possession; exits with status 1 when it is invalid
    PopVerify {
        /// Compressed G1 public key as hex
        #[arg(long = "public-key", value_name = "HEX")]
        public_key: String,

        /// Compressed G2 proof as hex
        #[arg(long, value_name = "HEX")]
        proof: String,
    },

    /// Runs the built-in vectors through both verifiers on a local chain
    Conformance,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SecretArg {
    /// 32-byte big-endian secret key as hex; read from stdin when omitted
    #[arg(long, value_name = "HEX")]
    pub secret: Option<String>,
}

/// Log level enumeration
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace level logging
    Trace,
    /// Debug level logging
    Debug,
    /// Info level logging
    Info,
    /// Warning level logging
    Warn,
    /// Error level logging
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

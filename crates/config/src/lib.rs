//! popsig Configuration Module
//!
//! This module provides the constants and configuration types shared by the
//! BLS12-381 proof-of-possession library, the in-memory execution environment
//! and the command line tool.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Size of a serialized secret key (big-endian scalar) in bytes
pub const SECRET_KEY_SIZE: usize = 32;
/// Size of a compressed G1 point (public key) in bytes
pub const PUBLIC_KEY_SIZE: usize = 48;
/// Size of a compressed G2 point (signature) in bytes
pub const SIGNATURE_SIZE: usize = 96;
/// Size of a canonical base field element in bytes
pub const FP_SIZE: usize = 48;
/// Size of an EIP-2537 padded base field element in bytes
pub const PADDED_FP_SIZE: usize = 64;
/// Size of an EIP-2537 encoded G1 point
pub const PADDED_G1_SIZE: usize = 2 * PADDED_FP_SIZE;
/// Size of an EIP-2537 encoded G2 point
pub const PADDED_G2_SIZE: usize = 4 * PADDED_FP_SIZE;
/// Size of a keccak/sha256 digest
pub const HASH_SIZE: usize = 32;
/// Size of an account address in bytes
pub const ADDRESS_SIZE: usize = 20;

/// Signing DST of the proof-of-possession ciphersuite
pub const POP_SIGNATURE_DST: &str = "BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";
/// DST used by PopProve / PopVerify
pub const POP_PROOF_DST: &str = "BLS_POP_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Minimum KeyGen seed length recommended by the IETF draft
pub const IETF_MIN_SEED_LENGTH: usize = 32;
/// Minimum KeyGen seed length accepted by default
pub const DEFAULT_MIN_SEED_LENGTH: usize = 8;

/// Per-transaction gas limit used by the deployment harness
pub const DEFAULT_GAS_LIMIT: u64 = 2_000_000;

/// Account that signs deployments and calls when none is configured
pub const DEFAULT_DEPLOYER: &str = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";

/// Fully-qualified name of the verifier library
pub const BLS_LIBRARY_FQN: &str = "src/bls12381/BLS.sol:BLS";
/// Fully-qualified name of the consumer contract
pub const BLS_TEST_FQN: &str = "test/BLS.t.sol:BLSTest";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Gas prices charged by the execution environment.
///
/// Precompile prices follow EIP-2537 (BLS12-381) and EIP-2565 (MODEXP).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSchedule {
    /// Intrinsic cost of every transaction
    pub transaction_base: u64,
    /// Additional intrinsic cost of a contract creation
    pub create_base: u64,
    /// Per byte of deployed code
    pub code_deposit_per_byte: u64,
    /// Calldata byte that is zero
    pub calldata_zero_byte: u64,
    /// Calldata byte that is non-zero
    pub calldata_nonzero_byte: u64,
    /// Cost of entering another contract
    pub call_base: u64,
    /// Any in-contract field operation (add, mul, compare)
    pub field_op: u64,
    pub sha256_base: u64,
    pub sha256_per_word: u64,
    /// Floor of the EIP-2565 MODEXP price
    pub modexp_min: u64,
    pub bls12_g2_add: u64,
    pub bls12_pairing_base: u64,
    pub bls12_pairing_per_pair: u64,
    pub bls12_map_fp2_to_g2: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            transaction_base: 21_000,
            create_base: 32_000,
            code_deposit_per_byte: 200,
            calldata_zero_byte: 4,
            calldata_nonzero_byte: 16,
            call_base: 700,
            field_op: 8,
            sha256_base: 60,
            sha256_per_word: 12,
            modexp_min: 200,
            bls12_g2_add: 600,
            bls12_pairing_base: 37_700,
            bls12_pairing_per_pair: 32_600,
            bls12_map_fp2_to_g2: 23_800,
        }
    }
}

impl GasSchedule {
    /// Intrinsic gas for a transaction carrying `data`
    pub fn intrinsic_gas(&self, data: &[u8], is_create: bool) -> u64 {
        let data_gas: u64 = data
            .iter()
            .map(|b| {
                if *b == 0 {
                    self.calldata_zero_byte
                } else {
                    self.calldata_nonzero_byte
                }
            })
            .sum();
        let create_gas = if is_create { self.create_base } else { 0 };
        self.transaction_base + create_gas + data_gas
    }

    /// Price of the SHA-256 precompile for an input of `len` bytes
    pub fn sha256_gas(&self, len: usize) -> u64 {
        let words = (len as u64).div_ceil(32);
        self.sha256_base + self.sha256_per_word * words
    }

    /// Price of the pairing-check precompile for `pairs` input pairs
    pub fn pairing_gas(&self, pairs: usize) -> u64 {
        self.bls12_pairing_base + self.bls12_pairing_per_pair * pairs as u64
    }
}

/// Execution environment configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Chain identifier reported by the environment
    pub chain_id: u64,
    /// Gas limit attached to every transaction
    pub gas_limit: u64,
    /// Hex address of the account that deploys and calls
    pub deployer: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 1337,
            gas_limit: DEFAULT_GAS_LIMIT,
            deployer: DEFAULT_DEPLOYER.to_string(),
        }
    }
}

/// Off-chain ciphersuite configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CiphersuiteConfig {
    /// KeyGen rejects shorter seeds
    pub min_seed_length: usize,
    /// Signing domain separation tag
    pub dst: String,
    /// Proof-of-possession domain separation tag
    pub pop_dst: String,
}

impl Default for CiphersuiteConfig {
    fn default() -> Self {
        Self {
            min_seed_length: DEFAULT_MIN_SEED_LENGTH,
            dst: POP_SIGNATURE_DST.to_string(),
            pop_dst: POP_PROOF_DST.to_string(),
        }
    }
}

impl CiphersuiteConfig {
    /// Configuration enforcing the IETF 32-byte minimum seed length
    pub fn strict() -> Self {
        Self {
            min_seed_length: IETF_MIN_SEED_LENGTH,
            ..Self::default()
        }
    }
}

/// Complete popsig configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ciphersuite: CiphersuiteConfig,
    pub chain: ChainConfig,
    pub gas: GasSchedule,
}

impl Config {
    /// Parses a TOML document; missing sections fall back to defaults
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Rejects configurations the library cannot operate with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chain.gas_limit == 0 {
            return Err(ConfigError::Invalid("gas_limit must be non-zero".into()));
        }
        if self.ciphersuite.dst.is_empty() || self.ciphersuite.pop_dst.is_empty() {
            return Err(ConfigError::Invalid("DST must not be empty".into()));
        }
        if self.ciphersuite.min_seed_length == 0 {
            return Err(ConfigError::Invalid(
                "min_seed_length must be at least 1".into(),
            ));
        }
        let deployer = self.chain.deployer.trim_start_matches("0x");
        if deployer.len() != 2 * ADDRESS_SIZE || !deployer.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(ConfigError::Invalid(format!(
                "deployer is not a 20-byte hex address: {}",
                self.chain.deployer
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chain.gas_limit, 2_000_000);
        assert_eq!(config.ciphersuite.dst, POP_SIGNATURE_DST);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [chain]
            gas_limit = 5000000

            [ciphersuite]
            min_seed_length = 32
            "#,
        )
        .unwrap();
        assert_eq!(config.chain.gas_limit, 5_000_000);
        assert_eq!(config.chain.deployer, DEFAULT_DEPLOYER);
        assert_eq!(config.ciphersuite, CiphersuiteConfig::strict());
        assert_eq!(config.gas, GasSchedule::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.chain.gas_limit = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.ciphersuite.dst.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chain.deployer = "0x1234".into();
        assert!(config.validate().is_err());

        assert!(Config::from_toml_str("[chain]\ngas_limit = 0\n").is_err());
        assert!(matches!(
            Config::from_toml_str("[chain\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("popsig.toml");

        let mut config = Config::default();
        config.gas.field_op = 5;
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_gas_schedule_prices() {
        let gas = GasSchedule::default();
        assert_eq!(gas.sha256_gas(0), 60);
        assert_eq!(gas.sha256_gas(32), 72);
        assert_eq!(gas.sha256_gas(33), 84);
        assert_eq!(gas.pairing_gas(2), 37_700 + 2 * 32_600);
        assert_eq!(gas.intrinsic_gas(&[0, 1, 0xff], false), 21_000 + 4 + 16 + 16);
        assert_eq!(gas.intrinsic_gas(&[], true), 53_000);
    }
}

//! Artifact loading, library linking and the three-step deployment.

use hex_literal::hex;
use popsig_config::{BLS_LIBRARY_FQN, DEFAULT_DEPLOYER};
use popsig_smart_contract::contracts::{bls_library_artifact, bls_test_artifact};
use popsig_smart_contract::*;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/BLSTest.json");

#[cfg(test)]
mod deployment_tests {
    use super::*;

    /// The forge-style artifact on disk matches the generated one
    #[test]
    fn test_fixture_matches_generated_artifact() {
        let artifact = Artifact::load_from_file(FIXTURE).unwrap();

        assert_eq!(artifact, bls_test_artifact());
        assert_eq!(
            artifact.function_signatures(),
            vec![
                "verify(bytes,bytes,bytes)",
                "verifyWithWitnesses(bytes,bytes,bytes,bytes,bytes)"
            ]
        );
        assert_eq!(artifact.libraries(), vec![BLS_LIBRARY_FQN]);
    }

    /// Saved artifacts load back unchanged
    #[test]
    fn test_artifact_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BLS.json");
        let artifact = bls_library_artifact();

        artifact.save_to_file(&path).unwrap();
        assert_eq!(Artifact::load_from_file(&path).unwrap(), artifact);
    }

    /// Linking writes the lowercase library address into the placeholder
    #[test]
    fn test_link_fixture() {
        let artifact = Artifact::load_from_file(FIXTURE).unwrap();
        let library: Address = "0xF2E246BB76DF876Cef8b38ae84130F4F55De395b".parse().unwrap();
        let libraries = LibraryAddresses::new().with(BLS_LIBRARY_FQN, library);

        let linked = Linker::link(&artifact, &libraries).unwrap();
        assert_eq!(linked.len(), 60);
        assert_eq!(
            linked.to_hex(),
            artifact
                .bytecode
                .object
                .replace(&Linker::placeholder(BLS_LIBRARY_FQN), &library.to_hex())
        );
        assert!(!linked.to_hex().contains("__$"));
        assert!(linked.to_hex().contains("f2e246bb76df876cef8b38ae84130f4f55de395b"));
    }

    /// Deployment addresses follow the CREATE rule from the default deployer
    #[test]
    fn test_deployment_addresses() {
        let mut chain = LocalChain::new();
        let from: Address = DEFAULT_DEPLOYER.parse().unwrap();
        assert_eq!(from.to_checksum(), "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");

        let deployment = Deployer::new(&mut chain, from)
            .deploy(
                &bls_library_artifact(),
                BLS_LIBRARY_FQN,
                &Artifact::load_from_file(FIXTURE).unwrap(),
            )
            .unwrap();

        assert_eq!(
            deployment.library.as_bytes(),
            &hex!("f2e246bb76df876cef8b38ae84130f4f55de395b")
        );
        assert_eq!(
            deployment.consumer.as_bytes(),
            &hex!("2946259e0334f33a064106302415ad3391bed384")
        );
        assert_eq!(chain.nonce(&from), 2);
    }

    /// Raw bytecode with a placeholder never reaches the chain
    #[test]
    fn test_unlinked_consumer_fails_fast() {
        let mut chain = LocalChain::new();
        let from = chain.deployer().unwrap();

        let err = chain.deploy_artifact(from, &bls_test_artifact()).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBytecode(_)));

        let err = Linker::link(&bls_test_artifact(), &LibraryAddresses::new()).unwrap_err();
        assert_eq!(err, LinkError::UnresolvedLibrary(BLS_LIBRARY_FQN.to_string()));
    }

    /// Receipts serialize with checksummed addresses
    #[test]
    fn test_receipt_json() {
        let mut chain = LocalChain::new();
        let from = chain.deployer().unwrap();
        let receipt = chain.deploy_artifact(from, &bls_library_artifact()).unwrap();

        let json = serde_json::to_string(&receipt).unwrap();
        assert!(json.contains("\"Deployed\":\"0xF2E246BB76DF876Cef8b38ae84130F4F55De395b\""));
        let decoded: Receipt = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, receipt);
    }
}

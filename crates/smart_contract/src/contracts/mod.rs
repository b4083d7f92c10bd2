//! Contracts known to the execution environment and their bytecode layout.
//!
//! Deployed code has the shape
//!
//! ```text
//! 60 80 60 40 52            preamble
//! 7f <32-byte code id>      keccak256 of the fully-qualified name
//! (73 <20-byte address>)*   one slot per linked library
//! 00
//! ```
//!
//! so that library slots sit at fixed offsets the linker can patch.

pub mod bls;

pub use bls::BlsLibrary;
pub use bls_test::BlsTest;

use crate::artifact::{AbiEntry, AbiParam, Artifact, Bytecode, LinkReference};
use crate::contract::Contract;
use crate::linker::Linker;
use popsig_config::ADDRESS_SIZE;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Leading bytes of all deployed code
pub const CODE_PREAMBLE: [u8; 5] = [0x60, 0x80, 0x60, 0x40, 0x52];
const PUSH32: u8 = 0x7f;
const PUSH20: u8 = 0x73;
const STOP: u8 = 0x00;

/// Offset of the 32-byte code id
pub const CODE_ID_OFFSET: usize = CODE_PREAMBLE.len() + 1;

/// Offset of the first library address slot
pub const LIBRARY_SLOT_OFFSET: usize = CODE_ID_OFFSET + 32 + 1;

/// Code id embedded in `code`, if it has the expected shape
pub fn code_id(code: &[u8]) -> Option<[u8; 32]> {
    if code.len() < CODE_ID_OFFSET + 32
        || code[..CODE_PREAMBLE.len()] != CODE_PREAMBLE
        || code[CODE_PREAMBLE.len()] != PUSH32
    {
        return None;
    }
    let mut id = [0u8; 32];
    id.copy_from_slice(&code[CODE_ID_OFFSET..CODE_ID_OFFSET + 32]);
    Some(id)
}

/// The address stored in library slot `index`
pub fn library_slot(code: &[u8], index: usize) -> Option<[u8; ADDRESS_SIZE]> {
    let start = LIBRARY_SLOT_OFFSET + index * (ADDRESS_SIZE + 1);
    if code.get(start - 1) != Some(&PUSH20) {
        return None;
    }
    code.get(start..start + ADDRESS_SIZE)?.try_into().ok()
}

/// Maps code ids to contract implementations.
#[derive(Default, Clone)]
pub struct ContractRegistry {
    contracts: HashMap<[u8; 32], Arc<dyn Contract>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the BLS library and its test consumer.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BlsLibrary::new()));
        registry.register(Arc::new(BlsTest::new()));
        registry
    }

    pub fn register(&mut self, contract: Arc<dyn Contract>) {
        self.contracts.insert(contract.code_id(), contract);
    }

    /// The contract whose code id `code` carries.
    pub fn resolve(&self, code: &[u8]) -> Option<&dyn Contract> {
        self.contracts.get(&code_id(code)?).map(|c| c.as_ref())
    }

    pub fn get(&self, fully_qualified_name: &str) -> Option<&dyn Contract> {
        self.contracts
            .values()
            .find(|c| c.name() == fully_qualified_name)
            .map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// Compiler-style artifact for `contract`, with a placeholder in every library slot.
pub fn artifact_for(contract: &dyn Contract) -> Artifact {
    let mut object = String::from("0x");
    object.push_str(&hex::encode(CODE_PREAMBLE));
    object.push_str(&hex::encode([PUSH32]));
    object.push_str(&hex::encode(contract.code_id()));

    let mut link_references: BTreeMap<String, BTreeMap<String, Vec<LinkReference>>> =
        BTreeMap::new();
    for (index, library) in contract.libraries().iter().copied().enumerate() {
        object.push_str(&hex::encode([PUSH20]));
        object.push_str(&Linker::placeholder(library));

        let (file, name) = library.rsplit_once(':').unwrap_or(("", library));
        link_references
            .entry(file.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default()
            .push(LinkReference {
                start: LIBRARY_SLOT_OFFSET + index * (ADDRESS_SIZE + 1),
                length: ADDRESS_SIZE,
            });
    }
    object.push_str(&hex::encode([STOP]));

    let abi = contract
        .methods()
        .iter()
        .map(|method| AbiEntry {
            kind: "function".to_string(),
            name: method.name.clone(),
            inputs: method
                .params
                .iter()
                .map(|p| AbiParam::new(p, "bytes"))
                .collect(),
            outputs: vec![AbiParam::new("", method.returns.abi_type())],
            state_mutability: if method.view { "view" } else { "nonpayable" }.to_string(),
        })
        .collect();

    Artifact {
        abi,
        bytecode: Bytecode {
            object,
            link_references,
        },
    }
}

/// Artifact of the BLS verifier library
pub fn bls_library_artifact() -> Artifact {
    artifact_for(&BlsLibrary::new())
}

/// Artifact of the consumer contract, linked against the library
pub fn bls_test_artifact() -> Artifact {
    artifact_for(&BlsTest::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use popsig_config::{BLS_LIBRARY_FQN, BLS_TEST_FQN};

    #[test]
    fn test_registry_resolves_default_contracts() {
        let registry = ContractRegistry::with_defaults();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(BLS_LIBRARY_FQN).unwrap().name(), BLS_LIBRARY_FQN);
        assert!(registry.get("src/Other.sol:Other").is_none());

        let library_code = hex::decode(&bls_library_artifact().bytecode.object[2..]).unwrap();
        assert_eq!(registry.resolve(&library_code).unwrap().name(), BLS_LIBRARY_FQN);
        assert!(registry.resolve(&library_code[..20]).is_none());
        assert!(ContractRegistry::new().resolve(&library_code).is_none());
    }

    #[test]
    fn test_library_artifact_layout() {
        let artifact = bls_library_artifact();
        assert!(artifact.bytecode.link_references.is_empty());
        assert_eq!(artifact.bytecode.object.len(), 2 + 2 * (LIBRARY_SLOT_OFFSET));
        assert!(artifact.bytecode.object.starts_with("0x60806040527f43243e7c"));
    }

    #[test]
    fn test_consumer_artifact_layout() {
        let artifact = bls_test_artifact();
        let object = &artifact.bytecode.object;
        let start = 2 + 2 * LIBRARY_SLOT_OFFSET;

        assert_eq!(&object[start - 2..start], "73");
        assert_eq!(&object[start..start + 40], Linker::placeholder(BLS_LIBRARY_FQN));
        assert!(object.ends_with("00"));

        let refs = &artifact.bytecode.link_references["src/bls12381/BLS.sol"]["BLS"];
        assert_eq!(refs, &vec![LinkReference { start: 39, length: 20 }]);
        assert_eq!(artifact.function_signatures()[0], "verify(bytes,bytes,bytes)");
        assert_ne!(bls_test_artifact().bytecode.object, bls_library_artifact().bytecode.object);
        assert_eq!(BlsTest::new().name(), BLS_TEST_FQN);
    }

    #[test]
    fn test_library_slot() {
        let mut code = vec![0u8; LIBRARY_SLOT_OFFSET + 21];
        code[..5].copy_from_slice(&CODE_PREAMBLE);
        code[5] = PUSH32;
        code[LIBRARY_SLOT_OFFSET - 1] = PUSH20;
        code[LIBRARY_SLOT_OFFSET..LIBRARY_SLOT_OFFSET + 20].copy_from_slice(&[0xaa; 20]);

        assert_eq!(library_slot(&code, 0), Some([0xaa; 20]));
        assert_eq!(library_slot(&code, 1), None);
        assert_eq!(code_id(&code), Some([0u8; 32]));
    }
}

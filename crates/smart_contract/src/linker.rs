//! Library linking: replaces `__$<tag>$__` placeholders with deployed
//! library addresses.
//!
//! [`LinkedBytecode`] can only be produced here, so code reaching the
//! execution environment has already had every placeholder resolved.

use crate::address::Address;
use crate::artifact::{Artifact, PLACEHOLDER_MARKER};
use alloy_primitives::keccak256;
use popsig_config::ADDRESS_SIZE;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Hex characters of the keccak tag inside a placeholder
const TAG_HEX_LEN: usize = 34;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    /// A referenced library has no address.
    #[error("library {0} is referenced but no address was provided")]
    UnresolvedLibrary(String),

    /// A link reference does not describe a 20-byte slot.
    #[error("link reference for {fqn} has length {length}, expected 20")]
    InvalidReferenceLength { fqn: String, length: usize },

    /// A link reference points outside the bytecode.
    #[error("link reference for {fqn} at byte {start} is out of bounds")]
    ReferenceOutOfBounds { fqn: String, start: usize },

    /// The bytes at a link reference are not the library's placeholder.
    #[error("expected placeholder {expected} for {fqn} at byte {start}, found {found}")]
    PlaceholderMismatch {
        fqn: String,
        start: usize,
        expected: String,
        found: String,
    },

    /// A placeholder with no link reference remains after linking.
    #[error("unresolved placeholder {placeholder} at byte {offset}")]
    LeftoverPlaceholder { placeholder: String, offset: usize },

    /// The linked bytecode is not valid hex.
    #[error("bytecode is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Deployed library addresses by fully-qualified name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryAddresses(BTreeMap<String, Address>);

impl LibraryAddresses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fully_qualified_name: impl Into<String>, address: Address) {
        self.0.insert(fully_qualified_name.into(), address);
    }

    pub fn with(mut self, fully_qualified_name: impl Into<String>, address: Address) -> Self {
        self.insert(fully_qualified_name, address);
        self
    }

    pub fn get(&self, fully_qualified_name: &str) -> Option<&Address> {
        self.0.get(fully_qualified_name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Bytecode with every library placeholder resolved.
#[derive(Clone, PartialEq, Eq)]
pub struct LinkedBytecode {
    code: Vec<u8>,
}

impl LinkedBytecode {
    pub fn as_bytes(&self) -> &[u8] {
        &self.code
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.code))
    }
}

impl fmt::Debug for LinkedBytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkedBytecode({} bytes)", self.code.len())
    }
}

pub struct Linker;

impl Linker {
    /// `__$` + first 34 hex characters of `keccak256(fqn)` + `$__`
    pub fn placeholder(fully_qualified_name: &str) -> String {
        let tag = hex::encode(keccak256(fully_qualified_name.as_bytes()));
        format!("__${}$__", &tag[..TAG_HEX_LEN])
    }

    /// Resolves every link reference of `artifact` and decodes the result.
    pub fn link(
        artifact: &Artifact,
        libraries: &LibraryAddresses,
    ) -> Result<LinkedBytecode, LinkError> {
        let object = artifact.bytecode.object.trim();
        let mut text = object
            .strip_prefix("0x")
            .unwrap_or(object)
            .as_bytes()
            .to_vec();

        for (file, libs) in &artifact.bytecode.link_references {
            for (name, references) in libs {
                let fqn = format!("{file}:{name}");
                let address = libraries
                    .get(&fqn)
                    .ok_or_else(|| LinkError::UnresolvedLibrary(fqn.clone()))?;
                let expected = Self::placeholder(&fqn);
                let replacement = address.to_hex();

                for reference in references {
                    if reference.length != ADDRESS_SIZE {
                        return Err(LinkError::InvalidReferenceLength {
                            fqn,
                            length: reference.length,
                        });
                    }
                    let slot = reference
                        .start
                        .checked_mul(2)
                        .and_then(|start| Some(start..start.checked_add(2 * ADDRESS_SIZE)?))
                        .and_then(|range| text.get_mut(range))
                        .ok_or_else(|| LinkError::ReferenceOutOfBounds {
                            fqn: fqn.clone(),
                            start: reference.start,
                        })?;
                    if slot != expected.as_bytes() {
                        return Err(LinkError::PlaceholderMismatch {
                            fqn,
                            start: reference.start,
                            expected,
                            found: String::from_utf8_lossy(slot).into_owned(),
                        });
                    }
                    slot.copy_from_slice(replacement.as_bytes());
                    debug!(library = %fqn, %address, offset = reference.start, "linked library");
                }
            }
        }

        let marker = PLACEHOLDER_MARKER.as_bytes();
        if let Some(position) = text.windows(marker.len()).position(|w| w == marker) {
            let end = (position + 2 * ADDRESS_SIZE).min(text.len());
            return Err(LinkError::LeftoverPlaceholder {
                placeholder: String::from_utf8_lossy(&text[position..end]).into_owned(),
                offset: position / 2,
            });
        }

        Ok(LinkedBytecode {
            code: hex::decode(&text)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Bytecode, LinkReference};
    use popsig_config::BLS_LIBRARY_FQN;

    fn artifact(object: &str, refs: &[(&str, &str, usize)]) -> Artifact {
        let mut link_references: BTreeMap<String, BTreeMap<String, Vec<LinkReference>>> =
            BTreeMap::new();
        for (file, name, start) in refs {
            link_references
                .entry(file.to_string())
                .or_default()
                .entry(name.to_string())
                .or_default()
                .push(LinkReference {
                    start: *start,
                    length: 20,
                });
        }
        Artifact {
            abi: Vec::new(),
            bytecode: Bytecode {
                object: object.to_string(),
                link_references,
            },
        }
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(
            Linker::placeholder(BLS_LIBRARY_FQN),
            "__$43243e7c7dc48091feaf19f297700a8e07$__"
        );
        assert_eq!(Linker::placeholder(BLS_LIBRARY_FQN).len(), 40);
    }

    #[test]
    fn test_link_replaces_placeholder() {
        let object = format!("0x73{}00", Linker::placeholder(BLS_LIBRARY_FQN));
        let address = Address::new([0xab; 20]);
        let libraries = LibraryAddresses::new().with(BLS_LIBRARY_FQN, address);

        let linked =
            Linker::link(&artifact(&object, &[("src/bls12381/BLS.sol", "BLS", 1)]), &libraries)
                .unwrap();
        let mut expected = vec![0x73];
        expected.extend_from_slice(&[0xab; 20]);
        expected.push(0x00);
        assert_eq!(linked.as_bytes(), expected.as_slice());
        assert_eq!(linked.to_hex(), format!("0x73{}00", "ab".repeat(20)));
    }

    #[test]
    fn test_missing_library_address() {
        let object = format!("0x73{}00", Linker::placeholder(BLS_LIBRARY_FQN));
        let result = Linker::link(
            &artifact(&object, &[("src/bls12381/BLS.sol", "BLS", 1)]),
            &LibraryAddresses::new(),
        );
        assert_eq!(
            result.unwrap_err(),
            LinkError::UnresolvedLibrary(BLS_LIBRARY_FQN.to_string())
        );
    }

    #[test]
    fn test_placeholder_without_reference_is_rejected() {
        let object = format!("0x73{}00", Linker::placeholder(BLS_LIBRARY_FQN));
        let result = Linker::link(&artifact(&object, &[]), &LibraryAddresses::new());
        assert!(matches!(
            result,
            Err(LinkError::LeftoverPlaceholder { offset: 1, .. })
        ));
    }

    #[test]
    fn test_reference_must_point_at_the_placeholder() {
        let object = format!("0x73{}00", Linker::placeholder("src/Other.sol:Other"));
        let libraries = LibraryAddresses::new().with(BLS_LIBRARY_FQN, Address::ZERO);

        let mismatch =
            Linker::link(&artifact(&object, &[("src/bls12381/BLS.sol", "BLS", 1)]), &libraries);
        assert!(matches!(mismatch, Err(LinkError::PlaceholderMismatch { start: 1, .. })));

        let out_of_bounds =
            Linker::link(&artifact(&object, &[("src/bls12381/BLS.sol", "BLS", 5)]), &libraries);
        assert!(matches!(out_of_bounds, Err(LinkError::ReferenceOutOfBounds { start: 5, .. })));
    }

    #[test]
    fn test_huge_reference_start_is_out_of_bounds() {
        let object = format!("0x73{}00", Linker::placeholder(BLS_LIBRARY_FQN));
        let libraries = LibraryAddresses::new().with(BLS_LIBRARY_FQN, Address::ZERO);

        for start in [usize::MAX, usize::MAX / 2, usize::MAX / 2 - 5] {
            let result =
                Linker::link(&artifact(&object, &[("src/bls12381/BLS.sol", "BLS", start)]), &libraries);
            assert_eq!(
                result.unwrap_err(),
                LinkError::ReferenceOutOfBounds {
                    fqn: BLS_LIBRARY_FQN.to_string(),
                    start,
                }
            );
        }
    }

    #[test]
    fn test_hex_errors_compare_by_value() {
        let err = Linker::link(&artifact("0x6g", &[]), &LibraryAddresses::new()).unwrap_err();
        assert_eq!(
            err,
            LinkError::InvalidHex(hex::FromHexError::InvalidHexCharacter { c: 'g', index: 1 })
        );
        assert_ne!(err, LinkError::InvalidHex(hex::FromHexError::OddLength));
    }

    #[test]
    fn test_plain_bytecode_links_without_libraries() {
        let linked = Linker::link(&artifact("0x6080", &[]), &LibraryAddresses::new()).unwrap();
        assert_eq!(linked.as_bytes(), &[0x60, 0x80]);
        assert!(matches!(
            Linker::link(&artifact("0x6g", &[]), &LibraryAddresses::new()),
            Err(LinkError::InvalidHex(_))
        ));
    }
}

//! Compiler artifacts in the forge `out/<File>.sol/<Name>.json` layout.

use crate::error::ChainResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Placeholder marker left by the compiler where a library address goes
pub const PLACEHOLDER_MARKER: &str = "__$";

/// A parameter in an ABI entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "internalType", default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
}

impl AbiParam {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            internal_type: Some(kind.to_string()),
        }
    }
}

/// An entry of the contract ABI (functions, events, errors, constructor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub inputs: Vec<AbiParam>,

    #[serde(default)]
    pub outputs: Vec<AbiParam>,

    #[serde(rename = "stateMutability", default)]
    pub state_mutability: String,
}

impl AbiEntry {
    /// Canonical signature, e.g. `verify(bytes,bytes,bytes)`
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.kind.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }
}

/// Where a library address must be patched in, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    pub start: usize,
    pub length: usize,
}

/// Creation bytecode with its unresolved library references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bytecode {
    /// `0x`-prefixed hex, possibly containing `__$…$__` placeholders.
    pub object: String,

    /// file → library name → references
    #[serde(rename = "linkReferences", default)]
    pub link_references: BTreeMap<String, BTreeMap<String, Vec<LinkReference>>>,
}

/// A compiled contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub abi: Vec<AbiEntry>,
    pub bytecode: Bytecode,
}

impl Artifact {
    pub fn from_json_str(json: &str) -> ChainResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> ChainResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> ChainResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> ChainResult<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// Signatures of the ABI functions
    pub fn function_signatures(&self) -> Vec<String> {
        self.abi
            .iter()
            .filter(|entry| entry.kind == "function")
            .map(AbiEntry::signature)
            .collect()
    }

    /// Fully-qualified names of the libraries this bytecode references
    pub fn libraries(&self) -> Vec<String> {
        self.bytecode
            .link_references
            .iter()
            .flat_map(|(file, libs)| libs.keys().map(move |name| format!("{file}:{name}")))
            .collect()
    }

    /// True while the bytecode still contains a library placeholder
    pub fn has_unresolved_placeholders(&self) -> bool {
        self.bytecode.object.contains(PLACEHOLDER_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORGE_JSON: &str = r#"{
        "abi": [
            {
                "type": "function",
                "name": "verify",
                "inputs": [
                    {"name": "pk", "type": "bytes", "internalType": "bytes"},
                    {"name": "message", "type": "bytes", "internalType": "bytes"},
                    {"name": "signature", "type": "bytes", "internalType": "bytes"}
                ],
                "outputs": [{"name": "", "type": "bool", "internalType": "bool"}],
                "stateMutability": "view"
            },
            {"type": "event", "name": "Verified", "inputs": [], "anonymous": false}
        ],
        "bytecode": {
            "object": "0x73__$43243e7c7dc48091feaf19f297700a8e07$__00",
            "sourceMap": "",
            "linkReferences": {
                "src/bls12381/BLS.sol": {"BLS": [{"start": 1, "length": 20}]}
            }
        },
        "methodIdentifiers": {"verify(bytes,bytes,bytes)": "de8f50a1"}
    }"#;

    #[test]
    fn test_parse_forge_artifact() {
        let artifact = Artifact::from_json_str(FORGE_JSON).unwrap();

        assert_eq!(artifact.function_signatures(), vec!["verify(bytes,bytes,bytes)"]);
        assert_eq!(artifact.libraries(), vec!["src/bls12381/BLS.sol:BLS"]);
        assert!(artifact.has_unresolved_placeholders());
        assert_eq!(artifact.abi[1].kind, "event");
    }

    #[test]
    fn test_file_round_trip() {
        let artifact = Artifact::from_json_str(FORGE_JSON).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BLSTest.json");

        artifact.save_to_file(&path).unwrap();
        assert_eq!(Artifact::load_from_file(&path).unwrap(), artifact);
        assert!(Artifact::load_from_file(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_invalid_json() {
        assert!(Artifact::from_json_str("{\"abi\": 1}").is_err());
    }
}

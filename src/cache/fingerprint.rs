//! Content fingerprints of compile inputs
//!
//! A fingerprint is a BLAKE3 digest over the canonical JSON of everything
//! that can change a compiled tree: every view of the inheritance chain
//! (root first) and the ordered extension set of the target view.

use crate::error::{EngineError, EngineResult};
use crate::model::{AttributeEdits, Extension, Node, Operation, ViewContent};
use crate::resolver::InheritanceChain;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

const DOMAIN: &[u8] = b"view-compose/fingerprint/v1\n";
const EXTENSIONS_MARKER: &[u8] = b"\nextensions\n";

/// 256-bit digest of compile inputs
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Wrap raw digest bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First eight hex digits, for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl FromStr for Fingerprint {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.to_hex()
    }
}

#[derive(Serialize)]
struct ViewInput<'a> {
    content: &'a ViewContent,
    updated_at: u64,
}

#[derive(Serialize)]
struct ExtensionInput<'a> {
    selector: &'a str,
    operation: Operation,
    payload: Option<&'a [Node]>,
    attribute_edits: Option<&'a AttributeEdits>,
    updated_at: u64,
}

impl<'a> From<&'a Extension> for ExtensionInput<'a> {
    fn from(ext: &'a Extension) -> Self {
        Self {
            selector: &ext.patch.selector,
            operation: ext.patch.operation,
            payload: ext.patch.payload.as_deref(),
            attribute_edits: ext.patch.attribute_edits.as_ref(),
            updated_at: ext.updated_at,
        }
    }
}

fn serialization(err: impl fmt::Display) -> EngineError {
    EngineError::Serialization(err.to_string())
}

/// Fingerprint a resolved chain and an already ordered extension set.
///
/// Extension ids and activity flags are not hashed: only what changes the
/// output does. Reordering `extensions` changes the digest.
pub fn fingerprint(
    chain: &InheritanceChain,
    extensions: &[Extension],
) -> EngineResult<Fingerprint> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DOMAIN);

    for view in chain.views() {
        let input = ViewInput {
            content: &view.content,
            updated_at: view.updated_at,
        };
        serde_json::to_writer(&mut hasher, &input).map_err(serialization)?;
        hasher.write_all(b"\n").map_err(serialization)?;
    }

    hasher.update(EXTENSIONS_MARKER);
    for ext in extensions {
        serde_json::to_writer(&mut hasher, &ExtensionInput::from(ext)).map_err(serialization)?;
        hasher.write_all(b"\n").map_err(serialization)?;
    }

    Ok(Fingerprint(*hasher.finalize().as_bytes()))
}

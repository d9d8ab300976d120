//! Hashing file contents into the [`Digest`] that names an ancestor blob.

use std::fmt;

use anyhow::{Context, Result, ensure};
use data_encoding::HEXLOWER;
use sha2::{Digest as _, Sha256};

/// The SHA-256 of some file contents, spelled as 64 lowercase hex digits.
///
/// Identical digests mean identical bytes; that's the whole contract the
/// ancestor store is built on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Digest {
    bytes: [u8; 32],
}

impl Digest {
    /// Calculates the digest of the given bytes
    pub fn hash(bytes: &[u8]) -> Self {
        Self {
            bytes: Sha256::digest(bytes).into(),
        }
    }

    /// Gets a shortened version of the digest that's unique enough for logs.
    pub fn short_name(&self) -> String {
        let mut full = format!("{self}");
        let _rest = full.split_off(8);
        full
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ digest: {} }}", HEXLOWER.encode(&self.bytes))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.bytes))
    }
}

impl std::str::FromStr for Digest {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = HEXLOWER
            .decode(s.as_bytes())
            .with_context(|| format!("Couldn't decode {s} as lowercase hex"))?;

        ensure!(decoded.len() == 32, "Expected 64 hex digits of SHA-256");
        let mut bytes = [0; 32];
        bytes.copy_from_slice(&decoded);
        Ok(Digest { bytes })
    }
}

// The state file is human-readable JSON, so a digest is always the hex
// string there, never raw bytes.
impl serde::Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&HEXLOWER.encode(&self.bytes))
    }
}

impl<'de> serde::Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Digest, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

//! Storage key derivation.

use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Hex SHA-256 digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Addresses one (graph, variant) slot in the distribution store.
///
/// The scope component is a truncated hash of the caller's credential, so
/// registry and gateway derive the same key from the same credential while
/// the credential itself never appears in storage paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub scope: String,
    pub graph: String,
    pub variant: String,
}

impl StorageKey {
    /// Characters of the credential hash kept in the key.
    const SCOPE_LEN: usize = 16;

    pub fn derive(credential: &str, graph: &str, variant: &str) -> Self {
        let mut scope = sha256_hex(credential.as_bytes());
        scope.truncate(Self::SCOPE_LEN);
        Self {
            scope,
            graph: graph.to_string(),
            variant: variant.to_string(),
        }
    }

    /// Directory for this key under a file-store root.
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(&self.scope).join(&self.graph).join(&self.variant)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.scope, self.graph, self.variant)
    }
}

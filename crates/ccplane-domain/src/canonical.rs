//! Configuration hash canonicalization — the wire contract with the CSoT
//! (spec §6). Both sides of the contract must produce byte-identical
//! output for the same effective configuration or drift becomes spurious.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Canonical descriptor of an effective configuration, prior to hashing.
#[derive(Debug, Clone)]
pub struct ConfigDescriptor {
    pub application: String,
    pub profile: String,
    pub label: String,
    pub version: String,
    /// Arbitrary key/value properties. Order does not matter — `canonicalize`
    /// sorts them lexicographically by key.
    pub properties: BTreeMap<String, String>,
}

/// Produce the canonical byte sequence: the `application|profile|label|version\n`
/// prefix, then one `key=value\n` line per property in lexicographic key
/// order, with no trailing newline beyond the last property line.
pub fn canonicalize(desc: &ConfigDescriptor) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&desc.application);
    out.push('|');
    out.push_str(&desc.profile);
    out.push('|');
    out.push_str(&desc.label);
    out.push('|');
    out.push_str(&desc.version);

    let mut lines: Vec<String> = desc
        .properties
        .iter()
        .map(|(k, v)| format!("{k}={v}\n"))
        .collect();
    // BTreeMap iteration is already key-sorted; this is defensive against
    // callers constructing `properties` from an unsorted source.
    lines.sort();

    let joined = lines.concat();
    if !joined.is_empty() {
        out.push('\n');
        out.push_str(joined.trim_end_matches('\n'));
    }
    out.into_bytes()
}

/// SHA-256 over the canonical form, hex-encoded lowercase.
pub fn hash_canonical(desc: &ConfigDescriptor) -> String {
    let bytes = canonicalize(desc);
    let digest = Sha256::digest(&bytes);
    hex_lower(&digest)
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

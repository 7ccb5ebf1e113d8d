//! Local registry of known tokens.
//!
//! The registry is the search space for intermediate routing hops and the
//! list shown for balances. It is operator-curated and expected to stay
//! small.

use crate::error::DexError;
use crate::types::{Address, TokenDescriptor, TokenId};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
enum Storage {
    /// JSON array on disk, re-read on every access.
    File(PathBuf),
    /// Process-local list, for tests and dry runs.
    Memory(Vec<Value>),
}

/// Durable list of token descriptors keyed by address.
///
/// Entries are kept as raw JSON objects. Fields this crate does not know
/// about, and entries that only carry an address, survive every write.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    storage: Storage,
}

impl TokenRegistry {
    /// A registry persisted as a JSON file at `path`. The file need not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            storage: Storage::File(path.into()),
        }
    }

    /// A registry that lives only in memory.
    pub fn in_memory(tokens: Vec<TokenDescriptor>) -> Self {
        let entries = tokens
            .iter()
            .filter_map(|t| serde_json::to_value(t).ok())
            .collect();
        Self {
            storage: Storage::Memory(entries),
        }
    }

    /// Backing file, if the registry is persisted.
    pub fn path(&self) -> Option<&Path> {
        match &self.storage {
            Storage::File(path) => Some(path),
            Storage::Memory(_) => None,
        }
    }

    /// All registered tokens in insertion order.
    ///
    /// Never fails: missing or unreadable storage reads as an empty
    /// registry, and entries that are not full descriptors are skipped.
    pub fn list(&self) -> Vec<TokenDescriptor> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<TokenDescriptor>(entry) {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!(error = %e, "Skipping incomplete token entry");
                    None
                }
            })
            .collect()
    }

    /// Look up a token by address.
    pub fn find(&self, address: Address) -> Option<TokenDescriptor> {
        self.list().into_iter().find(|t| t.address == address)
    }

    /// Merge `entry` into the stored entry with the same address, or append
    /// it. Fields of the stored entry that `entry` does not set are kept, as
    /// is every other entry. Persists immediately.
    pub fn upsert(&mut self, entry: TokenDescriptor) -> Result<(), DexError> {
        let update = serde_json::to_value(&entry)
            .map_err(|e| DexError::Registry(format!("encoding token: {e}")))?;

        let mut entries = self.entries();
        match entries
            .iter_mut()
            .find(|stored| entry_address(stored) == Some(entry.address))
        {
            Some(stored) => merge(stored, update),
            None => entries.push(update),
        }

        match &mut self.storage {
            Storage::Memory(stored) => {
                *stored = entries;
                Ok(())
            }
            Storage::File(path) => write_entries(path, &entries),
        }
    }

    /// Tokens eligible as intermediate hops for a swap from `token_in` to
    /// `token_out`: every entry with a parseable address, minus the swap's
    /// own tokens, de-duplicated, in registry order.
    pub fn candidate_hops(&self, token_in: TokenId, token_out: TokenId) -> Vec<TokenId> {
        let mut seen = HashSet::new();
        self.entries()
            .iter()
            .filter_map(entry_address)
            .filter(|a| *a != token_in && *a != token_out && !a.is_zero())
            .filter(|a| seen.insert(*a))
            .collect()
    }

    fn entries(&self) -> Vec<Value> {
        match &self.storage {
            Storage::Memory(entries) => entries.clone(),
            Storage::File(path) => read_entries(path),
        }
    }
}

fn entry_address(entry: &Value) -> Option<Address> {
    entry.get("address")?.as_str()?.parse().ok()
}

/// Shallow merge: top-level fields of `update` overwrite those of `stored`.
fn merge(stored: &mut Value, update: Value) {
    match (stored, update) {
        (Value::Object(stored), Value::Object(update)) => stored.extend(update),
        (stored, update) => *stored = update,
    }
}

fn read_entries(path: &Path) -> Vec<Value> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Token registry unreadable, treating as empty");
            return Vec::new();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Token registry is not a JSON array, treating as empty");
            Vec::new()
        }
    }
}

fn write_entries(path: &Path, entries: &[Value]) -> Result<(), DexError> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| DexError::Registry(format!("encoding tokens: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| DexError::Registry(format!("writing {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(byte: u8, symbol: &str) -> TokenDescriptor {
        TokenDescriptor::new(Address::repeat_byte(byte), symbol, format!("{symbol} Token"), 18)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TokenRegistry::open(dir.path().join("tokens.json"));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_garbage_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "not json").unwrap();

        let registry = TokenRegistry::open(&path);
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_upsert_appends_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let mut registry = TokenRegistry::open(&path);

        registry.upsert(token(0x01, "AAA")).unwrap();
        registry.upsert(token(0x02, "BBB")).unwrap();
        registry.upsert(token(0x01, "AA2")).unwrap();

        let tokens = registry.list();
        assert_eq!(tokens.len(), 2);
        // Replacement keeps the original position
        assert_eq!(tokens[0].symbol, "AA2");
        assert_eq!(tokens[1].symbol, "BBB");

        // Persisted immediately: a fresh handle sees the same contents
        assert_eq!(TokenRegistry::open(&path).list(), tokens);
    }

    #[test]
    fn test_address_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(
            &path,
            r#"[{"address":"0xabababababababababababababababababababab","symbol":"LOW","name":"","decimals":6}]"#,
        )
        .unwrap();

        let mut registry = TokenRegistry::open(&path);
        let upper: Address = "0xABABABABABABABABABABABABABABABABABABABAB".parse().unwrap();
        registry
            .upsert(TokenDescriptor::new(upper, "UP", "Upper", 6))
            .unwrap();

        let tokens = registry.list();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].symbol, "UP");
        assert_eq!(registry.find(upper).unwrap().name, "Upper");
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(
            &path,
            r#"[
                {"address":"0x0101010101010101010101010101010101010101","symbol":"A","name":"A","decimals":18},
                {"address":"nope","symbol":"B","name":"B","decimals":18},
                {"address":"0x0303030303030303030303030303030303030303","decimals":6}
            ]"#,
        )
        .unwrap();

        let tokens = TokenRegistry::open(&path).list();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].decimals, 6);
        assert_eq!(tokens[1].symbol, "");
    }

    #[test]
    fn test_candidate_hops() {
        let registry = TokenRegistry::in_memory(vec![
            token(0x01, "IN"),
            token(0x03, "MID1"),
            token(0x02, "OUT"),
            token(0x03, "DUP"),
            token(0x04, "MID2"),
        ]);

        let hops = registry.candidate_hops(Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        assert_eq!(
            hops,
            vec![Address::repeat_byte(0x03), Address::repeat_byte(0x04)]
        );
    }

    #[test]
    fn test_address_only_entries_route_and_survive_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(
            &path,
            r#"[{"address":"0x0101010101010101010101010101010101010101","symbol":"HOP","note":"curated"}]"#,
        )
        .unwrap();

        let mut registry = TokenRegistry::open(&path);
        assert!(registry.list().is_empty());
        assert_eq!(
            registry.candidate_hops(Address::repeat_byte(0x0a), Address::repeat_byte(0x0b)),
            vec![Address::repeat_byte(0x01)]
        );

        registry.upsert(token(0x02, "NEW")).unwrap();

        let raw: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0]["symbol"], "HOP");
        assert_eq!(raw[0]["note"], "curated");
        assert_eq!(raw[1]["symbol"], "NEW");
        assert_eq!(
            registry.candidate_hops(Address::repeat_byte(0x0a), Address::repeat_byte(0x0b)),
            vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)]
        );
    }

    #[test]
    fn test_upsert_merges_into_partial_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(
            &path,
            r#"[{"address":"0x0101010101010101010101010101010101010101","note":"curated"}]"#,
        )
        .unwrap();

        let mut registry = TokenRegistry::open(&path);
        registry.upsert(token(0x01, "AAA")).unwrap();

        let tokens = registry.list();
        assert_eq!(tokens, vec![token(0x01, "AAA")]);
        let raw: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0]["note"], "curated");
    }
}

//! Two-level (in-memory + on-disk) CST cache keyed by grammar hash and
//! source path, gated by mtime (spec.md §4.6 `CA`).
//!
//! Read policy: an in-memory hit returns immediately; otherwise fall back
//! to disk, and promote a disk hit into memory. A disk entry whose
//! recorded source mtime is older than the caller's current mtime is a
//! miss, never an error -- any I/O error during load is likewise a miss.
//! Write policy: insert into memory first, then best-effort persist to
//! disk; an I/O error during save is logged, not fatal.

mod tree_ser;

pub use tree_ser::SerializedElement;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const FORMAT_VERSION: u32 = 1;
const DEFAULT_MAX_ENTRIES: usize = 4096;
const DEFAULT_EVICTION_HORIZON: Duration = Duration::from_secs(60 * 60 * 24);

#[derive(Clone)]
struct MemEntry {
    tree: SerializedElement,
    lines: Vec<String>,
    mtime: SystemTime,
    last_used: SystemTime,
}

/// On-disk serialization of one cache entry (spec.md §6 cache layout):
/// format version, creation timestamp, source mtime at save time, the
/// source split into keepends lines, and the serialized CST.
#[derive(Serialize, Deserialize)]
struct DiskEntry {
    format_version: u32,
    created_at: u64,
    source_mtime: u64,
    lines: Vec<String>,
    tree: SerializedElement,
}

/// A cached parse result: the serialized tree plus the source lines it was
/// parsed from (callers rebuild a `rowan::GreenNode` via
/// [`SerializedElement`]'s conversion, or `tree_ser::deserialize_root`).
pub struct CachedParse {
    pub tree: SerializedElement,
    pub lines: Vec<String>,
}

pub struct Cache {
    memory: RwLock<FxHashMap<String, FxHashMap<PathBuf, MemEntry>>>,
    cache_dir: Option<PathBuf>,
    max_entries: usize,
    eviction_horizon: Duration,
}

impl Cache {
    /// A cache with no disk backing -- memory only, e.g. for tests or a
    /// caller that never set `cache_path`.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self {
            memory: RwLock::new(FxHashMap::default()),
            cache_dir,
            max_entries: DEFAULT_MAX_ENTRIES,
            eviction_horizon: DEFAULT_EVICTION_HORIZON,
        }
    }

    pub fn with_eviction_policy(mut self, max_entries: usize, eviction_horizon: Duration) -> Self {
        self.max_entries = max_entries;
        self.eviction_horizon = eviction_horizon;
        self
    }

    /// `load(grammar_hash, path)`: an in-memory hit returns regardless of
    /// `source_mtime` freshness (the caller just wrote it); a disk hit is
    /// only valid if its recorded mtime is at least as new as
    /// `source_mtime`.
    pub fn load(&self, grammar_hash: &str, path: &Path, source_mtime: SystemTime) -> Option<CachedParse> {
        if let Some(hit) = self.load_from_memory(grammar_hash, path) {
            return Some(hit);
        }
        self.load_from_disk(grammar_hash, path, source_mtime)
    }

    fn load_from_memory(&self, grammar_hash: &str, path: &Path) -> Option<CachedParse> {
        let mem = self.memory.read().unwrap();
        let entry = mem.get(grammar_hash)?.get(path)?;
        Some(CachedParse {
            tree: entry.tree.clone(),
            lines: entry.lines.clone(),
        })
    }

    fn disk_path(&self, grammar_hash: &str, path: &Path) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let prefix = &grammar_hash[..grammar_hash.len().min(2)];
        Some(
            dir.join(prefix)
                .join(grammar_hash)
                .join(format!("{}.json", hash_path(path))),
        )
    }

    fn load_from_disk(&self, grammar_hash: &str, path: &Path, source_mtime: SystemTime) -> Option<CachedParse> {
        let disk_path = self.disk_path(grammar_hash, path)?;
        let bytes = fs::read(&disk_path).ok()?;
        let entry: DiskEntry = serde_json::from_slice(&bytes).ok()?;
        let entry_mtime = UNIX_EPOCH + Duration::from_secs(entry.source_mtime);
        if entry_mtime < source_mtime {
            return None;
        }
        self.memory
            .write()
            .unwrap()
            .entry(grammar_hash.to_string())
            .or_default()
            .insert(
                path.to_path_buf(),
                MemEntry {
                    tree: entry.tree.clone(),
                    lines: entry.lines.clone(),
                    mtime: entry_mtime,
                    last_used: SystemTime::now(),
                },
            );
        Some(CachedParse {
            tree: entry.tree,
            lines: entry.lines,
        })
    }

    /// `save(grammar_hash, path, tree, lines)`: insert into memory, touch
    /// `last_used`, evict if over threshold, then best-effort persist.
    pub fn save(
        &self,
        grammar_hash: &str,
        path: &Path,
        tree: SerializedElement,
        lines: Vec<String>,
        source_mtime: SystemTime,
    ) {
        let now = SystemTime::now();
        {
            let mut mem = self.memory.write().unwrap();
            mem.entry(grammar_hash.to_string()).or_default().insert(
                path.to_path_buf(),
                MemEntry {
                    tree: tree.clone(),
                    lines: lines.clone(),
                    mtime: source_mtime,
                    last_used: now,
                },
            );
        }
        self.evict_if_needed();

        if let Some(disk_path) = self.disk_path(grammar_hash, path) {
            let disk_entry = DiskEntry {
                format_version: FORMAT_VERSION,
                created_at: epoch_secs(now),
                source_mtime: epoch_secs(source_mtime),
                lines,
                tree,
            };
            if let Err(err) = write_disk_entry(&disk_path, &disk_entry) {
                eprintln!(
                    "pycst-cache: failed to persist {}: {err}",
                    disk_path.display()
                );
            }
        }
    }

    fn evict_if_needed(&self) {
        let mut mem = self.memory.write().unwrap();
        let total: usize = mem.values().map(|m| m.len()).sum();
        if total <= self.max_entries {
            return;
        }
        let now = SystemTime::now();
        let horizon = self.eviction_horizon;
        for per_grammar in mem.values_mut() {
            per_grammar.retain(|_, entry| {
                now.duration_since(entry.last_used)
                    .map(|age| age < horizon)
                    .unwrap_or(true)
            });
        }
    }
}

fn write_disk_entry(disk_path: &Path, entry: &DiskEntry) -> std::io::Result<()> {
    if let Some(parent) = disk_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec(entry)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    fs::write(disk_path, json)
}

fn epoch_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// `sha256(path)`, hex-encoded, used as the on-disk filename component
/// (spec.md §6: `<cache_dir>/<hash[:2]>/<hash>/<sha256(path)>`).
pub fn hash_path(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `sha256(grammar_text)`, hex-encoded, the `grammar_hash` every cache
/// lookup is keyed by.
pub fn hash_grammar_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> SerializedElement {
        SerializedElement::Node {
            kind: 256,
            children: vec![SerializedElement::Token {
                kind: 1,
                text: "x".to_string(),
            }],
        }
    }

    #[test]
    fn memory_hit_ignores_mtime() {
        let cache = Cache::in_memory();
        let path = Path::new("a.py");
        let now = SystemTime::now();
        cache.save("g1", path, sample_tree(), vec!["x\n".to_string()], now);
        let hit = cache.load("g1", path, now + Duration::from_secs(3600));
        assert!(hit.is_some());
    }

    #[test]
    fn disk_miss_is_not_an_error() {
        let dir = std::env::temp_dir().join("pycst-cache-test-miss");
        let cache = Cache::new(Some(dir));
        let hit = cache.load("nonexistent-hash", Path::new("missing.py"), SystemTime::now());
        assert!(hit.is_none());
    }

    #[test]
    fn disk_round_trip_survives_a_fresh_cache_instance() {
        let dir = std::env::temp_dir().join(format!(
            "pycst-cache-test-{}",
            hash_path(Path::new(&format!("{:?}", SystemTime::now())))
        ));
        let path = Path::new("b.py");
        let mtime = SystemTime::now();

        {
            let cache = Cache::new(Some(dir.clone()));
            cache.save("g2", path, sample_tree(), vec!["x\n".to_string()], mtime);
        }

        let fresh = Cache::new(Some(dir.clone()));
        let hit = fresh.load("g2", path, mtime).expect("disk entry should be found");
        assert_eq!(hit.lines, vec!["x\n".to_string()]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn stale_disk_entry_is_a_miss() {
        let dir = std::env::temp_dir().join("pycst-cache-test-stale");
        let path = Path::new("c.py");
        let old_mtime = SystemTime::now();

        {
            let cache = Cache::new(Some(dir.clone()));
            cache.save("g3", path, sample_tree(), vec![], old_mtime);
        }

        let fresh = Cache::new(Some(dir.clone()));
        let newer = old_mtime + Duration::from_secs(10);
        assert!(fresh.load("g3", path, newer).is_none());

        let _ = fs::remove_dir_all(&dir);
    }
}

use std::num::NonZeroUsize;
use std::sync::OnceLock;

use gridclip_engine::matrix::CellMatrix;
use gridclip_engine::range::Range;
use gridclip_engine::sheet::SheetId;
use lru::LruCache;
use regex::Regex;

use crate::types::CopyKind;

/// Snapshot of one copy operation, kept for internal paste.
///
/// `rows`/`cols` are the logical source dimensions. They can exceed what the
/// sparse matrix's populated cells suggest (merge-covered positions are
/// absent) and can differ from `range` (a filtered copy packs visible rows).
#[derive(Debug, Clone)]
pub struct CopyCacheEntry {
    pub workbook_id: String,
    pub worksheet_id: SheetId,
    pub range: Range,
    pub rows: usize,
    pub cols: usize,
    pub matrix: CellMatrix,
    pub copy_kind: CopyKind,
}

/// Bounded keyed store of copy snapshots.
///
/// `get` hands out a deep clone: a stored entry is never mutated in place,
/// so a later paste of the same copy id sees the original data even if an
/// earlier paste rewrote its private copy (style re-resolution, tiling).
pub struct CopyContentCache {
    entries: LruCache<String, CopyCacheEntry>,
}

impl CopyContentCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Store an entry under a freshly generated id and return the id.
    pub fn put(&mut self, entry: CopyCacheEntry) -> String {
        let id = gen_copy_id();
        self.entries.put(id.clone(), entry);
        id
    }

    pub fn get(&mut self, id: &str) -> Option<CopyCacheEntry> {
        self.entries.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<CopyCacheEntry> {
        self.entries.pop(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Generate a collision-resistant copy id: a random 128-bit nonce in hex.
pub fn gen_copy_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Stamp a copy id onto the first element of an HTML fragment as a
/// `data-copy-id` attribute.
pub fn stamp_copy_id(html: &str, id: &str) -> String {
    static OPEN_TAG: OnceLock<Regex> = OnceLock::new();
    let re = OPEN_TAG.get_or_init(|| Regex::new(r"<[a-z]+").unwrap());
    re.replace(html, |caps: &regex::Captures<'_>| {
        format!("{} data-copy-id=\"{}\"", &caps[0], id)
    })
    .into_owned()
}

/// Extract the embedded copy id from external HTML, if present.
pub fn extract_copy_id(html: &str) -> Option<String> {
    static COPY_ID: OnceLock<Regex> = OnceLock::new();
    let re = COPY_ID.get_or_init(|| Regex::new(r#"data-copy-id="([^"]+)""#).unwrap());
    re.captures(html).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridclip_engine::cell::Cell;

    fn entry() -> CopyCacheEntry {
        let mut matrix = CellMatrix::new();
        matrix.set(0, 0, Cell::from_input("1"));
        CopyCacheEntry {
            workbook_id: "book1".to_string(),
            worksheet_id: SheetId(1),
            range: Range::new(0, 0, 0, 0),
            rows: 1,
            cols: 1,
            matrix,
            copy_kind: CopyKind::Copy,
        }
    }

    #[test]
    fn test_put_get_remove() {
        let mut cache = CopyContentCache::new(4);
        let id = cache.put(entry());
        assert!(cache.contains(&id));
        assert_eq!(cache.get(&id).unwrap().workbook_id, "book1");
        cache.remove(&id);
        assert!(cache.get(&id).is_none());
    }

    #[test]
    fn test_eviction_drops_oldest() {
        let mut cache = CopyContentCache::new(2);
        let a = cache.put(entry());
        let b = cache.put(entry());
        // Touch `a` so `b` becomes the eviction candidate.
        cache.get(&a);
        let c = cache.put(entry());
        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
    }

    #[test]
    fn test_ids_unique() {
        let a = gen_copy_id();
        let b = gen_copy_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_stamp_and_extract_round_trip() {
        let html = "<table><tr><td>1</td></tr></table>";
        let stamped = stamp_copy_id(html, "abc123");
        assert!(stamped.starts_with("<table data-copy-id=\"abc123\">"));
        assert_eq!(extract_copy_id(&stamped).as_deref(), Some("abc123"));
        assert_eq!(extract_copy_id(html), None);
    }

    #[test]
    fn test_get_returns_clone() {
        let mut cache = CopyContentCache::new(2);
        let id = cache.put(entry());
        let mut copy = cache.get(&id).unwrap();
        copy.matrix.set(5, 5, Cell::from_input("mutated"));
        // The cached original is untouched.
        assert!(cache.get(&id).unwrap().matrix.get(5, 5).is_none());
    }
}

//! Summary index: header slot → structured key lookup.
//!
//! Built once from a header stream and immutable afterwards, so an
//! `Arc<SummaryIndex>` can be shared across reader threads without locking.

use std::collections::HashMap;
use std::io::{BufRead, Seek};
use std::path::Path;

use log::{debug, warn};
use time::PrimitiveDateTime;

use crate::core::KeywordReader;
use crate::error::Result;
use crate::summary::category::VarCategory;
use crate::summary::header::SummaryHeader;
use crate::summary::key::{Qualifier, RawNode, SummaryKey};

/// One header slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryNode {
    /// `None` for placeholder entries that occupy a slot but name nothing.
    pub key: Option<SummaryKey>,
    pub keyword: String,
    pub unit: String,
}

#[derive(Debug, Clone)]
pub struct SummaryIndex {
    nodes: Vec<SummaryNode>,
    lookup: HashMap<SummaryKey, usize>,
    duplicates: usize,
    invalid: usize,
    start: PrimitiveDateTime,
    dims: [i32; 3],
    restart_case: Option<String>,
}

impl SummaryIndex {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = KeywordReader::open(path)?;
        Self::build(&mut reader)
    }

    pub fn build<R: BufRead + Seek>(reader: &mut KeywordReader<R>) -> Result<Self> {
        let header = SummaryHeader::read(reader)?;
        Ok(Self::from_header(&header))
    }

    pub fn from_header(header: &SummaryHeader) -> Self {
        let mut nodes = Vec::with_capacity(header.len());
        let mut lookup = HashMap::with_capacity(header.len());
        let mut duplicates = 0;
        let mut invalid = 0;

        for (slot, keyword) in header.keywords.iter().enumerate() {
            let raw = RawNode {
                keyword,
                wgname: header.wgnames.as_ref().and_then(|v| v.get(slot)).map(String::as_str),
                num: header.nums.as_ref().and_then(|v| v.get(slot)).copied(),
                lgr: header.lgrs.as_ref().and_then(|v| v.get(slot)).map(String::as_str),
                lgr_ijk: header.lgr_ijk.as_ref().and_then(|v| v.get(slot)).copied(),
            };
            let key = SummaryKey::from_node(raw);
            match &key {
                None => invalid += 1,
                Some(key) => {
                    if lookup.contains_key(key) {
                        duplicates += 1;
                        warn!("duplicate summary key {key} at slot {slot}; keeping first");
                    } else {
                        lookup.insert(key.clone(), slot);
                    }
                }
            }
            let unit = header
                .units
                .as_ref()
                .and_then(|v| v.get(slot))
                .map(|u| u.trim().to_string())
                .unwrap_or_default();
            nodes.push(SummaryNode {
                key,
                keyword: keyword.trim_end().to_string(),
                unit,
            });
        }
        debug!(
            "summary index: {} slots, {} keys, {invalid} invalid, {duplicates} duplicates",
            nodes.len(),
            lookup.len()
        );

        Self {
            nodes,
            lookup,
            duplicates,
            invalid,
            start: header.start,
            dims: header.dims,
            restart_case: header.restart_case.clone(),
        }
    }

    /// Total number of slots, including invalid and duplicate entries.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct indexed keys.
    pub fn key_count(&self) -> usize {
        self.lookup.len()
    }

    /// Slots whose key repeated an earlier slot.
    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid
    }

    pub fn start(&self) -> PrimitiveDateTime {
        self.start
    }

    pub fn dims(&self) -> [i32; 3] {
        self.dims
    }

    pub fn restart_case(&self) -> Option<&str> {
        self.restart_case.as_deref()
    }

    pub fn node(&self, slot: usize) -> Option<&SummaryNode> {
        self.nodes.get(slot)
    }

    pub fn nodes(&self) -> &[SummaryNode] {
        &self.nodes
    }

    pub fn lookup(&self, category: VarCategory, keyword: &str, qualifier: &Qualifier) -> Option<usize> {
        self.lookup_key(&SummaryKey::new(category, keyword, qualifier.clone()))
    }

    pub fn lookup_key(&self, key: &SummaryKey) -> Option<usize> {
        self.lookup.get(key).copied()
    }

    /// Look up by text form (`WOPR:P1`).
    pub fn lookup_str(&self, text: &str) -> Option<usize> {
        self.lookup_key(&SummaryKey::parse(text)?)
    }

    pub fn unit(&self, slot: usize) -> Option<&str> {
        self.nodes.get(slot).map(|n| n.unit.as_str())
    }

    /// All indexed keys in total order.
    pub fn keys(&self) -> Vec<&SummaryKey> {
        let mut keys: Vec<&SummaryKey> = self.lookup.keys().collect();
        keys.sort();
        keys
    }

    /// Keys whose text form matches a `*`/`?` pattern, in total order.
    pub fn matching(&self, pattern: &str) -> Vec<(&SummaryKey, usize)> {
        let mut hits: Vec<(&SummaryKey, usize)> = self
            .lookup
            .iter()
            .filter(|(key, _)| wildcard_match(pattern, &key.to_string()))
            .map(|(key, slot)| (key, *slot))
            .collect();
        hits.sort();
        hits
    }

    /// CRC32 over the slot layout. Equal indices have equal fingerprints.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for node in &self.nodes {
            match &node.key {
                Some(key) => hasher.update(key.to_string().as_bytes()),
                None => hasher.update(node.keyword.as_bytes()),
            }
            hasher.update(&[0]);
        }
        hasher.finalize()
    }
}

/// Two indices are equal when every slot carries the same key.
impl PartialEq for SummaryIndex {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(a, b)| a.key == b.key && a.keyword == b.keyword)
    }
}

/// Shell-style matching with `*` and `?`.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == b'?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == b'*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::summary::key::DUMMY_WELL;

    fn header(entries: &[(&str, &str, i32)]) -> SummaryHeader {
        let mut header = SummaryHeader::new(
            entries.iter().map(|e| e.0.to_string()).collect(),
            datetime!(2020-01-01 0:00),
        );
        header.wgnames = Some(entries.iter().map(|e| e.1.to_string()).collect());
        header.nums = Some(entries.iter().map(|e| e.2).collect());
        header
    }

    #[test]
    fn well_vectors_get_distinct_slots() {
        let index = SummaryIndex::from_header(&header(&[
            ("TIME", DUMMY_WELL, 0),
            ("WOPR", "P1", 0),
            ("WOPR", "P2", 0),
        ]));
        let p1 = index.lookup(VarCategory::Well, "WOPR", &Qualifier::well("P1")).unwrap();
        let p2 = index.lookup(VarCategory::Well, "WOPR", &Qualifier::well("P2")).unwrap();
        assert_ne!(p1, p2);
        assert!(p1 < index.len() && p2 < index.len());
        assert_eq!(index.lookup_str("WOPR:P2"), Some(p2));
        assert_eq!(index.lookup_str("TIME"), Some(0));
        assert_eq!(index.lookup(VarCategory::Group, "WOPR", &Qualifier::well("P1")), None);
    }

    #[test]
    fn first_write_wins_and_counts() {
        let index = SummaryIndex::from_header(&header(&[
            ("WOPR", "P1", 0),
            ("WOPR", "P1", 0),
            ("WOPR", DUMMY_WELL, 0),
            ("RPR", "", 2),
        ]));
        assert_eq!(index.len(), 4);
        assert_eq!(index.key_count(), 2);
        assert_eq!(index.duplicate_count(), 1);
        assert_eq!(index.invalid_count(), 1);
        assert_eq!(index.lookup_str("WOPR:P1"), Some(0));
        assert_eq!(index.lookup_str("RPR:2"), Some(3));
    }

    #[test]
    fn names_with_separators_stay_distinct() {
        let index = SummaryIndex::from_header(&header(&[("CWIR", "A:1", 5), ("CWIR", "A", 5)]));
        let a1 = index.lookup(VarCategory::Completion, "CWIR", &Qualifier::NameNumber("A:1".into(), 5));
        let a = index.lookup(VarCategory::Completion, "CWIR", &Qualifier::NameNumber("A".into(), 5));
        assert_eq!(a1, Some(0));
        assert_eq!(a, Some(1));
    }

    #[test]
    fn matching_is_sorted() {
        let index = SummaryIndex::from_header(&header(&[
            ("WOPR", "P2", 0),
            ("FOPT", DUMMY_WELL, 0),
            ("WOPR", "P1", 0),
            ("WWCT", "P1", 0),
        ]));
        let hits: Vec<String> = index.matching("W*:P?").iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(hits, vec!["WOPR:P1", "WOPR:P2", "WWCT:P1"]);
        assert!(index.matching("G*").is_empty());
    }

    #[test]
    fn equality_and_fingerprint_follow_slot_order() {
        let a = SummaryIndex::from_header(&header(&[("WOPR", "P1", 0), ("WOPR", "P2", 0)]));
        let b = SummaryIndex::from_header(&header(&[("WOPR", "P1", 0), ("WOPR", "P2", 0)]));
        let c = SummaryIndex::from_header(&header(&[("WOPR", "P2", 0), ("WOPR", "P1", 0)]));
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a, c);
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn wildcards() {
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("W?PR:*", "WOPR:P1"));
        assert!(wildcard_match("*:P1", "WOPR:P1"));
        assert!(!wildcard_match("WOPR", "WOPR:P1"));
        assert!(wildcard_match("a*b*c", "axxbyyc"));
        assert!(!wildcard_match("a*b*c", "axxbyy"));
    }
}

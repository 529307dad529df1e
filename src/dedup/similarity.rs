//! Similarity scoring and the duplicate scan
//!
//! Two records are compared on their title plus lead paragraph. The text is
//! folded (Turkish letters transliterated, lowercased, punctuation removed),
//! cut into word-bigram shingles, and scored with a cosine over shingle
//! counts. Everything up to the final division is integer arithmetic, so
//! `score(a, b) == score(b, a)` holds exactly.

use crate::config::DuplicateConfig;
use crate::models::{DuplicateGroup, GroupStatus, NewsRecord};
use crate::normalize::fold_text;
use crate::storage::Storage;
use crate::Result;
use std::collections::{BTreeMap, HashSet};

/// Shingle multiset of one text
pub type Shingles = BTreeMap<String, u64>;

/// Builds the comparison text of a record: title followed by its lead
pub fn comparison_text(record: &NewsRecord) -> String {
    format!("{} {}", record.title, record.lead_paragraph())
}

/// Cuts folded text into word bigrams, or unigrams when there is one word
pub fn shingles(text: &str) -> Shingles {
    let folded = fold_text(text);
    let tokens: Vec<&str> = folded.split_whitespace().collect();

    let mut counts = Shingles::new();
    if tokens.len() == 1 {
        counts.insert(tokens[0].to_string(), 1);
        return counts;
    }
    for pair in tokens.windows(2) {
        *counts.entry(format!("{} {}", pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

/// Cosine similarity of two shingle multisets as a rounded percent
pub fn shingle_similarity(a: &Shingles, b: &Shingles) -> u8 {
    let dot: u64 = a
        .iter()
        .filter_map(|(shingle, count)| b.get(shingle).map(|other| count * other))
        .sum();
    if dot == 0 {
        return 0;
    }

    let norm_a: u64 = a.values().map(|c| c * c).sum();
    let norm_b: u64 = b.values().map(|c| c * c).sum();
    let norm_product = (norm_a * norm_b) as f64;

    let score = (100.0 * dot as f64 / norm_product.sqrt()).round();
    score.clamp(0.0, 100.0) as u8
}

/// Scores two texts (0-100)
///
/// # Examples
///
/// ```
/// use newswire_ingest::dedup::text_similarity;
///
/// let a = "Earthquake hits eastern province";
/// assert_eq!(text_similarity(a, a), 100);
/// assert_eq!(text_similarity(a, "Football cup final tonight"), 0);
/// ```
pub fn text_similarity(a: &str, b: &str) -> u8 {
    shingle_similarity(&shingles(a), &shingles(b))
}

/// Scores two records on title and lead paragraph (0-100)
pub fn similarity(a: &NewsRecord, b: &NewsRecord) -> u8 {
    text_similarity(&comparison_text(a), &comparison_text(b))
}

/// Outcome of one duplicate scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Records compared
    pub scanned: usize,

    /// Pending groups written by this scan, ordered by smallest member id
    pub groups: Vec<DuplicateGroup>,
}

/// Disjoint-set forest over record indices
struct UnionFind {
    parent: Vec<usize>,

    /// Members of each set, stored at the set's root
    members: Vec<Vec<usize>>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            members: (0..size).map(|i| vec![i]).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Joins two sets; the smaller index becomes the root
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child] = root;
            let moved = std::mem::take(&mut self.members[child]);
            self.members[root].extend(moved);
        }
    }

    /// Whether joining the sets of `a` and `b` would put any pair matching
    /// `forbidden` into one set
    fn join_conflicts(
        &mut self,
        a: usize,
        b: usize,
        forbidden: impl Fn(usize, usize) -> bool,
    ) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.members[ra]
            .iter()
            .any(|&x| self.members[rb].iter().any(|&y| forbidden(x, y)))
    }
}

fn id_pair(a: i64, b: i64) -> (i64, i64) {
    (a.min(b), a.max(b))
}

/// Pairs of record ids that an operator has declared distinct
fn ignored_pairs(storage: &dyn Storage) -> Result<HashSet<(i64, i64)>> {
    let mut pairs = HashSet::new();
    for group in storage.list_groups(Some(GroupStatus::Ignored))? {
        for (i, &a) in group.members.iter().enumerate() {
            for &b in &group.members[i + 1..] {
                pairs.insert(id_pair(a, b));
            }
        }
    }
    Ok(pairs)
}

/// Scans recent records and replaces the pending duplicate groups
///
/// Reads the `scan_limit` most recent records, links every pair scoring at or
/// above `threshold` and stores each connected component as a pending group
/// whose score is its weakest link. Pairs that share an ignored group never
/// end up in one component, not even through a third record similar to both;
/// a link that would join them is dropped. Merged and ignored groups are left
/// untouched.
pub fn scan_duplicates(storage: &mut dyn Storage, config: &DuplicateConfig) -> Result<ScanReport> {
    let mut records: Vec<NewsRecord> = storage
        .list_records(config.scan_limit)?
        .into_iter()
        .filter(|r| r.id.is_some())
        .collect();
    records.sort_by_key(|r| r.id);

    let ids: Vec<i64> = records.iter().filter_map(|r| r.id).collect();
    let shingle_sets: Vec<Shingles> = records
        .iter()
        .map(|r| shingles(&comparison_text(r)))
        .collect();
    let ignored = ignored_pairs(storage)?;

    let mut sets = UnionFind::new(records.len());
    let mut edges: Vec<(usize, usize, u8)> = Vec::new();

    for i in 0..records.len() {
        for j in (i + 1)..records.len() {
            if ignored.contains(&id_pair(ids[i], ids[j])) {
                continue;
            }
            let score = shingle_similarity(&shingle_sets[i], &shingle_sets[j]);
            if score < config.threshold {
                continue;
            }
            if sets.join_conflicts(i, j, |x, y| ignored.contains(&id_pair(ids[x], ids[y]))) {
                tracing::debug!(
                    "Not linking records {} and {}: would join an ignored pair",
                    ids[i],
                    ids[j]
                );
                continue;
            }
            sets.union(i, j);
            edges.push((i, j, score));
        }
    }

    // Component root -> (members, weakest edge)
    let mut components: BTreeMap<usize, (Vec<i64>, u8)> = BTreeMap::new();
    for &(i, j, score) in &edges {
        let root = sets.find(i);
        let entry = components.entry(root).or_insert_with(|| (Vec::new(), 100));
        for index in [i, j] {
            if !entry.0.contains(&ids[index]) {
                entry.0.push(ids[index]);
            }
        }
        entry.1 = entry.1.min(score);
    }

    let cleared = storage.clear_pending_groups()?;
    tracing::debug!("Cleared {} pending duplicate groups", cleared);

    let mut groups = Vec::with_capacity(components.len());
    for (_, (mut members, score)) in components {
        members.sort_unstable();
        let group_id = storage.create_group(score, &members)?;
        if let Some(group) = storage.get_group(group_id)? {
            groups.push(group);
        }
    }

    tracing::info!(
        "Duplicate scan compared {} records, found {} groups",
        records.len(),
        groups.len()
    );

    Ok(ScanReport {
        scanned: records.len(),
        groups,
    })
}

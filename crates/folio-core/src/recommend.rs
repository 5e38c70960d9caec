//! Similarity-based recommendations.
//!
//! **Offline** ([`build_similarity_index`]): every document is lowercased,
//! stripped of non-word characters, tokenized, filtered against an English
//! stop-word list and lemmatized. Documents become L2-normalized TF-IDF
//! vectors (raw term counts, smoothed idf `ln((1+n)/(1+df)) + 1`), and for
//! each one the `top_k` most cosine-similar *other* documents are kept,
//! most similar first (ties broken by id).
//!
//! **Online** ([`recommend`]): precomputed neighbours are resolved against
//! the current feed (stale ids are dropped), topped up with random feed
//! entries to reach the target count, then shuffled. A document with no
//! precomputed entry yields `None`, which callers treat as "no
//! recommendations" rather than a failure.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::feed::{FeedItem, FeedLog};
use crate::store::Document;

/// Default number of neighbours kept per document.
pub const TOP_K: usize = 6;

/// English stop words (the NLTK list).
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Nouns whose lemma is not reachable by suffix rules.
const IRREGULAR_LEMMAS: &[(&str, &str)] = &[
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("people", "people"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("series", "series"),
    ("species", "species"),
    ("news", "news"),
    ("lives", "life"),
    ("wives", "wife"),
    ("knives", "knife"),
    ("leaves", "leaf"),
    ("wolves", "wolf"),
];

fn non_word() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\W+").expect("non-word pattern is valid"))
}

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Reduce a (lowercase) noun to its dictionary form.
pub fn lemmatize(token: &str) -> String {
    if let Some((_, lemma)) = IRREGULAR_LEMMAS.iter().find(|(word, _)| *word == token) {
        return lemma.to_string();
    }
    if token.len() <= 3 || !token.is_ascii() {
        return token.to_string();
    }
    if let Some(stem) = token.strip_suffix("ies") {
        if stem.len() > 1 {
            return format!("{}y", stem);
        }
    }
    for suffix in ["sses", "xes", "ches", "shes"] {
        if token.ends_with(suffix) {
            return token[..token.len() - 2].to_string();
        }
    }
    if token.ends_with('s') && !["ss", "us", "is"].iter().any(|s| token.ends_with(s)) {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}

/// Turn raw document text into lemmatized, stop-word-free tokens.
///
/// Single-character tokens are dropped.
pub fn preprocess(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = non_word().replace_all(&lowered, " ");
    cleaned
        .split_whitespace()
        .filter(|t| !stop_words().contains(t))
        .map(lemmatize)
        .filter(|t| t.chars().count() >= 2)
        .collect()
}

type SparseVector = HashMap<usize, f64>;

/// Fitted TF-IDF vocabulary plus one normalized vector per document.
#[derive(Debug, Clone)]
pub struct TfIdfModel {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<SparseVector>,
}

impl TfIdfModel {
    /// Fit the model over `texts`, producing one vector per text in order.
    pub fn fit<S: AsRef<str>>(texts: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = texts.iter().map(|t| preprocess(t.as_ref())).collect();

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut df: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let unique: HashSet<&String> = tokens.iter().collect();
            for token in unique {
                let next_id = vocabulary.len();
                let id = *vocabulary.entry(token.clone()).or_insert(next_id);
                if id == df.len() {
                    df.push(0);
                }
                df[id] += 1;
            }
        }

        let n = texts.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let vectors = tokenized
            .iter()
            .map(|tokens| {
                let mut vector: SparseVector = HashMap::new();
                for token in tokens {
                    if let Some(&id) = vocabulary.get(token) {
                        *vector.entry(id).or_insert(0.0) += 1.0;
                    }
                }
                for (id, weight) in vector.iter_mut() {
                    *weight *= idf[*id];
                }
                let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
                if norm > f64::EPSILON {
                    for weight in vector.values_mut() {
                        *weight /= norm;
                    }
                }
                vector
            })
            .collect();

        TfIdfModel {
            vocabulary,
            idf,
            vectors,
        }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&id| self.idf[id])
    }

    /// Cosine similarity of documents `a` and `b` (vectors are unit length).
    pub fn similarity(&self, a: usize, b: usize) -> f64 {
        let (small, large) = if self.vectors[a].len() <= self.vectors[b].len() {
            (&self.vectors[a], &self.vectors[b])
        } else {
            (&self.vectors[b], &self.vectors[a])
        };
        small
            .iter()
            .filter_map(|(id, w)| large.get(id).map(|v| w * v))
            .sum()
    }
}

/// Document id → most similar other document ids, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimilarityIndex {
    neighbours: BTreeMap<String, Vec<String>>,
}

impl SimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, doc_id: impl Into<String>, neighbours: Vec<String>) {
        self.neighbours.insert(doc_id.into(), neighbours);
    }

    pub fn neighbours(&self, doc_id: &str) -> Option<&[String]> {
        self.neighbours.get(doc_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbours.is_empty()
    }

    /// Decode a stored table. Malformed rows are skipped.
    pub fn from_document(doc: &Document) -> Self {
        let neighbours = doc
            .iter()
            .filter_map(|(id, value)| {
                let ids = value
                    .as_array()?
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                Some((id.clone(), ids))
            })
            .collect();
        SimilarityIndex { neighbours }
    }

    pub fn to_document(&self) -> Document {
        self.neighbours
            .iter()
            .map(|(id, ids)| {
                (
                    id.clone(),
                    Value::Array(ids.iter().cloned().map(Value::String).collect()),
                )
            })
            .collect()
    }
}

/// Offline build over `(doc_id, text)` pairs.
pub fn build_similarity_index(docs: &[(String, String)], top_k: usize) -> SimilarityIndex {
    let texts: Vec<&str> = docs.iter().map(|(_, text)| text.as_str()).collect();
    let model = TfIdfModel::fit(&texts);
    debug!(
        documents = docs.len(),
        terms = model.vocabulary_len(),
        "fitted tf-idf model"
    );

    let mut index = SimilarityIndex::new();
    for (i, (doc_id, _)) in docs.iter().enumerate() {
        let mut scored: Vec<(f64, &str)> = docs
            .iter()
            .enumerate()
            .filter(|(j, (other, _))| *j != i && other != doc_id)
            .map(|(j, (other, _))| (model.similarity(i, j), other.as_str()))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        let neighbours = scored
            .into_iter()
            .take(top_k)
            .map(|(_, id)| id.to_string())
            .collect();
        index.insert(doc_id.clone(), neighbours);
    }
    index
}

/// Online lookup for `doc_id` (a feed entry `location`).
///
/// Returns up to `target` distinct feed items, never including `doc_id`
/// itself, in random order. `None` when `doc_id` has no precomputed row.
pub fn recommend<R: Rng + ?Sized>(
    index: &SimilarityIndex,
    feed: &FeedLog,
    doc_id: &str,
    target: usize,
    rng: &mut R,
) -> Option<Vec<FeedItem>> {
    let neighbours = index.neighbours(doc_id)?;

    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(doc_id);
    let mut picked: Vec<FeedItem> = Vec::new();

    for id in neighbours {
        if picked.len() >= target {
            break;
        }
        if seen.contains(id.as_str()) {
            continue;
        }
        match feed.find_by_location(id) {
            Some((key, entry)) => {
                seen.insert(entry.location.as_str());
                picked.push(FeedItem {
                    key: key.clone(),
                    entry: entry.clone(),
                });
            }
            None => debug!(doc_id, neighbour = %id, "dropping neighbour missing from feed"),
        }
    }

    if picked.len() < target {
        let mut pool = Vec::new();
        for (key, entry) in feed.iter().rev() {
            if seen.insert(entry.location.as_str()) {
                pool.push((key, entry));
            }
        }
        let extra: Vec<FeedItem> = pool
            .choose_multiple(rng, target - picked.len())
            .map(|(key, entry)| FeedItem {
                key: (*key).clone(),
                entry: (*entry).clone(),
            })
            .collect();
        picked.extend(extra);
    }

    picked.shuffle(rng);
    Some(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedEntry, FeedKey};
    use crate::frontmatter::Metadata;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn feed_with(locations: &[&str]) -> FeedLog {
        let mut log = FeedLog::new();
        for (i, loc) in locations.iter().enumerate() {
            let metadata: Metadata = [("title", *loc), ("url", *loc)].into_iter().collect();
            let key = FeedKey::parse(&format!("2024-02-{:02} 12:00:00", i + 1)).unwrap();
            log.upsert(key, FeedEntry::from_metadata(metadata, loc));
        }
        log
    }

    #[test]
    fn test_preprocess() {
        let tokens = preprocess("The Games, and the GAME's reviews! It's a test-case.");
        assert_eq!(tokens, vec!["game", "game", "review", "test", "case"]);
    }

    #[test]
    fn test_lemmatize_rules() {
        assert_eq!(lemmatize("stories"), "story");
        assert_eq!(lemmatize("boxes"), "box");
        assert_eq!(lemmatize("classes"), "class");
        assert_eq!(lemmatize("games"), "game");
        assert_eq!(lemmatize("glass"), "glass");
        assert_eq!(lemmatize("bonus"), "bonus");
        assert_eq!(lemmatize("analysis"), "analysis");
        assert_eq!(lemmatize("children"), "child");
        assert_eq!(lemmatize("gas"), "gas");
    }

    #[test]
    fn test_idf_is_smoothed() {
        let model = TfIdfModel::fit(&["rust code", "rust game", "music album"]);
        let rust = model.idf("rust").unwrap();
        let album = model.idf("album").unwrap();
        assert!((rust - ((4.0f64 / 3.0).ln() + 1.0)).abs() < 1e-9);
        assert!((album - (2.0f64.ln() + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_bounds() {
        let model = TfIdfModel::fit(&["rust code compiler", "rust code compiler", "guitar album"]);
        assert!((model.similarity(0, 1) - 1.0).abs() < 1e-9);
        assert!(model.similarity(0, 2).abs() < 1e-9);
    }

    #[test]
    fn test_index_excludes_self_and_ranks() {
        let docs = vec![
            ("blogs/a.md".to_string(), "rust compiler borrow checker".to_string()),
            ("blogs/b.md".to_string(), "rust compiler lifetimes".to_string()),
            ("blogs/c.md".to_string(), "guitar album recording".to_string()),
            ("music/d.md".to_string(), "album recording studio guitar".to_string()),
        ];
        let index = build_similarity_index(&docs, 2);
        assert_eq!(index.len(), 4);
        let a = index.neighbours("blogs/a.md").unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0], "blogs/b.md");
        assert!(!a.contains(&"blogs/a.md".to_string()));
        assert_eq!(index.neighbours("blogs/c.md").unwrap()[0], "music/d.md");
    }

    #[test]
    fn test_index_document_roundtrip() {
        let mut index = SimilarityIndex::new();
        index.insert("a", vec!["b".into(), "c".into()]);
        let doc = index.to_document();
        assert_eq!(SimilarityIndex::from_document(&doc), index);
    }

    #[test]
    fn test_recommend_six_present_neighbours() {
        let locations = ["self", "n1", "n2", "n3", "n4", "n5", "n6", "x1", "x2"];
        let feed = feed_with(&locations);
        let mut index = SimilarityIndex::new();
        index.insert(
            "self",
            ["n1", "n2", "n3", "n4", "n5", "n6"].iter().map(|s| s.to_string()).collect(),
        );
        let mut rng = StdRng::seed_from_u64(42);
        let recs = recommend(&index, &feed, "self", TOP_K, &mut rng).unwrap();
        assert_eq!(recs.len(), 6);
        let got: HashSet<&str> = recs.iter().map(|r| r.entry.location.as_str()).collect();
        assert_eq!(got.len(), 6);
        assert!(!got.contains("self"));
        for n in ["n1", "n2", "n3", "n4", "n5", "n6"] {
            assert!(got.contains(n));
        }
    }

    #[test]
    fn test_recommend_tops_up_stale_neighbours() {
        let feed = feed_with(&["self", "n1", "r1", "r2", "r3", "r4", "r5", "r6"]);
        let mut index = SimilarityIndex::new();
        index.insert("self", vec!["n1".into(), "gone1".into(), "gone2".into()]);
        let mut rng = StdRng::seed_from_u64(1);
        let recs = recommend(&index, &feed, "self", 6, &mut rng).unwrap();
        assert_eq!(recs.len(), 6);
        let got: HashSet<&str> = recs.iter().map(|r| r.entry.location.as_str()).collect();
        assert_eq!(got.len(), 6);
        assert!(got.contains("n1"));
        assert!(!got.contains("self"));
        assert!(!got.contains("gone1"));
    }

    #[test]
    fn test_recommend_small_feed_returns_what_exists() {
        let feed = feed_with(&["self", "n1"]);
        let mut index = SimilarityIndex::new();
        index.insert("self", vec!["n1".into()]);
        let mut rng = StdRng::seed_from_u64(3);
        let recs = recommend(&index, &feed, "self", 6, &mut rng).unwrap();
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_recommend_unknown_document_is_none() {
        let feed = feed_with(&["a", "b"]);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(recommend(&SimilarityIndex::new(), &feed, "a", 6, &mut rng).is_none());
    }
}

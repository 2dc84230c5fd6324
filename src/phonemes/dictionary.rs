use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::DurationError;

const BUNDLED_DICTIONARY: &str = include_str!("../../data/cmudict.json");

/// Immutable word -> phoneme list mapping.
///
/// Entries are canonicalized once at load: every source shape (single
/// string, whitespace-delimited string, list) becomes a list of trimmed
/// tokens. Stress digits are kept here and stripped by the phonemizer.
#[derive(Debug, Clone, Default)]
pub struct PronunciationDictionary {
    entries: HashMap<String, Vec<String>>,
}

impl PronunciationDictionary {
    pub fn from_entries<I, W, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (W, Vec<P>)>,
        W: Into<String>,
        P: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(word, phones)| {
                    (
                        word.into().to_uppercase(),
                        phones.into_iter().map(Into::into).collect::<Vec<String>>(),
                    )
                })
                .filter(|(_, phones)| !phones.is_empty())
                .collect(),
        }
    }

    pub fn from_json_str(data: &str) -> Result<Self, DurationError> {
        let raw: HashMap<String, Value> = serde_json::from_str(data)
            .map_err(|e| DurationError::json("parse pronunciation dictionary", e))?;
        let entries = raw
            .into_iter()
            .map(|(word, entry)| (word.to_uppercase(), canonical_entry(&entry)))
            // Empty pronunciations ("" or null) count as misses.
            .filter(|(_, phones)| !phones.is_empty())
            .collect();
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, DurationError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| DurationError::io("read pronunciation dictionary", e))?;
        Self::from_json_str(&data)
    }

    pub fn bundled() -> Result<Self, DurationError> {
        Self::from_json_str(BUNDLED_DICTIONARY)
    }

    pub fn lookup(&self, word: &str) -> Option<&[String]> {
        self.entries.get(word).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn canonical_entry(entry: &Value) -> Vec<String> {
    match entry {
        Value::String(s) => split_tokens(s),
        Value::Array(items) => match items.first() {
            // Multi-pronunciation sources: keep the primary variant.
            Some(Value::Array(_)) => canonical_entry(&items[0]),
            _ => items.iter().flat_map(scalar_tokens).collect(),
        },
        Value::Null => Vec::new(),
        other => scalar_tokens(other),
    }
}

fn scalar_tokens(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => split_tokens(s),
        Value::Null => Vec::new(),
        other => split_tokens(&other.to_string()),
    }
}

fn split_tokens(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

#[derive(Debug, Clone)]
pub enum DictionarySource {
    Bundled,
    File(PathBuf),
    Preloaded(Arc<PronunciationDictionary>),
}

impl DictionarySource {
    fn describe(&self) -> String {
        match self {
            Self::Bundled => "bundled".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Preloaded(_) => "preloaded".to_string(),
        }
    }
}

/// Lazily loads the dictionary on first use and shares it afterwards.
///
/// Population happens at most once: concurrent first callers serialize on
/// `init_lock` and all observe the same `Arc`. A failed load leaves the
/// cache empty so a later call retries.
#[derive(Debug)]
pub struct DictionaryCache {
    source: DictionarySource,
    cell: OnceLock<Arc<PronunciationDictionary>>,
    init_lock: Mutex<()>,
}

impl DictionaryCache {
    pub fn new(source: DictionarySource) -> Self {
        Self {
            source,
            cell: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Result<Arc<PronunciationDictionary>, DurationError> {
        if let Some(dictionary) = self.cell.get() {
            return Ok(Arc::clone(dictionary));
        }

        let _guard = self.init_lock.lock();
        if let Some(dictionary) = self.cell.get() {
            return Ok(Arc::clone(dictionary));
        }

        let dictionary = match &self.source {
            DictionarySource::Bundled => Arc::new(PronunciationDictionary::bundled()?),
            DictionarySource::File(path) => Arc::new(PronunciationDictionary::load(path)?),
            DictionarySource::Preloaded(dictionary) => Arc::clone(dictionary),
        };
        tracing::info!(
            source = %self.source.describe(),
            entries = dictionary.len(),
            "pronunciation dictionary loaded"
        );
        Ok(Arc::clone(self.cell.get_or_init(|| dictionary)))
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_shape_is_kept_in_order() {
        let dict = PronunciationDictionary::from_json_str(r#"{"CAT": ["K", "AE1", "T"]}"#)
            .expect("parse");
        assert_eq!(dict.lookup("CAT").unwrap(), ["K", "AE1", "T"]);
    }

    #[test]
    fn all_entry_shapes_normalize_identically() {
        let json = r#"{
            "A": "K AE1 T",
            "B": ["K", "AE1", "T"],
            "C": "AH0"
        }"#;
        let dict = PronunciationDictionary::from_json_str(json).expect("parse");
        assert_eq!(dict.lookup("A"), dict.lookup("B"));
        assert_eq!(dict.lookup("C").unwrap(), ["AH0"]);
    }

    #[test]
    fn nested_alternatives_use_first_variant() {
        let json = r#"{"READ": [["R", "IY1", "D"], ["R", "EH1", "D"]]}"#;
        let dict = PronunciationDictionary::from_json_str(json).expect("parse");
        assert_eq!(dict.lookup("READ").unwrap(), ["R", "IY1", "D"]);
    }

    #[test]
    fn empty_entries_are_treated_as_missing() {
        let json = r#"{"CAT": "", "DOG": null, "EMU": [], "OWL": "AW1 L"}"#;
        let dict = PronunciationDictionary::from_json_str(json).expect("parse");
        assert!(dict.lookup("CAT").is_none());
        assert!(dict.lookup("DOG").is_none());
        assert!(dict.lookup("EMU").is_none());
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn keys_are_uppercased() {
        let dict = PronunciationDictionary::from_json_str(r#"{"dog": "D AO1 G"}"#).expect("parse");
        assert!(dict.lookup("DOG").is_some());
        assert!(dict.lookup("dog").is_none());
    }

    #[test]
    fn malformed_json_is_json_error() {
        let result = PronunciationDictionary::from_json_str("[1, 2");
        assert!(matches!(result, Err(DurationError::Json { .. })));
    }

    #[test]
    fn bundled_dictionary_parses() {
        let dict = PronunciationDictionary::bundled().expect("bundled dictionary");
        assert!(!dict.is_empty());
        assert_eq!(dict.lookup("HELLO").unwrap(), ["HH", "AH0", "L", "OW1"]);
    }

    #[test]
    fn cache_populates_once_and_shares_value() {
        let cache = DictionaryCache::new(DictionarySource::Bundled);
        assert!(!cache.is_loaded());
        let first = cache.get().expect("load");
        let second = cache.get().expect("cached");
        assert!(cache.is_loaded());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn concurrent_first_access_converges() {
        let cache = Arc::new(DictionaryCache::new(DictionarySource::Bundled));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get().expect("load"))
            })
            .collect();
        let loaded: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();
        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn missing_file_is_io_error_and_not_cached() {
        let cache = DictionaryCache::new(DictionarySource::File(PathBuf::from(
            "/nonexistent/cmudict.json",
        )));
        assert!(matches!(cache.get(), Err(DurationError::Io { .. })));
        assert!(!cache.is_loaded());
    }

    #[test]
    fn file_source_loads_json() {
        let path = std::env::temp_dir().join("phoneme_timing_rs_dictionary.json");
        std::fs::write(&path, r#"{"ZAP": "Z AE1 P"}"#).expect("write dictionary");
        let cache = DictionaryCache::new(DictionarySource::File(path.clone()));
        let dict = cache.get().expect("load");
        assert_eq!(dict.lookup("ZAP").unwrap(), ["Z", "AE1", "P"]);
        let _ = std::fs::remove_file(&path);
    }
}

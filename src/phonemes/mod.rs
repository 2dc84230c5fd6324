pub mod dictionary;
pub mod phonemizer;
pub mod prior;

pub use dictionary::{DictionaryCache, DictionarySource, PronunciationDictionary};
pub use phonemizer::{estimate_word_phonemes, normalize_words, phonemize_text};
pub use prior::{base_durations, phoneme_weight};

use super::dictionary::PronunciationDictionary;

/// Emitted for a word whose letters produce no phoneme at all.
pub const FILLER_PHONEME: &str = "AH";

/// Uppercases, replaces everything outside `[A-Z]` and whitespace with a
/// space, and splits into non-empty words.
pub fn normalize_words(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_uppercase()
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

pub fn phonemize_text(text: &str, dictionary: &PronunciationDictionary) -> Vec<String> {
    let mut phonemes = Vec::new();
    for word in normalize_words(text) {
        match dictionary.lookup(&word) {
            Some(entry) => phonemes.extend(entry.iter().filter_map(|p| strip_stress(p))),
            None => {
                let estimated = estimate_word_phonemes(&word);
                tracing::warn!(
                    word = word.as_str(),
                    estimated = ?estimated,
                    "word not in pronunciation dictionary, using letter fallback"
                );
                phonemes.extend(estimated);
            }
        }
    }
    phonemes
}

/// Drops one trailing stress digit (0, 1 or 2). Empty results are discarded.
fn strip_stress(token: &str) -> Option<String> {
    let stripped = token
        .strip_suffix(|c: char| matches!(c, '0' | '1' | '2'))
        .unwrap_or(token);
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

/// Letter-by-letter fallback for out-of-vocabulary words.
pub fn estimate_word_phonemes(word: &str) -> Vec<String> {
    let phonemes: Vec<String> = word
        .chars()
        .filter_map(letter_phoneme)
        .map(str::to_string)
        .collect();
    if phonemes.is_empty() {
        vec![FILLER_PHONEME.to_string()]
    } else {
        phonemes
    }
}

fn letter_phoneme(letter: char) -> Option<&'static str> {
    let phoneme = match letter {
        'A' => "AE",
        'E' => "EH",
        'I' => "IH",
        'O' => "AO",
        'U' => "UH",
        'B' => "B",
        'P' => "P",
        'M' => "M",
        'F' => "F",
        'V' => "V",
        'T' => "T",
        'D' => "D",
        'N' => "N",
        'L' => "L",
        'S' => "S",
        'Z' => "Z",
        'R' => "R",
        'K' | 'C' | 'Q' | 'X' => "K",
        'G' => "G",
        'H' => "HH",
        'W' => "W",
        'Y' => "Y",
        _ => return None,
    };
    Some(phoneme)
}

//! English/Urdu detection by script counting.

use crate::models::Language;

/// Arabic-script block, which Urdu is written in.
const ARABIC_BLOCK: std::ops::RangeInclusive<char> = '\u{0600}'..='\u{06FF}';

/// Classifies `text` as Urdu when it holds strictly more Arabic-script code
/// points than ASCII Latin letters, English otherwise.
pub fn detect(text: &str) -> Language {
    let (urdu, latin) = text.chars().fold((0usize, 0usize), |(urdu, latin), c| {
        if ARABIC_BLOCK.contains(&c) {
            (urdu + 1, latin)
        } else if c.is_ascii_alphabetic() {
            (urdu, latin + 1)
        } else {
            (urdu, latin)
        }
    });

    if urdu > latin {
        Language::Urdu
    } else {
        Language::English
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_text() {
        assert_eq!(detect("How do I create a Sales Invoice?"), Language::English);
    }

    #[test]
    fn test_urdu_text() {
        assert_eq!(detect("سیلز انوائس کیسے بنائیں"), Language::Urdu);
    }

    #[test]
    fn test_mixed_text_counts_scripts() {
        // 2 Latin letters against 7 Arabic-script letters
        assert_eq!(detect("PO بنانا ہے"), Language::Urdu);
        assert_eq!(detect("Purchase Order بنائیں"), Language::English);
    }

    #[test]
    fn test_tie_and_empty_default_to_english() {
        assert_eq!(detect(""), Language::English);
        assert_eq!(detect("ab ہے"), Language::English);
    }

    #[test]
    fn test_adding_urdu_keeps_urdu() {
        let mut text = String::from("PO کیسے بنائیں");
        assert_eq!(detect(&text), Language::Urdu);
        for _ in 0..5 {
            text.push_str(" ہے");
            assert_eq!(detect(&text), Language::Urdu);
        }
    }
}

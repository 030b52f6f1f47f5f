//! Trigger scanning (input pre-classification).
//!
//! A single cheap pass over the normalized text that produces coarse signals
//! used to skip work downstream:
//!
//! - **Signals** (`SignalMask`): booleans such as "contains digits" or "has an
//!   ellipsis". Entity families and punctuation sarcasm patterns are only run
//!   when their signal is present.
//! - **Format features** (`FormatFeatures`): caps ratio and exclamation count,
//!   computed per sentence for the context classifier's position and format
//!   boosts.
//!
//! False positives are fine here; every consumer still runs its full matcher.

use bitflags::bitflags;

bitflags! {
    /// Coarse input signals.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SignalMask: u32 {
        const HAS_DIGITS      = 1 << 0;
        const HAS_CURRENCY    = 1 << 1;
        const HAS_EXCLAMATION = 1 << 2;
        const HAS_QUESTION    = 1 << 3;
        const HAS_ELLIPSIS    = 1 << 4;
        const HAS_QUOTES      = 1 << 5;
        const HAS_CAPS_WORD   = 1 << 6;
        const HAS_CAPITALIZED = 1 << 7;
    }
}

impl SignalMask {
    /// Signals that can feed punctuation-based sarcasm patterns.
    pub const PUNCTUATION_CUES: SignalMask = SignalMask::HAS_EXCLAMATION
        .union(SignalMask::HAS_QUESTION)
        .union(SignalMask::HAS_ELLIPSIS)
        .union(SignalMask::HAS_QUOTES);
}

/// Input characteristics detected from the normalized text.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TriggerInfo {
    pub signals: SignalMask,
}

impl TriggerInfo {
    pub(crate) fn scan(text: &str) -> Self {
        let mut signals = SignalMask::empty();

        for c in text.chars() {
            match c {
                '0'..='9' => signals |= SignalMask::HAS_DIGITS,
                '$' | '€' | '£' | '¥' => signals |= SignalMask::HAS_CURRENCY,
                '!' => signals |= SignalMask::HAS_EXCLAMATION,
                '?' => signals |= SignalMask::HAS_QUESTION,
                '"' => signals |= SignalMask::HAS_QUOTES,
                '…' => signals |= SignalMask::HAS_ELLIPSIS,
                _ => {}
            }
        }
        if text.contains("...") {
            signals |= SignalMask::HAS_ELLIPSIS;
        }

        if FormatFeatures::of(text).caps_words > 0 {
            signals |= SignalMask::HAS_CAPS_WORD;
        }
        if text.split_whitespace().skip(1).any(|w| w.starts_with(char::is_uppercase)) {
            signals |= SignalMask::HAS_CAPITALIZED;
        }

        TriggerInfo { signals }
    }
}

/// Shouting/emphasis features of a piece of text.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct FormatFeatures {
    /// Fully upper-case words among alphabetic words of two letters or more.
    pub caps_ratio: f64,
    pub caps_words: usize,
    pub exclamations: usize,
}

impl FormatFeatures {
    pub(crate) fn of(text: &str) -> Self {
        let mut words = 0usize;
        let mut caps_words = 0usize;
        for word in text.split(|c: char| !c.is_alphabetic()) {
            if word.chars().count() < 2 {
                continue;
            }
            words += 1;
            if word.chars().all(char::is_uppercase) {
                caps_words += 1;
            }
        }
        let caps_ratio = if words == 0 { 0.0 } else { caps_words as f64 / words as f64 };
        FormatFeatures { caps_ratio, caps_words, exclamations: text.matches('!').count() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_collects_signals() {
        let info = TriggerInfo::scan("You owe me $20... REALLY?!");
        assert!(info.signals.contains(SignalMask::HAS_DIGITS | SignalMask::HAS_CURRENCY));
        assert!(info.signals.contains(SignalMask::HAS_ELLIPSIS | SignalMask::HAS_EXCLAMATION));
        assert!(info.signals.contains(SignalMask::HAS_CAPS_WORD));
        assert!(info.signals.intersects(SignalMask::PUNCTUATION_CUES));
    }

    #[test]
    fn plain_text_has_no_punctuation_cues() {
        let info = TriggerInfo::scan("i love you so much");
        assert!(!info.signals.intersects(SignalMask::PUNCTUATION_CUES));
        assert_eq!(FormatFeatures::of("i love you so much").exclamations, 0);
    }

    #[test]
    fn caps_ratio_ignores_single_letters() {
        let f = FormatFeatures::of("I SAID STOP it now!!");
        assert_eq!(f.caps_words, 2);
        assert!((f.caps_ratio - 0.5).abs() < 1e-12);
        assert_eq!(f.exclamations, 2);
    }
}

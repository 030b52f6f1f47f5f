//! Tokenizer and coarse part-of-speech tagger.
//!
//! Word splitting is delegated to [`split_words`], a single Unicode-aware regex
//! shared by every caller that needs "words" (emoji sequences, flag pairs, words with inner
//! apostrophes, punctuation runs, any other non-space symbol). Offsets are then
//! recovered by scanning forward from the previous token's end, so repeated
//! substrings always map to the right occurrence.
//!
//! Tagging is a fixed cascade, first hit wins:
//!
//! ```text
//! punctuation-only ─▶ PUNCT      closed-class lexicons ─▶ PRON/AUX/DET/ADP/CCONJ/INTJ/ADV
//! emoji            ─▶ SYM        open-class lexicons   ─▶ VERB/ADJ
//! numeric          ─▶ NUM        suffixes -ly/-ing/-ed/-ful.. ─▶ ADV/VERB/ADJ
//!                                capitalized mid-sentence ─▶ PROPN, else NOUN
//! ```

use crate::{PosTag, Token};
use std::collections::HashSet;

/// Split `text` into word-like pieces.
pub(crate) fn split_words(text: &str) -> Vec<&str> {
    let re = regex!(
        r"(?x)
        \p{Regional_Indicator}{2}
        | \p{Extended_Pictographic}[\p{Extended_Pictographic}\x{FE0F}\x{200D}\p{Emoji_Modifier}]*
        | \p{N}+(?:[.,:]\p{N}+)+
        | [\p{L}\p{M}\p{N}_]+(?:'[\p{L}\p{M}\p{N}_]+)*
        | \p{P}+
        | \S"
    );
    re.find_iter(text).map(|m| m.as_str()).collect()
}

/// Tokenize normalized `text`.
pub(crate) fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut cursor = 0;

    for word in split_words(text) {
        let Some(found) = text[cursor..].find(word) else {
            continue;
        };
        let start = cursor + found;
        let end = start + word.len();
        cursor = end;

        let sentence_initial = match tokens.last() {
            None => true,
            Some(prev) => prev.text.ends_with(['.', '!', '?']) || text[prev.end..start].contains('\n'),
        };

        let lower = word.to_lowercase();
        let pos = tag(word, &lower, sentence_initial);
        let is_alpha = word.chars().all(char::is_alphabetic);

        tokens.push(Token {
            text: word.to_string(),
            start,
            end,
            index: tokens.len(),
            pos,
            lemma: lemmatize(&lower, pos),
            is_alpha,
            is_stop: is_stop_word(&lower),
            is_punct: pos == PosTag::Punct,
        });
    }

    tokens
}

pub(crate) fn is_stop_word(lower: &str) -> bool {
    stop_words().contains(lower)
}

fn stop_words() -> &'static HashSet<&'static str> {
    lexicon!(
        "the", "a", "an", "this", "that", "these", "those", "is", "are", "was", "were", "be", "been", "being", "am",
        "have", "has", "had", "do", "does", "did", "will", "would", "shall", "should", "may", "might", "can",
        "could", "must", "to", "of", "in", "for", "on", "with", "at", "by", "from", "into", "about", "and", "or",
        "but", "if", "then", "than", "so", "as", "i", "you", "he", "she", "it", "we", "they", "me", "him", "her",
        "us", "them", "my", "your", "his", "our", "their", "its", "who", "what", "which", "when", "where", "how",
        "why", "very", "also", "just", "too", "more", "most", "there", "here", "now", "up", "out", "off", "over",
        "i'm", "it's", "that's", "you're", "we're", "they're", "i've", "i'll", "i'd",
    )
}

fn tag(word: &str, lower: &str, sentence_initial: bool) -> PosTag {
    if word.chars().all(|c| !c.is_alphanumeric() && !is_pictographic(c)) {
        return if word.chars().all(|c| c.is_ascii_punctuation() || c.is_whitespace() || is_unicode_punct(c)) {
            PosTag::Punct
        } else {
            PosTag::Sym
        };
    }
    if word.chars().next().is_some_and(is_pictographic) {
        return PosTag::Sym;
    }
    if regex!(r"^[+-]?\d[\d,:]*(?:\.\d+)?(?:st|nd|rd|th|%)?$").is_match(lower) {
        return PosTag::Num;
    }

    if lexicon!(
        "i", "me", "my", "mine", "myself", "you", "your", "yours", "yourself", "he", "him", "his", "himself", "she",
        "her", "hers", "herself", "it", "its", "itself", "we", "us", "our", "ours", "they", "them", "their",
        "theirs", "someone", "somebody", "anyone", "anybody", "everyone", "everybody", "nobody", "nothing",
        "something", "anything", "everything", "who", "whom", "whose", "i'm", "i've", "i'll", "i'd", "you're",
        "you've", "you'll", "it's", "we're", "they're", "he's", "she's", "that's",
    )
    .contains(lower)
    {
        return PosTag::Pron;
    }
    if lexicon!(
        "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
        "would", "shall", "should", "can", "could", "may", "might", "must", "don't", "doesn't", "didn't", "can't",
        "cannot", "won't", "wouldn't", "shouldn't", "couldn't", "isn't", "aren't", "wasn't", "weren't", "haven't",
        "hasn't", "hadn't", "ain't", "mustn't",
    )
    .contains(lower)
    {
        return PosTag::Aux;
    }
    if lexicon!(
        "the", "a", "an", "this", "that", "these", "those", "some", "any", "every", "each", "no", "all", "both",
        "either", "neither", "another",
    )
    .contains(lower)
    {
        return PosTag::Det;
    }
    if lexicon!(
        "to", "of", "in", "on", "at", "by", "for", "with", "from", "into", "about", "over", "under", "after",
        "before", "between", "through", "during", "without", "against", "around", "like",
    )
    .contains(lower)
    {
        return PosTag::Adp;
    }
    if lexicon!("and", "or", "but", "nor", "yet", "because", "although", "though", "if", "unless", "while", "so")
        .contains(lower)
    {
        return PosTag::Cconj;
    }
    if lexicon!("oh", "wow", "hey", "ugh", "yeah", "yes", "ok", "okay", "hmm", "lol", "ah", "oops", "please", "thanks")
        .contains(lower)
    {
        return PosTag::Intj;
    }
    if lexicon!(
        "not", "never", "very", "really", "so", "too", "just", "always", "quite", "rather", "pretty", "again",
        "already", "still", "even", "ever", "now", "then", "here", "there", "anymore", "maybe", "perhaps",
        "somewhat", "almost", "extremely", "super", "totally",
    )
    .contains(lower)
    {
        return PosTag::Adv;
    }
    if lexicon!(
        "say", "said", "go", "went", "gone", "get", "got", "make", "made", "know", "knew", "think", "thought",
        "feel", "felt", "want", "need", "love", "hate", "like", "see", "saw", "come", "came", "take", "took",
        "give", "gave", "tell", "told", "listen", "care", "mean", "meant", "understand", "trust", "stop", "try",
        "leave", "left", "help", "call", "talk", "hear", "heard", "meet", "plan", "forgive", "apologize", "blame",
        "fight", "argue", "hurt", "lie", "lied", "let", "keep", "kept", "put", "find", "found",
    )
    .contains(lower)
    {
        return PosTag::Verb;
    }
    if lexicon!(
        "good", "bad", "great", "fine", "happy", "sad", "angry", "mad", "upset", "sure", "wrong", "right", "nice",
        "perfect", "wonderful", "awful", "terrible", "fair", "true", "false", "okay", "important", "scared",
        "afraid", "sorry", "tired", "busy", "late", "early", "hard", "easy", "new", "old", "big", "small",
    )
    .contains(lower)
    {
        return PosTag::Adj;
    }

    let len = lower.chars().count();
    if len > 3 && lower.ends_with("ly") {
        return PosTag::Adv;
    }
    if len > 4 && (lower.ends_with("ing") || lower.ends_with("ed")) {
        return PosTag::Verb;
    }
    if len > 4 && ["ful", "ous", "ive", "able", "ible", "less", "ish"].iter().any(|s| lower.ends_with(s)) {
        return PosTag::Adj;
    }

    if !sentence_initial && word.chars().next().is_some_and(char::is_uppercase) {
        return PosTag::Propn;
    }
    if word.chars().any(char::is_alphabetic) { PosTag::Noun } else { PosTag::X }
}

fn is_pictographic(c: char) -> bool {
    let mut buf = [0u8; 4];
    regex!(r"^\p{Extended_Pictographic}$").is_match(c.encode_utf8(&mut buf))
}

fn is_unicode_punct(c: char) -> bool {
    let mut buf = [0u8; 4];
    regex!(r"^\p{P}$").is_match(c.encode_utf8(&mut buf))
}

fn lemmatize(lower: &str, pos: PosTag) -> String {
    let irregular = match lower {
        "am" | "is" | "are" | "was" | "were" | "been" | "being" => Some("be"),
        "has" | "had" => Some("have"),
        "does" | "did" => Some("do"),
        "said" | "says" => Some("say"),
        "went" | "gone" => Some("go"),
        "got" => Some("get"),
        "made" => Some("make"),
        "knew" => Some("know"),
        "thought" => Some("think"),
        "felt" => Some("feel"),
        "meant" => Some("mean"),
        "told" => Some("tell"),
        "heard" => Some("hear"),
        "left" => Some("leave"),
        "don't" | "doesn't" | "didn't" => Some("do"),
        "can't" | "cannot" => Some("can"),
        "won't" => Some("will"),
        "isn't" | "aren't" | "wasn't" | "weren't" | "ain't" => Some("be"),
        "haven't" | "hasn't" | "hadn't" => Some("have"),
        "n't" => Some("not"),
        _ => None,
    };
    if let Some(lemma) = irregular {
        return lemma.to_string();
    }

    match pos {
        PosTag::Verb => {
            if let Some(stem) = lower.strip_suffix("ied") {
                return format!("{stem}y");
            }
            for suffix in ["ing", "ed"] {
                if let Some(stem) = lower.strip_suffix(suffix) {
                    if stem.chars().count() >= 3 {
                        return undouble(stem);
                    }
                }
            }
            lower.to_string()
        }
        PosTag::Noun => {
            if let Some(stem) = lower.strip_suffix("ies") {
                if stem.chars().count() >= 2 {
                    return format!("{stem}y");
                }
            }
            if lower.ends_with('s') && !lower.ends_with("ss") && lower.chars().count() > 3 {
                return lower[..lower.len() - 1].to_string();
            }
            lower.to_string()
        }
        _ => lower.to_string(),
    }
}

/// "stopp" -> "stop"
fn undouble(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    if let [.., a, b] = chars.as_slice() {
        if a == b && !"aeiouls".contains(*b) {
            return chars[..chars.len() - 1].iter().collect();
        }
    }
    stem.to_string()
}

//! Entity extractor.
//!
//! Four fixed regex families. Each family scans the text independently; the
//! results are merged and stably sorted by start offset. Spans from different
//! families may overlap ("Dr. June Park" is a PERSON and contains a month) and
//! are kept as is.

use crate::engine::trigger::SignalMask;
use crate::text::is_stop_word;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityKind {
    Person,
    Date,
    Org,
    Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub kind: EntityKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

pub(crate) fn extract(text: &str, signals: SignalMask) -> Vec<Entity> {
    let mut out = Vec::new();
    people(text, signals, &mut out);
    dates(text, signals, &mut out);
    orgs(text, &mut out);
    money(text, signals, &mut out);
    out.sort_by_key(|e| e.start);
    out
}

fn push(out: &mut Vec<Entity>, kind: EntityKind, text: &str, start: usize, end: usize) {
    out.push(Entity { kind, text: text[start..end].to_string(), start, end });
}

fn people(text: &str, signals: SignalMask, out: &mut Vec<Entity>) {
    let titled = regex!(r"\b(?:Mr|Mrs|Ms|Mx|Dr|Prof)\.?\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?");
    let mut titled_spans = Vec::new();
    for m in titled.find_iter(text) {
        titled_spans.push((m.start(), m.end()));
        push(out, EntityKind::Person, text, m.start(), m.end());
    }

    if !signals.contains(SignalMask::HAS_CAPITALIZED) {
        return;
    }
    // Two capitalized words, neither of them a function word ("Oh Great" is not a name).
    for m in regex!(r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\b").find_iter(text) {
        if titled_spans.iter().any(|&(s, e)| m.start() < e && s < m.end()) {
            continue;
        }
        let plain = m.as_str().split_whitespace().all(|w| {
            let lower = w.to_lowercase();
            !is_stop_word(&lower) && !is_filler(&lower) && !is_calendar_word(&lower) && !is_org_suffix(&lower)
        });
        if plain {
            push(out, EntityKind::Person, text, m.start(), m.end());
        }
    }
}

fn dates(text: &str, signals: SignalMask, out: &mut Vec<Entity>) {
    let named = regex!(
        r"(?ix)
        \b(?:
            (?:next|last|this)\s+(?:week|month|year|weekend|monday|tuesday|wednesday|thursday|friday|saturday|sunday)
          | (?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)s?
          | (?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)
            (?:\s+\d{1,2}(?:st|nd|rd|th)?)?
          | today|tonight|tomorrow|yesterday
        )\b"
    );
    for m in named.find_iter(text) {
        push(out, EntityKind::Date, text, m.start(), m.end());
    }

    if signals.contains(SignalMask::HAS_DIGITS) {
        for m in regex!(r"\b\d{1,2}/\d{1,2}(?:/\d{2,4})?\b|\b\d{4}-\d{2}-\d{2}\b").find_iter(text) {
            push(out, EntityKind::Date, text, m.start(), m.end());
        }
    }
}

fn orgs(text: &str, out: &mut Vec<Entity>) {
    let re = regex!(
        r"\b(?:[A-Z][\w&]*\s+)+(?:Inc|LLC|Ltd|Corp|Company|School|Elementary|University|College|Hospital|Bank|Church|Clinic)\b\.?"
    );
    for m in re.find_iter(text) {
        push(out, EntityKind::Org, text, m.start(), m.end());
    }
}

fn money(text: &str, signals: SignalMask, out: &mut Vec<Entity>) {
    if !signals.intersects(SignalMask::HAS_DIGITS | SignalMask::HAS_CURRENCY) {
        return;
    }
    let re = regex!(
        r"(?i)[$€£¥]\s?\d[\d,]*(?:\.\d{1,2})?(?:\s?(?:k|m|bn)\b)?|\b\d[\d,]*(?:\.\d{1,2})?\s?(?:dollars|bucks|euros|pounds|usd|eur|gbp)\b"
    );
    for m in re.find_iter(text) {
        push(out, EntityKind::Money, text, m.start(), m.end());
    }
}

fn is_filler(lower: &str) -> bool {
    lexicon!("oh", "wow", "hey", "yeah", "well", "okay", "ok", "please", "thanks", "great", "sure", "fine", "good", "no", "yes")
        .contains(lower)
}

fn is_calendar_word(lower: &str) -> bool {
    lexicon!(
        "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "january", "february",
        "march", "april", "may", "june", "july", "august", "september", "october", "november", "december",
        "today", "tomorrow", "tonight", "yesterday",
    )
    .contains(lower)
}

fn is_org_suffix(lower: &str) -> bool {
    lexicon!("inc", "llc", "ltd", "corp", "company", "school", "elementary", "university", "college", "hospital", "bank")
        .contains(lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::trigger::TriggerInfo;

    fn run(text: &str) -> Vec<(EntityKind, String)> {
        extract(text, TriggerInfo::scan(text).signals).into_iter().map(|e| (e.kind, e.text)).collect()
    }

    #[test]
    fn families_merge_sorted_by_start() {
        let got = run("Tell Dr. Patel I paid $40.50 on Friday");
        assert_eq!(
            got,
            vec![
                (EntityKind::Person, "Dr. Patel".to_string()),
                (EntityKind::Money, "$40.50".to_string()),
                (EntityKind::Date, "Friday".to_string()),
            ]
        );
    }

    #[test]
    fn orgs_and_dates_in_one_message() {
        let got = run("Pick them up at Lincoln Elementary School tomorrow");
        assert!(got.contains(&(EntityKind::Org, "Lincoln Elementary School".to_string())));
        assert!(got.contains(&(EntityKind::Date, "tomorrow".to_string())));
    }

    #[test]
    fn overlapping_families_are_kept() {
        let got = run("Ask Dr. June Park");
        assert_eq!(
            got,
            vec![(EntityKind::Person, "Dr. June Park".to_string()), (EntityKind::Date, "June".to_string())]
        );
    }

    #[test]
    fn capitalized_pairs_need_content_words() {
        assert_eq!(run("I saw Maria Lopez there"), vec![(EntityKind::Person, "Maria Lopez".to_string())]);
        assert!(run("Oh Great").is_empty());
    }

    #[test]
    fn money_needs_digits() {
        assert_eq!(run("it was 20 bucks"), vec![(EntityKind::Money, "20 bucks".to_string())]);
        assert!(run("bucks everywhere").is_empty());
    }

    #[test]
    fn numeric_dates() {
        assert_eq!(run("due 3/14"), vec![(EntityKind::Date, "3/14".to_string())]);
    }
}

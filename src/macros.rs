/// Lazily compiled static regex. Only for literal patterns known to be valid;
/// patterns coming from configuration go through `engine::compiled`.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Lazily built static word set for the fixed lexicons (pronouns, auxiliaries,
/// negation words, ...).
#[macro_export]
macro_rules! lexicon {
    ($($word:literal),* $(,)?) => {{
        static SET: once_cell::sync::Lazy<std::collections::HashSet<&'static str>> =
            once_cell::sync::Lazy::new(|| [$($word),*].into_iter().collect());
        &*SET
    }};
}

//! Lightweight language detection over the dialogue's free-text answers.
//!
//! Stopword scoring only, enough to pick the phrasing of the generated
//! system prompt, nowhere near a general-purpose detector.

const STOPWORDS: [(&str, &[&str]); 5] = [
    (
        "en",
        &[
            "the", "and", "with", "for", "my", "me", "to", "of", "help", "about", "should", "it",
        ],
    ),
    (
        "es",
        &[
            "el", "la", "los", "las", "con", "para", "que", "mis", "ayuda", "trabajo", "sobre", "una",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "und", "mit", "für", "mir", "meine", "bei", "nicht", "ich", "soll",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "et", "avec", "pour", "mes", "aide", "dans", "je", "mon", "une",
        ],
    ),
    (
        "cs",
        &[
            "a", "se", "na", "je", "s", "mi", "pro", "aby", "které", "pomoc", "moje", "práce",
        ],
    ),
];

/// Minimum stopword hits before a detection counts. Below this the corpus
/// is too thin to say anything (menu picks, single words).
const MIN_HITS: usize = 2;

/// Detect the dominant language of a corpus, or `None` when inconclusive.
pub fn detect(corpus: &str) -> Option<&'static str> {
    let words: Vec<String> = corpus
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    if words.is_empty() {
        return None;
    }

    let mut best: Option<(&'static str, usize)> = None;
    for (lang, stopwords) in STOPWORDS {
        let hits = words.iter().filter(|w| stopwords.contains(&w.as_str())).count();
        if hits >= MIN_HITS && best.map_or(true, |(_, b)| hits > b) {
            best = Some((lang, hits));
        }
    }
    best.map(|(lang, _)| lang)
}

/// Run detection incrementally over the accumulated answers, the way the
/// dialogue does after each free-text step: the latest non-null detection
/// wins, so a late answer in another language overrides an early guess.
pub fn incremental_detect<S: AsRef<str>>(texts: &[S]) -> Option<String> {
    let mut latest = None;
    let mut corpus = String::new();
    for text in texts {
        if !corpus.is_empty() {
            corpus.push(' ');
        }
        corpus.push_str(text.as_ref());
        if let Some(lang) = detect(&corpus) {
            latest = Some(lang.to_string());
        }
    }
    latest
}

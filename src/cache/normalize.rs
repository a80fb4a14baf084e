//! Topic normalization.
//!
//! Two topic strings that mean the same thing must produce the same cache
//! key. The pipeline, applied per whitespace-separated token:
//!
//! 1. lowercase the whole string
//! 2. trim sentence punctuation from token edges (`c++`, `c#`, `node.js` survive)
//! 3. drop leading filler phrases such as "what is" or "explain", as long as
//!    something remains
//! 4. expand whole-token abbreviations ("ai" -> "artificial intelligence")
//! 5. join with single spaces
//!
//! Every step is a fixed point of itself and no expansion re-enables an
//! earlier step, so `normalize(normalize(s)) == normalize(s)`.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Characters stripped from the start and end of each token.
const EDGE_PUNCTUATION: &[char] = &[
    '?', '!', '.', ',', ';', ':', '"', '\'', '`', '(', ')', '[', ']', '{', '}', '*', '_', '~',
];

/// Leading phrases that carry no topic meaning. Longer phrases come first.
const FILLER_PREFIXES: &[&[&str]] = &[
    &["can", "you", "please", "explain"],
    &["can", "you", "explain"],
    &["help", "me", "understand"],
    &["i", "want", "to", "know", "about"],
    &["i", "want", "to", "know"],
    &["please", "explain"],
    &["tell", "me", "about"],
    &["tell", "me"],
    &["what", "is"],
    &["what", "are"],
    &["whats"],
    &["how", "does"],
    &["how", "do"],
    &["give", "me"],
    &["show", "me"],
    &["help", "with"],
    &["explain"],
    &["describe"],
    &["define"],
];

/// Whole-token abbreviation table. Expansions never contain a key and never
/// start with a filler phrase.
pub(crate) const ABBREVIATION_TABLE: &[(&str, &str)] = &[
    ("ai", "artificial intelligence"),
    ("ml", "machine learning"),
    ("dl", "deep learning"),
    ("nlp", "natural language processing"),
    ("llm", "large language model"),
    ("llms", "large language models"),
    ("nn", "neural network"),
    ("cnn", "convolutional neural network"),
    ("rnn", "recurrent neural network"),
    ("rl", "reinforcement learning"),
    ("os", "operating system"),
    ("db", "database"),
    ("dbms", "database management system"),
    ("oop", "object oriented programming"),
    ("api", "application programming interface"),
    ("cpu", "central processing unit"),
    ("gpu", "graphics processing unit"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("k8s", "kubernetes"),
    ("dns", "domain name system"),
    ("dna", "deoxyribonucleic acid"),
    ("rna", "ribonucleic acid"),
];

static ABBREVIATIONS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ABBREVIATION_TABLE.iter().copied().collect());

/// Canonicalize a raw topic string. Pure and deterministic.
pub fn normalize(raw_topic: &str) -> String {
    let lowered = raw_topic.to_lowercase();
    let mut tokens: Vec<&str> = lowered
        .split_whitespace()
        .map(|t| t.trim_matches(EDGE_PUNCTUATION))
        .filter(|t| !t.is_empty())
        .collect();

    strip_filler_prefixes(&mut tokens);

    let mut out = String::with_capacity(lowered.len());
    for token in tokens {
        let word = ABBREVIATIONS.get(token).copied().unwrap_or(token);
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn strip_filler_prefixes(tokens: &mut Vec<&str>) {
    'scan: loop {
        for prefix in FILLER_PREFIXES {
            // never strip the whole topic away
            if tokens.len() > prefix.len() && tokens.starts_with(prefix) {
                tokens.drain(..prefix.len());
                continue 'scan;
            }
        }
        break;
    }
}

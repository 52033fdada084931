//! Porter stemming for metadata search terms.
//!
//! The store indexes metadata words by their Porter stem, so query words go
//! through the same reduction before lookup: `antibiotics` becomes
//! `antibiot` and `crying` becomes `cry`.
//!
//! Only ASCII alphabetic words longer than two letters are reduced; anything
//! else is returned lowercased.

pub fn stem(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if lower.len() <= 2 || !lower.bytes().all(|b| b.is_ascii_lowercase()) {
        return lower;
    }

    let mut w = lower.into_bytes();
    step1a(&mut w);
    step1b(&mut w);
    step1c(&mut w);
    step2(&mut w);
    step3(&mut w);
    step4(&mut w);
    step5(&mut w);

    // Only ASCII lowercase bytes ever enter `w`.
    String::from_utf8(w).unwrap_or_default()
}

fn is_consonant(w: &[u8], i: usize) -> bool {
    match w[i] {
        b'a' | b'e' | b'i' | b'o' | b'u' => false,
        b'y' => i == 0 || !is_consonant(w, i - 1),
        _ => true,
    }
}

/// Number of vowel-consonant sequences in `w`, the `m` of [C](VC)^m[V].
fn measure(w: &[u8]) -> usize {
    let n = w.len();
    let mut i = 0;
    let mut m = 0;

    while i < n && is_consonant(w, i) {
        i += 1;
    }
    loop {
        while i < n && !is_consonant(w, i) {
            i += 1;
        }
        if i >= n {
            return m;
        }
        while i < n && is_consonant(w, i) {
            i += 1;
        }
        m += 1;
    }
}

fn has_vowel(w: &[u8]) -> bool {
    (0..w.len()).any(|i| !is_consonant(w, i))
}

fn ends_double_consonant(w: &[u8]) -> bool {
    let n = w.len();
    n >= 2 && w[n - 1] == w[n - 2] && is_consonant(w, n - 1)
}

/// consonant-vowel-consonant ending where the last letter is not w, x or y.
fn ends_cvc(w: &[u8]) -> bool {
    let n = w.len();
    n >= 3
        && is_consonant(w, n - 3)
        && !is_consonant(w, n - 2)
        && is_consonant(w, n - 1)
        && !matches!(w[n - 1], b'w' | b'x' | b'y')
}

fn stem_len(w: &[u8], suffix: &str) -> Option<usize> {
    w.ends_with(suffix.as_bytes()).then(|| w.len() - suffix.len())
}

fn replace_suffix(w: &mut Vec<u8>, at: usize, replacement: &str) {
    w.truncate(at);
    w.extend_from_slice(replacement.as_bytes());
}

/// Applies the first rule whose suffix matches, if the remaining stem
/// measures more than `min_measure`.
fn apply_rules(w: &mut Vec<u8>, rules: &[(&str, &str)], min_measure: usize) {
    for (suffix, replacement) in rules {
        if let Some(at) = stem_len(w, suffix) {
            if measure(&w[..at]) > min_measure {
                replace_suffix(w, at, replacement);
            }
            return;
        }
    }
}

fn step1a(w: &mut Vec<u8>) {
    if let Some(at) = stem_len(w, "sses") {
        replace_suffix(w, at, "ss");
    } else if let Some(at) = stem_len(w, "ies") {
        replace_suffix(w, at, "i");
    } else if w.ends_with(b"s") && !w.ends_with(b"ss") {
        w.pop();
    }
}

fn step1b(w: &mut Vec<u8>) {
    if let Some(at) = stem_len(w, "eed") {
        if measure(&w[..at]) > 0 {
            replace_suffix(w, at, "ee");
        }
        return;
    }

    let view: &[u8] = w;
    let at = match stem_len(view, "ed").or_else(|| stem_len(view, "ing")) {
        Some(at) if has_vowel(&view[..at]) => at,
        _ => return,
    };
    w.truncate(at);

    if w.ends_with(b"at") || w.ends_with(b"bl") || w.ends_with(b"iz") {
        w.push(b'e');
    } else if ends_double_consonant(w) && !matches!(w[w.len() - 1], b'l' | b's' | b'z') {
        w.pop();
    } else if measure(w) == 1 && ends_cvc(w) {
        w.push(b'e');
    }
}

fn step1c(w: &mut Vec<u8>) {
    if let Some(at) = stem_len(w, "y") {
        if has_vowel(&w[..at]) {
            replace_suffix(w, at, "i");
        }
    }
}

fn step2(w: &mut Vec<u8>) {
    const RULES: &[(&str, &str)] = &[
        ("ational", "ate"),
        ("tional", "tion"),
        ("enci", "ence"),
        ("anci", "ance"),
        ("izer", "ize"),
        ("bli", "ble"),
        ("alli", "al"),
        ("entli", "ent"),
        ("eli", "e"),
        ("ousli", "ous"),
        ("ization", "ize"),
        ("ation", "ate"),
        ("ator", "ate"),
        ("alism", "al"),
        ("iveness", "ive"),
        ("fulness", "ful"),
        ("ousness", "ous"),
        ("aliti", "al"),
        ("iviti", "ive"),
        ("biliti", "ble"),
        ("logi", "log"),
    ];
    apply_rules(w, RULES, 0);
}

fn step3(w: &mut Vec<u8>) {
    const RULES: &[(&str, &str)] = &[
        ("icate", "ic"),
        ("ative", ""),
        ("alize", "al"),
        ("iciti", "ic"),
        ("ical", "ic"),
        ("ful", ""),
        ("ness", ""),
    ];
    apply_rules(w, RULES, 0);
}

fn step4(w: &mut Vec<u8>) {
    const SUFFIXES: &[&str] = &[
        "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent", "ion",
        "ou", "ism", "ate", "iti", "ous", "ive", "ize",
    ];

    // Longest suffix wins among those that match.
    let view: &[u8] = w;
    let Some((suffix, at)) = SUFFIXES
        .iter()
        .filter_map(|s| stem_len(view, s).map(|at| (*s, at)))
        .min_by_key(|(_, at)| *at)
    else {
        return;
    };

    if suffix == "ion" && !matches!(w[..at].last(), Some(b's') | Some(b't')) {
        return;
    }
    if measure(&w[..at]) > 1 {
        w.truncate(at);
    }
}

fn step5(w: &mut Vec<u8>) {
    if let Some(at) = stem_len(w, "e") {
        let m = measure(&w[..at]);
        if m > 1 || (m == 1 && !ends_cvc(&w[..at])) {
            w.truncate(at);
        }
    }
    if measure(w) > 1 && ends_double_consonant(w) && w.ends_with(b"l") {
        w.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples_from_help_text() {
        assert_eq!(stem("antibiotics"), "antibiot");
        assert_eq!(stem("crying"), "cry");
    }

    #[test]
    fn test_porter_reference_words() {
        let cases = [
            ("caresses", "caress"),
            ("ponies", "poni"),
            ("cats", "cat"),
            ("feed", "feed"),
            ("agreed", "agre"),
            ("plastered", "plaster"),
            ("motoring", "motor"),
            ("sing", "sing"),
            ("hopping", "hop"),
            ("filing", "file"),
            ("happy", "happi"),
            ("relational", "relat"),
            ("hopeful", "hope"),
            ("goodness", "good"),
            ("adoption", "adopt"),
            ("controlling", "control"),
            ("generalization", "gener"),
        ];
        for (word, expected) in cases {
            assert_eq!(stem(word), expected, "stem({word})");
        }
    }

    #[test]
    fn test_short_and_non_alphabetic_words_untouched() {
        assert_eq!(stem("ph"), "ph");
        assert_eq!(stem("Is"), "is");
        assert_eq!(stem("10317"), "10317");
        assert_eq!(stem("age_days"), "age_days");
        assert_eq!(stem("Infants"), "infant");
    }
}

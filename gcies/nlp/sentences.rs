use once_cell::sync::Lazy;
use regex::Regex;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^=+[^=].*=+$").expect("heading pattern is valid"));

/// Lower-cased tokens that end with a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "st", "mt", "ft", "dr", "mr", "mrs", "ms", "jr", "sr", "no", "vs", "ca", "approx", "gen",
    "col", "lt", "rev", "prof",
];

/// Collapses every whitespace run into a single space and trims the ends.
#[must_use]
pub fn compact_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits text into sentences.
///
/// Blank lines and wiki-style `== Heading ==` lines are hard boundaries;
/// consecutive non-blank lines are joined before punctuation-based splitting.
/// Periods after initials, dotted abbreviations (`U.S.`) and common titles
/// (`St.`, `Mt.`) do not end a sentence, nor does punctuation followed by a
/// lowercase word.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut block = String::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || HEADING_RE.is_match(line) {
            flush_block(&mut block, &mut sentences);
            continue;
        }
        if !block.is_empty() {
            block.push(' ');
        }
        block.push_str(line);
    }
    flush_block(&mut block, &mut sentences);
    sentences
}

fn flush_block(block: &mut String, out: &mut Vec<String>) {
    if !block.is_empty() {
        split_block(block, out);
        block.clear();
    }
}

fn split_block(block: &str, out: &mut Vec<String>) {
    let chars: Vec<(usize, char)> = block.char_indices().collect();
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        let (pos, ch) = chars[i];
        if !is_terminal(ch) {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        while j < chars.len() && (is_terminal(chars[j].1) || is_closing(chars[j].1)) {
            j += 1;
        }
        let end = chars.get(j).map_or(block.len(), |&(p, _)| p);
        let boundary = match chars.get(j) {
            None => true,
            Some(&(_, next)) if next.is_whitespace() => {
                let next_visible = chars[j..]
                    .iter()
                    .map(|&(_, c)| c)
                    .find(|c| !c.is_whitespace());
                let abbreviated = ch == '.' && ends_with_abbreviation(&block[start..pos]);
                !abbreviated && !next_visible.is_some_and(char::is_lowercase)
            }
            Some(_) => false,
        };
        if boundary {
            push_sentence(&block[start..end], out);
            start = end;
        }
        i = j;
    }
    push_sentence(&block[start..], out);
}

const fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

const fn is_closing(ch: char) -> bool {
    matches!(ch, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

fn ends_with_abbreviation(prefix: &str) -> bool {
    let word = prefix
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(|c: char| !c.is_alphanumeric());
    if word.is_empty() {
        return false;
    }
    if word.contains('.') {
        return true;
    }
    let mut letters = word.chars();
    if let (Some(first), None) = (letters.next(), letters.next()) {
        return first.is_alphabetic();
    }
    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

fn push_sentence(raw: &str, out: &mut Vec<String>) {
    let sentence = compact_whitespace(raw);
    if sentence.chars().any(char::is_alphanumeric) {
        out.push(sentence);
    }
}

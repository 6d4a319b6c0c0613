//! Chunk and query cleanup.
//!
//! Corpus text arrives from web scrapes, OCR'd PDFs, and office documents,
//! so it carries markup, soft hyphens, `gidNNNNN` glyph spam, and shouting
//! banner lines. The normalizer strips all of that so tokenization and
//! overlap scoring see the words that were actually written.

use regex_lite::Regex;

/// Characters removed outright: soft hyphen, zero-width family, tatweel.
const INVISIBLES: [char; 5] = ['\u{00ad}', '\u{200b}', '\u{200c}', '\u{200d}', '\u{0640}'];

/// Bullet glyphs replaced with a space.
const BULLETS: [char; 6] = ['\u{2022}', '\u{25aa}', '\u{25cf}', '\u{25e6}', '\u{2023}', '\u{00b7}'];

/// Punctuation collapsed when repeated more than twice.
const RUN_PUNCT: [char; 4] = ['.', '!', '?', '\u{060c}'];

/// Text normalizer with pre-compiled patterns.
///
/// Construction is cheap enough for tests, but callers are expected to build
/// one and reuse it across a whole retrieval session.
pub struct Normalizer {
    html_tag: Option<Regex>,
    md_image: Option<Regex>,
    md_link: Option<Regex>,
    gid_spam: Option<Regex>,
}

impl Normalizer {
    /// Create a normalizer. Patterns that fail to compile are skipped.
    pub fn new() -> Self {
        Self {
            html_tag: Regex::new(r"<[^>]+>").ok(),
            md_image: Regex::new(r"!\[[^\]]*\]\([^)]*\)").ok(),
            md_link: Regex::new(r"\[([^\]]*)\]\([^)]*\)").ok(),
            gid_spam: Regex::new(r"/?gid\d{5}").ok(),
        }
    }

    /// Clean one block of text.
    ///
    /// Removes markup and OCR artifacts, drops all-caps banner lines, joins
    /// hyphenated line breaks, and collapses repeated punctuation and
    /// whitespace. Pure; returns a fresh string.
    pub fn normalize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut t: String = text
            .chars()
            .filter(|c| !INVISIBLES.contains(c))
            .map(|c| if BULLETS.contains(&c) { ' ' } else { c })
            .collect();

        t = join_hyphenated_breaks(&t);

        if let Some(re) = &self.md_image {
            t = re.replace_all(&t, " ").into_owned();
        }
        if let Some(re) = &self.md_link {
            t = re.replace_all(&t, "$1").into_owned();
        }
        if let Some(re) = &self.html_tag {
            t = re.replace_all(&t, " ").into_owned();
        }
        if let Some(re) = &self.gid_spam {
            t = re.replace_all(&t, " ").into_owned();
        }

        let kept: Vec<&str> = t.lines().filter(|line| !is_banner_line(line)).collect();
        t = kept.join("\n");

        t = t.replace('\u{2013}', "-").replace('\u{2014}', "-");
        t = t.replace('\u{2026}', "...");
        t = collapse_punct_runs(&t);

        t.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Join hyphenated line breaks: "germinat- ed" becomes "germinated".
///
/// Applies only when a letter precedes the hyphen and a letter follows the
/// whitespace run, so numeric ranges like "3 - 4" survive.
fn join_hyphenated_breaks(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '-' && i > 0 && chars[i - 1].is_alphabetic() {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j > i + 1 && j < chars.len() && chars[j].is_alphabetic() {
                i = j;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Collapse runs of the same sentence punctuation longer than two.
fn collapse_punct_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last: Option<char> = None;
    let mut run = 0usize;
    for c in text.chars() {
        if RUN_PUNCT.contains(&c) && last == Some(c) {
            run += 1;
            if run > 2 {
                continue;
            }
        } else {
            run = 1;
        }
        last = Some(c);
        out.push(c);
    }
    out
}

/// Banner noise: a long line of mostly uppercase letters with no sentence
/// punctuation, e.g. "QUARTERLY PROCUREMENT REVIEW DECK".
fn is_banner_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.chars().count() <= 14 {
        return false;
    }
    if trimmed.contains(['.', '!', '?']) {
        return false;
    }
    let letters: Vec<char> = trimmed.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return false;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    (upper as f32) / (letters.len() as f32) > 0.6
}

//! Dictionary-optional Indonesian stemmer.
//!
//! Affix stripping follows the Tala rule set: particles, possessive pronouns,
//! first-order prefixes with consonant recoding, second-order prefixes and
//! derivational suffixes, guarded by a syllable (vowel) count. A root-word
//! list stops stemming as soon as the current form is a known root and picks
//! the recoding that yields a known root. A curated list of common roots is
//! compiled in; a full dictionary file can replace it.

use crate::error::Result;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Which first/second order prefix was removed; drives suffix compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    None,
    /// di-, me-, meng-, men-, mem-, meny-, ter-
    Me,
    /// pe-, per-
    Pe,
    /// ke-, peng-, pen-, pem-, peny-
    Ke,
    /// ber-, be-
    Ber,
}

const BUNDLED_ROOTS: &str = include_str!("../resources/kata-dasar");

#[derive(Debug, Clone)]
pub struct IndonesianStemmer {
    root_words: HashSet<String>,
}

impl Default for IndonesianStemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl IndonesianStemmer {
    /// Stemmer backed by the bundled root-word list.
    pub fn new() -> Self {
        Self::from_lines(BUNDLED_ROOTS)
    }

    /// Affix rules only; recoding always takes the default consonant.
    pub fn rules_only() -> Self {
        Self { root_words: HashSet::new() }
    }

    pub fn with_root_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { root_words: words.into_iter().map(Into::into).collect() }
    }

    /// One root word per line; blank lines ignored.
    pub fn load_root_words<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let stemmer = Self::from_lines(&text);
        info!(path = %path.as_ref().display(), roots = stemmer.root_words.len(), "root words loaded");
        Ok(stemmer)
    }

    fn from_lines(text: &str) -> Self {
        Self::with_root_words(text.lines().map(str::trim).filter(|w| !w.is_empty()))
    }

    pub fn stem(&self, word: &str) -> String {
        if !word.is_ascii() {
            return word.to_string();
        }
        // Reduplication: "ngomong-ngomong" -> "ngomong" when both halves agree.
        if let Some((left, right)) = word.split_once('-') {
            if right.contains('-') || left.is_empty() || right.is_empty() {
                return word.to_string();
            }
            let (l, r) = (self.stem_single(left), self.stem_single(right));
            return if l == r { l } else { word.to_string() };
        }
        self.stem_single(word)
    }

    fn is_root(&self, w: &str) -> bool {
        self.root_words.contains(w)
    }

    fn stem_single(&self, word: &str) -> String {
        let mut w = word.to_string();
        if self.is_root(&w) {
            return w;
        }
        let mut measure = vowel_count(&w);
        if measure <= 2 {
            return w;
        }

        if strip_suffix_any(&mut w, &["kah", "lah", "pun"]) {
            measure -= 1;
            if self.is_root(&w) {
                return w;
            }
        }
        if measure > 2 && strip_suffix_any(&mut w, &["nya", "ku", "mu"]) {
            measure -= 1;
            if self.is_root(&w) {
                return w;
            }
        }
        if measure <= 2 {
            return w;
        }

        match self.remove_first_order_prefix(&mut w) {
            Some(prefix) => {
                measure -= 1;
                if self.is_root(&w) {
                    return w;
                }
                if measure > 2 && remove_suffix(&mut w, prefix) {
                    measure -= 1;
                    if self.is_root(&w) {
                        return w;
                    }
                }
                if measure > 2 {
                    remove_second_order_prefix(&mut w);
                }
            }
            None => {
                let prefix = match remove_second_order_prefix(&mut w) {
                    Some(p) => {
                        measure -= 1;
                        if self.is_root(&w) {
                            return w;
                        }
                        p
                    }
                    None => Prefix::None,
                };
                if measure > 2 {
                    remove_suffix(&mut w, prefix);
                }
            }
        }
        w
    }

    fn remove_first_order_prefix(&self, w: &mut String) -> Option<Prefix> {
        let vowel_at = |i: usize| w.as_bytes().get(i).map_or(false, |b| is_vowel(*b));

        // Recoding forms first (longest match).
        for (pre, kind) in [("meny", Prefix::Me), ("peny", Prefix::Ke)] {
            if w.starts_with(pre) && vowel_at(4) {
                let rest = &w[4..];
                *w = self.prefer(format!("s{rest}"), &[format!("ny{rest}")]);
                return Some(kind);
            }
        }
        for (pre, kind) in [("meng", Prefix::Me), ("peng", Prefix::Ke)] {
            if w.starts_with(pre) && w.len() > 4 {
                let rest = &w[4..];
                let alts = if vowel_at(4) { vec![format!("k{rest}")] } else { Vec::new() };
                *w = self.prefer(rest.to_string(), &alts);
                return Some(kind);
            }
        }
        for (pre, kind) in [("mem", Prefix::Me), ("pem", Prefix::Ke)] {
            if w.starts_with(pre) && w.len() > 3 {
                let rest = &w[3..];
                *w = if vowel_at(3) {
                    self.prefer(format!("p{rest}"), &[format!("m{rest}")])
                } else {
                    rest.to_string()
                };
                return Some(kind);
            }
        }
        for (pre, kind) in [("men", Prefix::Me), ("pen", Prefix::Ke)] {
            if w.starts_with(pre) && w.len() > 3 {
                let rest = &w[3..];
                let alts = if vowel_at(3) { vec![format!("t{rest}"), format!("n{rest}")] } else { Vec::new() };
                *w = self.prefer(rest.to_string(), &alts);
                return Some(kind);
            }
        }
        for (pre, kind) in [("ter", Prefix::Me), ("di", Prefix::Me), ("me", Prefix::Me), ("ke", Prefix::Ke)] {
            if w.starts_with(pre) && w.len() > pre.len() {
                w.replace_range(..pre.len(), "");
                return Some(kind);
            }
        }
        None
    }

    /// The first alternative that is, or reduces by one suffix to, a known root; else `default`.
    fn prefer(&self, default: String, alts: &[String]) -> String {
        alts.iter().find(|a| self.resolves(a)).cloned().unwrap_or(default)
    }

    fn resolves(&self, w: &str) -> bool {
        self.is_root(w)
            || ["kan", "an", "i"]
                .iter()
                .any(|s| w.strip_suffix(s).map_or(false, |r| self.is_root(r)))
    }
}

fn remove_second_order_prefix(w: &mut String) -> Option<Prefix> {
    if w.as_str() == "belajar" || w.as_str() == "pelajar" {
        let kind = if w.starts_with('b') { Prefix::Ber } else { Prefix::Pe };
        *w = "ajar".to_string();
        return Some(kind);
    }
    if w.starts_with("ber") && w.len() > 3 {
        w.replace_range(..3, "");
        return Some(Prefix::Ber);
    }
    if w.starts_with("per") && w.len() > 3 {
        w.replace_range(..3, "");
        return Some(Prefix::Pe);
    }
    // be- only before consonant + "er": "bekerja" -> "kerja".
    let b = w.as_bytes();
    if w.starts_with("be") && b.len() > 4 && !is_vowel(b[2]) && &b[3..5] == b"er" {
        w.replace_range(..2, "");
        return Some(Prefix::Ber);
    }
    if w.starts_with("pe") && w.len() > 2 {
        w.replace_range(..2, "");
        return Some(Prefix::Pe);
    }
    None
}

fn remove_suffix(w: &mut String, prefix: Prefix) -> bool {
    // pe-/ke- never pair with -kan, so "pemasukan" is pe- + masuk + -an.
    if w.ends_with("kan") && w.len() > 3 && prefix != Prefix::Ke && prefix != Prefix::Pe {
        w.truncate(w.len() - 3);
        return true;
    }
    if w.ends_with("an") && w.len() > 2 {
        if prefix == Prefix::Me {
            return false;
        }
        w.truncate(w.len() - 2);
        return true;
    }
    if w.ends_with('i') && w.len() > 1 {
        let allowed = matches!(prefix, Prefix::None | Prefix::Me | Prefix::Pe);
        let after_s = w.as_bytes()[w.len() - 2] == b's';
        if !allowed || after_s {
            return false;
        }
        w.truncate(w.len() - 1);
        return true;
    }
    false
}

fn strip_suffix_any(w: &mut String, suffixes: &[&str]) -> bool {
    for s in suffixes {
        if w.ends_with(s) && w.len() > s.len() {
            w.truncate(w.len() - s.len());
            return true;
        }
    }
    false
}

fn is_vowel(b: u8) -> bool {
    matches!(b, b'a' | b'e' | b'i' | b'o' | b'u')
}

fn vowel_count(w: &str) -> usize {
    w.bytes().filter(|b| is_vowel(*b)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_words_untouched() {
        let s = IndonesianStemmer::new();
        for w in ["gacor", "info", "join", "aku", "menang", "dm"] {
            assert_eq!(s.stem(w), w);
        }
    }

    #[test]
    fn strips_prefix_and_suffix() {
        let s = IndonesianStemmer::new();
        assert_eq!(s.stem("dimainkan"), "main");
        assert_eq!(s.stem("bermain"), "main");
        assert_eq!(s.stem("permainan"), "main");
        assert_eq!(s.stem("kemenangan"), "menang");
        assert_eq!(s.stem("membaca"), "baca");
        assert_eq!(s.stem("menyapu"), "sapu");
        assert_eq!(s.stem("memukul"), "pukul");
        assert_eq!(s.stem("bekerja"), "kerja");
        assert_eq!(s.stem("belajar"), "ajar");
    }

    #[test]
    fn particles_and_possessives() {
        let s = IndonesianStemmer::new();
        assert_eq!(s.stem("apapun"), "apa");
        assert_eq!(s.stem("bukunya"), "buku");
        assert_eq!(s.stem("rumahku"), "rumah");
    }

    #[test]
    fn reduplication_collapses() {
        let s = IndonesianStemmer::new();
        assert_eq!(s.stem("ngomong-ngomong"), "ngomong");
        assert_eq!(s.stem("kira-kiranya"), "kira");
        assert_eq!(s.stem("ramah-tamah"), "ramah-tamah");
    }

    #[test]
    fn bundled_roots_resolve_promo_words() {
        let s = IndonesianStemmer::new();
        assert_eq!(s.stem("pemain"), "main");
        assert_eq!(s.stem("pemenang"), "menang");
        assert_eq!(s.stem("terpercaya"), "percaya");
        assert_eq!(s.stem("pemasukan"), "masuk");
        assert_eq!(s.stem("menulis"), "tulis");
        assert_eq!(s.stem("mendaftar"), "daftar");
        assert_eq!(s.stem("keuntungan"), "untung");
    }

    #[test]
    fn default_stemmer_uses_bundled_roots() {
        assert_eq!(IndonesianStemmer::default().stem("pemain"), "main");
        assert_eq!(IndonesianStemmer::rules_only().stem("pemain"), "pain");
    }

    #[test]
    fn root_file_replaces_bundled_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kata-dasar.txt");
        std::fs::write(&path, "tulis\n\n").unwrap();
        let s = IndonesianStemmer::load_root_words(&path).unwrap();
        assert_eq!(s.stem("menulis"), "tulis");
        assert_eq!(s.stem("pemain"), "pain");
    }

    #[test]
    fn root_words_guide_recoding() {
        let plain = IndonesianStemmer::rules_only();
        assert_eq!(plain.stem("menulis"), "ulis");
        let s = IndonesianStemmer::with_root_words(["tulis", "menang"]);
        assert_eq!(s.stem("menulis"), "tulis");
        assert_eq!(s.stem("memenangkan"), "menang");
    }
}

// This file is part of Morphpass.
//
// Copyright (c) 2025  René Coignard <contact@renecoignard.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::collections::HashMap;
use std::fmt;
use std::io::{ErrorKind, Read};
use std::str::FromStr;

use log::{debug, info};
use regex::Regex;

use crate::error::Result;
use crate::parser::{Commit, LineParser, StreamParser};

pub const CHUNK_SIZE: usize = 64 * 1024;
pub const FILTER_PROGRESS_INTERVAL: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordCategory {
    Verb,
    Adjective,
    Adverb,
    Article,
    Cardinal,
    Circumposition,
    Conjunction,
    Demonstrative,
    Indefinite,
    Interjection,
    Ordinal,
    Noun,
    ProperNoun,
    Possessive,
    Postposition,
    Pronoun,
    Preposition,
    PrepositionArticle,
    PronominalAdverb,
    Particle,
    Relative,
    Truncated,
    VerbParticle,
    WhAdverb,
    WhPronoun,
    Zu,
}

impl WordCategory {
    pub const ALL: [WordCategory; 26] = [
        WordCategory::Verb,
        WordCategory::Adjective,
        WordCategory::Adverb,
        WordCategory::Article,
        WordCategory::Cardinal,
        WordCategory::Circumposition,
        WordCategory::Conjunction,
        WordCategory::Demonstrative,
        WordCategory::Indefinite,
        WordCategory::Interjection,
        WordCategory::Ordinal,
        WordCategory::Noun,
        WordCategory::ProperNoun,
        WordCategory::Possessive,
        WordCategory::Postposition,
        WordCategory::Pronoun,
        WordCategory::Preposition,
        WordCategory::PrepositionArticle,
        WordCategory::PronominalAdverb,
        WordCategory::Particle,
        WordCategory::Relative,
        WordCategory::Truncated,
        WordCategory::VerbParticle,
        WordCategory::WhAdverb,
        WordCategory::WhPronoun,
        WordCategory::Zu,
    ];

    /// Tag as it appears in the dictionary file.
    pub const fn code(self) -> &'static str {
        match self {
            WordCategory::Verb => "V",
            WordCategory::Adjective => "ADJ",
            WordCategory::Adverb => "ADV",
            WordCategory::Article => "ART",
            WordCategory::Cardinal => "CARD",
            WordCategory::Circumposition => "CIRCP",
            WordCategory::Conjunction => "CONJ",
            WordCategory::Demonstrative => "DEMO",
            WordCategory::Indefinite => "INDEF",
            WordCategory::Interjection => "INTJ",
            WordCategory::Ordinal => "ORD",
            WordCategory::Noun => "NN",
            WordCategory::ProperNoun => "NNP",
            WordCategory::Possessive => "POSS",
            WordCategory::Postposition => "POSTP",
            WordCategory::Pronoun => "PRP",
            WordCategory::Preposition => "PREP",
            WordCategory::PrepositionArticle => "PREPART",
            WordCategory::PronominalAdverb => "PROADV",
            WordCategory::Particle => "PRTKL",
            WordCategory::Relative => "REL",
            WordCategory::Truncated => "TRUNC",
            WordCategory::VerbParticle => "VPART",
            WordCategory::WhAdverb => "WPADV",
            WordCategory::WhPronoun => "WPRO",
            WordCategory::Zu => "ZU",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown word category \"{}\"", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for WordCategory {
    type Err = UnknownCategory;

    fn from_str(code: &str) -> std::result::Result<Self, Self::Err> {
        WordCategory::ALL
            .into_iter()
            .find(|category| category.code() == code)
            .ok_or_else(|| UnknownCategory(code.to_string()))
    }
}

impl fmt::Display for WordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One grammatical reading of a word form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphEntry {
    pub lemma: String,
    pub category: WordCategory,
    pub attributes: Vec<String>,
}

impl MorphEntry {
    pub fn has(&self, tag: &str) -> bool {
        self.attributes.iter().any(|a| a == tag)
    }

    pub fn has_all(&self, tags: &[&str]) -> bool {
        tags.iter().all(|tag| self.has(tag))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEntry {
    pub word: String,
    pub analysis: MorphEntry,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub processed: u64,
    pub total: u64,
    pub percentage: f64,
}

impl Progress {
    fn partial(processed: u64, total: u64) -> Self {
        Self {
            processed,
            total,
            percentage: processed as f64 / total as f64 * 100.0,
        }
    }

    fn complete(total: u64) -> Self {
        Self {
            processed: total,
            total,
            percentage: 100.0,
        }
    }
}

/// Surface word to analyses, in file order.
///
/// A value of this type only exists once a load has run to completion, so
/// every query sees a finished index. A failed load yields no dictionary.
#[derive(Debug, Default)]
pub struct MorphDict {
    slots: Vec<Vec<WordEntry>>,
    positions: HashMap<String, usize>,
    total_entries: usize,
}

impl MorphDict {
    pub fn from_text(text: &str) -> Self {
        Self::from_text_with_progress(text, |_| {})
    }

    pub fn from_text_with_progress(text: &str, mut progress: impl FnMut(Progress)) -> Self {
        let mut dict = Self::default();
        let mut parser = LineParser::default();

        let mut line_count = 0u64;
        for line in text.split('\n') {
            line_count += 1;
            if let Some(done) = parser.push_line(line) {
                dict.commit(done);
            }
        }
        if let Some(done) = parser.finish() {
            dict.commit(done);
        }

        progress(Progress::complete(line_count));
        dict.log_loaded();
        dict
    }

    /// Streams a dictionary from `reader`.
    ///
    /// `size_hint` is only used for progress percentages; `None` or zero
    /// suppresses the per-chunk events but not the final one.
    pub fn from_reader<R: Read>(reader: R, size_hint: Option<u64>) -> Result<Self> {
        Self::from_reader_with_progress(reader, size_hint, |_| {})
    }

    pub fn from_reader_with_progress<R: Read>(
        mut reader: R,
        size_hint: Option<u64>,
        mut progress: impl FnMut(Progress),
    ) -> Result<Self> {
        let total = size_hint.unwrap_or(0);
        let mut dict = Self::default();
        let mut stream = StreamParser::default();
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut loaded = 0u64;

        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            loaded += read as u64;
            stream.feed(&buffer[..read], |done| dict.commit(done));

            if total > 0 {
                progress(Progress::partial(loaded, total));
            }
        }

        stream.finish(|done| dict.commit(done));
        progress(Progress::complete(total));
        dict.log_loaded();
        Ok(dict)
    }

    fn commit(&mut self, (word, analyses): Commit) {
        let entries: Vec<WordEntry> = analyses
            .into_iter()
            .map(|analysis| WordEntry {
                word: word.clone(),
                analysis,
            })
            .collect();
        self.total_entries += entries.len();

        match self.positions.get(&word) {
            Some(&slot) => {
                debug!("Replacing earlier analyses of \"{}\"", word);
                let old = std::mem::replace(&mut self.slots[slot], entries);
                self.total_entries -= old.len();
            }
            None => {
                self.positions.insert(word, self.slots.len());
                self.slots.push(entries);
            }
        }
    }

    fn log_loaded(&self) {
        info!(
            "Dictionary loaded: {} words, {} entries",
            self.len(),
            self.total_entries
        );
    }

    /// Number of distinct surface words.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn total_entries(&self) -> usize {
        self.total_entries
    }

    pub fn get(&self, word: &str) -> Option<&[WordEntry]> {
        self.positions.get(word).map(|&slot| self.slots[slot].as_slice())
    }

    pub fn entries(&self) -> impl Iterator<Item = &WordEntry> {
        self.slots.iter().flatten()
    }

    pub fn filter_words(
        &self,
        pattern: Option<&Regex>,
        categories: Option<&[WordCategory]>,
    ) -> Vec<&WordEntry> {
        self.filter_words_with_progress(pattern, categories, |_| {})
    }

    /// Every entry whose word matches `pattern` and whose category is in
    /// `categories`, in index order. Either filter may be left out.
    pub fn filter_words_with_progress(
        &self,
        pattern: Option<&Regex>,
        categories: Option<&[WordCategory]>,
        mut progress: impl FnMut(Progress),
    ) -> Vec<&WordEntry> {
        let total = self.total_entries as u64;
        let mut result = Vec::new();

        for slot in &self.slots {
            let Some(first) = slot.first() else {
                continue;
            };
            if pattern.is_some_and(|re| !re.is_match(&first.word)) {
                continue;
            }

            for entry in slot {
                if categories.is_some_and(|c| !c.contains(&entry.analysis.category)) {
                    continue;
                }
                result.push(entry);
                if result.len() % FILTER_PROGRESS_INTERVAL == 0 {
                    progress(Progress::partial(result.len() as u64, total));
                }
            }
        }

        progress(Progress::complete(total));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    const SAMPLE: &str = include_str!("../assets/sample_dict.txt");

    /// Hands out the input in fixed-size pieces.
    struct Chunked<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Chunked<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    /// Fails after the first chunk.
    struct Broken {
        sent: bool,
    }

    impl Read for Broken {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.sent = true;
            let data = b"Haus\nHaus NN,nom,sing,neut\n";
            buf[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }
    }

    fn snapshot(dict: &MorphDict) -> Vec<WordEntry> {
        dict.entries().cloned().collect()
    }

    #[test]
    fn test_category_codes_roundtrip() {
        for category in WordCategory::ALL {
            assert_eq!(category.code().parse::<WordCategory>(), Ok(category));
        }
        assert!("nn".parse::<WordCategory>().is_err());
    }

    #[test]
    fn test_sample_counts() {
        let dict = MorphDict::from_text(SAMPLE);
        assert_eq!(dict.len(), 21);
        assert_eq!(dict.total_entries(), 29);
        assert_eq!(dict.entries().count(), dict.total_entries());
    }

    #[test]
    fn test_no_empty_words() {
        let dict = MorphDict::from_text(SAMPLE);
        assert!(dict.get("Leerzeile").is_none());
        assert!(dict.get("kaputt").is_none());
        for entry in dict.entries() {
            assert!(!entry.word.is_empty());
        }
        for word in ["Haus", "Tisch", "und"] {
            assert!(!dict.get(word).unwrap().is_empty());
        }
    }

    #[test]
    fn test_entry_order_preserved() {
        let dict = MorphDict::from_text(SAMPLE);
        let haus = dict.get("Haus").unwrap();
        assert_eq!(haus.len(), 3);
        assert!(haus[0].analysis.has("nom"));
        assert!(haus[1].analysis.has("acc"));
        assert!(haus[2].analysis.has_all(&["dat", "old"]));

        let first: Vec<&str> = dict.entries().map(|e| e.word.as_str()).take(5).collect();
        assert_eq!(first, vec!["Haus", "Haus", "Haus", "Hauses", "Tisch"]);
    }

    #[test]
    fn test_malformed_line_skipped() {
        let dict = MorphDict::from_text(SAMPLE);
        let tisch = dict.get("Tisch").unwrap();
        assert_eq!(tisch.len(), 2);
    }

    #[test]
    fn test_repeated_header_replaces() {
        let dict = MorphDict::from_text(
            "Haus\nHaus NN,nom,sing,neut\nHaus NN,acc,sing,neut\nBaum\nBaum NN,nom,sing,masc\nHaus\nHaus NN,dat,sing,neut\n",
        );
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.total_entries(), 2);
        let words: Vec<&str> = dict.entries().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["Haus", "Baum"]);
        assert!(dict.get("Haus").unwrap()[0].analysis.has("dat"));
    }

    #[test]
    fn test_stream_matches_text_at_every_split() {
        let expected = snapshot(&MorphDict::from_text(SAMPLE));
        let bytes = SAMPLE.as_bytes();

        for cut in 0..=bytes.len() {
            let reader = io::Cursor::new(&bytes[..cut]).chain(io::Cursor::new(&bytes[cut..]));
            let dict = MorphDict::from_reader(reader, None).unwrap();
            assert_eq!(snapshot(&dict), expected, "split at byte {}", cut);
        }
    }

    #[test]
    fn test_stream_matches_text_small_chunks() {
        let expected = snapshot(&MorphDict::from_text(SAMPLE));
        for step in [1, 2, 3, 7, 13, 64] {
            let reader = Chunked {
                data: SAMPLE.as_bytes(),
                step,
            };
            let dict = MorphDict::from_reader(reader, None).unwrap();
            assert_eq!(snapshot(&dict), expected, "chunk size {}", step);
        }
    }

    #[test]
    fn test_stream_without_trailing_newline() {
        let dict = MorphDict::from_reader(io::Cursor::new("Haus\nHaus NN,nom,sing,neut"), None)
            .unwrap();
        assert_eq!(dict.total_entries(), 1);
    }

    #[test]
    fn test_stream_error_propagates() {
        let result = MorphDict::from_reader(Broken { sent: false }, None);
        assert!(matches!(result, Err(crate::MorphError::Load(_))));
    }

    #[test]
    fn test_stream_progress_monotonic() {
        let bytes = SAMPLE.as_bytes();
        let reader = Chunked { data: bytes, step: 100 };
        let mut events = Vec::new();
        MorphDict::from_reader_with_progress(reader, Some(bytes.len() as u64), |p| events.push(p))
            .unwrap();

        assert!(events.len() > 2);
        for pair in events.windows(2) {
            assert!(pair[0].processed <= pair[1].processed);
            assert!(pair[0].percentage <= pair[1].percentage);
        }
        let last = events.last().unwrap();
        assert_eq!(last.percentage, 100.0);
        assert_eq!(last.processed, bytes.len() as u64);
    }

    #[test]
    fn test_stream_progress_unknown_size() {
        let mut events = Vec::new();
        MorphDict::from_reader_with_progress(io::Cursor::new(SAMPLE), None, |p| events.push(p))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].percentage, 100.0);
    }

    #[test]
    fn test_text_progress_reports_lines() {
        let mut events = Vec::new();
        MorphDict::from_text_with_progress("a\na A,x\n", |p| events.push(p));
        assert_eq!(
            events,
            vec![Progress {
                processed: 3,
                total: 3,
                percentage: 100.0
            }]
        );
    }

    #[test]
    fn test_filter_all() {
        let dict = MorphDict::from_text(SAMPLE);
        let all = dict.filter_words(None, None);
        assert_eq!(all.len(), dict.total_entries());
        let entries: Vec<&WordEntry> = dict.entries().collect();
        assert_eq!(all, entries);
    }

    #[test]
    fn test_filter_by_category() {
        let dict = MorphDict::from_text(SAMPLE);
        let verbs = dict.filter_words(None, Some(&[WordCategory::Verb]));
        assert_eq!(verbs.len(), 2);
        assert!(verbs.iter().all(|e| e.analysis.category == WordCategory::Verb));

        let mixed = dict.filter_words(None, Some(&[WordCategory::Verb, WordCategory::Conjunction]));
        assert_eq!(mixed.len(), 3);

        assert!(dict.filter_words(None, Some(&[WordCategory::Zu])).is_empty());
    }

    #[test]
    fn test_filter_by_pattern() {
        let dict = MorphDict::from_text(SAMPLE);
        let re = Regex::new("^gro").unwrap();
        let hits = dict.filter_words(Some(&re), None);
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|e| re.is_match(&e.word)));
        // "größere" starts with "grö"
        assert!(hits.iter().all(|e| e.word != "größere"));

        let both = dict.filter_words(Some(&Regex::new("Haus").unwrap()), Some(&[WordCategory::Noun]));
        assert_eq!(both.len(), 4);
    }

    #[test]
    fn test_filter_is_repeatable() {
        let dict = MorphDict::from_text(SAMPLE);
        let first = dict.filter_words(None, Some(&[WordCategory::Adjective]));
        let second = dict.filter_words(None, Some(&[WordCategory::Adjective]));
        assert_eq!(first, second);
    }

    #[test]
    fn test_filter_progress_interval() {
        let mut text = String::new();
        for i in 0..2500 {
            text.push_str(&format!("w{i}\nw{i} NN,nom,sing,neut\n"));
        }
        let dict = MorphDict::from_text(&text);
        let mut events = Vec::new();
        let hits = dict.filter_words_with_progress(None, None, |p| events.push(p));

        assert_eq!(hits.len(), 2500);
        let processed: Vec<u64> = events.iter().map(|p| p.processed).collect();
        assert_eq!(processed, vec![1000, 2000, 2500]);
        assert_eq!(events.last().unwrap().percentage, 100.0);
    }
}

use std::mem;

use unicode_normalization::UnicodeNormalization;

use crate::dictionary::{MorphEntry, WordCategory};

/// A surface word together with every analysis gathered for it.
pub(crate) type Commit = (String, Vec<MorphEntry>);

#[derive(Debug, PartialEq)]
enum Line {
    Blank,
    Header(String),
    Analysis(MorphEntry),
    Skipped,
}

fn classify(raw: &str) -> Line {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }

    if !line.contains(',') {
        return Line::Header(line.nfc().collect());
    }

    let mut parts = line.split(' ');
    let Some(lemma) = parts.next().filter(|s| !s.is_empty()) else {
        return Line::Skipped;
    };
    let Some(analysis) = parts.next().filter(|s| !s.is_empty()) else {
        return Line::Skipped;
    };

    let mut tags = analysis.split(',');
    let Some(category) = tags.next().and_then(|code| code.parse::<WordCategory>().ok()) else {
        return Line::Skipped;
    };

    Line::Analysis(MorphEntry {
        lemma: lemma.nfc().collect(),
        category,
        attributes: tags.map(str::to_owned).collect(),
    })
}

#[derive(Debug, Default)]
enum Pending {
    #[default]
    Idle,
    Word {
        word: String,
        analyses: Vec<MorphEntry>,
    },
}

impl Pending {
    fn commit(self) -> Option<Commit> {
        match self {
            Pending::Word { word, analyses } if !analyses.is_empty() => Some((word, analyses)),
            _ => None,
        }
    }
}

/// Accumulates analysis lines under the most recent word header.
///
/// A word is handed out when the next header arrives or when [`finish`](Self::finish)
/// is called, and only if at least one analysis was collected for it.
#[derive(Debug, Default)]
pub(crate) struct LineParser {
    state: Pending,
}

impl LineParser {
    pub(crate) fn push_line(&mut self, raw: &str) -> Option<Commit> {
        match classify(raw) {
            Line::Header(word) => {
                let previous = mem::replace(
                    &mut self.state,
                    Pending::Word {
                        word,
                        analyses: Vec::new(),
                    },
                );
                previous.commit()
            }
            Line::Analysis(entry) => {
                // analyses before the first header have no owner
                if let Pending::Word { analyses, .. } = &mut self.state {
                    analyses.push(entry);
                }
                None
            }
            Line::Blank | Line::Skipped => None,
        }
    }

    pub(crate) fn finish(&mut self) -> Option<Commit> {
        mem::take(&mut self.state).commit()
    }
}

/// Feeds arbitrary byte chunks into a [`LineParser`].
///
/// Only text up to the last newline is parsed per chunk; the tail waits for
/// the next chunk. The pending word survives across chunks.
#[derive(Debug, Default)]
pub(crate) struct StreamParser {
    buffer: Vec<u8>,
    lines: LineParser,
}

impl StreamParser {
    pub(crate) fn feed(&mut self, chunk: &[u8], mut commit: impl FnMut(Commit)) {
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return;
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = mem::replace(&mut self.buffer, rest);
        for line in String::from_utf8_lossy(&complete).split('\n') {
            if let Some(done) = self.lines.push_line(line) {
                commit(done);
            }
        }
    }

    pub(crate) fn finish(mut self, mut commit: impl FnMut(Commit)) {
        let remaining = mem::take(&mut self.buffer);
        for line in String::from_utf8_lossy(&remaining).split('\n') {
            if let Some(done) = self.lines.push_line(line) {
                commit(done);
            }
        }
        if let Some(done) = self.lines.finish() {
            commit(done);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(lines: &[&str]) -> Vec<Commit> {
        let mut parser = LineParser::default();
        let mut out: Vec<Commit> = lines.iter().filter_map(|l| parser.push_line(l)).collect();
        out.extend(parser.finish());
        out
    }

    #[test]
    fn test_classify_header() {
        assert_eq!(classify("  Haus \r"), Line::Header("Haus".to_string()));
    }

    #[test]
    fn test_classify_header_nfc() {
        assert_eq!(classify("gro\u{0308}n"), Line::Header("grön".to_string()));
    }

    #[test]
    fn test_classify_analysis() {
        let Line::Analysis(entry) = classify("Haus NN,nom,sing,neut") else {
            panic!("expected analysis line");
        };
        assert_eq!(entry.lemma, "Haus");
        assert_eq!(entry.category, WordCategory::Noun);
        assert_eq!(entry.attributes, vec!["nom", "sing", "neut"]);
    }

    #[test]
    fn test_classify_skips_malformed() {
        assert_eq!(classify("NN,nom,sing"), Line::Skipped);
        assert_eq!(classify("Haus  NN,nom"), Line::Skipped);
        assert_eq!(classify("Haus XYZ,nom"), Line::Skipped);
        assert_eq!(classify("Haus ,nom"), Line::Skipped);
        assert_eq!(classify("   \t"), Line::Blank);
    }

    #[test]
    fn test_header_without_analyses_dropped() {
        let out = parse_all(&["Leer", "Haus", "Haus NN,nom,sing,neut"]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "Haus");
    }

    #[test]
    fn test_orphan_analysis_ignored() {
        let out = parse_all(&["Haus NN,nom,sing,neut", "Baum", "Baum NN,nom,sing,masc"]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "Baum");
        assert_eq!(out[0].1.len(), 1);
    }

    #[test]
    fn test_finish_commits_last_word() {
        let mut parser = LineParser::default();
        assert!(parser.push_line("Haus").is_none());
        assert!(parser.push_line("Haus NN,nom,sing,neut").is_none());
        assert!(parser.push_line("Haus NN,acc,sing,neut").is_none());
        let (word, analyses) = parser.finish().unwrap();
        assert_eq!(word, "Haus");
        assert_eq!(analyses.len(), 2);
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_stream_header_straddles_chunks() {
        let mut stream = StreamParser::default();
        let mut out = Vec::new();
        stream.feed(b"Haus\nHa", |c| out.push(c));
        assert!(out.is_empty());
        stream.feed(b"us NN,nom,sing,neut\nBaum\n", |c| out.push(c));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "Haus");
        stream.feed(b"Baum NN,nom,sing,masc", |c| out.push(c));
        stream.finish(|c| out.push(c));
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].0, "Baum");
    }

    #[test]
    fn test_stream_split_multibyte() {
        let text = "groß\ngroß ADJ,pos,nom,sing,neut,strong\n".as_bytes();
        // split inside the two-byte "ß"
        let cut = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut stream = StreamParser::default();
        let mut out = Vec::new();
        stream.feed(&text[..cut], |c| out.push(c));
        stream.feed(&text[cut..], |c| out.push(c));
        stream.finish(|c| out.push(c));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "groß");
    }

    #[test]
    fn test_stream_invalid_utf8_is_lossy() {
        let mut stream = StreamParser::default();
        let mut out = Vec::new();
        stream.feed(b"Ha\xFFus\nHaus NN,nom,sing,neut\n", |c| out.push(c));
        stream.finish(|c| out.push(c));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "Ha\u{FFFD}us");
    }
}

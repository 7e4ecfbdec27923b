use std::collections::HashSet;
use std::fmt;

use log::{debug, warn};
use zeroize::Zeroizing;

use crate::dictionary::{MorphDict, WordCategory, WordEntry};
use crate::error::{MorphError, Result};
use crate::random::{KeystreamRng, RandomSource, choose};

pub const DIGIT_SUFFIX_LEN: usize = 2;
pub const ATTEMPTS_PER_PASSWORD: usize = 3;
const BATCH_PREALLOC: usize = 64;

const SPECIAL_CHAR_MAP: [(char, char); 6] = [
    ('S', '$'),
    ('s', '$'),
    ('I', '!'),
    ('i', '!'),
    ('T', '+'),
    ('t', '+'),
];

/// Letters without a clean case-preserving stand-in.
const STRONG_MODE_FILTERED_CHARS: [char; 12] =
    ['Ä', 'ä', 'Ö', 'ö', 'Ü', 'ü', 'ẞ', 'ß', 'Y', 'y', 'Z', 'z'];

const NOUN_TAGS: [&str; 2] = ["nom", "sing"];
const ADJECTIVE_TAGS: [&str; 3] = ["pos", "nom", "sing"];
const STRONG_DECLENSION: &str = "strong";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordMode {
    Simple,
    Strong,
}

impl fmt::Display for PasswordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordMode::Simple => f.write_str("simple"),
            PasswordMode::Strong => f.write_str("strong"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Masculine,
    Feminine,
    Neuter,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Masculine, Gender::Feminine, Gender::Neuter];

    pub const fn tag(self) -> &'static str {
        match self {
            Gender::Masculine => "masc",
            Gender::Feminine => "fem",
            Gender::Neuter => "neut",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }

    /// Masculine and neuter adjectives only agree without an article in
    /// their strong form; feminine forms coincide.
    const fn needs_strong_adjective(self) -> bool {
        !matches!(self, Gender::Feminine)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

pub fn is_strong_eligible(word: &str) -> bool {
    !word.chars().any(|c| STRONG_MODE_FILTERED_CHARS.contains(&c))
        && word.chars().any(|c| special_char(c).is_some())
}

fn special_char(c: char) -> Option<char> {
    SPECIAL_CHAR_MAP
        .iter()
        .find(|(from, _)| *from == c)
        .map(|&(_, to)| to)
}

type Pool<'d> = [Vec<&'d WordEntry>; 3];

/// Nominative singular candidates split by gender, for both modes.
#[derive(Debug, Default)]
pub struct GenderPools<'d> {
    nouns: Pool<'d>,
    adjectives: Pool<'d>,
    strong_nouns: Pool<'d>,
    strong_adjectives: Pool<'d>,
}

impl<'d> GenderPools<'d> {
    pub fn from_dict(dict: &'d MorphDict) -> Self {
        let mut pools = Self::default();

        for noun in dict.filter_words(None, Some(&[WordCategory::Noun])) {
            if !noun.analysis.has_all(&NOUN_TAGS) {
                continue;
            }
            for gender in Gender::ALL {
                if noun.analysis.has(gender.tag()) {
                    pools.nouns[gender.index()].push(noun);
                }
            }
        }

        for adjective in dict.filter_words(None, Some(&[WordCategory::Adjective])) {
            if !adjective.analysis.has_all(&ADJECTIVE_TAGS) {
                continue;
            }
            for gender in Gender::ALL {
                let agrees = adjective.analysis.has(gender.tag())
                    && (!gender.needs_strong_adjective()
                        || adjective.analysis.has(STRONG_DECLENSION));
                if agrees {
                    pools.adjectives[gender.index()].push(adjective);
                }
            }
        }

        for gender in Gender::ALL {
            let i = gender.index();
            pools.strong_nouns[i] = strong_only(&pools.nouns[i]);
            pools.strong_adjectives[i] = strong_only(&pools.adjectives[i]);
            debug!(
                "Pool {}: {} adjectives ({} strong), {} nouns ({} strong)",
                gender,
                pools.adjectives[i].len(),
                pools.strong_adjectives[i].len(),
                pools.nouns[i].len(),
                pools.strong_nouns[i].len()
            );
        }

        pools
    }

    pub fn nouns(&self, gender: Gender, mode: PasswordMode) -> &[&'d WordEntry] {
        match mode {
            PasswordMode::Simple => &self.nouns[gender.index()],
            PasswordMode::Strong => &self.strong_nouns[gender.index()],
        }
    }

    pub fn adjectives(&self, gender: Gender, mode: PasswordMode) -> &[&'d WordEntry] {
        match mode {
            PasswordMode::Simple => &self.adjectives[gender.index()],
            PasswordMode::Strong => &self.strong_adjectives[gender.index()],
        }
    }

    /// Distinct adjective+noun spellings reachable in `mode`.
    pub fn combinations(&self, mode: PasswordMode) -> u128 {
        Gender::ALL
            .into_iter()
            .map(|gender| {
                distinct_words(self.adjectives(gender, mode)) as u128
                    * distinct_words(self.nouns(gender, mode)) as u128
            })
            .sum()
    }

    /// Upper bound on distinct passwords `mode` can produce.
    ///
    /// Exact per gender for simple mode. Strong mode multiplies by the most
    /// substitution sites any pair can offer and by the digit suffixes.
    pub fn reachable(&self, mode: PasswordMode) -> u128 {
        let suffixes = 10u128.pow(DIGIT_SUFFIX_LEN as u32);

        Gender::ALL
            .into_iter()
            .map(|gender| {
                let adjectives = self.adjectives(gender, mode);
                let nouns = self.nouns(gender, mode);
                let pairs = distinct_words(adjectives) as u128 * distinct_words(nouns) as u128;
                match mode {
                    PasswordMode::Simple => pairs,
                    PasswordMode::Strong => {
                        let sites = max_special_sites(adjectives) + max_special_sites(nouns);
                        pairs
                            .saturating_mul(sites as u128)
                            .saturating_mul(suffixes)
                    }
                }
            })
            .fold(0u128, u128::saturating_add)
    }
}

fn max_special_sites(entries: &[&WordEntry]) -> usize {
    entries
        .iter()
        .map(|entry| {
            entry
                .word
                .chars()
                .filter(|&c| special_char(c).is_some())
                .count()
        })
        .max()
        .unwrap_or(0)
}

fn strong_only<'d>(entries: &[&'d WordEntry]) -> Vec<&'d WordEntry> {
    entries
        .iter()
        .copied()
        .filter(|entry| is_strong_eligible(&entry.word))
        .collect()
}

fn distinct_words(entries: &[&WordEntry]) -> usize {
    entries
        .iter()
        .map(|entry| entry.word.as_str())
        .collect::<HashSet<_>>()
        .len()
}

pub struct PasswordGenerator<'d, R = KeystreamRng> {
    pools: GenderPools<'d>,
    rng: R,
}

impl<'d> PasswordGenerator<'d> {
    pub fn with_entropy(dict: &'d MorphDict) -> Self {
        Self::new(dict, KeystreamRng::from_entropy())
    }
}

impl<'d, R: RandomSource> PasswordGenerator<'d, R> {
    pub fn new(dict: &'d MorphDict, rng: R) -> Self {
        Self {
            pools: GenderPools::from_dict(dict),
            rng,
        }
    }

    pub fn pools(&self) -> &GenderPools<'d> {
        &self.pools
    }

    /// Rough strength estimate in bits; counts word pairs and the digit suffix.
    pub fn entropy_bits(&self, mode: PasswordMode) -> f64 {
        let combinations = self.pools.combinations(mode);
        if combinations == 0 {
            return 0.0;
        }

        let mut bits = (combinations as f64).log2();
        if mode == PasswordMode::Strong {
            bits += DIGIT_SUFFIX_LEN as f64 * 10f64.log2();
        }
        bits
    }

    pub fn generate_password(&mut self, mode: PasswordMode) -> Result<Zeroizing<String>> {
        let gender = *choose(&mut self.rng, &Gender::ALL)?;

        if self.pools.adjectives(gender, PasswordMode::Simple).is_empty()
            || self.pools.nouns(gender, PasswordMode::Simple).is_empty()
        {
            return Err(MorphError::NoCandidates { gender, mode });
        }

        let adjectives = self.pools.adjectives(gender, mode);
        let nouns = self.pools.nouns(gender, mode);
        if adjectives.is_empty() || nouns.is_empty() {
            return Err(MorphError::NoCandidates { gender, mode });
        }

        let adjective = choose(&mut self.rng, adjectives)?;
        let noun = choose(&mut self.rng, nouns)?;

        let mut password = Zeroizing::new(String::with_capacity(
            adjective.word.len() + noun.word.len() + DIGIT_SUFFIX_LEN,
        ));
        password.push_str(&adjective.word);
        password.push_str(&noun.word);

        if mode == PasswordMode::Strong {
            replace_special_char(&mut password, &mut self.rng);
            for _ in 0..DIGIT_SUFFIX_LEN {
                let digit = self.rng.below(10) as u32;
                password.push(char::from_digit(digit, 10).unwrap_or('0'));
            }
        }

        Ok(password)
    }

    /// Up to `count` distinct passwords within `ATTEMPTS_PER_PASSWORD * count` tries.
    ///
    /// Attempts that find an empty pool are logged and skipped. Fewer than
    /// `count` results is not an error; none at all is. Requests beyond what
    /// the pools can spell are clamped to [`GenderPools::reachable`].
    pub fn generate_passwords(
        &mut self,
        mode: PasswordMode,
        count: usize,
    ) -> Result<Vec<Zeroizing<String>>> {
        if count < 1 {
            return Err(MorphError::InvalidCount(count));
        }

        let reachable = self.pools.reachable(mode);
        if reachable == 0 {
            warn!("No gender has both adjectives and nouns in {} mode", mode);
            return Err(MorphError::Exhausted {
                attempts: count.saturating_mul(ATTEMPTS_PER_PASSWORD),
            });
        }

        let target = count.min(usize::try_from(reachable).unwrap_or(usize::MAX));
        let max_attempts = target.saturating_mul(ATTEMPTS_PER_PASSWORD);
        let mut passwords: Vec<Zeroizing<String>> = Vec::with_capacity(target.min(BATCH_PREALLOC));

        for _ in 0..max_attempts {
            if passwords.len() >= target {
                break;
            }

            match self.generate_password(mode) {
                Ok(password) => {
                    if passwords.iter().any(|seen| seen.as_str() == password.as_str()) {
                        debug!("Discarding duplicate password");
                    } else {
                        passwords.push(password);
                    }
                }
                Err(e) if e.is_recoverable() => warn!("Error generating password: {}", e),
                Err(e) => return Err(e),
            }
        }

        if passwords.is_empty() {
            return Err(MorphError::Exhausted {
                attempts: max_attempts,
            });
        }

        if passwords.len() < count {
            debug!(
                "Generated {} of {} requested passwords",
                passwords.len(),
                count
            );
        }

        Ok(passwords)
    }
}

/// Swaps one uniformly chosen S/s, I/i or T/t for its special character.
fn replace_special_char<R: RandomSource + ?Sized>(password: &mut String, rng: &mut R) {
    let eligible: Vec<(usize, char)> = password
        .char_indices()
        .filter_map(|(i, c)| special_char(c).map(|to| (i, to)))
        .collect();

    if let Ok(&(index, replacement)) = choose(rng, &eligible) {
        let mut buf = [0u8; 4];
        password.replace_range(index..index + 1, replacement.encode_utf8(&mut buf));
    }
}

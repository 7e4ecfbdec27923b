use blake2::{Blake2b512, Digest};
use chacha20::ChaCha20;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use zeroize::Zeroizing;

use crate::error::{MorphError, Result};

const KEY_LEN: usize = 32;
const BUFFER_LEN: usize = 512;

/// Source of uniform integers for every random decision the generator makes.
pub trait RandomSource {
    /// Uniform value in `0..bound`. `bound` must be non-zero.
    fn below(&mut self, bound: usize) -> usize;
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn below(&mut self, bound: usize) -> usize {
        (**self).below(bound)
    }
}

pub fn choose<'a, T, R: RandomSource + ?Sized>(rng: &mut R, items: &'a [T]) -> Result<&'a T> {
    if items.is_empty() {
        return Err(MorphError::EmptyChoice);
    }
    Ok(&items[rng.below(items.len())])
}

/// ChaCha20 keystream with unbiased rejection sampling.
pub struct KeystreamRng {
    cipher: ChaCha20,
    buffer: Zeroizing<Vec<u8>>,
    pos: usize,
}

impl KeystreamRng {
    pub fn from_key(key: &[u8; KEY_LEN]) -> Self {
        let mut cipher = ChaCha20::new(key.into(), &[0u8; 12].into());
        let mut buffer = Zeroizing::new(vec![0u8; BUFFER_LEN]);
        cipher.apply_keystream(&mut buffer);
        Self {
            cipher,
            buffer,
            pos: 0,
        }
    }

    /// Deterministic stream keyed by the BLAKE2b digest of `seed`.
    pub fn from_seed(seed: &str) -> Self {
        let mut hasher = Blake2b512::new();
        hasher.update(seed.as_bytes());
        let digest = Zeroizing::new(hasher.finalize().to_vec());

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&digest[..KEY_LEN]);
        Self::from_key(&key)
    }

    pub fn from_entropy() -> Self {
        let key = Zeroizing::new(rand::random::<[u8; KEY_LEN]>());
        Self::from_key(&key)
    }

    fn next_u64(&mut self) -> u64 {
        if self.pos + 8 > self.buffer.len() {
            self.buffer.iter_mut().for_each(|b| *b = 0);
            self.cipher.apply_keystream(&mut self.buffer);
            self.pos = 0;
        }

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buffer[self.pos..self.pos + 8]);
        self.pos += 8;
        u64::from_le_bytes(bytes)
    }
}

impl RandomSource for KeystreamRng {
    fn below(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0, "bound must be non-zero");
        if bound <= 1 {
            return 0;
        }

        let bound = bound as u64;
        let rejection_threshold = u64::MAX - (u64::MAX % bound);

        loop {
            let value = self.next_u64();
            if value < rejection_threshold {
                return (value % bound) as usize;
            }
        }
    }
}

/// Replays a fixed list of picks, each reduced modulo the requested bound.
#[cfg(test)]
pub(crate) struct Scripted {
    picks: std::collections::VecDeque<usize>,
}

#[cfg(test)]
impl Scripted {
    pub(crate) fn new(picks: &[usize]) -> Self {
        Self {
            picks: picks.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
impl RandomSource for Scripted {
    fn below(&mut self, bound: usize) -> usize {
        self.picks.pop_front().unwrap_or(0) % bound
    }
}

use std::io;

use crate::generator::{Gender, PasswordMode};

pub type Result<T, E = MorphError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum MorphError {
    /// The dictionary source could not be read to the end.
    #[error("Failed to load dictionary: {0}")]
    Load(#[from] io::Error),

    /// The pool for the chosen gender is empty in the active mode.
    #[error("No valid words found for gender: {gender} in {mode} mode")]
    NoCandidates { gender: Gender, mode: PasswordMode },

    #[error("Password count must be greater than 0 (got {0})")]
    InvalidCount(usize),

    /// A batch ran out of attempts without producing a single password.
    #[error("Failed to generate any valid passwords after {attempts} attempts")]
    Exhausted { attempts: usize },

    #[error("Cannot get random item from empty slice")]
    EmptyChoice,
}

impl MorphError {
    /// Whether a batch may skip this failure and try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MorphError::NoCandidates { .. })
    }
}

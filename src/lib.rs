pub mod dictionary;
pub mod error;
pub mod generator;
mod parser;
pub mod random;

pub use dictionary::{MorphDict, MorphEntry, Progress, WordCategory, WordEntry};
pub use error::{MorphError, Result};
pub use generator::{Gender, GenderPools, PasswordGenerator, PasswordMode};
pub use random::{KeystreamRng, RandomSource};

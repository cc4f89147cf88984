//! FizzBuzz over `1..=limit`.
//!
//! ```
//! let lines: Vec<String> = fizzbuzz::fizzbuzz(5).unwrap().map(|t| t.to_string()).collect();
//! assert_eq!(lines, ["1", "2", "Fizz", "4", "Buzz"]);
//! ```

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FizzBuzzError {
    #[error("Only takes positive integers")]
    InvalidInput,
}

pub type Result<T> = std::result::Result<T, FizzBuzzError>;

/// One line of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    Number(u64),
    Fizz,
    Buzz,
    FizzBuzz,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Number(n) => write!(f, "{n}"),
            Term::Fizz => write!(f, "Fizz"),
            Term::Buzz => write!(f, "Buzz"),
            Term::FizzBuzz => write!(f, "FizzBuzz"),
        }
    }
}

pub fn term(n: u64) -> Term {
    match (n % 3, n % 5) {
        (0, 0) => Term::FizzBuzz,
        (0, _) => Term::Fizz,
        (_, 0) => Term::Buzz,
        _ => Term::Number(n),
    }
}

/// Terms for `1..=limit`, produced lazily.
///
/// # Errors
/// `InvalidInput` when `limit < 1`.
pub fn fizzbuzz(limit: i64) -> Result<impl Iterator<Item = Term>> {
    let limit = u64::try_from(limit)
        .ok()
        .filter(|l| *l >= 1)
        .ok_or(FizzBuzzError::InvalidInput)?;
    Ok((1..=limit).map(term))
}

/// Parse a command-line limit. Anything that is not an integer is
/// `InvalidInput`; the sign is checked by `fizzbuzz`.
pub fn parse_limit(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| FizzBuzzError::InvalidInput)
}

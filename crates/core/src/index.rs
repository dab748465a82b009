use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Widest fixed index accepted; no file name can be longer.
pub const MAX_INDEX_DIGITS: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum IndexDigits {
    #[default]
    Auto,
    Fixed(usize),
}

impl FromStr for IndexDigits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "auto" {
            return Ok(Self::Auto);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("index digits must be a positive integer or `auto`".to_string()),
            Ok(n) if n > MAX_INDEX_DIGITS => Err(format!(
                "index digits `{n}` exceeds the maximum of {MAX_INDEX_DIGITS}"
            )),
            Ok(n) => Ok(Self::Fixed(n)),
            Err(_) => Err(format!(
                "invalid index digits `{s}`: expected a positive integer or `auto`"
            )),
        }
    }
}

impl TryFrom<String> for IndexDigits {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IndexDigits> for String {
    fn from(value: IndexDigits) -> Self {
        value.to_string()
    }
}

impl fmt::Display for IndexDigits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fixed(n) => write!(f, "{n}"),
        }
    }
}

/// Running number behind the `\(index)` template reference.
///
/// The n-th candidate (0-based, counted over the listing after exclusions)
/// gets `first + n * step`, padded on the left with `pad` up to the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSequence {
    pub first: i64,
    pub step: i64,
    pub digits: IndexDigits,
    pub pad: char,
}

impl Default for IndexSequence {
    fn default() -> Self {
        Self {
            first: 1,
            step: 1,
            digits: IndexDigits::Auto,
            pad: '0',
        }
    }
}

impl IndexSequence {
    pub fn value(&self, position: usize) -> i128 {
        i128::from(self.first) + position as i128 * i128::from(self.step)
    }

    /// Width used for every index of a batch with `total` candidates.
    pub fn width(&self, total: usize) -> usize {
        match self.digits {
            IndexDigits::Fixed(n) => n.min(MAX_INDEX_DIGITS),
            IndexDigits::Auto => {
                let largest = self.value(total).max(self.value(0));
                decimal_digits(largest)
            }
        }
    }

    /// Renders the index for `position`; `None` when the value is negative.
    pub fn render(&self, position: usize, total: usize) -> Option<String> {
        let value = self.value(position);
        if value < 0 {
            return None;
        }
        let digits = value.to_string();
        let width = self.width(total);
        let pad_count = width.saturating_sub(digits.chars().count());
        let mut out = String::with_capacity(pad_count * self.pad.len_utf8() + digits.len());
        out.extend(std::iter::repeat(self.pad).take(pad_count));
        out.push_str(&digits);
        Some(out)
    }
}

fn decimal_digits(value: i128) -> usize {
    let mut value = value.max(1);
    let mut digits = 0;
    while value > 0 {
        value /= 10;
        digits += 1;
    }
    digits
}

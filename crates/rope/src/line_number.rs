use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Add, AddAssign, Sub},
};

/// A zero-based line index. Line `n` starts right after the `n`th newline.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LineNumber(pub u32);

impl LineNumber {
    pub const ZERO: Self = Self(0);

    pub fn next_line(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn previous_line(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }
}

impl From<u32> for LineNumber {
    fn from(line: u32) -> Self {
        Self(line)
    }
}

impl Add<u32> for LineNumber {
    type Output = Self;

    fn add(self, lines: u32) -> Self::Output {
        Self(self.0 + lines)
    }
}

impl AddAssign<u32> for LineNumber {
    fn add_assign(&mut self, lines: u32) {
        self.0 += lines;
    }
}

impl Sub for LineNumber {
    type Output = u32;

    fn sub(self, other: Self) -> Self::Output {
        debug_assert!(other <= self);
        self.0 - other.0
    }
}

impl fmt::Display for LineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

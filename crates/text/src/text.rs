mod cancellable;
mod line_ending;
mod operation;
#[cfg(test)]
mod tests;
mod view;

pub use cancellable::{CancellableSequence, CharSequence, CHECK_INTERVAL};
pub use line_ending::LineEnding;
pub use operation::{EditKind, EditOperation};
pub use rope::{Bias, LineNumber, Rope, TextSummary};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    borrow::Cow,
    convert::Infallible,
    fmt,
    hash::{Hash, Hasher},
    ops::Range,
    str::FromStr,
};
use thiserror::Error;
pub use view::{MutableView, TextSlice, TextView, View};

/// A half-open range of UTF-16 code unit offsets.
pub type TextRange = Range<usize>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EditError {
    /// The operation was built against a text whose length differs from the one it was
    /// applied to.
    #[error("stale edit operation: expected a text of length {expected}, found {actual}")]
    StaleOperation { expected: usize, actual: usize },
}

/// Returned by a [`CancellableSequence`] once its predicate reports that the scan should
/// stop.
#[derive(Clone, Copy, Debug, Default, Error, PartialEq, Eq)]
#[error("text scan was cancelled")]
pub struct Cancelled;

/// An immutable, line-aware text document.
///
/// Line separators are always `\n`. Cloning is cheap, and every clone shares its storage
/// with the original.
#[derive(Clone, Default)]
pub struct Text {
    rope: Rope,
}

impl Text {
    /// Builds a text from `text`, converting `\r\n` and lone `\r` separators to `\n`.
    pub fn new(text: &str) -> Self {
        let text = LineEnding::normalize_cow(Cow::Borrowed(text));
        Self::new_exact(&text)
    }

    /// Builds a text from `text` as is. Only `\n` counts as a line separator, so any `\r`
    /// is kept as an ordinary character.
    pub fn new_exact(text: &str) -> Self {
        Self {
            rope: Rope::from(text),
        }
    }

    /// Normalizes `text` like [`Text::new`] and reports the line ending it used.
    pub fn new_detecting_line_ending(text: &str) -> (Self, LineEnding) {
        let line_ending = LineEnding::detect(text);
        (Self::new(text), line_ending)
    }

    pub fn from_rope(rope: Rope) -> Self {
        Self { rope }
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Number of UTF-16 code units.
    pub fn len(&self) -> usize {
        self.rope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.is_empty()
    }

    /// Number of `\n` characters plus one.
    pub fn line_count(&self) -> usize {
        self.rope.line_count()
    }

    pub fn view(&self) -> View {
        View::new(self.rope.clone())
    }

    pub fn mutable_view(&self) -> MutableView {
        MutableView::new(self.view())
    }

    /// Returns a new text with `operation` applied, leaving `self` untouched.
    pub fn apply(&self, operation: &EditOperation) -> Result<Text, EditError> {
        Ok(Self {
            rope: operation.apply(&self.rope)?,
        })
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.rope.ptr_eq(&other.rope)
    }

    pub fn to_string_with_line_ending(&self, line_ending: LineEnding) -> String {
        let mut text = String::with_capacity(self.rope.byte_len());
        for chunk in self.rope.chunks() {
            line_ending.push_with_line_ending(&mut text, chunk);
        }
        text
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.rope == other.rope
    }
}

impl Eq for Text {}

impl Hash for Text {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rope.hash(state);
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.rope, f)
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Text").field(&self.rope).finish()
    }
}

impl FromStr for Text {
    type Err = Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(text))
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Text {
    fn from(mut text: String) -> Self {
        LineEnding::normalize(&mut text);
        Self {
            rope: Rope::from(text),
        }
    }
}

impl From<Rope> for Text {
    fn from(rope: Rope) -> Self {
        Self::from_rope(rope)
    }
}

impl From<&Text> for String {
    fn from(text: &Text) -> Self {
        String::from(&text.rope)
    }
}

impl Serialize for Text {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.rope)
    }
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self {
            rope: Rope::from(text),
        })
    }
}

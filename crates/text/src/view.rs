use crate::{Bias, EditError, EditOperation, LineNumber, Rope, Text, TextRange};
use std::{
    fmt::{self, Write as _},
    ops::{Bound, Deref, RangeBounds},
};

/// Read-only, offset-addressed queries over a text.
///
/// Offsets count UTF-16 code units. Lines are separated by `\n` and numbered from zero.
pub trait TextView {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn line_count(&self) -> usize;

    fn code_unit_at(&self, offset: usize) -> u16;

    /// Moves an offset that falls between the two halves of a surrogate pair to the
    /// start or end of the pair, depending on `bias`. Offsets past the end clip to it.
    fn clip_offset(&self, offset: usize, bias: Bias) -> usize;

    fn line_at(&self, offset: usize) -> LineNumber;

    fn line_start_offset(&self, line: LineNumber) -> usize;

    fn text_for_range(&self, range: TextRange) -> String;

    /// Characters from `offset` to the end of the text.
    fn chars_at(&self, offset: usize) -> impl Iterator<Item = char> + '_;

    /// Characters before `offset`, nearest first.
    fn reversed_chars_at(&self, offset: usize) -> impl Iterator<Item = char> + '_;

    /// Offset where `line` ends. With `include_line_separator`, the `\n` that terminates
    /// the line is counted as part of it. The last line always ends at [`TextView::len`].
    #[track_caller]
    fn line_end_offset(&self, line: LineNumber, include_line_separator: bool) -> usize {
        let last_line = LineNumber(self.line_count() as u32 - 1);
        assert!(
            line <= last_line,
            "line {line} is out of range for a text with {} lines",
            self.line_count()
        );
        if line == last_line {
            return self.len();
        }

        let next_line_start = self.line_start_offset(line.next_line());
        if include_line_separator {
            next_line_start
        } else {
            next_line_start - 1
        }
    }

    #[track_caller]
    fn line_range(&self, line: LineNumber, include_line_separator: bool) -> TextRange {
        self.line_start_offset(line)..self.line_end_offset(line, include_line_separator)
    }

    /// Text of `line` without its line separator.
    #[track_caller]
    fn text_line(&self, line: LineNumber) -> String {
        self.text_for_range(self.line_range(line, false))
    }

    /// Borrows the code units in `range` as a [`TextSlice`].
    #[track_caller]
    fn char_sequence(&self, range: impl RangeBounds<usize>) -> TextSlice<'_, Self> {
        let range = resolve_range(&range, self.len());
        TextSlice { view: self, range }
    }
}

#[track_caller]
fn resolve_range(range: &impl RangeBounds<usize>, len: usize) -> TextRange {
    let start = match range.start_bound() {
        Bound::Included(&start) => start,
        Bound::Excluded(&start) => start + 1,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&end) => end + 1,
        Bound::Excluded(&end) => end,
        Bound::Unbounded => len,
    };
    assert!(
        start <= end && end <= len,
        "range {start}..{end} is out of range for a text of length {len}"
    );
    start..end
}

/// A snapshot of a [`Text`]. Later edits made through a [`MutableView`] never show up
/// here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct View {
    rope: Rope,
}

impl View {
    pub(crate) fn new(rope: Rope) -> Self {
        Self { rope }
    }

    pub fn text(&self) -> Text {
        Text::from_rope(self.rope.clone())
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }
}

impl TextView for View {
    fn len(&self) -> usize {
        self.rope.len()
    }

    fn line_count(&self) -> usize {
        self.rope.line_count()
    }

    #[track_caller]
    fn code_unit_at(&self, offset: usize) -> u16 {
        self.rope.code_unit_at(offset)
    }

    fn clip_offset(&self, offset: usize, bias: Bias) -> usize {
        self.rope.clip_offset(offset, bias)
    }

    #[track_caller]
    fn line_at(&self, offset: usize) -> LineNumber {
        self.rope.line_at(offset)
    }

    #[track_caller]
    fn line_start_offset(&self, line: LineNumber) -> usize {
        self.rope.line_start_offset(line)
    }

    #[track_caller]
    fn text_for_range(&self, range: TextRange) -> String {
        let range = resolve_range(&range, self.rope.len());
        self.rope.text_for_range(range)
    }

    fn chars_at(&self, offset: usize) -> impl Iterator<Item = char> + '_ {
        self.rope.chars_at(offset)
    }

    fn reversed_chars_at(&self, offset: usize) -> impl Iterator<Item = char> + '_ {
        self.rope.reversed_chars_at(offset)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.rope, f)
    }
}

/// A view whose contents can be replaced by applying [`EditOperation`]s.
///
/// Each edit installs a new snapshot. Views and texts obtained before the edit keep
/// the contents they had. A `MutableView` is meant to be driven by a single owner, so
/// editing takes `&mut self`.
#[derive(Clone, Debug, Default)]
pub struct MutableView {
    view: View,
}

impl MutableView {
    pub(crate) fn new(view: View) -> Self {
        Self { view }
    }

    /// Applies `operation` to the current contents.
    ///
    /// Fails with [`EditError::StaleOperation`] and leaves the view untouched when the
    /// operation expects a different length than the view currently has.
    #[track_caller]
    pub fn edit(&mut self, operation: &EditOperation) -> Result<(), EditError> {
        self.view.rope = operation.apply(&self.view.rope)?;
        Ok(())
    }

    /// A snapshot of the current contents.
    pub fn view(&self) -> View {
        self.view.clone()
    }
}

impl Deref for MutableView {
    type Target = View;

    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

impl TextView for MutableView {
    fn len(&self) -> usize {
        self.view.len()
    }

    fn line_count(&self) -> usize {
        self.view.line_count()
    }

    #[track_caller]
    fn code_unit_at(&self, offset: usize) -> u16 {
        self.view.code_unit_at(offset)
    }

    fn clip_offset(&self, offset: usize, bias: Bias) -> usize {
        self.view.clip_offset(offset, bias)
    }

    #[track_caller]
    fn line_at(&self, offset: usize) -> LineNumber {
        self.view.line_at(offset)
    }

    #[track_caller]
    fn line_start_offset(&self, line: LineNumber) -> usize {
        self.view.line_start_offset(line)
    }

    #[track_caller]
    fn text_for_range(&self, range: TextRange) -> String {
        self.view.text_for_range(range)
    }

    fn chars_at(&self, offset: usize) -> impl Iterator<Item = char> + '_ {
        self.view.chars_at(offset)
    }

    fn reversed_chars_at(&self, offset: usize) -> impl Iterator<Item = char> + '_ {
        self.view.reversed_chars_at(offset)
    }
}

/// A borrowed range of a [`TextView`], addressed relative to its own start.
pub struct TextSlice<'a, V: ?Sized> {
    view: &'a V,
    range: TextRange,
}

impl<V: ?Sized> Clone for TextSlice<'_, V> {
    fn clone(&self) -> Self {
        Self {
            view: self.view,
            range: self.range.clone(),
        }
    }
}

impl<'a, V: TextView + ?Sized> TextSlice<'a, V> {
    /// The range this slice covers in the underlying view.
    pub fn range(&self) -> TextRange {
        self.range.clone()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    #[track_caller]
    pub fn code_unit_at(&self, index: usize) -> u16 {
        assert!(
            index < self.len(),
            "index {index} is out of range for a slice of length {}",
            self.len()
        );
        self.view.code_unit_at(self.range.start + index)
    }

    #[track_caller]
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Self {
        let range = resolve_range(&range, self.len());
        Self {
            view: self.view,
            range: self.range.start + range.start..self.range.start + range.end,
        }
    }

    /// The characters of the slice. A surrogate pair cut in half by either end of the
    /// slice comes out as [`char::REPLACEMENT_CHARACTER`].
    pub fn chars(&self) -> impl Iterator<Item = char> + 'a {
        let TextRange { start, end } = self.range.clone();
        let char_start = if start < end {
            self.view.clip_offset(start, Bias::Left)
        } else {
            start
        };
        self.view
            .chars_at(start)
            .scan(char_start, move |offset, ch| {
                if *offset >= end {
                    return None;
                }
                let ch_start = *offset;
                *offset += ch.len_utf16();
                if ch_start < start || *offset > end {
                    Some(char::REPLACEMENT_CHARACTER)
                } else {
                    Some(ch)
                }
            })
    }
}

impl<V: TextView + ?Sized> fmt::Display for TextSlice<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.chars() {
            f.write_char(ch)?;
        }
        Ok(())
    }
}

impl<V: TextView + ?Sized> fmt::Debug for TextSlice<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSlice")
            .field("range", &self.range)
            .field("text", &self.to_string())
            .finish()
    }
}

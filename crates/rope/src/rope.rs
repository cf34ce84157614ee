mod chunk;
mod line_number;
mod offset_utf16;

use chunk::{Chunk, ChunkSlice};
pub use line_number::LineNumber;
pub use offset_utf16::OffsetUtf16;
use rayon::prelude::*;
use std::{
    cmp, fmt,
    hash::{Hash, Hasher},
    ops::{AddAssign, Range},
    str,
};
pub use sum_tree::Bias;
use sum_tree::{Dimension, SumTree};

/// Maximum number of bytes stored in a single leaf of a [`Rope`].
pub const MAX_LEAF_SIZE: usize = chunk::MAX_BASE;

/// An immutable-by-default text store backed by a balanced tree of small chunks.
///
/// Offsets taken and returned by a rope count UTF-16 code units. Cloning is O(1), and
/// [`Rope::splice`] returns a new rope that shares every untouched chunk with its source.
#[derive(Clone, Default)]
pub struct Rope {
    chunks: SumTree<Chunk>,
}

impl Rope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether both ropes share the same underlying tree.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.chunks.ptr_eq(&other.chunks)
    }

    pub fn append(&mut self, rope: Rope) {
        if let Some(chunk) = rope.chunks.first() {
            if self
                .chunks
                .last()
                .map_or(false, |c| c.text.len() < chunk::MIN_BASE)
                || chunk.text.len() < chunk::MIN_BASE
            {
                self.push_chunk(chunk.as_slice());

                let mut chunks = rope.chunks.cursor::<()>();
                chunks.next();
                chunks.next();
                self.chunks.append(chunks.suffix());
            } else {
                self.chunks.append(rope.chunks.clone());
            }
        }
        self.check_invariants();
    }

    pub fn push(&mut self, mut text: &str) {
        self.chunks.update_last(|last_chunk| {
            let split_ix = if last_chunk.text.len() + text.len() <= chunk::MAX_BASE {
                text.len()
            } else {
                let mut split_ix = cmp::min(
                    chunk::MIN_BASE.saturating_sub(last_chunk.text.len()),
                    text.len(),
                );
                while !text.is_char_boundary(split_ix) {
                    split_ix += 1;
                }
                split_ix
            };

            let (suffix, remainder) = text.split_at(split_ix);
            last_chunk.push_str(suffix);
            text = remainder;
        });

        if text.is_empty() {
            return;
        }

        // A character that straddles a chunk boundary moves to the next chunk, leaving at
        // most 3 bytes unused.
        const MIN_CHUNK_SIZE: usize = chunk::MAX_BASE - 3;
        let mut new_chunks = Vec::with_capacity(text.len().div_ceil(MIN_CHUNK_SIZE));
        while !text.is_empty() {
            let mut split_ix = cmp::min(chunk::MAX_BASE, text.len());
            while !text.is_char_boundary(split_ix) {
                split_ix -= 1;
            }
            let (chunk, remainder) = text.split_at(split_ix);
            new_chunks.push(chunk);
            text = remainder;
        }

        #[cfg(test)]
        const PARALLEL_THRESHOLD: usize = 4;
        #[cfg(not(test))]
        const PARALLEL_THRESHOLD: usize = 4 * (2 * sum_tree::TREE_BASE);

        if new_chunks.len() >= PARALLEL_THRESHOLD {
            let new_chunks = new_chunks
                .into_par_iter()
                .map(Chunk::new)
                .collect::<Vec<_>>();
            self.chunks.extend(new_chunks);
        } else {
            self.chunks.extend(new_chunks.into_iter().map(Chunk::new));
        }

        self.check_invariants();
    }

    fn push_chunk(&mut self, mut chunk: ChunkSlice) {
        self.chunks.update_last(|last_chunk| {
            let split_ix = if last_chunk.text.len() + chunk.len() <= chunk::MAX_BASE {
                chunk.len()
            } else {
                let mut split_ix = cmp::min(
                    chunk::MIN_BASE.saturating_sub(last_chunk.text.len()),
                    chunk.len(),
                );
                while !chunk.is_char_boundary(split_ix) {
                    split_ix += 1;
                }
                split_ix
            };

            let (suffix, remainder) = chunk.split_at(split_ix);
            last_chunk.append(suffix);
            chunk = remainder;
        });

        if !chunk.is_empty() {
            self.chunks.push(chunk.into());
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        // Ensure all chunks except maybe the last one are not underflowing.
        // Allow some wiggle room for multibyte characters at chunk boundaries.
        let mut chunks = self.chunks.cursor::<()>().peekable();
        while let Some(chunk) = chunks.next() {
            if chunks.peek().is_some() {
                assert!(chunk.text.len() + 3 >= chunk::MIN_BASE);
            }
        }
    }

    #[cfg(not(test))]
    fn check_invariants(&self) {}

    pub fn summary(&self) -> TextSummary {
        self.chunks.summary().clone()
    }

    /// Length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.chunks.extent::<OffsetUtf16>().0
    }

    /// Length of the UTF-8 encoding, in bytes.
    pub fn byte_len(&self) -> usize {
        self.chunks.extent::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of lines, which is always one more than the number of newlines.
    pub fn line_count(&self) -> usize {
        self.chunks.summary().newlines as usize + 1
    }

    pub fn max_line(&self) -> LineNumber {
        LineNumber(self.chunks.summary().newlines)
    }

    /// Moves an offset that falls inside a surrogate pair to the start (with
    /// [`Bias::Left`]) or the end (with [`Bias::Right`]) of that character. Offsets past
    /// the end are clipped to the length of the rope.
    pub fn clip_offset(&self, offset: usize, bias: Bias) -> usize {
        let mut cursor = self.chunks.cursor::<OffsetUtf16>();
        cursor.seek(&OffsetUtf16(offset), Bias::Right);
        match cursor.item() {
            Some(chunk) => {
                let overshoot = OffsetUtf16(offset) - *cursor.start();
                (*cursor.start() + chunk.as_slice().clip_offset_utf16(overshoot, bias)).0
            }
            None => self.len(),
        }
    }

    /// Returns the UTF-16 code unit at `offset`.
    ///
    /// Panics if `offset` is not less than [`Rope::len`].
    #[track_caller]
    pub fn code_unit_at(&self, offset: usize) -> u16 {
        let len = self.len();
        assert!(
            offset < len,
            "offset {offset} is out of range for a rope of length {len}"
        );

        let mut cursor = self.chunks.cursor::<OffsetUtf16>();
        cursor.seek(&OffsetUtf16(offset), Bias::Right);
        match cursor.item() {
            Some(chunk) => chunk
                .as_slice()
                .code_unit_at(OffsetUtf16(offset) - *cursor.start()),
            None => unreachable!("offset {offset} was checked against length {len}"),
        }
    }

    /// Returns the line containing `offset`. An offset directly after a newline belongs to
    /// the line that follows it.
    ///
    /// Panics if `offset` is greater than [`Rope::len`].
    #[track_caller]
    pub fn line_at(&self, offset: usize) -> LineNumber {
        let len = self.len();
        assert!(
            offset <= len,
            "offset {offset} is out of range for a rope of length {len}"
        );

        let mut cursor = self.chunks.cursor::<(OffsetUtf16, LineNumber)>();
        cursor.seek(&OffsetUtf16(offset), Bias::Left);
        let (chunk_start, chunk_start_line) = *cursor.start();
        match cursor.item() {
            Some(chunk) => {
                let chunk = chunk.as_slice();
                let overshoot = chunk.offset_utf16_to_offset(OffsetUtf16(offset) - chunk_start);
                chunk_start_line + chunk.newlines_before(chunk.floor_char_boundary(overshoot))
            }
            None => chunk_start_line,
        }
    }

    /// Returns the offset of the first code unit of `line`.
    ///
    /// Panics if `line` is not less than [`Rope::line_count`].
    #[track_caller]
    pub fn line_start_offset(&self, line: LineNumber) -> usize {
        let max_line = self.max_line();
        assert!(
            line <= max_line,
            "line {line} is out of range for a rope with {} lines",
            max_line.0 + 1
        );
        if line == LineNumber::ZERO {
            return 0;
        }

        let mut cursor = self.chunks.cursor::<(LineNumber, OffsetUtf16)>();
        cursor.seek(&line, Bias::Left);
        let (chunk_start_line, chunk_start) = *cursor.start();
        match cursor.item() {
            Some(chunk) => {
                let chunk = chunk.as_slice();
                let row_start = chunk.row_start(line - chunk_start_line);
                (chunk_start + chunk.offset_to_offset_utf16(row_start)).0
            }
            None => unreachable!("line {line} was checked against the last line {max_line}"),
        }
    }

    /// Returns the offset just before the line separator that ends `line`, or the length of
    /// the rope for the last line.
    #[track_caller]
    pub fn line_end_offset(&self, line: LineNumber) -> usize {
        let max_line = self.max_line();
        assert!(
            line <= max_line,
            "line {line} is out of range for a rope with {} lines",
            max_line.0 + 1
        );
        if line < max_line {
            self.line_start_offset(line.next_line()) - 1
        } else {
            self.len()
        }
    }

    /// Returns a new rope with `range` replaced by `new_text`, sharing all untouched chunks
    /// with `self`.
    ///
    /// Range endpoints that fall inside a surrogate pair are moved to the start of that
    /// character. Panics if `range` extends past [`Rope::len`].
    #[track_caller]
    pub fn splice(&self, range: Range<usize>, new_text: &str) -> Rope {
        self.assert_range(&range);
        let start = self.clip_offset(range.start, Bias::Left);
        let end = cmp::max(start, self.clip_offset(range.end, Bias::Left));

        let mut rope = self.prefix(start);
        rope.push(new_text);
        rope.append(self.suffix(end));
        rope
    }

    pub fn replace(&mut self, range: Range<usize>, new_text: &str) {
        *self = self.splice(range, new_text);
    }

    /// Returns the portion of the rope in `range` as a new rope that shares chunks with
    /// `self`.
    #[track_caller]
    pub fn slice(&self, range: Range<usize>) -> Rope {
        self.assert_range(&range);
        let start = self.clip_offset(range.start, Bias::Left);
        let end = cmp::max(start, self.clip_offset(range.end, Bias::Left));
        self.suffix(start).prefix(end - start)
    }

    pub fn text_for_range(&self, range: Range<usize>) -> String {
        self.chunks_in_range(range).collect()
    }

    /// Everything before `end`, which must lie on a character boundary.
    fn prefix(&self, end: usize) -> Rope {
        let mut cursor = self.chunks.cursor::<OffsetUtf16>();
        cursor.seek(&OffsetUtf16(end), Bias::Right);
        let mut rope = Rope {
            chunks: cursor.prefix(),
        };
        if let Some(chunk) = cursor.item() {
            let end_ix = chunk
                .as_slice()
                .offset_utf16_to_offset(OffsetUtf16(end) - *cursor.start());
            rope.push_chunk(chunk.slice(0..end_ix));
        }
        rope.check_invariants();
        rope
    }

    /// Everything from `start` onwards, which must lie on a character boundary.
    fn suffix(&self, start: usize) -> Rope {
        let mut cursor = self.chunks.cursor::<OffsetUtf16>();
        cursor.seek(&OffsetUtf16(start), Bias::Right);
        let Some(chunk) = cursor.item() else {
            return Rope::new();
        };

        let start_ix = chunk
            .as_slice()
            .offset_utf16_to_offset(OffsetUtf16(start) - *cursor.start());
        if start_ix == 0 {
            return Rope {
                chunks: cursor.suffix(),
            };
        }

        let mut rope = Rope::new();
        rope.push_chunk(chunk.slice(start_ix..chunk.text.len()));
        cursor.next();
        rope.append(Rope {
            chunks: cursor.suffix(),
        });
        rope
    }

    #[track_caller]
    fn assert_range(&self, range: &Range<usize>) {
        let len = self.len();
        assert!(
            range.start <= range.end && range.end <= len,
            "range {range:?} is out of range for a rope of length {len}"
        );
    }

    pub fn chunks(&self) -> Chunks<'_> {
        self.chunks_in_range(0..self.len())
    }

    pub fn chunks_in_range(&self, range: Range<usize>) -> Chunks<'_> {
        Chunks::new(self, range, false)
    }

    pub fn reversed_chunks_in_range(&self, range: Range<usize>) -> Chunks<'_> {
        Chunks::new(self, range, true)
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.chars_at(0)
    }

    /// Iterates forward over the characters starting at `start`.
    pub fn chars_at(&self, start: usize) -> impl Iterator<Item = char> + '_ {
        self.chunks_in_range(start..self.len()).flat_map(str::chars)
    }

    /// Iterates backward over the characters that end at or before `start`.
    pub fn reversed_chars_at(&self, start: usize) -> impl Iterator<Item = char> + '_ {
        self.reversed_chunks_in_range(0..start)
            .flat_map(|chunk| chunk.chars().rev())
    }

    /// Iterates over the UTF-16 code units in `range`.
    pub fn code_units_in_range(&self, range: Range<usize>) -> impl Iterator<Item = u16> + '_ {
        self.chunks_in_range(range).flat_map(str::encode_utf16)
    }

    /// Yields the text of each line, without its trailing newline.
    pub fn lines(&self) -> Lines<'_> {
        Lines {
            chars: Box::new(self.chars()),
            done: false,
        }
    }
}

impl<'a> From<&'a str> for Rope {
    fn from(text: &'a str) -> Self {
        let mut rope = Self::new();
        rope.push(text);
        rope
    }
}

impl From<String> for Rope {
    fn from(text: String) -> Self {
        Rope::from(text.as_str())
    }
}

impl<'a> FromIterator<&'a str> for Rope {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut rope = Rope::new();
        for chunk in iter {
            rope.push(chunk);
        }
        rope
    }
}

impl From<&Rope> for String {
    fn from(rope: &Rope) -> Self {
        rope.to_string()
    }
}

impl From<Rope> for String {
    fn from(rope: Rope) -> Self {
        rope.to_string()
    }
}

impl fmt::Display for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.chunks() {
            write!(f, "{}", chunk)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use std::fmt::Write as _;

        write!(f, "\"")?;
        let mut format_string = String::new();
        for chunk in self.chunks() {
            write!(&mut format_string, "{:?}", chunk)?;
            write!(f, "{}", &format_string[1..format_string.len() - 1])?;
            format_string.clear();
        }
        write!(f, "\"")?;
        Ok(())
    }
}

impl PartialEq for Rope {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.summary() != other.summary() {
            return false;
        }
        self.chunks()
            .flat_map(str::bytes)
            .eq(other.chunks().flat_map(str::bytes))
    }
}

impl Eq for Rope {}

impl Hash for Rope {
    /// Hashes the content byte by byte so that ropes with equal text hash identically
    /// regardless of how their chunks are split.
    fn hash<H: Hasher>(&self, state: &mut H) {
        for chunk in self.chunks() {
            for byte in chunk.bytes() {
                state.write_u8(byte);
            }
        }
        state.write_usize(self.byte_len());
    }
}

pub struct Chunks<'a> {
    chunks: sum_tree::Cursor<'a, Chunk, OffsetUtf16>,
    range: Range<usize>,
    reversed: bool,
}

impl<'a> Chunks<'a> {
    pub fn new(rope: &'a Rope, range: Range<usize>, reversed: bool) -> Self {
        let mut chunks = rope.chunks.cursor();
        if reversed {
            chunks.seek(&OffsetUtf16(range.end), Bias::Left);
        } else {
            chunks.seek(&OffsetUtf16(range.start), Bias::Right);
        }
        Self {
            chunks,
            range,
            reversed,
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let chunk = self.chunks.item()?;
            let chunk_start = self.chunks.start().0;
            let chunk_end = chunk_start + chunk.len_utf16().0;
            if self.reversed {
                if chunk_end <= self.range.start {
                    return None;
                }
            } else if chunk_start >= self.range.end {
                return None;
            }

            let chunk_slice = chunk.as_slice();
            let start_ix = chunk_slice.floor_char_boundary(chunk_slice.offset_utf16_to_offset(
                OffsetUtf16(self.range.start.saturating_sub(chunk_start)),
            ));
            let end_ix = chunk_slice.floor_char_boundary(chunk_slice.offset_utf16_to_offset(
                OffsetUtf16(cmp::min(self.range.end, chunk_end).saturating_sub(chunk_start)),
            ));
            let slice = &chunk.text.as_str()[start_ix..cmp::max(start_ix, end_ix)];

            if self.reversed {
                self.chunks.prev();
            } else {
                self.chunks.next();
            }
            if !slice.is_empty() {
                return Some(slice);
            }
        }
    }
}

pub struct Lines<'a> {
    chars: Box<dyn Iterator<Item = char> + 'a>,
    done: bool,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut line = String::new();
        for c in self.chars.by_ref() {
            if c == '\n' {
                return Some(line);
            }
            line.push(c);
        }
        self.done = true;
        Some(line)
    }
}

impl sum_tree::Item for Chunk {
    type Summary = TextSummary;

    fn summary(&self) -> Self::Summary {
        self.as_slice().text_summary()
    }
}

/// Aggregate measurements of a run of text.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TextSummary {
    /// Length in bytes.
    pub len: usize,
    /// Length in UTF-16 code units.
    pub len_utf16: OffsetUtf16,
    /// Number of `\n` characters.
    pub newlines: u32,
}

impl TextSummary {
    pub fn line_count(&self) -> usize {
        self.newlines as usize + 1
    }
}

impl<'a> From<&'a str> for TextSummary {
    fn from(text: &'a str) -> Self {
        let mut len_utf16 = OffsetUtf16(0);
        let mut newlines = 0;
        for c in text.chars() {
            len_utf16.0 += c.len_utf16();
            if c == '\n' {
                newlines += 1;
            }
        }

        TextSummary {
            len: text.len(),
            len_utf16,
            newlines,
        }
    }
}

impl sum_tree::Summary for TextSummary {
    fn zero() -> Self {
        Default::default()
    }

    fn add_summary(&mut self, summary: &Self) {
        *self += summary;
    }
}

impl<'a> AddAssign<&'a Self> for TextSummary {
    fn add_assign(&mut self, other: &'a Self) {
        self.len += other.len;
        self.len_utf16 += other.len_utf16;
        self.newlines += other.newlines;
    }
}

impl Dimension<TextSummary> for usize {
    fn zero() -> Self {
        0
    }

    fn add_summary(&mut self, summary: &TextSummary) {
        *self += summary.len;
    }
}

impl Dimension<TextSummary> for OffsetUtf16 {
    fn zero() -> Self {
        Default::default()
    }

    fn add_summary(&mut self, summary: &TextSummary) {
        *self += summary.len_utf16;
    }
}

impl Dimension<TextSummary> for LineNumber {
    fn zero() -> Self {
        Default::default()
    }

    fn add_summary(&mut self, summary: &TextSummary) {
        *self += summary.newlines;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::prelude::*;
    use std::{
        collections::hash_map::DefaultHasher,
        env,
        hash::{Hash, Hasher},
    };
    use util::RandomCharIter;

    #[ctor::ctor]
    fn init_logger() {
        if std::env::var("RUST_LOG").is_ok() {
            env_logger::init();
        }
    }

    #[test]
    fn test_all_4_byte_chars() {
        let mut rope = Rope::new();
        let text = "🏀".repeat(256);
        rope.push(&text);
        assert_eq!(rope.text_for_range(0..rope.len()), text);
        assert_eq!(rope.len(), 512);
        assert_eq!(rope.byte_len(), 1024);
    }

    #[test]
    fn test_clip() {
        let rope = Rope::from("🧘");

        assert_eq!(rope.clip_offset(1, Bias::Left), 0);
        assert_eq!(rope.clip_offset(1, Bias::Right), 2);
        assert_eq!(rope.clip_offset(5, Bias::Right), 2);
        assert_eq!(rope.clip_offset(0, Bias::Right), 0);
    }

    #[test]
    fn test_lines() {
        let rope = Rope::from("abc\ndefg\nhi");
        assert_eq!(
            rope.lines().collect::<Vec<_>>(),
            ["abc", "defg", "hi"]
        );

        let rope = Rope::from("abc\ndefg\nhi\n");
        assert_eq!(
            rope.lines().collect::<Vec<_>>(),
            ["abc", "defg", "hi", ""]
        );

        let rope = Rope::new();
        assert_eq!(rope.lines().collect::<Vec<_>>(), [""]);
        assert_eq!(rope.line_count(), 1);
    }

    #[test]
    fn test_line_queries() {
        let rope = Rope::from("ab\ncd\n\nef");
        assert_eq!(rope.line_count(), 4);
        assert_eq!(rope.line_at(0), LineNumber(0));
        assert_eq!(rope.line_at(2), LineNumber(0));
        assert_eq!(rope.line_at(3), LineNumber(1));
        assert_eq!(rope.line_at(6), LineNumber(2));
        assert_eq!(rope.line_at(7), LineNumber(3));
        assert_eq!(rope.line_at(9), LineNumber(3));

        assert_eq!(rope.line_start_offset(LineNumber(0)), 0);
        assert_eq!(rope.line_start_offset(LineNumber(1)), 3);
        assert_eq!(rope.line_start_offset(LineNumber(2)), 6);
        assert_eq!(rope.line_start_offset(LineNumber(3)), 7);

        assert_eq!(rope.line_end_offset(LineNumber(0)), 2);
        assert_eq!(rope.line_end_offset(LineNumber(2)), 6);
        assert_eq!(rope.line_end_offset(LineNumber(3)), 9);

        let rope = Rope::from("x\n");
        assert_eq!(rope.line_count(), 2);
        assert_eq!(rope.line_at(2), LineNumber(1));
        assert_eq!(rope.line_start_offset(LineNumber(1)), 2);
        assert_eq!(rope.line_end_offset(LineNumber(1)), 2);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_line_start_offset_out_of_range() {
        Rope::from("a\nb").line_start_offset(LineNumber(2));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_code_unit_at_end() {
        Rope::from("abc").code_unit_at(3);
    }

    #[test]
    fn test_splice_shares_structure() {
        let text = "0123456789".repeat(100);
        let rope = Rope::from(text.as_str());
        let edited = rope.splice(500..510, "hello");

        assert_eq!(rope.to_string(), text);
        let mut expected = text.clone();
        expected.replace_range(500..510, "hello");
        assert_eq!(edited.to_string(), expected);
        assert_eq!(edited.len(), 995);

        let copy = rope.clone();
        assert!(copy.ptr_eq(&rope));
        assert_eq!(copy, rope);
        assert_ne!(edited, rope);
    }

    #[test]
    fn test_equality_and_hash_ignore_chunk_boundaries() {
        let text = "one\ntwo 🍐 three\nαβγ four five six seven";
        let whole = Rope::from(text);
        let mut pieces = Rope::new();
        for piece in text.split_inclusive(' ') {
            pieces.append(Rope::from(piece));
        }

        assert_eq!(whole, pieces);
        assert_eq!(hash(&whole), hash(&pieces));
        assert_ne!(whole, Rope::from("one\ntwo"));

        fn hash(rope: &Rope) -> u64 {
            let mut hasher = DefaultHasher::new();
            rope.hash(&mut hasher);
            hasher.finish()
        }
    }

    #[test]
    fn test_code_units() {
        let rope = Rope::from("a🍐\nb");
        let expected = "a🍐\nb".encode_utf16().collect::<Vec<_>>();
        assert_eq!(rope.len(), expected.len());
        for (offset, unit) in expected.iter().enumerate() {
            assert_eq!(rope.code_unit_at(offset), *unit);
        }
        assert_eq!(
            rope.code_units_in_range(0..rope.len()).collect::<Vec<_>>(),
            expected
        );
    }

    #[test]
    fn test_random_rope() {
        let operations = env::var("OPERATIONS")
            .map(|i| i.parse().expect("invalid `OPERATIONS` variable"))
            .unwrap_or(10);

        for (seed, mut rng) in util::test::seeded_rngs(100) {
            let mut expected = String::new();
            let mut actual = Rope::new();
            let mut snapshots: Vec<(Rope, String)> = Vec::new();

            for _ in 0..operations {
                let end_ix = clip_offset(&expected, rng.gen_range(0..=expected.len()), Bias::Right);
                let start_ix = clip_offset(&expected, rng.gen_range(0..=end_ix), Bias::Left);
                let len = rng.gen_range(0..=64);
                let new_text: String = RandomCharIter::new(&mut rng).take(len).collect();

                let range_utf16 = utf16_len(&expected[..start_ix])..utf16_len(&expected[..end_ix]);
                log::info!(
                    "seed {seed}: replacing {:?} with {:?}",
                    range_utf16,
                    new_text
                );

                if rng.gen_bool(0.3) {
                    snapshots.push((actual.clone(), expected.clone()));
                }
                actual = actual.splice(range_utf16, &new_text);
                expected.replace_range(start_ix..end_ix, &new_text);

                assert_eq!(actual.text_for_range(0..actual.len()), expected);
                log::info!("text: {:?}", expected);

                let code_units = expected.encode_utf16().collect::<Vec<_>>();
                assert_eq!(actual.len(), code_units.len());
                assert_eq!(actual.byte_len(), expected.len());
                assert_eq!(actual.summary(), TextSummary::from(expected.as_str()));

                for _ in 0..5 {
                    let end_ix = clip_offset(&expected, rng.gen_range(0..=expected.len()), Bias::Right);
                    let start_ix = clip_offset(&expected, rng.gen_range(0..=end_ix), Bias::Left);
                    let range = utf16_len(&expected[..start_ix])..utf16_len(&expected[..end_ix]);

                    let actual_text = actual.chunks_in_range(range.clone()).collect::<String>();
                    assert_eq!(actual_text, &expected[start_ix..end_ix]);

                    let actual_text = actual
                        .reversed_chunks_in_range(range.clone())
                        .flat_map(|chunk| chunk.chars().rev())
                        .collect::<String>();
                    assert_eq!(
                        actual_text,
                        expected[start_ix..end_ix].chars().rev().collect::<String>()
                    );

                    let slice = actual.slice(range.clone());
                    assert_eq!(slice.to_string(), &expected[start_ix..end_ix]);
                    slice.check_invariants();

                    assert_eq!(
                        actual.chars_at(range.start).collect::<String>(),
                        &expected[start_ix..]
                    );
                    assert_eq!(
                        actual.reversed_chars_at(range.end).collect::<String>(),
                        expected[..end_ix].chars().rev().collect::<String>()
                    );
                }

                let mut line = LineNumber(0);
                let mut line_start = 0;
                for (offset, unit) in code_units.iter().enumerate() {
                    assert_eq!(actual.code_unit_at(offset), *unit, "offset {offset}");
                    assert_eq!(actual.line_at(offset), line, "offset {offset}");
                    if *unit == b'\n' as u16 {
                        assert_eq!(actual.line_end_offset(line), offset);
                        line = line.next_line();
                        line_start = offset + 1;
                        assert_eq!(actual.line_start_offset(line), line_start);
                    }
                }
                assert_eq!(actual.line_at(code_units.len()), line);
                assert_eq!(actual.max_line(), line);
                assert_eq!(actual.line_start_offset(line), line_start);
                assert_eq!(actual.line_end_offset(line), code_units.len());
                assert_eq!(actual.line_count(), expected.split('\n').count());
                assert_eq!(
                    actual.lines().collect::<Vec<_>>(),
                    expected.split('\n').collect::<Vec<_>>()
                );

                let mut offset_utf16 = 0;
                for c in expected.chars() {
                    for i in 1..c.len_utf16() {
                        assert_eq!(actual.clip_offset(offset_utf16 + i, Bias::Left), offset_utf16);
                        assert_eq!(
                            actual.clip_offset(offset_utf16 + i, Bias::Right),
                            offset_utf16 + c.len_utf16()
                        );
                    }
                    assert_eq!(actual.clip_offset(offset_utf16, Bias::Left), offset_utf16);
                    offset_utf16 += c.len_utf16();
                }

                actual.check_invariants();
            }

            for (snapshot, text) in snapshots {
                assert_eq!(snapshot.to_string(), text, "seed {seed}");
            }
        }
    }

    fn utf16_len(text: &str) -> usize {
        text.encode_utf16().count()
    }

    fn clip_offset(text: &str, mut offset: usize, bias: Bias) -> usize {
        while !text.is_char_boundary(offset) {
            match bias {
                Bias::Left => offset -= 1,
                Bias::Right => offset += 1,
            }
        }
        offset
    }
}

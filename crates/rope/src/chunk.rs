use crate::{OffsetUtf16, TextSummary};
use arrayvec::ArrayString;
use std::{cmp, ops::Range};
use sum_tree::Bias;
use util::debug_panic;

#[cfg(not(test))]
pub(crate) type Bitmap = u128;
#[cfg(test)]
pub(crate) type Bitmap = u16;

pub(crate) const MIN_BASE: usize = MAX_BASE / 2;
pub(crate) const MAX_BASE: usize = Bitmap::BITS as usize;

#[derive(Clone, Debug, Default)]
pub struct Chunk {
    /// If bit[i] is set, then the character at index i is the start of a UTF-8 character in the
    /// text.
    chars: Bitmap,
    /// The number of set bits is the number of UTF-16 code units it would take to represent the
    /// text.
    ///
    /// Bit[i] is set if text[i] is the start of a UTF-8 character. If the character would
    /// take two UTF-16 code units, then bit[i+1] is also set. (Rust chars never take more
    /// than two UTF-16 code units.)
    chars_utf16: Bitmap,
    /// If bit[i] is set, then the character at index i is an ascii newline.
    newlines: Bitmap,
    pub text: ArrayString<MAX_BASE>,
}

impl Chunk {
    #[inline(always)]
    pub fn new(text: &str) -> Self {
        let mut this = Chunk::default();
        this.push_str(text);
        this
    }

    #[inline(always)]
    pub fn push_str(&mut self, text: &str) {
        for (char_ix, c) in text.char_indices() {
            let ix = self.text.len() + char_ix;
            self.chars |= 1 << ix;
            self.chars_utf16 |= 1 << ix;
            self.chars_utf16 |= (c.len_utf16() as Bitmap) << ix;
            self.newlines |= ((c == '\n') as Bitmap) << ix;
        }
        self.text.push_str(text);
    }

    #[inline(always)]
    pub fn append(&mut self, slice: ChunkSlice) {
        if slice.is_empty() {
            return;
        };

        let base_ix = self.text.len();
        self.chars |= slice.chars << base_ix;
        self.chars_utf16 |= slice.chars_utf16 << base_ix;
        self.newlines |= slice.newlines << base_ix;
        self.text.push_str(slice.text);
    }

    #[inline(always)]
    pub fn as_slice(&self) -> ChunkSlice<'_> {
        ChunkSlice {
            chars: self.chars,
            chars_utf16: self.chars_utf16,
            newlines: self.newlines,
            text: &self.text,
        }
    }

    #[inline(always)]
    pub fn slice(&self, range: Range<usize>) -> ChunkSlice<'_> {
        self.as_slice().slice(range)
    }

    #[cfg(test)]
    pub fn chars(&self) -> Bitmap {
        self.chars
    }

    #[inline(always)]
    pub fn len_utf16(&self) -> OffsetUtf16 {
        self.as_slice().len_utf16()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ChunkSlice<'a> {
    chars: Bitmap,
    chars_utf16: Bitmap,
    newlines: Bitmap,
    text: &'a str,
}

impl From<ChunkSlice<'_>> for Chunk {
    fn from(slice: ChunkSlice<'_>) -> Self {
        let mut text = ArrayString::new();
        text.push_str(slice.text);
        Chunk {
            chars: slice.chars,
            chars_utf16: slice.chars_utf16,
            newlines: slice.newlines,
            text,
        }
    }
}

impl<'a> ChunkSlice<'a> {
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[inline(always)]
    pub fn is_char_boundary(&self, offset: usize) -> bool {
        (1 as Bitmap).unbounded_shl(offset as u32) & self.chars != 0 || offset == self.text.len()
    }

    #[inline(always)]
    pub fn split_at(self, mid: usize) -> (ChunkSlice<'a>, ChunkSlice<'a>) {
        if mid == MAX_BASE {
            let left = self;
            let right = ChunkSlice {
                chars: 0,
                chars_utf16: 0,
                newlines: 0,
                text: "",
            };
            (left, right)
        } else {
            let mask = ((1 as Bitmap) << mid) - 1;
            let (left_text, right_text) = self.text.split_at(mid);
            let left = ChunkSlice {
                chars: self.chars & mask,
                chars_utf16: self.chars_utf16 & mask,
                newlines: self.newlines & mask,
                text: left_text,
            };
            let right = ChunkSlice {
                chars: self.chars >> mid,
                chars_utf16: self.chars_utf16 >> mid,
                newlines: self.newlines >> mid,
                text: right_text,
            };
            (left, right)
        }
    }

    #[inline(always)]
    pub fn slice(self, range: Range<usize>) -> Self {
        let mask = (1 as Bitmap)
            .unbounded_shl(range.end as u32)
            .wrapping_sub(1);
        if range.start == MAX_BASE {
            Self {
                chars: 0,
                chars_utf16: 0,
                newlines: 0,
                text: "",
            }
        } else {
            self.assert_char_boundary(range.start);
            self.assert_char_boundary(range.end);
            Self {
                chars: (self.chars & mask) >> range.start,
                chars_utf16: (self.chars_utf16 & mask) >> range.start,
                newlines: (self.newlines & mask) >> range.start,
                text: &self.text[range],
            }
        }
    }

    #[inline(always)]
    pub fn text_summary(&self) -> TextSummary {
        TextSummary {
            len: self.len(),
            len_utf16: self.len_utf16(),
            newlines: self.newline_count(),
        }
    }

    /// Get length in bytes
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Get length in UTF-16 code units
    #[inline(always)]
    pub fn len_utf16(&self) -> OffsetUtf16 {
        OffsetUtf16(self.chars_utf16.count_ones() as usize)
    }

    #[inline(always)]
    pub fn newline_count(&self) -> u32 {
        self.newlines.count_ones()
    }

    /// Number of newlines strictly before the given byte offset.
    #[inline(always)]
    pub fn newlines_before(&self, offset: usize) -> u32 {
        let mask = (1 as Bitmap).unbounded_shl(offset as u32).wrapping_sub(1);
        (self.newlines & mask).count_ones()
    }

    /// Byte offset at which the `row`th line of this slice starts, counting the line that
    /// contains the slice's first byte as row zero.
    #[inline(always)]
    pub fn row_start(&self, row: u32) -> usize {
        if row == 0 {
            return 0;
        }
        if row > self.newline_count() {
            debug_panic!("row {} is beyond the rows of chunk {:?}", row, self.text);
            return self.len();
        }

        #[cfg(not(test))]
        let newlines = self.newlines;
        #[cfg(test)]
        let newlines = self.newlines as u128;
        nth_set_bit(newlines, row as usize) + 1
    }

    #[track_caller]
    #[inline(always)]
    pub fn assert_char_boundary(&self, offset: usize) {
        if self.is_char_boundary(offset) {
            return;
        }
        panic_char_boundary(self, offset);

        #[cold]
        #[inline(never)]
        fn panic_char_boundary(chunk: &ChunkSlice, offset: usize) {
            if offset > chunk.text.len() {
                panic!(
                    "byte index {} is out of bounds of `{:?}` (length: {})",
                    offset,
                    chunk.text,
                    chunk.text.len()
                );
            }
            // find the character
            let char_start = chunk.floor_char_boundary(offset);
            // `char_start` must be less than len and a char boundary
            let ch = chunk
                .text
                .get(char_start..)
                .unwrap()
                .chars()
                .next()
                .unwrap();
            let char_range = char_start..char_start + ch.len_utf8();
            panic!(
                "byte index {} is not a char boundary; it is inside {:?} (bytes {:?})",
                offset, ch, char_range,
            );
        }
    }

    pub fn floor_char_boundary(&self, index: usize) -> usize {
        #[inline]
        pub(crate) const fn is_utf8_char_boundary(u8: u8) -> bool {
            // This is bit magic equivalent to: b < 128 || b >= 192
            (u8 as i8) >= -0x40
        }

        if index >= self.text.len() {
            self.text.len()
        } else {
            let mut i = index;
            while i > 0 {
                if is_utf8_char_boundary(self.text.as_bytes()[i]) {
                    break;
                }
                i -= 1;
            }

            i
        }
    }

    #[inline(always)]
    pub fn offset_to_offset_utf16(&self, offset: usize) -> OffsetUtf16 {
        let mask = (1 as Bitmap).unbounded_shl(offset as u32).wrapping_sub(1);
        OffsetUtf16((self.chars_utf16 & mask).count_ones() as usize)
    }

    /// Converts a UTF-16 offset into a byte offset.
    ///
    /// An offset that falls between the two halves of a surrogate pair maps to a byte
    /// inside the encoded character; use [`Self::floor_char_boundary`] to move it back.
    #[inline(always)]
    pub fn offset_utf16_to_offset(&self, target: OffsetUtf16) -> usize {
        if target.0 == 0 {
            0
        } else {
            #[cfg(not(test))]
            let chars_utf16 = self.chars_utf16;
            #[cfg(test)]
            let chars_utf16 = self.chars_utf16 as u128;
            let ix = nth_set_bit(chars_utf16, target.0) + 1;
            if ix == MAX_BASE {
                MAX_BASE
            } else {
                let utf8_additional_len = cmp::min(
                    (self.chars_utf16 >> ix).trailing_zeros() as usize,
                    self.text.len() - ix,
                );
                ix + utf8_additional_len
            }
        }
    }

    #[inline(always)]
    pub fn clip_offset_utf16(&self, target: OffsetUtf16, bias: Bias) -> OffsetUtf16 {
        if target == OffsetUtf16::default() {
            OffsetUtf16::default()
        } else if target >= self.len_utf16() {
            self.len_utf16()
        } else {
            let mut offset = self.offset_utf16_to_offset(target);
            while !self.text.is_char_boundary(offset) {
                if bias == Bias::Left {
                    offset -= 1;
                } else {
                    offset += 1;
                }
            }
            self.offset_to_offset_utf16(offset)
        }
    }

    /// Returns the UTF-16 code unit at `target`, which must be less than the slice's UTF-16
    /// length.
    #[inline(always)]
    pub fn code_unit_at(&self, target: OffsetUtf16) -> u16 {
        let offset = self.floor_char_boundary(self.offset_utf16_to_offset(target));
        let char_start = self.offset_to_offset_utf16(offset);
        match self.text[offset..].chars().next() {
            Some(ch) => {
                let mut units = [0; 2];
                ch.encode_utf16(&mut units)[target.0 - char_start.0]
            }
            None => {
                debug_panic!(
                    "utf-16 offset {:?} is out of bounds of chunk {:?}",
                    target,
                    self.text
                );
                0
            }
        }
    }
}

/// Finds the n-th bit that is set to 1.
#[inline(always)]
fn nth_set_bit(v: u128, n: usize) -> usize {
    let low = v as u64;
    let high = (v >> 64) as u64;

    let low_count = low.count_ones() as usize;
    if n > low_count {
        64 + nth_set_bit_u64(high, (n - low_count) as u64) as usize
    } else {
        nth_set_bit_u64(low, n as u64) as usize
    }
}

#[inline(always)]
fn nth_set_bit_u64(v: u64, mut n: u64) -> u64 {
    let v = v.reverse_bits();
    let mut s: u64 = 64;

    // Parallel bit count intermediates
    let a = v - ((v >> 1) & (u64::MAX / 3));
    let b = (a & (u64::MAX / 5)) + ((a >> 2) & (u64::MAX / 5));
    let c = (b + (b >> 4)) & (u64::MAX / 0x11);
    let d = (c + (c >> 8)) & (u64::MAX / 0x101);

    // Branchless select
    let t = (d >> 32) + (d >> 48);
    s -= (t.wrapping_sub(n) & 256) >> 3;
    n -= t & (t.wrapping_sub(n) >> 8);

    let t = (d >> (s - 16)) & 0xff;
    s -= (t.wrapping_sub(n) & 256) >> 4;
    n -= t & (t.wrapping_sub(n) >> 8);

    let t = (c >> (s - 8)) & 0xf;
    s -= (t.wrapping_sub(n) & 256) >> 5;
    n -= t & (t.wrapping_sub(n) >> 8);

    let t = (b >> (s - 4)) & 0x7;
    s -= (t.wrapping_sub(n) & 256) >> 6;
    n -= t & (t.wrapping_sub(n) >> 8);

    let t = (a >> (s - 2)) & 0x3;
    s -= (t.wrapping_sub(n) & 256) >> 7;
    n -= t & (t.wrapping_sub(n) >> 8);

    let t = (v >> (s - 1)) & 0x1;
    s -= (t.wrapping_sub(n) & 256) >> 8;

    65 - s - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use util::RandomCharIter;

    #[test]
    fn test_random_chunks() {
        for (_, mut rng) in util::test::seeded_rngs(100) {
            let text = random_string_with_utf8_len(&mut rng, MAX_BASE);
            log::info!("Chunk: {:?}", text);
            let chunk = Chunk::new(&text);
            verify_chunk(chunk.as_slice(), &text);

            // Verify Chunk::chars() bitmap
            let expected_chars = char_offsets(&text)
                .into_iter()
                .inspect(|i| assert!(*i < MAX_BASE))
                .fold(0 as Bitmap, |acc, i| acc | (1 << i));
            assert_eq!(chunk.chars(), expected_chars);

            for _ in 0..10 {
                let mut start = rng.gen_range(0..=chunk.text.len());
                let mut end = rng.gen_range(start..=chunk.text.len());
                while !chunk.text.is_char_boundary(start) {
                    start -= 1;
                }
                while !chunk.text.is_char_boundary(end) {
                    end -= 1;
                }
                let range = start..end;
                log::info!("Range: {:?}", range);
                let text_slice = &text[range.clone()];
                let chunk_slice = chunk.slice(range);
                verify_chunk(chunk_slice, text_slice);
            }
        }
    }

    #[test]
    fn test_split_chunk_slice() {
        for (_, mut rng) in util::test::seeded_rngs(100) {
            let text = &random_string_with_utf8_len(&mut rng, MAX_BASE);
            let chunk = Chunk::new(text);
            let offset = char_offsets_with_end(text)
                .into_iter()
                .choose(&mut rng)
                .unwrap();
            let (a, b) = chunk.as_slice().split_at(offset);
            let (a_str, b_str) = text.split_at(offset);
            verify_chunk(a, a_str);
            verify_chunk(b, b_str);
        }
    }

    #[test]
    fn test_nth_set_bit_random() {
        for (_, mut rng) in util::test::seeded_rngs(1000) {
            let set_count = rng.gen_range(0..=128);
            let mut set_bits = (0..128).choose_multiple(&mut rng, set_count);
            set_bits.sort();
            let mut n = 0;
            for ix in set_bits.iter().copied() {
                n |= 1 << ix;
            }

            for (mut ix, position) in set_bits.into_iter().enumerate() {
                ix += 1;
                assert_eq!(
                    nth_set_bit(n, ix),
                    position,
                    "nth_set_bit({:0128b}, {})",
                    n,
                    ix
                );
            }
        }
    }

    #[test]
    fn test_append_random_strings() {
        for (_, mut rng) in util::test::seeded_rngs(1000) {
            let len1 = rng.gen_range(0..=MAX_BASE);
            let len2 = rng.gen_range(0..=MAX_BASE).saturating_sub(len1);
            let str1 = random_string_with_utf8_len(&mut rng, len1);
            let str2 = random_string_with_utf8_len(&mut rng, len2);
            let mut chunk1 = Chunk::new(&str1);
            let chunk2 = Chunk::new(&str2);
            let char_offsets = char_offsets_with_end(&str2);
            let start_index = rng.gen_range(0..char_offsets.len());
            let start_offset = char_offsets[start_index];
            let end_offset = char_offsets[rng.gen_range(start_index..char_offsets.len())];
            chunk1.append(chunk2.slice(start_offset..end_offset));
            verify_chunk(chunk1.as_slice(), &(str1 + &str2[start_offset..end_offset]));
        }
    }

    #[test]
    fn test_rows_and_code_units() {
        let chunk = Chunk::new("a\n🍐\nβc");
        let slice = chunk.as_slice();
        assert_eq!(slice.newline_count(), 2);
        assert_eq!(slice.row_start(0), 0);
        assert_eq!(slice.row_start(1), 2);
        assert_eq!(slice.row_start(2), 7);
        assert_eq!(slice.len_utf16(), OffsetUtf16(7));
        assert_eq!(slice.code_unit_at(OffsetUtf16(2)), 0xD83C);
        assert_eq!(slice.code_unit_at(OffsetUtf16(3)), 0xDF50);
        assert_eq!(slice.code_unit_at(OffsetUtf16(5)), 'β' as u16);
        assert_eq!(
            slice.clip_offset_utf16(OffsetUtf16(3), Bias::Left),
            OffsetUtf16(2)
        );
        assert_eq!(
            slice.clip_offset_utf16(OffsetUtf16(3), Bias::Right),
            OffsetUtf16(4)
        );
    }

    /// Returns a (biased) random string whose UTF-8 length is no more than `len`.
    fn random_string_with_utf8_len(rng: &mut StdRng, len: usize) -> String {
        let mut str = String::new();
        let mut chars = RandomCharIter::new(rng);
        loop {
            let ch = chars.next().unwrap();
            if str.len() + ch.len_utf8() > len {
                break;
            }
            str.push(ch);
        }
        str
    }

    /// Return the byte offsets for each character in a string.
    ///
    /// These are valid offsets to split the string.
    fn char_offsets(text: &str) -> Vec<usize> {
        text.char_indices().map(|(i, _c)| i).collect()
    }

    /// Return the byte offsets for each character in a string, plus the offset
    /// past the end of the string.
    fn char_offsets_with_end(text: &str) -> Vec<usize> {
        let mut v = char_offsets(text);
        v.push(text.len());
        v
    }

    fn verify_chunk(chunk: ChunkSlice<'_>, text: &str) {
        let mut offset = 0;
        let mut offset_utf16 = OffsetUtf16(0);
        let mut row = 0;
        let code_units = text.encode_utf16().collect::<Vec<_>>();

        log::info!("Verifying chunk {:?}", text);
        for c in text.chars() {
            assert_eq!(
                chunk.offset_to_offset_utf16(offset),
                offset_utf16,
                "mismatch at offset {}",
                offset
            );
            assert_eq!(
                chunk.offset_utf16_to_offset(offset_utf16),
                offset,
                "mismatch at offset_utf16 {:?}",
                offset_utf16
            );
            assert_eq!(
                chunk.newlines_before(offset),
                row,
                "mismatch in newline count at offset {}",
                offset
            );
            assert_eq!(
                chunk.clip_offset_utf16(offset_utf16, Bias::Left),
                offset_utf16,
                "incorrect left clip at {:?}",
                offset_utf16
            );

            for i in 0..c.len_utf16() {
                let unit_offset = OffsetUtf16(offset_utf16.0 + i);
                assert_eq!(
                    chunk.code_unit_at(unit_offset),
                    code_units[unit_offset.0],
                    "incorrect code unit at {:?}",
                    unit_offset
                );
            }

            for i in 1..c.len_utf16() {
                let test_offset = OffsetUtf16(offset_utf16.0 + i);
                assert_eq!(
                    chunk.clip_offset_utf16(test_offset, Bias::Left),
                    offset_utf16,
                    "incorrect left clip_offset_utf16 within multi-byte char at {:?}",
                    test_offset
                );
                assert_eq!(
                    chunk.clip_offset_utf16(test_offset, Bias::Right),
                    OffsetUtf16(offset_utf16.0 + c.len_utf16()),
                    "incorrect right clip_offset_utf16 within multi-byte char at {:?}",
                    test_offset
                );
            }

            if c == '\n' {
                row += 1;
                assert_eq!(
                    chunk.row_start(row),
                    offset + 1,
                    "incorrect start of row {}",
                    row
                );
            }

            offset += c.len_utf8();
            offset_utf16.0 += c.len_utf16();
        }

        assert_eq!(chunk.offset_to_offset_utf16(offset), offset_utf16);
        assert_eq!(chunk.offset_utf16_to_offset(offset_utf16), offset);
        assert_eq!(chunk.newlines_before(offset), row);
        assert_eq!(chunk.newline_count(), row);
        assert_eq!(chunk.len(), text.len());
        assert_eq!(chunk.len_utf16().0, code_units.len());
        assert_eq!(
            chunk.text_summary(),
            TextSummary {
                len: text.len(),
                len_utf16: OffsetUtf16(code_units.len()),
                newlines: row,
            }
        );
    }
}

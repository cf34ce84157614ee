use text::{Bias, TextRange, TextView};

/// The class of a character, as far as word navigation is concerned.
///
/// `Caret` is never produced by [`char_class`]. It stands in for the position a scan
/// starts from, so the first character a scan looks at never ends it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CharClass {
    Caret,
    Space,
    Separator,
    Newline,
    Uppercase,
    Lowercase,
    Underscore,
    Other,
}

impl CharClass {
    /// Whether characters of this class can be part of an identifier.
    pub fn is_identifier(self) -> bool {
        matches!(
            self,
            CharClass::Uppercase | CharClass::Lowercase | CharClass::Underscore | CharClass::Other
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

pub fn char_class(ch: char) -> CharClass {
    match ch {
        '\n' | '\r' => CharClass::Newline,
        '_' => CharClass::Underscore,
        ch if ch.is_whitespace() => CharClass::Space,
        ch if ch.is_uppercase() => CharClass::Uppercase,
        ch if ch.is_lowercase() => CharClass::Lowercase,
        ch if ch.is_alphanumeric() => CharClass::Other,
        _ => CharClass::Separator,
    }
}

/// Decides whether a scan stops between two adjacent characters.
///
/// `before` is the class of the character the scan has just passed and `after` the class
/// of the one it would pass next, both in scan order.
pub fn is_boundary(
    before: CharClass,
    after: CharClass,
    direction: Direction,
    honor_camel_humps: bool,
    stop_after_space: bool,
) -> bool {
    match (before, after) {
        (CharClass::Caret, _) => false,
        (before, after) if before == after => false,
        (CharClass::Space, _) => stop_after_space,
        (CharClass::Separator, _)
        | (_, CharClass::Separator | CharClass::Newline | CharClass::Space) => true,
        (CharClass::Underscore, _) | (_, CharClass::Underscore) => honor_camel_humps,
        (CharClass::Lowercase, CharClass::Uppercase) => {
            honor_camel_humps && direction == Direction::Forward
        }
        (CharClass::Uppercase, CharClass::Lowercase) => {
            honor_camel_humps && direction == Direction::Backward
        }
        _ => true,
    }
}

/// Scans forward from `offset` and returns the offset of the first word boundary, never
/// going past the end of `range`.
#[track_caller]
pub fn text_right<V: TextView + ?Sized>(
    view: &V,
    offset: usize,
    range: TextRange,
    honor_camel_humps: bool,
    stop_after_space: bool,
) -> usize {
    assert_range(view, &range);
    let mut position = view
        .clip_offset(offset.clamp(range.start, range.end), Bias::Right)
        .min(range.end);
    let mut previous = CharClass::Caret;
    for ch in view.chars_at(position) {
        if position >= range.end {
            break;
        }

        let class = char_class(ch);
        if is_boundary(
            previous,
            class,
            Direction::Forward,
            honor_camel_humps,
            stop_after_space,
        ) {
            break;
        }
        position = (position + ch.len_utf16()).min(range.end);
        previous = class;
    }
    position
}

/// Scans backward from `offset` and returns the offset of the first word boundary, never
/// going past the start of `range`.
#[track_caller]
pub fn text_left<V: TextView + ?Sized>(
    view: &V,
    offset: usize,
    range: TextRange,
    honor_camel_humps: bool,
    stop_after_space: bool,
) -> usize {
    assert_range(view, &range);
    let mut position = view
        .clip_offset(offset.clamp(range.start, range.end), Bias::Left)
        .max(range.start);
    let mut previous = CharClass::Caret;
    for ch in view.reversed_chars_at(position) {
        if position <= range.start {
            break;
        }

        let class = char_class(ch);
        if is_boundary(
            previous,
            class,
            Direction::Backward,
            honor_camel_humps,
            stop_after_space,
        ) {
            break;
        }
        position = position.saturating_sub(ch.len_utf16()).max(range.start);
        previous = class;
    }
    position
}

/// Returns the range of the word at `offset`.
///
/// When the characters on both sides of `offset` are not identifier characters and
/// `require_word_at_caret` is set, the result is the empty range at `offset`.
#[track_caller]
pub fn text_around<V: TextView + ?Sized>(
    view: &V,
    offset: usize,
    range: TextRange,
    honor_camel_humps: bool,
    require_word_at_caret: bool,
) -> TextRange {
    assert_range(view, &range);
    let offset = offset.clamp(range.start, range.end);
    let left_is_identifier = offset > range.start
        && view
            .reversed_chars_at(offset)
            .next()
            .is_some_and(|ch| char_class(ch).is_identifier());
    let right_is_identifier = offset < range.end
        && view
            .chars_at(offset)
            .next()
            .is_some_and(|ch| char_class(ch).is_identifier());

    if !left_is_identifier && !right_is_identifier && require_word_at_caret {
        return offset..offset;
    }

    let word = if right_is_identifier || !left_is_identifier {
        let end = text_right(view, offset, range.clone(), honor_camel_humps, false);
        text_left(view, end, range, honor_camel_humps, false)..end
    } else {
        let start = text_left(view, offset, range.clone(), honor_camel_humps, false);
        start..text_right(view, start, range, honor_camel_humps, false)
    };
    log::trace!("word around {offset} is {word:?}");
    word
}

#[track_caller]
fn assert_range<V: TextView + ?Sized>(view: &V, range: &TextRange) {
    let len = view.len();
    assert!(
        range.start <= range.end && range.end <= len,
        "range {range:?} is out of range for a text of length {len}"
    );
}

use crate::{EditError, Rope, TextRange};
use serde::{Deserialize, Serialize};
use util::truncate_and_trailoff;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Insert {
        text: String,
    },
    Delete {
        text: String,
    },
    Replace {
        removed_text: String,
        inserted_text: String,
    },
}

/// A single change to a text, together with the length the text must have for the
/// change to apply.
///
/// Offsets count UTF-16 code units. `expected_prior_len` guards against applying an
/// operation that was computed from an outdated copy of the text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditOperation {
    pub kind: EditKind,
    pub offset: usize,
    pub expected_prior_len: usize,
    pub deduce: bool,
}

impl EditOperation {
    pub fn insert_at(offset: usize, text: impl Into<String>, prior_len: usize) -> Self {
        Self {
            kind: EditKind::Insert { text: text.into() },
            offset,
            expected_prior_len: prior_len,
            deduce: false,
        }
    }

    pub fn delete_at(offset: usize, removed_text: impl Into<String>, prior_len: usize) -> Self {
        Self {
            kind: EditKind::Delete {
                text: removed_text.into(),
            },
            offset,
            expected_prior_len: prior_len,
            deduce: false,
        }
    }

    /// Replaces `removed_text`, which starts at `offset`, with `inserted_text`.
    ///
    /// With `deduce`, the text shared by both ends of `removed_text` and `inserted_text` is
    /// trimmed away, and the operation shrinks to the span that actually changes. The
    /// result may then be a plain insertion or deletion.
    pub fn replace_at(
        offset: usize,
        removed_text: impl Into<String>,
        inserted_text: impl Into<String>,
        prior_len: usize,
        deduce: bool,
    ) -> Self {
        let removed_text = removed_text.into();
        let inserted_text = inserted_text.into();
        if !deduce {
            return Self {
                kind: EditKind::Replace {
                    removed_text,
                    inserted_text,
                },
                offset,
                expected_prior_len: prior_len,
                deduce,
            };
        }

        let prefix_len = common_prefix_len(&removed_text, &inserted_text);
        let removed_rest = &removed_text[prefix_len..];
        let inserted_rest = &inserted_text[prefix_len..];
        let suffix_len = common_suffix_len(removed_rest, inserted_rest);
        let removed = &removed_rest[..removed_rest.len() - suffix_len];
        let inserted = &inserted_rest[..inserted_rest.len() - suffix_len];
        let offset = offset + utf16_len(&removed_text[..prefix_len]);

        let kind = match (removed.is_empty(), inserted.is_empty()) {
            (true, false) => EditKind::Insert {
                text: inserted.to_string(),
            },
            (false, true) => EditKind::Delete {
                text: removed.to_string(),
            },
            _ => EditKind::Replace {
                removed_text: removed.to_string(),
                inserted_text: inserted.to_string(),
            },
        };
        log::debug!(
            "narrowed replacement of {} code units at {} to {:?} at {}",
            utf16_len(&removed_text),
            offset - utf16_len(&removed_text[..prefix_len]),
            kind,
            offset
        );

        Self {
            kind,
            offset,
            expected_prior_len: prior_len,
            deduce,
        }
    }

    pub fn removed_text(&self) -> &str {
        match &self.kind {
            EditKind::Insert { .. } => "",
            EditKind::Delete { text } => text,
            EditKind::Replace { removed_text, .. } => removed_text,
        }
    }

    pub fn inserted_text(&self) -> &str {
        match &self.kind {
            EditKind::Insert { text } => text,
            EditKind::Delete { .. } => "",
            EditKind::Replace { inserted_text, .. } => inserted_text,
        }
    }

    /// The range this operation replaces, in the text before it is applied.
    pub fn old_range(&self) -> TextRange {
        self.offset..self.offset + utf16_len(self.removed_text())
    }

    /// The range of the inserted text, in the text after the operation is applied.
    pub fn new_range(&self) -> TextRange {
        self.offset..self.offset + utf16_len(self.inserted_text())
    }

    pub fn expected_post_len(&self) -> usize {
        self.expected_prior_len - utf16_len(self.removed_text()) + utf16_len(self.inserted_text())
    }

    /// Whether applying the operation leaves the text unchanged.
    pub fn is_noop(&self) -> bool {
        self.removed_text() == self.inserted_text()
    }

    /// Returns the operation that undoes this one once it has been applied.
    pub fn invert(&self) -> Self {
        let kind = match &self.kind {
            EditKind::Insert { text } => EditKind::Delete { text: text.clone() },
            EditKind::Delete { text } => EditKind::Insert { text: text.clone() },
            EditKind::Replace {
                removed_text,
                inserted_text,
            } => EditKind::Replace {
                removed_text: inserted_text.clone(),
                inserted_text: removed_text.clone(),
            },
        };
        Self {
            kind,
            offset: self.offset,
            expected_prior_len: self.expected_post_len(),
            deduce: self.deduce,
        }
    }

    #[track_caller]
    pub(crate) fn apply(&self, rope: &Rope) -> Result<Rope, EditError> {
        let actual = rope.len();
        if self.expected_prior_len != actual {
            log::debug!(
                "rejecting stale edit at {}: expected length {}, found {}",
                self.offset,
                self.expected_prior_len,
                actual
            );
            return Err(EditError::StaleOperation {
                expected: self.expected_prior_len,
                actual,
            });
        }

        let range = self.old_range();
        assert!(
            range.end <= actual,
            "edit range {range:?} is out of range for a text of length {actual}"
        );
        if self.is_noop() {
            return Ok(rope.clone());
        }
        log::debug!(
            "replacing {:?} with {:?}",
            range,
            truncate_and_trailoff(self.inserted_text(), 32)
        );
        Ok(rope.splice(range, self.inserted_text()))
    }
}

fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(a, b)| a == b)
        .map(|(ch, _)| ch.len_utf8())
        .sum()
}

fn common_suffix_len(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(a, b)| a == b)
        .map(|(ch, _)| ch.len_utf8())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_replace_without_deduce_keeps_full_span() {
        let operation = EditOperation::replace_at(2, "abcd", "abXd", 10, false);
        assert_eq!(operation.old_range(), 2..6);
        assert_eq!(operation.removed_text(), "abcd");
        assert_eq!(operation.inserted_text(), "abXd");
    }

    #[test]
    fn test_deduce_narrows_to_changed_span() {
        let operation = EditOperation::replace_at(2, "abcd", "abXd", 10, true);
        assert_eq!(
            operation.kind,
            EditKind::Replace {
                removed_text: "c".into(),
                inserted_text: "X".into(),
            }
        );
        assert_eq!(operation.offset, 4);
        assert_eq!(operation.expected_prior_len, 10);

        let operation = EditOperation::replace_at(0, "hello", "hello, world", 5, true);
        assert_eq!(
            operation.kind,
            EditKind::Insert {
                text: ", world".into()
            }
        );
        assert_eq!(operation.offset, 5);

        let operation = EditOperation::replace_at(0, "hello, world", "world", 12, true);
        assert_eq!(
            operation.kind,
            EditKind::Delete {
                text: "hello, ".into()
            }
        );
        assert_eq!(operation.offset, 0);
    }

    #[test]
    fn test_deduce_with_repeated_characters() {
        // The prefix is trimmed first, so the suffix can never overlap it.
        let operation = EditOperation::replace_at(0, "aa", "aaa", 2, true);
        assert_eq!(operation.kind, EditKind::Insert { text: "a".into() });
        assert_eq!(operation.offset, 2);

        let operation = EditOperation::replace_at(0, "aaa", "a", 3, true);
        assert_eq!(operation.kind, EditKind::Delete { text: "aa".into() });
        assert_eq!(operation.offset, 1);
    }

    #[test]
    fn test_deduce_counts_utf16_offsets() {
        let operation = EditOperation::replace_at(1, "𝄞éa", "𝄞éb", 4, true);
        assert_eq!(operation.offset, 4);
        assert_eq!(operation.old_range(), 4..5);
    }

    #[test]
    fn test_deduce_identical_texts_is_noop() {
        let operation = EditOperation::replace_at(3, "same", "same", 7, true);
        assert!(operation.is_noop());
        assert_eq!(operation.old_range(), 7..7);
    }

    #[test]
    fn test_invert() {
        let operation = EditOperation::replace_at(1, "bc", "XYZ", 4, false);
        assert_eq!(operation.expected_post_len(), 5);
        let inverse = operation.invert();
        assert_eq!(inverse.removed_text(), "XYZ");
        assert_eq!(inverse.inserted_text(), "bc");
        assert_eq!(inverse.expected_prior_len, 5);
        assert_eq!(inverse.invert(), operation);

        let insertion = EditOperation::insert_at(0, "ab", 0);
        assert_eq!(
            insertion.invert().kind,
            EditKind::Delete { text: "ab".into() }
        );
    }

    #[test]
    fn test_serialization() {
        let operation = EditOperation::insert_at(3, "x", 5);
        let json = serde_json::to_value(&operation).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": { "insert": { "text": "x" } },
                "offset": 3,
                "expected_prior_len": 5,
                "deduce": false,
            })
        );
        let deserialized: EditOperation = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, operation);
    }
}

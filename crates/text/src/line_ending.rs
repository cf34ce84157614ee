use regex::Regex;
use std::{borrow::Cow, cmp, sync::LazyLock};

static LINE_SEPARATORS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n?").expect("Failed to create LINE_SEPARATORS_REGEX"));

/// The line separator a document used before it was normalized to `\n`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineEnding {
    #[default]
    Unix,
    Windows,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Unix => "\n",
            LineEnding::Windows => "\r\n",
        }
    }

    /// Guesses the line ending from the first line separator in the leading part of `text`.
    pub fn detect(text: &str) -> Self {
        let mut max_ix = cmp::min(text.len(), 1000);
        while !text.is_char_boundary(max_ix) {
            max_ix -= 1;
        }

        if let Some(ix) = text[..max_ix].find(['\n']) {
            if ix > 0 && text.as_bytes()[ix - 1] == b'\r' {
                Self::Windows
            } else {
                Self::Unix
            }
        } else {
            Self::default()
        }
    }

    /// Rewrites `\r\n` and lone `\r` separators as `\n`.
    pub fn normalize(text: &mut String) {
        if let Cow::Owned(replaced) = LINE_SEPARATORS_REGEX.replace_all(text, "\n") {
            *text = replaced;
        }
    }

    pub fn normalize_cow(text: Cow<str>) -> Cow<str> {
        if let Cow::Owned(replaced) = LINE_SEPARATORS_REGEX.replace_all(&text, "\n") {
            replaced.into()
        } else {
            text
        }
    }

    /// Appends `text` to `output`, replacing each `\n` with this line ending.
    pub fn push_with_line_ending(&self, output: &mut String, text: &str) {
        match self {
            LineEnding::Unix => output.push_str(text),
            LineEnding::Windows => {
                let mut lines = text.split('\n');
                if let Some(first_line) = lines.next() {
                    output.push_str(first_line);
                }
                for line in lines {
                    output.push_str(self.as_str());
                    output.push_str(line);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(LineEnding::detect("a\nb\r\n"), LineEnding::Unix);
        assert_eq!(LineEnding::detect("a\r\nb\n"), LineEnding::Windows);
        assert_eq!(LineEnding::detect("no separators"), LineEnding::Unix);
        assert_eq!(LineEnding::detect(""), LineEnding::Unix);
    }

    #[test]
    fn test_normalize() {
        let mut text = String::from("a\r\nb\rc\n\r\nd");
        LineEnding::normalize(&mut text);
        assert_eq!(text, "a\nb\nc\n\nd");

        assert!(matches!(
            LineEnding::normalize_cow(Cow::Borrowed("a\nb")),
            Cow::Borrowed("a\nb")
        ));
        assert_eq!(LineEnding::normalize_cow(Cow::Borrowed("\r\r\n")), "\n\n");
    }

    #[test]
    fn test_push_with_line_ending() {
        let mut output = String::new();
        LineEnding::Windows.push_with_line_ending(&mut output, "a\nb\n");
        assert_eq!(output, "a\r\nb\r\n");

        let mut output = String::new();
        LineEnding::Unix.push_with_line_ending(&mut output, "a\nb\n");
        assert_eq!(output, "a\nb\n");
    }
}

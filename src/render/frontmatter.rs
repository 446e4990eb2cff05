//! YAML front matter stripping.
//!
//! A document may start with a `---` fenced YAML block. It is removed before
//! compilation; the host reads `title` from it for the page `<title>`.

use serde::Deserialize;

/// Metadata read from front matter. Unknown keys are ignored.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub title: Option<String>,
}

impl PageMeta {
    /// Parse a raw YAML block. Invalid YAML yields default metadata.
    pub fn parse(block: &str) -> Self {
        if block.trim().is_empty() {
            return Self::default();
        }
        serde_yaml::from_str::<Option<Self>>(block)
            .ok()
            .flatten()
            .unwrap_or_default()
    }
}

/// Split `input` into (front matter block, body).
///
/// Tolerates a BOM and leading blank lines. An unterminated fence is not
/// front matter, and the input is returned unchanged as the body.
pub fn strip(input: &str) -> (Option<&str>, &str) {
    let text = input.strip_prefix('\u{feff}').unwrap_or(input);

    let mut lines = LineIter::new(text, 0);
    let Some((first, _, block_start)) = lines.find(|(line, _, _)| !line.trim().is_empty()) else {
        return (None, input);
    };
    if !is_fence(first) {
        return (None, input);
    }

    for (line, start, next) in lines {
        if is_fence(line) {
            let block = text[block_start..start].trim_end_matches(['\r', '\n']);
            return (Some(block), &text[next..]);
        }
    }
    (None, input)
}

fn is_fence(line: &str) -> bool {
    line.trim_end() == "---"
}

/// Yields `(line without terminator, line start, next line start)`.
struct LineIter<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> LineIter<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }
}

impl<'a> Iterator for LineIter<'a> {
    type Item = (&'a str, usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.text.len() {
            return None;
        }
        let start = self.pos;
        let rest = &self.text[start..];
        let (line, next) = match rest.find('\n') {
            Some(i) => (&rest[..i], start + i + 1),
            None => (rest, self.text.len()),
        };
        self.pos = next;
        Some((line.strip_suffix('\r').unwrap_or(line), start, next))
    }
}

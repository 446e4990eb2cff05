//! Scanner for JSX component elements embedded in Markdown.
//!
//! Only capitalised tags are components; lowercase tags are left to the
//! Markdown renderer as raw HTML. Offsets are byte offsets into the full
//! document body so errors can report positions.

use std::ops::Range;

use super::error::{CompileError, Position};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    /// `name="text"` or `name='text'`
    Str(String),
    /// `name={expression}`, expression text without the braces
    Expr(String),
    /// bare `name`
    Bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prop {
    pub name: String,
    pub value: PropValue,
}

/// One parsed component element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub props: Vec<Prop>,
    /// Byte range of the children, `None` for self-closing tags.
    pub children: Option<Range<usize>>,
    /// Byte range of the whole element.
    pub span: Range<usize>,
}

/// `<` followed by an uppercase letter.
pub fn is_component_start(src: &str, pos: usize) -> bool {
    let bytes = src.as_bytes();
    bytes.get(pos) == Some(&b'<') && bytes.get(pos + 1).is_some_and(u8::is_ascii_uppercase)
}

/// End offset of a `{/* ... */}` comment starting at `pos`.
pub fn comment_end(src: &str, pos: usize) -> Option<usize> {
    let rest = src.get(pos..)?;
    if !rest.starts_with("{/*") {
        return None;
    }
    rest[3..].find("*/").and_then(|close| {
        let after = pos + 3 + close + 2;
        let tail = &src[after..];
        let trimmed = tail.trim_start();
        trimmed
            .starts_with('}')
            .then(|| after + (tail.len() - trimmed.len()) + 1)
    })
}

pub struct Scanner<'a> {
    src: &'a str,
    /// Sorted byte ranges of inline code and code blocks.
    code: &'a [Range<usize>],
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str, code: &'a [Range<usize>]) -> Self {
        Self { src, code }
    }

    /// End of the code range containing `pos`, if any.
    pub fn code_end(&self, pos: usize) -> Option<usize> {
        self.code
            .iter()
            .find(|r| r.contains(&pos))
            .map(|r| r.end)
    }

    fn error(&self, message: impl Into<String>, at: usize) -> CompileError {
        CompileError::new(message, Some(Position::at(self.src, at)))
    }

    /// Parse the component element starting at `start` (which must be `<`).
    pub fn parse_element(&self, start: usize) -> Result<Element, CompileError> {
        let src = self.src;
        let mut i = start + 1;
        let name_end = take_while(src, i, |c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        let name = src[i..name_end].to_string();
        i = name_end;

        let mut props = Vec::new();
        loop {
            i = skip_ws(src, i);
            let rest = &src[i..];
            if rest.is_empty() {
                return Err(self.error(format!("unclosed tag <{name}>"), start));
            }
            if rest.starts_with("/>") {
                return Ok(Element {
                    name,
                    props,
                    children: None,
                    span: start..i + 2,
                });
            }
            if rest.starts_with('>') {
                break;
            }

            let attr_end = take_while(src, i, |c| {
                c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':')
            });
            if attr_end == i {
                let c = rest.chars().next().unwrap_or(' ');
                return Err(self.error(format!("unexpected character `{c}` in <{name}>"), i));
            }
            let attr = src[i..attr_end].to_string();
            i = skip_ws(src, attr_end);

            let value = if src[i..].starts_with('=') {
                i = skip_ws(src, i + 1);
                let (value, next) = self.parse_value(&name, &attr, i)?;
                i = next;
                value
            } else {
                PropValue::Bool
            };
            props.push(Prop { name: attr, value });
        }

        // Opening tag closed with `>`
        let children_start = i + 1;
        let (children, end) = self.parse_children(&name, start, children_start)?;
        Ok(Element {
            name,
            props,
            children: Some(children),
            span: start..end,
        })
    }

    fn parse_value(
        &self,
        tag: &str,
        attr: &str,
        at: usize,
    ) -> Result<(PropValue, usize), CompileError> {
        let src = self.src;
        match src[at..].chars().next() {
            Some(q @ ('"' | '\'')) => {
                let body = at + 1;
                let close = src[body..]
                    .find(q)
                    .ok_or_else(|| self.error(format!("unterminated string for `{attr}`"), at))?;
                Ok((
                    PropValue::Str(src[body..body + close].to_string()),
                    body + close + 1,
                ))
            }
            Some('{') => {
                let end = balanced_brace_end(src, at)
                    .ok_or_else(|| self.error(format!("unterminated expression for `{attr}`"), at))?;
                let expr = src[at + 1..end - 1].trim().to_string();
                Ok((PropValue::Expr(expr), end))
            }
            _ => Err(self.error(
                format!("expected a value for `{attr}` in <{tag}>"),
                at,
            )),
        }
    }

    /// Find the matching `</name>`, skipping nested components and code.
    fn parse_children(
        &self,
        name: &str,
        open: usize,
        from: usize,
    ) -> Result<(Range<usize>, usize), CompileError> {
        let src = self.src;
        let mut i = from;
        while i < src.len() {
            if let Some(end) = self.code_end(i) {
                i = end;
                continue;
            }
            if let Some(end) = comment_end(src, i) {
                i = end;
                continue;
            }
            let rest = &src[i..];
            if rest.starts_with("</") {
                let name_start = i + 2;
                let name_end =
                    take_while(src, name_start, |c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
                let closing = &src[name_start..name_end];
                if closing == name {
                    let gt = skip_ws(src, name_end);
                    if !src[gt..].starts_with('>') {
                        return Err(self.error(format!("malformed closing tag </{name}>"), i));
                    }
                    return Ok((from..i, gt + 1));
                }
                if closing.starts_with(|c: char| c.is_ascii_uppercase()) {
                    return Err(self.error(
                        format!("expected </{name}>, found </{closing}>"),
                        i,
                    ));
                }
            } else if is_component_start(src, i) {
                i = self.parse_element(i)?.span.end;
                continue;
            }
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
        Err(self.error(format!("unclosed <{name}>"), open))
    }
}

fn take_while(src: &str, from: usize, pred: impl Fn(char) -> bool) -> usize {
    src[from..]
        .char_indices()
        .find(|&(_, c)| !pred(c))
        .map_or(src.len(), |(i, _)| from + i)
}

fn skip_ws(src: &str, from: usize) -> usize {
    take_while(src, from, char::is_whitespace)
}

/// Offset just past the `}` matching the `{` at `open`, skipping string literals.
fn balanced_brace_end(src: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in src[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<Element, CompileError> {
        Scanner::new(src, &[]).parse_element(0)
    }

    #[test]
    fn self_closing_with_props() {
        let el = parse(r#"<Button label="Go" count={3} disabled data={{"a": "}"}} />"#).unwrap();
        assert_eq!(el.name, "Button");
        assert_eq!(el.children, None);
        assert_eq!(
            el.props,
            vec![
                Prop { name: "label".into(), value: PropValue::Str("Go".into()) },
                Prop { name: "count".into(), value: PropValue::Expr("3".into()) },
                Prop { name: "disabled".into(), value: PropValue::Bool },
                Prop { name: "data".into(), value: PropValue::Expr(r#"{"a": "}"}"#.into()) },
            ]
        );
    }

    #[test]
    fn paired_with_nested_same_name() {
        let src = "<Box>a<Box>b</Box>c</Box> tail";
        let el = parse(src).unwrap();
        let children = el.children.clone().unwrap();
        assert_eq!(&src[children], "a<Box>b</Box>c");
        assert_eq!(&src[el.span], "<Box>a<Box>b</Box>c</Box>");
    }

    #[test]
    fn lowercase_html_inside_children() {
        let src = "<Card><div>hi</div></Card>";
        let el = parse(src).unwrap();
        assert_eq!(&src[el.children.unwrap()], "<div>hi</div>");
    }

    #[test]
    fn member_expression_name() {
        assert_eq!(parse("<UI.Tabs />").unwrap().name, "UI.Tabs");
    }

    #[test]
    fn unclosed_element_reports_open_position() {
        let err = parse("<Note>\ntext").unwrap_err();
        assert!(err.message.contains("unclosed <Note>"));
        assert_eq!(err.position, Some(Position { line: 1, column: 1 }));
    }

    #[test]
    fn mismatched_closing_tag() {
        let err = parse("<A>\n  </B>").unwrap_err();
        assert!(err.message.contains("expected </A>"));
        assert_eq!(err.position, Some(Position { line: 2, column: 3 }));
    }

    #[test]
    fn unterminated_expression() {
        let err = parse("<A x={1 />").unwrap_err();
        assert!(err.message.contains("unterminated expression"));
    }

    #[test]
    fn missing_attribute_value() {
        assert!(parse("<A x= />").is_err());
    }

    #[test]
    fn closing_tag_inside_code_is_ignored() {
        let src = "<A>`</A>`</A>";
        let code = [3..9];
        let el = Scanner::new(src, &code).parse_element(0).unwrap();
        assert_eq!(el.span, 0..src.len());
    }

    #[test]
    fn detects_comments() {
        let src = "x {/* hidden */} y";
        assert_eq!(comment_end(src, 2), Some(16));
        assert_eq!(comment_end(src, 0), None);
        assert_eq!(comment_end("{/* open", 0), None);
    }

    #[test]
    fn component_start() {
        assert!(is_component_start("<Button", 0));
        assert!(!is_component_start("<div", 0));
        assert!(!is_component_start("< B", 0));
    }
}

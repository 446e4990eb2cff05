//! HTML escaping for text nodes and attribute values.

use std::borrow::Cow;

/// Escape `<`, `>` and `&` for use inside a text node.
pub fn escape(s: &str) -> Cow<'_, str> {
    replace_all(s, |c| match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        _ => None,
    })
}

/// Escape a value placed inside a quoted attribute.
///
/// Quotes are escaped as well, so serialized JSON props survive intact.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    replace_all(s, |c| match c {
        '"' => Some("&quot;"),
        '\'' => Some("&#39;"),
        other => match other {
            '<' => Some("&lt;"),
            '>' => Some("&gt;"),
            '&' => Some("&amp;"),
            _ => None,
        },
    })
}

/// Borrows when nothing needs replacing.
fn replace_all(s: &str, entity: impl Fn(char) -> Option<&'static str>) -> Cow<'_, str> {
    let Some(first) = s.find(|c| entity(c).is_some()) else {
        return Cow::Borrowed(s);
    };

    let mut out = String::with_capacity(s.len() + 16);
    out.push_str(&s[..first]);
    for c in s[first..].chars() {
        match entity(c) {
            Some(e) => out.push_str(e),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_keeps_quotes() {
        assert_eq!(escape("<b> & \"q\""), "&lt;b&gt; &amp; \"q\"");
        assert!(matches!(escape("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn attribute_escapes_json_props() {
        assert_eq!(
            escape_attr(r#"{"label":"it's <ok>"}"#),
            "{&quot;label&quot;:&quot;it&#39;s &lt;ok&gt;&quot;}"
        );
    }
}

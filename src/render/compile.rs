//! MDX → compiled unit.
//!
//! Compilation is purely syntactic: ESM `import` statements are collected,
//! component elements become slots in a sequence of pre-rendered HTML
//! segments, and everything else goes through pulldown-cmark. Nothing is
//! resolved or executed here; that happens in [`super::eval`].

use std::ops::Range;
use std::path::PathBuf;
use std::sync::OnceLock;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};
use regex::Regex;

use super::error::{CompileError, Position};
use super::jsx::{self, Prop, Scanner};

/// Options handed to a [`ContentCompiler`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Record source positions on component calls for diagnostics.
    pub development: bool,
    /// Directory relative imports are resolved against.
    pub base_dir: Option<PathBuf>,
}

/// What an import statement binds locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub local: String,
    /// `default`, a named export, or `*` for a namespace import.
    pub export: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub specifier: String,
    pub bindings: Vec<Binding>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Markup(String),
    /// Index into [`Fragment::components`].
    Slot(usize),
}

/// Rendered markup interleaved with component call sites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub segments: Vec<Segment>,
    pub components: Vec<ComponentCall>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentCall {
    pub name: String,
    pub props: Vec<Prop>,
    pub children: Option<Fragment>,
    pub position: Position,
}

/// Output of compilation: an evaluable program for [`super::eval::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    pub imports: Vec<Import>,
    pub body: Fragment,
    pub options: CompileOptions,
}

/// Content compiler boundary.
pub trait ContentCompiler: Send + Sync {
    fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompiledUnit, CompileError>;
}

/// Default compiler: Markdown via pulldown-cmark plus a JSX component scanner.
#[derive(Debug, Clone)]
pub struct MdxCompiler {
    markdown: Options,
}

impl Default for MdxCompiler {
    fn default() -> Self {
        let mut markdown = Options::empty();
        markdown.insert(Options::ENABLE_TABLES);
        markdown.insert(Options::ENABLE_FOOTNOTES);
        markdown.insert(Options::ENABLE_STRIKETHROUGH);
        markdown.insert(Options::ENABLE_TASKLISTS);
        markdown.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        Self { markdown }
    }
}

impl ContentCompiler for MdxCompiler {
    fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompiledUnit, CompileError> {
        let code = code_ranges(source, self.markdown);
        let (text, imports) = extract_esm(source, &code)?;

        let scanner = Scanner::new(&text, &code);
        let body = self.fragment(&scanner, &text, 0..text.len(), false)?;

        Ok(CompiledUnit {
            imports,
            body,
            options: options.clone(),
        })
    }
}

/// Sentinel marking a component site inside Markdown before rendering.
const SLOT_PREFIX: &str = "<!--mdxr:";
const SLOT_SUFFIX: &str = "-->";

impl MdxCompiler {
    /// Compile `range` of `text` into a fragment.
    ///
    /// `inline` children (no newline) drop the paragraph wrapper Markdown adds.
    fn fragment(
        &self,
        scanner: &Scanner<'_>,
        text: &str,
        range: Range<usize>,
        inline: bool,
    ) -> Result<Fragment, CompileError> {
        let mut markdown = String::with_capacity(range.len());
        let mut components = Vec::new();

        let mut i = range.start;
        let mut copied = range.start;
        while i < range.end {
            if let Some(end) = scanner.code_end(i) {
                i = end.min(range.end);
                continue;
            }
            if let Some(end) = jsx::comment_end(text, i).filter(|&e| e <= range.end) {
                markdown.push_str(&text[copied..i]);
                i = end;
                copied = end;
                continue;
            }
            if jsx::is_component_start(text, i) {
                let element = scanner.parse_element(i)?;
                let children = match &element.children {
                    Some(r) => Some(self.fragment(
                        scanner,
                        text,
                        r.clone(),
                        !text[r.clone()].contains('\n'),
                    )?),
                    None => None,
                };

                markdown.push_str(&text[copied..i]);
                markdown.push_str(&format!("{SLOT_PREFIX}{}{SLOT_SUFFIX}", components.len()));
                components.push(ComponentCall {
                    name: element.name,
                    props: element.props,
                    children,
                    position: Position::at(text, i),
                });

                i = element.span.end;
                copied = i;
                continue;
            }
            i += text[i..].chars().next().map_or(1, char::len_utf8);
        }
        markdown.push_str(&text[copied..range.end]);

        let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut rendered, Parser::new_ext(&markdown, self.markdown));
        if inline {
            rendered = unwrap_paragraph(rendered);
        }

        Ok(Fragment {
            segments: split_slots(&rendered, components.len()),
            components,
        })
    }
}

/// Byte ranges of inline code spans and code blocks.
fn code_ranges(source: &str, options: Options) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut block_start = None;
    for (event, range) in Parser::new_ext(source, options).into_offset_iter() {
        match event {
            Event::Code(_) => ranges.push(range),
            Event::Start(Tag::CodeBlock(_)) => block_start = Some(range.start),
            Event::End(TagEnd::CodeBlock) => {
                if let Some(start) = block_start.take() {
                    ranges.push(start..range.end);
                }
            }
            _ => {}
        }
    }
    ranges.sort_by_key(|r| r.start);
    ranges
}

fn import_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"import[ \t\r\n]+(?:([A-Za-z0-9_$ \t\r\n{},*]+?)[ \t\r\n]+from[ \t\r\n]*)?["']([^"'\r\n]+)["'][ \t]*;?"#,
        )
        .ok()
    })
    .as_ref()
}

/// Remove top-level ESM blocks, returning the blanked text and the imports.
///
/// An ESM block starts at a line beginning with `import ` or `export ` and
/// runs until the next blank line. Blanking keeps every byte offset, and
/// thus every error position, unchanged.
fn extract_esm(
    source: &str,
    code: &[Range<usize>],
) -> Result<(String, Vec<Import>), CompileError> {
    let mut text = source.as_bytes().to_vec();
    let mut imports = Vec::new();

    let mut block: Option<usize> = None;
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();

    for (n, &start) in line_starts.iter().enumerate() {
        let end = line_starts.get(n + 1).copied().unwrap_or(source.len());
        let line = &source[start..end];
        let in_code = code.iter().any(|r| r.contains(&start));

        match block {
            Some(block_start) if line.trim().is_empty() => {
                parse_esm_block(source, block_start..start, &mut imports)?;
                blank(&mut text, block_start..start);
                block = None;
            }
            Some(_) => {}
            None if !in_code && (line.starts_with("import ") || line.starts_with("export ")) => {
                block = Some(start);
            }
            None => {}
        }
    }
    if let Some(block_start) = block {
        parse_esm_block(source, block_start..source.len(), &mut imports)?;
        blank(&mut text, block_start..source.len());
    }

    let text = String::from_utf8(text)
        .map_err(|_| CompileError::new("invalid UTF-8 after removing ESM", None))?;
    Ok((text, imports))
}

fn blank(text: &mut [u8], range: Range<usize>) {
    for b in &mut text[range] {
        if *b != b'\n' && *b != b'\r' {
            *b = b' ';
        }
    }
}

fn parse_esm_block(
    source: &str,
    range: Range<usize>,
    imports: &mut Vec<Import>,
) -> Result<(), CompileError> {
    let block = &source[range.clone()];
    let Some(re) = import_pattern() else {
        return Err(CompileError::new("import pattern failed to compile", None));
    };

    let mut rest = block.as_bytes().to_vec();
    for caps in re.captures_iter(block) {
        let (Some(whole), Some(spec)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let at = range.start + whole.start();
        let position = Position::at(source, at);
        let bindings = match caps.get(1) {
            Some(clause) => parse_clause(clause.as_str())
                .map_err(|msg| CompileError::new(msg, Some(position)))?,
            None => Vec::new(),
        };
        imports.push(Import {
            specifier: spec.as_str().to_string(),
            bindings,
            position,
        });
        blank(&mut rest, whole.range());
    }

    // Whatever the imports did not cover must be whole export statements
    match stray_line(&String::from_utf8_lossy(&rest)) {
        Some((offset, msg)) => Err(CompileError::new(
            msg,
            Some(Position::at(source, range.start + offset)),
        )),
        None => Ok(()),
    }
}

/// First line that is neither blank, an `export`, nor inside an open
/// bracket of the statement before it.
fn stray_line(text: &str) -> Option<(usize, &'static str)> {
    let mut depth = 0;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if depth == 0 && !trimmed.trim_end().is_empty() {
            let at = offset + (line.len() - trimmed.len());
            if trimmed.starts_with("import") {
                return Some((at, "could not parse import statement"));
            }
            if !trimmed.starts_with("export") {
                return Some((
                    at,
                    "expected `import` or `export`; put a blank line between ESM and Markdown",
                ));
            }
        }
        depth = nesting(line, depth);
        offset += line.len();
    }
    None
}

/// Bracket depth after `line`, skipping string literals.
fn nesting(line: &str, mut depth: usize) -> usize {
    let mut quote = None;
    let mut escaped = false;
    for c in line.chars() {
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
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

/// Parse `Default, { a, b as c }` or `* as ns`.
fn parse_clause(clause: &str) -> Result<Vec<Binding>, String> {
    let mut bindings = Vec::new();
    let mut rest = clause.trim();

    if !rest.starts_with('{') && !rest.starts_with('*') {
        let (default, tail) = rest.split_once(',').unwrap_or((rest, ""));
        let default = default.trim();
        if !is_ident(default) {
            return Err(format!("invalid default import `{default}`"));
        }
        bindings.push(Binding {
            local: default.to_string(),
            export: "default".to_string(),
        });
        rest = tail.trim();
    }

    if rest.is_empty() {
        return Ok(bindings);
    }

    if let Some(ns) = rest.strip_prefix('*') {
        let local = ns.trim().strip_prefix("as").map(str::trim).unwrap_or_default();
        if !is_ident(local) {
            return Err(format!("invalid namespace import `{rest}`"));
        }
        bindings.push(Binding {
            local: local.to_string(),
            export: "*".to_string(),
        });
        return Ok(bindings);
    }

    let Some(inner) = rest.strip_prefix('{').and_then(|r| r.strip_suffix('}')) else {
        return Err(format!("invalid import clause `{clause}`"));
    };
    for spec in inner.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (export, local) = match spec.split_once(" as ") {
            Some((e, l)) => (e.trim(), l.trim()),
            None => (spec, spec),
        };
        if !is_ident(export) || !is_ident(local) {
            return Err(format!("invalid import specifier `{spec}`"));
        }
        bindings.push(Binding {
            local: local.to_string(),
            export: export.to_string(),
        });
    }
    Ok(bindings)
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn unwrap_paragraph(html: String) -> String {
    let trimmed = html.trim_end();
    match trimmed
        .strip_prefix("<p>")
        .and_then(|s| s.strip_suffix("</p>"))
    {
        Some(inner) if !inner.contains("<p>") => inner.to_string(),
        _ => html,
    }
}

/// Split rendered HTML at slot sentinels.
fn split_slots(html: &str, count: usize) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find(SLOT_PREFIX) {
        let after = &rest[start + SLOT_PREFIX.len()..];
        let Some(end) = after.find(SLOT_SUFFIX) else {
            break;
        };
        let Ok(index) = after[..end].parse::<usize>() else {
            // Not ours; keep scanning past it
            push_markup(&mut segments, &rest[..start + SLOT_PREFIX.len()]);
            rest = after;
            continue;
        };
        if index >= count {
            push_markup(&mut segments, &rest[..start + SLOT_PREFIX.len()]);
            rest = after;
            continue;
        }
        push_markup(&mut segments, &rest[..start]);
        segments.push(Segment::Slot(index));
        rest = &after[end + SLOT_SUFFIX.len()..];
    }
    push_markup(&mut segments, rest);
    segments
}

fn push_markup(segments: &mut Vec<Segment>, s: &str) {
    if s.is_empty() {
        return;
    }
    if let Some(Segment::Markup(last)) = segments.last_mut() {
        last.push_str(s);
    } else {
        segments.push(Segment::Markup(s.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::jsx::PropValue;

    fn compile(src: &str) -> CompiledUnit {
        MdxCompiler::default()
            .compile(src, &CompileOptions::default())
            .unwrap()
    }

    fn markup(unit: &Fragment) -> String {
        unit.segments
            .iter()
            .map(|s| match s {
                Segment::Markup(m) => m.clone(),
                Segment::Slot(i) => format!("[{i}]"),
            })
            .collect()
    }

    #[test]
    fn plain_markdown() {
        let unit = compile("# Hi\n\nSome *text*.");
        assert!(unit.imports.is_empty());
        assert!(unit.body.components.is_empty());
        let html = markup(&unit.body);
        assert!(html.contains("<h1>Hi</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn imports_and_block_component() {
        let unit = compile(
            "import Button from './Button.jsx'\n\n# Title\n\n<Button label=\"Go\" />\n\nAfter.",
        );
        assert_eq!(unit.imports.len(), 1);
        assert_eq!(unit.imports[0].specifier, "./Button.jsx");
        assert_eq!(
            unit.imports[0].bindings,
            vec![Binding { local: "Button".into(), export: "default".into() }]
        );
        assert_eq!(unit.body.components.len(), 1);
        assert_eq!(unit.body.components[0].name, "Button");

        let html = markup(&unit.body);
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("[0]"));
        assert!(html.contains("<p>After.</p>"));
        assert!(!html.contains("import"));
    }

    #[test]
    fn inline_component_keeps_paragraph() {
        let unit = compile("Click <Button /> now.");
        assert_eq!(markup(&unit.body).trim(), "<p>Click [0] now.</p>");
    }

    #[test]
    fn inline_children_drop_paragraph() {
        let unit = compile("<Button>Press **me**</Button>");
        let children = unit.body.components[0].children.as_ref().unwrap();
        assert_eq!(markup(children), "Press <strong>me</strong>");
    }

    #[test]
    fn nested_components_compile_recursively() {
        let unit = compile("<Tabs>\n\n<Tab title=\"One\" />\n\n</Tabs>");
        let tabs = &unit.body.components[0];
        let children = tabs.children.as_ref().unwrap();
        assert_eq!(children.components.len(), 1);
        assert_eq!(children.components[0].name, "Tab");
        assert_eq!(
            children.components[0].props[0].value,
            PropValue::Str("One".into())
        );
    }

    #[test]
    fn component_in_code_is_literal() {
        let unit = compile("```\n<Button />\n```\n\nand `<Chart />`");
        assert!(unit.body.components.is_empty());
        let html = markup(&unit.body);
        assert!(html.contains("&lt;Button /&gt;"));
        assert!(html.contains("&lt;Chart /&gt;"));
    }

    #[test]
    fn import_in_code_is_literal() {
        let unit = compile("```js\nimport X from './x.js'\n```");
        assert!(unit.imports.is_empty());
    }

    #[test]
    fn comments_are_removed() {
        let unit = compile("Hello {/* secret */} world");
        assert_eq!(markup(&unit.body).trim(), "<p>Hello  world</p>");
    }

    #[test]
    fn exports_are_stripped() {
        let unit = compile("export const meta = { a: 1 }\n\n# Body");
        assert!(unit.imports.is_empty());
        assert!(!markup(&unit.body).contains("export"));
    }

    #[test]
    fn import_clauses() {
        assert_eq!(
            parse_clause("D, { a, b as c }").unwrap(),
            vec![
                Binding { local: "D".into(), export: "default".into() },
                Binding { local: "a".into(), export: "a".into() },
                Binding { local: "c".into(), export: "b".into() },
            ]
        );
        assert_eq!(
            parse_clause("* as UI").unwrap(),
            vec![Binding { local: "UI".into(), export: "*".into() }]
        );
        assert!(parse_clause("{ 1bad }").is_err());
    }

    #[test]
    fn multiline_import_block() {
        let unit = compile("import {\n  Tabs,\n  Tab\n} from '../ui/index.js'\nimport './style.css'\n\ntext");
        assert_eq!(unit.imports.len(), 2);
        assert_eq!(unit.imports[0].bindings.len(), 2);
        assert_eq!(unit.imports[1].specifier, "./style.css");
        assert!(unit.imports[1].bindings.is_empty());
    }

    #[test]
    fn malformed_import_has_position() {
        let err = MdxCompiler::default()
            .compile("# T\n\nimport oops\n", &CompileOptions::default())
            .unwrap_err();
        assert_eq!(err.position, Some(Position { line: 3, column: 1 }));
    }

    #[test]
    fn markdown_glued_to_import_is_error() {
        let err = MdxCompiler::default()
            .compile(
                "import Button from './Button.jsx'\n# Title\n\nbody",
                &CompileOptions::default(),
            )
            .unwrap_err();
        assert_eq!(err.position, Some(Position { line: 2, column: 1 }));
    }

    #[test]
    fn multiline_export_is_one_statement() {
        let unit = compile("export const meta = {\n  title: 'a } b',\n}\n\n# Body");
        assert!(markup(&unit.body).contains("<h1>Body</h1>"));
    }

    #[test]
    fn malformed_jsx_has_position() {
        let err = MdxCompiler::default()
            .compile("line\n\n<Card>\nno close", &CompileOptions::default())
            .unwrap_err();
        assert_eq!(err.position, Some(Position { line: 3, column: 1 }));
    }

    #[test]
    fn error_positions_survive_import_removal() {
        let err = MdxCompiler::default()
            .compile("import A from './a.js'\n\n<A x= />", &CompileOptions::default())
            .unwrap_err();
        assert_eq!(err.position.map(|p| p.line), Some(3));
    }

    #[test]
    fn foreign_comments_are_kept() {
        let segments = split_slots("<!--mdxr:x--><p>a</p><!--mdxr:0-->", 1);
        assert_eq!(
            segments,
            vec![Segment::Markup("<!--mdxr:x--><p>a</p>".into()), Segment::Slot(0)]
        );
    }
}

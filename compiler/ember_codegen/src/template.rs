//! Declarative text templates: the sole emission mechanism.
//!
//! A [`Template`] is parsed once from its source text into a segment
//! tree; a [`TemplateNode`] binds that template to field values. The
//! mini-language:
//!
//! - `{field}` — substitution
//! - `{field => sep => body}` — iterate a list field, render `body` per
//!   element (the element becomes the `it` field), join with `sep`
//! - `{#if cond}…{#elseif cond}…{#else}…{/if}` — conditionals over flag
//!   fields
//! - `{#statements}…{/statements}` — a side-channel block hoisted to the
//!   enclosing statement list instead of appearing at the expression's
//!   textual position
//!
//! Rendering is pure, depth-first, left-to-right and idempotent. All
//! dependency declarations and temporary reservations happen while a
//! node is *constructed* (in the resolvers); by the time `render` runs,
//! the node is plain data. Referencing a field the node never bound is a
//! resolver bug, surfaced as [`RenderError::UnboundField`] and treated
//! as fatal by the assembler.

use rustc_hash::FxHashMap;
use std::fmt;

/// One parsed piece of a template.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `{name}`
    Field(String),
    /// `{name => sep => body}`
    Iter {
        field: String,
        separator: String,
        body: Vec<Segment>,
    },
    /// `{#if a}…{#elseif b}…{#else}…{/if}` — conditions paired with
    /// bodies; the optional trailing pair has an empty condition.
    If {
        arms: Vec<(String, Vec<Segment>)>,
        otherwise: Option<Vec<Segment>>,
    },
    /// `{#statements}…{/statements}`
    Statements(Vec<Segment>),
}

/// A parse failure in template source. Templates are compile-time
/// constants written by resolver authors, so this is an internal defect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateParseError {
    pub message: String,
}

impl fmt::Display for TemplateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template parse error: {}", self.message)
    }
}

impl std::error::Error for TemplateParseError {}

/// A rendering failure: a template referenced a field its node never
/// bound. Always a resolver bug, never a user error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderError {
    UnboundField { field: String },
    /// An iteration or condition field was bound to the wrong shape.
    FieldShape { field: String, expected: &'static str },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnboundField { field } => {
                write!(f, "template referenced unbound field `{field}`")
            }
            RenderError::FieldShape { field, expected } => {
                write!(f, "template field `{field}` is not {expected}")
            }
        }
    }
}

impl std::error::Error for RenderError {}

/// A parsed template, reusable across any number of nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

/// A value bound to a template field.
#[derive(Clone, Debug)]
pub enum FieldValue {
    Text(String),
    Node(Box<TemplateNode>),
    List(Vec<TemplateNode>),
    Flag(bool),
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_owned())
    }
}

impl From<bool> for FieldValue {
    fn from(flag: bool) -> Self {
        FieldValue::Flag(flag)
    }
}

impl From<TemplateNode> for FieldValue {
    fn from(node: TemplateNode) -> Self {
        FieldValue::Node(Box::new(node))
    }
}

impl From<Vec<TemplateNode>> for FieldValue {
    fn from(nodes: Vec<TemplateNode>) -> Self {
        FieldValue::List(nodes)
    }
}

/// A template bound to its field values: plain data, ready to render.
#[derive(Clone, Debug)]
pub struct TemplateNode {
    template: Template,
    fields: FxHashMap<String, FieldValue>,
}

/// The result of rendering: inline text plus any statement lines hoisted
/// out of `{#statements}` blocks, in encounter order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub statements: Vec<String>,
}

impl Template {
    /// A single-literal template; cannot fail.
    pub fn literal(text: &str) -> Template {
        Template {
            segments: vec![Segment::Literal(text.to_owned())],
        }
    }

    /// Parse template source into a reusable segment tree.
    pub fn parse(source: &str) -> Result<Template, TemplateParseError> {
        let mut parser = Parser {
            chars: source.chars().collect(),
            pos: 0,
        };
        let segments = parser.parse_segments(&[])?;
        if parser.pos < parser.chars.len() {
            return Err(TemplateParseError {
                message: "unexpected closing tag".to_owned(),
            });
        }
        Ok(Template { segments })
    }

    /// Bind field values, producing a renderable node.
    pub fn bind(self, fields: Vec<(&str, FieldValue)>) -> TemplateNode {
        let mut map = FxHashMap::default();
        for (name, value) in fields {
            map.insert(name.to_owned(), value);
        }
        TemplateNode {
            template: self,
            fields: map,
        }
    }
}

impl TemplateNode {
    /// Render to text. Pure: the node is unchanged and repeated calls
    /// yield identical output.
    pub fn render(&self) -> Result<Rendered, RenderError> {
        let mut out = Rendered::default();
        render_segments(&self.template.segments, &self.fields, &mut out)?;
        Ok(out)
    }

    /// Names of the fields this node has bound (diagnostic helper).
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

fn render_segments(
    segments: &[Segment],
    fields: &FxHashMap<String, FieldValue>,
    out: &mut Rendered,
) -> Result<(), RenderError> {
    for segment in segments {
        match segment {
            Segment::Literal(text) => {
                out.text.push_str(text);
            }

            Segment::Field(name) => {
                let value = fields.get(name).ok_or_else(|| RenderError::UnboundField {
                    field: name.clone(),
                })?;
                match value {
                    FieldValue::Text(text) => {
                        push_reindented(out, text);
                    }
                    FieldValue::Node(node) => {
                        let nested = node.render()?;
                        out.statements.extend(nested.statements);
                        push_reindented(out, &nested.text);
                    }
                    FieldValue::List(nodes) => {
                        for node in nodes {
                            let nested = node.render()?;
                            out.statements.extend(nested.statements);
                            push_reindented(out, &nested.text);
                        }
                    }
                    FieldValue::Flag(flag) => {
                        out.text.push_str(if *flag { "1" } else { "0" });
                    }
                }
            }

            Segment::Iter {
                field,
                separator,
                body,
            } => {
                let value = fields.get(field).ok_or_else(|| RenderError::UnboundField {
                    field: field.clone(),
                })?;
                let FieldValue::List(nodes) = value else {
                    return Err(RenderError::FieldShape {
                        field: field.clone(),
                        expected: "a list",
                    });
                };
                for (idx, node) in nodes.iter().enumerate() {
                    if idx > 0 {
                        out.text.push_str(separator);
                    }
                    // The element's own fields are in scope for the body.
                    render_segments(body, &node.fields, out)?;
                }
            }

            Segment::If { arms, otherwise } => {
                let mut taken = false;
                for (cond, body) in arms {
                    let value = fields.get(cond).ok_or_else(|| RenderError::UnboundField {
                        field: cond.clone(),
                    })?;
                    if truthy(value) {
                        render_segments(body, fields, out)?;
                        taken = true;
                        break;
                    }
                }
                if !taken {
                    if let Some(body) = otherwise {
                        render_segments(body, fields, out)?;
                    }
                }
            }

            Segment::Statements(body) => {
                // Hoisted: rendered into the statement side channel, not
                // at the expression's textual position.
                let mut nested = Rendered::default();
                render_segments(body, fields, &mut nested)?;
                out.statements.extend(nested.statements);
                for line in nested.text.lines() {
                    let line = line.trim();
                    if !line.is_empty() {
                        out.statements.push(line.to_owned());
                    }
                }
            }
        }
    }
    Ok(())
}

/// Truthiness for `{#if}` conditions: flags decide directly; text is
/// truthy when non-empty; nodes and non-empty lists are truthy.
fn truthy(value: &FieldValue) -> bool {
    match value {
        FieldValue::Flag(flag) => *flag,
        FieldValue::Text(text) => !text.is_empty(),
        FieldValue::Node(_) => true,
        FieldValue::List(nodes) => !nodes.is_empty(),
    }
}

/// Insert multi-line substitution text, re-indenting continuation lines
/// to the column where the substitution starts.
fn push_reindented(out: &mut Rendered, text: &str) {
    if !text.contains('\n') {
        out.text.push_str(text);
        return;
    }

    let column = out
        .text
        .rfind('\n')
        .map_or(out.text.len(), |idx| out.text.len() - idx - 1);
    let indent = " ".repeat(column);

    for (idx, line) in text.lines().enumerate() {
        if idx > 0 {
            out.text.push('\n');
            out.text.push_str(&indent);
        }
        out.text.push_str(line);
    }
}

// Parsing

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    /// Parse segments until one of `terminators` (a `{#...}`/`{/...}`
    /// tag name) or end of input. The terminator tag itself is left
    /// unconsumed for the caller.
    fn parse_segments(&mut self, terminators: &[&str]) -> Result<Vec<Segment>, TemplateParseError> {
        let mut segments = Vec::new();
        let mut literal = String::new();

        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];

            if ch == '{' {
                if let Some(tag) = self.peek_tag() {
                    if terminators.contains(&tag.as_str()) {
                        break;
                    }
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(self.parse_brace()?);
            } else {
                literal.push(ch);
                self.pos += 1;
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(segments)
    }

    /// Tag name if the cursor sits on `{#name…}` or `{/name}`.
    fn peek_tag(&self) -> Option<String> {
        let mut idx = self.pos + 1;
        let marker = *self.chars.get(idx)?;
        if marker != '#' && marker != '/' {
            return None;
        }
        idx += 1;
        let mut name = String::new();
        name.push(marker);
        while let Some(&ch) = self.chars.get(idx) {
            if ch.is_alphanumeric() || ch == '_' {
                name.push(ch);
                idx += 1;
            } else {
                break;
            }
        }
        Some(name)
    }

    fn parse_brace(&mut self) -> Result<Segment, TemplateParseError> {
        match self.peek_tag().as_deref() {
            Some("#if") => self.parse_if(),
            Some("#statements") => self.parse_statements(),
            Some(other) => Err(TemplateParseError {
                message: format!("unexpected tag `{{{other}}}`"),
            }),
            None => self.parse_field_or_iter(),
        }
    }

    /// `{name}` or `{name => sep => body}`.
    fn parse_field_or_iter(&mut self) -> Result<Segment, TemplateParseError> {
        let inner = self.take_until_close()?;
        let mut parts = inner.splitn(3, "=>");
        let field = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TemplateParseError {
                message: "empty substitution".to_owned(),
            })?
            .to_owned();

        match (parts.next(), parts.next()) {
            (None, _) => Ok(Segment::Field(field)),
            (Some(sep), Some(body)) => {
                let mut body_parser = Parser {
                    chars: body.trim().chars().collect(),
                    pos: 0,
                };
                let body_segments = body_parser.parse_segments(&[])?;
                Ok(Segment::Iter {
                    field,
                    // Separator is taken verbatim between single spaces.
                    separator: trim_one_space(sep).to_owned(),
                    body: body_segments,
                })
            }
            (Some(_), None) => Err(TemplateParseError {
                message: "iteration needs `{field => sep => body}`".to_owned(),
            }),
        }
    }

    /// Consume the raw text between the current `{` and its matching
    /// `}`. Nested braces are honored so iteration bodies can contain
    /// substitutions.
    fn take_until_close(&mut self) -> Result<String, TemplateParseError> {
        debug_assert_eq!(self.chars.get(self.pos), Some(&'{'));
        self.pos += 1;
        let mut depth = 1usize;
        let mut inner = String::new();
        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];
            self.pos += 1;
            match ch {
                '{' => {
                    depth += 1;
                    inner.push(ch);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(inner);
                    }
                    inner.push(ch);
                }
                _ => inner.push(ch),
            }
        }
        Err(TemplateParseError {
            message: "unclosed `{`".to_owned(),
        })
    }

    /// Consume a `{#tag …}` or `{/tag}` header, returning its argument.
    fn take_tag(&mut self) -> Result<(String, String), TemplateParseError> {
        let inner = self.take_until_close()?;
        let inner = inner.trim();
        let (name, rest) = match inner.find(char::is_whitespace) {
            Some(idx) => (&inner[..idx], inner[idx..].trim()),
            None => (inner, ""),
        };
        Ok((name.to_owned(), rest.to_owned()))
    }

    fn parse_if(&mut self) -> Result<Segment, TemplateParseError> {
        let (tag, cond) = self.take_tag()?;
        debug_assert_eq!(tag, "#if");
        if cond.is_empty() {
            return Err(TemplateParseError {
                message: "`{#if}` needs a condition field".to_owned(),
            });
        }

        let mut arms = Vec::new();
        let mut otherwise = None;
        let mut current_cond = cond;

        loop {
            let body = self.parse_segments(&["#elseif", "#else", "/if"])?;
            match self.peek_tag().as_deref() {
                Some("#elseif") => {
                    arms.push((current_cond, body));
                    let (_, next_cond) = self.take_tag()?;
                    if next_cond.is_empty() {
                        return Err(TemplateParseError {
                            message: "`{#elseif}` needs a condition field".to_owned(),
                        });
                    }
                    current_cond = next_cond;
                }
                Some("#else") => {
                    arms.push((current_cond, body));
                    self.take_tag()?;
                    let else_body = self.parse_segments(&["/if"])?;
                    if self.peek_tag().as_deref() != Some("/if") {
                        return Err(TemplateParseError {
                            message: "`{#else}` without closing `{/if}`".to_owned(),
                        });
                    }
                    self.take_tag()?;
                    otherwise = Some(else_body);
                    return Ok(Segment::If { arms, otherwise });
                }
                Some("/if") => {
                    arms.push((current_cond, body));
                    self.take_tag()?;
                    return Ok(Segment::If { arms, otherwise });
                }
                _ => {
                    return Err(TemplateParseError {
                        message: "unterminated `{#if}`".to_owned(),
                    });
                }
            }
        }
    }

    fn parse_statements(&mut self) -> Result<Segment, TemplateParseError> {
        self.take_tag()?;
        let body = self.parse_segments(&["/statements"])?;
        if self.peek_tag().as_deref() != Some("/statements") {
            return Err(TemplateParseError {
                message: "unterminated `{#statements}`".to_owned(),
            });
        }
        self.take_tag()?;
        Ok(Segment::Statements(body))
    }
}

/// Strip at most one leading and one trailing space, keeping deliberate
/// multi-space separators intact.
fn trim_one_space(s: &str) -> &str {
    let s = s.strip_prefix(' ').unwrap_or(s);
    s.strip_suffix(' ').unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_node(text: &str) -> TemplateNode {
        Template::parse("{it}")
            .map(|t| t.bind(vec![("it", text.into())]))
            .unwrap_or_else(|_| unreachable!("trivial template"))
    }

    fn parse(source: &str) -> Template {
        match Template::parse(source) {
            Ok(t) => t,
            Err(err) => panic!("template failed to parse: {err}"),
        }
    }

    #[test]
    fn plain_substitution() {
        let node = parse("int16_t {name} = {value};").bind(vec![
            ("name", "x".into()),
            ("value", "7".into()),
        ]);
        let rendered = node.render().map(|r| r.text);
        assert_eq!(rendered, Ok("int16_t x = 7;".to_owned()));
    }

    #[test]
    fn unbound_field_is_defect() {
        let node = parse("{missing}").bind(vec![]);
        assert_eq!(
            node.render(),
            Err(RenderError::UnboundField {
                field: "missing".to_owned()
            })
        );
    }

    #[test]
    fn iteration_with_separator() {
        let node = parse("f({args => - => {it}})").bind(vec![(
            "args",
            vec![text_node("a"), text_node("b"), text_node("c")].into(),
        )]);
        let rendered = node.render().map(|r| r.text);
        assert_eq!(rendered, Ok("f(a-b-c)".to_owned()));
    }

    #[test]
    fn separator_keeps_deliberate_extra_spaces() {
        // One space each side belongs to the arrows; the second trailing
        // space is part of the separator.
        let node = parse("f({args => ,  => {it}})").bind(vec![(
            "args",
            vec![text_node("a"), text_node("b")].into(),
        )]);
        let rendered = node.render().map(|r| r.text);
        assert_eq!(rendered, Ok("f(a, b)".to_owned()));
    }

    #[test]
    fn conditional_arms() {
        let template = parse("{#if is_str}printf(\"%s\");{#else}printf(\"%d\");{/if}");
        let str_node = template.clone().bind(vec![("is_str", true.into())]);
        let num_node = template.bind(vec![("is_str", false.into())]);

        assert_eq!(
            str_node.render().map(|r| r.text),
            Ok("printf(\"%s\");".to_owned())
        );
        assert_eq!(
            num_node.render().map(|r| r.text),
            Ok("printf(\"%d\");".to_owned())
        );
    }

    #[test]
    fn elseif_chain() {
        let template = parse("{#if a}A{#elseif b}B{#else}C{/if}");
        let pick_b = template.clone().bind(vec![
            ("a", false.into()),
            ("b", true.into()),
        ]);
        let pick_c = template.bind(vec![("a", false.into()), ("b", false.into())]);

        assert_eq!(pick_b.render().map(|r| r.text), Ok("B".to_owned()));
        assert_eq!(pick_c.render().map(|r| r.text), Ok("C".to_owned()));
    }

    #[test]
    fn statements_are_hoisted() {
        let node = parse("{#statements}ARRAY_POP(xs, _tmp0);{/statements}_tmp0").bind(vec![]);
        let rendered = match node.render() {
            Ok(r) => r,
            Err(err) => panic!("render failed: {err}"),
        };
        assert_eq!(rendered.text, "_tmp0");
        assert_eq!(rendered.statements, vec!["ARRAY_POP(xs, _tmp0);".to_owned()]);
    }

    #[test]
    fn nested_node_statements_propagate() {
        let inner = parse("{#statements}setup();{/statements}inner_value").bind(vec![]);
        let outer = parse("use({arg})").bind(vec![("arg", inner.into())]);
        let rendered = match outer.render() {
            Ok(r) => r,
            Err(err) => panic!("render failed: {err}"),
        };
        assert_eq!(rendered.text, "use(inner_value)");
        assert_eq!(rendered.statements, vec!["setup();".to_owned()]);
    }

    #[test]
    fn multiline_substitution_reindents() {
        let node = parse("    {body}").bind(vec![("body", "line1\nline2".into())]);
        let rendered = node.render().map(|r| r.text);
        assert_eq!(rendered, Ok("    line1\n    line2".to_owned()));
    }

    #[test]
    fn render_is_idempotent() {
        let node = parse("{#statements}init();{/statements}val({x})")
            .bind(vec![("x", "9".into())]);
        let first = node.render();
        let second = node.render();
        assert_eq!(first, second);
    }

    #[test]
    fn unclosed_brace_fails_parse() {
        assert!(Template::parse("{oops").is_err());
        assert!(Template::parse("{#if x}no close").is_err());
    }
}

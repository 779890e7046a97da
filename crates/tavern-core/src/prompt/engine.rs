//! A small Jinja-flavoured string-templating engine.
//!
//! Supported syntax:
//! - `{{ message.text }}` -- dotted-path interpolation into a JSON context
//! - `{% if path %}`, `{% if not path %}`, `{% elif path %}`, `{% else %}`,
//!   `{% endif %}`
//! - `{# comments #}`
//! - `-` whitespace control on either side of any tag
//!
//! Block and comment tags follow the `trim_blocks` / `lstrip_blocks`
//! conventions: the newline right after the tag is dropped, and spaces or
//! tabs before the tag on its own line are removed. The trailing newline of
//! the template is kept.
//!
//! Interpolating an undefined path is an error; testing one in `if` is just
//! false.
//!
//! Scalars interpolate with JSON spelling, not Jinja's Python spelling:
//! `null` renders as an empty string (Jinja prints `None`), booleans as
//! `true` / `false` (Jinja prints `True` / `False`), and arrays or objects
//! as compact JSON. Profiles ported from Jinja that print a boolean or a
//! possibly-null field should test it with `{% if %}` instead.

use serde_json::Value;
use tavern_types::error::TemplateError;

/// How rendering failures are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Propagate template errors.
    #[default]
    Strict,
    /// Fall back to the raw template text of the failing segment.
    BestEffort,
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let tokens = lex(source)?;
        let nodes = Parser::new(tokens).parse_root()?;
        Ok(Self {
            source: source.to_string(),
            nodes,
        })
    }

    pub fn render(&self, context: &Value) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        render_nodes(&self.nodes, context, &mut out)?;
        Ok(out)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Parse and render a template string in one go.
///
/// In [`RenderMode::BestEffort`] any parse or render failure returns the
/// template text unchanged.
pub fn render_template_string(
    template: &str,
    context: &Value,
    mode: RenderMode,
) -> Result<String, TemplateError> {
    let result = Template::parse(template).and_then(|t| t.render(context));
    match (result, mode) {
        (Ok(text), _) => Ok(text),
        (Err(e), RenderMode::BestEffort) => {
            tracing::warn!(error = %e, "template failed, using raw template text");
            Ok(template.to_string())
        }
        (Err(e), RenderMode::Strict) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Var { path: String, offset: usize },
    Block { statement: String, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Var,
    Block,
    Comment,
}

impl TagKind {
    fn closer(self) -> &'static str {
        match self {
            TagKind::Var => "}}",
            TagKind::Block => "%}",
            TagKind::Comment => "#}",
        }
    }
}

fn syntax(offset: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::Syntax {
        offset,
        message: message.into(),
    }
}

fn find_tag(source: &str, from: usize) -> Option<(usize, TagKind)> {
    let bytes = source.as_bytes();
    let mut i = from;
    while let Some(rel) = source[i..].find('{') {
        let at = i + rel;
        match bytes.get(at + 1) {
            Some(b'{') => return Some((at, TagKind::Var)),
            Some(b'%') => return Some((at, TagKind::Block)),
            Some(b'#') => return Some((at, TagKind::Comment)),
            _ => i = at + 1,
        }
    }
    None
}

/// Apply the previous tag's trailing whitespace rules to the text after it.
fn trim_leading(text: &str, trim_all: bool, strip_newline: bool) -> &str {
    if trim_all {
        text.trim_start()
    } else if strip_newline {
        text.strip_prefix("\r\n")
            .or_else(|| text.strip_prefix('\n'))
            .unwrap_or(text)
    } else {
        text
    }
}

fn lex(source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut trim_next = false;
    let mut strip_newline = false;

    while let Some((tag_start, kind)) = find_tag(source, pos) {
        let mut text = trim_leading(&source[pos..tag_start], trim_next, strip_newline);

        let body_start = tag_start + 2;
        let trim_before = source[body_start..].starts_with('-');
        if trim_before {
            text = text.trim_end();
        } else if kind != TagKind::Var {
            // lstrip_blocks: only when the tag is the first thing on its line
            let line_start = source[..tag_start].rfind('\n').map_or(0, |i| i + 1);
            if line_start >= pos
                && source[line_start..tag_start]
                    .chars()
                    .all(|c| c == ' ' || c == '\t')
            {
                text = text.trim_end_matches([' ', '\t']);
            }
        }
        if !text.is_empty() {
            tokens.push(Token::Text(text.to_string()));
        }

        let body_start = if trim_before { body_start + 1 } else { body_start };
        let closer = kind.closer();
        let Some(rel_end) = source[body_start..].find(closer) else {
            return Err(syntax(tag_start, format!("unclosed tag, expected '{closer}'")));
        };
        let close_at = body_start + rel_end;

        let mut inner = &source[body_start..close_at];
        trim_next = inner.ends_with('-');
        if trim_next {
            inner = &inner[..inner.len() - 1];
        }
        let inner = inner.trim();

        match kind {
            TagKind::Var => {
                validate_path(inner, tag_start)?;
                tokens.push(Token::Var {
                    path: inner.to_string(),
                    offset: tag_start,
                });
            }
            TagKind::Block => tokens.push(Token::Block {
                statement: inner.to_string(),
                offset: tag_start,
            }),
            TagKind::Comment => {}
        }

        strip_newline = kind != TagKind::Var;
        pos = close_at + closer.len();
    }

    let text = trim_leading(&source[pos..], trim_next, strip_newline);
    if !text.is_empty() {
        tokens.push(Token::Text(text.to_string()));
    }
    Ok(tokens)
}

fn validate_path(path: &str, offset: usize) -> Result<(), TemplateError> {
    let valid = !path.is_empty()
        && path.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(syntax(offset, format!("invalid expression '{path}'")))
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Var {
        path: String,
        offset: usize,
    },
    If {
        branches: Vec<(Condition, Vec<Node>)>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone)]
struct Condition {
    path: String,
    negated: bool,
}

enum Statement {
    If(Condition),
    Elif(Condition),
    Else,
    EndIf,
}

/// Statement that ends a block body.
enum Terminator {
    Elif(Condition),
    Else,
    EndIf,
}

fn parse_condition(expr: &str, offset: usize) -> Result<Condition, TemplateError> {
    let (negated, path) = match expr.strip_prefix("not ") {
        Some(rest) => (true, rest.trim()),
        None => (false, expr),
    };
    validate_path(path, offset)?;
    Ok(Condition {
        path: path.to_string(),
        negated,
    })
}

fn parse_statement(statement: &str, offset: usize) -> Result<Statement, TemplateError> {
    let (keyword, rest) = statement
        .split_once(char::is_whitespace)
        .map(|(k, r)| (k, r.trim()))
        .unwrap_or((statement, ""));
    match keyword {
        "if" => Ok(Statement::If(parse_condition(rest, offset)?)),
        "elif" => Ok(Statement::Elif(parse_condition(rest, offset)?)),
        "else" if rest.is_empty() => Ok(Statement::Else),
        "endif" if rest.is_empty() => Ok(Statement::EndIf),
        _ => Err(syntax(offset, format!("unknown statement '{statement}'"))),
    }
}

struct Parser {
    tokens: std::vec::IntoIter<Token>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
        }
    }

    fn parse_root(mut self) -> Result<Vec<Node>, TemplateError> {
        match self.parse_body()? {
            (nodes, None) => Ok(nodes),
            (_, Some((_, offset))) => Err(syntax(offset, "unexpected statement outside 'if' block")),
        }
    }

    fn parse_body(&mut self) -> Result<(Vec<Node>, Option<(Terminator, usize)>), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.next() {
            match token {
                Token::Text(text) => nodes.push(Node::Text(text)),
                Token::Var { path, offset } => nodes.push(Node::Var { path, offset }),
                Token::Block { statement, offset } => {
                    let terminator = match parse_statement(&statement, offset)? {
                        Statement::If(condition) => {
                            nodes.push(self.parse_if(condition, offset)?);
                            continue;
                        }
                        Statement::Elif(condition) => Terminator::Elif(condition),
                        Statement::Else => Terminator::Else,
                        Statement::EndIf => Terminator::EndIf,
                    };
                    return Ok((nodes, Some((terminator, offset))));
                }
            }
        }
        Ok((nodes, None))
    }

    fn parse_if(&mut self, first: Condition, offset: usize) -> Result<Node, TemplateError> {
        let mut branches = Vec::new();
        let mut condition = first;
        loop {
            let (body, end) = self.parse_body()?;
            branches.push((condition, body));
            match end {
                Some((Terminator::Elif(next), _)) => condition = next,
                Some((Terminator::EndIf, _)) => {
                    return Ok(Node::If {
                        branches,
                        otherwise: Vec::new(),
                    });
                }
                Some((Terminator::Else, _)) => {
                    let (otherwise, end) = self.parse_body()?;
                    return match end {
                        Some((Terminator::EndIf, _)) => Ok(Node::If {
                            branches,
                            otherwise,
                        }),
                        Some((_, at)) => Err(syntax(at, "expected 'endif' after 'else'")),
                        None => Err(syntax(offset, "unclosed 'if' block")),
                    };
                }
                None => return Err(syntax(offset, "unclosed 'if' block")),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

fn render_nodes(nodes: &[Node], context: &Value, out: &mut String) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var { path, offset } => {
                let value = lookup(context, path).ok_or_else(|| TemplateError::UndefinedVariable {
                    name: path.clone(),
                    offset: *offset,
                })?;
                push_value(out, value);
            }
            Node::If {
                branches,
                otherwise,
            } => {
                let taken = branches
                    .iter()
                    .find(|(condition, _)| {
                        is_truthy(lookup(context, &condition.path)) != condition.negated
                    })
                    .map(|(_, body)| body)
                    .unwrap_or(otherwise);
                render_nodes(taken, context, out)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(template: &str, context: Value) -> Result<String, TemplateError> {
        Template::parse(template)?.render(&context)
    }

    #[test]
    fn test_interpolates_dotted_paths() {
        let out = render(
            "{{ message.name }}: {{message.text}}",
            json!({"message": {"name": "Luna", "text": "hi"}}),
        )
        .unwrap();
        assert_eq!(out, "Luna: hi");
    }

    #[test]
    fn test_scalar_values() {
        let out = render(
            "{{ n }}/{{ b }}/[{{ missing_ok }}]/{{ items.1 }}",
            json!({"n": 5, "b": true, "missing_ok": null, "items": ["a", "b"]}),
        )
        .unwrap();
        assert_eq!(out, "5/true/[]/b");
    }

    #[test]
    fn test_scalars_use_json_spelling() {
        let out = render(
            "[{{ none }}|{{ yes }}|{{ no }}|{{ list }}|{{ obj }}]",
            json!({"none": null, "yes": true, "no": false, "list": [1, "a"], "obj": {"k": 1}}),
        )
        .unwrap();
        assert_eq!(out, r#"[|true|false|[1,"a"]|{"k":1}]"#);
    }

    #[test]
    fn test_undefined_variable_is_error() {
        let err = render("Hello {{ who }}", json!({})).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UndefinedVariable {
                name: "who".to_string(),
                offset: 6
            }
        );
    }

    #[test]
    fn test_if_else_and_not() {
        let tpl = "{% if name %}to {{ name }}{% else %}to nobody{% endif %}";
        assert_eq!(render(tpl, json!({"name": "Ana"})).unwrap(), "to Ana");
        assert_eq!(render(tpl, json!({"name": null})).unwrap(), "to nobody");
        assert_eq!(render(tpl, json!({})).unwrap(), "to nobody");

        let tpl = "{% if not name %}anon{% endif %}";
        assert_eq!(render(tpl, json!({"name": ""})).unwrap(), "anon");
        assert_eq!(render(tpl, json!({"name": "x"})).unwrap(), "");
    }

    #[test]
    fn test_elif_chain_and_nesting() {
        let tpl = "{% if a %}A{% elif b %}{% if c %}BC{% else %}B{% endif %}{% else %}N{% endif %}";
        assert_eq!(render(tpl, json!({"a": 1})).unwrap(), "A");
        assert_eq!(render(tpl, json!({"b": 1, "c": true})).unwrap(), "BC");
        assert_eq!(render(tpl, json!({"b": 1})).unwrap(), "B");
        assert_eq!(render(tpl, json!({})).unwrap(), "N");
    }

    #[test]
    fn test_trim_and_lstrip_blocks() {
        let tpl = "start\n  {% if x %}\n  yes\n  {% endif %}\nend\n";
        assert_eq!(render(tpl, json!({"x": true})).unwrap(), "start\n  yes\nend\n");
        assert_eq!(render(tpl, json!({"x": false})).unwrap(), "start\nend\n");
    }

    #[test]
    fn test_inline_block_keeps_preceding_text() {
        let tpl = "a {% if x %}b{% endif %} c";
        assert_eq!(render(tpl, json!({"x": true})).unwrap(), "a b c");
    }

    #[test]
    fn test_dash_whitespace_control() {
        let tpl = "a   {{- x -}}   b";
        assert_eq!(render(tpl, json!({"x": "X"})).unwrap(), "aXb");
    }

    #[test]
    fn test_comments_are_dropped() {
        let tpl = "{# header #}\nvalue: {{ v }}\n";
        assert_eq!(render(tpl, json!({"v": 1})).unwrap(), "value: 1\n");
    }

    #[test]
    fn test_plain_braces_are_text() {
        assert_eq!(render("{ not a tag }", json!({})).unwrap(), "{ not a tag }");
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            Template::parse("{{ oops"),
            Err(TemplateError::Syntax { offset: 0, .. })
        ));
        assert!(matches!(
            Template::parse("{% if x %}never closed"),
            Err(TemplateError::Syntax { .. })
        ));
        assert!(matches!(
            Template::parse("{% endif %}"),
            Err(TemplateError::Syntax { .. })
        ));
        assert!(matches!(
            Template::parse("{% for x in y %}{% endfor %}"),
            Err(TemplateError::Syntax { .. })
        ));
        assert!(matches!(
            Template::parse("{{ a + b }}"),
            Err(TemplateError::Syntax { .. })
        ));
    }

    #[test]
    fn test_best_effort_returns_raw_template() {
        let out = render_template_string("Hi {{ who }}", &json!({}), RenderMode::BestEffort).unwrap();
        assert_eq!(out, "Hi {{ who }}");
        assert!(render_template_string("Hi {{ who }}", &json!({}), RenderMode::Strict).is_err());
    }
}

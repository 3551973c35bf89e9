//! A small XPath evaluator for tests.
//!
//! Supports location paths (`/data/a`, `../b`, `.`, `rep[2]`), string and
//! number literals, comparisons, `and`/`or`, arithmetic, and the functions
//! forms in these tests use: `true`, `false`, `not`, `count`, `selected`,
//! `if`, `string`, `number`, `concat`, `string-length` and `jr:itext`.

use std::cell::RefCell;

use indexmap::IndexMap;
use xforms_engine::{ContextNode, XPathError, XPathEvaluator};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Literal(String),
    Name(String),
    Slash,
    Dot,
    DotDot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Op(&'static str),
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '.' if chars.get(i + 1) == Some(&'.') => {
                tokens.push(Token::DotDot);
                i += 2;
            }
            '.' if !chars.get(i + 1).is_some_and(char::is_ascii_digit) => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op("="));
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op("!="));
                i += 2;
            }
            '<' | '>' => {
                let op = match (c, chars.get(i + 1) == Some(&'=')) {
                    ('<', true) => "<=",
                    ('<', false) => "<",
                    ('>', true) => ">=",
                    _ => ">",
                };
                i += op.len();
                tokens.push(Token::Op(op));
            }
            '+' => {
                tokens.push(Token::Op("+"));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Op("-"));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Op("*"));
                i += 1;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&d| d == c)
                    .ok_or("unterminated literal")?;
                tokens.push(Token::Literal(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Number(text.parse().map_err(|_| format!("bad number {text}"))?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '-' | ':' | '.'))
                {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character {other:?}")),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Current,
    Parent,
    Child(String, Option<usize>),
}

#[derive(Debug, Clone, PartialEq)]
struct Path {
    absolute: bool,
    steps: Vec<Step>,
}

impl Path {
    fn render(&self) -> String {
        let steps: Vec<String> = self
            .steps
            .iter()
            .map(|step| match step {
                Step::Current => ".".to_string(),
                Step::Parent => "..".to_string(),
                Step::Child(name, None) => name.clone(),
                Step::Child(name, Some(position)) => format!("{name}[{position}]"),
            })
            .collect();
        let joined = steps.join("/");
        if self.absolute {
            format!("/{joined}")
        } else {
            joined
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Literal(String),
    Path(Path),
    Call(String, Vec<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
}

impl Expr {
    fn collect_paths(&self, out: &mut Vec<String>) {
        match self {
            Expr::Path(path) => {
                let rendered = path.render();
                if !out.contains(&rendered) {
                    out.push(rendered);
                }
            }
            Expr::Call(_, args) => args.iter().for_each(|arg| arg.collect_paths(out)),
            Expr::Binary(_, left, right) => {
                left.collect_paths(out);
                right.collect_paths(out);
            }
            Expr::Negate(inner) => inner.collect_paths(out),
            Expr::Number(_) | Expr::Literal(_) => {}
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn parse(expression: &str) -> Result<Expr, String> {
        let mut parser = Parser {
            tokens: tokenize(expression)?,
            position: 0,
        };
        let expr = parser.or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(token) => Err(format!("unexpected {token:?}")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            other => Err(format!("expected {expected:?}, found {other:?}")),
        }
    }

    fn keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(name)) if name == word)
    }

    fn or(&mut self) -> Result<Expr, String> {
        let mut left = self.and()?;
        while self.keyword("or") {
            self.position += 1;
            left = Expr::Binary("or", Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut left = self.comparison()?;
        while self.keyword("and") {
            self.position += 1;
            left = Expr::Binary("and", Box::new(left), Box::new(self.comparison()?));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let left = self.additive()?;
        if let Some(Token::Op(op @ ("=" | "!=" | "<" | "<=" | ">" | ">="))) = self.peek() {
            let op = *op;
            self.position += 1;
            return Ok(Expr::Binary(op, Box::new(left), Box::new(self.additive()?)));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut left = self.multiplicative()?;
        while let Some(Token::Op(op @ ("+" | "-"))) = self.peek() {
            let op = *op;
            self.position += 1;
            left = Expr::Binary(op, Box::new(left), Box::new(self.multiplicative()?));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op("*")) => "*",
                Some(Token::Name(name)) if name == "div" => "div",
                Some(Token::Name(name)) if name == "mod" => "mod",
                _ => return Ok(left),
            };
            self.position += 1;
            left = Expr::Binary(op, Box::new(left), Box::new(self.unary()?));
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::Op("-")) {
            self.position += 1;
            return Ok(Expr::Negate(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.peek().cloned() {
            Some(Token::Number(value)) => {
                self.position += 1;
                Ok(Expr::Number(value))
            }
            Some(Token::Literal(value)) => {
                self.position += 1;
                Ok(Expr::Literal(value))
            }
            Some(Token::LParen) => {
                self.position += 1;
                let inner = self.or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name))
                if self.tokens.get(self.position + 1) == Some(&Token::LParen) =>
            {
                self.position += 2;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.or()?);
                        if self.peek() == Some(&Token::Comma) {
                            self.position += 1;
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RParen)?;
                Ok(Expr::Call(name, args))
            }
            Some(Token::Slash | Token::Dot | Token::DotDot | Token::Name(_)) => {
                self.path().map(Expr::Path)
            }
            other => Err(format!("unexpected {other:?}")),
        }
    }

    fn path(&mut self) -> Result<Path, String> {
        let absolute = self.peek() == Some(&Token::Slash);
        if absolute {
            self.position += 1;
        }

        let mut steps = Vec::new();
        loop {
            let step = match self.next() {
                Some(Token::Dot) => Step::Current,
                Some(Token::DotDot) => Step::Parent,
                Some(Token::Name(name)) => {
                    let position = if self.peek() == Some(&Token::LBracket) {
                        self.position += 1;
                        let position = match self.next() {
                            Some(Token::Number(value)) if value >= 1.0 => value as usize,
                            other => return Err(format!("unsupported predicate {other:?}")),
                        };
                        self.expect(Token::RBracket)?;
                        Some(position)
                    } else {
                        None
                    };
                    Step::Child(name, position)
                }
                other => return Err(format!("expected a step, found {other:?}")),
            };
            steps.push(step);

            if self.peek() == Some(&Token::Slash) {
                self.position += 1;
            } else {
                return Ok(Path { absolute, steps });
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<ContextNode>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    fn to_bool(&self) -> bool {
        match self {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::String(value) => !value.is_empty(),
            Value::Number(value) => *value != 0.0 && !value.is_nan(),
            Value::Boolean(value) => *value,
        }
    }

    fn to_string(&self) -> String {
        match self {
            Value::Nodes(nodes) => nodes.first().map(ContextNode::string_value).unwrap_or_default(),
            Value::String(value) => value.clone(),
            Value::Number(value) => format_number(*value),
            Value::Boolean(value) => value.to_string(),
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Value::Number(value) => *value,
            Value::Boolean(value) => f64::from(u8::from(*value)),
            other => other.to_string().trim().parse().unwrap_or(f64::NAN),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn compare(op: &str, left: &Value, right: &Value) -> bool {
    if let (Value::Nodes(nodes), other) | (other, Value::Nodes(nodes)) = (left, right) {
        if !matches!(other, Value::Nodes(_)) {
            let flipped = matches!(left, Value::Nodes(_));
            return nodes.iter().any(|node| {
                let value = Value::String(node.string_value());
                if flipped {
                    compare(op, &value, other)
                } else {
                    compare(op, other, &value)
                }
            });
        }
    }

    match op {
        "=" | "!=" => {
            let equal = match (left, right) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => left.to_bool() == right.to_bool(),
                (Value::Number(_), _) | (_, Value::Number(_)) => left.to_number() == right.to_number(),
                _ => left.to_string() == right.to_string(),
            };
            equal == (op == "=")
        }
        _ => {
            let (a, b) = (left.to_number(), right.to_number());
            match op {
                "<" => a < b,
                "<=" => a <= b,
                ">" => a > b,
                _ => a >= b,
            }
        }
    }
}

/// Evaluator over the engine's [`ContextNode`]s with an itext table.
#[derive(Debug, Default)]
pub struct TestEvaluator {
    translations: IndexMap<String, IndexMap<String, String>>,
    active_language: RefCell<Option<String>>,
}

impl TestEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a language. The first language added becomes active.
    pub fn with_language(mut self, language: &str, entries: &[(&str, &str)]) -> Self {
        let table = entries
            .iter()
            .map(|(id, text)| (id.to_string(), text.to_string()))
            .collect();
        self.translations.insert(language.to_string(), table);
        if self.active_language.borrow().is_none() {
            self.active_language.replace(Some(language.to_string()));
        }
        self
    }

    fn evaluate(&self, expression: &str, context: &ContextNode) -> Result<Value, XPathError> {
        let expr = Parser::parse(expression).map_err(|message| XPathError::Syntax {
            expression: expression.to_string(),
            message,
        })?;
        self.eval(&expr, context).map_err(|message| XPathError::Evaluation {
            expression: expression.to_string(),
            message,
        })
    }

    fn eval(&self, expr: &Expr, context: &ContextNode) -> Result<Value, String> {
        Ok(match expr {
            Expr::Number(value) => Value::Number(*value),
            Expr::Literal(value) => Value::String(value.clone()),
            Expr::Path(path) => Value::Nodes(select(path, context)),
            Expr::Negate(inner) => Value::Number(-self.eval(inner, context)?.to_number()),
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, context)?;
                match *op {
                    "and" => Value::Boolean(left.to_bool() && self.eval(right, context)?.to_bool()),
                    "or" => Value::Boolean(left.to_bool() || self.eval(right, context)?.to_bool()),
                    op => {
                        let right = self.eval(right, context)?;
                        let (a, b) = (left.to_number(), right.to_number());
                        match op {
                            "+" => Value::Number(a + b),
                            "-" => Value::Number(a - b),
                            "*" => Value::Number(a * b),
                            "div" => Value::Number(a / b),
                            "mod" => Value::Number(a % b),
                            op => Value::Boolean(compare(op, &left, &right)),
                        }
                    }
                }
            }
            Expr::Call(name, args) => self.call(name, args, context)?,
        })
    }

    fn call(&self, name: &str, args: &[Expr], context: &ContextNode) -> Result<Value, String> {
        let values = args
            .iter()
            .map(|arg| self.eval(arg, context))
            .collect::<Result<Vec<_>, _>>()?;
        let arg = |index: usize| {
            values
                .get(index)
                .cloned()
                .ok_or_else(|| format!("{name}() needs argument {}", index + 1))
        };

        Ok(match name {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            "not" => Value::Boolean(!arg(0)?.to_bool()),
            "string" => Value::String(arg(0)?.to_string()),
            "number" => Value::Number(arg(0)?.to_number()),
            "string-length" => Value::Number(arg(0)?.to_string().chars().count() as f64),
            "concat" => Value::String(values.iter().map(Value::to_string).collect()),
            "count" => match arg(0)? {
                Value::Nodes(nodes) => Value::Number(nodes.len() as f64),
                other => return Err(format!("count() of {other:?}")),
            },
            "selected" => {
                let selected = arg(0)?.to_string();
                let value = arg(1)?.to_string();
                Value::Boolean(selected.split_whitespace().any(|item| item == value))
            }
            "if" => {
                if arg(0)?.to_bool() {
                    arg(1)?
                } else {
                    arg(2)?
                }
            }
            "jr:itext" => {
                let id = arg(0)?.to_string();
                let language = self.active_language.borrow().clone();
                let text = language
                    .and_then(|language| self.translations.get(&language))
                    .and_then(|table| table.get(&id))
                    .cloned()
                    .unwrap_or_default();
                Value::String(text)
            }
            other => return Err(format!("unknown function {other}()")),
        })
    }
}

fn select(path: &Path, context: &ContextNode) -> Vec<ContextNode> {
    let mut steps = path.steps.iter();
    let mut current = if path.absolute {
        let Some(root) = context.root() else {
            return Vec::new();
        };
        match steps.next() {
            Some(Step::Child(name, _)) if root.node_name() == Some(name.as_str()) => vec![root],
            _ => return Vec::new(),
        }
    } else {
        vec![context.clone()]
    };

    for step in steps {
        current = match step {
            Step::Current => current,
            Step::Parent => {
                let mut parents: Vec<ContextNode> = Vec::new();
                for parent in current.iter().filter_map(ContextNode::parent) {
                    if !parents.contains(&parent) {
                        parents.push(parent);
                    }
                }
                parents
            }
            Step::Child(name, position) => {
                let mut found = Vec::new();
                for node in &current {
                    let matching = node
                        .child_elements()
                        .into_iter()
                        .filter(|child| child.node_name() == Some(name.as_str()));
                    match position {
                        Some(position) => found.extend(matching.skip(position - 1).take(1)),
                        None => found.extend(matching),
                    }
                }
                found
            }
        };
    }
    current
}

impl XPathEvaluator for TestEvaluator {
    fn evaluate_boolean(&self, expression: &str, context: &ContextNode) -> Result<bool, XPathError> {
        self.evaluate(expression, context).map(|value| value.to_bool())
    }

    fn evaluate_string(&self, expression: &str, context: &ContextNode) -> Result<String, XPathError> {
        self.evaluate(expression, context).map(|value| value.to_string())
    }

    fn evaluate_nodes(
        &self,
        expression: &str,
        context: &ContextNode,
    ) -> Result<Vec<ContextNode>, XPathError> {
        match self.evaluate(expression, context)? {
            Value::Nodes(nodes) => Ok(nodes),
            other => Err(XPathError::Evaluation {
                expression: expression.to_string(),
                message: format!("{other:?} is not a node-set"),
            }),
        }
    }

    fn dependency_references(&self, expression: &str) -> Vec<String> {
        let mut references = Vec::new();
        if let Ok(expr) = Parser::parse(expression) {
            expr.collect_paths(&mut references);
        }
        references
    }

    fn languages(&self) -> Vec<String> {
        self.translations.keys().cloned().collect()
    }

    fn active_language(&self) -> Option<String> {
        self.active_language.borrow().clone()
    }

    fn set_active_language(&self, language: &str) {
        self.active_language.replace(Some(language.to_string()));
    }
}

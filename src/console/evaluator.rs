// tui-devconsole/src/console/evaluator.rs
use std::sync::{Arc, RwLock};

use anyhow::{Result, anyhow, bail};
use itertools::Itertools;
use serde_json::{Map, Number, Value};

/// Capability the host hands to the console for running typed commands.
///
/// Evaluation runs with whatever access the implementation has; the
/// console adds no isolation, timeout or resource limit.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, source: &str) -> Result<Value>;
}

impl<F> Evaluator for F
where
    F: Fn(&str) -> Result<Value> + Send + Sync,
{
    fn evaluate(&self, source: &str) -> Result<Value> {
        self(source)
    }
}

/// Named values the host exposes to typed expressions. Cloning shares the
/// same underlying map, so the host can keep updating it while the
/// console is open.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: Arc<RwLock<Map<String, Value>>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) -> Result<()> {
        self.vars
            .write()
            .map_err(|_| anyhow!("scope lock poisoned"))?
            .insert(name.into(), value);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<Option<Value>> {
        Ok(self
            .vars
            .write()
            .map_err(|_| anyhow!("scope lock poisoned"))?
            .remove(name))
    }

    pub fn get(&self, name: &str) -> Result<Option<Value>> {
        Ok(self
            .vars
            .read()
            .map_err(|_| anyhow!("scope lock poisoned"))?
            .get(name)
            .cloned())
    }

    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self
            .vars
            .read()
            .map_err(|_| anyhow!("scope lock poisoned"))?
            .keys()
            .cloned()
            .collect())
    }
}

/// Evaluates small expressions against a [`Scope`].
///
/// Supports number, string, boolean and null literals, array and object
/// literals, identifiers with `.field` and `[index]` access, unary minus,
/// `+ - * / %` with the usual precedence and parentheses. `+` concatenates
/// when either side is a string.
#[derive(Debug, Clone, Default)]
pub struct ScopeEvaluator {
    scope: Scope,
}

impl ScopeEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(scope: Scope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl Evaluator for ScopeEvaluator {
    fn evaluate(&self, source: &str) -> Result<Value> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
            scope: &self.scope,
        };
        let value = parser.expression()?;
        match parser.peek() {
            None => Ok(value),
            Some(token) => bail!("unexpected {token} after expression"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(char),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Ident(name) => write!(f, "`{name}`"),
            Token::Punct(ch) => write!(f, "`{ch}`"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch.is_ascii_digit() || (ch == '.' && next_is_digit(source, start)) {
            let mut end = start;
            while let Some(&(idx, c)) = chars.peek() {
                if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' {
                    end = idx + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &source[start..end];
            let number = text
                .parse::<f64>()
                .map_err(|_| anyhow!("invalid number literal `{text}`"))?;
            tokens.push(Token::Number(number));
        } else if ch == '"' || ch == '\'' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => text.push('\n'),
                        Some((_, 't')) => text.push('\t'),
                        Some((_, escaped)) => text.push(escaped),
                        None => break,
                    },
                    c if c == ch => {
                        closed = true;
                        break;
                    }
                    c => text.push(c),
                }
            }
            if !closed {
                bail!("unterminated string literal");
            }
            tokens.push(Token::Str(text));
        } else if ch.is_alphabetic() || ch == '_' || ch == '$' {
            let mut end = start;
            while let Some(&(idx, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' || c == '$' {
                    end = idx + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(source[start..end].to_string()));
        } else if "+-*/%()[]{}.,:".contains(ch) {
            chars.next();
            tokens.push(Token::Punct(ch));
        } else {
            bail!("unexpected character `{ch}`");
        }
    }

    Ok(tokens)
}

fn next_is_digit(source: &str, idx: usize) -> bool {
    source[idx + 1..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
}

/// Nesting allowed for parentheses, literals, indexing and unary minus.
const MAX_DEPTH: usize = 64;

struct Parser<'s> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    scope: &'s Scope,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, punct: char) -> bool {
        if self.peek() == Some(&Token::Punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: char) -> Result<()> {
        match self.next() {
            Some(Token::Punct(p)) if p == punct => Ok(()),
            Some(other) => bail!("expected `{punct}`, found {other}"),
            None => bail!("expected `{punct}`, found end of input"),
        }
    }

    fn expression(&mut self) -> Result<Value> {
        let mut lhs = self.term()?;
        loop {
            if self.eat('+') {
                let rhs = self.term()?;
                lhs = add(lhs, rhs)?;
            } else if self.eat('-') {
                let rhs = self.term()?;
                lhs = arithmetic('-', &lhs, &rhs)?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn term(&mut self) -> Result<Value> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Punct(op @ ('*' | '/' | '%'))) => *op,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = arithmetic(op, &lhs, &rhs)?;
        }
    }

    // Every nested expression passes through here.
    fn unary(&mut self) -> Result<Value> {
        if self.depth >= MAX_DEPTH {
            bail!("expression nested too deeply");
        }
        self.depth += 1;
        let value = if self.eat('-') {
            self.unary().and_then(|value| {
                let n = as_number(&value)
                    .ok_or_else(|| anyhow!("cannot negate {}", type_name(&value)))?;
                number(-n)
            })
        } else {
            self.postfix()
        };
        self.depth -= 1;
        value
    }

    fn postfix(&mut self) -> Result<Value> {
        let mut value = self.primary()?;
        loop {
            if self.eat('.') {
                let field = match self.next() {
                    Some(Token::Ident(field)) => field,
                    Some(other) => bail!("expected a field name after `.`, found {other}"),
                    None => bail!("expected a field name after `.`"),
                };
                value = member(&value, &Value::String(field))?;
            } else if self.eat('[') {
                let key = self.expression()?;
                self.expect(']')?;
                value = member(&value, &key)?;
            } else {
                return Ok(value);
            }
        }
    }

    fn primary(&mut self) -> Result<Value> {
        match self.next() {
            Some(Token::Number(n)) => number(n),
            Some(Token::Str(text)) => Ok(Value::String(text)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                _ => self
                    .scope
                    .get(&name)?
                    .ok_or_else(|| anyhow!("unknown identifier `{name}`")),
            },
            Some(Token::Punct('(')) => {
                let value = self.expression()?;
                self.expect(')')?;
                Ok(value)
            }
            Some(Token::Punct('[')) => {
                let mut items = Vec::new();
                if !self.eat(']') {
                    loop {
                        items.push(self.expression()?);
                        if self.eat(']') {
                            break;
                        }
                        self.expect(',')?;
                    }
                }
                Ok(Value::Array(items))
            }
            Some(Token::Punct('{')) => {
                let mut map = Map::new();
                if !self.eat('}') {
                    loop {
                        let key = match self.next() {
                            Some(Token::Ident(key) | Token::Str(key)) => key,
                            Some(other) => bail!("expected an object key, found {other}"),
                            None => bail!("expected an object key"),
                        };
                        self.expect(':')?;
                        map.insert(key, self.expression()?);
                        if self.eat('}') {
                            break;
                        }
                        self.expect(',')?;
                    }
                }
                Ok(Value::Object(map))
            }
            Some(other) => bail!("unexpected {other}"),
            None => bail!("unexpected end of input"),
        }
    }
}

fn number(n: f64) -> Result<Value> {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Ok(Value::from(n as i64));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| anyhow!("result is not a finite number"))
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(display).join(","),
        other => other.to_string(),
    }
}

fn add(lhs: Value, rhs: Value) -> Result<Value> {
    if lhs.is_string() || rhs.is_string() {
        return Ok(Value::String(format!("{}{}", display(&lhs), display(&rhs))));
    }
    arithmetic('+', &lhs, &rhs)
}

fn arithmetic(op: char, lhs: &Value, rhs: &Value) -> Result<Value> {
    let (Some(a), Some(b)) = (as_number(lhs), as_number(rhs)) else {
        bail!(
            "cannot apply `{op}` to {} and {}",
            type_name(lhs),
            type_name(rhs)
        );
    };
    let result = match op {
        '+' => a + b,
        '-' => a - b,
        '*' => a * b,
        '/' => a / b,
        '%' => a % b,
        _ => bail!("unknown operator `{op}`"),
    };
    number(result)
}

fn member(value: &Value, key: &Value) -> Result<Value> {
    match (value, key) {
        (Value::Object(map), Value::String(field)) => {
            Ok(map.get(field).cloned().unwrap_or(Value::Null))
        }
        (Value::Array(items), Value::String(field)) if field == "length" => {
            Ok(Value::from(items.len()))
        }
        (Value::String(text), Value::String(field)) if field == "length" => {
            Ok(Value::from(text.chars().count()))
        }
        (Value::Array(items), Value::Number(idx)) => Ok(idx
            .as_u64()
            .and_then(|idx| items.get(idx as usize))
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::Null, key) => bail!("cannot read {} of null", display(key)),
        (value, key) => bail!(
            "cannot index {} with {}",
            type_name(value),
            type_name(key)
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn eval(source: &str) -> Result<Value> {
        let scope = Scope::new();
        scope.set("answer", json!(42)).unwrap();
        scope
            .set("user", json!({"name": "ada", "roles": ["admin", "dev"]}))
            .unwrap();
        ScopeEvaluator::with_scope(scope).evaluate(source)
    }

    #[test]
    fn arithmetic_respects_precedence() {
        assert_eq!(eval("1+1").unwrap(), json!(2));
        assert_eq!(eval("2 + 3 * 4").unwrap(), json!(14));
        assert_eq!(eval("(2 + 3) * 4").unwrap(), json!(20));
        assert_eq!(eval("-answer + 2").unwrap(), json!(-40));
        assert_eq!(eval("7 / 2").unwrap(), json!(3.5));
        assert_eq!(eval("7 % 4").unwrap(), json!(3));
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let minuses = format!("{}1", "-".repeat(10_000));
        let arrays = format!("{}{}", "[".repeat(10_000), "]".repeat(10_000));
        for source in [parens, minuses, arrays] {
            assert_eq!(
                eval(&source).unwrap_err().to_string(),
                "expression nested too deeply"
            );
        }
        assert_eq!(eval("((((-(-2)))))").unwrap(), json!(2));
        assert_eq!(eval("[[[[1]]]][0][0][0][0]").unwrap(), json!(1));
    }

    #[test]
    fn scope_lookups_and_member_access() {
        assert_eq!(eval("answer").unwrap(), json!(42));
        assert_eq!(eval("user.name").unwrap(), json!("ada"));
        assert_eq!(eval("user.roles[1]").unwrap(), json!("dev"));
        assert_eq!(eval("user[\"roles\"].length").unwrap(), json!(2));
        assert_eq!(eval("user.missing").unwrap(), Value::Null);
    }

    #[test]
    fn strings_concatenate() {
        assert_eq!(eval("'id-' + answer").unwrap(), json!("id-42"));
        assert_eq!(eval("\"a\\tb\"").unwrap(), json!("a\tb"));
    }

    #[test]
    fn literals_build_composites() {
        assert_eq!(eval("[1, 'two', null]").unwrap(), json!([1, "two", null]));
        assert_eq!(eval("{a: 1, 'b c': [true]}").unwrap(), json!({"a": 1, "b c": [true]}));
    }

    #[test]
    fn failures_describe_the_problem() {
        assert_eq!(
            eval("undefinedVar").unwrap_err().to_string(),
            "unknown identifier `undefinedVar`"
        );
        assert!(eval("1 +").is_err());
        assert!(eval("1 / 0").is_err());
        assert!(eval("user * 2").is_err());
        assert!(eval("'open").is_err());
        assert!(eval("1 2").is_err());
        assert!(eval("null.x").is_err());
    }

    #[test]
    fn scope_changes_are_visible_to_later_evaluations() {
        let evaluator = ScopeEvaluator::new();
        assert!(evaluator.evaluate("count").is_err());
        evaluator.scope().set("count", json!(3)).unwrap();
        assert_eq!(evaluator.evaluate("count * 2").unwrap(), json!(6));
    }

    #[test]
    fn closures_are_evaluators() {
        let evaluator: Arc<dyn Evaluator> = Arc::new(|source: &str| Ok::<_, anyhow::Error>(json!(source.len())));
        assert_eq!(evaluator.evaluate("abc").unwrap(), json!(3));
    }
}

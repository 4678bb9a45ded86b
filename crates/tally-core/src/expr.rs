//! Sandboxed boolean expression language for tag membership
//!
//! Tag expressions decide which transactions a tag applies to. The grammar is
//! deliberately closed: field paths, comparison operators, `contains`,
//! boolean connectives and literals. Expressions are parsed into a small tree
//! and interpreted directly over the transaction's raw field map, so the only
//! capability user text can reach is "read transaction fields and produce a
//! boolean".
//!
//! ```text
//! merchant.online == true and amount < -500
//! description contains "PRET" or notes contains "#lunch"
//! not (merchant.address.country == "GBR")
//! ```
//!
//! Syntax errors are fatal for the request (the user must fix the
//! expression). A missing or type-mismatched field during evaluation only
//! skips that one transaction.

use serde_json::Value;
use thiserror::Error;

use crate::error::{Error, Result};
use crate::models::Transaction;

/// Evaluation failure scoped to a single transaction.
///
/// These never abort a batch: the transaction is treated as non-matching and
/// processing continues.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("type mismatch: cannot apply '{op}' to {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("expected a boolean, got {0}")]
    NotBoolean(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Contains,
    True,
    False,
    Dot,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{}'", name),
            Token::Number(n) => format!("'{}'", n),
            Token::Str(s) => format!("\"{}\"", s),
            Token::Eq => "'=='".to_string(),
            Token::Ne => "'!='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::Le => "'<='".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::Ge => "'>='".to_string(),
            Token::And => "'and'".to_string(),
            Token::Or => "'or'".to_string(),
            Token::Not => "'not'".to_string(),
            Token::Contains => "'contains'".to_string(),
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Eq);
                } else {
                    return Err(Error::Expression(
                        "expected '==' (single '=' is not an operator)".to_string(),
                    ));
                }
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ne);
                } else {
                    return Err(Error::Expression(
                        "expected '!=' (use 'not' for negation)".to_string(),
                    ));
                }
            }
            '<' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => break,
                        Some(ch) => text.push(ch),
                        None => {
                            return Err(Error::Expression(
                                "unterminated string literal".to_string(),
                            ))
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            '-' | '0'..='9' => {
                let mut text = String::new();
                if c == '-' {
                    text.push(c);
                    chars.next();
                    if !matches!(chars.peek(), Some('0'..='9')) {
                        return Err(Error::Expression(
                            "expected a digit after '-'".to_string(),
                        ));
                    }
                }
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number: f64 = text
                    .parse()
                    .map_err(|_| Error::Expression(format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        name.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match name.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "contains" => Token::Contains,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(name),
                });
            }
            other => {
                return Err(Error::Expression(format!(
                    "unexpected character '{}'",
                    other
                )))
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
}

impl CmpOp {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Contains => "contains",
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Literal(Value),
    Field(Vec<String>),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Cmp {
        op: CmpOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
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

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(Error::Expression(format!(
                "expected {} but found {}",
                expected.describe(),
                token.describe()
            ))),
            None => Err(Error::Expression(format!(
                "expected {} but the expression ended",
                expected.describe()
            ))),
        }
    }

    /// expr := and ( "or" and )*
    fn parse_or(&mut self) -> Result<Node> {
        let mut node = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let rhs = self.parse_and()?;
            node = Node::Or(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    /// and := unary ( "and" unary )*
    fn parse_and(&mut self) -> Result<Node> {
        let mut node = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let rhs = self.parse_unary()?;
            node = Node::And(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    /// unary := "not" unary | comparison
    fn parse_unary(&mut self) -> Result<Node> {
        if self.peek() == Some(&Token::Not) {
            self.next();
            let inner = self.parse_unary()?;
            return Ok(Node::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    /// comparison := operand ( cmp-op operand )?
    fn parse_comparison(&mut self) -> Result<Node> {
        let lhs = self.parse_operand()?;

        let op = match self.peek() {
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::Ne) => CmpOp::Ne,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            Some(Token::Contains) => CmpOp::Contains,
            _ => return Ok(lhs),
        };
        self.next();

        let rhs = self.parse_operand()?;
        Ok(Node::Cmp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// operand := literal | field-path | "(" expr ")"
    fn parse_operand(&mut self) -> Result<Node> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Number(n)) => Ok(Node::Literal(
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
            )),
            Some(Token::Str(s)) => Ok(Node::Literal(Value::String(s))),
            Some(Token::True) => Ok(Node::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Node::Literal(Value::Bool(false))),
            Some(Token::Ident(first)) => {
                let mut path = vec![first];
                while self.peek() == Some(&Token::Dot) {
                    self.next();
                    match self.next() {
                        Some(Token::Ident(segment)) => path.push(segment),
                        Some(token) => {
                            return Err(Error::Expression(format!(
                                "expected a field name after '.' but found {}",
                                token.describe()
                            )))
                        }
                        None => {
                            return Err(Error::Expression(
                                "expected a field name after '.'".to_string(),
                            ))
                        }
                    }
                }
                Ok(Node::Field(path))
            }
            Some(token) => Err(Error::Expression(format!(
                "unexpected {}",
                token.describe()
            ))),
            None => Err(Error::Expression(
                "expression ended unexpectedly".to_string(),
            )),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A compiled tag membership expression
#[derive(Debug, Clone)]
pub struct Expression {
    root: Node,
    source: String,
}

impl Expression {
    /// Compile expression source text.
    ///
    /// Syntax errors come back as [`Error::Expression`] and must be surfaced
    /// to the user; a batch is never started with an uncompilable expression.
    pub fn compile(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(Error::Expression("expression is empty".to_string()));
        }

        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_or()?;
        if let Some(trailing) = parser.peek() {
            return Err(Error::Expression(format!(
                "unexpected {} after the end of the expression",
                trailing.describe()
            )));
        }

        Ok(Self {
            root,
            source: source.to_string(),
        })
    }

    /// The original source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against one transaction.
    ///
    /// `Err` here means this transaction could not be evaluated (missing
    /// field, mismatched types) and should be treated as non-matching.
    pub fn matches(&self, txn: &Transaction) -> std::result::Result<bool, EvalError> {
        eval_bool(&self.root, txn)
    }
}

fn eval_bool(node: &Node, txn: &Transaction) -> std::result::Result<bool, EvalError> {
    match node {
        Node::Not(inner) => Ok(!eval_bool(inner, txn)?),
        Node::And(lhs, rhs) => Ok(eval_bool(lhs, txn)? && eval_bool(rhs, txn)?),
        Node::Or(lhs, rhs) => Ok(eval_bool(lhs, txn)? || eval_bool(rhs, txn)?),
        Node::Cmp { op, lhs, rhs } => {
            let lhs = eval_value(lhs, txn)?;
            let rhs = eval_value(rhs, txn)?;
            compare(*op, &lhs, &rhs)
        }
        other => match eval_value(other, txn)? {
            Value::Bool(b) => Ok(b),
            value => Err(EvalError::NotBoolean(type_name(&value))),
        },
    }
}

fn eval_value(node: &Node, txn: &Transaction) -> std::result::Result<Value, EvalError> {
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::Field(path) => txn
            .field(path)
            .cloned()
            .ok_or_else(|| EvalError::MissingField(path.join("."))),
        // Parenthesized boolean sub-expressions used as operands
        other => eval_bool(other, txn).map(Value::Bool),
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> std::result::Result<bool, EvalError> {
    let mismatch = || EvalError::TypeMismatch {
        op: op.as_str(),
        lhs: type_name(lhs),
        rhs: type_name(rhs),
    };

    match op {
        CmpOp::Eq | CmpOp::Ne => {
            let equal = match (lhs, rhs) {
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::String(a), Value::String(b)) => a == b,
                (Value::Number(_), Value::Number(_)) => {
                    num(lhs).ok_or_else(mismatch)? == num(rhs).ok_or_else(mismatch)?
                }
                (Value::Null, Value::Null) => true,
                _ => return Err(mismatch()),
            };
            Ok(if op == CmpOp::Eq { equal } else { !equal })
        }
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ordering = match (lhs, rhs) {
                (Value::Number(_), Value::Number(_)) => num(lhs)
                    .zip(num(rhs))
                    .and_then(|(a, b)| a.partial_cmp(&b))
                    .ok_or_else(mismatch)?,
                // Lexicographic; useful against the raw ISO timestamp strings
                (Value::String(a), Value::String(b)) => a.cmp(b),
                _ => return Err(mismatch()),
            };
            Ok(match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
                _ => unreachable!(),
            })
        }
        CmpOp::Contains => match (lhs, rhs) {
            (Value::String(haystack), Value::String(needle)) => Ok(haystack.contains(needle)),
            _ => Err(mismatch()),
        },
    }
}

fn num(value: &Value) -> Option<f64> {
    value.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transaction;
    use serde_json::json;

    fn txn(raw: serde_json::Value) -> Transaction {
        Transaction::from_raw(raw).unwrap()
    }

    fn online_txn() -> Transaction {
        txn(json!({
            "id": "tx_1",
            "notes": "",
            "created": "2019-03-01T12:00:00.5Z",
            "amount": -750,
            "description": "AMAZON PRIME",
            "merchant": { "online": true, "address": { "country": "GBR" } }
        }))
    }

    fn bare_txn() -> Transaction {
        txn(json!({
            "id": "tx_2",
            "notes": "",
            "created": "2019-03-02T12:00:00Z",
            "amount": 1000
        }))
    }

    #[test]
    fn test_comparison_and_connectives() {
        let expr = Expression::compile("merchant.online == true and amount < -500").unwrap();
        assert!(expr.matches(&online_txn()).unwrap());

        let expr = Expression::compile("amount >= 0 or merchant.online == false").unwrap();
        assert!(!expr.matches(&online_txn()).unwrap());
    }

    #[test]
    fn test_bare_boolean_field() {
        let expr = Expression::compile("merchant.online").unwrap();
        assert!(expr.matches(&online_txn()).unwrap());
    }

    #[test]
    fn test_not_and_parens() {
        let expr =
            Expression::compile("not (merchant.address.country == 'GBR' or amount > 0)").unwrap();
        assert!(!expr.matches(&online_txn()).unwrap());
    }

    #[test]
    fn test_contains() {
        let expr = Expression::compile("description contains 'AMAZON'").unwrap();
        assert!(expr.matches(&online_txn()).unwrap());

        let expr = Expression::compile("description contains 'NETFLIX'").unwrap();
        assert!(!expr.matches(&online_txn()).unwrap());
    }

    #[test]
    fn test_string_ordering_over_raw_timestamps() {
        let expr = Expression::compile("created > '2019-01-01'").unwrap();
        assert!(expr.matches(&online_txn()).unwrap());
    }

    #[test]
    fn test_missing_field_is_skippable() {
        let expr = Expression::compile("merchant.online == true").unwrap();
        let err = expr.matches(&bare_txn()).unwrap_err();
        assert!(matches!(err, EvalError::MissingField(ref path) if path == "merchant.online"));
    }

    #[test]
    fn test_type_mismatch_is_skippable() {
        let expr = Expression::compile("amount contains 'x'").unwrap();
        assert!(matches!(
            expr.matches(&bare_txn()).unwrap_err(),
            EvalError::TypeMismatch { .. }
        ));

        let expr = Expression::compile("description").unwrap();
        let bare = txn(json!({
            "id": "tx_3",
            "created": "2019-03-02T12:00:00Z",
            "description": "COFFEE"
        }));
        assert!(matches!(
            expr.matches(&bare).unwrap_err(),
            EvalError::NotBoolean(_)
        ));
    }

    #[test]
    fn test_syntax_errors_are_config_errors() {
        for bad in [
            "",
            "amount <",
            "amount = 5",
            "merchant..online",
            "(amount < 0",
            "amount < 0 extra",
            "amount ! 5",
            "'unterminated",
            "amount § 5",
        ] {
            let err = Expression::compile(bad).unwrap_err();
            assert!(
                matches!(err, Error::Expression(_)),
                "expected Expression error for {:?}, got {:?}",
                bad,
                err
            );
        }
    }
}

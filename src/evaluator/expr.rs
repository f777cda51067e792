//! Expression syntax tree, parser and interpreter
//!
//! Accepted syntax: `+ - * / **` (with `^` as an alias for `**`), unary minus,
//! parentheses, decimal and scientific numbers, variables `X1..Xn`, free
//! parameters `C` (numbered by appearance) or `C1..Ck` (explicit), and the
//! functions `sin cos exp log sqrt` in any letter case.
//!
//! `**` is right-associative and binds tighter than unary minus, so `-X1**2`
//! reads as `-(X1**2)`.

use std::fmt;

use crate::error::EvaluationError;
use crate::evaluator::Dataset;

/// Unary functions understood by the interpreter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Function {
    Sin,
    Cos,
    Exp,
    Log,
    Sqrt,
}

impl Function {
    /// Lowercase name used when rendering
    pub fn name(self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Sqrt => "sqrt",
        }
    }

    /// Look up a function by name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "exp" => Some(Self::Exp),
            "log" | "ln" => Some(Self::Log),
            "sqrt" => Some(Self::Sqrt),
            _ => None,
        }
    }

    /// Apply to a value without any protection; callers check finiteness
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Exp => x.exp(),
            Self::Log => x.ln(),
            Self::Sqrt => x.sqrt(),
        }
    }
}

/// Binary operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Pow => a.powf(b),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "**",
        }
    }
}

/// Parsed expression
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Num(f64),
    /// Input variable (zero-based)
    Var(usize),
    /// Free parameter slot (zero-based)
    Param(usize),
    /// Negation
    Neg(Box<Expr>),
    /// Binary operation
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Function application
    Call(Function, Box<Expr>),
}

impl Expr {
    /// Parse an expression string
    pub fn parse(source: &str) -> Result<Self, EvaluationError> {
        let lexemes = lex(source)?;
        let mut parser = Parser {
            lexemes,
            pos: 0,
            next_param: 0,
            end: source.len(),
        };
        let expr = parser.sum()?;
        match parser.peek() {
            None => Ok(expr),
            Some((offset, lexeme)) => Err(parse_error(
                *offset,
                format!("unexpected {}", lexeme.describe()),
            )),
        }
    }

    /// Number of parameter slots referenced (highest slot index + 1)
    pub fn param_count(&self) -> usize {
        match self {
            Self::Num(_) | Self::Var(_) => 0,
            Self::Param(i) => i + 1,
            Self::Neg(a) | Self::Call(_, a) => a.param_count(),
            Self::Binary(_, a, b) => a.param_count().max(b.param_count()),
        }
    }

    /// Evaluate at one sample of `dataset`
    pub fn eval(&self, dataset: &Dataset, sample: usize, params: &[f64]) -> Result<f64, EvaluationError> {
        Ok(match self {
            Self::Num(v) => *v,
            Self::Var(i) => dataset
                .value(*i, sample)
                .ok_or(EvaluationError::UnknownVariable {
                    index: i + 1,
                    available: dataset.num_vars(),
                })?,
            Self::Param(i) => params.get(*i).copied().unwrap_or(1.0),
            Self::Neg(a) => -a.eval(dataset, sample, params)?,
            Self::Binary(op, a, b) => {
                op.apply(a.eval(dataset, sample, params)?, b.eval(dataset, sample, params)?)
            }
            Self::Call(f, a) => f.apply(a.eval(dataset, sample, params)?),
        })
    }

    /// Predictions for every sample of `dataset`
    pub fn predict(&self, dataset: &Dataset, params: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        (0..dataset.len())
            .map(|sample| self.eval(dataset, sample, params))
            .collect()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(v) => write!(f, "{}", v),
            Self::Var(i) => write!(f, "X{}", i + 1),
            Self::Param(i) => write!(f, "C{}", i + 1),
            Self::Neg(a) => write!(f, "(-{})", a),
            Self::Binary(op, a, b) => write!(f, "({}{}{})", a, op.symbol(), b),
            Self::Call(func, a) => write!(f, "{}({})", func.name(), a),
        }
    }
}

fn parse_error(offset: usize, message: impl Into<String>) -> EvaluationError {
    EvaluationError::Parse {
        offset,
        message: message.into(),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Lexeme {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Power,
    Slash,
    Open,
    Close,
}

impl Lexeme {
    fn describe(&self) -> String {
        match self {
            Self::Number(v) => format!("number {}", v),
            Self::Ident(name) => format!("identifier '{}'", name),
            Self::Plus => "'+'".to_string(),
            Self::Minus => "'-'".to_string(),
            Self::Star => "'*'".to_string(),
            Self::Power => "'**'".to_string(),
            Self::Slash => "'/'".to_string(),
            Self::Open => "'('".to_string(),
            Self::Close => "')'".to_string(),
        }
    }
}

fn lex(source: &str) -> Result<Vec<(usize, Lexeme)>, EvaluationError> {
    let bytes = source.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => out.push((start, Lexeme::Plus)),
            b'-' => out.push((start, Lexeme::Minus)),
            b'/' => out.push((start, Lexeme::Slash)),
            b'^' => out.push((start, Lexeme::Power)),
            b'(' => out.push((start, Lexeme::Open)),
            b')' => out.push((start, Lexeme::Close)),
            b'*' => {
                if bytes.get(i + 1) == Some(&b'*') {
                    i += 1;
                    out.push((start, Lexeme::Power));
                } else {
                    out.push((start, Lexeme::Star));
                }
            }
            b'0'..=b'9' | b'.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                // Exponent only if digits follow the optional sign
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        while j < bytes.len() && bytes[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text = &source[start..i];
                let value: f64 = text
                    .parse()
                    .map_err(|_| parse_error(start, format!("malformed number '{}'", text)))?;
                out.push((start, Lexeme::Number(value)));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                out.push((start, Lexeme::Ident(source[start..i].to_string())));
                continue;
            }
            _ => {
                return Err(parse_error(
                    start,
                    format!("unexpected character '{}'", source[start..].chars().next().unwrap_or('?')),
                ))
            }
        }
        i += 1;
    }
    Ok(out)
}

struct Parser {
    lexemes: Vec<(usize, Lexeme)>,
    pos: usize,
    next_param: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&(usize, Lexeme)> {
        self.lexemes.get(self.pos)
    }

    fn peek_is(&self, lexeme: &Lexeme) -> bool {
        matches!(self.peek(), Some((_, l)) if l == lexeme)
    }

    fn next(&mut self) -> Option<(usize, Lexeme)> {
        let item = self.lexemes.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn expect_close(&mut self) -> Result<(), EvaluationError> {
        match self.next() {
            Some((_, Lexeme::Close)) => Ok(()),
            Some((offset, l)) => Err(parse_error(offset, format!("expected ')', found {}", l.describe()))),
            None => Err(parse_error(self.end, "expected ')'")),
        }
    }

    fn sum(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.product()?;
        loop {
            let op = if self.peek_is(&Lexeme::Plus) {
                BinaryOp::Add
            } else if self.peek_is(&Lexeme::Minus) {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            self.pos += 1;
            let right = self.product()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn product(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.unary()?;
        loop {
            let op = if self.peek_is(&Lexeme::Star) {
                BinaryOp::Mul
            } else if self.peek_is(&Lexeme::Slash) {
                BinaryOp::Div
            } else {
                return Ok(left);
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, EvaluationError> {
        if self.peek_is(&Lexeme::Minus) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.peek_is(&Lexeme::Plus) {
            self.pos += 1;
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, EvaluationError> {
        let base = self.atom()?;
        if self.peek_is(&Lexeme::Power) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, EvaluationError> {
        let (offset, lexeme) = self
            .next()
            .ok_or_else(|| parse_error(self.end, "unexpected end of expression"))?;
        match lexeme {
            Lexeme::Number(v) => Ok(Expr::Num(v)),
            Lexeme::Open => {
                let inner = self.sum()?;
                self.expect_close()?;
                Ok(inner)
            }
            Lexeme::Ident(name) => self.identifier(offset, &name),
            other => Err(parse_error(offset, format!("unexpected {}", other.describe()))),
        }
    }

    fn identifier(&mut self, offset: usize, name: &str) -> Result<Expr, EvaluationError> {
        if let Some(func) = Function::from_name(name) {
            if !self.peek_is(&Lexeme::Open) {
                return Err(parse_error(offset, format!("expected '(' after {}", name)));
            }
            self.pos += 1;
            let arg = self.sum()?;
            self.expect_close()?;
            return Ok(Expr::Call(func, Box::new(arg)));
        }

        let (head, digits) = name.split_at(1);
        match head {
            "X" | "x" => match digits.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(Expr::Var(n - 1)),
                _ => Err(parse_error(offset, format!("bad variable name '{}'", name))),
            },
            "C" if digits.is_empty() => {
                let slot = self.next_param;
                self.next_param += 1;
                Ok(Expr::Param(slot))
            }
            "C" => match digits.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(Expr::Param(n - 1)),
                _ => Err(parse_error(offset, format!("bad parameter name '{}'", name))),
            },
            _ => Err(parse_error(offset, format!("unknown identifier '{}'", name))),
        }
    }
}

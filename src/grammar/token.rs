//! Grammar tokens
//!
//! A [`Grammar`] is the fixed, ordered id → [`Token`] mapping built once per
//! run from the configured operator list and the number of input variables.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GrammarError;

/// Operator symbols available to the token grammar
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operator {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Exponential
    Exp,
    /// Natural logarithm
    Log,
    /// Cosine
    Cos,
    /// Sine
    Sin,
    /// Square root
    Sqrt,
}

impl Operator {
    /// Default operator list
    pub const DEFAULT: [Operator; 8] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Exp,
        Operator::Log,
        Operator::Cos,
        Operator::Sin,
    ];

    /// Number of operands
    pub fn arity(self) -> usize {
        match self {
            Self::Add | Self::Sub | Self::Mul | Self::Div => 2,
            Self::Exp | Self::Log | Self::Cos | Self::Sin | Self::Sqrt => 1,
        }
    }

    /// Symbolic name
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mul",
            Self::Div => "Div",
            Self::Exp => "Exp",
            Self::Log => "Log",
            Self::Cos => "Cos",
            Self::Sin => "Sin",
            Self::Sqrt => "Sqrt",
        }
    }

    /// Whether this is a trigonometric function
    pub fn is_trig(self) -> bool {
        matches!(self, Self::Sin | Self::Cos)
    }

    /// Render the operator applied to already-rendered operands
    pub fn render(self, args: &[String]) -> String {
        match (self, args) {
            (Self::Add, [a, b]) => format!("({}+{})", a, b),
            (Self::Sub, [a, b]) => format!("({}-{})", a, b),
            (Self::Mul, [a, b]) => format!("({}*{})", a, b),
            (Self::Div, [a, b]) => format!("({}/{})", a, b),
            (Self::Exp, [a]) => format!("exp({})", a),
            (Self::Log, [a]) => format!("log({})", a),
            (Self::Cos, [a]) => format!("cos({})", a),
            (Self::Sin, [a]) => format!("sin({})", a),
            (Self::Sqrt, [a]) => format!("sqrt({})", a),
            (op, args) => unreachable!("{} rendered with {} operands", op.name(), args.len()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a token stands for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Operator node
    Op(Operator),
    /// Input variable (zero-based, rendered `X{i+1}`)
    Var(usize),
    /// Free parameter slot, rendered `C`
    Const,
}

impl TokenKind {
    /// Number of children this token takes
    pub fn arity(self) -> usize {
        match self {
            Self::Op(op) => op.arity(),
            Self::Var(_) | Self::Const => 0,
        }
    }

    /// Leaf token (variable or parameter)
    pub fn is_terminal(self) -> bool {
        self.arity() == 0
    }

    /// Trigonometric class
    pub fn is_trig(self) -> bool {
        matches!(self, Self::Op(op) if op.is_trig())
    }

    /// Constant-slot class
    pub fn is_const(self) -> bool {
        matches!(self, Self::Const)
    }

    /// Render a leaf; operators go through [`Operator::render`]
    pub fn leaf_symbol(self) -> Option<String> {
        match self {
            Self::Var(i) => Some(format!("X{}", i + 1)),
            Self::Const => Some("C".to_string()),
            Self::Op(_) => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Op(op) => write!(f, "{}", op),
            Self::Var(i) => write!(f, "X{}", i + 1),
            Self::Const => f.write_str("C"),
        }
    }
}

/// A grammar symbol with its id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    /// Position in the grammar
    pub id: usize,
    /// Symbol
    pub kind: TokenKind,
}

impl Token {
    /// Number of children
    pub fn arity(&self) -> usize {
        self.kind.arity()
    }
}

/// Immutable token dictionary
///
/// Ids are assigned deterministically: configured operators first (in
/// configuration order, duplicates dropped), then one id per input variable,
/// then the free-parameter token when enabled.
#[derive(Clone, Debug, PartialEq)]
pub struct Grammar {
    tokens: Vec<Token>,
    num_vars: usize,
    const_id: Option<usize>,
}

impl Grammar {
    /// Build the token dictionary
    pub fn new(operators: &[Operator], num_vars: usize, has_const: bool) -> Self {
        let mut kinds: Vec<TokenKind> = Vec::with_capacity(operators.len() + num_vars + 1);
        for &op in operators {
            if !kinds.contains(&TokenKind::Op(op)) {
                kinds.push(TokenKind::Op(op));
            }
        }
        kinds.extend((0..num_vars).map(TokenKind::Var));
        if has_const {
            kinds.push(TokenKind::Const);
        }

        let tokens: Vec<Token> = kinds
            .into_iter()
            .enumerate()
            .map(|(id, kind)| Token { id, kind })
            .collect();
        let const_id = tokens.iter().find(|t| t.kind.is_const()).map(|t| t.id);

        Self {
            tokens,
            num_vars,
            const_id,
        }
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the grammar has no tokens
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of input variables
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Id of the free-parameter token, if enabled
    pub fn const_id(&self) -> Option<usize> {
        self.const_id
    }

    /// Look up a token
    pub fn get(&self, id: usize) -> Option<&Token> {
        self.tokens.get(id)
    }

    /// Look up a token, failing on unknown ids
    pub fn token(&self, id: usize) -> Result<&Token, GrammarError> {
        self.tokens.get(id).ok_or(GrammarError::UnknownToken {
            id,
            len: self.tokens.len(),
        })
    }

    /// All tokens in id order
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Ids of leaf tokens
    pub fn terminal_ids(&self) -> Vec<usize> {
        self.tokens
            .iter()
            .filter(|t| t.kind.is_terminal())
            .map(|t| t.id)
            .collect()
    }

    /// Ids of operator tokens
    pub fn operator_ids(&self) -> Vec<usize> {
        self.tokens
            .iter()
            .filter(|t| !t.kind.is_terminal())
            .map(|t| t.id)
            .collect()
    }

    /// Id of the given symbol, if present
    pub fn id_of(&self, kind: TokenKind) -> Option<usize> {
        self.tokens.iter().find(|t| t.kind == kind).map(|t| t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_id_assignment() {
        let grammar = Grammar::new(&[Operator::Add, Operator::Sin], 2, true);
        assert_eq!(grammar.len(), 5);
        assert_eq!(grammar.get(0).unwrap().kind, TokenKind::Op(Operator::Add));
        assert_eq!(grammar.get(1).unwrap().kind, TokenKind::Op(Operator::Sin));
        assert_eq!(grammar.get(2).unwrap().kind, TokenKind::Var(0));
        assert_eq!(grammar.get(3).unwrap().kind, TokenKind::Var(1));
        assert_eq!(grammar.get(4).unwrap().kind, TokenKind::Const);
        assert_eq!(grammar.const_id(), Some(4));
    }

    #[test]
    fn test_grammar_without_const() {
        let grammar = Grammar::new(&[Operator::Mul], 1, false);
        assert_eq!(grammar.len(), 2);
        assert_eq!(grammar.const_id(), None);
        assert_eq!(grammar.terminal_ids(), vec![1]);
        assert_eq!(grammar.operator_ids(), vec![0]);
    }

    #[test]
    fn test_grammar_drops_duplicate_operators() {
        let grammar = Grammar::new(&[Operator::Add, Operator::Add, Operator::Mul], 1, false);
        assert_eq!(grammar.operator_ids(), vec![0, 1]);
    }

    #[test]
    fn test_grammar_unknown_token() {
        let grammar = Grammar::new(&[Operator::Add], 1, false);
        assert_eq!(
            grammar.token(7),
            Err(GrammarError::UnknownToken { id: 7, len: 2 })
        );
    }

    #[test]
    fn test_operator_render() {
        let args = vec!["X1".to_string(), "C".to_string()];
        assert_eq!(Operator::Add.render(&args), "(X1+C)");
        assert_eq!(Operator::Div.render(&args), "(X1/C)");
        assert_eq!(Operator::Sin.render(&args[..1]), "sin(X1)");
    }

    #[test]
    fn test_token_kind_classes() {
        assert!(TokenKind::Op(Operator::Cos).is_trig());
        assert!(!TokenKind::Op(Operator::Exp).is_trig());
        assert!(TokenKind::Const.is_const());
        assert!(TokenKind::Var(0).is_terminal());
        assert_eq!(TokenKind::Var(2).to_string(), "X3");
    }

    #[test]
    fn test_operator_serde_names() {
        let ops: Vec<Operator> = serde_json::from_str(r#"["Add","Sqrt"]"#).unwrap();
        assert_eq!(ops, vec![Operator::Add, Operator::Sqrt]);
    }
}

//! Outer-form discovery
//!
//! Looks at the best candidates found so far and proposes a skeleton that
//! later search rounds wrap their expressions in: a shared multiplicative
//! factor `(A)*`, a shared power base `(A)**`, or a shared sum `A+`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MsdbConfig;

/// Best errors below this carry no outer structure worth extracting
pub const ERROR_FLOOR: f64 = 1e-99;

/// Outer-form families
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormType {
    Add,
    Mul,
    Pow,
}

/// A discovered skeleton
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OuterForm {
    pub kind: FormType,
    /// Prefix text, e.g. `(C*X1)*`
    pub text: String,
}

/// One candidate expression offered to [`Msdb::get_form`]
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Prefix token sequence that produced the expression
    pub tokens: Vec<usize>,
    /// Training error of the candidate
    pub error: f64,
    /// Canonical expression with `C` placeholders
    pub expression: String,
    /// How many times the sequence was produced
    pub count: usize,
}

/// Wrap `expression` in `form`; an empty form leaves it untouched
pub fn apply_form(form: &str, expression: &str) -> String {
    if form.is_empty() {
        expression.to_string()
    } else {
        format!("{}({})", form, expression)
    }
}

/// Split an expression into its top-level additive terms
///
/// Splitting happens at `+` and `-` outside any bracket. A `-` stays attached
/// to the term it negates, a leading `+` is dropped and whitespace is removed.
pub fn split_terms(expression: &str) -> BTreeSet<String> {
    let mut terms = BTreeSet::new();
    let mut current = String::new();
    let mut nesting = 0i32;
    for c in expression.chars() {
        match c {
            '(' | '[' | '{' => nesting += 1,
            ')' | ']' | '}' => nesting -= 1,
            _ => {}
        }
        if (c == '+' || c == '-') && nesting == 0 && !is_unary_position(&current) {
            terms.insert(std::mem::take(&mut current));
        }
        if !c.is_whitespace() {
            current.push(c);
        }
    }
    terms.insert(current);
    terms
        .into_iter()
        .map(|t| t.strip_prefix('+').map(str::to_string).unwrap_or(t))
        .filter(|t| !t.is_empty())
        .collect()
}

/// A sign right after an operator or a number's exponent marker is not a
/// term boundary
fn is_unary_position(current: &str) -> bool {
    let mut tail = current.chars().rev();
    match tail.next() {
        Some('*' | '/' | '^') => true,
        Some('e' | 'E') => tail.next().map_or(false, |c| c.is_ascii_digit() || c == '.'),
        _ => false,
    }
}

fn is_linear_term(term: &str) -> bool {
    if term == "C" {
        return true;
    }
    term.strip_prefix("C*X")
        .map_or(false, |index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
}

fn compact(expression: &str) -> String {
    expression.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Subtree discovery over batches of candidates
#[derive(Clone, Debug)]
pub struct Msdb {
    config: MsdbConfig,
}

impl Msdb {
    /// Create an extractor trying the forms enabled in `config`
    pub fn new(config: MsdbConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MsdbConfig {
        &self.config
    }

    /// Try the enabled forms in the order multiplicative, power, additive
    ///
    /// Returns `None` when no form applies or when the best error is already
    /// below [`ERROR_FLOOR`].
    pub fn get_form(&self, candidates: &[Candidate]) -> Option<OuterForm> {
        let mut sorted: Vec<&Candidate> = candidates.iter().collect();
        sorted.sort_by(|a, b| {
            a.error
                .total_cmp(&b.error)
                .then_with(|| a.expression.cmp(&b.expression))
                .then_with(|| a.tokens.cmp(&b.tokens))
        });
        let best = sorted.first()?.error;
        if best.abs() < ERROR_FLOOR {
            return None;
        }

        let enabled = |kind: FormType| self.config.form_types.contains(&kind);
        let mut form = None;
        if enabled(FormType::Mul) {
            form = Self::multiplicative(&sorted);
        }
        if form.is_none() && enabled(FormType::Pow) {
            form = Self::power(&sorted);
        }
        if form.is_none() && enabled(FormType::Add) {
            form = self.additive(&sorted);
        }

        if let Some(form) = &form {
            debug!(kind = ?form.kind, form = %form.text, best_error = best, "outer form found");
        }
        form
    }

    /// First candidate made only of `C` and `C*X<n>` terms, with at least one
    /// variable term
    fn multiplicative(sorted: &[&Candidate]) -> Option<OuterForm> {
        sorted.iter().find_map(|candidate| {
            let terms = split_terms(&candidate.expression);
            let linear = !terms.is_empty()
                && terms.iter().all(|t| is_linear_term(t))
                && terms.iter().any(|t| t != "C");
            linear.then(|| OuterForm {
                kind: FormType::Mul,
                text: format!("({})*", compact(&candidate.expression)),
            })
        })
    }

    /// First candidate whose terms are all powers of one short base
    fn power(sorted: &[&Candidate]) -> Option<OuterForm> {
        sorted.iter().find_map(|candidate| {
            let terms = split_terms(&candidate.expression);
            let mut bases = terms.iter().map(|t| t.split_once("**").map(|(base, _)| base));
            let first = bases.next()??;
            let short = !first.is_empty()
                && first.len() <= 3
                && !first.contains(&['(', ')', '-'][..]);
            (short && bases.all(|b| b == Some(first))).then(|| OuterForm {
                kind: FormType::Pow,
                text: format!("({})**", first),
            })
        })
    }

    /// Sub-terms shared by enough of the best candidates
    fn additive(&self, sorted: &[&Candidate]) -> Option<OuterForm> {
        let considered = &sorted[..sorted.len().min(self.config.max_used_expr_num)];
        let best = considered.first()?.error;

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut used = 0usize;
        for (index, candidate) in considered.iter().enumerate() {
            if best / candidate.error > self.config.expr_ratio || index <= 1 {
                for term in split_terms(&candidate.expression) {
                    *counts.entry(term).or_insert(0) += candidate.count;
                }
                used += 1;
            }
        }

        let threshold = used as f64 * self.config.token_ratio;
        let mut text = String::new();
        for (term, _) in counts.iter().filter(|(_, &n)| n as f64 >= threshold) {
            if !term.starts_with('-') {
                text.push('+');
            }
            text.push_str(term);
        }
        if text.is_empty() {
            return None;
        }
        let text = text.strip_prefix('+').unwrap_or(&text);
        Some(OuterForm {
            kind: FormType::Add,
            text: format!("{}+", text),
        })
    }
}

pub mod prelude {
    pub use super::{apply_form, split_terms, Candidate, FormType, Msdb, OuterForm};
}

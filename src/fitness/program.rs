//! Program cost

use crate::context::SearchContext;
use crate::fitness::traits::Fitness;
use crate::genome::program::Program;
use crate::grammar::{Constraints, ExprTree, Grammar, MIN_EXPRESSION_LEN};
use crate::msdb::apply_form;

/// `discount^(-len) * error` for programs the grammar accepts
///
/// The sequence is replayed token by token through the availability rules
/// first; a rejected, unfinished or too-short program costs `f64::INFINITY`
/// without reaching the evaluator.
pub struct ProgramFitness<'a> {
    grammar: &'a Grammar,
    constraints: Constraints,
    ctx: &'a SearchContext,
    form: &'a str,
    discount: f64,
}

impl<'a> ProgramFitness<'a> {
    pub fn new(
        grammar: &'a Grammar,
        constraints: Constraints,
        ctx: &'a SearchContext,
        form: &'a str,
        discount: f64,
    ) -> Self {
        Self {
            grammar,
            constraints,
            ctx,
            form,
            discount,
        }
    }

    /// Rebuild the tree, or `None` if any token breaks the rules
    pub fn validate(&self, tokens: &[usize]) -> Option<ExprTree> {
        let mut tree = ExprTree::prefix();
        for &id in tokens {
            let token = self.grammar.get(id)?;
            if tree.is_full() || !self.constraints.allows(&tree, token.kind) {
                return None;
            }
            tree.add(token).ok()?;
        }
        tree.is_full().then_some(tree)
    }
}

impl Fitness for ProgramFitness<'_> {
    type Genome = Program;

    fn evaluate(&self, genome: &Program) -> f64 {
        let length = genome.len();
        if length <= MIN_EXPRESSION_LEN {
            return f64::INFINITY;
        }
        let Some(expression) = self
            .validate(genome.tokens())
            .and_then(|tree| tree.expression().ok())
        else {
            return f64::INFINITY;
        };
        let error = self.ctx.score(&apply_form(self.form, &expression));
        self.discount.powi(-(length as i32)) * error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{Dataset, NumericEvaluator};
    use crate::grammar::Operator;

    fn context() -> SearchContext {
        let x: Vec<f64> = (1..=6).map(f64::from).collect();
        let t: Vec<f64> = x.iter().map(|v| v * v + v).collect();
        let data = Dataset::new(vec![x], t).unwrap();
        SearchContext::new(Box::new(NumericEvaluator::default()), data.clone(), data, true, -1.0)
    }

    fn grammar() -> Grammar {
        // 0 Add, 1 Mul, 2 Sin, 3 Cos, 4 X1, 5 C
        Grammar::new(&[Operator::Add, Operator::Mul, Operator::Sin, Operator::Cos], 1, true)
    }

    #[test]
    fn test_exact_program_costs_nothing() {
        let g = grammar();
        let ctx = context();
        let fitness = ProgramFitness::new(&g, Constraints::new(5, 10), &ctx, "", 0.99);
        // Add(Mul(X1, X1), Add(X1, C)) fits x^2 + x with C = 0
        let cost = fitness.evaluate(&Program::new(vec![0, 1, 4, 4, 0, 4, 5]));
        assert!(cost < 1e-6, "cost {}", cost);
        assert_eq!(ctx.evaluations(), 1);
    }

    #[test]
    fn test_cost_scales_with_length() {
        let g = grammar();
        let ctx = context();
        let fitness = ProgramFitness::new(&g, Constraints::new(5, 10), &ctx, "", 0.5);
        // Add(Mul(X1, X1), Mul(X1, X1)) misses by x^2 - x, 70 in total
        let cost = fitness.evaluate(&Program::new(vec![0, 1, 4, 4, 1, 4, 4]));
        let error = 70.0f64 * 70.0 / 6.0;
        assert!((cost - error * 2f64.powi(7)).abs() < 1e-6, "cost {}", cost);
    }

    #[test]
    fn test_rejected_programs_skip_evaluator() {
        let g = grammar();
        let ctx = context();
        let fitness = ProgramFitness::new(&g, Constraints::new(1, 10), &ctx, "", 0.99);
        let rejected = [
            // too short
            vec![0, 4, 5],
            // Sin under Cos
            vec![3, 0, 2, 4, 4, 4],
            // two constants with a budget of one
            vec![0, 1, 5, 4, 0, 5, 4],
            // trailing token after a full tree
            vec![0, 1, 4, 4, 0, 4, 4, 4],
            // unfinished
            vec![0, 1, 4, 4, 0, 4],
        ];
        for tokens in rejected {
            assert_eq!(fitness.evaluate(&Program::new(tokens)), f64::INFINITY);
        }
        assert_eq!(ctx.evaluations(), 0);
    }

    #[test]
    fn test_form_is_applied() {
        let g = grammar();
        let ctx = context();
        let bare = ProgramFitness::new(&g, Constraints::new(5, 10), &ctx, "", 0.99);
        let wrapped = ProgramFitness::new(&g, Constraints::new(5, 10), &ctx, "X1+", 0.99);
        // Mul(X1, Add(X1, Mul(C, C))) is x^2 + Cx; with the form it needs C = 0
        let program = Program::new(vec![1, 4, 0, 4, 1, 5, 5]);
        assert!(bare.evaluate(&program) < 1e-6);
        assert!(wrapped.evaluate(&program) < 1e-6);
        let off = Program::new(vec![0, 1, 4, 4, 1, 4, 4]);
        assert!(wrapped.evaluate(&off) > bare.evaluate(&off));
    }
}

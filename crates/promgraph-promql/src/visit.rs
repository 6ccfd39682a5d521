//! Visitor pattern for PromQL expression trees.
//!
//! The visitor follows a two-method dispatch:
//! 1. `visit_node(expr)` routes on [`ExprKind`](crate::ExprKind) to a kind-specific method
//! 2. Kind-specific methods (`visit_call`, `visit_vector_selector`, ...) can be
//!    overridden; their defaults delegate to `visit_children`
//!
//! Traversal is depth-first in source order. Overriding a method without calling
//! `visit_children` prunes the subtree below that node.
//!
//! ```rust
//! use promgraph_promql::{ExprVisitor, VectorSelector, parse_expr, walk_expr};
//!
//! #[derive(Default)]
//! struct Names(Vec<String>);
//!
//! impl<'e> ExprVisitor<'e> for Names {
//!     fn visit_vector_selector(&mut self, selector: &'e VectorSelector) {
//!         if let Some(name) = selector.name() {
//!             self.0.push(name.to_string());
//!         }
//!     }
//! }
//!
//! let expr = parse_expr("a + rate(b[5m])").unwrap();
//! let mut names = Names::default();
//! walk_expr(&mut names, &expr);
//! assert_eq!(names.0, vec!["a", "b"]);
//! ```

use crate::ast::{
    AggregateExpr, BinaryExpr, Call, Expr, MatrixSelector, ParenExpr, SubqueryExpr, UnaryExpr,
    VectorSelector,
};

/// Generic visitor over an [`Expr`] tree.
///
/// `'e` is the lifetime of the tree being visited, so implementors may keep
/// references into it.
pub trait ExprVisitor<'e> {
    /// Visits all direct sub-expressions of `expr` in order.
    fn visit_children(&mut self, expr: &'e Expr) {
        for child in expr.children() {
            self.visit_node(child);
        }
    }

    fn visit_number(&mut self, _value: f64) {}

    fn visit_string(&mut self, _value: &'e str) {}

    /// Series reference. Leaf of the tree.
    fn visit_vector_selector(&mut self, _selector: &'e VectorSelector) {}

    /// Range selector. The default forwards the inner selector to
    /// `visit_vector_selector`, so collectors only need to handle one of them.
    fn visit_matrix_selector(&mut self, selector: &'e MatrixSelector) {
        self.visit_vector_selector(&selector.selector);
    }

    fn visit_subquery(&mut self, expr: &'e Expr, _node: &'e SubqueryExpr) {
        self.visit_children(expr);
    }

    fn visit_call(&mut self, expr: &'e Expr, _node: &'e Call) {
        self.visit_children(expr);
    }

    fn visit_aggregate(&mut self, expr: &'e Expr, _node: &'e AggregateExpr) {
        self.visit_children(expr);
    }

    fn visit_binary(&mut self, expr: &'e Expr, _node: &'e BinaryExpr) {
        self.visit_children(expr);
    }

    fn visit_unary(&mut self, expr: &'e Expr, _node: &'e UnaryExpr) {
        self.visit_children(expr);
    }

    fn visit_paren(&mut self, expr: &'e Expr, _node: &'e ParenExpr) {
        self.visit_children(expr);
    }

    /// Dispatches on the node's [`ExprKind`](crate::ExprKind).
    ///
    /// - `ExprKind::VectorSelector` → `visit_vector_selector()`
    /// - `ExprKind::MatrixSelector` → `visit_matrix_selector()`
    /// - `ExprKind::Call` → `visit_call()`
    /// - composite kinds → their `visit_*` method, which recurses by default
    fn visit_node(&mut self, expr: &'e Expr) {
        match expr {
            Expr::NumberLiteral(value) => self.visit_number(*value),
            Expr::StringLiteral(value) => self.visit_string(value),
            Expr::VectorSelector(node) => self.visit_vector_selector(node),
            Expr::MatrixSelector(node) => self.visit_matrix_selector(node),
            Expr::Subquery(node) => self.visit_subquery(expr, node),
            Expr::Call(node) => self.visit_call(expr, node),
            Expr::Aggregate(node) => self.visit_aggregate(expr, node),
            Expr::Binary(node) => self.visit_binary(expr, node),
            Expr::Unary(node) => self.visit_unary(expr, node),
            Expr::Paren(node) => self.visit_paren(expr, node),
        }
    }
}

/// Walks `expr` depth-first with `visitor`.
pub fn walk_expr<'e, V>(visitor: &mut V, expr: &'e Expr)
where
    V: ExprVisitor<'e> + ?Sized,
{
    visitor.visit_node(expr);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parse_expr;

    #[derive(Default)]
    struct Recorder {
        kinds: Vec<String>,
        selectors: Vec<String>,
    }

    impl<'e> ExprVisitor<'e> for Recorder {
        fn visit_node(&mut self, expr: &'e Expr) {
            self.kinds.push(expr.kind().to_string());
            match expr {
                Expr::VectorSelector(node) => self.visit_vector_selector(node),
                Expr::MatrixSelector(node) => self.visit_matrix_selector(node),
                _ => self.visit_children(expr),
            }
        }

        fn visit_vector_selector(&mut self, selector: &'e VectorSelector) {
            self.selectors
                .push(Expr::VectorSelector(selector.clone()).to_string());
        }
    }

    #[test]
    fn test_visits_in_source_order() {
        let expr = parse_expr(r#"sum(rate(a[5m])) / on(job) b{env="prod"}"#).unwrap();
        let mut recorder = Recorder::default();
        walk_expr(&mut recorder, &expr);
        assert_eq!(
            recorder.kinds,
            vec!["binary", "aggregate", "call", "matrix_selector", "vector_selector"]
        );
        assert_eq!(recorder.selectors, vec!["a", r#"b{env="prod"}"#]);
    }

    #[test]
    fn test_default_traversal_reaches_subquery_and_params() {
        struct Names(Vec<String>);
        impl<'e> ExprVisitor<'e> for Names {
            fn visit_vector_selector(&mut self, selector: &'e VectorSelector) {
                self.0.extend(selector.name().map(str::to_string));
            }
        }

        let expr =
            parse_expr("quantile(scalar(q), -max_over_time((x offset 1m)[1h:5m]))").unwrap();
        let mut names = Names(Vec::new());
        walk_expr(&mut names, &expr);
        assert_eq!(names.0, vec!["q", "x"]);
    }

    #[test]
    fn test_pruning() {
        struct SkipCalls(usize);
        impl<'e> ExprVisitor<'e> for SkipCalls {
            fn visit_call(&mut self, _expr: &'e Expr, _node: &'e Call) {}
            fn visit_vector_selector(&mut self, _selector: &'e VectorSelector) {
                self.0 += 1;
            }
        }

        let expr = parse_expr("a + abs(b) + c").unwrap();
        let mut counter = SkipCalls(0);
        walk_expr(&mut counter, &expr);
        assert_eq!(counter.0, 2);
    }
}

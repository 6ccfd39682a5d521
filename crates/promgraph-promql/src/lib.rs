//! PromQL expression parsing for promgraph.
//!
//! The parser turns a query string into an [`Expr`] tree. Consumers walk the
//! tree with an [`ExprVisitor`]; the series references they usually care
//! about are [`VectorSelector`] nodes, which carry an optional metric name
//! and a list of [`LabelMatcher`]s.
//!
//! ```rust
//! use promgraph_promql::parse_expr;
//!
//! let expr = parse_expr("sum by (job) (rate(http_requests_total[5m]))").unwrap();
//! assert_eq!(expr.kind().to_string(), "aggregate");
//! ```

pub mod ast;
pub mod duration;
pub mod functions;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod visit;

pub use ast::{
    AggregateExpr, AggregateOp, AtModifier, BinaryExpr, BinaryOp, Call, Expr, ExprKind,
    GroupModifier, Grouping, MatchingLabels, MatrixSelector, Offset, ParenExpr, SubqueryExpr,
    UnaryExpr, UnaryOp, VectorMatching, VectorSelector,
};
pub use duration::{format_duration, parse_duration};
pub use matcher::{LabelMatcher, MatchKind};
pub use parser::{Parser, parse_expr};
pub use visit::{ExprVisitor, walk_expr};

/// Metric name of the synthetic series Prometheus exposes for alert state.
pub const ALERTS_METRIC: &str = "ALERTS";

/// Label carrying the alert name on `ALERTS` series.
pub const ALERTNAME_LABEL: &str = "alertname";

/// Reserved label holding the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

//! PromQL expression tree.
//!
//! Every node kind is a variant of [`Expr`]. Series references are
//! [`VectorSelector`]s, either standing alone or wrapped in a
//! [`MatrixSelector`] when a range is attached.

use std::fmt;
use std::time::Duration;

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::duration::format_duration;
use crate::matcher::LabelMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ExprKind {
    NumberLiteral,
    StringLiteral,
    VectorSelector,
    MatrixSelector,
    Subquery,
    Call,
    Aggregate,
    Binary,
    Unary,
    Paren,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    NumberLiteral(f64),
    StringLiteral(String),
    VectorSelector(VectorSelector),
    MatrixSelector(MatrixSelector),
    Subquery(SubqueryExpr),
    Call(Call),
    Aggregate(AggregateExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Paren(ParenExpr),
}

impl Expr {
    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::NumberLiteral(_) => ExprKind::NumberLiteral,
            Expr::StringLiteral(_) => ExprKind::StringLiteral,
            Expr::VectorSelector(_) => ExprKind::VectorSelector,
            Expr::MatrixSelector(_) => ExprKind::MatrixSelector,
            Expr::Subquery(_) => ExprKind::Subquery,
            Expr::Call(_) => ExprKind::Call,
            Expr::Aggregate(_) => ExprKind::Aggregate,
            Expr::Binary(_) => ExprKind::Binary,
            Expr::Unary(_) => ExprKind::Unary,
            Expr::Paren(_) => ExprKind::Paren,
        }
    }

    /// Direct sub-expressions in source order.
    ///
    /// Selectors are leaves: the vector selector inside a matrix selector is
    /// not an `Expr` and is reached through `ExprVisitor::visit_matrix_selector`.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::NumberLiteral(_)
            | Expr::StringLiteral(_)
            | Expr::VectorSelector(_)
            | Expr::MatrixSelector(_) => Vec::new(),
            Expr::Subquery(node) => vec![node.expr.as_ref()],
            Expr::Call(node) => node.args.iter().collect(),
            Expr::Aggregate(node) => {
                let mut children = Vec::with_capacity(2);
                if let Some(param) = &node.param {
                    children.push(param.as_ref());
                }
                children.push(node.expr.as_ref());
                children
            }
            Expr::Binary(node) => vec![node.lhs.as_ref(), node.rhs.as_ref()],
            Expr::Unary(node) => vec![node.expr.as_ref()],
            Expr::Paren(node) => vec![node.expr.as_ref()],
        }
    }

    pub fn as_vector_selector(&self) -> Option<&VectorSelector> {
        match self {
            Expr::VectorSelector(vs) => Some(vs),
            _ => None,
        }
    }
}

/// A series reference: `name{matchers}` or `{matchers}`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSelector {
    pub name: Option<String>,
    pub matchers: Vec<LabelMatcher>,
    pub offset: Option<Offset>,
    pub at: Option<AtModifier>,
}

impl VectorSelector {
    pub fn new(name: Option<String>, matchers: Vec<LabelMatcher>) -> Self {
        Self {
            name,
            matchers,
            offset: None,
            at: None,
        }
    }

    /// Metric name written in front of the braces, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Matchers on the given label, in source order.
    pub fn matchers_for<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a LabelMatcher> {
        self.matchers.iter().filter(move |m| m.name() == label)
    }

    fn fmt_selector(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            write!(f, "{name}")?;
        }
        if !self.matchers.is_empty() || self.name().is_none() {
            write!(f, "{{")?;
            for (i, matcher) in self.matchers.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{matcher}")?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }

    fn fmt_modifiers(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_modifiers(f, self.offset.as_ref(), self.at.as_ref())
    }
}

/// A vector selector with a range: `name{matchers}[5m]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSelector {
    pub selector: VectorSelector,
    pub range: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryExpr {
    pub expr: Box<Expr>,
    pub range: Duration,
    pub step: Option<Duration>,
    pub offset: Option<Offset>,
    pub at: Option<AtModifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub func: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AggregateOp {
    Sum,
    Avg,
    Count,
    Min,
    Max,
    Group,
    Stddev,
    Stdvar,
    Topk,
    Bottomk,
    CountValues,
    Quantile,
    Limitk,
    LimitRatio,
}

impl AggregateOp {
    /// Case-insensitive lookup, as PromQL keywords are.
    pub fn from_ident(ident: &str) -> Option<Self> {
        ident.to_ascii_lowercase().parse().ok()
    }

    /// Whether the operator takes a leading parameter (`topk(5, x)`).
    pub fn takes_param(self) -> bool {
        matches!(
            self,
            AggregateOp::Topk
                | AggregateOp::Bottomk
                | AggregateOp::CountValues
                | AggregateOp::Quantile
                | AggregateOp::Limitk
                | AggregateOp::LimitRatio
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    By(Vec<String>),
    Without(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub op: AggregateOp,
    pub param: Option<Box<Expr>>,
    pub expr: Box<Expr>,
    pub grouping: Option<Grouping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr, Display)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "^")]
    Pow,
    #[strum(serialize = "atan2")]
    Atan2,
    #[strum(serialize = "==")]
    Eql,
    #[strum(serialize = "!=")]
    Neq,
    #[strum(serialize = ">")]
    Gtr,
    #[strum(serialize = "<")]
    Lss,
    #[strum(serialize = ">=")]
    Gte,
    #[strum(serialize = "<=")]
    Lte,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "unless")]
    Unless,
}

impl BinaryOp {
    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And | BinaryOp::Unless => 2,
            BinaryOp::Eql
            | BinaryOp::Neq
            | BinaryOp::Gtr
            | BinaryOp::Lss
            | BinaryOp::Gte
            | BinaryOp::Lte => 3,
            BinaryOp::Add | BinaryOp::Sub => 4,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Atan2 => 5,
            BinaryOp::Pow => 6,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        self == BinaryOp::Pow
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }

    pub fn is_set_operator(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Unless)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchingLabels {
    On(Vec<String>),
    Ignoring(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupModifier {
    Left(Vec<String>),
    Right(Vec<String>),
}

/// `on(...)`/`ignoring(...)` with an optional `group_left`/`group_right`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorMatching {
    pub labels: MatchingLabels,
    pub group: Option<GroupModifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub return_bool: bool,
    pub matching: Option<VectorMatching>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UnaryOp {
    #[strum(serialize = "-")]
    Neg,
    #[strum(serialize = "+")]
    Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParenExpr {
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub duration: Duration,
    pub negative: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AtModifier {
    Timestamp(f64),
    Start,
    End,
}

fn fmt_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        write!(f, "NaN")
    } else if value.is_infinite() {
        write!(f, "{}Inf", if value > 0.0 { "+" } else { "-" })
    } else {
        write!(f, "{value}")
    }
}

fn fmt_labels(f: &mut fmt::Formatter<'_>, labels: &[String]) -> fmt::Result {
    write!(f, "({})", labels.join(", "))
}

fn fmt_modifiers(
    f: &mut fmt::Formatter<'_>,
    offset: Option<&Offset>,
    at: Option<&AtModifier>,
) -> fmt::Result {
    if let Some(at) = at {
        match at {
            AtModifier::Timestamp(ts) => {
                write!(f, " @ ")?;
                fmt_number(f, *ts)?;
            }
            AtModifier::Start => write!(f, " @ start()")?,
            AtModifier::End => write!(f, " @ end()")?,
        }
    }
    if let Some(offset) = offset {
        let sign = if offset.negative { "-" } else { "" };
        write!(f, " offset {}{}", sign, format_duration(offset.duration))?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::NumberLiteral(value) => fmt_number(f, *value),
            Expr::StringLiteral(value) => write!(f, "{value:?}"),
            Expr::VectorSelector(vs) => {
                vs.fmt_selector(f)?;
                vs.fmt_modifiers(f)
            }
            Expr::MatrixSelector(ms) => {
                ms.selector.fmt_selector(f)?;
                write!(f, "[{}]", format_duration(ms.range))?;
                ms.selector.fmt_modifiers(f)
            }
            Expr::Subquery(sq) => {
                write!(f, "{}[{}:", sq.expr, format_duration(sq.range))?;
                if let Some(step) = sq.step {
                    write!(f, "{}", format_duration(step))?;
                }
                write!(f, "]")?;
                fmt_modifiers(f, sq.offset.as_ref(), sq.at.as_ref())
            }
            Expr::Call(call) => {
                write!(f, "{}(", call.func)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::Aggregate(agg) => {
                write!(f, "{}", agg.op)?;
                match &agg.grouping {
                    Some(Grouping::By(labels)) => {
                        write!(f, " by ")?;
                        fmt_labels(f, labels)?;
                        write!(f, " ")?;
                    }
                    Some(Grouping::Without(labels)) => {
                        write!(f, " without ")?;
                        fmt_labels(f, labels)?;
                        write!(f, " ")?;
                    }
                    None => {}
                }
                write!(f, "(")?;
                if let Some(param) = &agg.param {
                    write!(f, "{param}, ")?;
                }
                write!(f, "{})", agg.expr)
            }
            Expr::Binary(bin) => {
                write!(f, "{} {}", bin.lhs, bin.op)?;
                if bin.return_bool {
                    write!(f, " bool")?;
                }
                if let Some(matching) = &bin.matching {
                    match &matching.labels {
                        MatchingLabels::On(labels) => {
                            write!(f, " on")?;
                            fmt_labels(f, labels)?;
                        }
                        MatchingLabels::Ignoring(labels) => {
                            write!(f, " ignoring")?;
                            fmt_labels(f, labels)?;
                        }
                    }
                    match &matching.group {
                        Some(GroupModifier::Left(labels)) => {
                            write!(f, " group_left")?;
                            fmt_labels(f, labels)?;
                        }
                        Some(GroupModifier::Right(labels)) => {
                            write!(f, " group_right")?;
                            fmt_labels(f, labels)?;
                        }
                        None => {}
                    }
                }
                write!(f, " {}", bin.rhs)
            }
            Expr::Unary(unary) => write!(f, "{}{}", unary.op, unary.expr),
            Expr::Paren(paren) => write!(f, "({})", paren.expr),
        }
    }
}

//! Recursive-descent parser for PromQL.
//!
//! Binary operators are handled by precedence climbing over
//! [`BinaryOp::precedence`]; everything else is a plain descent:
//!
//! ```text
//! expr     := unary (binop modifiers unary)*
//! unary    := ('+' | '-') unary | postfix
//! postfix  := primary ('[' range (':' step?)? ']' | 'offset' dur | '@' ts)*
//! primary  := number | string | '(' expr ')' | selector | call | aggregate
//! ```

use std::time::Duration;

use promgraph_error::{Error, Result};

use crate::ast::{
    AggregateExpr, AggregateOp, AtModifier, BinaryExpr, BinaryOp, Call, Expr, GroupModifier,
    Grouping, MatchingLabels, MatrixSelector, Offset, ParenExpr, SubqueryExpr, UnaryExpr, UnaryOp,
    VectorMatching, VectorSelector,
};
use crate::duration::parse_duration;
use crate::functions;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::matcher::{LabelMatcher, MatchKind};
use crate::METRIC_NAME_LABEL;

/// Precedence of unary `+`/`-`: tighter than `*`, looser than `^`.
const UNARY_PRECEDENCE: u8 = 6;

/// Deepest allowed nesting of sub-expressions (parentheses, unary chains,
/// right-associative `^` chains, call arguments).
const MAX_NESTING_DEPTH: usize = 64;

/// Parse a complete PromQL expression.
pub fn parse_expr(input: &str) -> Result<Expr> {
    tracing::trace!(input, "parsing promql expression");
    Parser::new(input)?.parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self {
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    /// Parse the whole input as one expression.
    pub fn parse(mut self) -> Result<Expr> {
        if self.tok().is_eof() {
            return Err(self.error("no expression found in input"));
        }
        let expr = self.parse_expr()?;
        if !self.tok().is_eof() {
            return Err(self.unexpected("in expression"));
        }
        Ok(expr)
    }

    fn tok(&self) -> &Token {
        // The token list always ends with Eof and `pos` never moves past it.
        &self.tokens[self.pos]
    }

    fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn next_token(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.tok().kind == kind
    }

    /// Whether the current token is the given keyword (case-insensitive).
    fn at_keyword(&self, keyword: &str) -> bool {
        self.at(TokenKind::Ident) && self.tok().text.eq_ignore_ascii_case(keyword)
    }

    fn error(&self, msg: impl Into<String>) -> Error {
        Error::parse_failed(msg)
            .with_operation("promql::parse")
            .with_context("position", self.tok().pos.to_string())
    }

    fn unexpected(&self, context: &str) -> Error {
        self.error(format!("unexpected {} {}", self.tok().describe(), context))
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token> {
        if self.at(kind) {
            Ok(self.next_token())
        } else {
            Err(self.unexpected(context))
        }
    }

    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_binary_expr(0)
    }

    fn parse_binary_expr(&mut self, min_precedence: u8) -> Result<Expr> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let expr = self.parse_binary_operands(min_precedence);
        self.depth -= 1;
        expr
    }

    fn parse_binary_operands(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut lhs = self.parse_unary_expr()?;

        loop {
            let Some(op) = self.binary_op() else {
                return Ok(lhs);
            };
            let precedence = op.precedence();
            if precedence < min_precedence {
                return Ok(lhs);
            }
            self.next_token();

            let return_bool = self.parse_bool_modifier(op)?;
            let matching = self.parse_vector_matching(op)?;

            let next_min = if op.is_right_assoc() {
                precedence
            } else {
                precedence + 1
            };
            let rhs = self.parse_binary_expr(next_min)?;

            lhs = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                return_bool,
                matching,
            });
        }
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        let op = match self.tok().kind {
            TokenKind::Add => BinaryOp::Add,
            TokenKind::Sub => BinaryOp::Sub,
            TokenKind::Mul => BinaryOp::Mul,
            TokenKind::Div => BinaryOp::Div,
            TokenKind::Mod => BinaryOp::Mod,
            TokenKind::Pow => BinaryOp::Pow,
            TokenKind::Eql => BinaryOp::Eql,
            TokenKind::Neq => BinaryOp::Neq,
            TokenKind::Gtr => BinaryOp::Gtr,
            TokenKind::Lss => BinaryOp::Lss,
            TokenKind::Gte => BinaryOp::Gte,
            TokenKind::Lte => BinaryOp::Lte,
            TokenKind::Ident => match self.tok().text.to_ascii_lowercase().as_str() {
                "and" => BinaryOp::And,
                "or" => BinaryOp::Or,
                "unless" => BinaryOp::Unless,
                "atan2" => BinaryOp::Atan2,
                _ => return None,
            },
            _ => return None,
        };
        Some(op)
    }

    fn parse_bool_modifier(&mut self, op: BinaryOp) -> Result<bool> {
        if !self.at_keyword("bool") {
            return Ok(false);
        }
        if !op.is_comparison() {
            return Err(self.error("bool modifier can only be used on comparison operators"));
        }
        self.next_token();
        Ok(true)
    }

    fn parse_vector_matching(&mut self, op: BinaryOp) -> Result<Option<VectorMatching>> {
        let labels = if self.at_keyword("on") {
            self.next_token();
            MatchingLabels::On(self.parse_label_list("in on(...)")?)
        } else if self.at_keyword("ignoring") {
            self.next_token();
            MatchingLabels::Ignoring(self.parse_label_list("in ignoring(...)")?)
        } else {
            return Ok(None);
        };

        let group = if self.at_keyword("group_left") || self.at_keyword("group_right") {
            if op.is_set_operator() {
                return Err(self.error(format!(
                    "no grouping allowed for \"{op}\" operation"
                )));
            }
            let left = self.at_keyword("group_left");
            self.next_token();
            let labels = if self.at(TokenKind::LeftParen) {
                self.parse_label_list("in grouping modifier")?
            } else {
                Vec::new()
            };
            Some(if left {
                GroupModifier::Left(labels)
            } else {
                GroupModifier::Right(labels)
            })
        } else {
            None
        };

        Ok(Some(VectorMatching { labels, group }))
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        let op = match self.tok().kind {
            TokenKind::Sub => UnaryOp::Neg,
            TokenKind::Add => UnaryOp::Pos,
            _ => return self.parse_postfix_expr(),
        };
        self.next_token();
        let expr = self.parse_binary_expr(UNARY_PRECEDENCE)?;
        Ok(Expr::Unary(UnaryExpr {
            op,
            expr: Box::new(expr),
        }))
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary_expr()?;
        loop {
            if self.at(TokenKind::LeftBracket) {
                expr = self.parse_range(expr)?;
            } else if self.at_keyword("offset") {
                self.next_token();
                let offset = self.parse_offset()?;
                expr = apply_offset(expr, offset).map_err(|msg| self.error(msg))?;
            } else if self.at(TokenKind::At) {
                self.next_token();
                let at = self.parse_at()?;
                expr = apply_at(expr, at).map_err(|msg| self.error(msg))?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_duration_token(&mut self, context: &str) -> Result<Duration> {
        let token = self.expect(TokenKind::Duration, context)?;
        parse_duration(&token.text).map_err(|err| self.error(err.message().to_string()))
    }

    fn parse_range(&mut self, expr: Expr) -> Result<Expr> {
        self.next_token();
        let range = self.parse_duration_token("in range, expected duration")?;

        if self.at(TokenKind::RightBracket) {
            self.next_token();
            return match expr {
                Expr::VectorSelector(selector) if selector.offset.is_none() && selector.at.is_none() => {
                    Ok(Expr::MatrixSelector(MatrixSelector { selector, range }))
                }
                Expr::VectorSelector(_) => Err(self.error(
                    "range must be placed before offset and @ modifiers",
                )),
                _ => Err(self.error(
                    "ranges only allowed for vector selectors",
                )),
            };
        }

        self.expect(TokenKind::Colon, "in subquery, expected \":\" or \"]\"")?;
        let step = if self.at(TokenKind::Duration) {
            Some(self.parse_duration_token("in subquery step")?)
        } else {
            None
        };
        self.expect(TokenKind::RightBracket, "in subquery, expected \"]\"")?;

        if matches!(expr, Expr::MatrixSelector(_)) {
            return Err(self.error("subquery is only allowed on instant vector"));
        }
        Ok(Expr::Subquery(SubqueryExpr {
            expr: Box::new(expr),
            range,
            step,
            offset: None,
            at: None,
        }))
    }

    fn parse_offset(&mut self) -> Result<Offset> {
        let negative = if self.at(TokenKind::Sub) {
            self.next_token();
            true
        } else {
            false
        };
        let duration = self.parse_duration_token("in offset, expected duration")?;
        Ok(Offset { duration, negative })
    }

    fn parse_at(&mut self) -> Result<AtModifier> {
        if self.at_keyword("start") || self.at_keyword("end") {
            let start = self.at_keyword("start");
            self.next_token();
            self.expect(TokenKind::LeftParen, "in @ modifier")?;
            self.expect(TokenKind::RightParen, "in @ modifier")?;
            return Ok(if start {
                AtModifier::Start
            } else {
                AtModifier::End
            });
        }

        let negative = if self.at(TokenKind::Sub) {
            self.next_token();
            true
        } else {
            if self.at(TokenKind::Add) {
                self.next_token();
            }
            false
        };
        let token = self.expect(TokenKind::Number, "in @ modifier, expected timestamp")?;
        let value = parse_number(&token.text).map_err(|msg| self.error(msg))?;
        if !value.is_finite() {
            return Err(self.error("timestamp out of bounds for @ modifier"));
        }
        Ok(AtModifier::Timestamp(if negative { -value } else { value }))
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        match self.tok().kind {
            TokenKind::Number => {
                let token = self.next_token();
                let value = parse_number(&token.text).map_err(|msg| self.error(msg))?;
                Ok(Expr::NumberLiteral(value))
            }
            TokenKind::String => Ok(Expr::StringLiteral(self.next_token().text)),
            TokenKind::LeftParen => {
                self.next_token();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RightParen, "in parenthesized expression")?;
                Ok(Expr::Paren(ParenExpr {
                    expr: Box::new(expr),
                }))
            }
            TokenKind::LeftBrace => self.parse_vector_selector(None),
            TokenKind::Ident => self.parse_ident_expr(),
            _ => Err(self.unexpected("in expression")),
        }
    }

    fn parse_ident_expr(&mut self) -> Result<Expr> {
        let text = self.tok().text.clone();

        if text.eq_ignore_ascii_case("inf") || text.eq_ignore_ascii_case("nan") {
            self.next_token();
            let value = if text.eq_ignore_ascii_case("inf") {
                f64::INFINITY
            } else {
                f64::NAN
            };
            return Ok(Expr::NumberLiteral(value));
        }

        if let Some(op) = AggregateOp::from_ident(&text) {
            let next = self.peek_kind(1);
            let grouping_follows = next == TokenKind::Ident && {
                let keyword = &self.tokens[self.pos + 1].text;
                keyword.eq_ignore_ascii_case("by") || keyword.eq_ignore_ascii_case("without")
            };
            if next == TokenKind::LeftParen || grouping_follows {
                self.next_token();
                return self.parse_aggregate(op);
            }
        }

        if self.peek_kind(1) == TokenKind::LeftParen {
            self.next_token();
            return self.parse_call(text);
        }

        self.next_token();
        self.parse_vector_selector(Some(text))
    }

    fn parse_call(&mut self, name: String) -> Result<Expr> {
        let Some(function) = functions::lookup(&name) else {
            return Err(self.error(format!("unknown function with name {name:?}")));
        };
        self.expect(TokenKind::LeftParen, "in function call")?;

        let mut args = Vec::new();
        if !self.at(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.at(TokenKind::Comma) {
                    self.next_token();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RightParen, "in function call argument list")?;

        if !function.accepts(args.len()) {
            return Err(self.error(format!(
                "wrong number of arguments for function {:?}: got {}",
                function.name,
                args.len()
            )));
        }
        Ok(Expr::Call(Call { func: name, args }))
    }

    fn parse_aggregate(&mut self, op: AggregateOp) -> Result<Expr> {
        let mut grouping = self.parse_grouping()?;

        self.expect(TokenKind::LeftParen, "in aggregation")?;
        if self.at(TokenKind::RightParen) {
            return Err(self.error(format!("no arguments for aggregate expression {op} provided")));
        }
        let first = self.parse_expr()?;
        let (param, expr) = if op.takes_param() {
            self.expect(TokenKind::Comma, "in aggregation, expected parameter and expression")?;
            let expr = self.parse_expr()?;
            (Some(Box::new(first)), expr)
        } else {
            (None, first)
        };
        if self.at(TokenKind::Comma) {
            self.next_token();
        }
        self.expect(TokenKind::RightParen, "in aggregation")?;

        if grouping.is_none() {
            grouping = self.parse_grouping()?;
        } else if self.at_keyword("by") || self.at_keyword("without") {
            return Err(self.error("aggregation must only contain one grouping clause"));
        }

        Ok(Expr::Aggregate(AggregateExpr {
            op,
            param,
            expr: Box::new(expr),
            grouping,
        }))
    }

    fn parse_grouping(&mut self) -> Result<Option<Grouping>> {
        if self.at_keyword("by") {
            self.next_token();
            Ok(Some(Grouping::By(self.parse_label_list("in grouping")?)))
        } else if self.at_keyword("without") {
            self.next_token();
            Ok(Some(Grouping::Without(self.parse_label_list("in grouping")?)))
        } else {
            Ok(None)
        }
    }

    /// `(label, label, ...)` with an optional trailing comma.
    fn parse_label_list(&mut self, context: &str) -> Result<Vec<String>> {
        self.expect(TokenKind::LeftParen, context)?;
        let mut labels = Vec::new();
        while !self.at(TokenKind::RightParen) {
            let label = self.expect(TokenKind::Ident, context)?;
            labels.push(label.text);
            if self.at(TokenKind::Comma) {
                self.next_token();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RightParen, context)?;
        Ok(labels)
    }

    fn parse_vector_selector(&mut self, name: Option<String>) -> Result<Expr> {
        let matchers = if self.at(TokenKind::LeftBrace) {
            self.parse_matchers()?
        } else {
            Vec::new()
        };

        if name.is_some() && matchers.iter().any(|m| m.name() == METRIC_NAME_LABEL) {
            return Err(self.error("metric name must not be set twice"));
        }
        if name.is_none() && matchers.iter().all(LabelMatcher::matches_empty) {
            return Err(self.error(
                "vector selector must contain at least one non-empty matcher",
            ));
        }

        Ok(Expr::VectorSelector(VectorSelector::new(name, matchers)))
    }

    fn parse_matchers(&mut self) -> Result<Vec<LabelMatcher>> {
        self.expect(TokenKind::LeftBrace, "in label matching")?;
        let mut matchers = Vec::new();
        while !self.at(TokenKind::RightBrace) {
            let label = self.expect(TokenKind::Ident, "in label matching, expected label")?;
            let kind = match self.tok().kind {
                TokenKind::Assign => MatchKind::Equal,
                TokenKind::Neq => MatchKind::NotEqual,
                TokenKind::EqlRegex => MatchKind::RegexMatch,
                TokenKind::NeqRegex => MatchKind::RegexNoMatch,
                _ => return Err(self.unexpected("in label matching, expected label matching operator")),
            };
            self.next_token();
            let value = self.expect(TokenKind::String, "in label matching, expected string")?;
            let matcher = LabelMatcher::new(kind, label.text, value.text)
                .map_err(|err| self.error(err.message().to_string()))?;
            matchers.push(matcher);

            if self.at(TokenKind::Comma) {
                self.next_token();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RightBrace, "in label matching, expected \",\" or \"}\"")?;
        Ok(matchers)
    }
}

fn parse_number(text: &str) -> std::result::Result<f64, String> {
    let parsed = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).map(|v| v as f64).ok()
    } else {
        text.parse::<f64>().ok()
    };
    parsed.ok_or_else(|| format!("invalid number {text:?}"))
}

fn apply_offset(expr: Expr, offset: Offset) -> std::result::Result<Expr, String> {
    let slot = match expr {
        Expr::VectorSelector(ref vs) => vs.offset,
        Expr::MatrixSelector(ref ms) => ms.selector.offset,
        Expr::Subquery(ref sq) => sq.offset,
        _ => {
            return Err("offset modifier must be preceded by an instant vector selector or range vector selector or a subquery".to_string());
        }
    };
    if slot.is_some() {
        return Err("offset may not be set multiple times".to_string());
    }
    Ok(match expr {
        Expr::VectorSelector(mut vs) => {
            vs.offset = Some(offset);
            Expr::VectorSelector(vs)
        }
        Expr::MatrixSelector(mut ms) => {
            ms.selector.offset = Some(offset);
            Expr::MatrixSelector(ms)
        }
        Expr::Subquery(mut sq) => {
            sq.offset = Some(offset);
            Expr::Subquery(sq)
        }
        other => other,
    })
}

fn apply_at(expr: Expr, at: AtModifier) -> std::result::Result<Expr, String> {
    let slot = match expr {
        Expr::VectorSelector(ref vs) => vs.at,
        Expr::MatrixSelector(ref ms) => ms.selector.at,
        Expr::Subquery(ref sq) => sq.at,
        _ => {
            return Err("@ modifier must be preceded by an instant vector selector or range vector selector or a subquery".to_string());
        }
    };
    if slot.is_some() {
        return Err("@ <timestamp> may not be set multiple times".to_string());
    }
    Ok(match expr {
        Expr::VectorSelector(mut vs) => {
            vs.at = Some(at);
            Expr::VectorSelector(vs)
        }
        Expr::MatrixSelector(mut ms) => {
            ms.selector.at = Some(at);
            Expr::MatrixSelector(ms)
        }
        Expr::Subquery(mut sq) => {
            sq.at = Some(at);
            Expr::Subquery(sq)
        }
        other => other,
    })
}

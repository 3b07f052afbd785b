//! Feature gating
//!
//! This module parses YANG 1.1 if-feature expressions and evaluates them
//! against the set of enabled features:
//!
//! ```text
//! if-feature-expr   = if-feature-term [ "or" if-feature-expr ]
//! if-feature-term   = if-feature-factor [ "and" if-feature-term ]
//! if-feature-factor = "not" if-feature-factor
//!                   / "(" if-feature-expr ")"
//!                   / identifier-ref
//! ```
//!
//! Reference: RFC 7950, section 7.20.2

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::names::{is_valid_prefixed, split_prefixed};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(|\)|[^\s()]+").unwrap());

/// Parsed if-feature expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfFeatureExpr {
    /// Reference to a feature, optionally prefixed
    Feature(String),
    /// Negation
    Not(Box<IfFeatureExpr>),
    /// Conjunction
    And(Box<IfFeatureExpr>, Box<IfFeatureExpr>),
    /// Disjunction
    Or(Box<IfFeatureExpr>, Box<IfFeatureExpr>),
}

impl IfFeatureExpr {
    /// Parse an if-feature argument string under the default [`Limits`]
    pub fn parse(input: &str) -> Result<Self> {
        Self::parse_with_limits(input, &Limits::default())
    }

    /// Parse an if-feature argument string, rejecting expressions nested
    /// deeper than `limits.max_expression_depth`
    pub fn parse_with_limits(input: &str, limits: &Limits) -> Result<Self> {
        let tokens: Vec<&str> = TOKEN.find_iter(input).map(|m| m.as_str()).collect();
        if tokens.is_empty() {
            return Err(Error::Feature("empty if-feature expression".to_string()));
        }

        let mut parser = ExprParser {
            tokens,
            pos: 0,
            depth: 0,
            limits,
        };
        let expr = parser.parse_expr()?;
        if let Some(extra) = parser.peek() {
            return Err(Error::Feature(format!(
                "unexpected token '{}' in if-feature expression '{}'",
                extra, input
            )));
        }
        Ok(expr)
    }

    /// Shorthand for a single feature reference
    pub fn feature(name: impl Into<String>) -> Self {
        IfFeatureExpr::Feature(name.into())
    }

    /// Evaluate against the enabled features
    pub fn evaluate(&self, features: &FeatureSet) -> bool {
        match self {
            IfFeatureExpr::Feature(name) => features.is_enabled(name),
            IfFeatureExpr::Not(inner) => !inner.evaluate(features),
            IfFeatureExpr::And(lhs, rhs) => lhs.evaluate(features) && rhs.evaluate(features),
            IfFeatureExpr::Or(lhs, rhs) => lhs.evaluate(features) || rhs.evaluate(features),
        }
    }

    /// Names of all features referenced by the expression
    pub fn referenced(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_referenced(&mut names);
        names
    }

    fn collect_referenced<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            IfFeatureExpr::Feature(name) => out.push(name),
            IfFeatureExpr::Not(inner) => inner.collect_referenced(out),
            IfFeatureExpr::And(lhs, rhs) | IfFeatureExpr::Or(lhs, rhs) => {
                lhs.collect_referenced(out);
                rhs.collect_referenced(out);
            }
        }
    }
}

impl fmt::Display for IfFeatureExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfFeatureExpr::Feature(name) => write!(f, "{}", name),
            IfFeatureExpr::Not(inner) => write!(f, "not {}", inner),
            IfFeatureExpr::And(lhs, rhs) => write!(f, "({} and {})", lhs, rhs),
            IfFeatureExpr::Or(lhs, rhs) => write!(f, "({} or {})", lhs, rhs),
        }
    }
}

struct ExprParser<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
    depth: usize,
    limits: &'a Limits,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<&'a str> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // every recursive descent goes through here
    fn nested(&mut self, parse: fn(&mut Self) -> Result<IfFeatureExpr>) -> Result<IfFeatureExpr> {
        self.depth += 1;
        self.limits.check_expression_depth(self.depth)?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_expr(&mut self) -> Result<IfFeatureExpr> {
        let lhs = self.parse_term()?;
        if self.peek() == Some("or") {
            self.pos += 1;
            let rhs = self.nested(Self::parse_expr)?;
            return Ok(IfFeatureExpr::Or(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<IfFeatureExpr> {
        let lhs = self.parse_factor()?;
        if self.peek() == Some("and") {
            self.pos += 1;
            let rhs = self.nested(Self::parse_term)?;
            return Ok(IfFeatureExpr::And(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<IfFeatureExpr> {
        match self.next() {
            Some("not") => Ok(IfFeatureExpr::Not(Box::new(self.nested(Self::parse_factor)?))),
            Some("(") => {
                let inner = self.nested(Self::parse_expr)?;
                match self.next() {
                    Some(")") => Ok(inner),
                    other => Err(Error::Feature(format!(
                        "expected ')' but found {}",
                        other.map(|t| format!("'{}'", t)).unwrap_or_else(|| "end of input".to_string())
                    ))),
                }
            }
            Some(name) if name != ")" && name != "and" && name != "or" => {
                if !is_valid_prefixed(name) {
                    return Err(Error::Feature(format!("invalid feature name '{}'", name)));
                }
                Ok(IfFeatureExpr::Feature(name.to_string()))
            }
            Some(token) => Err(Error::Feature(format!("unexpected token '{}'", token))),
            None => Err(Error::Feature("unexpected end of if-feature expression".to_string())),
        }
    }
}

/// Set of enabled features
///
/// Features may be registered with or without a module prefix; a prefixed
/// reference matches an unprefixed registration of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    enabled: HashSet<String>,
}

impl FeatureSet {
    /// Create an empty feature set (every feature disabled)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a feature set from names
    pub fn with_features<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Enable a feature
    pub fn enable(&mut self, name: impl Into<String>) {
        self.enabled.insert(name.into());
    }

    /// Disable a feature
    pub fn disable(&mut self, name: &str) {
        self.enabled.remove(name);
    }

    /// Check whether a (possibly prefixed) feature is enabled
    pub fn is_enabled(&self, name: &str) -> bool {
        if self.enabled.contains(name) {
            return true;
        }
        let (_, local) = split_prefixed(name);
        self.enabled.contains(local)
    }

    /// Number of enabled features
    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    /// Check if no feature is enabled
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

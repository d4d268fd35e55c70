//! Store-native query construction.
//!
//! A [`NativeQuery`] addresses one collection by path and carries filters, ordering, cursors
//! and a limit, all expressed in store field names. Backends execute it directly; the
//! entity-level [`Query`](crate::criteria::Query) resolves property names into one.
//!
//! # Example
//!
//! ```ignore
//! use docmap::query::{Direction, Filter, NativeQuery};
//! use docmap::path::CollectionPath;
//!
//! let query = NativeQuery::new(CollectionPath::root("posts"))
//!     .where_(Filter::eq("title", "Hello World!"))
//!     .order_by("title", Direction::Desc)
//!     .limit(10);
//! ```
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct provides static constructors for every supported operator:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Array: `array_contains`, `array_contains_any`
//! - Membership: `is_in`, `not_in`
//! - Logical: `and`, `or`

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    error::{DocMapError, DocMapResult},
    path::CollectionPath,
    value::Value,
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = DocMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(DocMapError::InvalidQuery(format!("unknown direction {other}"))),
        }
    }
}

/// One ordering clause.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = ">")]
    Gt,
    /// Array field contains the value.
    #[serde(rename = "array-contains")]
    ArrayContains,
    /// Array field contains at least one of the values.
    #[serde(rename = "array-contains-any")]
    ArrayContainsAny,
    /// Field equals one of the values.
    #[serde(rename = "in")]
    In,
    /// Field is present and equals none of the values.
    #[serde(rename = "not-in")]
    NotIn,
}

impl FieldOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOp::Lt => "<",
            FieldOp::Lte => "<=",
            FieldOp::Eq => "==",
            FieldOp::Ne => "!=",
            FieldOp::Gte => ">=",
            FieldOp::Gt => ">",
            FieldOp::ArrayContains => "array-contains",
            FieldOp::ArrayContainsAny => "array-contains-any",
            FieldOp::In => "in",
            FieldOp::NotIn => "not-in",
        }
    }
}

impl FromStr for FieldOp {
    type Err = DocMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "<" => FieldOp::Lt,
            "<=" => FieldOp::Lte,
            "==" => FieldOp::Eq,
            "!=" => FieldOp::Ne,
            ">=" => FieldOp::Gte,
            ">" => FieldOp::Gt,
            "array-contains" => FieldOp::ArrayContains,
            "array-contains-any" => FieldOp::ArrayContainsAny,
            "in" => FieldOp::In,
            "not-in" => FieldOp::NotIn,
            other => return Err(DocMapError::InvalidQuery(format!("unknown operator {other}"))),
        })
    }
}

impl fmt::Display for FieldOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter expression over store field names.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// All expressions must match.
    And(Vec<Expr>),
    /// Any expression must match.
    Or(Vec<Expr>),
    Field {
        /// Store field name, dotted for nested maps.
        field: String,
        op: FieldOp,
        value: Value,
    },
}

impl Expr {
    pub fn field(field: String, op: FieldOp, value: Value) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }
}

/// Helper struct for constructing filter expressions.
pub struct Filter;

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field.into(), FieldOp::ArrayContains, value.into())
    }

    pub fn array_contains_any(field: impl Into<String>, values: impl Into<Value>) -> Expr {
        Expr::field(field.into(), FieldOp::ArrayContainsAny, values.into())
    }

    pub fn is_in(field: impl Into<String>, values: impl Into<Value>) -> Expr {
        Expr::field(field.into(), FieldOp::In, values.into())
    }

    pub fn not_in(field: impl Into<String>, values: impl Into<Value>) -> Expr {
        Expr::field(field.into(), FieldOp::NotIn, values.into())
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// A query cursor: values matched positionally against the ordering fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub values: Vec<Value>,
    /// `true` for `start_at`/`end_at`, `false` for `start_after`/`end_before`.
    pub inclusive: bool,
}

/// A query over one collection, in store field names.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeQuery {
    pub collection: CollectionPath,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub start: Option<Cursor>,
    pub end: Option<Cursor>,
    pub limit: Option<usize>,
}

impl NativeQuery {
    pub fn new(collection: CollectionPath) -> Self {
        Self {
            collection,
            filter: None,
            order_by: Vec::new(),
            start: None,
            end: None,
            limit: None,
        }
    }

    /// Adds a filter, AND-ed with any existing one.
    pub fn where_(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy { field: field.into(), direction });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_at(mut self, values: Vec<Value>) -> Self {
        self.start = Some(Cursor { values, inclusive: true });
        self
    }

    pub fn start_after(mut self, values: Vec<Value>) -> Self {
        self.start = Some(Cursor { values, inclusive: false });
        self
    }

    pub fn end_at(mut self, values: Vec<Value>) -> Self {
        self.end = Some(Cursor { values, inclusive: true });
        self
    }

    pub fn end_before(mut self, values: Vec<Value>) -> Self {
        self.end = Some(Cursor { values, inclusive: false });
        self
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocMapError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Value,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

/// Checks the operand shape required by list operators.
pub fn validate_operand(op: FieldOp, value: &Value) -> DocMapResult<()> {
    match op {
        FieldOp::ArrayContainsAny | FieldOp::In | FieldOp::NotIn if value.as_array().is_none() => {
            Err(DocMapError::InvalidQuery(format!("'{op}' filters require an array value")))
        }
        _ => Ok(()),
    }
}

//! Query evaluation for in-memory documents.
//!
//! Filters follow the usual hierarchical-store rules: range and equality comparisons only match
//! values of the same type class (integers and doubles compare as numbers), a missing field
//! never matches, and `!=`/`not-in` also skip documents whose field is null. Ordering uses a
//! total order across types: null, booleans, numbers, timestamps, strings, references,
//! geopoints, arrays, maps.

use std::cmp::Ordering;

use docmap_core::{
    error::{DocMapError, DocMapResult},
    query::{Cursor, Direction, Expr, FieldOp, OrderBy, QueryVisitor, validate_operand},
    value::{Value, ValueMap},
};

/// Borrowed, comparable view of a [`Value`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    Timestamp(i64, u32),
    String(&'a str),
    Reference(&'a [String]),
    GeoPoint(f64, f64),
    Array(&'a [Value]),
    Map(&'a ValueMap),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null | Value::ServerTimestamp => Comparable::Null,
            Value::Boolean(value) => Comparable::Bool(*value),
            Value::Integer(value) => Comparable::Number(*value as f64),
            Value::Double(value) => Comparable::Number(*value),
            Value::Timestamp(value) => Comparable::Timestamp(value.seconds, value.nanoseconds),
            Value::String(value) => Comparable::String(value),
            Value::Reference(path) => Comparable::Reference(path.segments()),
            Value::GeoPoint(point) => Comparable::GeoPoint(point.latitude, point.longitude),
            Value::Array(items) => Comparable::Array(items),
            Value::Map(map) => Comparable::Map(map),
        }
    }
}

impl Comparable<'_> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::Timestamp(..) => 3,
            Comparable::String(_) => 4,
            Comparable::Reference(_) => 5,
            Comparable::GeoPoint(..) => 6,
            Comparable::Array(_) => 7,
            Comparable::Map(_) => 8,
        }
    }

    /// Total order used for sorting and cursors.
    pub(crate) fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.total_cmp(b),
            (Comparable::Timestamp(a, an), Comparable::Timestamp(b, bn)) => (a, an).cmp(&(b, bn)),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Reference(a), Comparable::Reference(b)) => a.cmp(b),
            (Comparable::GeoPoint(alat, alng), Comparable::GeoPoint(blat, blng)) => {
                alat.total_cmp(blat).then_with(|| alng.total_cmp(blng))
            }
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(left, right)| Comparable::from(left).total_cmp(&Comparable::from(right)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Map(a), Comparable::Map(b)) => {
                let mut left = a.iter().collect::<Vec<_>>();
                let mut right = b.iter().collect::<Vec<_>>();
                left.sort_by(|x, y| x.0.cmp(y.0));
                right.sort_by(|x, y| x.0.cmp(y.0));
                left.iter()
                    .zip(right.iter())
                    .map(|((lk, lv), (rk, rv))| {
                        lk.cmp(rk).then_with(|| {
                            Comparable::from(*lv).total_cmp(&Comparable::from(*rv))
                        })
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or_else(|| left.len().cmp(&right.len()))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank() && self.total_cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for Comparable<'_> {
    /// Only values of the same type class are ordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.rank() == other.rank()).then(|| self.total_cmp(other))
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a ValueMap,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a ValueMap) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocMapResult<bool> {
        self.visit_expr(expr)
    }

    /// Documents matching `expr`, in input order.
    pub fn filter_documents<'d, I>(documents: I, expr: &Expr) -> DocMapResult<Vec<(&'d String, &'d ValueMap)>>
    where
        I: IntoIterator<Item = (&'d String, &'d ValueMap)>,
    {
        let mut matching = Vec::new();
        for (id, document) in documents {
            if DocumentEvaluator::new(document).evaluate(expr)? {
                matching.push((id, document));
            }
        }
        Ok(matching)
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocMapError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Value) -> Result<Self::Output, Self::Error> {
        validate_operand(*op, value)?;

        let Some(field_value) = Value::lookup(self.document, field) else {
            return Ok(false);
        };
        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Ne => !matches!(left, Comparable::Null) && left != right,
            FieldOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            FieldOp::Lte => matches!(left.partial_cmp(&right), Some(Ordering::Less | Ordering::Equal)),
            FieldOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            FieldOp::Gte => matches!(left.partial_cmp(&right), Some(Ordering::Greater | Ordering::Equal)),
            FieldOp::ArrayContains => match left {
                Comparable::Array(items) => items.iter().any(|item| Comparable::from(item) == right),
                _ => false,
            },
            FieldOp::ArrayContainsAny => match (left, right) {
                (Comparable::Array(items), Comparable::Array(candidates)) => items.iter().any(|item| {
                    candidates
                        .iter()
                        .any(|candidate| Comparable::from(item) == Comparable::from(candidate))
                }),
                _ => false,
            },
            FieldOp::In => match right {
                Comparable::Array(candidates) => candidates
                    .iter()
                    .any(|candidate| left == Comparable::from(candidate)),
                _ => false,
            },
            FieldOp::NotIn => match right {
                Comparable::Array(candidates) => {
                    !matches!(left, Comparable::Null)
                        && candidates
                            .iter()
                            .all(|candidate| left != Comparable::from(candidate))
                }
                _ => false,
            },
        })
    }
}

/// The values of the ordering fields, `None` when the document lacks one of them.
pub(crate) fn order_values<'a>(document: &'a ValueMap, order_by: &[OrderBy]) -> Option<Vec<&'a Value>> {
    order_by
        .iter()
        .map(|order| Value::lookup(document, &order.field))
        .collect()
}

fn directed(ordering: Ordering, direction: Direction) -> Ordering {
    match direction {
        Direction::Asc => ordering,
        Direction::Desc => ordering.reverse(),
    }
}

/// Compares two documents' ordering values, honouring each field's direction.
pub(crate) fn compare_order(left: &[&Value], right: &[&Value], order_by: &[OrderBy]) -> Ordering {
    left.iter()
        .zip(right.iter())
        .zip(order_by.iter())
        .map(|((l, r), order)| {
            directed(
                Comparable::from(*l).total_cmp(&Comparable::from(*r)),
                order.direction,
            )
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Compares a document's ordering values with a cursor. Only as many fields as the cursor
/// has values take part.
fn compare_cursor(values: &[&Value], cursor: &Cursor, order_by: &[OrderBy]) -> Ordering {
    let cursor_values = cursor.values.iter().collect::<Vec<_>>();
    let width = cursor_values.len().min(values.len());
    compare_order(&values[..width], &cursor_values[..width], order_by)
}

/// Whether a document with the given ordering values lies after the start cursor.
pub(crate) fn after_start(values: &[&Value], cursor: &Cursor, order_by: &[OrderBy]) -> bool {
    match compare_cursor(values, cursor, order_by) {
        Ordering::Greater => true,
        Ordering::Equal => cursor.inclusive,
        Ordering::Less => false,
    }
}

/// Whether a document with the given ordering values lies before the end cursor.
pub(crate) fn before_end(values: &[&Value], cursor: &Cursor, order_by: &[OrderBy]) -> bool {
    match compare_cursor(values, cursor, order_by) {
        Ordering::Less => true,
        Ordering::Equal => cursor.inclusive,
        Ordering::Greater => false,
    }
}

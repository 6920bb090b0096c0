//! Backend-agnostic boolean expressions over an entity's fields.
//!
//! Predicates use SQL three-valued logic so the in-memory evaluator and the
//! SQLite compiler agree on rows with null columns.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use crate::entity::{Entity, FieldKind, FieldValue};
use crate::error::{QueryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Untyped expression tree. Field names are always catalogue names.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    True,
    False,
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        field: &'static str,
        op: CompareOp,
        value: FieldValue,
    },
    /// Case-insensitive substring match. `needle` is already case-folded.
    Contains {
        field: &'static str,
        needle: String,
    },
    IsNull(&'static str),
}

/// Case folding applied to both stored text and search terms.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

impl Expr {
    /// Evaluate against an entity. `None` is SQL's UNKNOWN.
    fn eval<E: Entity>(&self, entity: &E) -> Option<bool> {
        match self {
            Expr::True => Some(true),
            Expr::False => Some(false),
            Expr::And(parts) => {
                let mut result = Some(true);
                for part in parts {
                    match part.eval(entity) {
                        Some(false) => return Some(false),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Expr::Or(parts) => {
                let mut result = Some(false);
                for part in parts {
                    match part.eval(entity) {
                        Some(true) => return Some(true),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
            Expr::Not(inner) => inner.eval(entity).map(|b| !b),
            Expr::Compare { field, op, value } => {
                let actual = entity.field(field)?;
                actual.compare(value).map(|ord| op.holds(ord))
            }
            Expr::Contains { field, needle } => match entity.field(field)? {
                FieldValue::Text(text) => Some(fold_case(&text).contains(needle.as_str())),
                _ => None,
            },
            Expr::IsNull(field) => entity.field(field).map(|v| v.is_null()),
        }
    }
}

/// A predicate over `E`. Only constructible through validated builders.
pub struct Predicate<E> {
    expr: Expr,
    _entity: PhantomData<fn(&E) -> bool>,
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        Self::from_expr(self.expr.clone())
    }
}

impl<E> fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.expr).finish()
    }
}

impl<E> PartialEq for Predicate<E> {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl<E> Predicate<E> {
    fn from_expr(expr: Expr) -> Self {
        Self {
            expr,
            _entity: PhantomData,
        }
    }

    /// Matches every row.
    pub fn always() -> Self {
        Self::from_expr(Expr::True)
    }

    /// Matches no row.
    pub fn never() -> Self {
        Self::from_expr(Expr::False)
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn is_always(&self) -> bool {
        self.expr == Expr::True
    }

    pub fn is_never(&self) -> bool {
        self.expr == Expr::False
    }

    /// Conjunction. `never()` absorbs, `always()` is the identity.
    pub fn and(self, other: Predicate<E>) -> Self {
        match (self.expr, other.expr) {
            (Expr::False, _) | (_, Expr::False) => Self::never(),
            (Expr::True, e) | (e, Expr::True) => Self::from_expr(e),
            (Expr::And(mut left), Expr::And(right)) => {
                left.extend(right);
                Self::from_expr(Expr::And(left))
            }
            (Expr::And(mut left), e) => {
                left.push(e);
                Self::from_expr(Expr::And(left))
            }
            (e, Expr::And(mut right)) => {
                right.insert(0, e);
                Self::from_expr(Expr::And(right))
            }
            (a, b) => Self::from_expr(Expr::And(vec![a, b])),
        }
    }

    /// Disjunction. `always()` absorbs, `never()` is the identity.
    pub fn or(self, other: Predicate<E>) -> Self {
        match (self.expr, other.expr) {
            (Expr::True, _) | (_, Expr::True) => Self::always(),
            (Expr::False, e) | (e, Expr::False) => Self::from_expr(e),
            (Expr::Or(mut left), Expr::Or(right)) => {
                left.extend(right);
                Self::from_expr(Expr::Or(left))
            }
            (Expr::Or(mut left), e) => {
                left.push(e);
                Self::from_expr(Expr::Or(left))
            }
            (a, b) => Self::from_expr(Expr::Or(vec![a, b])),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self.expr {
            Expr::True => Self::never(),
            Expr::False => Self::always(),
            Expr::Not(inner) => Self::from_expr(*inner),
            e => Self::from_expr(Expr::Not(Box::new(e))),
        }
    }

    /// AND of all parts; empty input matches everything.
    pub fn all_of(parts: impl IntoIterator<Item = Predicate<E>>) -> Self {
        parts.into_iter().fold(Self::always(), Self::and)
    }

    /// OR of all parts; empty input matches nothing.
    pub fn any_of(parts: impl IntoIterator<Item = Predicate<E>>) -> Self {
        parts.into_iter().fold(Self::never(), Self::or)
    }
}

impl<E: Entity> Predicate<E> {
    /// `field <op> value`, with the value coerced to the field's kind.
    ///
    /// A null value turns `Eq`/`Ne` into null checks; ordering against null
    /// is rejected.
    pub fn compare(field: &str, op: CompareOp, value: impl Into<FieldValue>) -> Result<Self> {
        let def = E::field_def(field)?;
        let value = value.into();
        let value = value.clone().coerce(def.kind).ok_or_else(|| {
            QueryError::InvalidFilter(format!(
                "`{value}` is not a valid {:?} for `{}`",
                def.kind, def.name
            ))
        })?;
        match (op, value) {
            (CompareOp::Eq, FieldValue::Null) => Ok(Self::from_expr(Expr::IsNull(def.name))),
            (CompareOp::Ne, FieldValue::Null) => {
                Ok(Self::from_expr(Expr::IsNull(def.name)).not())
            }
            (_, FieldValue::Null) => Err(QueryError::InvalidFilter(format!(
                "cannot order-compare `{}` against null",
                def.name
            ))),
            (op, value) => Ok(Self::from_expr(Expr::Compare {
                field: def.name,
                op,
                value,
            })),
        }
    }

    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Result<Self> {
        Self::compare(field, CompareOp::Eq, value)
    }

    /// Case-insensitive substring match on a text field.
    pub fn contains(field: &str, needle: &str) -> Result<Self> {
        let def = E::field_def(field)?;
        if def.kind != FieldKind::Text {
            return Err(QueryError::InvalidFilter(format!(
                "`{}` is not a text field",
                def.name
            )));
        }
        Ok(Self::from_expr(Expr::Contains {
            field: def.name,
            needle: fold_case(needle),
        }))
    }

    pub fn is_null(field: &str) -> Result<Self> {
        let def = E::field_def(field)?;
        Ok(Self::from_expr(Expr::IsNull(def.name)))
    }

    /// True only when the predicate definitely holds (UNKNOWN does not match).
    pub fn matches(&self, entity: &E) -> bool {
        self.expr.eval(entity) == Some(true)
    }
}

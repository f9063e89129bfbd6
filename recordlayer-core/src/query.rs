//! Query construction and normalization.
//!
//! This module provides the adapter-neutral query representation consumed by
//! [`Container::find_all`](crate::container::Container::find_all): a tagged
//! filter AST plus skip/limit/projection directives, and a visitor pattern for
//! translating or evaluating the AST in adapter code.
//!
//! # Query Building
//!
//! Queries can be constructed with the fluent builder API:
//!
//! ```ignore
//! use recordlayer_core::query::{Query, Filter};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("firstName", "John"))
//!     .skip(1)
//!     .limit(10)
//!     .build();
//! ```
//!
//! # Options shorthand
//!
//! A bare options document in the `$where`/`$skip`/`$limit` form is accepted
//! wherever a query is expected and normalizes into the same representation:
//!
//! ```ignore
//! use bson::doc;
//!
//! let query = Query::from_options(&doc! {
//!     "$where": { "firstName": { "$eq": "John" } },
//!     "$skip": 1,
//! })?;
//! ```

use bson::{Bson, Document};
use std::convert::Infallible;

use crate::error::{ContainerError, ContainerResult};

/// Field comparison operators.
///
/// These mirror the `$`-prefixed operator names of the options shorthand;
/// adapters receive them by name and preserve their semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Strict equality.
    Eq,
    /// Strict inequality.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Value is one of the listed values.
    In,
    /// Value is none of the listed values.
    Nin,
}

impl FieldOp {
    /// Parses a `$`-prefixed operator name from the options shorthand.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "$eq" => Some(FieldOp::Eq),
            "$ne" => Some(FieldOp::Ne),
            "$gt" => Some(FieldOp::Gt),
            "$gte" => Some(FieldOp::Gte),
            "$lt" => Some(FieldOp::Lt),
            "$lte" => Some(FieldOp::Lte),
            "$in" => Some(FieldOp::In),
            "$nin" => Some(FieldOp::Nin),
            _ => None,
        }
    }

    /// The `$`-prefixed name of this operator.
    pub fn name(&self) -> &'static str {
        match self {
            FieldOp::Eq => "$eq",
            FieldOp::Ne => "$ne",
            FieldOp::Gt => "$gt",
            FieldOp::Gte => "$gte",
            FieldOp::Lt => "$lt",
            FieldOp::Lte => "$lte",
            FieldOp::In => "$in",
            FieldOp::Nin => "$nin",
        }
    }
}

/// A filter expression for selecting documents.
///
/// Expressions combine with logical operators to form an immutable predicate
/// tree that adapters translate into their native form.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression.
    Not(Box<Expr>),
    /// Field comparison expression.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression.
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// An immutable filter/projection/pagination specification.
///
/// `skip` is applied before `limit`; result order is adapter-determined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression to match documents.
    pub filter: Option<Expr>,
    /// Number of matching documents to skip.
    pub skip: Option<usize>,
    /// Maximum number of documents to return after skipping.
    pub limit: Option<usize>,
    /// Optional projection: field names to retain on returned documents.
    pub projection: Option<Vec<String>>,
}

impl Query {
    /// Creates a new empty query matching every document.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Builds a query from the two-argument form: an optional projection plus
    /// the options shorthand.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Query`] if the options document is malformed.
    pub fn from_parts<I, S>(projection: Option<I>, options: &Document) -> ContainerResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut query = Query::from_options(options)?;
        query.projection =
            projection.map(|fields| fields.into_iter().map(Into::into).collect());
        Ok(query)
    }

    /// Normalizes a bare options document into a query.
    ///
    /// Recognized keys: `$where` (field → operator → value), `$skip`
    /// (integer ≥ 0, default 0) and `$limit` (integer > 0, default
    /// unbounded). Any other key, an unknown operator, or a malformed shape
    /// is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Query`] describing the malformed part.
    pub fn from_options(options: &Document) -> ContainerResult<Self> {
        let mut query = Query::new();

        for (key, value) in options.iter() {
            match key.as_str() {
                "$where" => {
                    let clauses = value
                        .as_document()
                        .ok_or_else(|| {
                            ContainerError::Query("$where must be a document".to_string())
                        })?;
                    query.filter = parse_where(clauses)?;
                }
                "$skip" => {
                    query.skip = Some(parse_non_negative(value, "$skip")?);
                }
                "$limit" => {
                    let limit = parse_non_negative(value, "$limit")?;
                    if limit == 0 {
                        return Err(ContainerError::Query("$limit must be positive".to_string()));
                    }
                    query.limit = Some(limit);
                }
                other => {
                    return Err(ContainerError::Query(format!(
                        "unrecognized option {}",
                        other
                    )));
                }
            }
        }

        Ok(query)
    }
}

fn parse_where(clauses: &Document) -> ContainerResult<Option<Expr>> {
    let mut exprs = Vec::with_capacity(clauses.len());

    for (field, ops) in clauses.iter() {
        let ops = ops.as_document().ok_or_else(|| {
            ContainerError::Query(format!("$where.{} must map operators to values", field))
        })?;

        for (name, value) in ops.iter() {
            let op = FieldOp::parse(name).ok_or_else(|| {
                ContainerError::Query(format!("unknown operator {} on field {}", name, field))
            })?;

            exprs.push(Expr::field(field.clone(), op, value.clone()));
        }
    }

    Ok(match exprs.len() {
        0 => None,
        1 => exprs.pop(),
        _ => Some(Expr::And(exprs)),
    })
}

fn parse_non_negative(value: &Bson, key: &str) -> ContainerResult<usize> {
    let parsed = match value {
        Bson::Int32(n) if *n >= 0 => Some(*n as usize),
        Bson::Int64(n) if *n >= 0 => Some(*n as usize),
        _ => None,
    };

    parsed.ok_or_else(|| ContainerError::Query(format!("{} must be a non-negative integer", key)))
}

impl TryFrom<Document> for Query {
    type Error = ContainerError;

    fn try_from(options: Document) -> ContainerResult<Self> {
        Query::from_options(&options)
    }
}

impl TryFrom<&Document> for Query {
    type Error = ContainerError;

    fn try_from(options: &Document) -> ContainerResult<Self> {
        Query::from_options(options)
    }
}

// Lets `impl TryInto<Query>` parameters accept an already-built Query through
// the blanket From/TryFrom impl, whose error type is Infallible.
impl From<Infallible> for ContainerError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Helper struct for constructing filter expressions.
///
/// # Example
///
/// ```ignore
/// use recordlayer_core::query::Filter;
///
/// let expr = Filter::eq("lastName", "Doe").and(Filter::gt("age", 18));
/// ```
pub struct Filter;

impl Filter {
    /// Creates an equality filter expression.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Creates a not-equal filter expression.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    /// Creates a greater-than filter expression.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    /// Creates a greater-than-or-equal filter expression.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Creates a less-than filter expression.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    /// Creates a less-than-or-equal filter expression.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Creates a membership filter: the field value is one of `values`.
    pub fn any_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::In, values.into())
    }

    /// Creates an exclusion filter: the field value is none of `values`.
    pub fn none_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Nin, values.into())
    }

    /// Creates a logical AND of multiple expressions.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Creates a logical OR of multiple expressions.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// Builder for [`Query`] values.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the number of matching documents to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.query.skip = Some(skip);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Restricts returned documents to the named fields.
    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

/// Visitor over the filter AST.
///
/// Adapters implement this to translate or evaluate expressions without
/// re-parsing the tree.
pub trait QueryVisitor {
    type Output;
    type Error: Into<ContainerError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Field { field, op, value } => self.visit_field(field, *op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn normalizes_where_eq_shorthand() {
        let query = Query::from_options(&doc! {
            "$where": { "firstName": { "$eq": "John" } },
        })
        .unwrap();

        assert_eq!(
            query.filter,
            Some(Expr::field(
                "firstName".to_string(),
                FieldOp::Eq,
                Bson::String("John".to_string())
            ))
        );
        assert_eq!(query.skip, None);
        assert_eq!(query.limit, None);
    }

    #[test]
    fn multiple_clauses_combine_with_and() {
        let query = Query::from_options(&doc! {
            "$where": {
                "lastName": { "$eq": "Doe" },
                "age": { "$gt": 18, "$lt": 65 },
            },
        })
        .unwrap();

        match query.filter {
            Some(Expr::And(exprs)) => assert_eq!(exprs.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn parses_skip_and_limit() {
        let query = Query::from_options(&doc! { "$skip": 1, "$limit": 2 }).unwrap();
        assert_eq!(query.skip, Some(1));
        assert_eq!(query.limit, Some(2));
    }

    #[test]
    fn empty_options_match_everything() {
        let query = Query::from_options(&doc! {}).unwrap();
        assert_eq!(query, Query::new());
    }

    #[test]
    fn rejects_zero_limit() {
        assert!(matches!(
            Query::from_options(&doc! { "$limit": 0 }),
            Err(ContainerError::Query(_))
        ));
    }

    #[test]
    fn rejects_negative_skip() {
        assert!(matches!(
            Query::from_options(&doc! { "$skip": -1 }),
            Err(ContainerError::Query(_))
        ));
    }

    #[test]
    fn rejects_unknown_operator() {
        assert!(matches!(
            Query::from_options(&doc! { "$where": { "name": { "$regex": ".*" } } }),
            Err(ContainerError::Query(_))
        ));
    }

    #[test]
    fn rejects_unknown_option_key() {
        assert!(matches!(
            Query::from_options(&doc! { "$sort": "name" }),
            Err(ContainerError::Query(_))
        ));
    }

    #[test]
    fn from_parts_attaches_projection() {
        let query = Query::from_parts(
            Some(["firstName"]),
            &doc! { "$where": { "lastName": { "$eq": "Doe" } } },
        )
        .unwrap();

        assert_eq!(query.projection, Some(vec!["firstName".to_string()]));
        assert!(query.filter.is_some());

        let query = Query::from_parts(None::<[&str; 0]>, &doc! {}).unwrap();
        assert_eq!(query.projection, None);
    }

    #[test]
    fn builder_round_trip() {
        let query = Query::builder()
            .filter(Filter::eq("firstName", "John"))
            .skip(1)
            .limit(1)
            .build();

        assert_eq!(query.skip, Some(1));
        assert_eq!(query.limit, Some(1));
        assert!(query.filter.is_some());
    }

    #[test]
    fn expr_and_flattens() {
        let expr = Filter::eq("a", 1)
            .and(Filter::eq("b", 2))
            .and(Filter::eq("c", 3));

        match expr {
            Expr::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }
}

//! Query expression evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for query expressions,
//! enabling filtering and comparison operations on BSON documents.

use bson::{Bson, DateTime, Document};
use std::cmp::Ordering;

use recordlayer_core::{
    error::{ContainerError, ContainerResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Type-erased, comparable representation of BSON values.
///
/// Wraps BSON values for the comparison operators, normalizing all numeric
/// types to f64. Values of different kinds never compare equal and have no
/// ordering.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr.iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>(),
            ),
            // Null and every non-comparable kind collapse to Null.
            _ => Comparable::Null,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Evaluates a filter expression against one document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> ContainerResult<bool> {
        self.visit_expr(expr)
    }

    /// Filters `documents` down to those matching `expr`, cloning matches.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        expr: &Expr,
    ) -> ContainerResult<Vec<Document>> {
        let mut matches = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(expr)? {
                matches.push(document.clone());
            }
        }

        Ok(matches)
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = ContainerError;

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

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        // A missing field matches nothing, whatever the operator.
        let Some(field_value) = self.document.get(field) else {
            return Ok(false);
        };

        let left = Comparable::from(field_value);

        match op {
            FieldOp::Eq => Ok(left == Comparable::from(value)),
            FieldOp::Ne => Ok(left != Comparable::from(value)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match left.partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => Ok(match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        FieldOp::Lte => ordering != Ordering::Greater,
                        _ => unreachable!(),
                    }),
                    None => Ok(false),
                }
            }
            FieldOp::In | FieldOp::Nin => {
                let Bson::Array(values) = value else {
                    return Err(ContainerError::Query(format!(
                        "{} requires an array of values",
                        op.name()
                    )));
                };

                let contained = values
                    .iter()
                    .any(|candidate| Comparable::from(candidate) == left);

                Ok(match op {
                    FieldOp::In => contained,
                    _ => !contained,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use recordlayer_core::query::Filter;

    fn person() -> Document {
        doc! { "firstName": "John", "lastName": "Doe", "age": 42 }
    }

    #[test]
    fn eq_is_strict_equality() {
        let person = person();
        let mut evaluator = DocumentEvaluator::new(&person);

        assert!(evaluator
            .evaluate(&Filter::eq("firstName", "John"))
            .unwrap());
        assert!(!evaluator
            .evaluate(&Filter::eq("firstName", "Jane"))
            .unwrap());
        // Numbers never equal strings.
        assert!(!evaluator.evaluate(&Filter::eq("age", "42")).unwrap());
    }

    #[test]
    fn ordering_operators_compare_numbers() {
        let person = person();
        let mut evaluator = DocumentEvaluator::new(&person);

        assert!(evaluator.evaluate(&Filter::gt("age", 40)).unwrap());
        assert!(evaluator.evaluate(&Filter::lte("age", 42)).unwrap());
        assert!(!evaluator.evaluate(&Filter::lt("age", 42)).unwrap());
        // Incomparable kinds never match.
        assert!(!evaluator.evaluate(&Filter::gt("firstName", 1)).unwrap());
    }

    #[test]
    fn missing_fields_match_nothing() {
        let person = person();
        let mut evaluator = DocumentEvaluator::new(&person);

        assert!(!evaluator.evaluate(&Filter::eq("missing", 1)).unwrap());
        assert!(!evaluator.evaluate(&Filter::ne("missing", 1)).unwrap());
    }

    #[test]
    fn in_and_nin_check_membership() {
        let person = person();
        let mut evaluator = DocumentEvaluator::new(&person);

        assert!(evaluator
            .evaluate(&Filter::any_of("firstName", vec!["John", "Jane"]))
            .unwrap());
        assert!(evaluator
            .evaluate(&Filter::none_of("firstName", vec!["Jane"]))
            .unwrap());
        assert!(evaluator
            .evaluate(&Filter::any_of("firstName", "John"))
            .is_err());
    }

    #[test]
    fn logical_composition() {
        let person = person();
        let mut evaluator = DocumentEvaluator::new(&person);

        let expr = Filter::eq("firstName", "John").and(Filter::gt("age", 40));
        assert!(evaluator.evaluate(&expr).unwrap());

        let expr = Filter::eq("firstName", "Jane")
            .or(Filter::eq("lastName", "Doe"))
            .not();
        assert!(!evaluator.evaluate(&expr).unwrap());
    }

    #[test]
    fn filter_documents_keeps_matches_only() {
        let docs = vec![
            doc! { "firstName": "John" },
            doc! { "firstName": "Jane" },
        ];

        let matches =
            DocumentEvaluator::filter_documents(docs.iter(), &Filter::eq("firstName", "Jane"))
                .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].get_str("firstName").unwrap(), "Jane");
    }
}

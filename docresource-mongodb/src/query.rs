//! Query translation from docresource expressions to MongoDB query syntax.

use bson::{Bson, Document, doc};

use docresource_core::{
    error::StoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

use crate::sanitizer::KeySanitizer;

/// Translates query expressions into MongoDB filter documents.
///
/// Field names go through the same key sanitization as stored documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    fn translate_all(&mut self, exprs: &[Expr]) -> Result<Vec<Document>, StoreError> {
        exprs
            .iter()
            .map(|expr| self.visit_expr(expr))
            .collect()
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // `$and` rejects an empty array; an empty conjunction matches everything.
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! { "$and": self.translate_all(exprs)? })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! { "$nor": [{}] });
        }

        Ok(doc! { "$or": self.translate_all(exprs)? })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // `$not` only applies to operator expressions; `$nor` negates a whole filter.
        let inner = self.visit_expr(expr)?;

        Ok(doc! { "$nor": [inner] })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        let field = KeySanitizer::sanitize_key(field);

        Ok(doc! { field: { "$exists": should_exist } })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let condition = match op {
            FieldOp::Eq => doc! { "$eq": value },
            FieldOp::Ne => doc! { "$ne": value },
            FieldOp::Gt => doc! { "$gt": value },
            FieldOp::Gte => doc! { "$gte": value },
            FieldOp::Lt => doc! { "$lt": value },
            FieldOp::Lte => doc! { "$lte": value },
            FieldOp::AnyOf | FieldOp::NoneOf => {
                let values = match value {
                    Bson::Array(values) => values.clone(),
                    single => vec![single.clone()],
                };

                if matches!(op, FieldOp::AnyOf) {
                    doc! { "$in": values }
                } else {
                    doc! { "$nin": values }
                }
            }
        };

        let field = KeySanitizer::sanitize_key(field);

        Ok(doc! { field: condition })
    }
}

//! Schema traversal over live database metadata.
//!
//! `SchemaWalker` borrows a connection for the duration of one metadata call
//! and hands back single-pass iterators. Each call issues exactly one
//! metadata query; descriptors are built lazily as the iterator is consumed.
//! Errors from the underlying connection are propagated unchanged.

use crate::Result;
use crate::adapters::DatabaseAccess;
use crate::classifier::TypeClassifier;
use crate::models::{ColumnDescriptor, RawColumn};
use std::sync::Arc;

/// Enumerates tables and columns through a borrowed connection.
pub struct SchemaWalker<'c, A: DatabaseAccess + ?Sized> {
    access: &'c mut A,
    classifier: Arc<TypeClassifier>,
    primary_key_marker: String,
}

impl<'c, A: DatabaseAccess + ?Sized> SchemaWalker<'c, A> {
    /// Creates a walker over `access`.
    ///
    /// `primary_key_marker` is the catalog's key flag for primary-key columns.
    pub fn new(
        access: &'c mut A,
        classifier: Arc<TypeClassifier>,
        primary_key_marker: impl Into<String>,
    ) -> Self {
        Self {
            access,
            classifier,
            primary_key_marker: primary_key_marker.into(),
        }
    }

    /// Table names of the active database, in catalog order.
    ///
    /// A fresh call re-queries the catalog.
    pub async fn tables(&mut self) -> Result<Tables> {
        let names = self.access.list_tables().await?;
        tracing::debug!("Enumerated {} tables", names.len());
        Ok(Tables {
            inner: names.into_iter(),
        })
    }

    /// Column descriptors of `table`, in catalog order.
    pub async fn columns(&mut self, table: &str) -> Result<Columns> {
        let raw = self.access.list_columns(table).await?;
        tracing::trace!("Enumerated {} columns of '{}'", raw.len(), table);
        Ok(Columns {
            inner: raw.into_iter(),
            classifier: Arc::clone(&self.classifier),
            primary_key_marker: self.primary_key_marker.clone(),
        })
    }
}

/// Single-pass sequence of table names.
#[derive(Debug)]
pub struct Tables {
    inner: std::vec::IntoIter<String>,
}

impl Iterator for Tables {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Tables {}

/// Single-pass sequence of column descriptors.
#[derive(Debug)]
pub struct Columns {
    inner: std::vec::IntoIter<RawColumn>,
    classifier: Arc<TypeClassifier>,
    primary_key_marker: String,
}

impl Iterator for Columns {
    type Item = ColumnDescriptor;

    fn next(&mut self) -> Option<ColumnDescriptor> {
        self.inner.next().map(|raw| {
            ColumnDescriptor::new(raw, &self.primary_key_marker, Arc::clone(&self.classifier))
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Columns {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ConnectionSource, MemoryDatabase};
    use crate::error::RecodeError;

    fn shop() -> MemoryDatabase {
        MemoryDatabase::new()
            .with_table(
                "people",
                vec![
                    RawColumn::new("id", "int(11)", "PRI"),
                    RawColumn::new("city", "varchar(20)", ""),
                ],
                Vec::new(),
            )
            .with_table(
                "shapes",
                vec![RawColumn::new("outline", "geometry", "")],
                Vec::new(),
            )
    }

    #[tokio::test]
    async fn test_tables_in_catalog_order() {
        let db = shop();
        let mut conn = db.acquire().await.unwrap();
        let mut walker = SchemaWalker::new(&mut conn, Arc::new(TypeClassifier::default()), "PRI");

        let tables: Vec<String> = walker.tables().await.unwrap().collect();
        assert_eq!(tables, vec!["people".to_string(), "shapes".to_string()]);

        // A fresh call re-queries
        assert_eq!(walker.tables().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_columns_build_descriptors() {
        let db = shop();
        let mut conn = db.acquire().await.unwrap();
        let mut walker = SchemaWalker::new(&mut conn, Arc::new(TypeClassifier::default()), "PRI");

        let columns: Vec<ColumnDescriptor> = walker.columns("people").await.unwrap().collect();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].to_string(), "id* int");
        assert!(!columns[0].is_text().unwrap());
        assert_eq!(columns[1].to_string(), "city varchar");
        assert!(columns[1].is_text().unwrap());
    }

    #[tokio::test]
    async fn test_unknown_type_surfaces_on_classification() {
        let db = shop();
        let mut conn = db.acquire().await.unwrap();
        let mut walker = SchemaWalker::new(&mut conn, Arc::new(TypeClassifier::default()), "PRI");

        let mut columns = walker.columns("shapes").await.unwrap();
        let outline = columns.next().unwrap();
        assert!(matches!(
            outline.is_text(),
            Err(RecodeError::UnknownType { .. })
        ));
    }

    #[tokio::test]
    async fn test_errors_propagate_unchanged() {
        let db = shop();
        let mut conn = db.acquire().await.unwrap();
        let mut walker = SchemaWalker::new(&mut conn, Arc::new(TypeClassifier::default()), "PRI");

        let err = walker.columns("missing").await.unwrap_err();
        assert!(matches!(err, RecodeError::Query { .. }));
    }
}

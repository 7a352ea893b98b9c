//! Primary key resolution.

use crate::Result;
use crate::adapters::DatabaseAccess;
use crate::models::ColumnDescriptor;
use crate::walker::SchemaWalker;

/// Names of the primary-key columns among `columns`, in catalog order.
pub fn primary_key_columns<I>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = ColumnDescriptor>,
{
    columns
        .into_iter()
        .filter(ColumnDescriptor::is_primary_key)
        .map(|c| c.name().to_string())
        .collect()
}

impl<A: DatabaseAccess + ?Sized> SchemaWalker<'_, A> {
    /// Ordered primary-key column names of `table`.
    ///
    /// The order is the catalog's and must be kept end to end: fetched key
    /// values are paired with these names by position. An empty result means
    /// rows of `table` cannot be addressed individually and the table must
    /// not be recoded.
    pub async fn primary_keys(&mut self, table: &str) -> Result<Vec<String>> {
        let keys = primary_key_columns(self.columns(table).await?);
        tracing::trace!("Primary key of '{}': {:?}", table, keys);
        Ok(keys)
    }
}

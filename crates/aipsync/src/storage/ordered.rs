//! Ordered, replace-only persistence of one record category.

use std::fmt;
use std::marker::PhantomData;

use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{Category, CategoryRecord};

/// Handle on the table of one category.
///
/// Records have no identity of their own; a record's position in the batch
/// it was written with is its key. `read_all` returns records in exactly
/// that order, without the position.
pub struct OrderedStore<'a, R> {
    conn: &'a Connection,
    record: PhantomData<fn() -> R>,
}

impl<R> fmt::Debug for OrderedStore<'_, R>
where
    R: CategoryRecord,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedStore")
            .field("category", &R::CATEGORY)
            .finish_non_exhaustive()
    }
}

impl<'a, R: CategoryRecord> OrderedStore<'a, R> {
    pub(crate) const fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            record: PhantomData,
        }
    }

    /// The category this store holds.
    #[must_use]
    pub const fn category(&self) -> Category {
        R::CATEGORY
    }

    /// Replace the whole category with `items`.
    ///
    /// The clear and every insert run in one transaction: if anything fails
    /// the previous contents are left in place and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be encoded or the database
    /// operation fails.
    pub fn write(&self, items: &[R]) -> Result<()> {
        let table = R::CATEGORY.table();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(&format!("DELETE FROM {table}"), [])?;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {table} (seq, body) VALUES (?1, ?2)"))?;
            for (position, item) in items.iter().enumerate() {
                let seq = i64::try_from(position)
                    .map_err(|_| Error::internal(format!("batch too large for {table}")))?;
                let body = serde_json::to_string(item)?;
                stmt.execute(params![seq, body])?;
            }
        }
        tx.commit()?;

        debug!("Stored {} {} records", items.len(), R::CATEGORY);
        Ok(())
    }

    /// Read every record of the category in write order.
    ///
    /// An empty category yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a stored record
    /// cannot be decoded.
    pub fn read_all(&self) -> Result<Vec<R>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT body FROM {} ORDER BY seq ASC",
            R::CATEGORY.table()
        ))?;

        let bodies = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(Error::from))
            .collect()
    }

    /// Remove every record of the category.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self) -> Result<()> {
        clear_table(self.conn, R::CATEGORY)
    }

    /// Number of records held.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<usize> {
        count_table(self.conn, R::CATEGORY)
    }
}

pub(crate) fn clear_table(conn: &Connection, category: Category) -> Result<()> {
    conn.execute(&format!("DELETE FROM {}", category.table()), [])?;
    Ok(())
}

pub(crate) fn count_table(conn: &Connection, category: Category) -> Result<usize> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", category.table()),
        [],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

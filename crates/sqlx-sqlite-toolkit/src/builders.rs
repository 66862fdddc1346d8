//! Query builders bound to a read or write target

use std::future::{Future, IntoFuture};
use std::pin::Pin;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::decode::decode_rows;
use crate::executor::{Target, WriteQueryResult};
use crate::{Error, Result};

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
   /// Ascending order (smallest first)
   Asc,
   /// Descending order (largest first)
   Desc,
}

impl SortDirection {
   fn as_sql(self) -> &'static str {
      match self {
         SortDirection::Asc => "ASC",
         SortDirection::Desc => "DESC",
      }
   }
}

/// Quote an identifier, keeping `table.column` qualification.
pub(crate) fn quote_identifier(name: &str) -> String {
   name
      .split('.')
      .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
      .collect::<Vec<_>>()
      .join(".")
}

enum Condition {
   Eq(String, JsonValue),
   Null(String),
}

/// Builder for SELECT queries
///
/// ```no_run
/// # async fn example(client: sqlx_sqlite_toolkit::QueryClient) -> sqlx_sqlite_toolkit::Result<()> {
/// use sqlx_sqlite_toolkit::SortDirection;
///
/// let rows = client
///    .query()
///    .from("users")
///    .select(["id", "username"])
///    .where_eq("active", 1)
///    .order_by("id", SortDirection::Desc)
///    .limit(10)
///    .await?;
/// # Ok(())
/// # }
/// ```
pub struct SelectQuery<'a> {
   target: Target<'a>,
   table: Option<String>,
   columns: Vec<String>,
   conditions: Vec<Condition>,
   order_by: Vec<(String, SortDirection)>,
   limit: Option<u64>,
   offset: Option<u64>,
}

impl<'a> SelectQuery<'a> {
   pub(crate) fn new(target: Target<'a>) -> Self {
      Self {
         target,
         table: None,
         columns: Vec::new(),
         conditions: Vec::new(),
         order_by: Vec::new(),
         limit: None,
         offset: None,
      }
   }

   /// Table to select from
   pub fn from(mut self, table: impl Into<String>) -> Self {
      self.table = Some(table.into());
      self
   }

   /// Columns to return. Defaults to `*`.
   pub fn select<I, S>(mut self, columns: I) -> Self
   where
      I: IntoIterator<Item = S>,
      S: Into<String>,
   {
      self.columns.extend(columns.into_iter().map(Into::into));
      self
   }

   /// `column = value`; a JSON null becomes `column IS NULL`
   pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
      let column = column.into();
      let value = value.into();
      self.conditions.push(if value.is_null() {
         Condition::Null(column)
      } else {
         Condition::Eq(column, value)
      });
      self
   }

   pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
      self.order_by.push((column.into(), direction));
      self
   }

   pub fn limit(mut self, limit: u64) -> Self {
      self.limit = Some(limit);
      self
   }

   pub fn offset(mut self, offset: u64) -> Self {
      self.offset = Some(offset);
      self
   }

   /// Compile to SQL and bind values without running anything
   pub fn to_sql(&self) -> Result<(String, Vec<JsonValue>)> {
      let table = self.table.as_deref().ok_or(Error::MissingTable)?;

      let columns = if self.columns.is_empty() {
         "*".to_string()
      } else {
         self
            .columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
      };

      let mut sql = format!("SELECT {} FROM {}", columns, quote_identifier(table));
      let mut values = Vec::new();

      if !self.conditions.is_empty() {
         let clauses: Vec<String> = self
            .conditions
            .iter()
            .map(|condition| match condition {
               Condition::Eq(column, value) => {
                  values.push(value.clone());
                  format!("{} = ?", quote_identifier(column))
               }
               Condition::Null(column) => format!("{} IS NULL", quote_identifier(column)),
            })
            .collect();
         sql.push_str(" WHERE ");
         sql.push_str(&clauses.join(" AND "));
      }

      if !self.order_by.is_empty() {
         let order: Vec<String> = self
            .order_by
            .iter()
            .map(|(column, direction)| format!("{} {}", quote_identifier(column), direction.as_sql()))
            .collect();
         sql.push_str(" ORDER BY ");
         sql.push_str(&order.join(", "));
      }

      match (self.limit, self.offset) {
         (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
         (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
         // SQLite needs a LIMIT for OFFSET; -1 means no limit
         (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
         (None, None) => {}
      }

      Ok((sql, values))
   }

   /// Execute the query and return all matching rows
   pub async fn execute(self) -> Result<Vec<IndexMap<String, JsonValue>>> {
      let (sql, values) = self.to_sql()?;
      let rows = self.target.fetch_all(&sql, values).await?;
      decode_rows(rows)
   }

   /// Execute with `LIMIT 1` and return the first row, if any
   pub async fn first(self) -> Result<Option<IndexMap<String, JsonValue>>> {
      Ok(self.limit(1).execute().await?.into_iter().next())
   }
}

impl<'a> IntoFuture for SelectQuery<'a> {
   type Output = Result<Vec<IndexMap<String, JsonValue>>>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.execute())
   }
}

/// Builder for INSERT queries
pub struct InsertQuery<'a> {
   target: Target<'a>,
   table: Option<String>,
}

impl<'a> InsertQuery<'a> {
   pub(crate) fn new(target: Target<'a>) -> Self {
      Self {
         target,
         table: None,
      }
   }

   /// Table to insert into
   pub fn table(mut self, table: impl Into<String>) -> Self {
      self.table = Some(table.into());
      self
   }

   /// Insert one row. `row` must serialize to a JSON object.
   pub async fn insert<T: Serialize>(self, row: T) -> Result<WriteQueryResult> {
      let row = serde_json::to_value(row).map_err(|e| Error::InvalidInsertRow(e.to_string()))?;
      self.multi_insert(vec![row]).await
   }

   /// Insert several rows in one statement. Columns are the union of every
   /// row's keys; keys missing from a row are inserted as NULL.
   pub async fn multi_insert<T: Serialize>(self, rows: Vec<T>) -> Result<WriteQueryResult> {
      let rows = rows
         .into_iter()
         .map(|row| serde_json::to_value(row).map_err(|e| Error::InvalidInsertRow(e.to_string())))
         .collect::<Result<Vec<_>>>()?;

      let (sql, values) = compile_insert(self.table.as_deref(), rows)?;
      self.target.execute(&sql, values).await
   }
}

fn compile_insert(table: Option<&str>, rows: Vec<JsonValue>) -> Result<(String, Vec<JsonValue>)> {
   let table = table.ok_or(Error::MissingTable)?;

   let mut objects = Vec::with_capacity(rows.len());
   for row in rows {
      match row {
         JsonValue::Object(map) => objects.push(map),
         other => return Err(Error::InvalidInsertRow(format!("got {}", other))),
      }
   }

   let columns: IndexSet<String> = objects
      .iter()
      .flat_map(|map| map.keys().cloned())
      .collect();
   if columns.is_empty() {
      return Err(Error::EmptyInsert);
   }

   let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
   let mut values = Vec::with_capacity(columns.len() * objects.len());
   for mut map in objects {
      for column in &columns {
         values.push(map.remove(column).unwrap_or(JsonValue::Null));
      }
   }

   let row_count = values.len() / columns.len();
   let sql = format!(
      "INSERT INTO {} ({}) VALUES {}",
      quote_identifier(table),
      columns
         .iter()
         .map(|c| quote_identifier(c))
         .collect::<Vec<_>>()
         .join(", "),
      vec![placeholders; row_count].join(", ")
   );

   Ok((sql, values))
}

/// Builder for SELECT queries written as SQL, returning multiple rows
pub struct FetchAllBuilder<'a> {
   target: Target<'a>,
   query: String,
   values: Vec<JsonValue>,
}

impl<'a> FetchAllBuilder<'a> {
   pub(crate) fn new(target: Target<'a>, query: String, values: Vec<JsonValue>) -> Self {
      Self {
         target,
         query,
         values,
      }
   }

   /// Execute the query and return all matching rows
   pub async fn execute(self) -> Result<Vec<IndexMap<String, JsonValue>>> {
      let rows = self.target.fetch_all(&self.query, self.values).await?;
      decode_rows(rows)
   }
}

impl<'a> IntoFuture for FetchAllBuilder<'a> {
   type Output = Result<Vec<IndexMap<String, JsonValue>>>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.execute())
   }
}

/// Builder for SELECT queries written as SQL, returning zero or one row
pub struct FetchOneBuilder<'a> {
   target: Target<'a>,
   query: String,
   values: Vec<JsonValue>,
}

impl<'a> FetchOneBuilder<'a> {
   pub(crate) fn new(target: Target<'a>, query: String, values: Vec<JsonValue>) -> Self {
      Self {
         target,
         query,
         values,
      }
   }

   /// Execute the query and return zero or one row
   pub async fn execute(self) -> Result<Option<IndexMap<String, JsonValue>>> {
      let rows = self.target.fetch_all(&self.query, self.values).await?;

      // Validate row count
      match rows.len() {
         0 | 1 => Ok(decode_rows(rows)?.into_iter().next()),
         count => Err(Error::MultipleRowsReturned(count)),
      }
   }
}

impl<'a> IntoFuture for FetchOneBuilder<'a> {
   type Output = Result<Option<IndexMap<String, JsonValue>>>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.execute())
   }
}

/// Builder for write queries (INSERT/UPDATE/DELETE) written as SQL
pub struct ExecuteBuilder<'a> {
   target: Target<'a>,
   query: String,
   values: Vec<JsonValue>,
}

impl<'a> ExecuteBuilder<'a> {
   pub(crate) fn new(target: Target<'a>, query: String, values: Vec<JsonValue>) -> Self {
      Self {
         target,
         query,
         values,
      }
   }

   /// Execute the write operation
   pub async fn execute(self) -> Result<WriteQueryResult> {
      self.target.execute(&self.query, self.values).await
   }
}

impl<'a> IntoFuture for ExecuteBuilder<'a> {
   type Output = Result<WriteQueryResult>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.execute())
   }
}

/// Deferred raw SQL statement.
///
/// Nothing is sent until [`exec`](Self::exec) runs (or the builder is
/// awaited). The SQL text is not inspected, so the statement runs on
/// whatever target the client routed reads to.
pub struct RawQuery<'a> {
   target: Target<'a>,
   sql: String,
   bindings: Vec<JsonValue>,
}

impl<'a> RawQuery<'a> {
   pub(crate) fn new(target: Target<'a>, sql: String) -> Self {
      Self {
         target,
         sql,
         bindings: Vec::new(),
      }
   }

   /// Values for the statement's `?` / `$N` placeholders
   pub fn bindings(mut self, values: Vec<JsonValue>) -> Self {
      self.bindings = values;
      self
   }

   pub fn sql(&self) -> &str {
      &self.sql
   }

   /// Run the statement and return the rows it produced (empty for
   /// statements that return none)
   pub async fn exec(self) -> Result<Vec<IndexMap<String, JsonValue>>> {
      let rows = self.target.fetch_all(&self.sql, self.bindings).await?;
      decode_rows(rows)
   }
}

impl<'a> IntoFuture for RawQuery<'a> {
   type Output = Result<Vec<IndexMap<String, JsonValue>>>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.exec())
   }
}

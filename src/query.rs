//! Query builder for OakBase collections.
//!
//! Accumulates filters, OR conditions, relationship population, field
//! selection, sorting and pagination through a chainable API, then renders
//! them into the query-string format the OakBase filtering engine consumes.
//!
//! # Example
//!
//! ```
//! use oakbase::query::QueryBuilder;
//!
//! let qs = QueryBuilder::new()
//!   .set_equal("status", "active")
//!   .where_greater_than_or_equal("age", 18)
//!   .populate("author")
//!   .order_by_desc("created_at")
//!   .limit(20)
//!   .build();
//!
//! assert_eq!(
//!   qs,
//!   "status=active&age__gte=18&populate=author&sort_by=created_at&order=desc&limit=20"
//! );
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
  Asc,
  Desc,
}

impl fmt::Display for SortDir {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SortDir::Asc => write!(f, "asc"),
      SortDir::Desc => write!(f, "desc"),
    }
  }
}

/// Comparison operators recognized by the OakBase filtering engine.
///
/// Every operator except equality is appended to the field name as a
/// `__<tag>` suffix. Equality carries no suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
  GreaterThan,
  GreaterThanOrEqual,
  LessThan,
  LessThanOrEqual,
  NotEqual,
  In,
  NotIn,
  IsNull,
  Contains,
  StartsWith,
  EndsWith,
}

impl Operator {
  /// The wire tag appended to a field name as `field__<tag>`.
  pub fn tag(&self) -> &'static str {
    match self {
      Operator::GreaterThan => "gt",
      Operator::GreaterThanOrEqual => "gte",
      Operator::LessThan => "lt",
      Operator::LessThanOrEqual => "lte",
      Operator::NotEqual => "ne",
      Operator::In => "in",
      Operator::NotIn => "notin",
      Operator::IsNull => "isnull",
      Operator::Contains => "contains",
      Operator::StartsWith => "startswith",
      Operator::EndsWith => "endswith",
    }
  }
}

impl FromStr for Operator {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "gt" => Ok(Operator::GreaterThan),
      "gte" => Ok(Operator::GreaterThanOrEqual),
      "lt" => Ok(Operator::LessThan),
      "lte" => Ok(Operator::LessThanOrEqual),
      "ne" => Ok(Operator::NotEqual),
      "in" => Ok(Operator::In),
      "notin" => Ok(Operator::NotIn),
      "isnull" => Ok(Operator::IsNull),
      "contains" => Ok(Operator::Contains),
      "startswith" => Ok(Operator::StartsWith),
      "endswith" => Ok(Operator::EndsWith),
      _ => Err(Error::UnsupportedOperator(s.to_string())),
    }
  }
}

impl fmt::Display for Operator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.tag())
  }
}

/// A primitive filter value.
///
/// Filters only accept strings, numbers, booleans, null and lists of
/// primitives. Anything richer (objects, nested arrays) is rejected at the
/// conversion boundary so a malformed value can never reach the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  String(String),
  Int(i64),
  Float(f64),
  Bool(bool),
  Null,
  List(Vec<Value>),
}

impl Value {
  /// Render the value as wire text, before percent-encoding.
  ///
  /// Lists join their elements with a literal comma, which is how the
  /// backend expects `in`/`notin` operands.
  pub fn render(&self) -> String {
    match self {
      Value::String(s) => s.clone(),
      Value::Int(i) => i.to_string(),
      Value::Float(n) => n.to_string(),
      Value::Bool(b) => b.to_string(),
      Value::Null => "null".to_string(),
      Value::List(items) => {
        let parts: Vec<String> = items.iter().map(|v| v.render()).collect();
        parts.join(",")
      }
    }
  }

  /// Percent-encoded wire text. The comma joining list elements is
  /// structural and stays literal; each element is encoded on its own.
  fn encoded(&self) -> String {
    match self {
      Value::List(items) => {
        let parts: Vec<String> = items
          .iter()
          .map(|v| urlencoding::encode(&v.render()).into_owned())
          .collect();
        parts.join(",")
      }
      other => urlencoding::encode(&other.render()).into_owned(),
    }
  }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self {
    Value::String(v.to_string())
  }
}

impl From<String> for Value {
  fn from(v: String) -> Self {
    Value::String(v)
  }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self {
    Value::Int(v as i64)
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self {
    Value::Int(v)
  }
}

impl From<u32> for Value {
  fn from(v: u32) -> Self {
    Value::Int(v as i64)
  }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self {
    Value::Float(v)
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self {
    Value::Bool(v)
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(v: Vec<T>) -> Self {
    Value::List(v.into_iter().map(Into::into).collect())
  }
}

impl TryFrom<serde_json::Value> for Value {
  type Error = Error;

  /// Accepts JSON primitives and arrays of primitives. Objects and nested
  /// arrays are not expressible in the wire format and fail fast.
  fn try_from(v: serde_json::Value) -> Result<Self> {
    match v {
      serde_json::Value::Null => Ok(Value::Null),
      serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
      serde_json::Value::Number(n) => {
        if let Some(i) = n.as_i64() {
          Ok(Value::Int(i))
        } else if let Some(f) = n.as_f64() {
          Ok(Value::Float(f))
        } else {
          Err(Error::InvalidFilterValue(format!("unrepresentable number: {}", n)))
        }
      }
      serde_json::Value::String(s) => Ok(Value::String(s)),
      serde_json::Value::Array(items) => {
        let mut list = Vec::with_capacity(items.len());
        for item in items {
          match item {
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
              return Err(Error::InvalidFilterValue(
                "list elements must be primitives".to_string(),
              ));
            }
            other => list.push(Value::try_from(other)?),
          }
        }
        Ok(Value::List(list))
      }
      serde_json::Value::Object(_) => Err(Error::InvalidFilterValue(
        "objects cannot be used as filter values".to_string(),
      )),
    }
  }
}

/// Separator joining multiple field names into one OR-across-fields key.
const FIELD_OR_JOIN: &str = "__or__";

/// Fluent builder for OakBase document queries.
///
/// All mutation methods consume and return the builder so calls chain; the
/// builder is a plain value, so `clone()` produces a fully independent
/// snapshot. `build()` is a pure read and always renders the same string
/// for the same state.
///
/// Entries land in fixed buckets regardless of call order. Equality-style
/// filters overwrite per key (position of the first write is kept), OR
/// conditions and OR groups accumulate, sort and pagination are
/// last-call-wins.
///
/// # Example
/// ```
/// use oakbase::query::QueryBuilder;
///
/// let qs = QueryBuilder::new()
///   .where_in("role", vec!["admin", "mod"])
///   .or_equal("age__gte", 18)
///   .or_equal("verified", true)
///   .build();
///
/// assert_eq!(qs, "role__in=admin,mod&[or]age__gte=18&[or]verified=true");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
  filters: Vec<(String, Value)>,
  or_filters: Vec<(String, Value)>,
  or_groups: Vec<(String, Vec<(String, Value)>)>,
  populate: Vec<String>,
  select: Vec<String>,
  sort: Option<(String, SortDir)>,
  limit: Option<u64>,
  offset: Option<u64>,
}

impl QueryBuilder {
  /// Create an empty query builder.
  pub fn new() -> Self {
    Self::default()
  }

  fn keyed(field: &str, op: Operator) -> String {
    format!("{}__{}", field, op.tag())
  }

  /// Overwrite-in-place: a key written twice keeps its original position.
  fn put(&mut self, key: String, value: Value) {
    match self.filters.iter_mut().find(|(k, _)| *k == key) {
      Some(slot) => slot.1 = value,
      None => self.filters.push((key, value)),
    }
  }

  /// Add an equality filter (`field=value`). Writing the same field again
  /// replaces the previous value.
  pub fn set_equal(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.put(field.into(), value.into());
    self
  }

  /// Merge a set of already-keyed filters, with the same per-key overwrite
  /// semantics as [`set_equal`](Self::set_equal).
  pub fn set_all<K, V, I>(mut self, entries: I) -> Self
  where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
  {
    for (key, value) in entries {
      self.put(key.into(), value.into());
    }
    self
  }

  /// Add a typed filter (`field__<tag>=value`).
  pub fn filter(mut self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
    self.put(Self::keyed(&field.into(), op), value.into());
    self
  }

  /// Add a filter from an operator tag string, validating the tag against
  /// the closed operator set.
  pub fn try_filter(
    self,
    field: impl Into<String>,
    op: &str,
    value: impl Into<Value>,
  ) -> Result<Self> {
    let op = op.parse::<Operator>()?;
    Ok(self.filter(field, op, value))
  }

  /// `field__ne=value`
  pub fn where_not_equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.filter(field, Operator::NotEqual, value)
  }

  /// `field__gt=value`
  pub fn where_greater_than(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.filter(field, Operator::GreaterThan, value)
  }

  /// `field__gte=value`
  pub fn where_greater_than_or_equal(
    self,
    field: impl Into<String>,
    value: impl Into<Value>,
  ) -> Self {
    self.filter(field, Operator::GreaterThanOrEqual, value)
  }

  /// `field__lt=value`
  pub fn where_less_than(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.filter(field, Operator::LessThan, value)
  }

  /// `field__lte=value`
  pub fn where_less_than_or_equal(
    self,
    field: impl Into<String>,
    value: impl Into<Value>,
  ) -> Self {
    self.filter(field, Operator::LessThanOrEqual, value)
  }

  /// `field__in=a,b,c`
  pub fn where_in<V: Into<Value>>(self, field: impl Into<String>, values: Vec<V>) -> Self {
    self.filter(field, Operator::In, Value::from(values))
  }

  /// `field__notin=a,b,c`
  pub fn where_not_in<V: Into<Value>>(self, field: impl Into<String>, values: Vec<V>) -> Self {
    self.filter(field, Operator::NotIn, Value::from(values))
  }

  /// `field__isnull=true|false`
  pub fn where_null(self, field: impl Into<String>, is_null: bool) -> Self {
    self.filter(field, Operator::IsNull, is_null)
  }

  /// `field__contains=value`
  pub fn where_contains(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.filter(field, Operator::Contains, value)
  }

  /// `field__startswith=value`
  pub fn where_starts_with(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.filter(field, Operator::StartsWith, value)
  }

  /// `field__endswith=value`
  pub fn where_ends_with(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.filter(field, Operator::EndsWith, value)
  }

  /// Append an OR condition (`[or]key=value`). The key is taken verbatim,
  /// so an operator suffix like `age__gte` passes through unchanged.
  ///
  /// OR conditions accumulate; the backend ORs all of them together and
  /// ANDs the result against the plain filters.
  pub fn or_equal(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.or_filters.push((key.into(), value.into()));
    self
  }

  /// Append a typed OR condition (`[or]field__<tag>=value`).
  pub fn or_filter(
    mut self,
    field: impl Into<String>,
    op: Operator,
    value: impl Into<Value>,
  ) -> Self {
    self.or_filters.push((Self::keyed(&field.into(), op), value.into()));
    self
  }

  /// `[or]field__ne=value`
  pub fn or_not_equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.or_filter(field, Operator::NotEqual, value)
  }

  /// `[or]field__gt=value`
  pub fn or_greater_than(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.or_filter(field, Operator::GreaterThan, value)
  }

  /// `[or]field__gte=value`
  pub fn or_greater_than_or_equal(
    self,
    field: impl Into<String>,
    value: impl Into<Value>,
  ) -> Self {
    self.or_filter(field, Operator::GreaterThanOrEqual, value)
  }

  /// `[or]field__lt=value`
  pub fn or_less_than(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.or_filter(field, Operator::LessThan, value)
  }

  /// `[or]field__lte=value`
  pub fn or_less_than_or_equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.or_filter(field, Operator::LessThanOrEqual, value)
  }

  /// `[or]field__in=a,b,c`
  pub fn or_in<V: Into<Value>>(self, field: impl Into<String>, values: Vec<V>) -> Self {
    self.or_filter(field, Operator::In, Value::from(values))
  }

  /// `[or]field__notin=a,b,c`
  pub fn or_not_in<V: Into<Value>>(self, field: impl Into<String>, values: Vec<V>) -> Self {
    self.or_filter(field, Operator::NotIn, Value::from(values))
  }

  /// `[or]field__isnull=true|false`
  pub fn or_null(self, field: impl Into<String>, is_null: bool) -> Self {
    self.or_filter(field, Operator::IsNull, is_null)
  }

  /// `[or]field__contains=value`
  pub fn or_contains(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.or_filter(field, Operator::Contains, value)
  }

  /// `[or]field__startswith=value`
  pub fn or_starts_with(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.or_filter(field, Operator::StartsWith, value)
  }

  /// `[or]field__endswith=value`
  pub fn or_ends_with(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.or_filter(field, Operator::EndsWith, value)
  }

  /// Append a condition to a named OR group (`[or:name]key=value`).
  ///
  /// Conditions inside one group are OR-ed together; distinct groups are
  /// AND-ed against each other and against the plain filters. The key is
  /// taken verbatim, so it may carry an operator suffix. Groups render in
  /// the order they were first created.
  pub fn or_group(
    mut self,
    group: impl Into<String>,
    key: impl Into<String>,
    value: impl Into<Value>,
  ) -> Self {
    let group = group.into();
    let entry = (key.into(), value.into());
    match self.or_groups.iter_mut().find(|(name, _)| *name == group) {
      Some((_, entries)) => entries.push(entry),
      None => self.or_groups.push((group, vec![entry])),
    }
    self
  }

  /// Match one value against several fields at once.
  ///
  /// The fields are joined into a single key with `__or__`, which the
  /// backend expands into a per-field OR. The entry itself lives in the
  /// plain filter bucket, so it is AND-ed against everything else.
  pub fn multi_field_or(
    mut self,
    fields: &[&str],
    value: impl Into<Value>,
    op: Option<Operator>,
  ) -> Self {
    let mut key = fields.join(FIELD_OR_JOIN);
    if let Some(op) = op {
      key = format!("{}__{}", key, op.tag());
    }
    self.put(key, value.into());
    self
  }

  /// Substring-search one term across several fields:
  /// `a__or__b__contains=term`.
  pub fn search_in_fields(self, fields: &[&str], term: impl Into<Value>) -> Self {
    self.multi_field_or(fields, term, Some(Operator::Contains))
  }

  /// Ask the backend to inline the related records at `path`
  /// (dot-separated for nesting).
  pub fn populate(mut self, path: impl Into<String>) -> Self {
    self.populate.push(path.into());
    self
  }

  /// Add several population paths at once.
  pub fn populate_all<P: Into<String>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
    self.populate.extend(paths.into_iter().map(Into::into));
    self
  }

  /// Restrict the returned fields to `path`.
  pub fn select(mut self, path: impl Into<String>) -> Self {
    self.select.push(path.into());
    self
  }

  /// Add several selection paths at once.
  pub fn select_all<P: Into<String>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
    self.select.extend(paths.into_iter().map(Into::into));
    self
  }

  /// Sort by a field. A later call replaces the previous sort entirely.
  pub fn sort_by(mut self, field: impl Into<String>, direction: SortDir) -> Self {
    self.sort = Some((field.into(), direction));
    self
  }

  /// Sort ascending by a field.
  pub fn order_by_asc(self, field: impl Into<String>) -> Self {
    self.sort_by(field, SortDir::Asc)
  }

  /// Sort descending by a field.
  pub fn order_by_desc(self, field: impl Into<String>) -> Self {
    self.sort_by(field, SortDir::Desc)
  }

  /// Cap the number of returned documents.
  pub fn limit(mut self, n: u64) -> Self {
    self.limit = Some(n);
    self
  }

  /// Alias for [`limit`](Self::limit).
  pub fn take(self, n: u64) -> Self {
    self.limit(n)
  }

  /// Skip the first `n` matching documents.
  pub fn offset(mut self, n: u64) -> Self {
    self.offset = Some(n);
    self
  }

  /// Alias for [`offset`](Self::offset).
  pub fn skip(self, n: u64) -> Self {
    self.offset(n)
  }

  /// Reset every bucket to its empty state.
  pub fn clear(mut self) -> Self {
    self.filters.clear();
    self.or_filters.clear();
    self.or_groups.clear();
    self.populate.clear();
    self.select.clear();
    self.sort = None;
    self.limit = None;
    self.offset = None;
    self
  }

  /// True when nothing has been accumulated yet.
  pub fn is_empty(&self) -> bool {
    self.filters.is_empty()
      && self.or_filters.is_empty()
      && self.or_groups.is_empty()
      && self.populate.is_empty()
      && self.select.is_empty()
      && self.sort.is_none()
      && self.limit.is_none()
      && self.offset.is_none()
  }

  /// Render the accumulated query as a URL query string.
  ///
  /// Emission order is fixed: filters, OR conditions, OR groups, populate,
  /// select, sort, limit, offset. Values are percent-encoded; keys and the
  /// `[or]` / `[or:group]` prefixes are structural and pass through raw.
  /// An empty builder renders the empty string.
  pub fn build(&self) -> String {
    let mut pairs: Vec<String> = Vec::new();

    for (key, value) in &self.filters {
      pairs.push(format!("{}={}", key, value.encoded()));
    }

    for (key, value) in &self.or_filters {
      pairs.push(format!("[or]{}={}", key, value.encoded()));
    }

    for (group, entries) in &self.or_groups {
      for (key, value) in entries {
        pairs.push(format!("[or:{}]{}={}", group, key, value.encoded()));
      }
    }

    for path in &self.populate {
      pairs.push(format!("populate={}", urlencoding::encode(path)));
    }

    for path in &self.select {
      pairs.push(format!("select={}", urlencoding::encode(path)));
    }

    if let Some((field, direction)) = &self.sort {
      pairs.push(format!("sort_by={}", urlencoding::encode(field)));
      pairs.push(format!("order={}", direction));
    }

    if let Some(n) = self.limit {
      pairs.push(format!("limit={}", n));
    }

    if let Some(n) = self.offset {
      pairs.push(format!("offset={}", n));
    }

    pairs.join("&")
  }
}

impl fmt::Display for QueryBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.build())
  }
}

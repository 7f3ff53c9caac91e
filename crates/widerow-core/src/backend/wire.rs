//! Module: backend::wire
//! Responsibility: request/response shapes exchanged with the storage backend.
//! Does not own: row translation (see `db::mapper`) or transport.
//! Boundary: every type here is what the backend client serializes.

use crate::{
    backend::BackendError,
    schema::PrimaryKeyColumn,
    value::{KeyValue, Value},
};
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// PrimaryKey
///
/// Ordered `(name, cell)` pairs in schema order.
///

#[derive(Clone, Debug, Default, Deref, Deserialize, Eq, IntoIterator, PartialEq, Serialize)]
#[into_iterator(owned, ref)]
pub struct PrimaryKey(Vec<(String, KeyValue)>);

impl PrimaryKey {
    #[must_use]
    pub const fn new(cells: Vec<(String, KeyValue)>) -> Self {
        Self(cells)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&KeyValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: KeyValue) {
        self.0.push((name.into(), value));
    }

    /// Key cells without their column names, in schema order.
    #[must_use]
    pub fn cells(&self) -> Vec<KeyValue> {
        self.0.iter().map(|(_, v)| v.clone()).collect()
    }
}

impl FromIterator<(String, KeyValue)> for PrimaryKey {
    fn from_iter<I: IntoIterator<Item = (String, KeyValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

///
/// Attributes
///
/// Attribute column entries of one row.
///

#[derive(Clone, Debug, Default, Deref, Deserialize, IntoIterator, PartialEq, Serialize)]
#[into_iterator(owned, ref)]
pub struct Attributes(Vec<(String, Value)>);

impl Attributes {
    #[must_use]
    pub const fn new(columns: Vec<(String, Value)>) -> Self {
        Self(columns)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl FromIterator<(String, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

///
/// RowExistence
///
/// Existence precondition attached to a write.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowExistence {
    #[default]
    Ignore,
    ExpectExist,
    ExpectNotExist,
}

///
/// Condition
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub row_existence: RowExistence,
}

impl Condition {
    #[must_use]
    pub const fn new(row_existence: RowExistence) -> Self {
        Self { row_existence }
    }
}

///
/// Direction
///
/// Range scan traversal direction.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

///
/// TableRequest
///
/// Single-row request: a table name plus an operation body.
/// Batch requests carry the same bodies without the table name.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRequest<T> {
    pub table_name: String,
    #[serde(flatten)]
    pub body: T,
}

impl<T> TableRequest<T> {
    #[must_use]
    pub fn new(table_name: impl Into<String>, body: T) -> Self {
        Self {
            table_name: table_name.into(),
            body,
        }
    }

    /// Strip the table name, keeping the operation body.
    #[must_use]
    pub fn into_body(self) -> T {
        self.body
    }
}

///
/// PutRow
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRow {
    pub condition: Condition,
    pub primary_key: PrimaryKey,
    pub attribute_columns: Attributes,
}

///
/// ColumnUpdate
///
/// One entry of an update's column operation list.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnUpdate {
    Put(Attributes),
}

///
/// UpdateRow
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRow {
    pub condition: Condition,
    pub primary_key: PrimaryKey,
    pub update_of_attribute_columns: Vec<ColumnUpdate>,
}

///
/// DeleteRow
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRow {
    pub condition: Condition,
    pub primary_key: PrimaryKey,
}

///
/// GetRow
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRow {
    pub primary_key: PrimaryKey,
    pub columns_to_get: Vec<String>,
    pub max_versions: u32,
}

pub type PutRowRequest = TableRequest<PutRow>;
pub type UpdateRowRequest = TableRequest<UpdateRow>;
pub type DeleteRowRequest = TableRequest<DeleteRow>;
pub type GetRowRequest = TableRequest<GetRow>;

///
/// WriteRowResponse
///
/// Acknowledgement of a single-row write.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct WriteRowResponse {}

///
/// RowPayload
///
/// A row as returned by the backend.
/// Both halves empty means the row does not exist.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RowPayload {
    #[serde(rename = "primaryKey")]
    pub primary_key: PrimaryKey,
    pub attributes: Attributes,
}

impl RowPayload {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary_key.is_empty() && self.attributes.is_empty()
    }
}

///
/// GetRowResponse
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct GetRowResponse {
    #[serde(default)]
    pub row: RowPayload,
}

///
/// BatchGetTable
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetTable {
    pub table_name: String,
    pub primary_key: Vec<PrimaryKey>,
    pub columns_to_get: Vec<String>,
    pub max_versions: u32,
}

///
/// BatchGetRowRequest
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BatchGetRowRequest {
    pub tables: Vec<BatchGetTable>,
}

///
/// BatchGetItem
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BatchGetItem {
    #[serde(rename = "isOk")]
    pub is_ok: bool,
    #[serde(default)]
    pub error: Option<BackendError>,
    #[serde(flatten)]
    pub row: RowPayload,
}

///
/// BatchGetRowResponse
///
/// One item list per requested table, parallel to the request.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct BatchGetRowResponse {
    pub tables: Vec<Vec<BatchGetItem>>,
}

///
/// WriteKind
///
/// Backend write operation kind of a batch row.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WriteKind {
    Put,
    Update,
    Delete,
}

///
/// BatchWriteRow
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum BatchWriteRow {
    Put(PutRow),
    Update(UpdateRow),
    Delete(DeleteRow),
}

impl BatchWriteRow {
    #[must_use]
    pub const fn kind(&self) -> WriteKind {
        match self {
            Self::Put(_) => WriteKind::Put,
            Self::Update(_) => WriteKind::Update,
            Self::Delete(_) => WriteKind::Delete,
        }
    }

    #[must_use]
    pub const fn primary_key(&self) -> &PrimaryKey {
        match self {
            Self::Put(row) => &row.primary_key,
            Self::Update(row) => &row.primary_key,
            Self::Delete(row) => &row.primary_key,
        }
    }

    #[must_use]
    pub const fn condition(&self) -> Condition {
        match self {
            Self::Put(row) => row.condition,
            Self::Update(row) => row.condition,
            Self::Delete(row) => row.condition,
        }
    }
}

///
/// BatchWriteTable
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchWriteTable {
    pub table_name: String,
    pub rows: Vec<BatchWriteRow>,
}

///
/// BatchWriteRowRequest
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BatchWriteRowRequest {
    pub tables: Vec<BatchWriteTable>,
}

///
/// RowResult
///
/// Outcome of one batch item, matched to the request by position.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RowResult {
    #[serde(rename = "isOk")]
    pub is_ok: bool,
    #[serde(default)]
    pub error: Option<BackendError>,
}

impl RowResult {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            is_ok: true,
            error: None,
        }
    }

    #[must_use]
    pub const fn failed(error: BackendError) -> Self {
        Self {
            is_ok: false,
            error: Some(error),
        }
    }
}

///
/// BatchWriteRowResponse
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct BatchWriteRowResponse {
    pub tables: BTreeMap<String, Vec<RowResult>>,
}

///
/// GetRangeRequest
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRangeRequest {
    pub table_name: String,
    pub direction: Direction,
    pub inclusive_start_primary_key: PrimaryKey,
    pub exclusive_end_primary_key: PrimaryKey,
    pub limit: Option<u32>,
    pub columns_to_get: Vec<String>,
    pub start_column: Option<String>,
    pub end_column: Option<String>,
    pub max_versions: u32,
}

///
/// GetRangeResponse
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct GetRangeResponse {
    pub rows: Vec<RowPayload>,
    #[serde(default)]
    pub next_start_primary_key: Option<PrimaryKey>,
}

///
/// DescribeTableRequest
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeTableRequest {
    pub table_name: String,
}

///
/// TableMeta
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableMeta {
    pub table_name: String,
    pub primary_key: Vec<PrimaryKeyColumn>,
}

///
/// DescribeTableResponse
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DescribeTableResponse {
    pub table_meta: TableMeta,
}

//! Module: db::write
//! Responsibility: single-row request builders with per-operation default conditions.
//! Does not own: key/attribute encoding (see `db::mapper`) or dispatch.
//! Boundary: batch items reuse these builders with the table name stripped.

use crate::{
    backend::{
        ColumnUpdate, Condition, DeleteRow, DeleteRowRequest, GetRow, GetRowRequest, PutRow,
        PutRowRequest, RowExistence, TableRequest, UpdateRow, UpdateRowRequest,
    },
    db::mapper::{MapperError, row_to_attribute_columns, row_to_full_primary_key},
    row::Row,
    schema::PrimaryKeySchema,
};

/// Build a put request. The default condition ignores row existence.
pub fn build_put(
    table: &str,
    schema: &PrimaryKeySchema,
    row: &Row,
    existence: RowExistence,
) -> Result<PutRowRequest, MapperError> {
    require_row(row)?;

    Ok(TableRequest::new(
        table,
        PutRow {
            condition: Condition::new(existence),
            primary_key: row_to_full_primary_key(schema, row)?,
            attribute_columns: row_to_attribute_columns(schema, row),
        },
    ))
}

/// Build an insert: a put that asserts the row does not exist yet.
pub fn build_insert(
    table: &str,
    schema: &PrimaryKeySchema,
    row: &Row,
) -> Result<PutRowRequest, MapperError> {
    build_put(table, schema, row, RowExistence::ExpectNotExist)
}

/// Build an update request. The default condition expects the row to exist.
///
/// All attribute columns travel as one PUT-type column operation; column
/// deletion is not expressed through this builder.
pub fn build_update(
    table: &str,
    schema: &PrimaryKeySchema,
    row: &Row,
    existence: RowExistence,
) -> Result<UpdateRowRequest, MapperError> {
    require_row(row)?;

    Ok(TableRequest::new(
        table,
        UpdateRow {
            condition: Condition::new(existence),
            primary_key: row_to_full_primary_key(schema, row)?,
            update_of_attribute_columns: vec![ColumnUpdate::Put(row_to_attribute_columns(
                schema, row,
            ))],
        },
    ))
}

/// Build a delete request. Only the key columns of `row` are used.
pub fn build_delete(
    table: &str,
    schema: &PrimaryKeySchema,
    row: &Row,
    existence: RowExistence,
) -> Result<DeleteRowRequest, MapperError> {
    require_row(row)?;

    Ok(TableRequest::new(
        table,
        DeleteRow {
            condition: Condition::new(existence),
            primary_key: row_to_full_primary_key(schema, row)?,
        },
    ))
}

/// Build a point read; an empty `columns` list fetches every column.
/// `max_versions` caps the cell versions returned per column.
pub fn build_get(
    table: &str,
    schema: &PrimaryKeySchema,
    row: &Row,
    columns: &[String],
    max_versions: u32,
) -> Result<GetRowRequest, MapperError> {
    require_row(row)?;

    Ok(TableRequest::new(
        table,
        GetRow {
            primary_key: row_to_full_primary_key(schema, row)?,
            columns_to_get: columns.to_vec(),
            max_versions,
        },
    ))
}

fn require_row(row: &Row) -> Result<(), MapperError> {
    if row.is_empty() {
        return Err(MapperError::EmptyRow);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::Attributes,
        schema::{PrimaryKeyColumn, PrimaryKeyType},
        value::{KeyValue, Value},
    };

    fn schema() -> PrimaryKeySchema {
        PrimaryKeySchema::new(vec![PrimaryKeyColumn::new("id", PrimaryKeyType::Integer)])
            .expect("schema should be valid")
    }

    fn row() -> Row {
        Row::new().with("id", 7_i64).with("name", "gear")
    }

    #[test]
    fn insert_matches_put_except_for_condition() {
        let put = build_put("parts", &schema(), &row(), RowExistence::Ignore).expect("put");
        let insert = build_insert("parts", &schema(), &row()).expect("insert");

        assert_eq!(put.body.condition.row_existence, RowExistence::Ignore);
        assert_eq!(
            insert.body.condition.row_existence,
            RowExistence::ExpectNotExist
        );
        assert_eq!(put.table_name, insert.table_name);
        assert_eq!(put.body.primary_key, insert.body.primary_key);
        assert_eq!(put.body.attribute_columns, insert.body.attribute_columns);
    }

    #[test]
    fn update_wraps_columns_in_one_put_operation() {
        let update =
            build_update("parts", &schema(), &row(), RowExistence::ExpectExist).expect("update");

        assert_eq!(
            update.body.update_of_attribute_columns,
            vec![ColumnUpdate::Put(Attributes::new(vec![(
                "name".to_string(),
                Value::Text("gear".to_string())
            )]))]
        );
        assert_eq!(
            update.body.condition.row_existence,
            RowExistence::ExpectExist
        );
    }

    #[test]
    fn delete_carries_only_the_key() {
        let delete = build_delete("parts", &schema(), &row(), RowExistence::Ignore).expect("delete");

        assert_eq!(delete.body.primary_key.cells(), vec![KeyValue::Int(7)]);
    }

    #[test]
    fn empty_row_is_rejected_before_encoding() {
        let err = build_put("parts", &schema(), &Row::new(), RowExistence::Ignore)
            .expect_err("empty row");
        assert_eq!(err, MapperError::EmptyRow);

        let err = build_get("parts", &schema(), &Row::new().with("name", "x"), &[], 1)
            .expect_err("missing key");
        assert!(matches!(err, MapperError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn get_request_carries_projection_and_versions() {
        let columns = vec!["qty".to_string()];
        let get = build_get("parts", &schema(), &row(), &columns, 3).expect("get");

        assert_eq!(get.table_name, "parts");
        assert_eq!(get.body.columns_to_get, columns);
        assert_eq!(get.body.max_versions, 3);
    }

    #[test]
    fn put_request_serializes_with_backend_field_names() {
        let put = build_insert("parts", &schema(), &row()).expect("insert");
        let json = serde_json::to_value(&put).expect("request should serialize");

        assert_eq!(json["tableName"], "parts");
        assert_eq!(json["condition"]["rowExistence"], "EXPECT_NOT_EXIST");
        assert!(json["primaryKey"].is_array());
        assert!(json["attributeColumns"].is_array());
    }
}

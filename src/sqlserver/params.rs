use tiberius::Query;

use crate::types::RowValues;

/// Build a `Query` for `sql` with `params` bound as `@P1`, `@P2`, ...
///
/// Text and binary values are borrowed from `params`, so the query cannot
/// outlive the slice it was built from.
#[must_use]
pub fn bind_query_params<'a>(sql: &'a str, params: &'a [RowValues]) -> Query<'a> {
    let mut query = Query::new(sql);
    for value in params {
        bind_value(&mut query, value);
    }
    query
}

fn bind_value<'a>(query: &mut Query<'a>, value: &'a RowValues) {
    match value {
        RowValues::Int(i) => query.bind(*i),
        RowValues::Float(f) => query.bind(*f),
        RowValues::Text(s) => query.bind(s.as_str()),
        RowValues::Bool(b) => query.bind(*b),
        RowValues::Timestamp(dt) => query.bind(*dt),
        // typed NULL: nvarchar converts implicitly to every column type we write
        RowValues::Null => query.bind(Option::<&str>::None),
        RowValues::JSON(json) => query.bind(json.to_string()),
        RowValues::Blob(bytes) => query.bind(bytes.as_slice()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn values_bind_in_order_with_driver_types() {
        let params = vec![
            RowValues::Int(7),
            RowValues::Text("alice".to_string()),
            RowValues::Null,
            RowValues::Blob(vec![1, 2]),
            RowValues::JSON(json!({"k": 1})),
        ];
        let query = bind_query_params("SELECT @P1, @P2, @P3, @P4, @P5", &params);
        assert_eq!(query.param_count(), params.len());
        let rendered = format!("{query:?}");

        let order = [
            "I64(Some(7))",
            "String(Some(\"alice\"))",
            "String(None)",
            "Binary(Some([1, 2]))",
            "String(Some(\"{\\\"k\\\":1}\"))",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|needle| rendered.find(needle).unwrap_or_else(|| panic!("{needle} missing in {rendered}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{rendered}");
    }

    #[test]
    fn no_params_leaves_query_unbound() {
        let rendered = format!("{:?}", bind_query_params("SELECT 1", &[]));
        assert!(rendered.contains("SELECT 1"));
        assert!(rendered.contains("params: []"));
    }
}

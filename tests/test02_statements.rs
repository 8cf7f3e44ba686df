use sqlserver_helpers::data_helper::{pre_parameterized_values, question_marks};
use sqlserver_helpers::statements::{dest_columns, insert_statement, paginated_sql, select_statement};
use sqlserver_helpers::translate_placeholders;

#[test]
fn odbc_insert_translates_to_native_parameters() {
    let odbc = format!(
        "INSERT INTO [Metrics].[dbo].[Table_2] ([a], [b], [c]) VALUES ({})",
        question_marks(3)
    );
    let native = insert_statement("Metrics", "Table_2", &["a", "b", "c"]);
    assert_eq!(translate_placeholders(&odbc, true), native);
    assert!(native.ends_with(&format!("({})", pre_parameterized_values(3))));
}

#[test]
fn mirror_select_pages_cleanly() {
    let cols = dest_columns(&["id", "Host Name"], false, 0).unwrap();
    let select = select_statement("Src", "Hosts", &cols, Some("[Host Name] <> 'T'"), "id", false);
    let page = paginated_sql(&select, 100, 100).unwrap();
    assert_eq!(
        page,
        "SELECT [id], [Host Name] FROM [Src].[dbo].[Hosts] WHERE [Host Name] <> 'T' ORDER BY [id] ASC\nOFFSET 100 ROWS FETCH NEXT 100 ROWS ONLY"
    );
}

#[test]
fn unordered_query_cannot_be_paginated() {
    let err = paginated_sql("SELECT * FROM [dbo].[Hosts]", 0, 10).unwrap_err();
    assert!(err.is_parameter_error());
}

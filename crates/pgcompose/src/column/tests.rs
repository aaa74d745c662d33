use super::*;
use crate::table::Table;
use chrono::NaiveDate;

fn build(def: ColumnDef) -> OrmResult<Table> {
    Table::builder("t").column(def).build()
}

fn column(def: ColumnDef) -> Column {
    let name = def.name().to_string();
    build(def).unwrap().col(&name)
}

// ==================== Declarations ====================

#[test]
fn test_sql_types() {
    assert_eq!(ColumnDef::serial("id").sql_type(), "SERIAL");
    assert_eq!(ColumnDef::big_serial("id").sql_type(), "BIGSERIAL");
    assert_eq!(ColumnDef::varchar("name", 255).sql_type(), "VARCHAR(255)");
    assert_eq!(
        ColumnDef::numeric("price", Some(10), Some(2)).sql_type(),
        "NUMERIC(10, 2)"
    );
    assert_eq!(ColumnDef::timestamptz("at").sql_type(), "TIMESTAMPTZ");
    assert_eq!(
        ColumnDef::array("tags", ColumnKind::Text).dimension(3).sql_type(),
        "TEXT[3]"
    );
}

#[test]
fn test_definition() {
    let def = ColumnDef::varchar("name", 20).not_null().unique().default("anon");
    assert_eq!(def.definition(), "name VARCHAR(20) NOT NULL UNIQUE DEFAULT 'anon'");

    let def = ColumnDef::timestamptz("created_at").database_default("now()");
    assert_eq!(def.definition(), "created_at TIMESTAMPTZ DEFAULT now()");

    assert_eq!(
        ColumnDef::serial("id").primary_key().definition(),
        "id SERIAL PRIMARY KEY"
    );
}

#[test]
fn test_invalid_declarations() {
    let err = build(ColumnDef::numeric("n", None, Some(2))).unwrap_err();
    assert!(matches!(err, OrmError::ColumnDeclaration(_)));

    let err = build(ColumnDef::numeric("n", Some(2), Some(3))).unwrap_err();
    assert!(matches!(err, OrmError::ColumnDeclaration(_)));

    let err = build(ColumnDef::varchar("s", 0)).unwrap_err();
    assert!(matches!(err, OrmError::ColumnDeclaration(_)));

    let err = build(ColumnDef::array("a", ColumnKind::array_of(ColumnKind::Integer))).unwrap_err();
    assert!(matches!(err, OrmError::NestedArray(_)));

    let err = build(ColumnDef::text("s").min(0)).unwrap_err();
    assert!(matches!(err, OrmError::ColumnDeclaration(_)));

    let err = build(ColumnDef::smallint("s").max(100_000)).unwrap_err();
    assert!(matches!(err, OrmError::ColumnDeclaration(_)));

    let err = build(ColumnDef::serial("id").default(1)).unwrap_err();
    assert!(matches!(err, OrmError::ColumnDeclaration(_)));
}

#[test]
fn test_default_is_validated_at_declaration() {
    let err = build(ColumnDef::varchar("code", 2).default("abc")).unwrap_err();
    assert!(matches!(err, OrmError::ColumnDeclaration(_)));

    let err = build(ColumnDef::integer("n").not_null().default(Value::Null)).unwrap_err();
    assert!(matches!(err, OrmError::ColumnDeclaration(_)));

    let json = column(ColumnDef::jsonb("meta").default(r#"{"a": 1}"#));
    match json.def().default_value() {
        Some(DefaultValue::Static(Value::Json(v))) => assert_eq!(v["a"], 1),
        other => panic!("unexpected default: {other:?}"),
    }
}

// ==================== Assignment ====================

#[test]
fn test_assign_checks_type() {
    let n = column(ColumnDef::integer("n"));
    assert_eq!(n.assign(5).unwrap(), Assignment::Value(Value::Int(5)));
    assert!(matches!(n.assign("5").unwrap_err(), OrmError::AssignmentType(_)));

    let ratio = column(ColumnDef::double("ratio"));
    assert_eq!(ratio.assign(2).unwrap(), Assignment::Value(Value::Int(2)));
}

#[test]
fn test_assign_checks_constraints() {
    let age = column(ColumnDef::smallint("age").min(0).max(150));
    assert!(age.assign(30i16).is_ok());
    assert!(matches!(age.assign(200i16).unwrap_err(), OrmError::ColumnValueValidation(_)));

    let price = column(ColumnDef::numeric("price", Some(5), Some(2)));
    assert!(price.assign(Decimal::new(12345, 2)).is_ok());
    assert!(price.assign(Decimal::new(123456, 2)).is_err());
    assert!(price.assign(Decimal::new(1234, 3)).is_err());

    let flag = column(ColumnDef::char("flag"));
    assert!(flag.assign("y").is_ok());
    assert!(flag.assign("yes").is_err());

    let tags = column(ColumnDef::array("tags", ColumnKind::Text));
    assert!(tags.assign(vec!["a", "b"]).is_ok());
    assert!(matches!(
        tags.assign(vec![1, 2]).unwrap_err(),
        OrmError::AssignmentType(_)
    ));
}

#[test]
fn test_assign_null() {
    let required = column(ColumnDef::text("s").not_null());
    assert!(matches!(
        required.assign(Value::Null).unwrap_err(),
        OrmError::ColumnValueValidation(_)
    ));

    let optional = column(ColumnDef::text("s"));
    assert_eq!(optional.assign(Value::Null).unwrap(), Assignment::Value(Value::Null));
}

#[test]
fn test_assign_default() {
    let serial = column(ColumnDef::serial("id"));
    assert_eq!(serial.assign_default().unwrap(), Assignment::Default);

    let with_db_default = column(ColumnDef::timestamptz("at").database_default("now()"));
    assert_eq!(with_db_default.assign_default().unwrap(), Assignment::Default);

    let with_static = column(ColumnDef::boolean("active").default(true));
    assert_eq!(
        with_static.assign_default().unwrap(),
        Assignment::Value(Value::Bool(true))
    );

    let generated = column(ColumnDef::integer("n").generated_default(|| Value::Int(7)));
    assert_eq!(generated.assign_default().unwrap(), Assignment::Value(Value::Int(7)));

    let nullable = column(ColumnDef::text("note"));
    assert_eq!(nullable.assign_default().unwrap(), Assignment::Value(Value::Null));

    let required = column(ColumnDef::text("s").not_null());
    assert!(required.assign_default().is_err());
}

// ==================== Naming ====================

#[test]
fn test_qualification() {
    let table = Table::builder("users")
        .schema("app")
        .column(ColumnDef::text("name"))
        .build()
        .unwrap();
    let name = table.col("name");
    assert_eq!(name.qualified_name(), "users.name");
    assert_eq!(name.with_prefix("u").qualified_name(), "u.name");
    assert_eq!(table.aliased("x").col("name").qualified_name(), "x.name");
    assert_eq!(name.with_alias("label").to_string(), "users.name AS label");
    assert_eq!(name.fragment().render(), "users.name");
}

#[test]
fn test_overrides_keep_identity() {
    let table = Table::builder("users")
        .column(ColumnDef::text("name"))
        .build()
        .unwrap();
    let name = table.col("name");
    assert_eq!(name.with_prefix("u"), name);
    assert_eq!(name.with_alias("n"), name);
    assert_ne!(table.aliased("other").col("name"), name);
}

// ==================== Comparisons ====================

#[test]
fn test_comparison_types() {
    let n = column(ColumnDef::integer("n"));
    assert!(n.eq(1).is_ok());
    assert!(n.eq(1i64).is_ok());
    assert!(matches!(n.eq("1").unwrap_err(), OrmError::ComparisonType(_)));
    assert!(matches!(n.like("1%").unwrap_err(), OrmError::ComparisonType(_)));
    assert!(matches!(n.gt(1.5).unwrap_err(), OrmError::ComparisonType(_)));

    let born = column(ColumnDef::date("born"));
    let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    assert!(born.lt(date).is_ok());
    assert!(born.lt("2000-01-01").is_err());
}

#[test]
fn test_membership_needs_a_list() {
    let n = column(ColumnDef::integer("n"));
    assert!(matches!(
        n.compare(CompareOp::In, 1).unwrap_err(),
        OrmError::FilterComparison(_)
    ));
    assert!(matches!(n.in_(["a"]).unwrap_err(), OrmError::ComparisonType(_)));
}

#[test]
fn test_null_comparisons() {
    let n = column(ColumnDef::integer("n"));
    assert_eq!(n.eq(Value::Null).unwrap(), n.is_null());
    assert_eq!(n.ne(Option::<i32>::None).unwrap(), n.is_not_null());
    assert!(n.gt(Value::Null).is_err());
    assert!(n.between(Value::Null, 5).is_err());
}

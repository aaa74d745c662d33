use pgcompose::{
    ColumnDef, Engine, Execution, JoinKind, OrmError, OrmResult, Selectable, Statement, Table,
    Value,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Engine that records every call and answers from a queue of canned executions.
#[derive(Default)]
struct RecordingEngine {
    calls: Mutex<Vec<(String, Vec<Value>, bool)>>,
    responses: Mutex<VecDeque<Execution>>,
}

impl RecordingEngine {
    fn answering(responses: impl IntoIterator<Item = Execution>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    fn calls(&self) -> Vec<(String, Vec<Value>, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Engine for RecordingEngine {
    async fn execute(&self, sql: &str, params: &[Value], fetch: bool) -> OrmResult<Execution> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec(), fetch));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| OrmError::Connection("no canned response left".to_string()))
    }
}

fn users() -> Table {
    Table::builder("users")
        .column(ColumnDef::serial("id").primary_key())
        .column(ColumnDef::varchar("name", 50).not_null())
        .build()
        .unwrap()
}

fn orders() -> Table {
    Table::builder("orders")
        .column(ColumnDef::serial("id").primary_key())
        .column(ColumnDef::integer("user_id").not_null())
        .column(ColumnDef::integer("total"))
        .build()
        .unwrap()
}

#[tokio::test]
async fn select_sends_sql_and_params() -> OrmResult<()> {
    let users = users();
    let engine = RecordingEngine::answering([Execution::Rows(vec![vec![
        Value::Int(1),
        Value::from("Alice"),
    ]])]);

    let result = users
        .select()
        .and_where(users.col("id").eq(1)?)
        .execute(&engine)
        .await?;

    assert_eq!(
        engine.calls(),
        vec![(
            "SELECT users.id, users.name FROM users WHERE users.id = %s".to_string(),
            vec![Value::Int(1)],
            true,
        )]
    );
    assert_eq!(
        result.as_flat_list()?,
        vec![json!({"id": 1, "name": "Alice"}).as_object().unwrap().clone()]
    );
    Ok(())
}

#[tokio::test]
async fn joined_rows_are_nested_by_table() -> OrmResult<()> {
    let (users, orders) = (users(), orders());
    let engine = RecordingEngine::answering([Execution::Rows(vec![
        vec![Value::Int(10), Value::from("Alice")],
        vec![Value::Null, Value::from("Bob")],
    ])]);

    let result = orders
        .select()
        .select([orders.col("total")])
        .join(
            JoinKind::Inner,
            &users,
            orders.col("user_id").eq(users.col("id"))?,
            Some("u"),
            [users.col("name")],
        )?
        .execute(&engine)
        .await?;

    let rows: Vec<serde_json::Value> = result
        .as_flat_list()?
        .into_iter()
        .map(serde_json::Value::Object)
        .collect();
    assert_eq!(
        rows,
        vec![
            json!({"total": 10, "_users": {"name": "Alice"}}),
            json!({"total": null, "_users": {"name": "Bob"}}),
        ]
    );

    let objects = result.as_objects()?;
    assert_eq!(objects[0].get("total"), Some(&Value::Int(10)));
    assert_eq!(
        objects[1].joined("users").and_then(|r| r.get("name")),
        Some(&Value::from("Bob"))
    );
    Ok(())
}

#[tokio::test]
async fn projected_join_columns_are_nested_by_owner() -> OrmResult<()> {
    let (users, orders) = (users(), orders());
    let engine = RecordingEngine::answering([Execution::Rows(vec![vec![
        Value::from("Alice"),
        Value::Int(10),
    ]])]);

    let result = orders
        .select()
        .select([
            Selectable::from(users.col("name")),
            Selectable::from(orders.col("total")),
        ])
        .join(
            JoinKind::Inner,
            &users,
            orders.col("user_id").eq(users.col("id"))?,
            Some("u"),
            [],
        )?
        .execute(&engine)
        .await?;

    assert_eq!(
        engine.calls()[0].0,
        "SELECT u.name, orders.total FROM orders INNER JOIN users AS u ON orders.user_id = u.id"
    );
    let rows: Vec<serde_json::Value> = result
        .as_flat_list()?
        .into_iter()
        .map(serde_json::Value::Object)
        .collect();
    assert_eq!(rows, vec![json!({"total": 10, "_users": {"name": "Alice"}})]);
    Ok(())
}

#[tokio::test]
async fn joins_of_one_table_keep_both_sides() -> OrmResult<()> {
    let users = users();
    let trades = Table::builder("trades")
        .column(ColumnDef::serial("id").primary_key())
        .column(ColumnDef::integer("buyer_id").not_null())
        .column(ColumnDef::integer("seller_id").not_null())
        .build()?;
    let engine = RecordingEngine::answering([Execution::Rows(vec![vec![
        Value::Int(5),
        Value::from("Buyer"),
        Value::from("Seller"),
    ]])]);

    let result = trades
        .select()
        .select([trades.col("id")])
        .join(
            JoinKind::Inner,
            &users,
            trades.col("buyer_id").eq(users.col("id"))?,
            Some("b"),
            [users.col("name")],
        )?
        .join(
            JoinKind::Inner,
            &users,
            trades.col("seller_id").eq(users.col("id"))?,
            Some("s"),
            [users.col("name")],
        )?
        .execute(&engine)
        .await?;

    let rows: Vec<serde_json::Value> = result
        .as_flat_list()?
        .into_iter()
        .map(serde_json::Value::Object)
        .collect();
    assert_eq!(
        rows,
        vec![json!({"id": 5, "_b": {"name": "Buyer"}, "_s": {"name": "Seller"}})]
    );

    let objects = result.as_objects()?;
    assert_eq!(
        objects[0].joined("b").and_then(|r| r.get("name")),
        Some(&Value::from("Buyer"))
    );
    assert_eq!(
        objects[0].joined("s").and_then(|r| r.get("name")),
        Some(&Value::from("Seller"))
    );
    Ok(())
}

#[tokio::test]
async fn rows_deserialize_into_structs() -> OrmResult<()> {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Joined {
        total: Option<i32>,
        #[serde(rename = "_users")]
        user: Named,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    let (users, orders) = (users(), orders());
    let engine = RecordingEngine::answering([Execution::Rows(vec![vec![
        Value::Int(12),
        Value::from("Alice"),
    ]])]);

    let rows: Vec<Joined> = orders
        .select()
        .select([orders.col("total")])
        .join(
            JoinKind::Left,
            &users,
            orders.col("user_id").eq(users.col("id"))?,
            None,
            [users.col("name")],
        )?
        .execute(&engine)
        .await?
        .deserialize()?;

    assert_eq!(
        rows,
        vec![Joined {
            total: Some(12),
            user: Named {
                name: "Alice".to_string()
            },
        }]
    );
    Ok(())
}

#[tokio::test]
async fn row_width_mismatch_is_a_lookup_error() -> OrmResult<()> {
    let users = users();
    let engine = RecordingEngine::answering([Execution::Rows(vec![vec![Value::Int(1)]])]);

    let result = users.select().execute(&engine).await?;
    let err = result.as_flat_list().unwrap_err();
    assert!(matches!(err, OrmError::QueryResultLookup(_)));
    Ok(())
}

#[tokio::test]
async fn union_runs_as_one_statement() -> OrmResult<()> {
    let a = Table::builder("a").column(ColumnDef::integer("x")).build()?;
    let b = Table::builder("b").column(ColumnDef::integer("x")).build()?;
    let engine = RecordingEngine::answering([Execution::Rows(vec![
        vec![Value::Int(1)],
        vec![Value::Int(2)],
    ])]);

    let result = a
        .select()
        .union(b.select(), false)
        .execute(&engine)
        .await?;

    assert_eq!(engine.calls()[0].0, "SELECT a.x FROM a UNION SELECT b.x FROM b");
    assert_eq!(result.len(), 2);
    Ok(())
}

#[tokio::test]
async fn exists_reads_the_boolean() -> OrmResult<()> {
    let users = users();
    let engine = RecordingEngine::answering([
        Execution::Rows(vec![vec![Value::Bool(true)]]),
        Execution::Rows(Vec::new()),
    ]);
    let exists = users
        .select()
        .and_where(users.col("name").eq("Alice")?)
        .exists();

    assert!(exists.execute(&engine).await?);
    assert!(matches!(
        exists.execute(&engine).await.unwrap_err(),
        OrmError::QueryResultLookup(_)
    ));
    assert_eq!(
        engine.calls()[0].0,
        "SELECT EXISTS (SELECT 1 FROM users WHERE users.name = %s)"
    );
    Ok(())
}

#[tokio::test]
async fn insert_returning_collects_keys() -> OrmResult<()> {
    let users = users();
    let engine = RecordingEngine::answering([Execution::Rows(vec![
        vec![Value::Int(7)],
        vec![Value::Int(8)],
    ])]);

    let ids = users
        .insert()
        .records([
            users.record().with("name", "Alice")?,
            users.record().with("name", "Bob")?,
        ])?
        .returning(users.col("id"))
        .execute(&engine)
        .await?;

    assert_eq!(ids, vec![Value::Int(7), Value::Int(8)]);
    let (sql, params, fetch) = engine.calls().remove(0);
    assert_eq!(
        sql,
        "INSERT INTO users (id, name) VALUES (DEFAULT, %s), (DEFAULT, %s) RETURNING id"
    );
    assert_eq!(params, vec![Value::from("Alice"), Value::from("Bob")]);
    assert!(fetch);
    Ok(())
}

#[tokio::test]
async fn update_without_where_never_reaches_the_engine() -> OrmResult<()> {
    let users = users();
    let engine = RecordingEngine::answering([Execution::Affected(3)]);
    let update = users.update().set(&users.col("name"), "Anonymous")?;

    let err = update.execute(&engine).await.unwrap_err();
    assert!(err.is_unsafe_statement());
    assert!(engine.calls().is_empty());

    let update = update.force();
    assert!(update.is_forced());
    assert_eq!(update.execute(&engine).await?, 3);
    assert_eq!(engine.calls()[0].0, "UPDATE users SET name = %s");
    assert!(!engine.calls()[0].2);

    let update = update.deforce();
    assert!(!update.is_forced());
    assert!(update.compile().is_err());
    Ok(())
}

#[tokio::test]
async fn delete_returning_materializes_rows() -> OrmResult<()> {
    let users = users();
    let engine = RecordingEngine::answering([Execution::Rows(vec![vec![
        Value::Int(4),
        Value::from("Dora"),
    ]])]);

    let result = users
        .delete()
        .and_where(users.col("id").eq(4)?)
        .returning(users.columns())
        .fetch_returning(&engine)
        .await?;

    assert_eq!(
        engine.calls()[0].0,
        "DELETE FROM users WHERE users.id = %s RETURNING id, name"
    );
    let objects = result.as_objects()?;
    assert_eq!(objects[0].get("name"), Some(&Value::from("Dora")));
    Ok(())
}

#[tokio::test]
async fn engine_errors_propagate() {
    let users = users();
    let engine = RecordingEngine::default();
    let err = users.select().execute(&engine).await.unwrap_err();
    assert!(matches!(err, OrmError::Connection(_)));
}

#[tokio::test]
async fn one_statement_runs_concurrently() -> OrmResult<()> {
    let users = users();
    let engine = RecordingEngine::answering(
        (0..4).map(|i| Execution::Rows(vec![vec![Value::Int(i), Value::from("x")]])),
    );
    let select = users.select().and_where(users.col("name").eq("x")?);

    let results = futures_util::future::join_all((0..4).map(|_| select.execute(&engine))).await;

    let mut ids = results
        .into_iter()
        .map(|result| Ok(result?.raw()[0][0].clone()))
        .collect::<OrmResult<Vec<_>>>()?;
    ids.sort_by_key(|v| v.as_i64());
    assert_eq!(ids, (0..4).map(Value::Int).collect::<Vec<_>>());

    let calls = engine.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|(sql, _, _)| sql == &calls[0].0));
    Ok(())
}

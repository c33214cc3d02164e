//! Postgres document store — one `documents` table with a JSONB body.
//!
//! DESIGN
//! ======
//! Rows are keyed by `(collection, id)`. Filters compile to operators on
//! `data -> field`: equality compares JSONB values, range filters compare
//! text under the "C" collation (so `YYYY-MM-DD` strings order by day) or
//! numbers as double precision. Field names are always bound, never spliced.

use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Direction, Document, DocumentStore, Filter, FilterOp, Query, StoreError};

/// SQLSTATE `insufficient_privilege`.
const PG_INSUFFICIENT_PRIVILEGE: &str = "42501";

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_db_error(err: sqlx::Error) -> StoreError {
    let denied = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == PG_INSUFFICIENT_PRIVILEGE);
    if denied {
        return StoreError::PermissionDenied(err.to_string());
    }
    StoreError::Database(err)
}

fn op_sql(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => " = ",
        FilterOp::Lt => " < ",
        FilterOp::Lte => " <= ",
        FilterOp::Gt => " > ",
        FilterOp::Gte => " >= ",
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    if filter.op == FilterOp::Eq {
        builder.push("data -> ");
        builder.push_bind(filter.field.clone());
        builder.push(" = ");
        builder.push_bind(Json(filter.value.clone()));
        return;
    }

    match &filter.value {
        Value::String(s) => {
            builder.push("(data ->> ");
            builder.push_bind(filter.field.clone());
            builder.push(") COLLATE \"C\"");
            builder.push(op_sql(filter.op));
            builder.push_bind(s.clone());
        }
        Value::Number(n) => {
            builder.push("jsonb_typeof(data -> ");
            builder.push_bind(filter.field.clone());
            builder.push(") = 'number' AND (data ->> ");
            builder.push_bind(filter.field.clone());
            builder.push(")::double precision");
            builder.push(op_sql(filter.op));
            builder.push_bind(n.as_f64().unwrap_or_default());
        }
        // Range comparisons on other kinds never match.
        _ => {
            builder.push("FALSE");
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgDocumentStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id, data FROM documents WHERE collection = ");
        builder.push_bind(collection.to_owned());
        for filter in &query.filters {
            builder.push(" AND ");
            push_filter(&mut builder, filter);
        }

        builder.push(" ORDER BY ");
        if let Some(order) = &query.order_by {
            builder.push("data -> ");
            builder.push_bind(order.field.clone());
            builder.push(match order.direction {
                Direction::Asc => " ASC NULLS FIRST, ",
                Direction::Desc => " DESC NULLS LAST, ",
            });
        }
        builder.push("created_at ASC");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = builder
            .build_query_as::<(String, Json<Value>)>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        rows.into_iter()
            .map(|(id, Json(data))| match data {
                Value::Object(map) => Ok(Document::new(id, map)),
                _ => Err(StoreError::NotAnObject),
            })
            .collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, (String, Json<Value>)>(
            "SELECT id, data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match row {
            Some((id, Json(Value::Object(map)))) => Ok(Some(Document::new(id, map))),
            Some(_) => Err(StoreError::NotAnObject),
            None => Ok(None),
        }
    }

    async fn create(&self, collection: &str, data: Map<String, Value>) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(Value::Object(data)))
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Map<String, Value>) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)
              ON CONFLICT (collection, id) DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(data)))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE documents SET data = data || $3, updated_at = now() WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(patch)))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}

#[cfg(all(test, feature = "live-db-tests"))]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    async fn live_store() -> PgDocumentStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required for live-db-tests");
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("connect");
        sqlx::migrate!("src/db/migrations")
            .run(&pool)
            .await
            .expect("migrate");
        PgDocumentStore::new(pool)
    }

    #[tokio::test]
    async fn range_filter_on_dates_matches_inclusive_bounds() {
        let store = live_store().await;
        let collection = format!("test_{}", Uuid::new_v4().simple());
        for date in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            let mut data = Map::new();
            data.insert("date".into(), Value::String(date.into()));
            store.create(&collection, data).await.expect("create");
        }

        let query = Query::new()
            .at_least("date", "2024-01-02")
            .at_most("date", "2024-01-03")
            .order_desc("date");
        let docs = store.query(&collection, &query).await.expect("query");
        let dates: Vec<_> = docs
            .iter()
            .filter_map(|d| d.get("date").and_then(Value::as_str))
            .collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-02"]);
    }
}

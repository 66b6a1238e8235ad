// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use chrono::NaiveDate;
use llm_contracts::{CellValue, CollaboratorError, QueryExecutor};
use tabula::{coerce, CellFormatter, SqliteExecutor, TableView};

const SEED: &str = r#"
CREATE TABLE unicorns (
  id INTEGER PRIMARY KEY,
  company TEXT NOT NULL UNIQUE,
  valuation REAL NOT NULL,
  date_joined DATE,
  country TEXT NOT NULL,
  logo BLOB
);
INSERT INTO unicorns (company, valuation, date_joined, country, logo) VALUES
  ('Stripe', 95.0, '2014-01-23', 'United States', X'CAFE'),
  ('Klarna', 45.6, '2011-12-12', 'Sweden', NULL),
  ('Canva', 40.0, NULL, 'Australia', NULL);
"#;

async fn seeded() -> SqliteExecutor {
    let executor = SqliteExecutor::connect("sqlite::memory:").await.unwrap();
    executor.execute_script(SEED).await.unwrap();
    executor
}

#[tokio::test]
async fn test_rows_keep_storage_types() {
    let executor = seeded().await;
    let rows = executor
        .execute_query("SELECT company, valuation, date_joined, logo FROM unicorns ORDER BY id")
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    let stripe = &rows[0];
    let columns: Vec<_> = stripe.keys().map(String::as_str).collect();
    assert_eq!(columns, ["company", "valuation", "date_joined", "logo"]);
    assert_eq!(stripe["company"], CellValue::text("Stripe"));
    assert_eq!(stripe["valuation"], CellValue::Number(95.0));
    assert_eq!(
        stripe["date_joined"],
        CellValue::Date(NaiveDate::from_ymd_opt(2014, 1, 23).unwrap())
    );
    assert_eq!(stripe["logo"], CellValue::text("cafe"));
    assert_eq!(rows[2]["date_joined"], CellValue::Null);
}

#[tokio::test]
async fn test_aggregates_flow_into_a_table() {
    let executor = seeded().await;
    let rows = executor
        .execute_query(
            "SELECT country, COUNT(*) AS count, SUM(valuation) AS total_valuation \
             FROM unicorns GROUP BY country ORDER BY total_valuation DESC",
        )
        .await
        .unwrap();
    let results = coerce(rows).unwrap();
    assert!(results.is_chartable());

    let view = TableView::from_results(&results, &CellFormatter::default());
    assert_eq!(view.headers, ["Country", "Count", "Total valuation"]);
    assert_eq!(view.rows[0], ["United States", "1", "$95B"]);
    assert_eq!(view.rows[1], ["Sweden", "1", "$45.6B"]);
}

#[tokio::test]
async fn test_writes_are_refused() {
    let executor = seeded().await;
    let err = executor
        .execute_query("DELETE FROM unicorns")
        .await
        .unwrap_err();
    assert!(matches!(err, CollaboratorError::Database(_)));

    let remaining = executor
        .execute_query("SELECT COUNT(*) AS n FROM unicorns")
        .await
        .unwrap();
    assert_eq!(remaining[0]["n"], CellValue::Number(3.0));
}

#[tokio::test]
async fn test_bad_sql_is_a_database_error() {
    let executor = seeded().await;
    let err = executor
        .execute_query("SELECT * FROM missing_table")
        .await
        .unwrap_err();
    assert!(matches!(err, CollaboratorError::Database(msg) if msg.contains("missing_table")));
}

#[tokio::test]
async fn test_file_database_persists_between_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("unicorns.db").display());

    let executor = SqliteExecutor::connect(&url).await.unwrap();
    executor.execute_script(SEED).await.unwrap();
    executor.close().await;

    let reopened = SqliteExecutor::connect(&url).await.unwrap();
    let rows = reopened
        .execute_query("SELECT company FROM unicorns WHERE country = 'Sweden'")
        .await
        .unwrap();
    assert_eq!(rows[0]["company"], CellValue::text("Klarna"));
}

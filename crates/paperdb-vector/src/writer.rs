use anyhow::{Context, Result};
use async_trait::async_trait;
use pgvector::Vector;
use tokio_postgres::{Client, Statement, Transaction};

use paperdb_core::traits::PaperSink;
use paperdb_core::types::Paper;

use crate::schema::{update_columns, EMBEDDING_COLUMN, KEY_COLUMN, PAPER_COLUMNS};
use crate::table::TableName;

const ROW_SAVEPOINT: &str = "paper_row";

/// Insert-or-update of one paper keyed by id; the embedding parameter is cast to `vector`.
pub fn upsert_sql(table: &TableName) -> String {
	let placeholders = PAPER_COLUMNS
		.iter()
		.enumerate()
		.map(|(i, column)| {
			if *column == EMBEDDING_COLUMN { format!("${}::vector", i + 1) } else { format!("${}", i + 1) }
		})
		.collect::<Vec<_>>()
		.join(", ");
	let assignments = update_columns()
		.map(|column| format!("{column} = EXCLUDED.{column}"))
		.collect::<Vec<_>>()
		.join(", ");
	format!(
		"INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
		table.qualified(),
		PAPER_COLUMNS.join(", "),
		placeholders,
		KEY_COLUMN,
		assignments
	)
}

/// One pending batch of upserts inside a single transaction.
///
/// Each row runs in its own savepoint, so a failing row is undone alone and
/// the rows before it stay pending until [`PgPaperWriter::commit`].
pub struct PgPaperWriter<'a> {
	tx: Transaction<'a>,
	statement: Statement,
	written: usize,
}

impl<'a> PgPaperWriter<'a> {
	pub async fn begin(client: &'a mut Client, table: &TableName) -> Result<Self> {
		let tx = client.transaction().await.context("failed to open transaction")?;
		let statement = tx.prepare(&upsert_sql(table)).await.context("failed to prepare upsert")?;
		Ok(Self { tx, statement, written: 0 })
	}

	/// Commits every row upserted so far and returns how many there were.
	pub async fn commit(self) -> Result<usize> {
		self.tx.commit().await.context("failed to commit ingestion batch")?;
		Ok(self.written)
	}
}

#[async_trait]
impl PaperSink for PgPaperWriter<'_> {
	async fn upsert(&mut self, paper: &Paper, embedding: &[f32]) -> Result<()> {
		let vector = Vector::from(embedding.to_vec());
		let row = self.tx.savepoint(ROW_SAVEPOINT).await.context("failed to open row savepoint")?;
		let outcome = row
			.execute(
				&self.statement,
				&[
					&paper.id,
					&paper.title,
					&paper.authors,
					&paper.publication_year,
					&paper.journal_name,
					&paper.abstract_or_empty(),
					&paper.doi,
					&paper.url,
					&vector,
				],
			)
			.await;
		match outcome {
			Ok(_) => {
				row.commit().await.context("failed to release row savepoint")?;
				self.written += 1;
				Ok(())
			}
			Err(err) => {
				row.rollback().await.context("failed to roll back row savepoint")?;
				Err(anyhow::Error::new(err).context(format!("failed to upsert paper {}", paper.id)))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn upsert_sql_overwrites_every_non_key_column() {
		let sql = upsert_sql(&TableName::new("public", "paper").unwrap());
		assert!(sql.starts_with("INSERT INTO \"public\".\"paper\" (id, title, authors, publication_year, journal_name, abstract, doi, url, abstract_embedding)"));
		assert!(sql.contains("VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::vector)"));
		assert!(sql.contains("ON CONFLICT (id) DO UPDATE SET"));
		for column in update_columns() {
			assert!(sql.contains(&format!("{column} = EXCLUDED.{column}")), "missing {column}");
		}
		assert!(!sql.contains("id = EXCLUDED.id"));
	}
}

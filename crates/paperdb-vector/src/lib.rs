//! pgvector-backed storage for papers: connection and DDL helpers, the
//! savepoint-isolated upsert writer, the ingestion pipeline, and similarity search.

pub mod ingest;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use ingest::{ingest_papers, run_ingest, select_from_offset};
pub use search::{format_context, search_papers};
pub use table::{open_db, PgConnection, TableName};
pub use writer::PgPaperWriter;

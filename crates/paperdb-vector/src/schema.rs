/// Columns of the paper table in statement order; `id` is the primary key.
pub const PAPER_COLUMNS: [&str; 9] = [
	"id",
	"title",
	"authors",
	"publication_year",
	"journal_name",
	"abstract",
	"doi",
	"url",
	"abstract_embedding",
];

pub const KEY_COLUMN: &str = "id";
pub const EMBEDDING_COLUMN: &str = "abstract_embedding";

/// Every column rewritten when an existing id is upserted again.
pub fn update_columns() -> impl Iterator<Item = &'static str> {
	PAPER_COLUMNS.into_iter().filter(|c| *c != KEY_COLUMN)
}

//! Product repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use crate::error::Result;
use crate::models::{Product, ProductState};
use crate::search;
use rusqlite::{params, Connection};

/// Trait for catalog storage operations
pub trait ProductRepository {
    /// Insert-or-replace a batch of products by reference, in one
    /// transaction, stamping each row with the given sync generation
    fn upsert_batch(&self, products: &[Product], generation: i64) -> Result<usize>;

    /// Get a product by its exact reference
    fn get(&self, reference: &str) -> Result<Option<Product>>;

    /// List products alphabetically by reference
    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Product>>;

    /// Canonical catalog search (see crate::search for query handling)
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>>;

    /// Count catalog rows
    fn count(&self) -> Result<usize>;

    /// Delete rows whose generation stamp predates the given one.
    ///
    /// Run after a full-dataset sync: rows the latest full document did
    /// not touch are products the remote no longer carries.
    fn prune_generations_before(&self, generation: i64) -> Result<usize>;
}

/// `SQLite` implementation of `ProductRepository`
pub struct SqliteProductRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteProductRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a product from a database row
    fn parse_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
        let state: String = row.get(8)?;
        Ok(Product {
            reference: row.get(0)?,
            description: row.get(1)?,
            family: row.get(2)?,
            pack_quantity: row.get(3)?,
            sale_unit: row.get(4)?,
            stock: row.get(5)?,
            price: row.get(6)?,
            discount: row.get(7)?,
            state: ProductState::from_label(&state),
            location: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

const PRODUCT_COLUMNS: &str = "reference, description, family, pack_quantity, sale_unit, \
     stock, price, discount, state, location, updated_at";

impl ProductRepository for SqliteProductRepository<'_> {
    fn upsert_batch(&self, products: &[Product], generation: i64) -> Result<usize> {
        if products.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO products (
                    reference, description, family, pack_quantity, sale_unit,
                    stock, price, discount, state, location, updated_at,
                    sync_generation, search_text
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(reference) DO UPDATE SET
                    description = excluded.description,
                    family = excluded.family,
                    pack_quantity = excluded.pack_quantity,
                    sale_unit = excluded.sale_unit,
                    stock = excluded.stock,
                    price = excluded.price,
                    discount = excluded.discount,
                    state = excluded.state,
                    location = excluded.location,
                    updated_at = excluded.updated_at,
                    sync_generation = excluded.sync_generation,
                    search_text = excluded.search_text",
            )?;

            for product in products {
                stmt.execute(params![
                    product.reference,
                    product.description,
                    product.family,
                    product.pack_quantity,
                    product.sale_unit,
                    product.stock,
                    product.price,
                    product.discount,
                    product.state.as_str(),
                    product.location,
                    product.updated_at,
                    generation,
                    product.search_text(),
                ])?;
            }
        }
        tx.commit()?;

        Ok(products.len())
    }

    fn get(&self, reference: &str) -> Result<Option<Product>> {
        let result = self.conn.query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE reference = ?"),
            params![reference],
            Self::parse_product,
        );

        match result {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             ORDER BY reference ASC
             LIMIT ? OFFSET ?"
        ))?;

        let products = stmt
            .query_map(params![limit as i64, offset as i64], Self::parse_product)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(products)
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>> {
        let trimmed = query.trim_start();

        if search::is_reference_query(trimmed) {
            // Reference lookup: prefix match on the reference column only
            let needle = search::normalize(trimmed);
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products
                 WHERE reference LIKE ? || '%'
                 ORDER BY reference ASC
                 LIMIT ?"
            ))?;

            let products = stmt
                .query_map(params![needle, limit as i64], Self::parse_product)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            return Ok(products);
        }

        let match_expr = search::fts_match_expression(trimmed);
        if match_expr.is_empty() {
            return Ok(Vec::new());
        }

        // Ranking: active and in-stock rows first, then alphabetical
        let mut stmt = self.conn.prepare(
            "SELECT p.reference, p.description, p.family, p.pack_quantity, p.sale_unit,
                    p.stock, p.price, p.discount, p.state, p.location, p.updated_at
             FROM products p
             JOIN products_fts fts ON p.rowid = fts.rowid
             WHERE products_fts MATCH ?
             ORDER BY (p.state = 'active' AND p.stock > 0) DESC, p.description ASC
             LIMIT ?",
        )?;

        let products = stmt
            .query_map(params![match_expr, limit as i64], Self::parse_product)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(products)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn prune_generations_before(&self, generation: i64) -> Result<usize> {
        let swept = self.conn.execute(
            "DELETE FROM products WHERE sync_generation < ?",
            params![generation],
        )?;

        if swept > 0 {
            tracing::debug!(swept, "pruned rows absent from latest full dataset");
        }

        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn product(reference: &str, description: &str) -> Product {
        Product {
            reference: reference.to_string(),
            description: description.to_string(),
            family: "Herramientas".to_string(),
            pack_quantity: 1.0,
            sale_unit: 1.0,
            stock: 10.0,
            price: 5.0,
            discount: String::new(),
            state: ProductState::Active,
            location: String::new(),
            updated_at: 1_000,
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let db = setup();
        let repo = SqliteProductRepository::new(db.connection());

        repo.upsert_batch(&[product("REF-1", "Taladro")], 1).unwrap();

        let fetched = repo.get("REF-1").unwrap().unwrap();
        assert_eq!(fetched.description, "Taladro");
        assert_eq!(fetched.state, ProductState::Active);

        assert!(repo.get("REF-404").unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let db = setup();
        let repo = SqliteProductRepository::new(db.connection());

        let batch = vec![product("REF-1", "Taladro"), product("REF-2", "Brocas")];
        repo.upsert_batch(&batch, 1).unwrap();
        repo.upsert_batch(&batch, 1).unwrap();

        assert_eq!(repo.count().unwrap(), 2);
        let listed = repo.list(10, 0).unwrap();
        assert_eq!(listed[0].reference, "REF-1");
        assert_eq!(listed[1].reference, "REF-2");
    }

    #[test]
    fn test_upsert_last_writer_wins() {
        let db = setup();
        let repo = SqliteProductRepository::new(db.connection());

        repo.upsert_batch(&[product("REF-1", "Old description")], 1)
            .unwrap();
        let mut updated = product("REF-1", "New description");
        updated.price = 9.99;
        repo.upsert_batch(&[updated], 2).unwrap();

        let fetched = repo.get("REF-1").unwrap().unwrap();
        assert_eq!(fetched.description, "New description");
        assert!((fetched.price - 9.99).abs() < f64::EPSILON);
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_search_by_description() {
        let db = setup();
        let repo = SqliteProductRepository::new(db.connection());

        repo.upsert_batch(
            &[
                product("REF-1", "Taladro percutor"),
                product("REF-2", "Brocas para taladro"),
                product("REF-3", "Cinta americana"),
            ],
            1,
        )
        .unwrap();

        let results = repo.search("taladro", 10).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_folds_accents_both_sides() {
        let db = setup();
        let repo = SqliteProductRepository::new(db.connection());

        repo.upsert_batch(&[product("REF-1", "Cinta métrica")], 1)
            .unwrap();

        let results = repo.search("metrica", 10).unwrap();
        assert_eq!(results.len(), 1);
        let results = repo.search("MÉTRICA", 10).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_search_ranks_available_first() {
        let db = setup();
        let repo = SqliteProductRepository::new(db.connection());

        let mut voided = product("REF-1", "Alicates aislados");
        voided.state = ProductState::Void;
        let mut out_of_stock = product("REF-2", "Alicates de punta");
        out_of_stock.stock = 0.0;
        let available = product("REF-3", "Alicates universales");

        repo.upsert_batch(&[voided, out_of_stock, available], 1)
            .unwrap();

        let results = repo.search("alicates", 10).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].reference, "REF-3");
    }

    #[test]
    fn test_reference_query_matches_reference_only() {
        let db = setup();
        let repo = SqliteProductRepository::new(db.connection());

        repo.upsert_batch(
            &[
                product("TAL-100", "Martillo"),
                product("MAR-200", "Taladro TAL-100 compatible"),
            ],
            1,
        )
        .unwrap();

        // Double space marks a reference lookup; the description mentioning
        // "TAL-100" must not match
        let results = repo.search("TAL  ", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].reference, "TAL-100");
    }

    #[test]
    fn test_search_empty_query_returns_nothing() {
        let db = setup();
        let repo = SqliteProductRepository::new(db.connection());

        repo.upsert_batch(&[product("REF-1", "Taladro")], 1).unwrap();
        assert!(repo.search("\"*\"", 10).unwrap().is_empty());
    }

    #[test]
    fn test_prune_generations_before() {
        let db = setup();
        let repo = SqliteProductRepository::new(db.connection());

        repo.upsert_batch(&[product("OLD-1", "Descatalogado")], 1)
            .unwrap();
        repo.upsert_batch(&[product("NEW-1", "Vigente")], 2).unwrap();

        let swept = repo.prune_generations_before(2).unwrap();
        assert_eq!(swept, 1);
        assert!(repo.get("OLD-1").unwrap().is_none());
        assert!(repo.get("NEW-1").unwrap().is_some());

        // Swept rows must disappear from search too (FTS stays in sync)
        assert!(repo.search("descatalogado", 10).unwrap().is_empty());
    }

    #[test]
    fn test_list_pagination() {
        let db = setup();
        let repo = SqliteProductRepository::new(db.connection());

        let batch: Vec<Product> = (0..5)
            .map(|i| product(&format!("REF-{i}"), "Item"))
            .collect();
        repo.upsert_batch(&batch, 1).unwrap();

        let page = repo.list(2, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].reference, "REF-2");
        assert_eq!(page[1].reference, "REF-3");
    }
}

//! PostgreSQL-backed catalog store.
//!
//! Queries are plain `sqlx::query` strings with explicit row mapping. Table
//! names come from [`SlugNamespace::table`] and are never user input.
//! Product writes and their gallery rows share one transaction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Connection, PgConnection, PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};
use std::time::Duration;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use super::{
    CatalogCounts, CatalogStore, Facet, FacetChanges, FacetKind, FacetRef, NewProduct,
    ProductChanges, ProductDetail, ProductFilter, ProductImage, ProductSummary, Size,
    SlugNamespace, StoreError, Variant, VariantInput,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const SKU_CONSTRAINT: &str = "product_variants_sku_key";

#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

#[derive(Debug, Clone, Copy)]
enum ProductKey<'a> {
    Id(Uuid),
    Slug(&'a str),
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a small pool to the catalog database.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema. Statements are idempotent.
    ///
    /// # Errors
    /// Returns an error naming the first statement that fails.
    pub async fn apply_schema(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire connection for schema setup")?;
        let statements = split_sql_statements(SCHEMA_SQL);
        for (index, statement) in statements.iter().enumerate() {
            sqlx::query(statement)
                .execute(&mut *conn)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }
        info!(statements = statements.len(), "catalog schema applied");
        Ok(())
    }
}

/// Splits the schema file into statements terminated by `;`, dropping `--` comments.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
        if trimmed.ends_with(';') {
            statements.push(current.trim().trim_end_matches(';').to_string());
            current.clear();
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }

    statements
}

/// RFC 3339 UTC rendering of a timestamp column.
fn ts(column: &str) -> String {
    format!(r#"to_char({column} AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"')"#)
}

/// Maps constraint violations on writes to the store's error taxonomy.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => match db_err.constraint() {
                Some(SKU_CONSTRAINT) => return StoreError::SkuTaken,
                Some(name) if name.ends_with("_slug_key") => return StoreError::SlugTaken,
                _ => {}
            },
            Some(FOREIGN_KEY_VIOLATION) => return StoreError::ForeignKey,
            _ => {}
        }
    }
    StoreError::Database(err)
}

fn facet_from_row(row: &PgRow) -> Facet {
    Facet {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        created_at: row.get("created_at"),
    }
}

fn variant_from_row(row: &PgRow) -> Variant {
    let size: Option<String> = row.get("size");
    Variant {
        id: row.get("id"),
        product_id: row.get("product_id"),
        sku: row.get("sku"),
        size: size.as_deref().and_then(Size::parse),
        color: row.get("color"),
        stock: row.get("stock"),
    }
}

fn facet_refs(row: &PgRow) -> (FacetRef, FacetRef) {
    (
        FacetRef {
            id: row.get("brand_id"),
            name: row.get("brand_name"),
            slug: row.get("brand_slug"),
        },
        FacetRef {
            id: row.get("category_id"),
            name: row.get("category_name"),
            slug: row.get("category_slug"),
        },
    )
}

fn product_select(where_clause: &str) -> String {
    format!(
        r"
        SELECT
            p.id, p.title, p.slug, p.description, p.price_cents, p.currency,
            {created_at} AS created_at,
            b.id AS brand_id, b.name AS brand_name, b.slug AS brand_slug,
            c.id AS category_id, c.name AS category_name, c.slug AS category_slug
        FROM products p
        JOIN brands b ON b.id = p.brand_id
        JOIN categories c ON c.id = p.category_id
        WHERE {where_clause}
        ",
        created_at = ts("p.created_at"),
    )
}

async fn load_product(
    conn: &mut PgConnection,
    key: ProductKey<'_>,
) -> Result<Option<ProductDetail>, sqlx::Error> {
    let row = match key {
        ProductKey::Id(id) => {
            sqlx::query(&product_select("p.id = $1"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
        }
        ProductKey::Slug(slug) => {
            sqlx::query(&product_select("p.slug = $1"))
                .bind(slug)
                .fetch_optional(&mut *conn)
                .await?
        }
    };
    let Some(row) = row else {
        return Ok(None);
    };
    let id: Uuid = row.get("id");

    let images = sqlx::query(
        r"
        SELECT url, alt, position
        FROM product_images
        WHERE product_id = $1
        ORDER BY position ASC
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(|image| ProductImage {
        url: image.get("url"),
        alt: image.get("alt"),
        position: image.get("position"),
    })
    .collect();

    let variants = sqlx::query(
        r"
        SELECT id, product_id, sku, size, color, stock
        FROM product_variants
        WHERE product_id = $1
        ORDER BY sku ASC
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(variant_from_row)
    .collect();

    let (brand, category) = facet_refs(&row);
    Ok(Some(ProductDetail {
        id,
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        price_cents: row.get("price_cents"),
        currency: row.get("currency"),
        brand,
        category,
        images,
        variants,
        created_at: row.get("created_at"),
    }))
}

async fn insert_images(
    conn: &mut PgConnection,
    product_id: Uuid,
    urls: &[String],
) -> Result<(), sqlx::Error> {
    for (position, url) in (0_i32..).zip(urls) {
        sqlx::query(
            r"
            INSERT INTO product_images (product_id, url, position)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(product_id)
        .bind(url)
        .bind(position)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }

    async fn slug_exists(&self, namespace: SlugNamespace, slug: &str) -> Result<bool, StoreError> {
        let query = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE slug = $1) AS taken",
            namespace.table()
        );
        let row = sqlx::query(&query).bind(slug).fetch_one(&self.pool).await?;
        Ok(row.get("taken"))
    }

    async fn counts(&self) -> Result<CatalogCounts, StoreError> {
        let row = sqlx::query(
            r"
            SELECT
                (SELECT COUNT(*) FROM brands) AS brands,
                (SELECT COUNT(*) FROM categories) AS categories,
                (SELECT COUNT(*) FROM products) AS products
            ",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(CatalogCounts {
            brands: row.get("brands"),
            categories: row.get("categories"),
            products: row.get("products"),
        })
    }

    async fn list_facets(&self, kind: FacetKind) -> Result<Vec<Facet>, StoreError> {
        let query = format!(
            "SELECT id, name, slug, {} AS created_at FROM {} ORDER BY name ASC",
            ts("created_at"),
            kind.namespace().table()
        );
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(facet_from_row).collect())
    }

    async fn facet_by_slug(&self, kind: FacetKind, slug: &str) -> Result<Option<Facet>, StoreError> {
        let query = format!(
            "SELECT id, name, slug, {} AS created_at FROM {} WHERE slug = $1",
            ts("created_at"),
            kind.namespace().table()
        );
        let row = sqlx::query(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(facet_from_row))
    }

    async fn insert_facet(
        &self,
        kind: FacetKind,
        name: &str,
        slug: &str,
    ) -> Result<Facet, StoreError> {
        let query = format!(
            "INSERT INTO {} (name, slug) VALUES ($1, $2) RETURNING id, name, slug, {} AS created_at",
            kind.namespace().table(),
            ts("created_at")
        );
        let row = sqlx::query(&query)
            .bind(name)
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(facet_from_row(&row))
    }

    async fn update_facet(
        &self,
        kind: FacetKind,
        id: Uuid,
        changes: &FacetChanges,
    ) -> Result<Facet, StoreError> {
        let query = format!(
            r"
            UPDATE {}
            SET name = COALESCE($1, name), slug = COALESCE($2, slug)
            WHERE id = $3
            RETURNING id, name, slug, {} AS created_at
            ",
            kind.namespace().table(),
            ts("created_at")
        );
        let row = sqlx::query(&query)
            .bind(changes.name.as_deref())
            .bind(changes.slug.as_deref())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;
        row.as_ref().map(facet_from_row).ok_or(StoreError::NotFound)
    }

    async fn delete_facet(&self, kind: FacetKind, id: Uuid) -> Result<(), StoreError> {
        let query = format!("DELETE FROM {} WHERE id = $1", kind.namespace().table());
        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_products(
        &self,
        filter: ProductFilter,
        limit: i64,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        let query = format!(
            r"
            SELECT
                p.id, p.title, p.slug, p.price_cents, p.currency,
                {created_at} AS created_at,
                b.id AS brand_id, b.name AS brand_name, b.slug AS brand_slug,
                c.id AS category_id, c.name AS category_name, c.slug AS category_slug,
                (
                    SELECT i.url FROM product_images i
                    WHERE i.product_id = p.id
                    ORDER BY i.position ASC
                    LIMIT 1
                ) AS cover_image
            FROM products p
            JOIN brands b ON b.id = p.brand_id
            JOIN categories c ON c.id = p.category_id
            WHERE ($1::uuid IS NULL OR p.brand_id = $1)
              AND ($2::uuid IS NULL OR p.category_id = $2)
            ORDER BY p.created_at DESC
            LIMIT $3
            ",
            created_at = ts("p.created_at"),
        );
        let rows = sqlx::query(&query)
            .bind(filter.brand_id)
            .bind(filter.category_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| {
                let (brand, category) = facet_refs(row);
                ProductSummary {
                    id: row.get("id"),
                    title: row.get("title"),
                    slug: row.get("slug"),
                    price_cents: row.get("price_cents"),
                    currency: row.get("currency"),
                    brand,
                    category,
                    cover_image: row.get("cover_image"),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<ProductDetail>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(load_product(&mut conn, ProductKey::Slug(slug)).await?)
    }

    async fn product_by_id(&self, id: Uuid) -> Result<Option<ProductDetail>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(load_product(&mut conn, ProductKey::Id(id)).await?)
    }

    async fn insert_product(
        &self,
        product: &NewProduct,
        slug: &str,
    ) -> Result<ProductDetail, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            r"
            INSERT INTO products (title, slug, description, price_cents, currency, brand_id, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(&product.title)
        .bind(slug)
        .bind(product.description.as_deref())
        .bind(product.price_cents)
        .bind(&product.currency)
        .bind(product.brand_id)
        .bind(product.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;
        let id: Uuid = row.get("id");

        insert_images(&mut tx, id, &product.images)
            .await
            .map_err(map_write_error)?;
        let detail = load_product(&mut tx, ProductKey::Id(id))
            .await?
            .ok_or(StoreError::NotFound)?;
        tx.commit().await?;
        Ok(detail)
    }

    async fn update_product(
        &self,
        id: Uuid,
        changes: &ProductChanges,
    ) -> Result<ProductDetail, StoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r"
            UPDATE products
            SET
                title = COALESCE($1, title),
                slug = COALESCE($2, slug),
                description = CASE WHEN $3::boolean THEN $4 ELSE description END,
                price_cents = COALESCE($5, price_cents),
                currency = COALESCE($6, currency),
                brand_id = COALESCE($7, brand_id),
                category_id = COALESCE($8, category_id),
                updated_at = NOW()
            WHERE id = $9
            RETURNING id
            ",
        )
        .bind(changes.title.as_deref())
        .bind(changes.slug.as_deref())
        .bind(changes.description.is_some())
        .bind(changes.description.clone().flatten())
        .bind(changes.price_cents)
        .bind(changes.currency.as_deref())
        .bind(changes.brand_id)
        .bind(changes.category_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_write_error)?;
        if updated.is_none() {
            return Err(StoreError::NotFound);
        }

        if let Some(images) = &changes.images {
            sqlx::query("DELETE FROM product_images WHERE product_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_images(&mut tx, id, images)
                .await
                .map_err(map_write_error)?;
        }

        let detail = load_product(&mut tx, ProductKey::Id(id))
            .await?
            .ok_or(StoreError::NotFound)?;
        tx.commit().await?;
        Ok(detail)
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn insert_variant(
        &self,
        product_id: Uuid,
        variant: &VariantInput,
    ) -> Result<Variant, StoreError> {
        let row = sqlx::query(
            r"
            INSERT INTO product_variants (product_id, sku, size, color, stock)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, product_id, sku, size, color, stock
            ",
        )
        .bind(product_id)
        .bind(&variant.sku)
        .bind(variant.size.map(Size::as_str))
        .bind(variant.color.as_deref())
        .bind(variant.stock)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(variant_from_row(&row))
    }

    async fn update_variant(
        &self,
        id: Uuid,
        variant: &VariantInput,
    ) -> Result<Variant, StoreError> {
        let row = sqlx::query(
            r"
            UPDATE product_variants
            SET sku = $1, size = $2, color = $3, stock = $4
            WHERE id = $5
            RETURNING id, product_id, sku, size, color, stock
            ",
        )
        .bind(&variant.sku)
        .bind(variant.size.map(Size::as_str))
        .bind(variant.color.as_deref())
        .bind(variant.stock)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        row.as_ref().map(variant_from_row).ok_or(StoreError::NotFound)
    }

    async fn delete_variant(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM product_variants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

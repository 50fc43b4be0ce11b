//! In-memory catalog store for handler tests.
//!
//! Enforces the same constraints as the PostgreSQL schema: unique slugs per
//! namespace, unique SKUs, restricted facet deletes and cascading product
//! deletes.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use super::{
    CatalogCounts, CatalogStore, Facet, FacetChanges, FacetKind, FacetRef, NewProduct,
    ProductChanges, ProductDetail, ProductFilter, ProductImage, ProductSummary, SlugNamespace,
    StoreError, Variant, VariantInput,
};

#[derive(Debug, Clone)]
struct ProductRow {
    id: Uuid,
    title: String,
    slug: String,
    description: Option<String>,
    price_cents: i64,
    currency: String,
    brand_id: Uuid,
    category_id: Uuid,
    images: Vec<String>,
    created_at: String,
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    brands: Vec<Facet>,
    categories: Vec<Facet>,
    products: Vec<ProductRow>,
    variants: Vec<Variant>,
    seq: u64,
}

impl State {
    fn facets(&self, kind: FacetKind) -> &Vec<Facet> {
        match kind {
            FacetKind::Brand => &self.brands,
            FacetKind::Category => &self.categories,
        }
    }

    fn facets_mut(&mut self, kind: FacetKind) -> &mut Vec<Facet> {
        match kind {
            FacetKind::Brand => &mut self.brands,
            FacetKind::Category => &mut self.categories,
        }
    }

    fn slug_taken(&self, namespace: SlugNamespace, slug: &str, except: Option<Uuid>) -> bool {
        let other = |id: Uuid| except != Some(id);
        match namespace {
            SlugNamespace::Brands => self.brands.iter().any(|f| f.slug == slug && other(f.id)),
            SlugNamespace::Categories => {
                self.categories.iter().any(|f| f.slug == slug && other(f.id))
            }
            SlugNamespace::Products => self.products.iter().any(|p| p.slug == slug && other(p.id)),
        }
    }

    fn sku_taken(&self, sku: &str, except: Option<Uuid>) -> bool {
        self.variants
            .iter()
            .any(|v| v.sku == sku && except != Some(v.id))
    }

    fn facet_ref(&self, kind: FacetKind, id: Uuid) -> Option<FacetRef> {
        self.facets(kind)
            .iter()
            .find(|f| f.id == id)
            .map(FacetRef::from)
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn summary(&self, row: &ProductRow) -> Option<ProductSummary> {
        Some(ProductSummary {
            id: row.id,
            title: row.title.clone(),
            slug: row.slug.clone(),
            price_cents: row.price_cents,
            currency: row.currency.clone(),
            brand: self.facet_ref(FacetKind::Brand, row.brand_id)?,
            category: self.facet_ref(FacetKind::Category, row.category_id)?,
            cover_image: row.images.first().cloned(),
            created_at: row.created_at.clone(),
        })
    }

    fn detail(&self, row: &ProductRow) -> Option<ProductDetail> {
        let mut variants: Vec<Variant> = self
            .variants
            .iter()
            .filter(|v| v.product_id == row.id)
            .cloned()
            .collect();
        variants.sort_by(|a, b| a.sku.cmp(&b.sku));
        Some(ProductDetail {
            id: row.id,
            title: row.title.clone(),
            slug: row.slug.clone(),
            description: row.description.clone(),
            price_cents: row.price_cents,
            currency: row.currency.clone(),
            brand: self.facet_ref(FacetKind::Brand, row.brand_id)?,
            category: self.facet_ref(FacetKind::Category, row.category_id)?,
            images: gallery(&row.images),
            variants,
            created_at: row.created_at.clone(),
        })
    }
}

fn gallery(urls: &[String]) -> Vec<ProductImage> {
    (0_i32..)
        .zip(urls)
        .map(|(position, url)| ProductImage {
            url: url.clone(),
            alt: None,
            position,
        })
        .collect()
}

fn now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn slug_exists(&self, namespace: SlugNamespace, slug: &str) -> Result<bool, StoreError> {
        Ok(self.lock().slug_taken(namespace, slug, None))
    }

    async fn counts(&self) -> Result<CatalogCounts, StoreError> {
        let state = self.lock();
        Ok(CatalogCounts {
            brands: i64::try_from(state.brands.len()).unwrap_or(i64::MAX),
            categories: i64::try_from(state.categories.len()).unwrap_or(i64::MAX),
            products: i64::try_from(state.products.len()).unwrap_or(i64::MAX),
        })
    }

    async fn list_facets(&self, kind: FacetKind) -> Result<Vec<Facet>, StoreError> {
        let mut facets = self.lock().facets(kind).clone();
        facets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(facets)
    }

    async fn facet_by_slug(&self, kind: FacetKind, slug: &str) -> Result<Option<Facet>, StoreError> {
        Ok(self
            .lock()
            .facets(kind)
            .iter()
            .find(|f| f.slug == slug)
            .cloned())
    }

    async fn insert_facet(
        &self,
        kind: FacetKind,
        name: &str,
        slug: &str,
    ) -> Result<Facet, StoreError> {
        let mut state = self.lock();
        if state.slug_taken(kind.namespace(), slug, None) {
            return Err(StoreError::SlugTaken);
        }
        let facet = Facet {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: now(),
        };
        state.facets_mut(kind).push(facet.clone());
        Ok(facet)
    }

    async fn update_facet(
        &self,
        kind: FacetKind,
        id: Uuid,
        changes: &FacetChanges,
    ) -> Result<Facet, StoreError> {
        let mut state = self.lock();
        if let Some(slug) = &changes.slug
            && state.slug_taken(kind.namespace(), slug, Some(id))
        {
            return Err(StoreError::SlugTaken);
        }
        let facet = state
            .facets_mut(kind)
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(name) = &changes.name {
            facet.name.clone_from(name);
        }
        if let Some(slug) = &changes.slug {
            facet.slug.clone_from(slug);
        }
        Ok(facet.clone())
    }

    async fn delete_facet(&self, kind: FacetKind, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !state.facets(kind).iter().any(|f| f.id == id) {
            return Err(StoreError::NotFound);
        }
        let referenced = state.products.iter().any(|p| match kind {
            FacetKind::Brand => p.brand_id == id,
            FacetKind::Category => p.category_id == id,
        });
        if referenced {
            return Err(StoreError::ForeignKey);
        }
        state.facets_mut(kind).retain(|f| f.id != id);
        Ok(())
    }

    async fn list_products(
        &self,
        filter: ProductFilter,
        limit: i64,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        let state = self.lock();
        let mut rows: Vec<&ProductRow> = state
            .products
            .iter()
            .filter(|p| filter.brand_id.is_none_or(|id| p.brand_id == id))
            .filter(|p| filter.category_id.is_none_or(|id| p.category_id == id))
            .collect();
        rows.sort_by(|a, b| b.seq.cmp(&a.seq));
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(rows
            .into_iter()
            .take(limit)
            .filter_map(|row| state.summary(row))
            .collect())
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<ProductDetail>, StoreError> {
        let state = self.lock();
        Ok(state
            .products
            .iter()
            .find(|p| p.slug == slug)
            .and_then(|row| state.detail(row)))
    }

    async fn product_by_id(&self, id: Uuid) -> Result<Option<ProductDetail>, StoreError> {
        let state = self.lock();
        Ok(state
            .products
            .iter()
            .find(|p| p.id == id)
            .and_then(|row| state.detail(row)))
    }

    async fn insert_product(
        &self,
        product: &NewProduct,
        slug: &str,
    ) -> Result<ProductDetail, StoreError> {
        let mut state = self.lock();
        if state.slug_taken(SlugNamespace::Products, slug, None) {
            return Err(StoreError::SlugTaken);
        }
        if state.facet_ref(FacetKind::Brand, product.brand_id).is_none()
            || state
                .facet_ref(FacetKind::Category, product.category_id)
                .is_none()
        {
            return Err(StoreError::ForeignKey);
        }
        let seq = state.next_seq();
        let row = ProductRow {
            id: Uuid::new_v4(),
            title: product.title.clone(),
            slug: slug.to_string(),
            description: product.description.clone(),
            price_cents: product.price_cents,
            currency: product.currency.clone(),
            brand_id: product.brand_id,
            category_id: product.category_id,
            images: product.images.clone(),
            created_at: now(),
            seq,
        };
        state.products.push(row.clone());
        state.detail(&row).ok_or(StoreError::NotFound)
    }

    async fn update_product(
        &self,
        id: Uuid,
        changes: &ProductChanges,
    ) -> Result<ProductDetail, StoreError> {
        let mut state = self.lock();
        let Some(current) = state.products.iter().find(|p| p.id == id).cloned() else {
            return Err(StoreError::NotFound);
        };
        if let Some(slug) = &changes.slug
            && state.slug_taken(SlugNamespace::Products, slug, Some(id))
        {
            return Err(StoreError::SlugTaken);
        }
        let mut next = current;
        if let Some(title) = &changes.title {
            next.title.clone_from(title);
        }
        if let Some(slug) = &changes.slug {
            next.slug.clone_from(slug);
        }
        if let Some(description) = &changes.description {
            next.description.clone_from(description);
        }
        if let Some(price_cents) = changes.price_cents {
            next.price_cents = price_cents;
        }
        if let Some(currency) = &changes.currency {
            next.currency.clone_from(currency);
        }
        if let Some(brand_id) = changes.brand_id {
            next.brand_id = brand_id;
        }
        if let Some(category_id) = changes.category_id {
            next.category_id = category_id;
        }
        if let Some(images) = &changes.images {
            next.images.clone_from(images);
        }
        if state.facet_ref(FacetKind::Brand, next.brand_id).is_none()
            || state.facet_ref(FacetKind::Category, next.category_id).is_none()
        {
            return Err(StoreError::ForeignKey);
        }
        let detail = state.detail(&next).ok_or(StoreError::NotFound)?;
        if let Some(slot) = state.products.iter_mut().find(|p| p.id == id) {
            *slot = next;
        }
        Ok(detail)
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.lock();
        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        if state.products.len() == before {
            return Err(StoreError::NotFound);
        }
        state.variants.retain(|v| v.product_id != id);
        Ok(())
    }

    async fn insert_variant(
        &self,
        product_id: Uuid,
        variant: &VariantInput,
    ) -> Result<Variant, StoreError> {
        let mut state = self.lock();
        if !state.products.iter().any(|p| p.id == product_id) {
            return Err(StoreError::ForeignKey);
        }
        if state.sku_taken(&variant.sku, None) {
            return Err(StoreError::SkuTaken);
        }
        let row = Variant {
            id: Uuid::new_v4(),
            product_id,
            sku: variant.sku.clone(),
            size: variant.size,
            color: variant.color.clone(),
            stock: variant.stock,
        };
        state.variants.push(row.clone());
        Ok(row)
    }

    async fn update_variant(
        &self,
        id: Uuid,
        variant: &VariantInput,
    ) -> Result<Variant, StoreError> {
        let mut state = self.lock();
        if state.sku_taken(&variant.sku, Some(id)) {
            return Err(StoreError::SkuTaken);
        }
        let row = state
            .variants
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(StoreError::NotFound)?;
        row.sku.clone_from(&variant.sku);
        row.size = variant.size;
        row.color.clone_from(&variant.color);
        row.stock = variant.stock;
        Ok(row.clone())
    }

    async fn delete_variant(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.lock();
        let before = state.variants.len();
        state.variants.retain(|v| v.id != id);
        if state.variants.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

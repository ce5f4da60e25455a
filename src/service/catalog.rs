//! Product catalog lookups consumed by the storefront and the cart core.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::product::Product;
use crate::error::StoreError;

#[derive(Clone, Debug, Default)]
pub struct ProductListParams {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub sort: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

/// Resolves a product for cart mutation. Inactive products read as absent;
/// stock is returned as-is so the caller can decide how to report it.
pub async fn find_active(db: &PgPool, id: Uuid) -> Result<Option<Product>, StoreError> {
    let product =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND is_active")
            .bind(id)
            .fetch_optional(db)
            .await?;
    Ok(product)
}

/// Storefront listing: active in-stock products with search, category
/// filter, sort, and pagination.
pub async fn list(
    db: &PgPool,
    params: &ProductListParams,
) -> Result<(Vec<Product>, i64), StoreError> {
    let page = params.page.max(1);
    let per_page = params.per_page.clamp(1, 100);

    let order_by = match params.sort.as_deref() {
        Some("price_asc") => "price ASC",
        Some("price_desc") => "price DESC",
        Some("name_asc") => "name ASC",
        Some("name_desc") => "name DESC",
        _ => "created_at DESC",
    };

    let where_clause = "WHERE is_active AND stock > 0 \
           AND ($1::text IS NULL OR name ILIKE '%' || $1 || '%' \
                OR short_desc ILIKE '%' || $1 || '%' OR description ILIKE '%' || $1 || '%') \
           AND ($2::uuid IS NULL OR category_id = $2)";

    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT * FROM products {where_clause} ORDER BY {order_by} LIMIT $3 OFFSET $4"
    ))
    .bind(params.search.as_deref())
    .bind(params.category_id)
    .bind(per_page as i64)
    .bind(((page - 1) * per_page) as i64)
    .fetch_all(db)
    .await?;

    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products {where_clause}"))
        .bind(params.search.as_deref())
        .bind(params.category_id)
        .fetch_one(db)
        .await?;

    Ok((products, total.0))
}

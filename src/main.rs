//! Honeymart - storefront cart and order service.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use honeymart::config::AppConfig;
use honeymart::domain::cart::{Cart, CartLine};
use honeymart::domain::notification::Notification;
use honeymart::domain::order::{Order, OrderItem, OrderStatus};
use honeymart::domain::product::Product;
use honeymart::error::{CartError, CheckoutError, OrderUpdateError};
use honeymart::service::cart::CartService;
use honeymart::service::checkout::CheckoutRequest;
use honeymart::service::orders::OrderFilter;
use honeymart::service::{catalog, checkout, notifications, orders, reports};
use honeymart::session::{MemorySessionStore, SessionContext};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub cart: CartService,
    pub nats: Option<async_nats::Client>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => async_nats::connect(url).await.ok(),
        None => None,
    };
    let sessions = Arc::new(MemorySessionStore::new(config.session_idle));
    let cart = CartService::new(sessions, config.quantity_policy);
    let state = AppState { db, cart, nats };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "honeymart"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/:id", get(get_product))
        .route("/api/v1/cart/:session", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/count", get(cart_count))
        .route("/api/v1/cart/:session/items", post(add_to_cart))
        .route("/api/v1/cart/:session/items/:product_id", put(update_cart_item).delete(remove_cart_item))
        .route("/api/v1/cart/:session/restore", post(restore_cart))
        .route("/api/v1/cart/:session/persist", post(persist_cart))
        .route("/api/v1/checkout", post(checkout_confirm))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/status", post(update_order_status))
        .route("/api/v1/users/:user_id/notifications", get(list_notifications))
        .route("/api/v1/users/:user_id/notifications/unread-count", get(unread_count))
        .route("/api/v1/users/:user_id/notifications/read-all", post(mark_all_read))
        .route("/api/v1/users/:user_id/notifications/:id/read", post(mark_notification_read))
        .route("/api/v1/admin/summary", get(admin_summary))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state);

    tracing::info!("honeymart listening on {}", config.bind_addr);
    axum::serve(tokio::net::TcpListener::bind(&config.bind_addr).await?, app).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub product_id: Uuid,
    pub product_name: String,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total: Decimal,
    pub count: u32,
}

fn cart_view(cart: &Cart) -> CartView {
    let mut items: Vec<CartLineView> = cart
        .lines()
        .map(|l: &CartLine| CartLineView {
            product_id: l.product_id,
            product_name: l.product_name.clone(),
            image_url: l.image_url.clone(),
            unit_price: l.unit_price,
            quantity: l.quantity,
            line_total: l.line_total(),
        })
        .collect();
    items.sort_by(|a, b| a.product_name.cmp(&b.product_name));
    CartView { total: cart.total(), count: cart.item_count(), items }
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn cart_error(e: CartError) -> (StatusCode, String) {
    match e {
        CartError::StockConflict { .. } => (StatusCode::CONFLICT, e.to_string()),
        _ => internal(e),
    }
}

fn checkout_error(e: CheckoutError) -> (StatusCode, String) {
    match e {
        CheckoutError::NotAuthenticated => (StatusCode::UNAUTHORIZED, e.to_string()),
        CheckoutError::EmptyCart => (StatusCode::BAD_REQUEST, e.to_string()),
        CheckoutError::Invalid(_) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        CheckoutError::Cart(inner) => cart_error(inner),
        CheckoutError::Store(_) => internal(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub category: Option<Uuid>,
    pub sort: Option<String>,
}

async fn list_products(State(s): State<AppState>, Query(q): Query<ProductListQuery>) -> Result<Json<PaginatedResponse<Product>>, (StatusCode, String)> {
    let page = q.page.unwrap_or(1).max(1);
    let params = catalog::ProductListParams {
        search: q.search,
        category_id: q.category,
        sort: q.sort,
        page,
        per_page: q.per_page.unwrap_or(20).min(100),
    };
    let (data, total) = catalog::list(&s.db, &params).await.map_err(internal)?;
    Ok(Json(PaginatedResponse { data, total, page }))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>, (StatusCode, String)> {
    catalog::find_active(&s.db, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Product not found".to_string()))
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Json<CartView> {
    let ctx = SessionContext::anonymous(session);
    Json(cart_view(&s.cart.get(&ctx).await))
}

async fn cart_count(State(s): State<AppState>, Path(session): Path<String>) -> Json<serde_json::Value> {
    let ctx = SessionContext::anonymous(session);
    Json(serde_json::json!({ "count": s.cart.item_count(&ctx).await }))
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i64,
}

async fn add_to_cart(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddToCartRequest>) -> Result<(StatusCode, Json<CartView>), (StatusCode, String)> {
    if r.quantity <= 0 {
        return Err((StatusCode::BAD_REQUEST, "Quantity must be positive".to_string()));
    }
    let product = catalog::find_active(&s.db, r.product_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Product not found".to_string()))?;
    if !product.is_in_stock() {
        return Err((StatusCode::CONFLICT, "Product is out of stock".to_string()));
    }

    let ctx = SessionContext::anonymous(session);
    let quantity = u32::try_from(r.quantity).unwrap_or(u32::MAX);
    let cart = s.cart.add(&ctx, &product, quantity).await.map_err(cart_error)?;
    Ok((StatusCode::CREATED, Json(cart_view(&cart))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

async fn update_cart_item(State(s): State<AppState>, Path((session, product_id)): Path<(String, Uuid)>, Json(r): Json<UpdateQuantityRequest>) -> Result<Json<CartView>, (StatusCode, String)> {
    let ctx = SessionContext::anonymous(session);
    let cart = s.cart.update_quantity(&ctx, product_id, r.quantity).await.map_err(cart_error)?;
    Ok(Json(cart_view(&cart)))
}

async fn remove_cart_item(State(s): State<AppState>, Path((session, product_id)): Path<(String, Uuid)>) -> Result<Json<CartView>, (StatusCode, String)> {
    let ctx = SessionContext::anonymous(session);
    let cart = s.cart.remove(&ctx, product_id).await.map_err(cart_error)?;
    Ok(Json(cart_view(&cart)))
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> StatusCode {
    let ctx = SessionContext::anonymous(session);
    s.cart.clear(&ctx).await;
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
pub struct UserRef {
    pub user_id: Uuid,
}

async fn restore_cart(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<UserRef>) -> Result<Json<CartView>, (StatusCode, String)> {
    let ctx = SessionContext::for_user(session, r.user_id);
    let cart = s.cart.restore_on_login(&s.db, &ctx).await.map_err(cart_error)?;
    Ok(Json(cart_view(&cart)))
}

async fn persist_cart(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<UserRef>) -> Result<StatusCode, (StatusCode, String)> {
    let ctx = SessionContext::for_user(session, r.user_id);
    s.cart.persist_on_logout(&s.db, &ctx).await.map_err(cart_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CheckoutPayload {
    pub session_id: String,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub phone: String,
    pub address: String,
}

async fn checkout_confirm(State(s): State<AppState>, Json(r): Json<CheckoutPayload>) -> Result<(StatusCode, Json<Order>), (StatusCode, String)> {
    let ctx = SessionContext {
        session_id: r.session_id,
        user_id: r.user_id,
    };
    let req = CheckoutRequest {
        full_name: r.full_name,
        phone: r.phone,
        address: r.address,
    };
    let order = checkout::confirm(&s.db, &s.cart, &ctx, req).await.map_err(checkout_error)?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub user_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

async fn list_orders(State(s): State<AppState>, Query(q): Query<OrderListQuery>) -> Result<Json<PaginatedResponse<Order>>, (StatusCode, String)> {
    let status = match q.status.as_deref() {
        Some(raw) => Some(OrderStatus::parse(raw).ok_or((StatusCode::BAD_REQUEST, format!("Unknown status {raw:?}")))?),
        None => None,
    };
    let filter = OrderFilter {
        status,
        search: q.search,
        user_id: q.user_id,
        page: q.page.unwrap_or(1).max(1),
        per_page: q.per_page.unwrap_or(20).min(100),
    };
    let (data, total) = orders::list(&s.db, &filter).await.map_err(internal)?;
    Ok(Json(PaginatedResponse { data, total, page: filter.page }))
}

#[derive(Debug, Serialize)]
pub struct OrderDetailsResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

async fn get_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OrderDetailsResponse>, (StatusCode, String)> {
    let (order, items) = orders::details(&s.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Order not found".to_string()))?;
    Ok(Json(OrderDetailsResponse { order, items }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

async fn update_order_status(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<UpdateStatusRequest>) -> Result<Json<Order>, (StatusCode, String)> {
    let status = OrderStatus::parse(&r.status)
        .ok_or((StatusCode::BAD_REQUEST, format!("Unknown status {:?}", r.status)))?;
    let order = orders::update_status(&s.db, s.nats.as_ref(), id, status, r.reason)
        .await
        .map_err(|e| match e {
            OrderUpdateError::NotFound => (StatusCode::NOT_FOUND, e.to_string()),
            OrderUpdateError::Store(_) => internal(e),
        })?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

async fn list_notifications(State(s): State<AppState>, Path(user_id): Path<Uuid>, Query(q): Query<LimitQuery>) -> Result<Json<Vec<Notification>>, (StatusCode, String)> {
    let items = notifications::recent(&s.db, user_id, q.limit.unwrap_or(10)).await.map_err(internal)?;
    Ok(Json(items))
}

async fn unread_count(State(s): State<AppState>, Path(user_id): Path<Uuid>) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let count = notifications::unread_count(&s.db, user_id).await.map_err(internal)?;
    Ok(Json(serde_json::json!({ "count": count })))
}

async fn mark_notification_read(State(s): State<AppState>, Path((user_id, id)): Path<(Uuid, Uuid)>) -> Result<StatusCode, (StatusCode, String)> {
    let marked = notifications::mark_read(&s.db, user_id, id).await.map_err(internal)?;
    if marked {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Notification not found".to_string()))
    }
}

async fn mark_all_read(State(s): State<AppState>, Path(user_id): Path<Uuid>) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let count = notifications::mark_all_read(&s.db, user_id).await.map_err(internal)?;
    Ok(Json(serde_json::json!({ "count": count })))
}

async fn admin_summary(State(s): State<AppState>) -> Result<Json<reports::DashboardSummary>, (StatusCode, String)> {
    let summary = reports::summary(&s.db).await.map_err(internal)?;
    Ok(Json(summary))
}

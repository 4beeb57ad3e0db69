//! # Server Configuration
//!
//! Router assembly, shared application state and the server entry point
//! for the Reefdesk API.

use std::sync::Arc;

use axum::{
    Router,
    middleware,
    routing::{get, patch, post},
};
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{auth_middleware, operator_middleware};
use crate::config::AppConfig;
use crate::events::{DomainEvent, EventBus, EventSink, LoggingSink, spawn_dispatcher};
use crate::handlers;
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub events: EventBus,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    // Routes that require a bearer token plus the X-Organization-Id scope
    let scoped = Router::new()
        .route(
            "/api/v1/customers",
            post(handlers::customers::create_customer).get(handlers::customers::list_customers),
        )
        .route(
            "/api/v1/customers/{id}",
            get(handlers::customers::get_customer),
        )
        .route(
            "/api/v1/trips",
            post(handlers::trips::create_trip).get(handlers::trips::list_trips),
        )
        .route("/api/v1/trips/{id}", get(handlers::trips::get_trip))
        .route(
            "/api/v1/products",
            post(handlers::products::create_product).get(handlers::products::list_products),
        )
        .route(
            "/api/v1/products/low-stock",
            get(handlers::products::list_low_stock),
        )
        .route(
            "/api/v1/products/{id}",
            get(handlers::products::get_product)
                .patch(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/api/v1/products/{id}/stock-adjustments",
            post(handlers::products::adjust_stock),
        )
        .route(
            "/api/v1/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route("/api/v1/bookings/{id}", get(handlers::bookings::get_booking))
        .route(
            "/api/v1/bookings/{id}/status",
            patch(handlers::bookings::update_booking_status),
        )
        .route(
            "/api/v1/bookings/{id}/payments",
            post(handlers::bookings::record_payment),
        )
        .route(
            "/api/v1/bookings/{id}/refunds",
            post(handlers::bookings::record_refund),
        )
        .route("/api/v1/sales", post(handlers::sales::record_sale))
        .route(
            "/api/v1/transactions",
            get(handlers::transactions::list_transactions),
        )
        // route_layer keeps the auth gate off unmatched paths, so unknown
        // routes still fall through to the plain 404 fallback.
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Organization management carries no scope header: operators administer
    // the organizations themselves.
    let operator = Router::new()
        .route(
            "/api/v1/organizations",
            post(handlers::organizations::create_organization)
                .get(handlers::organizations::list_organizations),
        )
        .route(
            "/api/v1/organizations/{id}",
            get(handlers::organizations::get_organization),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            operator_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .merge(scoped)
        .merge(operator)
        .with_state(state)
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Builds an [`AppState`] for tests, returning the event receiver so tests
/// can observe published events.
pub fn create_test_app_state(
    config: AppConfig,
    db: DatabaseConnection,
) -> (AppState, mpsc::Receiver<DomainEvent>) {
    let (events, event_rx) = EventBus::new(config.events.queue_capacity);
    let state = AppState {
        config: Arc::new(config),
        db,
        events,
    };
    (state, event_rx)
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = CancellationToken::new();

    let (events, event_rx) = EventBus::new(config.events.queue_capacity);
    let sinks: Vec<Box<dyn EventSink>> =
        vec![Box::new(LoggingSink::new(config.events.log_payloads))];
    let dispatcher = spawn_dispatcher(event_rx, sinks, shutdown.clone());

    let state = AppState {
        config: Arc::new(config),
        db,
        events,
    };

    // Resolve the configured bind address
    let addr = state
        .config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = state.config.profile.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, %profile, "Server listening");

    let serve_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            serve_shutdown.cancel();
        })
        .await?;

    // Drain the event dispatcher before exiting
    shutdown.cancel();
    if let Err(err) = dispatcher.await {
        warn!(error = ?err, "Event dispatcher did not stop cleanly");
    }

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::organizations::create_organization,
        crate::handlers::organizations::get_organization,
        crate::handlers::organizations::list_organizations,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::list_customers,
        crate::handlers::trips::create_trip,
        crate::handlers::trips::get_trip,
        crate::handlers::trips::list_trips,
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::list_low_stock,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::adjust_stock,
        crate::handlers::bookings::create_booking,
        crate::handlers::bookings::list_bookings,
        crate::handlers::bookings::get_booking,
        crate::handlers::bookings::update_booking_status,
        crate::handlers::bookings::record_payment,
        crate::handlers::bookings::record_refund,
        crate::handlers::sales::record_sale,
        crate::handlers::transactions::list_transactions,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::HealthResponse,
            crate::handlers::organizations::CreateOrganizationDto,
            crate::handlers::organizations::OrganizationResponse,
            crate::handlers::customers::CreateCustomerDto,
            crate::handlers::customers::CustomerResponse,
            crate::handlers::trips::CreateTripDto,
            crate::handlers::trips::TripResponse,
            crate::handlers::products::CreateProductDto,
            crate::handlers::products::UpdateProductDto,
            crate::handlers::products::StockAdjustmentDto,
            crate::handlers::products::ProductResponse,
            crate::handlers::products::StockAdjustmentResponse,
            crate::handlers::bookings::CreateBookingDto,
            crate::handlers::bookings::UpdateBookingStatusDto,
            crate::handlers::bookings::RecordPaymentDto,
            crate::handlers::bookings::RecordRefundDto,
            crate::handlers::bookings::BookingResponse,
            crate::handlers::bookings::BookingTransactionResponse,
            crate::handlers::sales::SaleItemDto,
            crate::handlers::sales::RecordSaleDto,
            crate::handlers::sales::SaleLineResponse,
            crate::handlers::sales::SaleResponse,
            crate::handlers::transactions::TransactionResponse,
        )
    ),
    info(
        title = "Reefdesk API",
        description = "Multi-tenant dive shop management API",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use hyper::Method;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::database::sqlite::SqliteDatabase;
use crate::errors::Result;
use crate::services::approval::ApprovalService;
use crate::services::auth::{ensure_admin_user, AdminAuthService};
use crate::services::customer_client::{CustomerClient, CustomerGateway};
use crate::services::jwt::JwtManager;
use crate::services::kyc::KycService;
use crate::utils::middleware::{
    auth_gate, request_id_middleware, require_admin, require_authenticated,
};

pub mod routes;
pub mod types;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtManager>,
    pub auth: Arc<AdminAuthService>,
    pub kyc: Arc<KycService>,
    pub customers: Arc<dyn CustomerGateway>,
    pub approval: Arc<ApprovalService>,
}

impl AppState {
    pub fn build(
        config: AppConfig,
        database: Arc<SqliteDatabase>,
        customers: Arc<dyn CustomerGateway>,
    ) -> Self {
        let config = Arc::new(config);
        let jwt = Arc::new(JwtManager::new(config.jwt_secret.clone()));
        let auth = Arc::new(AdminAuthService::new(
            database.clone(),
            jwt.clone(),
            config.jwt_ttl,
        ));
        let kyc = Arc::new(KycService::new(database));
        let approval = Arc::new(ApprovalService::new(kyc.clone(), customers.clone()));

        Self {
            config,
            jwt,
            auth,
            kyc,
            customers,
            approval,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::admin_login,
        routes::admin_logout,
        routes::admin_validate,
        routes::upload_document,
        routes::my_documents,
        routes::download_document,
        routes::delete_document,
        routes::verify_document,
        routes::reject_document,
        routes::pending_verifications,
        routes::customer_documents,
        routes::kyc_stats,
        routes::list_customers,
        routes::get_customer,
        routes::approve_customer,
    ),
    components(
        schemas(
            types::AdminLoginRequest,
            types::AdminLoginResponse,
            types::ValidateResponse,
            types::KycDocumentResponse,
            types::ActionResponse,
            crate::models::document::KycStats,
            crate::models::document::VerificationStatus,
            crate::models::user::Role,
            crate::models::customer::CustomerDto,
            crate::models::customer::CustomerPage,
        )
    ),
    tags(
        (name = "Admin", description = "Admin session and customer approval endpoints"),
        (name = "KYC", description = "Document upload, download and review endpoints. Most endpoints require a bearer token.")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Assembles the route groups with their guard layers. The auth gate runs
/// on every request; role guards are composed per route group so the table
/// of who-may-call-what lives in one place.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let admin_review = Router::new()
        .route("/verify/:id", put(routes::verify_document))
        .route("/reject/:id", put(routes::reject_document))
        .route("/pending-verifications", get(routes::pending_verifications))
        .route("/documents/:customer_id", get(routes::customer_documents))
        .route("/stats", get(routes::kyc_stats))
        .route_layer(middleware::from_fn(require_admin));

    let kyc_routes = Router::new()
        .route("/upload", post(routes::upload_document))
        .route("/my-documents", get(routes::my_documents))
        .route("/document/:id/download", get(routes::download_document))
        .route("/document/:id", delete(routes::delete_document))
        .route_layer(middleware::from_fn(require_authenticated))
        .nest("/admin", admin_review);

    let admin_customers = Router::new()
        .route("/customers", get(routes::list_customers))
        .route("/customers/:id", get(routes::get_customer))
        .route(
            "/approve-customer/:customer_id",
            post(routes::approve_customer),
        )
        .route_layer(middleware::from_fn(require_admin));

    let admin_routes = Router::new()
        .route("/login", post(routes::admin_login))
        .route("/logout", post(routes::admin_logout))
        .route("/validate", get(routes::admin_validate))
        .merge(admin_customers);

    Router::new()
        .route("/health", get(routes::health_check))
        .route(
            "/*path",
            axum::routing::options(|| async { StatusCode::NO_CONTENT }),
        )
        .nest("/api/kyc", kyc_routes)
        .nest("/admin", admin_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(config: AppConfig) -> Result<()> {
    let database = Arc::new(SqliteDatabase::new(&config.database_path).await?);
    ensure_admin_user(&database, &config.admin_username, &config.admin_password).await?;

    let customers: Arc<dyn CustomerGateway> =
        Arc::new(CustomerClient::new(config.customer_service_url.clone()));
    let port = config.port;
    let state = AppState::build(config, database, customers);
    let app = build_router(state);

    let addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(action = "http_server_started", %addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        crate::errors::AppError::InternalError(format!("Failed to bind {}: {}", addr, e))
    })?;
    axum::serve(listener, app).await.map_err(|e| {
        crate::errors::AppError::InternalError(format!("HTTP server error: {}", e))
    })
}

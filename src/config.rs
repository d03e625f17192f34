use chrono::Duration;

/// Runtime configuration, read once at startup.
///
/// Holds the JWT signing secret and the bootstrap admin credential, so it
/// doubles as the secret store for the auth components.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub admin_username: String,
    pub admin_password: String,
    pub customer_service_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_ttl_hours = std::env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);

        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "kyc_service.db".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            jwt_secret: std::env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set in environment for production!"),
            jwt_ttl: Duration::hours(jwt_ttl_hours),
            admin_username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: std::env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".to_string()),
            customer_service_url: std::env::var("CUSTOMER_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
        }
    }
}

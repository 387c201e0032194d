//! OpenAPI documentation
//!
//! The generated document is served at `/api-docs/openapi.json`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::types::{
    DepositBody, ErrorDetail, ErrorResponse, HealthResponse, LoginRequest, LoginResponse,
    UserView, WithdrawBody,
};
use crate::ledger::Transaction;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Main API documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Betbridge Broker API",
        version = "0.3.0",
        description = "Transaction broker between a game provider and an external wallet service.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::auth::login,
        crate::gateway::handlers::user::me,
        crate::gateway::handlers::transaction::withdraw,
        crate::gateway::handlers::transaction::deposit,
        crate::gateway::handlers::transaction::cancel,
        crate::gateway::handlers::transaction::list_transactions,
        crate::gateway::handlers::health::health_check,
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            UserView,
            WithdrawBody,
            DepositBody,
            Transaction,
            ErrorDetail,
            ErrorResponse,
            HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Token issue"),
        (name = "Users", description = "Player views (auth required)"),
        (name = "Transactions", description = "Bet placement, settlement, cancellation (auth required)"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Betbridge Broker API");
    }

    #[test]
    fn test_endpoints_registered() {
        let spec = ApiDoc::openapi();
        let paths = spec.paths;
        assert!(paths.paths.contains_key("/api/v1/auth/login"));
        assert!(paths.paths.contains_key("/api/v1/users/me"));
        assert!(paths.paths.contains_key("/api/v1/transactions/withdraw"));
        assert!(paths.paths.contains_key("/api/v1/transactions/deposit"));
        assert!(
            paths
                .paths
                .contains_key("/api/v1/transactions/cancel/{provider_tx_id}")
        );
        assert!(paths.paths.contains_key("/api/v1/health"));
    }

    #[test]
    fn test_security_scheme_registered() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("should have components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}

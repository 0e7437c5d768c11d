//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for the Community Events API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Community Events API",
        version = "0.1.0",
        description = "Local events listing with organizer submissions and admin moderation",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api", api = domain_events::ApiDoc)
    )
)]
pub struct ApiDoc;

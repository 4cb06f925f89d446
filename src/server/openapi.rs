use crate::config::{BasicConfig, DocsConfig};
use crate::error::{ApiErrorBody, ApiErrorObject};
use crate::server::routes::{auth, items, oauth, session, system, users};
use crate::session::SESSION_COOKIE;
use axum::Router;
use utoipa::openapi::security::{
    ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme,
};
use utoipa::{Modify, OpenApi};
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        system::root,
        system::health,
        system::public_config,
        auth::login,
        auth::read_users_me,
        auth::admin_dashboard,
        users::create_user,
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::assign_role,
        users::revoke_role,
        items::create_item,
        items::list_items,
        items::get_item,
        items::update_item,
        items::delete_item,
        oauth::oauth_login,
        oauth::oauth_callback,
        session::session_me,
        session::logout,
    ),
    components(schemas(ApiErrorBody, ApiErrorObject)),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Password login and token-protected account views"),
        (name = "users", description = "Registration, account management and roles"),
        (name = "items", description = "Items owned by users"),
        (name = "oauth", description = "Third-party login through Google, GitHub or Facebook"),
        (name = "session", description = "Cookie sessions created by OAuth login"),
    )
)]
pub struct KeystoneApi;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "session",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
        );
    }
}

/// The OpenAPI document, titled after the running app.
pub fn api_doc(basic: &BasicConfig) -> utoipa::openapi::OpenApi {
    let mut doc = KeystoneApi::openapi();
    doc.info.title.clone_from(&basic.app_name);
    doc.info.version.clone_from(&basic.version);
    doc
}

/// Swagger UI, ReDoc and the raw document, or nothing when docs are disabled.
pub fn docs_router(docs: &DocsConfig, basic: &BasicConfig) -> Router {
    if !docs.enabled {
        return Router::new();
    }
    let doc = api_doc(basic);
    Router::new()
        .merge(SwaggerUi::new(docs.docs_url.clone()).url(docs.openapi_url.clone(), doc.clone()))
        .merge(Redoc::with_url(docs.redoc_url.clone(), doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Environment};

    #[test]
    fn document_covers_every_route_and_scheme() {
        let cfg = Config::for_environment(Environment::Testing);
        let doc = api_doc(&cfg.basic);
        assert_eq!(doc.info.title, cfg.basic.app_name);

        for path in [
            "/health",
            "/api/v1/login",
            "/api/v1/users/{id}/roles/{role}",
            "/api/v1/items/{id}",
            "/api/v1/oauth/{provider}/callback",
            "/api/v1/logout",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("jwt"));
        assert!(components.security_schemes.contains_key("session"));
        assert!(components.schemas.contains_key("UserModel"));
    }
}

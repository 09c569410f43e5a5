use crate::routes::{health, v1};
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(info(
    title = "folio-server",
    description = "Portfolio backend API: accounts, showcase, contact form, chat and chatbot",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(v1::api_docs());
    root.components.get_or_insert_with(Default::default).add_security_scheme(
        "bearer",
        SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
    );
    root
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn merged_document_lists_every_area() {
        let doc = get_docs();
        for path in [
            "/health",
            "/api/v1/accounts/login",
            "/api/v1/portfolio/contacts/",
            "/api/v1/chat/conversations/{id}/send_message",
            "/api/v1/chat/ai-chat/",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
    }
}

pub mod bot;
pub mod commands;
pub mod files;

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "active_conversations": state.conversations.active_users(),
    }))
}

pub async fn main() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("GIC Assistant: Telegram claims-assessment bot is running.\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{call_and_read_body_json, init_service, TestRequest};
    use actix_web::App;
    use std::sync::Arc;

    use crate::state::ConversationStore;

    #[actix_web::test]
    async fn health_reports_active_conversations() {
        let store = Arc::new(ConversationStore::default());
        store.push_user(7, "xin chào");
        let state = web::Data::new(AppState::new(store, std::env::temp_dir()));

        let app = init_service(
            App::new()
                .app_data(state)
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["active_conversations"], 1);
    }
}

use actix_web::{web, HttpResponse};
use std::path::Component;
use std::path::Path;

use crate::state::AppState;

/// Generated reports are the only files exposed over HTTP; user uploads in
/// the same directory stay private.
const REPORT_PREFIX: &str = "report_";

pub async fn download_file(path: web::Path<String>, state: web::Data<AppState>) -> HttpResponse {
    let name = path.into_inner();
    if !is_report_name(&name) {
        return HttpResponse::NotFound().finish();
    }

    let full = state.media_dir.join(&name);
    match tokio::fs::read(&full).await {
        Ok(bytes) => HttpResponse::Ok()
            .append_header(("Content-Type", content_type(&name)))
            .append_header(("Content-Disposition", format!("attachment; filename=\"{}\"", name)))
            .body(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => HttpResponse::NotFound().finish(),
        Err(err) => {
            tracing::error!(file = %full.display(), error = %err, "failed to read report");
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn is_report_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && name.starts_with(REPORT_PREFIX)
}

fn content_type(name: &str) -> &'static str {
    if name.ends_with(".pdf") {
        "application/pdf"
    } else {
        "text/plain; charset=utf-8"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, read_body, TestRequest};
    use actix_web::App;
    use std::sync::Arc;

    use crate::state::ConversationStore;

    #[test]
    fn only_plain_report_names_pass() {
        assert!(is_report_name("report_42_1700000000.pdf"));
        assert!(is_report_name("report_42_1700000000.pdf.txt"));
        assert!(!is_report_name("42_abc.jpg"));
        assert!(!is_report_name("../report_1.pdf"));
        assert!(!is_report_name("report_1/../../etc/passwd"));
        assert!(!is_report_name(""));
    }

    #[actix_web::test]
    async fn serves_existing_report_and_hides_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report_1_1.pdf.txt"), "BÁO CÁO").unwrap();
        std::fs::write(dir.path().join("1_photo.jpg"), "jpeg").unwrap();

        let state = web::Data::new(AppState::new(
            Arc::new(ConversationStore::default()),
            dir.path().to_path_buf(),
        ));
        let app = init_service(
            App::new()
                .app_data(state)
                .route("/api/files/{name}", web::get().to(download_file)),
        )
        .await;

        let req = TestRequest::get().uri("/api/files/report_1_1.pdf.txt").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = read_body(resp).await;
        assert_eq!(body, "BÁO CÁO".as_bytes());

        for uri in ["/api/files/1_photo.jpg", "/api/files/report_missing.pdf"] {
            let req = TestRequest::get().uri(uri).to_request();
            let resp = call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }
}

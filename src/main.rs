mod config;
mod handlers;
mod i18n;
mod models;
mod services;
mod state;

use std::io;
use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::{web, App, HttpServer};
use tracing_subscriber::EnvFilter;

use config::Config;
use handlers::bot::{self, Collaborators, Dispatcher};
use services::media::MediaStore;
use services::ocr::TesseractCli;
use services::openai::OpenAiClient;
use services::report::ReportRenderer;
use services::telegram::TelegramBot;
use services::web::HttpFetcher;
use state::{AppState, ConversationStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    tokio::fs::create_dir_all(&config.media_dir).await?;
    let store = Arc::new(ConversationStore::new(config.history_capacity));

    let bot = Arc::new(TelegramBot::new(&config.telegram_token).map_err(io::Error::other)?);
    let dispatcher = Dispatcher::new(
        Arc::clone(&store),
        Collaborators {
            transport: bot.clone(),
            completion: Arc::new(OpenAiClient::new(&config).map_err(io::Error::other)?),
            ocr: Arc::new(TesseractCli::new(config.tesseract_bin.clone(), config.ocr_lang.clone())),
            fetcher: Arc::new(HttpFetcher::new(config.web_fetch_enabled).map_err(io::Error::other)?),
        },
        ReportRenderer::new(config.media_dir.clone(), config.watermark.clone()),
        MediaStore::new(config.media_dir.clone()),
    );

    tracing::info!(
        model = %config.openai_model,
        media_dir = %config.media_dir.display(),
        web_fetch = config.web_fetch_enabled,
        history_capacity = store.capacity(),
        "GIC Assistant starting"
    );
    actix_web::rt::spawn(bot::run_long_polling(bot, dispatcher));

    let app_state = web::Data::new(AppState::new(store, config.media_dir.clone()));
    HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .app_data(app_state.clone())
            .route("/", web::get().to(handlers::main))
            .route("/health", web::get().to(handlers::health_check))
            .route("/api/files/{name}", web::get().to(handlers::files::download_file))
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await
}

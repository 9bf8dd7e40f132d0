use std::sync::Arc;
use std::time::Duration;

use crate::handlers::commands::{self, TextCommand};
use crate::i18n::{self, Locale, Notice};
use crate::models::conversation::{
    EXTRACT_REQUEST_TAG, IMAGE_MARKER, OCR_TAG, PDF_TAG, PDF_TEXT_TAG, WEB_TAG,
};
use crate::models::{Inbound, InboundKind, PromptEnvelope, ReplyTarget};
use crate::services::documents;
use crate::services::media::MediaStore;
use crate::services::ocr::{OcrEngine, OcrOutcome};
use crate::services::openai::{CompletionClient, CompletionError, CHAT_MAX_TOKENS, REPORT_MAX_TOKENS};
use crate::services::report::{ReportRenderer, REPORT_TITLE};
use crate::services::telegram::{TelegramBot, Transport, TransportError};
use crate::services::web::{truncate_chars, FetchOutcome, WebFetcher};
use crate::state::{ConversationStore, UserId};

const PREVIEW_CHARS: usize = 800;
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

/// External services the dispatcher talks to.
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub completion: Arc<dyn CompletionClient>,
    pub ocr: Arc<dyn OcrEngine>,
    pub fetcher: Arc<dyn WebFetcher>,
}

pub struct Dispatcher {
    store: Arc<ConversationStore>,
    transport: Arc<dyn Transport>,
    completion: Arc<dyn CompletionClient>,
    ocr: Arc<dyn OcrEngine>,
    fetcher: Arc<dyn WebFetcher>,
    renderer: ReportRenderer,
    media: MediaStore,
}

impl Dispatcher {
    pub fn new(
        store: Arc<ConversationStore>,
        collaborators: Collaborators,
        renderer: ReportRenderer,
        media: MediaStore,
    ) -> Self {
        Self {
            store,
            transport: collaborators.transport,
            completion: collaborators.completion,
            ocr: collaborators.ocr,
            fetcher: collaborators.fetcher,
            renderer,
            media,
        }
    }

    #[tracing::instrument(skip_all, fields(user = inbound.user_id, chat = inbound.target.chat_id))]
    pub async fn handle(&self, inbound: Inbound) {
        self.store.ensure(inbound.user_id);
        match &inbound.kind {
            InboundKind::Photo { file_id } => self.handle_photo(&inbound, file_id).await,
            InboundKind::Document { file_id, file_name } => {
                self.handle_document(&inbound, file_id, file_name).await
            }
            InboundKind::Text(text) => self.handle_text(&inbound, text).await,
        }
    }

    async fn handle_photo(&self, inbound: &Inbound, file_id: &str) {
        let (user, locale, target) = (inbound.user_id, inbound.locale, inbound.target);

        let data = match self.download(file_id).await {
            Ok(data) => data,
            Err(err) => {
                tracing::error!(error = %err, "photo download failed");
                self.notify(target, locale, Notice::FileReceiveFailed).await;
                return;
            }
        };
        if let Err(err) = self.media.save_photo(user, file_id, &data).await {
            tracing::warn!(error = %err, "could not store photo, continuing with OCR");
        }
        self.notify(target, locale, Notice::PhotoSaved).await;

        match self.ocr.recognize(&data).await {
            OcrOutcome::Recognized(text) => {
                let preview = preview(&text, PREVIEW_CHARS);
                self.notify(target, locale, Notice::OcrPreview(&preview)).await;
                self.store.push_user(user, format!("{}{}", OCR_TAG, text));
            }
            OcrOutcome::NothingFound | OcrOutcome::Unavailable(_) => {
                self.store.push_user(user, IMAGE_MARKER);
            }
        }

        self.answer(user, locale, target, CHAT_MAX_TOKENS, Notice::AnalysisFailed).await;
    }

    async fn handle_document(&self, inbound: &Inbound, file_id: &str, file_name: &str) {
        let (user, locale, target) = (inbound.user_id, inbound.locale, inbound.target);

        let stored = match self.download(file_id).await {
            Ok(data) => self.media.save_document(user, file_id, file_name, &data).await.map_err(|e| e.to_string()),
            Err(err) => Err(err.to_string()),
        };
        let path = match stored {
            Ok(path) => path,
            Err(reason) => {
                tracing::error!(%reason, "document could not be received");
                self.notify(target, locale, Notice::FileReceiveFailed).await;
                return;
            }
        };

        self.notify(target, locale, Notice::DocumentSaved(file_name)).await;
        if file_name.to_lowercase().ends_with(".pdf") {
            self.notify(target, locale, Notice::ExtractHint).await;
            self.store.push_user(user, format!("{}{}", PDF_TAG, path.display()));
        }
    }

    async fn handle_text(&self, inbound: &Inbound, text: &str) {
        let (user, locale, target) = (inbound.user_id, inbound.locale, inbound.target);
        let command = commands::classify(text);
        tracing::debug!(?command, "text command");

        match command {
            TextCommand::Start => {
                self.store.reset(user);
                self.notify(target, locale, Notice::Greeting).await;
            }
            TextCommand::Fetch { url } => {
                self.notify(target, locale, Notice::Fetching(&url)).await;
                match self.fetcher.fetch(&url).await {
                    FetchOutcome::Snippet(snippet) => {
                        let shown = truncate_chars(&snippet, PREVIEW_CHARS);
                        self.notify(target, locale, Notice::FetchPreview(shown)).await;
                        self.store.push_user(user, format!("{}{}", WEB_TAG, snippet));
                    }
                    FetchOutcome::Disabled | FetchOutcome::Failed(_) => {
                        self.notify(target, locale, Notice::FetchEmpty).await;
                    }
                }
            }
            TextCommand::Extract { argument } => {
                self.notify(target, locale, Notice::ExtractStarted).await;
                self.store.push_user(user, format!("{}{}", EXTRACT_REQUEST_TAG, text.trim()));
                self.attach_pdf_text(user, &argument).await;
                self.answer(user, locale, target, CHAT_MAX_TOKENS, Notice::ExtractFailed).await;
            }
            TextCommand::Report => {
                self.notify(target, locale, Notice::ReportStarted).await;
                self.report(user, locale, target).await;
            }
            TextCommand::Chat => {
                self.store.push_user(user, text.trim());
                self.answer(user, locale, target, CHAT_MAX_TOKENS, Notice::ChatFailed).await;
            }
        }
    }

    async fn report(&self, user: UserId, locale: Locale, target: ReplyTarget) {
        let analysis = match self.respond(user, locale, REPORT_MAX_TOKENS).await {
            Ok(analysis) => analysis,
            Err(err) => {
                tracing::error!(error = %err, "completion failed for report");
                self.notify(target, locale, Notice::ReportFailed).await;
                return;
            }
        };

        match self.renderer.render(user, REPORT_TITLE, &analysis).await {
            Ok(report) => {
                tracing::info!(path = %report.path.display(), kind = ?report.kind, "report written");
                let location = report.path.display().to_string();
                self.notify(target, locale, Notice::ReportReady(&location)).await;
            }
            Err(err) => {
                tracing::error!(error = %err, "report rendering failed");
                self.notify(target, locale, Notice::ReportFailed).await;
            }
        }
    }

    /// Adds the text layer of the user's stored PDF to the history, if any.
    async fn attach_pdf_text(&self, user: UserId, hint: &str) {
        let path = match self.media.find_user_pdf(user, hint).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                tracing::debug!(%hint, "no stored PDF to extract");
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not look up stored PDFs");
                return;
            }
        };

        match documents::extract_pdf_text(&path).await {
            Ok(text) => self.store.push_user(user, format!("{}{}", PDF_TEXT_TAG, text)),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "PDF text extraction failed"),
        }
    }

    /// Runs completion and replies with the answer or `failure`.
    async fn answer(&self, user: UserId, locale: Locale, target: ReplyTarget, max_tokens: u32, failure: Notice<'_>) {
        match self.respond(user, locale, max_tokens).await {
            Ok(answer) => self.send(target, &answer).await,
            Err(err) => {
                tracing::error!(error = %err, "completion failed");
                self.notify(target, locale, failure).await;
            }
        }
    }

    /// Sends the system prompt plus the user's history to the model. The
    /// answer is recorded as an assistant turn; a failed call records nothing.
    pub async fn respond(&self, user: UserId, locale: Locale, max_tokens: u32) -> Result<String, CompletionError> {
        let envelope = PromptEnvelope::assemble(i18n::system_prompt(locale), self.store.snapshot(user));
        tracing::debug!(history = self.store.len(user), max_tokens, "requesting completion");
        let answer = self.completion.complete(&envelope, max_tokens).await?;
        self.store.push_assistant(user, answer.clone());
        Ok(answer)
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, TransportError> {
        let file_path = self.transport.get_file(file_id).await?;
        self.transport.download_file(&file_path).await
    }

    async fn notify(&self, target: ReplyTarget, locale: Locale, notice: Notice<'_>) {
        self.send(target, &i18n::notice(locale, notice)).await;
    }

    async fn send(&self, target: ReplyTarget, text: &str) {
        if let Err(err) = self.transport.reply(target, text).await {
            tracing::error!(error = %err, "failed to send reply");
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let shown = truncate_chars(text, max_chars);
    if shown.len() < text.len() {
        format!("{}...", shown)
    } else {
        shown.to_string()
    }
}

/// Pulls updates forever and handles them one at a time, in order.
pub async fn run_long_polling(bot: Arc<TelegramBot>, dispatcher: Dispatcher) {
    let mut offset = 0;
    tracing::info!("bot polling started");

    loop {
        let updates = match bot.get_updates(offset).await {
            Ok(updates) => updates,
            Err(err) => {
                tracing::error!(error = %err, "getUpdates failed");
                tokio::time::sleep(POLL_ERROR_PAUSE).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            match update.message.as_ref().and_then(Inbound::from_message) {
                Some(inbound) => dispatcher.handle(inbound).await,
                None => tracing::debug!(update_id = update.update_id, "ignoring update"),
            }
        }
    }
}

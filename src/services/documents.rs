use std::path::Path;

use thiserror::Error;

use crate::services::web::truncate_chars;

pub const MAX_EXTRACT_CHARS: usize = 3000;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("failed to extract PDF text: {0}")]
    Pdf(String),

    #[error("PDF contains no text layer")]
    NoText,

    #[error("extraction task panicked")]
    Join(#[from] tokio::task::JoinError),
}

/// Pulls the text layer out of a stored PDF, whitespace-normalised and
/// capped at [`MAX_EXTRACT_CHARS`].
pub async fn extract_pdf_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ExtractError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return Err(ExtractError::NoText);
    }
    Ok(truncate_chars(&text, MAX_EXTRACT_CHARS).to_string())
}

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const OCR_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    Recognized(String),
    NothingFound,
    /// The engine could not run; the reason is for logs only.
    Unavailable(String),
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> OcrOutcome;
}

/// Runs the `tesseract` CLI, feeding the image on stdin.
pub struct TesseractCli {
    binary: String,
    lang: String,
}

impl TesseractCli {
    pub fn new(binary: impl Into<String>, lang: impl Into<String>) -> Self {
        Self { binary: binary.into(), lang: lang.into() }
    }

    async fn run(&self, image: &[u8]) -> Result<String, String> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.lang])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("spawn {}: {}", self.binary, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await.map_err(|e| format!("write stdin: {}", e))?;
        }

        let output = tokio::time::timeout(OCR_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| format!("timed out after {}s", OCR_TIMEOUT.as_secs()))?
            .map_err(|e| format!("wait: {}", e))?;

        if !output.status.success() {
            return Err(format!(
                "exit {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize(&self, image: &[u8]) -> OcrOutcome {
        match self.run(image).await {
            Ok(text) if text.is_empty() => OcrOutcome::NothingFound,
            Ok(text) => OcrOutcome::Recognized(text),
            Err(reason) => {
                tracing::warn!(%reason, "OCR failed");
                OcrOutcome::Unavailable(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let engine = TesseractCli::new("/nonexistent/tesseract-binary", "vie");
        let outcome = engine.recognize(b"not an image").await;
        assert!(matches!(outcome, OcrOutcome::Unavailable(_)));
    }
}

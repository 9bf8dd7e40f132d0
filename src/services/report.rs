use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::state::UserId;

pub const REPORT_HEADER: &str = "BÁO CÁO GIÁM ĐỊNH - GIC Assistant";
pub const TEXT_REPORT_HEADER: &str = "BÁO CÁO GIÁM ĐỊNH";
pub const REPORT_TITLE: &str = "Báo cáo từ Bot";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Pdf,
    Text,
}

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub path: PathBuf,
    pub kind: ReportKind,
}

pub struct ReportRenderer {
    media_dir: PathBuf,
    watermark: String,
    pdf_enabled: bool,
}

impl ReportRenderer {
    /// Uses the PDF backend when the crate is built with it.
    pub fn new(media_dir: impl Into<PathBuf>, watermark: impl Into<String>) -> Self {
        Self {
            media_dir: media_dir.into(),
            watermark: watermark.into(),
            pdf_enabled: cfg!(feature = "pdf"),
        }
    }

    #[cfg(test)]
    pub fn text_only(media_dir: impl Into<PathBuf>, watermark: impl Into<String>) -> Self {
        Self { pdf_enabled: false, ..Self::new(media_dir, watermark) }
    }

    pub async fn render(&self, user: UserId, title: &str, content: &str) -> Result<RenderedReport, ReportError> {
        tokio::fs::create_dir_all(&self.media_dir).await?;
        let pdf_path = self
            .media_dir
            .join(format!("report_{}_{}.pdf", user, chrono::Utc::now().timestamp()));

        if self.pdf_enabled {
            match self.render_pdf(&pdf_path, user, title, content).await {
                Ok(()) => return Ok(RenderedReport { path: pdf_path, kind: ReportKind::Pdf }),
                Err(reason) => {
                    tracing::warn!(%reason, "PDF rendering failed, writing text report instead");
                }
            }
        }

        let mut txt_path = pdf_path.into_os_string();
        txt_path.push(".txt");
        let txt_path = PathBuf::from(txt_path);
        tokio::fs::write(&txt_path, self.plain_text(user, title, content)).await?;
        Ok(RenderedReport { path: txt_path, kind: ReportKind::Text })
    }

    fn plain_text(&self, user: UserId, title: &str, content: &str) -> String {
        format!(
            "{}\n\nNgười dùng: {}\nTiêu đề: {}\n\n{}\n\n{}",
            TEXT_REPORT_HEADER, user, title, content, self.watermark
        )
    }

    #[cfg(feature = "pdf")]
    async fn render_pdf(&self, path: &Path, user: UserId, title: &str, content: &str) -> Result<(), String> {
        let bytes = pdf::build(user, title, content, &self.watermark).map_err(|e| e.to_string())?;
        tokio::fs::write(path, bytes).await.map_err(|e| e.to_string())
    }

    #[cfg(not(feature = "pdf"))]
    async fn render_pdf(&self, _path: &Path, _user: UserId, _title: &str, _content: &str) -> Result<(), String> {
        Err("built without the pdf feature".to_string())
    }
}

/// Greedy word wrap; words wider than `width` are cut.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            out.push(word.into_iter().collect());
            word = rest;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || out.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(feature = "pdf")]
mod pdf {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, ObjectId, Stream};

    use super::{wrap_line, REPORT_HEADER};
    use crate::state::UserId;

    const PAGE_WIDTH: i64 = 595;
    const PAGE_HEIGHT: i64 = 842;
    const MARGIN_X: f32 = 50.0;
    const PAGE_TOP: f32 = 800.0;
    const BODY_TOP: f32 = 740.0;
    const BOTTOM_LIMIT: f32 = 80.0;
    const LEADING: f32 = 14.0;
    const WRAP_CHARS: usize = 95;

    const BOLD: &str = "F1";
    const REGULAR: &str = "F2";
    const OBLIQUE: &str = "F3";

    pub fn build(user: UserId, title: &str, content: &str, watermark: &str) -> Result<Vec<u8>, lopdf::Error> {
        let pages = layout(user, title, content, watermark);

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let bold_id = add_font(&mut doc, "Helvetica-Bold");
        let regular_id = add_font(&mut doc, "Helvetica");
        let oblique_id = add_font(&mut doc, "Helvetica-Oblique");
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                BOLD => bold_id,
                REGULAR => regular_id,
                OBLIQUE => oblique_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for operations in pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buf = Vec::new();
        doc.save_to(&mut buf)?;
        Ok(buf)
    }

    fn add_font(doc: &mut Document, base_font: &str) -> ObjectId {
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base_font,
            "Encoding" => "WinAnsiEncoding",
        })
    }

    /// One operation list per page. A page is closed only when another line
    /// needs room, so the document never ends on a blank page.
    fn layout(user: UserId, title: &str, content: &str, watermark: &str) -> Vec<Vec<Operation>> {
        let mut pages = Vec::new();
        let mut ops = Vec::new();
        text_at(&mut ops, BOLD, 14.0, MARGIN_X, PAGE_TOP, REPORT_HEADER);
        text_at(&mut ops, REGULAR, 10.0, MARGIN_X, 780.0, &format!("Người dùng Telegram ID: {}", user));
        text_at(&mut ops, REGULAR, 10.0, MARGIN_X, 760.0, &format!("Tiêu đề: {}", title));

        let mut y = BODY_TOP;
        for line in content.lines().flat_map(|l| wrap_line(l, WRAP_CHARS)) {
            if y < BOTTOM_LIMIT {
                text_at(&mut ops, OBLIQUE, 8.0, MARGIN_X, 30.0, watermark);
                pages.push(std::mem::take(&mut ops));
                y = PAGE_TOP;
            }
            if !line.is_empty() {
                text_at(&mut ops, REGULAR, 10.0, MARGIN_X, y, &line);
            }
            y -= LEADING;
        }

        text_at(&mut ops, OBLIQUE, 8.0, MARGIN_X, 30.0, watermark);
        pages.push(ops);
        pages
    }

    fn text_at(ops: &mut Vec<Operation>, font: &str, size: f32, x: f32, y: f32, text: &str) {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
        ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        ops.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]));
        ops.push(Operation::new("ET", vec![]));
    }

    /// Vietnamese letters outside Latin-1, folded to the nearest letter the
    /// standard fonts can draw.
    const VIETNAMESE_FOLD: &[(&str, char)] = &[
        ("ảạăẳặ", 'a'),
        ("ằ", 'à'),
        ("ắ", 'á'),
        ("ẵ", 'ã'),
        ("ầẩẫấậ", 'â'),
        ("ẻẽẹ", 'e'),
        ("ềểễếệ", 'ê'),
        ("ỉĩị", 'i'),
        ("ỏọơởợ", 'o'),
        ("ồổỗốộ", 'ô'),
        ("ờ", 'ò'),
        ("ớ", 'ó'),
        ("ỡ", 'õ'),
        ("ủũụưửữự", 'u'),
        ("ừ", 'ù'),
        ("ứ", 'ú'),
        ("ỳỷỹỵ", 'y'),
        ("đ", 'd'),
    ];

    /// The standard 14 fonts only cover WinAnsi. Latin-1 maps straight
    /// through, Vietnamese letters are folded and everything else becomes `?`.
    pub(super) fn win_ansi(text: &str) -> Vec<u8> {
        text.chars()
            .map(|c| latin1(c).or_else(|| fold(c).and_then(latin1)).unwrap_or(b'?'))
            .collect()
    }

    fn latin1(c: char) -> Option<u8> {
        match u32::from(c) {
            code @ (0x20..=0x7e | 0xa0..=0xff) => Some(code as u8),
            _ => None,
        }
    }

    fn fold(c: char) -> Option<char> {
        let upper = c.is_uppercase();
        let lower = c.to_lowercase().next()?;
        let folded = VIETNAMESE_FOLD
            .iter()
            .find(|(letters, _)| letters.contains(lower))
            .map(|(_, base)| *base)?;
        if upper {
            folded.to_uppercase().next()
        } else {
            Some(folded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_single(dir: &Path) -> (PathBuf, Vec<u8>) {
        let mut entries = tokio::fs::read_dir(dir).await.unwrap();
        let entry = entries.next_entry().await.unwrap().expect("one artifact");
        assert!(entries.next_entry().await.unwrap().is_none());
        let bytes = tokio::fs::read(entry.path()).await.unwrap();
        (entry.path(), bytes)
    }

    #[tokio::test]
    async fn text_fallback_contains_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ReportRenderer::text_only(dir.path(), "Mr.P 0922372220");

        let content = "Nguyên nhân: va chạm phía sau.\nMức độ lỗi: 100% xe B.";
        let report = renderer.render(4242, "Báo cáo từ Bot", content).await.unwrap();

        assert_eq!(report.kind, ReportKind::Text);
        let name = report.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("report_4242_"), "{}", name);
        assert!(name.ends_with(".pdf.txt"), "{}", name);

        let text = tokio::fs::read_to_string(&report.path).await.unwrap();
        assert!(text.starts_with(TEXT_REPORT_HEADER));
        assert!(text.contains("4242"));
        assert!(text.contains("Báo cáo từ Bot"));
        assert!(text.contains(content));
        assert!(text.ends_with("Mr.P 0922372220"));
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_line("mot hai ba bon nam", 7);
        assert_eq!(lines, vec!["mot hai", "ba bon", "nam"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 7));
    }

    #[test]
    fn wrap_cuts_long_words_and_keeps_blank_lines() {
        assert_eq!(wrap_line("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_line("", 10), vec![String::new()]);
    }

    #[cfg(feature = "pdf")]
    #[tokio::test]
    async fn pdf_paginates_long_content() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ReportRenderer::new(dir.path(), "WM");
        let content: Vec<String> = (1..=200).map(|i| format!("Dòng {}", i)).collect();

        let report = renderer.render(1, REPORT_TITLE, &content.join("\n")).await.unwrap();
        assert_eq!(report.kind, ReportKind::Pdf);

        let (_, bytes) = read_single(dir.path()).await;
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 4);
    }

    #[cfg(feature = "pdf")]
    #[tokio::test]
    async fn short_pdf_is_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ReportRenderer::new(dir.path(), "WM");

        renderer.render(1, REPORT_TITLE, "ngắn").await.unwrap();

        let (path, bytes) = read_single(dir.path()).await;
        assert_eq!(path.extension().unwrap(), "pdf");
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn win_ansi_folds_vietnamese_letters() {
        // "Tiêu đề"
        assert_eq!(pdf::win_ansi("Ti\u{ea}u \u{111}\u{1ec1}"), b"Ti\xeau d\xea".to_vec());
        // "GIÁM ĐỊNH"
        assert_eq!(pdf::win_ansi("GI\u{c1}M \u{110}\u{1eca}NH"), b"GI\xc1M DINH".to_vec());
        // "Người dùng"
        assert_eq!(pdf::win_ansi("Ng\u{1b0}\u{1edd}i d\u{f9}ng"), b"Ngu\xf2i d\xf9ng".to_vec());
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn win_ansi_replaces_unmappable_chars() {
        assert_eq!(pdf::win_ansi("x \u{6f22} \u{1f697}"), b"x ? ?".to_vec());
    }
}

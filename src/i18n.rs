use std::borrow::Cow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Vi,
    En,
}

impl Locale {
    /// Telegram's `language_code` is an IETF tag; anything not English stays Vietnamese.
    pub fn from_language_code(code: Option<&str>) -> Locale {
        match code.map(|c| c.to_ascii_lowercase()) {
            Some(c) if c == "en" || c.starts_with("en-") => Locale::En,
            _ => Locale::Vi,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice<'a> {
    Greeting,
    PhotoSaved,
    OcrPreview(&'a str),
    AnalysisFailed,
    DocumentSaved(&'a str),
    ExtractHint,
    FileReceiveFailed,
    Fetching(&'a str),
    FetchPreview(&'a str),
    FetchEmpty,
    ExtractStarted,
    ExtractFailed,
    ReportStarted,
    ReportReady(&'a str),
    ReportFailed,
    ChatFailed,
}

pub fn notice(locale: Locale, notice: Notice<'_>) -> Cow<'static, str> {
    match (locale, notice) {
        (Locale::Vi, Notice::Greeting) => Cow::Borrowed(
            "Chào! Gửi ảnh hiện trường, PDF biên bản hoặc mô tả vụ việc để tôi phân tích. Gõ 'tạo báo cáo' để xuất PDF.",
        ),
        (Locale::En, Notice::Greeting) => Cow::Borrowed(
            "Hi! Send scene photos, a PDF record or a description of the incident and I will analyse it. Type 'tạo báo cáo' to export a PDF report.",
        ),
        (Locale::Vi, Notice::PhotoSaved) => Cow::Borrowed("Ảnh đã lưu, đang chạy OCR (Tiếng Việt)..."),
        (Locale::En, Notice::PhotoSaved) => Cow::Borrowed("Photo saved, running OCR (Vietnamese)..."),
        (Locale::Vi, Notice::OcrPreview(text)) => Cow::Owned(format!("OCR phát hiện văn bản (rút gọn):\n{}", text)),
        (Locale::En, Notice::OcrPreview(text)) => Cow::Owned(format!("OCR found text (shortened):\n{}", text)),
        (Locale::Vi, Notice::AnalysisFailed) => Cow::Borrowed("Lỗi khi phân tích. Thử lại sau."),
        (Locale::En, Notice::AnalysisFailed) => Cow::Borrowed("Analysis failed. Please try again later."),
        (Locale::Vi, Notice::DocumentSaved(name)) => Cow::Owned(format!("Đã lưu tài liệu: {}", name)),
        (Locale::En, Notice::DocumentSaved(name)) => Cow::Owned(format!("Document saved: {}", name)),
        (Locale::Vi, Notice::ExtractHint) => Cow::Borrowed(
            "Nếu cần trích xuất nội dung, gửi lệnh: trich xuat <đường dẫn hoặc tên file>.",
        ),
        (Locale::En, Notice::ExtractHint) => Cow::Borrowed(
            "To extract its content, send: trich xuat <path or file name>.",
        ),
        (Locale::Vi, Notice::FileReceiveFailed) => Cow::Borrowed("Không nhận được tệp. Thử gửi lại."),
        (Locale::En, Notice::FileReceiveFailed) => Cow::Borrowed("Could not receive the file. Please send it again."),
        (Locale::Vi, Notice::Fetching(url)) => Cow::Owned(format!("Đang fetch nội dung từ: {} (nếu chức năng bật)", url)),
        (Locale::En, Notice::Fetching(url)) => Cow::Owned(format!("Fetching content from: {} (if enabled)", url)),
        (Locale::Vi, Notice::FetchPreview(text)) => Cow::Owned(format!("Trích xuất nội dung (rút gọn):\n{}", text)),
        (Locale::En, Notice::FetchPreview(text)) => Cow::Owned(format!("Fetched content (shortened):\n{}", text)),
        (Locale::Vi, Notice::FetchEmpty) => Cow::Borrowed(
            "Không lấy được nội dung. Chức năng crawl có thể tắt hoặc URL không cho phép.",
        ),
        (Locale::En, Notice::FetchEmpty) => Cow::Borrowed(
            "No content retrieved. Fetching may be disabled or the URL is not allowed.",
        ),
        (Locale::Vi, Notice::ExtractStarted) => Cow::Borrowed("Bắt đầu trích xuất PDF (nếu có)."),
        (Locale::En, Notice::ExtractStarted) => Cow::Borrowed("Starting PDF extraction (if any)."),
        (Locale::Vi, Notice::ExtractFailed) => Cow::Borrowed("Lỗi khi trích xuất."),
        (Locale::En, Notice::ExtractFailed) => Cow::Borrowed("Extraction failed."),
        (Locale::Vi, Notice::ReportStarted) => Cow::Borrowed("Đang tạo báo cáo PDF..."),
        (Locale::En, Notice::ReportStarted) => Cow::Borrowed("Generating PDF report..."),
        (Locale::Vi, Notice::ReportReady(path)) => Cow::Owned(format!("Báo cáo tạo xong: {}", path)),
        (Locale::En, Notice::ReportReady(path)) => Cow::Owned(format!("Report ready: {}", path)),
        (Locale::Vi, Notice::ReportFailed) => Cow::Borrowed("Lỗi khi tạo báo cáo."),
        (Locale::En, Notice::ReportFailed) => Cow::Borrowed("Report generation failed."),
        (Locale::Vi, Notice::ChatFailed) => Cow::Borrowed("Lỗi khi gọi AI. Thử lại sau."),
        (Locale::En, Notice::ChatFailed) => Cow::Borrowed("The AI call failed. Please try again later."),
    }
}

pub fn system_prompt(locale: Locale) -> &'static str {
    match locale {
        Locale::Vi => {
            "Bạn là trợ lý chuyên gia giám định bảo hiểm xe cơ giới cho Mr.P. \
             Trả lời ngắn gọn, chính xác, nêu nguyên nhân, mức độ lỗi, tài liệu cần thu thập, và bước xử lý tiếp theo. \
             Sử dụng tiếng Việt. Trả lời thẳng, không vòng vo."
        }
        Locale::En => {
            "You are an expert motor-insurance claims assessment assistant for Mr.P. \
             Answer briefly and precisely: state the cause, the degree of fault, the documents to collect and the next processing step. \
             Answer in English. Be direct."
        }
    }
}

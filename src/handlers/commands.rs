//! Text command classification.
//!
//! Rules are checked in table order and the first match wins. Matching is
//! case-insensitive on the trimmed message.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCommand {
    Start,
    Fetch { url: String },
    Extract { argument: String },
    Report,
    Chat,
}

type Rule = (fn(&str) -> bool, fn(&str, &str) -> TextCommand);

const FETCH_PREFIX: &str = "fetch ";
const EXTRACT_PREFIXES: [&str; 2] = ["trich xuat", "trích xuất"];
// Covers "tạo báo cáo" anywhere in the text, and also any conversational
// mention of "báo cáo".
const REPORT_WORD: &str = "báo cáo";

const RULES: &[Rule] = &[
    (is_start, start),
    (is_fetch, fetch),
    (is_extract, extract),
    (is_report, report),
];

pub fn classify(text: &str) -> TextCommand {
    let original = text.trim();
    let lower = original.to_lowercase();
    RULES
        .iter()
        .find(|(matches, _)| matches(&lower))
        .map(|(_, build)| build(original, &lower))
        .unwrap_or(TextCommand::Chat)
}

fn is_start(lower: &str) -> bool {
    let command = lower.split_whitespace().next().unwrap_or("");
    command == "/start" || command.starts_with("/start@")
}

fn is_fetch(lower: &str) -> bool {
    lower.starts_with(FETCH_PREFIX) && !lower[FETCH_PREFIX.len()..].trim().is_empty()
}

fn is_extract(lower: &str) -> bool {
    EXTRACT_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn is_report(lower: &str) -> bool {
    lower.contains(REPORT_WORD)
}

fn start(_: &str, _: &str) -> TextCommand {
    TextCommand::Start
}

fn fetch(original: &str, _: &str) -> TextCommand {
    TextCommand::Fetch { url: after_prefix(original, FETCH_PREFIX) }
}

fn extract(original: &str, lower: &str) -> TextCommand {
    let argument = EXTRACT_PREFIXES
        .iter()
        .find(|p| lower.starts_with(*p))
        .map(|p| after_prefix(original, p))
        .unwrap_or_default();
    TextCommand::Extract { argument }
}

fn report(_: &str, _: &str) -> TextCommand {
    TextCommand::Report
}

/// Whatever follows `prefix`, in its original case. Lowercasing can change
/// byte lengths, so the prefix is skipped by chars.
fn after_prefix(original: &str, prefix: &str) -> String {
    original
        .char_indices()
        .nth(prefix.chars().count())
        .map(|(idx, _)| original[idx..].trim().to_string())
        .unwrap_or_default()
}

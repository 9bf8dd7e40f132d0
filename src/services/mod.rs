pub mod documents;
pub mod media;
pub mod ocr;
pub mod openai;
pub mod report;
pub mod telegram;
pub mod web;

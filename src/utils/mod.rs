pub mod content_guard;
pub mod mistral;
pub mod pdf;
pub mod spreadsheet;

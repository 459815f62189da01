//! Job-notice extraction: heuristics, the AI pass, and report assembly.

pub mod analyzer;
pub mod batch;
pub mod dates;
pub mod last_date;
pub mod organization;
pub mod prompt;
pub mod record;
pub mod report;
pub mod response;

pub mod analyze_batch_tool;
pub mod analyze_single_tool;
pub mod last_date_tool;

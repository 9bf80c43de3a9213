pub mod interview;
pub mod report;
pub mod resume;

pub mod core;
pub mod course;
pub mod grading;

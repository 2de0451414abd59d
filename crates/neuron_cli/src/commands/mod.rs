pub mod import;
pub mod mix;
pub mod review;
pub mod show;

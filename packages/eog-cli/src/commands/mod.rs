pub mod analyze;
pub mod batch;
pub mod info;
pub mod protocol;
pub mod stimulus;

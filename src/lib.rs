pub mod conversion;
pub mod format;

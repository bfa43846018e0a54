pub mod image_processor;
pub mod image_upload;
pub mod records;
pub mod storage;

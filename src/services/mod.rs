pub mod descriptor_store;
pub mod excel;
pub mod file_processor;

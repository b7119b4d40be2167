pub mod features;
pub mod field_data;

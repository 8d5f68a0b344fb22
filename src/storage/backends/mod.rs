pub mod file;
pub mod memory;
pub mod sea_orm;

pub mod blob;
pub mod export;

pub mod client;
pub mod download;
pub mod items;
pub mod types;

pub use client::{EdgarClient, EdgarEndpoints};
pub use download::download_document;

pub mod app_state;
pub mod config;
pub mod entities;
pub mod extractor;
pub mod fetcher;
pub mod pipeline;
pub mod repositories;
pub mod scheduler;
pub mod source_scraper;
pub mod status;

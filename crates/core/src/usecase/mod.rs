pub mod app_service;
pub mod downloader;
pub mod monitor;
pub mod uploader;

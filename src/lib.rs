pub mod analyzer;
pub mod answers;
pub mod app;
pub mod capture;
pub mod dispatcher;
pub mod listener;
pub mod logging;
pub mod models;
pub mod popup;
pub mod relay;
pub mod request;
pub mod settings;
pub mod tray;
pub mod worker;

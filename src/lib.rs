pub mod adaptive;
pub mod app;
pub mod capability;
pub mod config;
pub mod feed;
pub mod field;
pub mod fps;
pub mod fusion;
pub mod gesture;
pub mod mailbox;
pub mod modes;
pub mod render;
pub mod session;
pub mod settings;
pub mod terminal;

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod format;
pub mod settings;
pub mod state;
pub mod terminal;
pub mod tool_preview;
pub mod transcript;
pub mod types;
pub mod ui;
pub mod util;

#[cfg(test)]
mod test_support;

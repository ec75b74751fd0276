pub mod app;
mod executor;
pub mod logging;
pub mod printout;
pub mod qr;

use iced::Application;

pub use app::{FicheDeskApp, Flags};
pub use logging::{apply_log_level, init_logging, LogEntry, LogLevel, LogStore, ReloadHandle};

pub type UiResult = iced::Result;

pub fn run(flags: Flags) -> UiResult {
    FicheDeskApp::run(iced::Settings::with_flags(flags))
}

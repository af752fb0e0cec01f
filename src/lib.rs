// Library surface for headless/integration tests and reuse.
// main.rs only wires the terminal, logging and config around `app::App`.
pub mod app;
pub mod app_dirs;
pub mod celebration;
pub mod config;
pub mod diagnostic;
pub mod feedback;
pub mod opponent;
pub mod room;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod timer;
pub mod ui;
pub mod vocabulary;
pub mod wire;

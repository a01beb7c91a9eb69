//! Headless browser sessions for client-side rendered pages.

pub mod config;
pub mod session;

pub use config::{EnvProbe, RuntimeEnvironment, SessionConfig, SystemEnv};
pub use session::{BrowserLauncher, BrowserProcess, ChromiumLauncher, PageHandle, Session, SessionManager};

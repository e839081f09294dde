pub mod aggregate;
pub mod app;
pub mod calendar;
pub mod config;
pub mod constants;
pub mod error;
pub mod jpx;
pub mod logging;
pub mod merge;
pub mod models;
pub mod session;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use config::Config;
pub use error::{Error, Result};
pub use session::AnalysisSession;

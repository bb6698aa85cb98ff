pub mod app_config;
pub mod logging;
pub mod queue;
pub mod storage;
pub mod worker;

pub use app_config::*;
pub use logging::*;
pub use queue::*;
pub use storage::*;
pub use worker::*;

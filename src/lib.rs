pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;

pub use config::MonitorConfig;
pub use error::{MonitorError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::MonitorConfig;
    pub use crate::error::{MonitorError, Result};
    pub use crate::monitor::{
        CallKind, CallMonitor, CallStatus, MonitoringEvent, NullRecorder, Recorder,
        ToolCallStatus, TraceSink,
    };
}

//! Configuration consumed by the test runner when it is launched by the build driver.

pub use config::{
    API_VERSION_PROPERTY, ConfigError, EXTERNAL_SECURITY_MANAGER_PROPERTY,
    INSTALL_SECURITY_MANAGER_PROPERTY, RunnerConfig, SUPPORTED_API_VERSION,
};
pub use properties::Properties;

mod config;
mod properties;

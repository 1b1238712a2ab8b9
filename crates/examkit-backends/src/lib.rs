//! examkit-backends — Content and grading backends.
//!
//! Implements the `ContentBackend` and `GradingBackend` traits for a hosted
//! REST service, an offline exam directory, and a scripted mock for tests.

pub mod config;
pub mod error;
pub mod http;
pub mod local;
pub mod mock;

pub use config::{create_backend, load_config, load_config_from, Backend, BackendConfig, ExamkitConfig};
pub use error::BackendError;
pub use http::HttpBackend;
pub use local::LocalBackend;
pub use mock::{MockBackend, Scripted};

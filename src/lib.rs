//! CAC TAT scenario runner
//!
//! Executes end-to-end scenarios against the "Central de Atendimento ao
//! Cliente TAT" contact form: typing, selecting, toggling, file uploads,
//! assertions with bounded retry, a simulated clock for the auto-hiding
//! banners, and one-shot HTTP probes of the published page.

pub mod cli;
pub mod clock;
pub mod commands;
pub mod common;
pub mod dom;
pub mod driver;
pub mod fixtures;
pub mod http;
pub mod site;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use driver::simulated::SimulatedBrowser;
pub use driver::Driver;
pub use site::Site;

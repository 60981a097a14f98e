pub mod cmd;
pub mod conf;

mod controller;
pub use controller::*;
mod global;
pub use global::*;
mod metrics;
pub use metrics::*;
mod probe;
pub use probe::*;

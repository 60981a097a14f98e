mod action;
pub use action::*;
mod error;
pub use error::*;
mod filter;
pub use filter::*;
mod http;
pub use http::*;
mod options;
pub use options::*;
mod result;
pub use result::*;

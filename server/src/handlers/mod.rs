//! Push and pull handlers, independent of the HTTP extractors.

mod pull;
mod push;

pub use pull::handle_pull;
pub use push::handle_push;

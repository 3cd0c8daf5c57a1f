//! CLI commands.

pub mod ping;
pub mod status;
pub mod whoami;

pub use ping::ping;
pub use status::status;
pub use whoami::whoami;

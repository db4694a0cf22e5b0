//! Command-line entry point for the panel server.
//!
//! `initialize` loads settings, applies flag overrides and starts the
//! coordinator, the hardware listener and the HTTP server:
//!
//! ```text
//! +----------+     +-----------+     +--------------------+
//! | Args     | --> | bootstrap | --> | ServerContext      |
//! | (clap)   |     | (settings)|     |  coordinator       |
//! +----------+     +-----------+     |  listener (panel)  |
//!                                    |  HTTP server       |
//!                                    |  round log         |
//!                                    +--------------------+
//! ```

mod args;
mod bootstrap;

pub use args::Args;
pub use bootstrap::{build_generator, init_logging, initialize, load_settings, ServerContext};

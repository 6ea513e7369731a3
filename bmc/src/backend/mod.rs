//! Backend manifest emitters
//!
//! A backend consumes the fully-reduced MIR entry block together with the
//! persistent state and writes a build manifest for an external executor.

mod ninja;

pub use ninja::NinjaBackend;

use crate::error::Result;
use crate::mir::{Mir, Persistent};

/// A build manifest emitter
pub trait Backend {
    /// Backend name; the manifest is written to `build.<name>`
    fn name(&self) -> &'static str;

    /// Write the manifest into the build root
    fn generate(&self, mir: &Mir, state: &Persistent) -> Result<()>;
}

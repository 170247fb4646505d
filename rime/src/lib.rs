//! rimebridge
//!
//! Native half of the session bridge: binds the input-method engine's
//! shared library at runtime, marshals its C-structured results through
//! release-on-drop guards, and plugs into the engine-agnostic command
//! surface from `rimebridge-core`.
//!
//! ```no_run
//! use rimebridge::NativeEngine;
//! use rimebridge_core::{Bridge, BridgeOptions, Traits};
//!
//! fn main() -> Result<(), rimebridge_core::BridgeError> {
//!     let engine = NativeEngine::load(None)?;
//!     let bridge = Bridge::init(engine, BridgeOptions::default(), &Traits::new())?;
//!     let session = bridge.create_session();
//!     bridge.process_key(session, 'n' as i32, 0);
//!     if let Some(context) = bridge.context(session) {
//!         println!("{}", context.composition.preedit);
//!     }
//!     bridge.destroy_session(session);
//!     bridge.finalize();
//!     Ok(())
//! }
//! ```

pub mod ffi;

pub mod guard;
pub use guard::{CommitGuard, ConfigGuard, ContextGuard, SchemaListGuard};

pub mod engine;
pub use engine::NativeEngine;

//! Local input driver implementations.
//!
//! - [`headless::VirtualScreenDriver`] keeps a virtual cursor on a virtual
//!   screen and logs every click.  The shipped binary uses it.
//! - [`mock::RecordingInputDriver`] records calls for tests.

pub mod headless;
pub mod mock;

pub use headless::VirtualScreenDriver;
pub use mock::RecordingInputDriver;

//! Business logic services.
//!
//! Services own domain state and depend on the cast traits rather than
//! concrete transports, so they can be exercised with mocks.

pub mod session_coordinator;

pub use session_coordinator::SessionCoordinator;

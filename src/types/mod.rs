//! Core type definitions using newtype patterns for type safety.
//!
//! These types prevent common logic errors by making invalid states unrepresentable
//! at compile time.

mod port;
mod session;
mod target;

pub use port::{Port, PortEntry, PortError, PortSpec, Scheme, DEFAULT_PORT_SPEC, TLS_MARKER};
pub use session::{SessionName, SessionNameError};
pub use target::{Hosts, NetworkRange, Target, TargetError, TargetIter, Targets};

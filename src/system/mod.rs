//! # System Interaction Layer
//!
//! Boundary between the chain logic and the outside world.
//!
//! ## Modules
//!
//! - **`lookup`**: the `LookupService` seam and its HTTP implementation, which queries the
//!   backend lookup route and decodes `{ data: [{ actualvalue, displayvalue }] }` bodies.

pub mod lookup;

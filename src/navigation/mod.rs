//! Screen navigation.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`NavigationController`] | push / pop / pop-to / modal / replace state machine |
//! | [`NavigationHistory`] | Ordered list of open [`Screen`]s |
//! | [`RouteResolver`] | `(controller, page)` to [`ScreenDescriptor`] |
//! | [`RouteTable`] | JSON-configured resolver |
//! | [`ScreenHost`] | Host callbacks opening and closing screens |

// ============================================================================
// Submodules
// ============================================================================

/// Navigation state machine.
pub mod controller;

/// Screen history.
pub mod history;

/// Route resolution.
pub mod routes;

// ============================================================================
// Re-exports
// ============================================================================

pub use controller::{ModalOrigin, NavigationController, ScreenHost, Transition};
pub use history::{NavigationHistory, Screen};
pub use routes::{ControllerConfig, DEFAULT_CONTROLLER, RouteResolver, RouteTable, ScreenDescriptor};

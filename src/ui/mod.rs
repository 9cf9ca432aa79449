//! User interface: terminal drawing and keyboard handling.
//!
//! - **renderer**: crossterm presenter (grid, status line, text pages)
//! - **router**: key routing to player keys and game-control commands
//! - **form**: status-line editors for the join and chat forms
//! - **help**: paged help tables
//!
//! The router and the forms are mutually exclusive keyboard owners: while
//! a form is open the router is in form-focus mode and routes nothing.

pub mod form;
pub mod help;
pub mod renderer;
pub mod router;

pub use form::{Form, FormKind, FormOutcome};
pub use help::HelpPager;
pub use renderer::{TerminalUi, UiPresenter};
pub use router::{GameCommand, KeyRouter, RoutedKey};

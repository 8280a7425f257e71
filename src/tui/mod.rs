//! TUI Module - form deck in the terminal
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ header: counts, submit status, gateway       │
//! ├──────────────────────────────────────────────┤
//! │ form cards (scrolls with the selection)      │
//! ├──────────────────────────────────────────────┤
//! │ footer: latest notice or key hints           │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The app owns the [`FormSession`] and feeds it both key commands and
//! async completions from one task.

mod app;
mod events;
mod state;
mod theme;

pub use app::TuiApp;
pub use theme::HyperspaceTheme;

use crate::session::FormSession;

/// Run the TUI until the user quits
pub async fn run(session: FormSession) -> anyhow::Result<()> {
    TuiApp::new(session).run().await
}

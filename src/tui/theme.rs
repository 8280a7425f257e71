//! Hyperspace Theme - Visual Design System
//!
//! Space violet/blue + amber/gold palette, reused for the form cards.

use ratatui::style::{Color, Modifier, Style};

use crate::container::SubmitStatus;
use crate::model::NoticeLevel;

/// Hyperspace color palette
pub struct HyperspaceTheme {
    // Primary palette
    pub space_violet: Color,
    pub amber_gold: Color,
    pub cyan_teal: Color,
    pub star_white: Color,

    // Status colors
    pub success_green: Color,
    pub warning_orange: Color,
    pub error_red: Color,

    pub dim_violet: Color,
}

impl Default for HyperspaceTheme {
    fn default() -> Self {
        Self {
            space_violet: Color::Rgb(138, 43, 226), // #8A2BE2
            amber_gold: Color::Rgb(255, 191, 0),    // #FFBF00
            cyan_teal: Color::Rgb(0, 255, 255),     // #00FFFF
            star_white: Color::Rgb(230, 237, 243),  // #E6EDF3

            success_green: Color::Rgb(63, 185, 80),   // #3FB950
            warning_orange: Color::Rgb(210, 153, 34), // #D29922
            error_red: Color::Rgb(248, 81, 73),       // #F85149

            dim_violet: Color::Rgb(88, 28, 143),
        }
    }
}

impl HyperspaceTheme {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Styles
    // ─────────────────────────────────────────────────────────────────────

    /// Default text style
    pub fn text(&self) -> Style {
        Style::default().fg(self.star_white)
    }

    /// Dimmed text style
    pub fn dimmed(&self) -> Style {
        Style::default().fg(Color::Rgb(128, 128, 128))
    }

    /// Bold header style
    pub fn header(&self) -> Style {
        Style::default()
            .fg(self.space_violet)
            .add_modifier(Modifier::BOLD)
    }

    /// Accent style (amber)
    pub fn accent(&self) -> Style {
        Style::default().fg(self.amber_gold)
    }

    /// Highlight style (cyan)
    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.cyan_teal)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success(&self) -> Style {
        Style::default().fg(self.success_green)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning_orange)
    }

    pub fn error(&self) -> Style {
        Style::default()
            .fg(self.error_red)
            .add_modifier(Modifier::BOLD)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Form cards
    // ─────────────────────────────────────────────────────────────────────

    /// Card border: selected cards glow, invalid ones go dim violet
    pub fn card_border(&self, selected: bool, valid: bool) -> Style {
        match (selected, valid) {
            (true, _) => self.highlight(),
            (false, true) => Style::default().fg(self.success_green),
            (false, false) => Style::default().fg(self.dim_violet),
        }
    }

    pub fn status_style(&self, status: SubmitStatus) -> Style {
        match status {
            SubmitStatus::Idle => self.dimmed(),
            SubmitStatus::CountingDown { .. } => self.warning(),
            SubmitStatus::Submitting => self.accent(),
        }
    }

    pub fn notice_style(&self, level: NoticeLevel) -> Style {
        match level {
            NoticeLevel::Info => self.success(),
            NoticeLevel::Error => self.error(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Icons and Symbols
// ─────────────────────────────────────────────────────────────────────────────

pub mod icons {
    pub const APP: &str = "◉";
    pub const VALID: &str = "✓";
    pub const INVALID: &str = "✗";
    pub const CHECKING: &str = "⟳";
    pub const CURSOR: &str = "▏";
}

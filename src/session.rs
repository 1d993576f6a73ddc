//! Process-wide session context
//!
//! Explicit state for the signed-in identity and the theme flag. Loaded once
//! at startup and passed by reference into components; sign-out clears the
//! identity so callers can drop derived view state with it.

use serde::{Deserialize, Serialize};

/// Visual theme. Band geometry is identical across themes; only colors differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Light
    }
}

/// Session state for the single active user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<String>,
    pub theme: Theme,
}

impl Session {
    /// Load the initial session from the environment
    pub fn load_from_env() -> Self {
        let user = std::env::var("LABSENSE_USER").ok().filter(|u| !u.is_empty());
        let theme = std::env::var("LABSENSE_THEME")
            .ok()
            .and_then(|t| Theme::from_str(&t))
            .unwrap_or_default();
        Self { user, theme }
    }

    pub fn sign_in(&mut self, email: String) {
        self.user = Some(email);
    }

    /// Clear the active identity. Callers are responsible for dropping any
    /// derived view state (current analysis, composed report, plans).
    pub fn sign_out(&mut self) {
        self.user = None;
    }

    pub fn active_user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_and_out() {
        let mut session = Session {
            user: None,
            theme: Theme::Light,
        };
        session.sign_in("robert@example.com".to_string());
        assert_eq!(session.active_user(), Some("robert@example.com"));
        session.sign_out();
        assert_eq!(session.active_user(), None);
        // theme survives sign-out
        assert_eq!(session.theme, Theme::Light);
    }

    #[test]
    fn test_theme_from_str() {
        assert_eq!(Theme::from_str("dark"), Some(Theme::Dark));
        assert_eq!(Theme::from_str("Light"), Some(Theme::Light));
        assert_eq!(Theme::from_str("sepia"), None);
    }
}

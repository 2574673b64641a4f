//! UI capability adapter for automatable meeting clients.
//!
//! Everything volatile about driving a meeting UI — which selector finds the
//! mute button this month, which of two layouts the pre-join screen renders —
//! lives behind [`MeetingUi`]. The session controller only sees semantic
//! operations and the three-way error taxonomy in [`UiError`].

pub mod meet;
pub mod webdriver;

pub use meet::MeetUi;
pub use webdriver::WebDriverClient;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UiError {
    /// The probed control is absent. Expected and non-fatal for optional
    /// controls (dialogs that only render sometimes, shortcuts for
    /// already-authenticated sessions).
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The control exists but interacting with it errored. Retryable.
    #[error("action failed on {control}: {reason}")]
    ActionFailed { control: String, reason: String },

    /// Browser or driver-level failure. Not retryable; the session fails.
    #[error("driver failure: {0}")]
    Driver(String),
}

impl UiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, UiError::ElementNotFound(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, UiError::Driver(_))
    }
}

/// Ways to locate a semantic control. Each control carries an ordered list
/// of these; the adapter tries them all before reporting absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Css(String),
    XPath(String),
    /// Element whose `aria-label` equals the given value.
    AriaLabel(String),
    /// Button/span containing the given visible text.
    Text(String),
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Selector::XPath(value.into())
    }

    pub fn aria_label(value: impl Into<String>) -> Self {
        Selector::AriaLabel(value.into())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Selector::Text(value.into())
    }

    /// WebDriver location strategy and selector value.
    pub fn to_strategy(&self) -> (&'static str, String) {
        match self {
            Selector::Css(css) => ("css selector", css.clone()),
            Selector::XPath(xpath) => ("xpath", xpath.clone()),
            Selector::AriaLabel(label) => {
                ("css selector", format!("[aria-label=\"{}\"]", label))
            }
            Selector::Text(text) => (
                "xpath",
                format!("//*[self::button or self::span][contains(text(), \"{}\")]", text),
            ),
        }
    }
}

/// One on-screen caption region: the speaker it is attributed to and the
/// text currently rendered for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionSlot {
    pub speaker: String,
    pub text: String,
}

/// Provider-agnostic meeting UI operations.
///
/// Every operation either succeeds, reports [`UiError::ElementNotFound`]
/// (absence of the probed control), or reports a retryable/fatal failure.
/// Trying multiple known layouts for the same control is the implementor's
/// job and never surfaces to callers.
#[async_trait]
pub trait MeetingUi: Send {
    /// Launch the browser session. Fatal on failure.
    async fn start(&mut self) -> Result<(), UiError>;

    async fn open_link(&mut self, url: &str) -> Result<(), UiError>;

    async fn grant_media_permissions(&mut self) -> Result<(), UiError>;

    /// Dismiss a blocking dialog (e.g. a "got it" popup) if one is showing.
    async fn dismiss_blocking_dialog(&mut self) -> Result<(), UiError>;

    async fn set_microphone_muted(&mut self, muted: bool) -> Result<(), UiError>;

    async fn set_camera_muted(&mut self, muted: bool) -> Result<(), UiError>;

    async fn enter_display_name(&mut self, name: &str) -> Result<(), UiError>;

    async fn click_join(&mut self) -> Result<(), UiError>;

    /// Whether the host has let the bot into the call.
    async fn is_admitted(&mut self) -> Result<bool, UiError>;

    async fn enable_captions(&mut self) -> Result<(), UiError>;

    /// All currently rendered caption slots.
    async fn read_visible_captions(&mut self) -> Result<Vec<CaptionSlot>, UiError>;

    /// Whether the meeting has ended (host closed the call, bot removed).
    async fn meeting_ended(&mut self) -> Result<bool, UiError>;

    /// Tear down the browser session. Called on every terminal path.
    async fn shutdown(&mut self) -> Result<(), UiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_strategies() {
        let (using, value) = Selector::css(".a4cQT .nMcdL").to_strategy();
        assert_eq!(using, "css selector");
        assert_eq!(value, ".a4cQT .nMcdL");

        let (using, value) = Selector::aria_label("Turn off microphone").to_strategy();
        assert_eq!(using, "css selector");
        assert_eq!(value, "[aria-label=\"Turn off microphone\"]");

        let (using, value) = Selector::text("Join now").to_strategy();
        assert_eq!(using, "xpath");
        assert!(value.contains("Join now"));
    }

    #[test]
    fn test_error_classification() {
        assert!(UiError::ElementNotFound("popup".into()).is_not_found());
        assert!(!UiError::ElementNotFound("popup".into()).is_fatal());
        assert!(UiError::Driver("browser crashed".into()).is_fatal());
        let action = UiError::ActionFailed {
            control: "join button".into(),
            reason: "stale element".into(),
        };
        assert!(!action.is_not_found());
        assert!(!action.is_fatal());
    }
}

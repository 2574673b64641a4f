//! Google-Meet-flavored implementation of the meeting UI adapter.
//!
//! Each semantic control carries an ordered list of selector variants; the
//! probe walks the list and only reports absence after every variant missed.
//! Meet ships layout changes often enough that most controls need at least
//! two variants (obfuscated class names plus a stable aria-label or visible
//! text fallback).

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::BrowserConfig;

use super::webdriver::{ElementId, WebDriverClient};
use super::{CaptionSlot, MeetingUi, Selector, UiError};

/// Caption region container and its speaker/text child nodes.
const CAPTION_SLOT_CSS: &str = ".a4cQT .nMcdL";
const CAPTION_SPEAKER_CSS: &str = ".KcIKyf";
const CAPTION_TEXT_CSS: &str = ".bh44bd";

pub struct MeetUi {
    driver: WebDriverClient,
    chrome_args: Vec<String>,
}

impl MeetUi {
    pub fn new(config: &BrowserConfig) -> Self {
        let mut chrome_args = vec![
            "--use-fake-ui-for-media-stream".to_string(),
            "--use-fake-device-for-media-stream".to_string(),
            format!("--window-size={}", config.window_size),
            "--no-sandbox".to_string(),
            "--disable-gpu".to_string(),
            "--disable-extensions".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
        ];
        if config.headless {
            chrome_args.push("--headless=new".to_string());
        }
        chrome_args.extend(config.extra_args.iter().cloned());

        Self {
            driver: WebDriverClient::new(config.webdriver_url.clone()),
            chrome_args,
        }
    }

    /// Try each selector variant in order; absence is only reported after
    /// the whole list missed. Variant fallback stays invisible to callers.
    async fn probe(
        &self,
        control: &str,
        variants: &[Selector],
    ) -> Result<Option<ElementId>, UiError> {
        for selector in variants {
            let (using, value) = selector.to_strategy();
            if let Some(element) = self.driver.find(using, &value).await? {
                return Ok(Some(element));
            }
        }
        debug!("control '{}' not present in any known layout", control);
        Ok(None)
    }

    async fn probe_required(
        &self,
        control: &str,
        variants: &[Selector],
    ) -> Result<ElementId, UiError> {
        self.probe(control, variants)
            .await?
            .ok_or_else(|| UiError::ElementNotFound(control.to_string()))
    }

    async fn click_control(&self, control: &str, variants: &[Selector]) -> Result<(), UiError> {
        let element = self.probe_required(control, variants).await?;
        self.driver.click(&element).await.map_err(|e| match e {
            UiError::Driver(reason) => UiError::Driver(reason),
            other => UiError::ActionFailed {
                control: control.to_string(),
                reason: other.to_string(),
            },
        })
    }

    /// Toggle buttons expose their target action via aria-label, so muting a
    /// device means clicking "Turn off X" — if only "Turn on X" exists the
    /// device is already muted and there is nothing to do.
    async fn set_device_muted(&self, device: &str, muted: bool) -> Result<(), UiError> {
        let wanted = if muted { "off" } else { "on" };
        let opposite = if muted { "on" } else { "off" };

        let variants = [
            Selector::aria_label(format!("Turn {} {}", wanted, device)),
            Selector::xpath(format!("//div[@aria-label='Turn {} {}']", wanted, device)),
        ];

        match self.click_control(&format!("{} toggle", device), &variants).await {
            Ok(()) => Ok(()),
            Err(UiError::ElementNotFound(control)) => {
                // Already in the wanted state?
                let already = [Selector::aria_label(format!(
                    "Turn {} {}",
                    opposite, device
                ))];
                if self.probe(&control, &already).await?.is_some() {
                    debug!("{} already muted={}", device, muted);
                    Ok(())
                } else {
                    Err(UiError::ElementNotFound(control))
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl MeetingUi for MeetUi {
    async fn start(&mut self) -> Result<(), UiError> {
        self.driver.start_session(&self.chrome_args).await
    }

    async fn open_link(&mut self, url: &str) -> Result<(), UiError> {
        self.driver.goto(url).await
    }

    async fn grant_media_permissions(&mut self) -> Result<(), UiError> {
        // The fake-media-stream switches already suppress the prompt. A
        // driver that rejects the permissions call is reported as the prompt
        // being absent, which the controller skips past.
        for permission in ["microphone", "camera"] {
            if let Err(e) = self.driver.set_permission(permission, "granted").await {
                if e.is_fatal() {
                    return Err(e);
                }
                return Err(UiError::ElementNotFound(format!(
                    "{} permission prompt",
                    permission
                )));
            }
        }
        Ok(())
    }

    async fn dismiss_blocking_dialog(&mut self) -> Result<(), UiError> {
        self.click_control(
            "blocking dialog",
            &[
                Selector::text("Got it"),
                Selector::css("button.UywwFc-LgbsSe.UywwFc-LgbsSe-OWXEXe-dgl2Hf.IMT1Gf"),
                Selector::text("Dismiss"),
            ],
        )
        .await
    }

    async fn set_microphone_muted(&mut self, muted: bool) -> Result<(), UiError> {
        self.set_device_muted("microphone", muted).await
    }

    async fn set_camera_muted(&mut self, muted: bool) -> Result<(), UiError> {
        self.set_device_muted("camera", muted).await
    }

    async fn enter_display_name(&mut self, name: &str) -> Result<(), UiError> {
        let field = self
            .probe_required(
                "display name field",
                &[
                    Selector::css("input[placeholder=\"Your name\"]"),
                    Selector::css(
                        "div.qdOxv-fmcmS-yrriRe.qdOxv-fmcmS-yrriRe-OWXEXe-INsAgc input[type=\"text\"]",
                    ),
                ],
            )
            .await?;

        self.driver
            .send_keys(&field, name)
            .await
            .map_err(|e| match e {
                UiError::Driver(reason) => UiError::Driver(reason),
                other => UiError::ActionFailed {
                    control: "display name field".to_string(),
                    reason: other.to_string(),
                },
            })
    }

    async fn click_join(&mut self) -> Result<(), UiError> {
        self.click_control(
            "join button",
            &[
                Selector::xpath("//span[contains(text(), 'Join now')]/ancestor::button"),
                Selector::xpath("//span[contains(text(), 'Ask to join')]/ancestor::button"),
                Selector::text("Join now"),
            ],
        )
        .await
    }

    async fn is_admitted(&mut self) -> Result<bool, UiError> {
        // Still in the lobby while the "asking to be let in" banner renders.
        let waiting = [
            Selector::xpath("//*[contains(text(), \"Asking to be let in\")]"),
            Selector::xpath("//*[contains(text(), \"You can't join this call\")]"),
        ];
        if self.probe("lobby banner", &waiting).await?.is_some() {
            return Ok(false);
        }

        // In-call chrome only exists once admitted.
        let in_call = [
            Selector::aria_label("Leave call"),
            Selector::css("button[aria-label=\"Turn on captions\"]"),
            Selector::css("button[aria-label=\"Turn off captions\"]"),
        ];
        Ok(self.probe("in-call controls", &in_call).await?.is_some())
    }

    async fn enable_captions(&mut self) -> Result<(), UiError> {
        let button = self
            .probe_required(
                "captions button",
                &[
                    Selector::css("button[aria-label=\"Turn on captions\"]"),
                    Selector::css("button[aria-label=\"Turn off captions\"]"),
                ],
            )
            .await?;

        // aria-pressed tracks caption state; only click when still off.
        let pressed = self.driver.attribute(&button, "aria-pressed").await?;
        if pressed.as_deref() == Some("false") {
            self.driver.click(&button).await.map_err(|e| match e {
                UiError::Driver(reason) => UiError::Driver(reason),
                other => UiError::ActionFailed {
                    control: "captions button".to_string(),
                    reason: other.to_string(),
                },
            })?;
        }
        Ok(())
    }

    async fn read_visible_captions(&mut self) -> Result<Vec<CaptionSlot>, UiError> {
        let slots = self.driver.find_all("css selector", CAPTION_SLOT_CSS).await?;

        let mut captions = Vec::with_capacity(slots.len());
        for slot in slots {
            let speaker = match self
                .driver
                .find_in(&slot, "css selector", CAPTION_SPEAKER_CSS)
                .await?
            {
                Some(el) => self.driver.text(&el).await?,
                None => continue, // slot mid-render, pick it up next tick
            };
            let text = match self
                .driver
                .find_in(&slot, "css selector", CAPTION_TEXT_CSS)
                .await?
            {
                Some(el) => self.driver.text(&el).await?,
                None => continue,
            };
            if speaker.trim().is_empty() || text.trim().is_empty() {
                continue;
            }
            captions.push(CaptionSlot { speaker, text });
        }
        Ok(captions)
    }

    async fn meeting_ended(&mut self) -> Result<bool, UiError> {
        let ended = [
            Selector::xpath("//*[contains(text(), 'Return to home screen')]"),
            Selector::xpath("//*[contains(text(), \"You've been removed\")]"),
            Selector::xpath("//*[contains(text(), 'The call ended')]"),
        ];
        Ok(self.probe("call ended screen", &ended).await?.is_some())
    }

    async fn shutdown(&mut self) -> Result<(), UiError> {
        if let Err(e) = self.driver.delete_session().await {
            warn!("Failed to delete WebDriver session: {}", e);
        }
        Ok(())
    }
}

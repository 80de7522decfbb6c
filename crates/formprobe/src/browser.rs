//! Chromium-backed form driver.
//!
//! Controls a real browser over the Chrome `DevTools` Protocol. Fields are
//! located by their `data-test-id` container; a field is flagged invalid
//! when its container carries the invalid marker class.
//!
//! Only the configuration types are available without the `browser` feature.

use crate::contract::FieldId;
use std::path::PathBuf;

/// Default address of the order form under test
pub const DEFAULT_BASE_URL: &str = "http://localhost:9999";

/// CSS locators for the order form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSelectors {
    /// Attribute naming each field's container
    pub test_id_attribute: String,
    /// Class marking a container as invalid
    pub invalid_class: String,
    /// Submit control
    pub submit: String,
    /// Success indicator, any match counts
    pub success: String,
    /// Count only rendered invalid containers; by default any flagged
    /// container in the document counts
    pub invalid_visible_only: bool,
}

impl Default for FormSelectors {
    fn default() -> Self {
        Self {
            test_id_attribute: "data-test-id".to_string(),
            invalid_class: "input_invalid".to_string(),
            submit: "button[type='submit'], button.button".to_string(),
            success: "[data-test-id='success'], [data-test-id='order-success'], \
                      [data-test-id='notification'].notification_status_ok"
                .to_string(),
            invalid_visible_only: false,
        }
    }
}

impl FormSelectors {
    /// Container of a field
    #[must_use]
    pub fn container(&self, field: FieldId) -> String {
        format!("[{}='{field}']", self.test_id_attribute)
    }

    /// Editable control inside a text field's container
    #[must_use]
    pub fn input(&self, field: FieldId) -> String {
        let container = self.container(field);
        format!("{container} input, {container} textarea, {container} select")
    }

    /// Agreement checkbox
    #[must_use]
    pub fn checkbox(&self) -> String {
        format!("{} input[type='checkbox']", self.container(FieldId::Agreement))
    }

    /// Every container currently flagged invalid
    #[must_use]
    pub fn invalid(&self) -> String {
        format!("[{}].{}", self.test_id_attribute, self.invalid_class)
    }
}

/// Chromium launch configuration
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    /// Page holding the order form
    pub base_url: String,
    /// Run without a visible window
    pub headless: bool,
    /// Chromium sandbox (disable in containers)
    pub sandbox: bool,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<PathBuf>,
    /// Window width
    pub viewport_width: u32,
    /// Window height
    pub viewport_height: u32,
    /// Form locators
    pub selectors: FormSelectors,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: true,
            sandbox: true,
            chromium_path: None,
            viewport_width: 1280,
            viewport_height: 800,
            selectors: FormSelectors::default(),
        }
    }
}

impl ChromiumConfig {
    /// Create a config for the form at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Replace the form locators
    #[must_use]
    pub fn with_selectors(mut self, selectors: FormSelectors) -> Self {
        self.selectors = selectors;
        self
    }
}

/// Script returning the test ids of every flagged container
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn invalid_fields_script(selectors: &FormSelectors) -> String {
    let query = serde_json::to_string(&selectors.invalid()).unwrap_or_default();
    let attribute = serde_json::to_string(&selectors.test_id_attribute).unwrap_or_default();
    let visible = if selectors.invalid_visible_only {
        ".filter(el => el.getClientRects().length > 0)"
    } else {
        ""
    };
    format!(
        "Array.from(document.querySelectorAll({query})){visible}\
         .map(el => el.getAttribute({attribute}) || '')"
    )
}

/// Script returning the visible success text as a zero- or one-element array
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn success_text_script(selectors: &FormSelectors) -> String {
    let query = serde_json::to_string(&selectors.success).unwrap_or_default();
    format!(
        "(() => {{ \
           const el = Array.from(document.querySelectorAll({query}))\
             .find(e => e.getClientRects().length > 0); \
           return el ? [el.innerText] : []; \
         }})()"
    )
}

/// Script returning the agreement checkbox state as a zero- or one-element array
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn checkbox_state_script(selectors: &FormSelectors) -> String {
    let query = serde_json::to_string(&selectors.checkbox()).unwrap_or_default();
    format!("(() => {{ const el = document.querySelector({query}); return el ? [el.checked] : []; }})()")
}

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc)]
mod cdp {
    use super::{checkbox_state_script, invalid_fields_script, success_text_script, ChromiumConfig, FormSelectors};
    use crate::contract::FieldId;
    use crate::driver::{DriverFactory, FormDriver};
    use crate::result::{FormError, FormResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use std::collections::BTreeSet;
    use std::fmt;
    use tracing::{debug, warn};

    fn cdp_error(e: impl fmt::Display) -> FormError {
        FormError::driver(e.to_string())
    }

    /// Launches one isolated browser per scenario
    #[derive(Debug, Clone)]
    pub struct ChromiumFactory {
        config: ChromiumConfig,
    }

    impl ChromiumFactory {
        /// Create a factory
        #[must_use]
        pub const fn new(config: ChromiumConfig) -> Self {
            Self { config }
        }

        /// Get configuration
        #[must_use]
        pub const fn config(&self) -> &ChromiumConfig {
            &self.config
        }
    }

    #[async_trait]
    impl DriverFactory for ChromiumFactory {
        type Driver = ChromiumFormDriver;

        async fn acquire(&self) -> FormResult<ChromiumFormDriver> {
            ChromiumFormDriver::launch(&self.config).await
        }
    }

    /// Form driver with a real CDP connection
    pub struct ChromiumFormDriver {
        browser: Browser,
        page: Page,
        handler: tokio::task::JoinHandle<()>,
        selectors: FormSelectors,
        released: bool,
    }

    impl fmt::Debug for ChromiumFormDriver {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("ChromiumFormDriver")
                .field("selectors", &self.selectors)
                .field("released", &self.released)
                .finish_non_exhaustive()
        }
    }

    impl ChromiumFormDriver {
        /// Launch chromium and open the form
        pub async fn launch(config: &ChromiumConfig) -> FormResult<Self> {
            let mut builder = BrowserConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .arg("--disable-dev-shm-usage");

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder.build().map_err(FormError::unavailable)?;

            let (mut browser, mut handler) = Browser::launch(cdp_config)
                .await
                .map_err(|e| FormError::unavailable(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = match browser.new_page(config.base_url.as_str()).await {
                Ok(page) => page,
                Err(e) => {
                    let _ = browser.close().await;
                    handler.abort();
                    return Err(FormError::unavailable(format!(
                        "cannot open {}: {e}",
                        config.base_url
                    )));
                }
            };
            debug!(url = %config.base_url, "form page opened");

            Ok(Self {
                browser,
                page,
                handler,
                selectors: config.selectors.clone(),
                released: false,
            })
        }

        fn ensure_live(&self) -> FormResult<()> {
            if self.released {
                Err(FormError::driver("browser already released"))
            } else {
                Ok(())
            }
        }

        async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: String) -> FormResult<T> {
            self.page
                .evaluate(script)
                .await
                .map_err(cdp_error)?
                .into_value()
                .map_err(cdp_error)
        }
    }

    #[async_trait]
    impl FormDriver for ChromiumFormDriver {
        async fn set_field_value(&mut self, field: FieldId, value: &str) -> FormResult<()> {
            self.ensure_live()?;
            if !field.is_text() {
                return Err(FormError::driver(format!("'{field}' has no text input")));
            }
            let input = self
                .page
                .find_element(self.selectors.input(field))
                .await
                .map_err(cdp_error)?;
            let _ = input
                .call_js_fn("function() { this.focus(); this.select(); }", false)
                .await
                .map_err(cdp_error)?;
            let _ = input.press_key("Backspace").await.map_err(cdp_error)?;
            if !value.is_empty() {
                let _ = self
                    .page
                    .execute(InsertTextParams::new(value))
                    .await
                    .map_err(cdp_error)?;
            }
            Ok(())
        }

        async fn set_agreement(&mut self, checked: bool) -> FormResult<()> {
            self.ensure_live()?;
            let current: Vec<bool> = self.evaluate(checkbox_state_script(&self.selectors)).await?;
            match current.first().copied() {
                None => Err(FormError::driver("agreement checkbox not found")),
                Some(state) if state == checked => Ok(()),
                Some(_) => {
                    let container = self
                        .page
                        .find_element(self.selectors.container(FieldId::Agreement))
                        .await
                        .map_err(cdp_error)?;
                    let _ = container.click().await.map_err(cdp_error)?;
                    Ok(())
                }
            }
        }

        async fn submit(&mut self) -> FormResult<()> {
            self.ensure_live()?;
            let button = self
                .page
                .find_element(self.selectors.submit.as_str())
                .await
                .map_err(cdp_error)?;
            let _ = button.click().await.map_err(cdp_error)?;
            Ok(())
        }

        async fn observe_invalid_fields(&mut self) -> FormResult<BTreeSet<FieldId>> {
            self.ensure_live()?;
            let ids: Vec<String> = self.evaluate(invalid_fields_script(&self.selectors)).await?;
            ids.iter()
                .filter(|id| !id.is_empty())
                .map(|id| id.parse::<FieldId>())
                .collect()
        }

        async fn observe_success(&mut self) -> FormResult<Option<String>> {
            self.ensure_live()?;
            let texts: Vec<String> = self.evaluate(success_text_script(&self.selectors)).await?;
            Ok(texts.into_iter().next())
        }

        async fn release(&mut self) -> FormResult<()> {
            if self.released {
                return Ok(());
            }
            self.released = true;
            let closed = self.browser.close().await;
            let _ = self.browser.wait().await;
            self.handler.abort();
            if let Err(e) = closed {
                warn!(error = %e, "browser did not close cleanly");
                return Err(FormError::unavailable(e.to_string()));
            }
            Ok(())
        }

        fn backend(&self) -> &'static str {
            "chromium"
        }
    }

    impl Drop for ChromiumFormDriver {
        fn drop(&mut self) {
            if !self.released {
                self.handler.abort();
            }
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumFactory, ChromiumFormDriver};

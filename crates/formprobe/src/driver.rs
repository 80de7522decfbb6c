//! FormDriver - Abstract Form Automation Trait
//!
//! The runner never touches a browser directly. It talks to a [`FormDriver`],
//! which executes mutations against the rendered form and reports what the
//! target currently shows.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  FormDriver (Abstract Trait)                                   │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────┐       │
//! │  │  ChromiumFormDriver │        │  MockFormDriver     │       │
//! │  │  (feature browser)  │        │  (unit tests, CI)   │       │
//! │  │  CDP via            │        │  In-memory form     │       │
//! │  │  chromiumoxide      │        │  + fault injection  │       │
//! │  └─────────────────────┘        └─────────────────────┘       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! A driver instance is scoped to exactly one scenario run. Drivers are
//! obtained from a [`DriverFactory`] and released with
//! [`FormDriver::release`] on every exit path.

use crate::contract::{FieldId, ValidationContract, ValidationOutcome, SUCCESS_MESSAGE};
use crate::result::{FormError, FormResult};
use crate::state::FormState;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Capability set the runner needs from a form backend
#[async_trait]
pub trait FormDriver: Send {
    /// Replace a text field's current content
    async fn set_field_value(&mut self, field: FieldId, value: &str) -> FormResult<()>;

    /// Set the agreement checkbox (no-op if already in that state)
    async fn set_agreement(&mut self, checked: bool) -> FormResult<()>;

    /// Trigger form submission
    async fn submit(&mut self) -> FormResult<()>;

    /// Fields currently flagged invalid
    async fn observe_invalid_fields(&mut self) -> FormResult<BTreeSet<FieldId>>;

    /// Success message text, if the success indicator is visible
    async fn observe_success(&mut self) -> FormResult<Option<String>>;

    /// Release the underlying resource (browser session, ...)
    async fn release(&mut self) -> FormResult<()>;

    /// Backend name for logging
    fn backend(&self) -> &'static str;
}

/// Source of fresh, independent drivers
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Driver type produced
    type Driver: FormDriver;

    /// Acquire a driver for one scenario run
    async fn acquire(&self) -> FormResult<Self::Driver>;
}

/// Behaviour knobs for [`MockFormDriver`]
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// Rules the simulated target applies on submit
    pub contract: ValidationContract,
    /// Text rendered on successful submission
    pub success_message: String,
    /// Observations after a submit that see nothing rendered yet
    pub settle_polls: u32,
    /// Never render anything after submit
    pub never_settle: bool,
    /// Flag every failing field instead of only the first
    pub flag_every_invalid: bool,
    /// Make `release` fail
    pub fail_release: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            contract: ValidationContract::standard(),
            success_message: SUCCESS_MESSAGE.to_string(),
            settle_polls: 0,
            never_settle: false,
            flag_every_invalid: false,
            fail_release: false,
        }
    }
}

impl MockBehavior {
    /// A correctly behaving target
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay rendering by a number of observations
    #[must_use]
    pub const fn with_settle_polls(mut self, polls: u32) -> Self {
        self.settle_polls = polls;
        self
    }

    /// Never render a result
    #[must_use]
    pub const fn never_settling(mut self) -> Self {
        self.never_settle = true;
        self
    }

    /// Flag all failing fields at once
    #[must_use]
    pub const fn flagging_every_invalid(mut self) -> Self {
        self.flag_every_invalid = true;
        self
    }

    /// Render a different success message
    #[must_use]
    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = message.into();
        self
    }

    /// Use a different rule set
    #[must_use]
    pub fn with_contract(mut self, contract: ValidationContract) -> Self {
        self.contract = contract;
        self
    }

    /// Fail on release
    #[must_use]
    pub const fn failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rendered {
    Pristine,
    Invalid(BTreeSet<FieldId>),
    Success,
}

/// In-memory form target for unit testing
#[derive(Debug)]
pub struct MockFormDriver {
    behavior: MockBehavior,
    form: FormState,
    rendered: Rendered,
    pending_polls: u32,
    released: bool,
    call_history: Vec<String>,
    release_counter: Option<Arc<AtomicUsize>>,
}

impl Default for MockFormDriver {
    fn default() -> Self {
        Self::new(MockBehavior::default())
    }
}

impl MockFormDriver {
    /// Create a mock target
    #[must_use]
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            form: FormState::new(),
            rendered: Rendered::Pristine,
            pending_polls: 0,
            released: false,
            call_history: Vec::new(),
            release_counter: None,
        }
    }

    /// Current simulated form content
    #[must_use]
    pub const fn form(&self) -> &FormState {
        &self.form
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    /// Whether `release` has been called
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    fn record(&mut self, call: String) -> FormResult<()> {
        self.call_history.push(call);
        if self.released {
            return Err(FormError::driver("mock driver already released"));
        }
        Ok(())
    }

    /// Returns true while a submit has not rendered yet
    fn settling(&mut self) -> bool {
        if self.behavior.never_settle {
            return true;
        }
        if self.pending_polls > 0 {
            self.pending_polls -= 1;
            return true;
        }
        false
    }
}

#[async_trait]
impl FormDriver for MockFormDriver {
    async fn set_field_value(&mut self, field: FieldId, value: &str) -> FormResult<()> {
        self.record(format!("set_field_value:{field}={value}"))?;
        if !field.is_text() {
            return Err(FormError::driver(format!("'{field}' has no text input")));
        }
        self.form.set_field(field, value);
        Ok(())
    }

    async fn set_agreement(&mut self, checked: bool) -> FormResult<()> {
        self.record(format!("set_agreement:{checked}"))?;
        self.form.set_agreement(checked);
        Ok(())
    }

    async fn submit(&mut self) -> FormResult<()> {
        self.record("submit".to_string())?;
        let contract = &self.behavior.contract;
        self.rendered = match contract.first_invalid(&self.form) {
            ValidationOutcome::AllValid => Rendered::Success,
            ValidationOutcome::FirstInvalid(_) if self.behavior.flag_every_invalid => {
                Rendered::Invalid(contract.invalid_fields(&self.form).into_iter().collect())
            }
            ValidationOutcome::FirstInvalid(field) => Rendered::Invalid(BTreeSet::from([field])),
        };
        self.pending_polls = self.behavior.settle_polls;
        Ok(())
    }

    async fn observe_invalid_fields(&mut self) -> FormResult<BTreeSet<FieldId>> {
        self.record("observe_invalid_fields".to_string())?;
        if self.settling() {
            return Ok(BTreeSet::new());
        }
        Ok(match &self.rendered {
            Rendered::Invalid(fields) => fields.clone(),
            Rendered::Pristine | Rendered::Success => BTreeSet::new(),
        })
    }

    async fn observe_success(&mut self) -> FormResult<Option<String>> {
        self.record("observe_success".to_string())?;
        if self.settling() {
            return Ok(None);
        }
        Ok(match self.rendered {
            Rendered::Success => Some(self.behavior.success_message.clone()),
            Rendered::Pristine | Rendered::Invalid(_) => None,
        })
    }

    async fn release(&mut self) -> FormResult<()> {
        self.call_history.push("release".to_string());
        self.released = true;
        if let Some(counter) = &self.release_counter {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
        }
        if self.behavior.fail_release {
            return Err(FormError::unavailable("mock release failure"));
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mock"
    }
}

/// Factory handing out [`MockFormDriver`]s and counting their lifecycle
#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    behavior: MockBehavior,
    fail_acquire: bool,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl MockFactory {
    /// Create a factory for drivers with the given behaviour
    #[must_use]
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    /// Make every acquire fail
    #[must_use]
    pub const fn failing_acquire(mut self) -> Self {
        self.fail_acquire = true;
        self
    }

    /// Drivers handed out so far
    #[must_use]
    pub fn acquired_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Drivers released so far
    #[must_use]
    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriverFactory for MockFactory {
    type Driver = MockFormDriver;

    async fn acquire(&self) -> FormResult<MockFormDriver> {
        if self.fail_acquire {
            return Err(FormError::unavailable("mock acquire failure"));
        }
        let _ = self.acquired.fetch_add(1, Ordering::SeqCst);
        let mut driver = MockFormDriver::new(self.behavior.clone());
        driver.release_counter = Some(Arc::clone(&self.released));
        Ok(driver)
    }
}

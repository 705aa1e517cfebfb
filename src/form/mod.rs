//! Client-side form state for resource screens.
//!
//! A [`ResourceForm`] moves Idle -> Validating -> Submitting -> Idle. Failed
//! validation returns to Idle without calling the submit callback; a finished
//! submission always returns to Idle whether it succeeded or not.

pub mod loader;
pub mod page;

use std::collections::BTreeMap;
use std::future::Future;

use crate::client::ClientError;
use crate::resource::Validate;

pub use loader::{LoadState, ResourceLoader};
pub use page::{PageOutcome, ResourcePage};

/// Field name -> message.
pub type FieldErrors = BTreeMap<String, String>;

pub trait FormModel: Validate + Clone + Send + 'static {
    /// Assigns a raw input value. Returns `false` for unknown fields.
    fn set_field(&mut self, field: &str, value: &str) -> bool;

    fn field_errors(&self) -> FieldErrors {
        match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(err) => FieldErrors::from([(err.field.to_string(), err.message)]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Idle,
    Validating,
    Submitting,
}

/// What happens to an error returned by the submit callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitErrorPolicy {
    /// Keep the message on the form for display.
    #[default]
    Store,
    /// Hand the error back to the caller.
    Propagate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome<O> {
    /// Validation failed; nothing was sent.
    Invalid,
    Submitted(O),
    /// The callback failed and the message was stored on the form.
    Failed(String),
}

pub struct ResourceForm<T> {
    form_data: T,
    form_errors: FieldErrors,
    phase: FormPhase,
    submit_error: Option<String>,
    policy: SubmitErrorPolicy,
}

impl<T: FormModel> ResourceForm<T> {
    pub fn new(initial: T) -> Self {
        Self {
            form_data: initial,
            form_errors: FieldErrors::new(),
            phase: FormPhase::Idle,
            submit_error: None,
            policy: SubmitErrorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SubmitErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn form_data(&self) -> &T {
        &self.form_data
    }

    pub fn form_errors(&self) -> &FieldErrors {
        &self.form_errors
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == FormPhase::Submitting
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    /// Updates one field and clears any error recorded for it.
    pub fn handle_change(&mut self, field: &str, value: &str) -> bool {
        self.form_errors.remove(field);
        let known = self.form_data.set_field(field, value);
        if !known {
            tracing::debug!("Ignoring change to unknown form field '{field}'");
        }
        known
    }

    pub fn validate_form(&mut self) -> bool {
        self.phase = FormPhase::Validating;
        self.form_errors = self.form_data.field_errors();
        self.phase = FormPhase::Idle;
        self.form_errors.is_empty()
    }

    pub async fn handle_submit<F, Fut, O>(
        &mut self,
        on_submit: F,
    ) -> Result<SubmitOutcome<O>, ClientError>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<O, ClientError>>,
    {
        if !self.validate_form() {
            return Ok(SubmitOutcome::Invalid);
        }

        self.phase = FormPhase::Submitting;
        self.submit_error = None;
        let result = on_submit(self.form_data.clone()).await;
        self.phase = FormPhase::Idle;

        match result {
            Ok(output) => Ok(SubmitOutcome::Submitted(output)),
            Err(err) => {
                tracing::warn!("Form submission failed: {err}");
                match self.policy {
                    SubmitErrorPolicy::Store => {
                        self.submit_error = Some(err.message.clone());
                        Ok(SubmitOutcome::Failed(err.message))
                    }
                    SubmitErrorPolicy::Propagate => Err(err),
                }
            }
        }
    }
}

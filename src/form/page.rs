use std::future::Future;

use super::{FormModel, ResourceForm, ResourceLoader, SubmitOutcome};
use crate::client::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome<O> {
    /// The form stays on screen, either invalid or showing an error.
    Stay,
    /// Submission succeeded; navigate to the resource list.
    Redirect { to: String, output: O },
}

/// A create/edit screen: reference data for dropdowns, the form, and
/// navigation back to the list once the form is saved.
pub struct ResourcePage<T, A> {
    list_route: String,
    form: ResourceForm<T>,
    reference: Option<ResourceLoader<A>>,
    error: Option<String>,
}

impl<T, A> ResourcePage<T, A>
where
    T: FormModel,
    A: Clone + Send + Sync + 'static,
{
    pub fn new(list_route: impl Into<String>, form: ResourceForm<T>) -> Self {
        Self {
            list_route: list_route.into(),
            form,
            reference: None,
            error: None,
        }
    }

    pub fn with_reference_data(mut self, loader: ResourceLoader<A>) -> Self {
        self.reference = Some(loader);
        self
    }

    /// Kicks off the auxiliary fetches.
    pub fn mount(&mut self) {
        if let Some(loader) = self.reference.as_mut() {
            loader.refetch();
        }
    }

    pub async fn reference_settled(&mut self) -> Option<A> {
        match self.reference.as_mut() {
            Some(loader) => loader.settled().await.data,
            None => None,
        }
    }

    pub fn reference_data(&self) -> Option<A> {
        self.reference.as_ref().and_then(|l| l.snapshot().data)
    }

    pub fn is_loading(&self) -> bool {
        self.form.is_submitting()
            || self
                .reference
                .as_ref()
                .is_some_and(|l| l.snapshot().is_loading)
    }

    /// The most relevant error to show in the inline alert.
    pub fn latest_error(&self) -> Option<String> {
        self.error
            .clone()
            .or_else(|| self.form.submit_error().map(str::to_string))
            .or_else(|| self.reference.as_ref().and_then(|l| l.snapshot().error))
    }

    pub fn form(&self) -> &ResourceForm<T> {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ResourceForm<T> {
        &mut self.form
    }

    pub async fn submit<F, Fut, O>(&mut self, on_submit: F) -> PageOutcome<O>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<O, ClientError>>,
    {
        self.error = None;
        match self.form.handle_submit(on_submit).await {
            Ok(SubmitOutcome::Submitted(output)) => PageOutcome::Redirect {
                to: self.list_route.clone(),
                output,
            },
            Ok(SubmitOutcome::Invalid) | Ok(SubmitOutcome::Failed(_)) => PageOutcome::Stay,
            Err(err) => {
                self.error = Some(err.message);
                PageOutcome::Stay
            }
        }
    }
}

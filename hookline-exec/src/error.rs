use hookline_core::ActionError;
use hookline_store::StoreError;

use crate::dispatch::DispatchInterrupted;

/// Store failures that reach the caller without a more specific meaning.
pub(crate) fn store_error(e: StoreError) -> ActionError {
    match e {
        StoreError::NotFound(what) => ActionError::NotFound(what),
        StoreError::AlreadyExists(what) => ActionError::PreconditionFailed(format!("{what} already exists")),
        StoreError::Conflict(what) => ActionError::Internal(format!("concurrent modification: {what}")),
        StoreError::Other(what) => ActionError::Internal(what),
    }
}

/// Failure of [`crate::Engine::handle`].
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Interrupted(#[from] DispatchInterrupted),
}

impl From<HandleError> for ActionError {
    fn from(e: HandleError) -> Self {
        match e {
            HandleError::Action(e) => e,
            HandleError::Interrupted(i) => i.into(),
        }
    }
}

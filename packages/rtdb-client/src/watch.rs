use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::context::CancelToken;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
enum WatchState {
    #[default]
    Idle,
    Watching(CancelToken),
}

/// Watch session bookkeeping for a single reference.
///
/// Starting while a session is active is rejected; stopping while idle does
/// nothing.
#[derive(Debug, Default)]
pub(crate) struct Watch {
    state: Mutex<WatchState>,
}

impl Watch {
    pub(crate) fn start(&self) -> Result<CancelToken> {
        let mut state = self.lock();
        match &*state {
            WatchState::Watching(_) => Err(Error::AlreadyWatching),
            WatchState::Idle => {
                let token = CancelToken::new();
                *state = WatchState::Watching(token.clone());
                Ok(token)
            }
        }
    }

    /// Returns whether a session was running.
    pub(crate) fn stop(&self) -> bool {
        match std::mem::take(&mut *self.lock()) {
            WatchState::Watching(token) => {
                token.cancel();
                true
            }
            WatchState::Idle => false,
        }
    }

    pub(crate) fn is_watching(&self) -> bool {
        matches!(*self.lock(), WatchState::Watching(_))
    }

    // The state is a plain enum, so a poisoned lock still holds valid data.
    fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Worker lifecycle state machine.
//!
//! ```text
//! parsed ──> installing ──> installed ──> activating ──> activated
//!   ^            │              ^             │
//!   └── failed ──┘              └── failed ───┘
//!
//! any state ──> redundant
//! ```

use std::fmt;

use serde::Serialize;
use sitecache_core::Error;
use tokio::sync::Mutex;

use crate::host::ClientHost;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
            LifecycleState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Inner {
    state: LifecycleState,
    skip_waiting: bool,
}

/// Tracks where this worker version is in its lifecycle.
#[derive(Debug)]
pub struct Lifecycle {
    inner: Mutex<Inner>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { state: LifecycleState::Parsed, skip_waiting: false }) }
    }

    pub async fn state(&self) -> LifecycleState {
        self.inner.lock().await.state
    }

    async fn transition(&self, allowed_from: &[LifecycleState], to: LifecycleState) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        if !allowed_from.contains(&inner.state) {
            return Err(Error::InvalidState { from: inner.state.to_string(), to: to.to_string() });
        }
        tracing::info!("lifecycle {} -> {}", inner.state, to);
        inner.state = to;
        Ok(())
    }

    pub async fn begin_install(&self) -> Result<(), Error> {
        self.transition(&[LifecycleState::Parsed], LifecycleState::Installing).await
    }

    pub async fn finish_install(&self) -> Result<(), Error> {
        self.transition(&[LifecycleState::Installing], LifecycleState::Installed).await
    }

    /// Back to parsed so the install can be retried.
    pub async fn fail_install(&self) -> Result<(), Error> {
        self.transition(&[LifecycleState::Installing], LifecycleState::Parsed).await
    }

    /// Ask to activate as soon as installation finishes, without waiting for
    /// pages controlled by the previous version to close.
    pub async fn skip_waiting(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.skip_waiting {
            tracing::info!("skip waiting requested in state {}", inner.state);
        }
        inner.skip_waiting = true;
    }

    /// Installed and asked to skip waiting.
    pub async fn should_activate(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.state == LifecycleState::Installed && inner.skip_waiting
    }

    pub async fn begin_activate(&self) -> Result<(), Error> {
        self.transition(&[LifecycleState::Installed], LifecycleState::Activating).await
    }

    /// Claim every open page, then mark the worker activated.
    pub async fn finish_activate(&self, host: &dyn ClientHost) -> Result<(), Error> {
        let state = self.state().await;
        if state != LifecycleState::Activating {
            return Err(Error::InvalidState { from: state.to_string(), to: LifecycleState::Activated.to_string() });
        }
        host.claim_clients().await?;
        self.transition(&[LifecycleState::Activating], LifecycleState::Activated).await
    }

    /// Back to installed so activation can be retried.
    pub async fn fail_activate(&self) -> Result<(), Error> {
        self.transition(&[LifecycleState::Activating], LifecycleState::Installed).await
    }

    /// A newer version has taken over.
    pub async fn mark_redundant(&self) {
        let mut inner = self.inner.lock().await;
        tracing::info!("lifecycle {} -> {}", inner.state, LifecycleState::Redundant);
        inner.state = LifecycleState::Redundant;
    }
}

use std::sync::Arc;

use tokio::sync::watch;

use crate::auth::profiles::ProfileLoader;
use crate::auth::session::Session;
use crate::models::profile::Profile;

/// What subscribers see of the current auth state.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl AuthSnapshot {
    fn initial() -> Self {
        Self {
            session: None,
            profile: None,
            loading: true,
        }
    }
}

/// Shared session holder.
///
/// Components receive the context explicitly and observe it through
/// [`AuthSubscription`] handles; dropping a handle unsubscribes it.
#[derive(Clone)]
pub struct AuthContext {
    loader: Arc<ProfileLoader>,
    state: Arc<watch::Sender<AuthSnapshot>>,
}

impl AuthContext {
    pub fn new(loader: Arc<ProfileLoader>) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::initial());
        Self {
            loader,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.state.subscribe(),
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// Apply an auth change: a new session loads its profile, `None` signs
    /// out. A profile that cannot be loaded leaves the session with no
    /// profile.
    pub async fn set_session(&self, session: Option<Session>) {
        let Some(session) = session else {
            self.state.send_replace(AuthSnapshot {
                session: None,
                profile: None,
                loading: false,
            });
            return;
        };

        self.state.send_replace(AuthSnapshot {
            session: Some(session.clone()),
            profile: None,
            loading: true,
        });

        let profile = match self.loader.load(&session).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::error!(user_id = %session.user_id, error = %e, "Error fetching profile");
                None
            }
        };

        // A newer session may have been applied while the profile loaded
        self.state.send_if_modified(|current| {
            let still_current = current
                .session
                .as_ref()
                .is_some_and(|s| s.user_id == session.user_id);
            if still_current {
                current.profile = profile;
                current.loading = false;
            }
            still_current
        });
    }
}

/// Live view of an [`AuthContext`]. Dropping it unsubscribes.
pub struct AuthSubscription {
    rx: watch::Receiver<AuthSnapshot>,
}

impl AuthSubscription {
    pub fn current(&self) -> AuthSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the context is gone.
    pub async fn changed(&mut self) -> Option<AuthSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

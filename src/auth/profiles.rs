use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::session::Session;
use crate::models::profile::{NewProfile, Profile};

/// Profile rows as seen by the session layer.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, user_id: uuid::Uuid) -> Result<Option<Profile>, sqlx::Error>;

    /// Create the base profile and its role-specific row.
    async fn create_profile(&self, profile: &NewProfile) -> Result<(), sqlx::Error>;
}

/// How hard to try before giving up on a profile.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Profile not found for user {0}")]
    Missing(uuid::Uuid),

    #[error("Failed to load profile: {0}")]
    Lookup(#[source] sqlx::Error),

    #[error("Failed to create missing profile: {0}")]
    Repair(#[source] sqlx::Error),
}

/// Loads the profile behind a session.
///
/// Account creation and profile-row creation are not atomic on the auth
/// provider's side, so a freshly signed-up user may briefly have no
/// profile. The loader retries a bounded number of times and, when the
/// session's sign-up metadata names a role, creates the missing rows once
/// and re-reads them with no retry budget left.
pub struct ProfileLoader {
    repo: Arc<dyn ProfileRepository>,
    policy: RetryPolicy,
}

impl ProfileLoader {
    pub fn new(repo: Arc<dyn ProfileRepository>, policy: RetryPolicy) -> Self {
        Self { repo, policy }
    }

    pub async fn load(&self, session: &Session) -> Result<Profile, ProfileError> {
        let mut retries_left = self.policy.max_retries;
        let mut repaired = false;

        loop {
            let failure = match self.repo.find_profile(session.user_id).await {
                Ok(Some(profile)) => return Ok(profile),
                Ok(None) => {
                    if !repaired {
                        if let Some(new_profile) = repair_from(session) {
                            tracing::info!(
                                user_id = %session.user_id,
                                role = %new_profile.role,
                                "Profile missing, creating from sign-up metadata"
                            );
                            self.repo
                                .create_profile(&new_profile)
                                .await
                                .map_err(ProfileError::Repair)?;
                            repaired = true;
                            retries_left = 0;
                            continue;
                        }
                    }
                    ProfileError::Missing(session.user_id)
                }
                Err(e) => ProfileError::Lookup(e),
            };

            if retries_left == 0 {
                tracing::error!(user_id = %session.user_id, error = %failure, "Giving up on profile");
                return Err(failure);
            }

            tracing::warn!(
                user_id = %session.user_id,
                retries_left,
                error = %failure,
                "Error fetching profile, retrying"
            );
            retries_left -= 1;
            tokio::time::sleep(self.policy.delay).await;
        }
    }
}

fn repair_from(session: &Session) -> Option<NewProfile> {
    let role = session.metadata.role?;
    Some(NewProfile {
        id: session.user_id,
        email: session.email.clone().unwrap_or_default(),
        full_name: session.display_name(),
        role,
    })
}

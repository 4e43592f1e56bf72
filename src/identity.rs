//! Who the remote note collection belongs to.

mod errors;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use log::{debug, info};
use tokio::fs;
use tokio::sync::Mutex;
pub use errors::IdentityError;
use crate::data::UserId;
use crate::lib_constants::IDENTITY_PATH;
use crate::rng::make_uuid;
use crate::util::StrExt;

#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    async fn current_user_id(&self) -> Option<UserId>;

    async fn sign_in_anonymously(&self) -> Result<UserId, IdentityError>;
}

/// Signs in once, only if there is no identity yet.
pub async fn resolve_user(
    identity: &impl IdentityProvider,
) -> Result<UserId, IdentityError> {
    match identity.current_user_id().await {
        Some(user) => Ok(user),
        None => {
            info!("no identity, signing in anonymously");
            identity.sign_in_anonymously().await
        },
    }
}

/// Anonymous account kept in the data directory, so later sessions see
/// the same collection.
pub struct AnonymousIdentity {
    path: PathBuf,
    user: Mutex<Option<UserId>>,
}

impl AnonymousIdentity {
    pub fn new(data_directory: &Path) -> Self {
        AnonymousIdentity {
            path: data_directory.join(IDENTITY_PATH),
            user: Mutex::new(None),
        }
    }

    async fn read_stored(&self) -> Result<Option<UserId>, IdentityError> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => contents
                .nonblank_to_some()
                .map(UserId::new)
                .map(Some)
                .ok_or(IdentityError::Empty),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl IdentityProvider for AnonymousIdentity {
    async fn current_user_id(&self) -> Option<UserId> {
        let mut user = self.user.lock().await;
        if user.is_none() {
            *user = self.read_stored()
                .await
                .inspect_err(|e| debug!(
                    "no usable identity at \"{}\": {e}",
                    self.path.display(),
                ))
                .ok()
                .flatten();
        }
        user.clone()
    }

    async fn sign_in_anonymously(&self) -> Result<UserId, IdentityError> {
        let mut user = self.user.lock().await;
        let new_user = UserId::new(
            make_uuid(&mut rand::rng()).hyphenated().to_string()
        );
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, new_user.as_bytes()).await?;
        info!("signed in anonymously as {new_user}");
        *user = Some(new_user.clone());
        Ok(new_user)
    }
}

use bm_session::Identity;
use teloxide::types::UserId;

/// Environment variable holding the one Telegram user id allowed to use the console
pub const AUTHORIZED_USER_VAR: &str = "TELEGRAM_AUTHORIZED_USER";

/// The single user the console answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizedUser {
    pub user: UserId,
}

impl AuthorizedUser {
    pub fn new(user_id: u64) -> Self {
        Self { user: UserId(user_id) }
    }

    pub fn is_authorized(&self, user_id: &UserId) -> bool {
        self.user == *user_id
    }

    pub fn identity(&self) -> Identity {
        Identity(self.user.0)
    }

    /// Load the allowed user from the environment
    pub fn from_env() -> anyhow::Result<Self> {
        let value = std::env::var(AUTHORIZED_USER_VAR).map_err(|_| anyhow::anyhow!("{AUTHORIZED_USER_VAR} is not set"))?;
        Self::parse(&value)
    }

    pub fn parse(value: &str) -> anyhow::Result<Self> {
        let user_id = value.trim().parse::<u64>().map_err(|err| anyhow::anyhow!("Failed to parse authorized user id {value:?}: {err}"))?;
        Ok(Self::new(user_id))
    }
}

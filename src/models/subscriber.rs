//! Subscriber models

/// A Discord user who can receive scheduled price updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub user_id: u64,
    pub username: String,
    pub active: bool,
}

impl Subscriber {
    pub fn new(user_id: u64, username: impl Into<String>, active: bool) -> Self {
        Self {
            user_id,
            username: username.into(),
            active,
        }
    }
}

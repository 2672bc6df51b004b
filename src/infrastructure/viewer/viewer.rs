use crate::core::Id;

/// Identity of the caller, attached to every authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    pub user_id: Id,
    pub login_name: String,
    pub request_id: String,
}

impl ViewerContext {
    pub fn new(user_id: Id, login_name: impl Into<String>, request_id: impl Into<String>) -> Self {
        ViewerContext {
            user_id,
            login_name: login_name.into(),
            request_id: request_id.into(),
        }
    }

    pub fn is_viewer(&self, user_id: Id) -> bool {
        self.user_id == user_id
    }
}

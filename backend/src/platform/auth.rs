/// Supplies the owner scope for pet queries. No authenticated user means an
/// empty scope, not an error.
pub trait AuthProvider: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}

/// Fixed owner id taken from configuration. The credential flow itself lives
/// outside this core.
pub struct StaticAuthProvider {
    user_id: Option<String>,
}

impl StaticAuthProvider {
    pub fn new(user_id: Option<String>) -> Self {
        Self { user_id }
    }
}

impl AuthProvider for StaticAuthProvider {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}

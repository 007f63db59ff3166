use tukangin_auth::{Identity, UserAccount};

/// Caller context for a request.
///
/// Built once by the auth middleware and passed explicitly to every
/// handler. `account` is the persisted account as it was when the request
/// arrived; operations re-read it through the authorization gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    identity: Identity,
    account: UserAccount,
}

impl RequestContext {
    pub fn new(identity: Identity, account: UserAccount) -> Self {
        Self { identity, account }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn account(&self) -> &UserAccount {
        &self.account
    }
}

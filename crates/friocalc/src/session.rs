//! Login state gating which view is active.

use crate::types::User;

/// Which form the anonymous view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthView {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous { view: AuthView },
    Authenticated(User),
}

impl Default for Session {
    fn default() -> Self {
        Session::Anonymous {
            view: AuthView::Login,
        }
    }
}

impl Session {
    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Authenticated(user) => Some(user),
            Session::Anonymous { .. } => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// Enter the authenticated state. Returns true on a fresh login,
    /// which is the cue to reload the history.
    pub fn login(&mut self, user: User) -> bool {
        let fresh = !self.is_authenticated();
        *self = Session::Authenticated(user);
        fresh
    }

    /// Back to the anonymous login view
    pub fn logout(&mut self) -> Option<User> {
        match std::mem::take(self) {
            Session::Authenticated(user) => Some(user),
            Session::Anonymous { .. } => None,
        }
    }

    /// Switch between the login and register forms.
    /// Has no effect once authenticated.
    pub fn toggle_view(&mut self) -> Option<AuthView> {
        match self {
            Session::Anonymous { view } => {
                *view = match view {
                    AuthView::Login => AuthView::Register,
                    AuthView::Register => AuthView::Login,
                };
                Some(*view)
            }
            Session::Authenticated(_) => None,
        }
    }

    /// A completed registration sends the user back to the login form
    pub fn registered(&mut self) {
        if let Session::Anonymous { view } = self {
            *view = AuthView::Login;
        }
    }

    pub fn auth_view(&self) -> Option<AuthView> {
        match self {
            Session::Anonymous { view } => Some(*view),
            Session::Authenticated(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_anonymous_login() {
        let session = Session::default();
        assert!(!session.is_authenticated());
        assert_eq!(session.auth_view(), Some(AuthView::Login));
    }

    #[test]
    fn test_login_transition() {
        let mut session = Session::default();
        assert!(session.login(User::new("ana")));
        assert_eq!(session.user(), Some(&User::new("ana")));
        assert_eq!(session.auth_view(), None);
    }

    #[test]
    fn test_login_while_authenticated_is_not_fresh() {
        let mut session = Session::default();
        session.login(User::new("ana"));
        assert!(!session.login(User::new("bruno")));
        assert_eq!(session.user().unwrap().username, "bruno");
    }

    #[test]
    fn test_logout_returns_user_and_resets_view() {
        let mut session = Session::default();
        session.toggle_view();
        session.login(User::new("ana"));

        assert_eq!(session.logout(), Some(User::new("ana")));
        assert_eq!(session, Session::default());
        assert_eq!(session.logout(), None);
    }

    #[test]
    fn test_toggle_view() {
        let mut session = Session::default();
        assert_eq!(session.toggle_view(), Some(AuthView::Register));
        assert_eq!(session.toggle_view(), Some(AuthView::Login));
    }

    #[test]
    fn test_toggle_ignored_when_authenticated() {
        let mut session = Session::default();
        session.login(User::new("ana"));
        assert_eq!(session.toggle_view(), None);
    }

    #[test]
    fn test_registered_returns_to_login() {
        let mut session = Session::default();
        session.toggle_view();
        session.registered();
        assert_eq!(session.auth_view(), Some(AuthView::Login));
    }
}

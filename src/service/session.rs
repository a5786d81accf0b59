//! Role gate: decide once, before any protected data is read, whether an
//! access token belongs to a user holding the page's required role.

use crate::backend::{AuthUser, Backend, Select, Table};
use crate::db::models::{Role, User, from_record};
use tracing::{debug, warn};

/// Why a request was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// No token, or the token is not a live session.
    NoSession,
    /// The role lookup failed or returned anything but exactly one row.
    LookupFailed,
    /// The user's role is not the required one.
    WrongRole,
}

impl Denial {
    /// Whether the session must be signed out before redirecting.
    pub fn signs_out(&self) -> bool {
        !matches!(self, Denial::NoSession)
    }
}

/// Look up the role of `user` in the `users` table.
pub async fn lookup_role(backend: &Backend, user: &AuthUser) -> Result<Option<Role>, Denial> {
    let rows = backend
        .tables
        .select(Select::from(Table::Users).eq("id", user.id.as_str()))
        .await
        .map_err(|e| {
            warn!(user_id = %user.id, error = %e, "role lookup failed");
            Denial::LookupFailed
        })?;
    let mut rows = rows.into_iter();
    let (Some(row), None) = (rows.next(), rows.next()) else {
        warn!(user_id = %user.id, "role lookup did not return exactly one row");
        return Err(Denial::LookupFailed);
    };
    let profile: User = from_record(row).map_err(|_| Denial::LookupFailed)?;
    Ok(profile.role.and_then(|r| r.parse().ok()))
}

/// Resolve `access_token` to a user holding `required`, signing the session
/// out when it exists but does not qualify.
pub async fn authorize(
    backend: &Backend,
    access_token: Option<&str>,
    required: Role,
) -> Result<AuthUser, Denial> {
    let Some(token) = access_token else {
        return Err(Denial::NoSession);
    };
    let user = match backend.auth.current_user(token).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(Denial::NoSession),
        Err(e) => {
            warn!(error = %e, "session lookup failed");
            return Err(Denial::NoSession);
        }
    };

    let denial = match lookup_role(backend, &user).await {
        Ok(Some(role)) if role == required => {
            debug!(user_id = %user.id, role = role.as_str(), "role gate passed");
            return Ok(user);
        }
        Ok(_) => Denial::WrongRole,
        Err(denial) => denial,
    };

    warn!(
        user_id = %user.id,
        required = required.as_str(),
        ?denial,
        "role gate denied; signing out"
    );
    if let Err(e) = backend.auth.sign_out(token).await {
        warn!(user_id = %user.id, error = %e, "sign-out after denial failed");
    }
    Err(denial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;

    #[tokio::test]
    async fn matching_role_passes() {
        let mem = MemoryBackend::default();
        mem.add_user("a1", "admin@school.id", "pw", "admin");
        let token = mem.auth.issue_token("a1");

        let user = authorize(&mem.backend(), Some(&token), Role::Admin)
            .await
            .unwrap();
        assert_eq!(user.id, "a1");
        assert_eq!(mem.auth.sign_out_count(), 0);
    }

    #[tokio::test]
    async fn missing_token_is_no_session_without_sign_out() {
        let mem = MemoryBackend::default();
        let denial = authorize(&mem.backend(), None, Role::Admin).await.unwrap_err();
        assert_eq!(denial, Denial::NoSession);
        assert!(!denial.signs_out());

        let denial = authorize(&mem.backend(), Some("stale"), Role::Admin)
            .await
            .unwrap_err();
        assert_eq!(denial, Denial::NoSession);
        assert_eq!(mem.auth.sign_out_count(), 0);
    }

    #[tokio::test]
    async fn wrong_role_signs_out() {
        let mem = MemoryBackend::default();
        mem.add_user("s1", "siti@school.id", "pw", "student");
        let token = mem.auth.issue_token("s1");

        let denial = authorize(&mem.backend(), Some(&token), Role::Admin)
            .await
            .unwrap_err();
        assert_eq!(denial, Denial::WrongRole);
        assert!(!mem.auth.is_live(&token));
    }

    #[tokio::test]
    async fn missing_profile_row_signs_out() {
        let mem = MemoryBackend::default();
        mem.auth.register("ghost", "ghost@school.id", "pw");
        let token = mem.auth.issue_token("ghost");

        let denial = authorize(&mem.backend(), Some(&token), Role::Student)
            .await
            .unwrap_err();
        assert_eq!(denial, Denial::LookupFailed);
        assert_eq!(mem.auth.sign_out_count(), 1);
    }
}

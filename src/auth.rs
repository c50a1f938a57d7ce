use crate::{
    api::KribApi,
    error::{PortalError, PortalResult},
    models::Credentials,
    role::Role,
    session::{Session, SessionState},
};

/// login
///
/// Drives the session lifecycle for one login attempt:
/// `Anonymous -> Authenticating`, then either `-> Authenticated` with the new session
/// or back to `Anonymous` with the failure.
///
/// The role always comes from the API's `/api/auth/me/`, never from user input.
pub async fn login(api: &dyn KribApi, credentials: &Credentials) -> PortalResult<Session> {
    let state = SessionState::Anonymous.begin_login(&credentials.username)?;

    match exchange(api, credentials).await {
        Ok(session) => {
            tracing::info!(username = %session.username, role = %session.role, "login succeeded");
            state
                .complete(session)?
                .into_session()
                .ok_or(PortalError::MissingTokens)
        }
        Err(err) => {
            tracing::warn!(username = %credentials.username, error = %err, "login failed");
            state.fail()?;
            Err(err)
        }
    }
}

/// Token exchange followed by the identity lookup.
async fn exchange(api: &dyn KribApi, credentials: &Credentials) -> PortalResult<Session> {
    let (access, refresh) = api.obtain_token(credentials).await?.into_tokens()?;
    let me = api.current_user(&access).await?;
    let role = Role::parse(&me.role).ok_or_else(|| PortalError::UnsupportedRole(me.role.clone()))?;

    Ok(Session {
        username: me.username,
        role,
        token: access,
        refresh,
    })
}

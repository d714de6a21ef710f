use log::{info, warn};
use uuid::Uuid;

use crate::{
    app::AppState,
    db::{self, Filter},
    dto::{LoginQuery, LoginRequest, LoginResponse, RegisterRequest, UserView},
    errors::ApiError,
    models::{Participant, User},
};

use super::{auth::jwt, crypto};

pub async fn register(dto: RegisterRequest, state: &AppState) -> Result<Uuid, ApiError> {
    dto.validate()?;
    let RegisterRequest {
        username,
        password,
        email,
        role,
    } = dto;
    let username = username.trim().to_string();
    let email = email.trim().to_string();

    let existing = state
        .store
        .find_user_by_username(&username)
        .await
        .map_err(|e| ApiError::internal("Server error during registration", e))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    let user = User {
        id: Uuid::new_v4(),
        username,
        pwd_hash: crypto::hash_password(&password)
            .map_err(|e| ApiError::internal("Server error during registration", e))?,
        email,
        role: role.unwrap_or_default(),
        created_at: state.clock.now(),
    };
    let id = user.id;
    match state.store.insert_user(user).await {
        Ok(()) => {
            info!("registered user {}", id);
            Ok(id)
        }
        Err(err) if err.is_conflict_on(db::USERNAME_KEY) => Err(ApiError::bad_request("User already exists")),
        Err(err) if err.is_conflict_on(db::EMAIL_KEY) => Err(ApiError::bad_request("Email already in use")),
        Err(err) => Err(ApiError::internal("Server error during registration", err)),
    }
}

/// Issues a token, then makes a best-effort attempt to join the event
/// named by the `redirect` hint.
pub async fn login(dto: LoginRequest, query: LoginQuery, state: &AppState) -> Result<LoginResponse, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid username or password".into());
    let user = state
        .store
        .find_user_by_username(dto.username.trim())
        .await
        .map_err(|e| ApiError::internal("Server error during login", e))?
        .ok_or_else(invalid)?;
    let verified = crypto::verify_password(&dto.password, &user.pwd_hash)
        .map_err(|e| ApiError::internal("Server error during login", e))?;
    if !verified {
        return Err(invalid());
    }

    let token = jwt::create(&state.keys, &user.id, &user.username)
        .map_err(|e| ApiError::internal("Server error during login", e))?;

    if let Some(event_id) = query.event_id() {
        auto_join(event_id, user.id, state).await;
    }

    let user = view(user, state)
        .await
        .map_err(|e| ApiError::internal("Server error during login", e))?;
    Ok(LoginResponse {
        token,
        message: "Login successful!".to_string(),
        user,
    })
}

async fn auto_join(event_id: Uuid, user_id: Uuid, state: &AppState) {
    let participant = Participant {
        user_id,
        joined_at: state.clock.now(),
    };
    match state.store.find_event(event_id).await {
        Ok(Some(_)) => match state.store.add_participant(event_id, participant).await {
            Ok(true) => info!("user {} joined event {} on login", user_id, event_id),
            Ok(false) => info!("user {} already in event {}", user_id, event_id),
            Err(err) => warn!("auto-join of {} into {} failed: {}", user_id, event_id, err),
        },
        Ok(None) => warn!("auto-join skipped, event {} not found", event_id),
        Err(err) => warn!("auto-join of {} into {} failed: {}", user_id, event_id, err),
    }
}

pub async fn current(user_id: Uuid, state: &AppState) -> Result<UserView, ApiError> {
    let user = state
        .store
        .find_user(user_id)
        .await
        .map_err(|e| ApiError::internal("Server error fetching user data", e))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    view(user, state)
        .await
        .map_err(|e| ApiError::internal("Server error fetching user data", e))
}

/// Resolves the organized/participated back-references.
async fn view(user: User, state: &AppState) -> Result<UserView, db::DbError> {
    let organized = state.store.list_events(Filter::OrganizedBy(user.id)).await?;
    let attended = state.store.list_events(Filter::AttendedBy(user.id)).await?;
    Ok(UserView::new(
        user,
        organized.iter().map(|e| e.id).collect(),
        attended.iter().map(|e| e.id).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{event_input, state};
    use crate::service::event;

    fn register_req(name: &str) -> RegisterRequest {
        RegisterRequest {
            username: name.into(),
            password: "pw".into(),
            email: format!("{name}@example.com"),
            role: None,
        }
    }

    fn login_req(name: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: name.into(),
            password: password.into(),
        }
    }

    #[actix_rt::test]
    async fn register_then_login() {
        let (state, _) = state();
        let id = register(register_req("alice"), &state).await.unwrap();

        let res = login(login_req("alice", "pw"), LoginQuery::default(), &state)
            .await
            .unwrap();
        assert_eq!(res.user.id, id);
        assert_eq!(res.message, "Login successful!");
        let claims = jwt::decode_claims(&state.keys, &res.token).unwrap();
        assert_eq!(claims.user_id, id);
    }

    #[actix_rt::test]
    async fn duplicate_username_and_email_are_rejected() {
        let (state, _) = state();
        register(register_req("alice"), &state).await.unwrap();

        let err = register(register_req("alice"), &state).await.unwrap_err();
        assert_eq!(err, ApiError::bad_request("User already exists"));

        let mut other = register_req("bob");
        other.email = "alice@example.com".into();
        let err = register(other, &state).await.unwrap_err();
        assert_eq!(err, ApiError::bad_request("Email already in use"));
    }

    #[actix_rt::test]
    async fn padded_username_logs_in_as_registered() {
        let (state, _) = state();
        let id = register(register_req("bob "), &state).await.unwrap();

        let res = login(login_req("bob ", "pw"), LoginQuery::default(), &state).await.unwrap();
        assert_eq!(res.user.id, id);
        assert_eq!(res.user.username, "bob");
        assert!(login(login_req("bob", "pw"), LoginQuery::default(), &state).await.is_ok());
    }

    #[actix_rt::test]
    async fn corrupt_password_hash_is_a_server_error() {
        let (state, _) = state();
        let user = User {
            id: Uuid::new_v4(),
            username: "legacy".into(),
            pwd_hash: "not-a-phc-string".into(),
            email: "legacy@example.com".into(),
            role: Default::default(),
            created_at: state.clock.now(),
        };
        state.store.insert_user(user).await.unwrap();

        let err = login(login_req("legacy", "pw"), LoginQuery::default(), &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[actix_rt::test]
    async fn bad_credentials_are_unauthorized() {
        let (state, _) = state();
        register(register_req("alice"), &state).await.unwrap();

        for req in [login_req("alice", "wrong"), login_req("nobody", "pw")] {
            let err = login(req, LoginQuery::default(), &state).await.unwrap_err();
            assert_eq!(err, ApiError::Unauthorized("Invalid username or password".into()));
        }
    }

    #[actix_rt::test]
    async fn login_redirect_joins_event_best_effort() {
        let (state, _) = state();
        let organizer = register(register_req("org"), &state).await.unwrap();
        let guest = register(register_req("alice"), &state).await.unwrap();
        let event_id = event::create(organizer, event_input(&state, "CODE1", 1, 2), &state)
            .await
            .unwrap();

        let query = LoginQuery {
            redirect: Some(format!("/events/{event_id}")),
        };
        let res = login(login_req("alice", "pw"), query, &state).await.unwrap();
        assert_eq!(res.user.participated_events, vec![event_id]);

        let stored = state.store.find_event(event_id).await.unwrap().unwrap();
        assert!(stored.has_participant(guest));

        let missing = LoginQuery {
            redirect: Some(format!("/events/{}", Uuid::new_v4())),
        };
        assert!(login(login_req("alice", "pw"), missing, &state).await.is_ok());
    }

    #[actix_rt::test]
    async fn current_user_lists_back_references() {
        let (state, _) = state();
        let organizer = register(register_req("org"), &state).await.unwrap();
        let event_id = event::create(organizer, event_input(&state, "CODE1", 1, 2), &state)
            .await
            .unwrap();

        let me = current(organizer, &state).await.unwrap();
        assert_eq!(me.username, "org");
        assert_eq!(me.organized_events, vec![event_id]);
        assert!(me.participated_events.is_empty());

        let err = current(Uuid::new_v4(), &state).await.unwrap_err();
        assert_eq!(err, ApiError::not_found("User not found"));
    }
}

use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    auth::{
        dto::{LoginQuery, RegisterRequest, UserData},
        repo_types::CreateUserPayload,
    },
    error::{AuthError, ValidationError},
    pocketbase::{AuthStore, UpstreamError, UserService},
};

const USERNAME_SUFFIX_MIN: u32 = 10_000_000;
const USERNAME_SUFFIX_MAX: u32 = 99_999_999;

/// Accepts only non-empty strings.
pub fn validate_required_string<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError { field }),
    }
}

fn required_json_string<'a>(
    value: Option<&'a Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    validate_required_string(value.and_then(Value::as_str), field)
}

/// Text contributed by a `last_name` value. Non-empty strings, non-zero
/// numbers and `true` are rendered; everything else counts as missing.
pub fn last_name_fragment(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".into()),
        _ => None,
    }
}

/// `"<first> <last>"`, with the literal `null` standing in for a missing last name.
pub fn display_name(first_name: &str, last_name: Option<&str>) -> String {
    let last = last_name.filter(|l| !l.is_empty()).unwrap_or("null");
    format!("{first_name} {last}")
}

pub fn slugify(name: &str) -> String {
    lazy_static! {
        static ref NON_SLUG_RE: Regex = Regex::new(r"[^a-z0-9-]").unwrap();
    }
    let hyphenated = name.to_lowercase().replace(' ', "-");
    NON_SLUG_RE.replace_all(&hyphenated, "").into_owned()
}

/// Slug of `name` plus a random 8-digit suffix. Collisions are not checked.
pub fn generate_username<R: Rng>(name: &str, rng: &mut R) -> String {
    let suffix = rng.gen_range(USERNAME_SUFFIX_MIN..=USERNAME_SUFFIX_MAX);
    format!("{}-{}", slugify(name), suffix)
}

pub fn build_create_payload<R: Rng>(
    req: &RegisterRequest,
    rng: &mut R,
) -> Result<CreateUserPayload, ValidationError> {
    let email = required_json_string(req.email.as_ref(), "Email")?;
    let first_name = required_json_string(req.first_name.as_ref(), "First name")?;
    let password = required_json_string(req.password.as_ref(), "Password")?;

    let last_name = req.last_name.as_ref().and_then(last_name_fragment);
    let name = display_name(first_name, last_name.as_deref());
    let username = generate_username(&name, rng);

    Ok(CreateUserPayload {
        username,
        email: email.to_string(),
        email_visibility: true,
        password: password.to_string(),
        password_confirm: password.to_string(),
        name,
        is_banned: false,
        remember_token: None,
    })
}

pub async fn register(
    users: &dyn UserService,
    req: &RegisterRequest,
    request_verification: bool,
) -> Result<UserData, AuthError> {
    let payload = build_create_payload(req, &mut rand::thread_rng())?;
    debug!(email = %payload.email, username = %payload.username, "creating user");

    let record = users.create_user(&payload).await?;
    let user = UserData::from(record);

    if request_verification {
        if let Err(e) = users.request_verification(&user.email).await {
            warn!(error = %e, email = %user.email, "verification request failed");
        }
    }

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Authenticates, projects the record and clears `store` before returning.
/// The caller only ever gets the public view, never the token.
pub async fn login(
    users: &dyn UserService,
    store: &mut AuthStore,
    query: &LoginQuery,
) -> Result<UserData, AuthError> {
    let email = validate_required_string(query.email.as_deref(), "Email")?;
    let password = validate_required_string(query.password.as_deref(), "Password")?;

    let result = users.auth_with_password(store, email, password).await;
    if store.is_valid() {
        debug!(record_id = store.record_id().unwrap_or_default(), "dropping auth token");
    }
    store.clear();

    let record = match result {
        Ok(r) => r,
        Err(UpstreamError::Rejected { status: 400 | 401 | 404, .. }) => {
            warn!(email = %email, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    let user = UserData::from(record);
    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pocketbase::fake::FakeUsers;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::json;

    fn request(body: Value) -> RegisterRequest {
        serde_json::from_value(body).unwrap()
    }

    fn is_valid_username(username: &str, slug: &str) -> bool {
        let Some((base, digits)) = username.rsplit_once('-') else {
            return false;
        };
        base == slug
            && digits.len() == 8
            && digits.chars().all(|c| c.is_ascii_digit())
            && !digits.starts_with('0')
    }

    #[test]
    fn required_string_rejects_missing_and_empty() {
        assert_eq!(validate_required_string(Some("a"), "Email"), Ok("a"));
        assert_eq!(
            validate_required_string(Some(""), "Email").unwrap_err().to_string(),
            "Email is required and must be a string"
        );
        assert!(validate_required_string(None, "Password").is_err());
    }

    #[test]
    fn non_string_fields_fail_validation() {
        let req = request(json!({"email": 42, "first_name": "Jane", "password": "pw"}));
        let err = build_create_payload(&req, &mut rand::thread_rng()).unwrap_err();
        assert_eq!(err.field, "Email");
    }

    #[test]
    fn validation_order_is_email_first_name_password() {
        let req = request(json!({}));
        let err = build_create_payload(&req, &mut rand::thread_rng()).unwrap_err();
        assert_eq!(err.field, "Email");

        let req = request(json!({"email": "a@b.co", "password": ""}));
        let err = build_create_payload(&req, &mut rand::thread_rng()).unwrap_err();
        assert_eq!(err.field, "First name");

        let req = request(json!({"email": "a@b.co", "first_name": "Jane"}));
        let err = build_create_payload(&req, &mut rand::thread_rng()).unwrap_err();
        assert_eq!(err.field, "Password");
    }

    #[test]
    fn missing_last_name_renders_null() {
        assert_eq!(display_name("Jane", None), "Jane null");
        assert_eq!(display_name("Jane", Some("")), "Jane null");
        assert_eq!(display_name("Jane", Some("Doe")), "Jane Doe");
    }

    #[test]
    fn truthy_scalar_last_names_are_rendered() {
        assert_eq!(last_name_fragment(&json!("Doe")).as_deref(), Some("Doe"));
        assert_eq!(last_name_fragment(&json!(5)).as_deref(), Some("5"));
        assert_eq!(last_name_fragment(&json!(1.5)).as_deref(), Some("1.5"));
        assert_eq!(last_name_fragment(&json!(true)).as_deref(), Some("true"));
        for falsy in [json!(""), json!(0), json!(false), Value::Null, json!({"a": 1})] {
            assert_eq!(last_name_fragment(&falsy), None, "{falsy}");
        }

        let req = request(json!({
            "email": "jane@example.com",
            "first_name": "Jane",
            "last_name": 5,
            "password": "hunter22"
        }));
        let payload = build_create_payload(&req, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(payload.name, "Jane 5");
        assert!(is_valid_username(&payload.username, "jane-5"));
    }

    #[test]
    fn slug_is_lowercase_hyphenated_alphanumeric() {
        assert_eq!(slugify("Jane Doe"), "jane-doe");
        assert_eq!(slugify("O'Brien  Smith!"), "obrien--smith");
        assert_eq!(slugify("Zoë Ünal"), "zo-nal");
        assert_eq!(slugify("Mary-Kate 2nd"), "mary-kate-2nd");
    }

    #[test]
    fn username_has_slug_and_eight_digit_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let username = generate_username("Jane Doe", &mut rng);
            assert!(is_valid_username(&username, "jane-doe"), "{username}");
        }
    }

    #[test]
    fn payload_carries_fixed_fields() {
        let req = request(json!({
            "email": "jane@example.com",
            "first_name": "Jane",
            "password": "hunter22"
        }));
        let payload = build_create_payload(&req, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(payload.name, "Jane null");
        assert!(is_valid_username(&payload.username, "jane-null"));
        assert!(payload.email_visibility);
        assert_eq!(payload.password, "hunter22");
        assert_eq!(payload.password_confirm, "hunter22");
        assert!(!payload.is_banned);
        assert_eq!(payload.remember_token, None);

        let wire = serde_json::to_value(&payload).unwrap();
        assert_eq!(wire["emailVisibility"], json!(true));
        assert_eq!(wire["passwordConfirm"], json!("hunter22"));
        assert_eq!(wire["remember_token"], Value::Null);
    }

    #[tokio::test]
    async fn invalid_register_never_reaches_service() {
        let users = FakeUsers::default();
        for body in [
            json!({"first_name": "Jane", "password": "pw"}),
            json!({"email": "a@b.co", "password": "pw"}),
            json!({"email": "a@b.co", "first_name": "Jane"}),
        ] {
            let err = register(&users, &request(body), false).await.unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)));
        }
        assert_eq!(users.calls(), 0);
    }

    #[tokio::test]
    async fn register_returns_projected_user() {
        let users = FakeUsers::default();
        let req = request(json!({
            "email": "jane@example.com",
            "first_name": "Jane",
            "last_name": "Doe",
            "password": "hunter22"
        }));
        let user = register(&users, &req, false).await.unwrap();
        assert_eq!(user.name, "Jane Doe");
        assert_eq!(user.email, "jane@example.com");
        assert!(is_valid_username(&user.username, "jane-doe"));
        assert!(users.verifications.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn register_requests_verification_when_enabled() {
        let users = FakeUsers::default();
        let req = request(json!({
            "email": "jane@example.com",
            "first_name": "Jane",
            "password": "hunter22"
        }));
        register(&users, &req, true).await.unwrap();
        assert_eq!(*users.verifications.lock().unwrap(), vec!["jane@example.com"]);
    }

    #[tokio::test]
    async fn register_succeeds_when_verification_fails() {
        let users = FakeUsers {
            fail_verification: true,
            ..FakeUsers::default()
        };
        let req = request(json!({
            "email": "jane@example.com",
            "first_name": "Jane",
            "password": "hunter22"
        }));
        let user = register(&users, &req, true).await.unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(users.created.lock().unwrap().len(), 1);
        assert_eq!(*users.verifications.lock().unwrap(), vec!["jane@example.com"]);
    }

    #[tokio::test]
    async fn register_surfaces_upstream_rejection() {
        let users = FakeUsers::rejecting(400, "Failed to create record.");
        let req = request(json!({
            "email": "taken@example.com",
            "first_name": "Jane",
            "password": "hunter22"
        }));
        let err = register(&users, &req, false).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Upstream(UpstreamError::Rejected { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn login_clears_store_after_success() {
        let users = FakeUsers::default();
        let mut store = AuthStore::default();
        let query = LoginQuery {
            email: Some("jane@example.com".into()),
            password: Some("hunter22".into()),
        };
        let user = login(&users, &mut store, &query).await.unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert!(!store.is_valid());
        assert_eq!(store.record_id(), None);
    }

    #[tokio::test]
    async fn login_validates_before_calling_service() {
        let users = FakeUsers::default();
        let mut store = AuthStore::default();
        let query = LoginQuery {
            email: Some("jane@example.com".into()),
            password: None,
        };
        let err = login(&users, &mut store, &query).await.unwrap_err();
        assert_eq!(err.to_string(), "Password is required and must be a string");
        assert_eq!(users.calls(), 0);
    }

    #[tokio::test]
    async fn login_maps_rejection_to_invalid_credentials() {
        let users = FakeUsers::rejecting(400, "Failed to authenticate.");
        let mut store = AuthStore::default();
        let query = LoginQuery {
            email: Some("jane@example.com".into()),
            password: Some("wrong".into()),
        };
        let err = login(&users, &mut store, &query).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!store.is_valid());
    }

    #[tokio::test]
    async fn login_keeps_server_failures_distinct() {
        let users = FakeUsers::rejecting(503, "Service Unavailable");
        let mut store = AuthStore::default();
        let query = LoginQuery {
            email: Some("jane@example.com".into()),
            password: Some("hunter22".into()),
        };
        let err = login(&users, &mut store, &query).await.unwrap_err();
        assert!(matches!(err, AuthError::Upstream(_)));
    }
}

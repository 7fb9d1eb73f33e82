use shiftbeat_realtime::auth::store::{IdentityStore, InMemoryIdentityStore};
use shiftbeat_realtime::auth::{authenticate, jwt, Identity};
use shiftbeat_realtime::error::AuthError;

const SECRET: [u8; 32] = [42u8; 32];

fn store_with(identity: Identity) -> InMemoryIdentityStore {
    let store = InMemoryIdentityStore::new();
    store.upsert(identity);
    store
}

fn ada() -> Identity {
    Identity {
        user_id: "u-1".to_string(),
        name: "Ada".to_string(),
        role: "employee".to_string(),
        organization_id: Some("org-5".to_string()),
    }
}

#[tokio::test]
async fn valid_token_resolves_current_identity() {
    let store = store_with(ada());
    let token = jwt::issue_access_token(&SECRET, "u-1", "Ada", "employee", Some("org-5")).unwrap();

    let identity = authenticate(Some(&token), &SECRET, &store).await.unwrap();
    assert_eq!(identity.user_id, "u-1");
    assert_eq!(identity.organization_id.as_deref(), Some("org-5"));
}

#[tokio::test]
async fn missing_credential_is_refused() {
    let store = store_with(ada());
    let err = authenticate(None, &SECRET, &store).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCredential));
    assert_eq!(err.close_code(), 4002);
}

#[tokio::test]
async fn garbage_token_is_refused() {
    let store = store_with(ada());
    let err = authenticate(Some("not.a.jwt"), &SECRET, &store)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid(_)));
    assert_eq!(err.close_code(), 4002);
}

#[tokio::test]
async fn token_signed_with_other_key_is_refused() {
    let store = store_with(ada());
    let token =
        jwt::issue_access_token(&[9u8; 32], "u-1", "Ada", "employee", Some("org-5")).unwrap();
    let err = authenticate(Some(&token), &SECRET, &store).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid(_)));
}

#[tokio::test]
async fn token_for_deleted_account_is_refused() {
    let store = store_with(ada());
    let token = jwt::issue_access_token(&SECRET, "u-1", "Ada", "employee", Some("org-5")).unwrap();

    store.remove("u-1");

    let err = authenticate(Some(&token), &SECRET, &store).await.unwrap_err();
    assert!(matches!(err, AuthError::UnknownIdentity));
    assert_eq!(err.close_code(), 4003);
}

#[tokio::test]
async fn identity_comes_from_the_store_not_the_claims() {
    // Role was demoted after the token was issued; the store wins.
    let store = store_with(ada());

    let token = jwt::issue_access_token(&SECRET, "u-1", "Ada", "admin", Some("org-5")).unwrap();
    let identity = authenticate(Some(&token), &SECRET, &store).await.unwrap();
    assert_eq!(identity.role, "employee");
    assert!(!identity.is_admin());
}

#[tokio::test]
async fn lookup_is_the_trait_contract() {
    let store = store_with(ada());
    assert!(store.lookup("u-1").await.unwrap().is_some());
    assert!(store.lookup("u-404").await.unwrap().is_none());
}

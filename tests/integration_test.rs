use hardened_demo::config::{AppConfig, ConfigError};
use hardened_demo::hashing::{PasswordDigest, PasswordHasher};
use hardened_demo::sanitizer::{IdentifierSanitizer, RegisterRequest, RegistrationSanitizer};
use hardened_demo::store::UserStore;
use hardened_demo::{Sanitizer, Secret, Tainted};

#[test]
fn secret_is_fully_redacted() {
    let api_key = Secret::new("sk-secret123".to_string());

    let debug_out = format!("{:?}", api_key);
    assert_eq!(debug_out, "[REDACTED]");
    assert!(!debug_out.contains("sk-secret"));
    assert!(!debug_out.contains("String")); // No type info leaked

    let display_out = format!("{}", api_key);
    assert_eq!(display_out, "[REDACTED]");
}

#[test]
fn tainted_prevents_misuse() {
    let user_input = Tainted::new("'; DROP TABLE users;".to_string());

    let debug_out = format!("{:?}", user_input);
    assert!(debug_out.contains("Tainted"));
    assert!(!debug_out.contains("DROP"));

    // Not usable as a String; this would fail to compile:
    // let _s: String = user_input;
}

#[test]
fn missing_secret_fails_before_anything_starts() {
    let err = AppConfig::from_lookup(|name| match name {
        "API_KEY" => Some("k".to_string()),
        "JWT_SECRET" => Some("j".to_string()),
        _ => None,
    })
    .unwrap_err();

    assert_eq!(err, ConfigError::MissingSecrets(vec!["DB_PASSWORD"]));
    assert!(err.to_string().contains("DB_PASSWORD"));
}

#[tokio::test]
async fn identifier_flows_into_parameterized_lookup() {
    let store = UserStore::open_in_memory().unwrap();

    let id = IdentifierSanitizer
        .sanitize(Tainted::new("2".to_string()))
        .unwrap();
    let rows = store.find_by_id(&id).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Jane Smith");
    assert_eq!(rows[0].email, "jane@example.com");

    assert!(IdentifierSanitizer
        .sanitize(Tainted::new("2 OR 1=1".to_string()))
        .is_err());
}

#[tokio::test]
async fn registration_stores_only_a_salted_digest() {
    let store = UserStore::open_in_memory().unwrap();
    let hasher = PasswordHasher::new();

    let registration = RegistrationSanitizer
        .sanitize(Tainted::new(RegisterRequest {
            username: "bob_smith".into(),
            email: "  Bob@Example.com ".into(),
            password: "hunter2hunter2".into(),
        }))
        .unwrap();
    assert!(!format!("{:?}", registration).contains("hunter2"));

    let digest = hasher.hash(&registration.as_ref().password);
    let user = store.insert(registration, digest).await.unwrap();
    assert_eq!(user.email, "bob@example.com");

    let (_, stored) = store
        .find_credentials_by_email("bob@example.com")
        .await
        .unwrap()
        .unwrap();
    let stored: PasswordDigest = stored.unwrap();

    assert!(!stored.encode().contains("hunter2"));
    assert!(hasher.verify(&Secret::new("hunter2hunter2".to_string()), &stored));
    assert!(!hasher.verify(&Secret::new("hunter3hunter3".to_string()), &stored));

    store.close().unwrap();
}

use authgate::auth::claims::now_epoch_seconds;
use authgate::auth::{
    token, AuthEngine, AuthRequest, BasicFn, Decision, Identity, Reason, StaticKeyVerifier,
};
use authgate::config::PatternConfig;
use authgate::{AuthSettings, GateError, Scheme};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use http::{Method, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn compact_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}

fn api_settings(scheme: Scheme) -> AuthSettings {
    AuthSettings {
        scheme,
        public_paths: vec![PatternConfig::Prefix("/api/public".to_string())],
        protected_paths: vec![PatternConfig::Prefix("/api/".to_string())],
        roles: HashMap::from([("/api/admin".to_string(), vec!["admin".to_string()])]),
        ..Default::default()
    }
}

fn jwt_engine() -> AuthEngine {
    AuthEngine::builder(api_settings(Scheme::Jwt)).build().unwrap()
}

async fn evaluate(engine: &AuthEngine, path: &str, authorization: Option<&str>) -> Decision {
    let method = Method::GET;
    let request = AuthRequest::new(&method, path).with_authorization(authorization);
    engine.evaluate(&request).await
}

#[tokio::test]
async fn public_paths_allow_any_header() {
    let engine = jwt_engine();
    for header in [
        None,
        Some("Bearer definitely.not.valid"),
        Some("Basic %%%"),
        Some("garbage"),
    ] {
        let decision = evaluate(&engine, "/api/public/status", header).await;
        assert_eq!(
            decision,
            Decision::Allow {
                identity: None,
                reason: Reason::PublicPath
            }
        );
    }
}

#[tokio::test]
async fn protected_path_without_header_is_unauthorized() {
    let engine = jwt_engine();
    let decision = evaluate(&engine, "/api/orders", None).await;
    assert!(matches!(decision, Decision::Unauthorized(_)));
    assert_eq!(decision.status(), Some(StatusCode::UNAUTHORIZED));
}

#[test]
fn compact_token_round_trip() {
    let token = compact_token(&json!({"sub": "user-1", "exp": now_epoch_seconds() + 3600}));
    let claims = token::decode(&token).unwrap();
    assert_eq!(claims.get("sub"), Some(&json!("user-1")));
}

#[tokio::test]
async fn jwt_valid_and_expired_tokens() {
    let engine = jwt_engine();

    let fresh = compact_token(&json!({"sub": "u1", "exp": now_epoch_seconds() + 60}));
    let decision = evaluate(&engine, "/api/orders", Some(&format!("Bearer {}", fresh))).await;
    assert!(decision.is_allowed());
    let identity = decision.identity().unwrap();
    assert_eq!(identity.id.to_string(), "u1");
    assert!(identity.roles.is_empty());

    let stale = compact_token(&json!({"sub": "u1", "exp": now_epoch_seconds() - 60}));
    let decision = evaluate(&engine, "/api/orders", Some(&format!("Bearer {}", stale))).await;
    assert_eq!(decision.status(), Some(StatusCode::UNAUTHORIZED));
    assert!(matches!(decision.reason(), Reason::ClaimsRejected(_)));
}

#[tokio::test]
async fn jwt_role_policy() {
    let engine = jwt_engine();
    let exp = now_epoch_seconds() + 600;

    let user = compact_token(&json!({"sub": "u1", "exp": exp, "roles": ["user"]}));
    let decision = evaluate(&engine, "/api/admin", Some(&format!("Bearer {}", user))).await;
    assert!(matches!(decision, Decision::Forbidden(_)));
    assert_eq!(decision.status(), Some(StatusCode::FORBIDDEN));

    let admin = compact_token(&json!({"sub": "u2", "exp": exp, "roles": ["admin"]}));
    let decision = evaluate(&engine, "/api/admin", Some(&format!("Bearer {}", admin))).await;
    assert!(decision.is_allowed());
}

#[tokio::test]
async fn jwt_issuer_and_audience() {
    let settings = AuthSettings {
        issuer: Some("https://idp.example.com".to_string()),
        audience: Some("orders".to_string()),
        ..api_settings(Scheme::Jwt)
    };
    let engine = AuthEngine::builder(settings).build().unwrap();

    let good = compact_token(&json!({"sub": "u1", "iss": "https://idp.example.com", "aud": "orders"}));
    let decision = evaluate(&engine, "/api/orders", Some(&format!("Bearer {}", good))).await;
    assert!(decision.is_allowed());

    let wrong = compact_token(&json!({"sub": "u1", "iss": "https://idp.example.com", "aud": "billing"}));
    let decision = evaluate(&engine, "/api/orders", Some(&format!("Bearer {}", wrong))).await;
    assert_eq!(decision.status(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn jwt_with_signature_verifier_rejects_forged_token() {
    let engine = AuthEngine::builder(AuthSettings {
        require_signature: true,
        ..api_settings(Scheme::Jwt)
    })
    .signature_verifier(Arc::new(StaticKeyVerifier::hmac(b"server-secret")))
    .build()
    .unwrap();

    let forged = compact_token(&json!({"sub": "u1", "roles": ["admin"]}));
    let decision = evaluate(&engine, "/api/admin", Some(&format!("Bearer {}", forged))).await;
    assert_eq!(decision.reason(), Reason::VerifierFailed);

    let signed = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({"sub": "u1", "roles": ["admin"], "exp": now_epoch_seconds() + 60}),
        &jsonwebtoken::EncodingKey::from_secret(b"server-secret"),
    )
    .unwrap();
    let decision = evaluate(&engine, "/api/admin", Some(&format!("Bearer {}", signed))).await;
    assert!(decision.is_allowed());
}

#[tokio::test]
async fn non_numeric_expiry_is_unauthorized() {
    let engine = jwt_engine();
    let token = compact_token(&json!({"sub": "u1", "exp": "never"}));
    let decision = evaluate(&engine, "/api/orders", Some(&format!("Bearer {}", token))).await;
    assert_eq!(decision.status(), Some(StatusCode::UNAUTHORIZED));
    assert!(matches!(decision.reason(), Reason::ClaimsRejected(_)));
}

#[tokio::test]
async fn malformed_token_is_unauthorized() {
    let engine = jwt_engine();
    for header in ["Bearer a.b", "Bearer a.b.c.d", "Bearer x.!!!.y", "Token abc"] {
        let decision = evaluate(&engine, "/api/orders", Some(header)).await;
        assert_eq!(decision.status(), Some(StatusCode::UNAUTHORIZED), "{}", header);
    }
}

fn basic_engine() -> AuthEngine {
    AuthEngine::builder(api_settings(Scheme::Basic))
        .basic_verifier(Arc::new(BasicFn(|username: String, password: String| async move {
            Ok::<_, GateError>(
                (username == "admin" && password == "secret")
                    .then(|| Identity::new("admin").with_username("admin")),
            )
        })))
        .build()
        .unwrap()
}

#[tokio::test]
async fn basic_scheme_accepts_only_known_pair() {
    let engine = basic_engine();

    let good = format!("Basic {}", STANDARD.encode("admin:secret"));
    let decision = evaluate(&engine, "/api/orders", Some(&good)).await;
    assert!(decision.is_allowed());
    assert_eq!(
        decision.identity().and_then(|i| i.username.as_deref()),
        Some("admin")
    );

    let bad = format!("Basic {}", STANDARD.encode("admin:wrong"));
    match evaluate(&engine, "/api/orders", Some(&bad)).await {
        Decision::Unauthorized(rejection) => {
            assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);
            let challenge = rejection.challenge.unwrap();
            assert!(challenge.starts_with("Basic realm="));
        }
        other => panic!("unexpected decision: {:?}", other),
    }
}

#[tokio::test]
async fn evaluation_is_idempotent() {
    let engine = basic_engine();
    let header = format!("Basic {}", STANDARD.encode("admin:secret"));

    let first = evaluate(&engine, "/api/admin", Some(&header)).await;
    let second = evaluate(&engine, "/api/admin", Some(&header)).await;
    assert_eq!(first, second);

    let first = evaluate(&engine, "/api/orders", None).await;
    let second = evaluate(&engine, "/api/orders", None).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn rejection_body_is_generic() {
    let engine = jwt_engine();
    let stale = compact_token(&json!({"sub": "u1", "exp": 1}));
    let decision = evaluate(&engine, "/api/orders", Some(&format!("Bearer {}", stale))).await;
    match decision {
        Decision::Unauthorized(rejection) => {
            assert_eq!(rejection.body(), json!({"error": "Unauthorized"}));
        }
        other => panic!("unexpected decision: {:?}", other),
    }
}

//! Tests for auth module
//!
//! These tests verify:
//! - Reconciliation keyed by email (create, then update in place)
//! - Credential issuance and validation against the store
//! - Provider URL construction and profile normalization
//! - Callback redirect encoding

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::test_support::{identity_service, profile, seed_user, setup_test_db, TEST_SECRET};
    use crate::common::{config::ProviderCredentials, ApiError};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use models::{Claims, Provider, ProviderProfile, User};
    use serde_json::json;

    async fn count_users(pool: &sqlx::SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    // ============================================================================
    // Reconciliation
    // ============================================================================

    #[tokio::test]
    async fn test_login_twice_keeps_one_row_and_advances_last_login() {
        let pool = setup_test_db().await;
        let service = identity_service(&pool);
        let first_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let second_at = first_at + Duration::minutes(5);
        let login = ProviderProfile {
            email: Some("t@example.com".to_string()),
            first_name: Some("T".to_string()),
            last_name: Some("U".to_string()),
            picture: None,
            provider_id: "google-1".to_string(),
        };

        let first = service
            .social_login_at(Provider::Google, &login, first_at)
            .await
            .unwrap();
        let second = service
            .social_login_at(Provider::Google, &login, second_at)
            .await
            .unwrap();

        assert_eq!(count_users(&pool).await, 1);
        assert_eq!(first.user.id, second.user.id);
        assert_eq!(first.user.email, "t@example.com");
        assert_eq!(first.user.name, "T U");
        assert_eq!(second.user.name, "T U");

        let first_login = DateTime::parse_from_rfc3339(&first.user.last_login_at).unwrap();
        let second_login = DateTime::parse_from_rfc3339(&second.user.last_login_at).unwrap();
        assert!(second_login > first_login);
    }

    #[tokio::test]
    async fn test_repeat_login_refreshes_profile_fields_but_not_identity() {
        let pool = setup_test_db().await;
        let service = identity_service(&pool);

        let created = seed_user(&pool, "jane@example.com", "Jane", "Doe").await;

        let refreshed = ProviderProfile {
            email: Some("Jane@Example.com ".to_string()),
            first_name: Some("Janet".to_string()),
            last_name: Some("Doe".to_string()),
            picture: Some("https://img.example.com/new.jpg".to_string()),
            provider_id: "fb-99".to_string(),
        };
        let updated = service
            .social_login(Provider::Facebook, &refreshed)
            .await
            .unwrap();

        assert_eq!(updated.user.id, created.user.id);
        assert_eq!(updated.user.email, "jane@example.com");
        assert_eq!(updated.user.name, "Janet Doe");
        assert_eq!(updated.user.avatar, "https://img.example.com/new.jpg");
        assert_eq!(updated.user.provider, "facebook");

        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(&created.user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.provider_id.as_deref(), Some("fb-99"));
    }

    #[tokio::test]
    async fn test_repeat_login_without_picture_keeps_avatar() {
        let pool = setup_test_db().await;
        let created = seed_user(&pool, "sam@example.com", "Sam", "Lee").await;

        let mut again = profile("sam@example.com", "Sam", "Lee");
        again.picture = None;
        let updated = identity_service(&pool)
            .social_login(Provider::Google, &again)
            .await
            .unwrap();

        assert_eq!(updated.user.avatar, created.user.avatar);
    }

    #[tokio::test]
    async fn test_login_without_email_fails_before_any_write() {
        let pool = setup_test_db().await;
        let mut no_email = profile("x@example.com", "No", "Mail");
        no_email.email = None;

        let result = identity_service(&pool)
            .social_login(Provider::Facebook, &no_email)
            .await;

        match result {
            Err(ApiError::ValidationError(msg)) => assert_eq!(msg, "email: Email is required"),
            other => panic!("expected validation error, got {:?}", other.map(|r| r.user)),
        }
        assert_eq!(count_users(&pool).await, 0);

        no_email.email = Some("   ".to_string());
        assert!(identity_service(&pool)
            .social_login(Provider::Facebook, &no_email)
            .await
            .is_err());
        assert_eq!(count_users(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_name_falls_back_to_email_local_part() {
        let pool = setup_test_db().await;
        let nameless = ProviderProfile {
            email: Some("ghost@example.com".to_string()),
            provider_id: "google-ghost".to_string(),
            ..Default::default()
        };

        let auth = identity_service(&pool)
            .social_login(Provider::Google, &nameless)
            .await
            .unwrap();

        assert_eq!(auth.user.name, "ghost");
        assert_eq!(auth.user.avatar, "");
    }

    #[tokio::test]
    async fn test_store_failure_propagates_as_database_error() {
        let pool = setup_test_db().await;
        sqlx::query("DROP TABLE users").execute(&pool).await.unwrap();

        let result = identity_service(&pool)
            .social_login(Provider::Google, &profile("a@example.com", "A", "B"))
            .await;

        assert!(matches!(result, Err(ApiError::DatabaseError(_))));
    }

    // ============================================================================
    // Credentials
    // ============================================================================

    #[tokio::test]
    async fn test_issued_token_validates_to_same_user() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice@example.com", "Alice", "A").await;
        let bob = seed_user(&pool, "bob@example.com", "Bob", "B").await;

        let service = identity_service(&pool);
        let validated = service.validate_token(&alice.access_token).await.unwrap();

        assert_eq!(validated.id, alice.user.id);
        assert_eq!(validated.email, "alice@example.com");
        assert_eq!(validated.provider, "google");
        assert_ne!(validated.id, bob.user.id);

        let claims = token::decode_token(TEST_SECRET, &alice.access_token).unwrap();
        assert_eq!(claims.sub, alice.user.id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.provider, Provider::Google);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[tokio::test]
    async fn test_validation_uses_store_state_not_claims() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice@example.com", "Alice", "A").await;

        sqlx::query("UPDATE users SET name = 'Renamed' WHERE id = ?")
            .bind(&alice.user.id)
            .execute(&pool)
            .await
            .unwrap();

        let validated = identity_service(&pool)
            .validate_token(&alice.access_token)
            .await
            .unwrap();
        assert_eq!(validated.name, "Renamed");
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice@example.com", "Alice", "A").await;

        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: alice.user.id.clone(),
            email: alice.user.email.clone(),
            provider: Provider::Google,
            iat: now - 7200,
            exp: now - 3600,
        };
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let result = identity_service(&pool).validate_token(&expired).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice@example.com", "Alice", "A").await;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(&alice.user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        let forged =
            token::issue_token("wrong_secret_key", Duration::hours(1), &user, Utc::now()).unwrap();

        let result = identity_service(&pool).validate_token(&forged).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));

        let garbage = identity_service(&pool).validate_token("not.a.jwt").await;
        assert!(matches!(garbage, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_token_for_deleted_user_is_rejected() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice@example.com", "Alice", "A").await;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(&alice.user.id)
            .execute(&pool)
            .await
            .unwrap();

        match identity_service(&pool).validate_token(&alice.access_token).await {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, "User not found"),
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(extractors::bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extractors::bearer_token("abc.def"), Some("abc.def"));
        assert_eq!(extractors::bearer_token("Bearer "), None);
    }

    // ============================================================================
    // Providers
    // ============================================================================

    fn credentials() -> ProviderCredentials {
        ProviderCredentials {
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
        }
    }

    #[test]
    fn test_provider_parsing_is_closed_set() {
        assert_eq!("google".parse::<Provider>(), Ok(Provider::Google));
        assert_eq!("FACEBOOK".parse::<Provider>(), Ok(Provider::Facebook));
        assert!("github".parse::<Provider>().is_err());
        assert_eq!(serde_json::to_value(Provider::Facebook).unwrap(), json!("facebook"));
    }

    #[test]
    fn test_google_authorize_url() {
        let callback = Provider::Google.callback_url("http://localhost:3000");
        assert_eq!(callback, "http://localhost:3000/api/auth/google/callback");

        let url = Provider::Google.authorize_url(&credentials(), &callback);
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid%20email%20profile"));
    }

    #[test]
    fn test_facebook_authorize_url() {
        let url = Provider::Facebook.authorize_url(&credentials(), "http://cb");
        assert!(url.starts_with("https://www.facebook.com/v18.0/dialog/oauth?"));
        assert!(url.contains("scope=email"));
    }

    #[test]
    fn test_unconfigured_provider_has_no_credentials() {
        let config = crate::common::AppConfig::for_tests();
        assert!(matches!(
            Provider::Google.credentials(&config),
            Err(providers::ProviderError::NotConfigured(Provider::Google))
        ));
    }

    #[test]
    fn test_normalize_google_profile() {
        let body = json!({
            "sub": "1234",
            "email": "t@example.com",
            "given_name": "T",
            "family_name": "U",
            "picture": "https://lh3.googleusercontent.com/a/x"
        });

        let profile = Provider::Google.normalize_profile(&body).unwrap();
        assert_eq!(profile.provider_id, "1234");
        assert_eq!(profile.email.as_deref(), Some("t@example.com"));
        assert_eq!(profile.display_name().as_deref(), Some("T U"));
        assert_eq!(
            profile.picture.as_deref(),
            Some("https://lh3.googleusercontent.com/a/x")
        );
    }

    #[test]
    fn test_normalize_facebook_profile_without_email() {
        let body = json!({
            "id": "fb-1",
            "first_name": "Face",
            "last_name": "Book",
            "picture": { "data": { "url": "https://graph.example.com/pic.jpg" } }
        });

        let profile = Provider::Facebook.normalize_profile(&body).unwrap();
        assert_eq!(profile.provider_id, "fb-1");
        assert_eq!(profile.email, None);
        assert_eq!(
            profile.picture.as_deref(),
            Some("https://graph.example.com/pic.jpg")
        );
    }

    #[test]
    fn test_normalize_profile_requires_subject() {
        let result = Provider::Google.normalize_profile(&json!({ "email": "a@b.c" }));
        assert!(matches!(result, Err(providers::ProviderError::Malformed(_))));
    }

    // ============================================================================
    // Callback redirects
    // ============================================================================

    #[tokio::test]
    async fn test_success_redirect_carries_token_and_user_json() {
        let pool = setup_test_db().await;
        let auth = seed_user(&pool, "t@example.com", "T", "U").await;

        let target = handlers::success_redirect("http://localhost:4200", &auth).unwrap();
        assert!(target.starts_with("http://localhost:4200/login?token="));

        let query = target.split_once('?').unwrap().1;
        let user_param = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("user="))
            .unwrap();
        let decoded = urlencoding::decode(user_param).unwrap();
        let user: serde_json::Value = serde_json::from_str(&decoded).unwrap();

        assert_eq!(user["email"], "t@example.com");
        assert_eq!(user["name"], "T U");
        assert_eq!(user["provider"], "google");
        assert!(user.get("lastLoginAt").is_some());
        assert!(user.get("provider_id").is_none());
        assert!(user.get("providerId").is_none());
    }

    #[test]
    fn test_failure_redirect() {
        assert_eq!(
            handlers::failure_redirect("http://localhost:4200"),
            "http://localhost:4200/login?error=Authentication%20failed"
        );
    }

    // ============================================================================
    // HTTP Routes
    // ============================================================================

    mod http {
        use super::*;
        use crate::common::test_support::test_state;
        use axum::{
            body::{to_bytes, Body},
            http::{header, Method, Request, StatusCode},
            response::Response,
            Router,
        };
        use tower::ServiceExt;

        async fn get(app: Router, uri: &str, token: Option<&str>) -> Response {
            let mut builder = Request::builder().method(Method::GET).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            app.oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap()
        }

        fn location(response: &Response) -> String {
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap()
                .to_string()
        }

        #[tokio::test]
        async fn test_unknown_provider_is_not_found() {
            let pool = setup_test_db().await;
            let app = crate::build_router(test_state(pool));

            let response = get(app, "/api/auth/twitter", None).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn test_unconfigured_provider_is_unavailable() {
            let pool = setup_test_db().await;
            let app = crate::build_router(test_state(pool));

            let response = get(app, "/api/auth/google", None).await;
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }

        #[tokio::test]
        async fn test_configured_provider_redirects_to_consent_page() {
            let pool = setup_test_db().await;
            let mut state = test_state(pool);
            state.config.google = Some(credentials());
            let app = crate::build_router(state);

            let response = get(app, "/api/auth/google", None).await;
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
            let target = location(&response);
            assert!(target.starts_with("https://accounts.google.com/"));
            assert!(target.contains("client_id=test_client_id"));
        }

        #[tokio::test]
        async fn test_denied_callback_redirects_with_error() {
            let pool = setup_test_db().await;
            let app = crate::build_router(test_state(pool.clone()));

            let response = get(app, "/api/auth/facebook/callback?error=access_denied", None).await;
            assert!(response.status().is_redirection());
            assert_eq!(
                location(&response),
                "http://localhost:4200/login?error=Authentication%20failed"
            );
            assert_eq!(count_users(&pool).await, 0);
        }

        #[tokio::test]
        async fn test_validate_endpoint() {
            let pool = setup_test_db().await;
            let auth = seed_user(&pool, "t@example.com", "T", "U").await;
            let app = crate::build_router(test_state(pool));

            let response = get(app.clone(), "/api/auth/validate", Some(&auth.access_token)).await;
            assert_eq!(response.status(), StatusCode::OK);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let user: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(user["id"], auth.user.id.as_str());
            assert_eq!(user["email"], "t@example.com");

            let response = get(app.clone(), "/api/auth/validate", None).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let response = get(app, "/api/auth/validate", Some("garbage")).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        #[tokio::test]
        async fn test_logout_requires_credential() {
            let pool = setup_test_db().await;
            let auth = seed_user(&pool, "t@example.com", "T", "U").await;
            let app = crate::build_router(test_state(pool));

            let request = |token: Option<&str>| {
                let mut builder = Request::builder().method(Method::POST).uri("/api/auth/logout");
                if let Some(token) = token {
                    builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
                }
                builder.body(Body::empty()).unwrap()
            };

            let response = app.clone().oneshot(request(None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let response = app.oneshot(request(Some(&auth.access_token))).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        #[tokio::test]
        async fn test_expired_credential_is_rejected_by_protected_routes() {
            let pool = setup_test_db().await;
            let alice = seed_user(&pool, "alice@example.com", "Alice", "A").await;
            let post = crate::blogs::services::PostsService::new(pool.clone())
                .create(
                    &alice.user.id,
                    crate::blogs::models::CreatePostRequest {
                        title: Some("Kept".to_string()),
                        content: Some("Body".to_string()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
                .bind(&alice.user.id)
                .fetch_one(&pool)
                .await
                .unwrap();
            let expired = token::issue_token(
                TEST_SECRET,
                Duration::hours(24),
                &user,
                Utc::now() - Duration::days(2),
            )
            .unwrap();

            let app = crate::build_router(test_state(pool.clone()));
            let post_uri = format!("/api/blogs/{}", post.id);
            let boundary = "----expiredcredential";
            let mut upload_body = format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
                b = boundary
            )
            .into_bytes();
            upload_body.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00]);
            upload_body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

            let requests = vec![
                Request::builder()
                    .method(Method::PUT)
                    .uri(&post_uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "title": "Changed" }).to_string())),
                Request::builder()
                    .method(Method::DELETE)
                    .uri(&post_uri)
                    .body(Body::empty()),
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/blogs/upload")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(upload_body)),
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/auth/logout")
                    .body(Body::empty()),
            ];

            for request in requests {
                let mut request = request.unwrap();
                let target = format!("{} {}", request.method(), request.uri());
                request.headers_mut().insert(
                    header::AUTHORIZATION,
                    format!("Bearer {}", expired).parse().unwrap(),
                );

                let response = app.clone().oneshot(request).await.unwrap();
                assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", target);
                let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
                let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
                assert_eq!(body["code"], "UNAUTHORIZED", "{}", target);
            }

            let title: String = sqlx::query_scalar("SELECT title FROM posts WHERE id = ?")
                .bind(&post.id)
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(title, "Kept");
        }
    }
}

use serde_json::json;

use crate::common::{TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_with_valid_credentials() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "alice", "password": "securepass"}),
            )
            .await;

        assert_eq!(res.status, 201);
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["username"], "alice");
    }

    #[tokio::test]
    async fn cannot_register_with_an_already_taken_username() {
        let app = TestApp::spawn().await;
        let body = json!({"username": "alice", "password": "securepass"});

        let first = app.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(first.status, 201, "First registration failed: {}", first.text);

        let res = app.post_without_token(routes::REGISTER, &body).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "USERNAME_TAKEN");
    }

    #[tokio::test]
    async fn cannot_register_with_a_password_that_is_too_short() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "alice", "password": "short"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "alice", "password": "wrongpass"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn token_identifies_the_caller() {
        let app = TestApp::spawn().await;
        let (token, user_id) = app.create_authenticated_user("alice").await;

        let res = app.get_with_token(routes::ME, &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], user_id);
        assert_eq!(res.body["username"], "alice");
    }

    #[tokio::test]
    async fn me_requires_a_token() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");

        let res = app.get_with_token(routes::ME, "not-a-jwt").await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}

mod docs {
    use super::*;

    #[tokio::test]
    async fn openapi_document_lists_the_routes() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token("/api-docs/openapi.json").await;

        assert_eq!(res.status, 200);
        assert!(res.body["paths"]["/auth/login"]["post"].is_object());
        assert!(res.body["paths"]["/car-ads/create"]["post"].is_object());
        assert!(res.body["components"]["securitySchemes"]["jwt"].is_object());
    }

    #[tokio::test]
    async fn auth_schemas_describe_their_fields() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token("/api-docs/openapi.json").await;
        let schemas = &res.body["components"]["schemas"];

        for (schema, field) in [
            ("LoginRequest", "username"),
            ("LoginRequest", "password"),
            ("RegisterResponse", "id"),
            ("LoginResponse", "user_id"),
            ("MeResponse", "username"),
        ] {
            assert!(
                schemas[schema]["properties"][field]["description"].is_string(),
                "{schema}.{field} has no description"
            );
        }
    }
}

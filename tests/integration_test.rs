#[cfg(test)]
mod tests {
    use academic_nft::api::server::create_app;
    use academic_nft::api::AppState;
    use academic_nft::auth::{Claims, InMemorySessionStore};
    use academic_nft::db::InMemoryStore;
    use academic_nft::rules::RuleTable;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "integration-secret";

    fn test_app() -> Router {
        create_app(AppState {
            store: Arc::new(InMemoryStore::new()),
            rules: Arc::new(RuleTable::builtin()),
            sessions: Arc::new(InMemorySessionStore::new(chrono::Duration::hours(1))),
            jwt_secret: Arc::from(SECRET),
            image_base_uri: Arc::from("ipfs://academic-nft"),
        })
    }

    fn bearer(owner_id: &str, session_id: &str) -> String {
        let claims = Claims {
            sub: owner_id.to_string(),
            sid: session_id.to_string(),
            exp: Utc::now().timestamp() + 3600,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        format!("Bearer {}", token)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            request = request.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    /// Submit and verify an achievement, returning the minted token
    async fn mint(app: &Router, auth: &str, submission: Value, signal: Value) -> Value {
        let (status, achievement) = send(app, Method::POST, "/achievements", Some(auth), Some(submission)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", achievement);

        let uri = format!("/internal/achievements/{}/verify", achievement["id"]);
        let (status, minted) = send(app, Method::POST, &uri, None, Some(signal)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", minted);
        minted["token"].clone()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_gpa_token_evolution_flow() {
        let app = test_app();
        let alice = bearer("0xalice", "alice-session");

        let token = mint(
            &app,
            &alice,
            json!({ "type": "gpa", "gpa_value": "3.6", "title": "Dean's list" }),
            json!({}),
        )
        .await;
        assert_eq!(token["nft_type"], "gpa_guardian");
        assert_eq!(token["level"], 1);
        assert_eq!(token["rarity"], "common");
        assert_eq!(token["evolution_points"], 60);

        let evolve_uri = format!("/tokens/{}/evolve", token["id"]);
        let (status, body) = send(&app, Method::POST, &evolve_uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "insufficient_points");
        assert_eq!(body["required"], 100);
        assert_eq!(body["current"], 60);

        let points_uri = format!("/internal/tokens/{}/points", token["id"]);
        let (status, body) = send(
            &app,
            Method::POST,
            &points_uri,
            None,
            Some(json!({ "amount": 40, "reason": "peer tutoring" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token"]["evolution_points"], 100);
        assert_eq!(body["award"]["can_evolve"], true);
        assert_eq!(body["token"]["level"], 1);

        let (status, body) = send(&app, Method::POST, &evolve_uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["token"]["level"], 2);
        assert_eq!(body["token"]["rarity"], "rare");
        assert_eq!(body["token"]["evolution_points"], 0);
        assert_eq!(body["evolution"]["unlocked_bonuses"], json!(["profile_badge"]));

        let history_uri = format!("/tokens/{}/history", token["id"]);
        let (status, body) = send(&app, Method::GET, &history_uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        let deltas: Vec<i64> = body["events"]
            .as_array()
            .unwrap()
            .iter()
            .map(|event| event["delta"].as_i64().unwrap())
            .collect();
        assert_eq!(deltas, vec![60, 40, -100]);
    }

    #[tokio::test]
    async fn test_max_level_is_terminal() {
        let app = test_app();
        let alice = bearer("0xalice", "alice-session");
        let token = mint(&app, &alice, json!({ "type": "leadership" }), json!({})).await;

        let points_uri = format!("/internal/tokens/{}/points", token["id"]);
        let (status, _) = send(
            &app,
            Method::POST,
            &points_uri,
            None,
            Some(json!({ "amount": 5000, "reason": "student body president" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let evolve_uri = format!("/tokens/{}/evolve", token["id"]);
        for expected_level in 2..=5 {
            let (status, body) = send(&app, Method::POST, &evolve_uri, Some(&alice), None).await;
            assert_eq!(status, StatusCode::OK, "{}", body);
            assert_eq!(body["token"]["level"], expected_level);
        }

        let (status, body) = send(&app, Method::POST, &evolve_uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "max_level_reached");

        // 70 + 5000 - (100 + 250 + 500 + 1000)
        let (_, stored) = send(&app, Method::GET, &format!("/tokens/{}", token["id"]), None, None).await;
        assert_eq!(stored["evolution_points"], 3220);
        assert_eq!(stored["rarity"], "mythic");
    }

    #[tokio::test]
    async fn test_composite_flow() {
        let app = test_app();
        let alice = bearer("0xalice", "alice-session");

        let gpa = mint(&app, &alice, json!({ "type": "gpa", "gpa_value": "3.9" }), json!({})).await;
        let research = mint(
            &app,
            &alice,
            json!({ "type": "research", "institution": "University of Cambridge" }),
            json!({ "confidence": 93, "recommended_action": "approve" }),
        )
        .await;
        // 80 + 20 + 15
        assert_eq!(research["evolution_points"], 115);

        let (status, opportunities) =
            send(&app, Method::GET, "/owners/0xalice/stacking-opportunities", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let opportunities = opportunities.as_array().unwrap().clone();
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0]["rule"]["result_type"], "academic_titan");
        assert_eq!(opportunities[0]["rule"]["rarity"], "epic");
        assert_eq!(opportunities[0]["rule"]["bonus_points"], 200);
        assert_eq!(opportunities[0]["can_create"], true);

        let (status, body) = send(
            &app,
            Method::POST,
            "/composites",
            Some(&alice),
            Some(json!({ "result_type": "academic_titan", "source_token_ids": [gpa["id"], research["id"]] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["achievement"]["type"], "composite");
        assert_eq!(body["achievement"]["verified"], true);
        assert_eq!(body["token"]["level"], 3);
        assert_eq!(body["token"]["rarity"], "epic");
        assert_eq!(body["token"]["evolution_points"], 200);
        assert_eq!(body["token"]["is_composite"], true);
        assert_eq!(
            body["token"]["stacked_achievement_ids"],
            json!([gpa["achievement_id"], research["achievement_id"]])
        );

        let (_, tokens) = send(&app, Method::GET, "/owners/0xalice/tokens", None, None).await;
        let tokens = tokens.as_array().unwrap().clone();
        assert_eq!(tokens.len(), 3);
        // Sources are untouched
        assert_eq!(tokens[0], gpa);
        assert_eq!(tokens[1], research);

        let (_, opportunities) =
            send(&app, Method::GET, "/owners/0xalice/stacking-opportunities", None, None).await;
        assert_eq!(opportunities, json!([]));

        let (status, body) = send(
            &app,
            Method::POST,
            "/composites",
            Some(&alice),
            Some(json!({ "result_type": "academic_titan", "source_token_ids": [gpa["id"], research["id"]] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_composite_rejects_foreign_and_unknown() {
        let app = test_app();
        let alice = bearer("0xalice", "alice-session");
        let bob = bearer("0xbob", "bob-session");

        let gpa = mint(&app, &alice, json!({ "type": "gpa", "gpa_value": "3.7" }), json!({})).await;
        let research = mint(&app, &bob, json!({ "type": "research" }), json!({})).await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/composites",
            Some(&alice),
            Some(json!({ "result_type": "academic_titan", "source_token_ids": [gpa["id"], research["id"]] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/composites",
            Some(&alice),
            Some(json!({ "result_type": "quantum_sage", "source_token_ids": [gpa["id"]] })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_auth_is_enforced() {
        let app = test_app();
        let alice = bearer("0xalice", "alice-session");
        let bob = bearer("0xbob", "bob-session");

        let (status, body) = send(
            &app,
            Method::POST,
            "/achievements",
            None,
            Some(json!({ "type": "research" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, _) = send(
            &app,
            Method::POST,
            "/achievements",
            Some("Bearer not-a-jwt"),
            Some(json!({ "type": "research" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = mint(&app, &alice, json!({ "type": "research" }), json!({})).await;
        let evolve_uri = format!("/tokens/{}/evolve", token["id"]);
        let (status, body) = send(&app, Method::POST, &evolve_uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let app = test_app();
        let alice = bearer("0xalice", "alice-session");

        let (status, body) = send(&app, Method::POST, "/auth/logout", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], "alice-session");
        assert_eq!(body["revoked"], true);

        let (status, _) = send(
            &app,
            Method::POST,
            "/achievements",
            Some(&alice),
            Some(json!({ "type": "research" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // A fresh session for the same owner still works
        let renewed = bearer("0xalice", "alice-session-2");
        let (status, _) = send(
            &app,
            Method::POST,
            "/achievements",
            Some(&renewed),
            Some(json!({ "type": "research" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_verification_rules() {
        let app = test_app();
        let alice = bearer("0xalice", "alice-session");

        let (status, body) = send(
            &app,
            Method::POST,
            "/achievements",
            Some(&alice),
            Some(json!({ "type": "gpa", "gpa_value": "3.1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");

        let (_, achievement) = send(
            &app,
            Method::POST,
            "/achievements",
            Some(&alice),
            Some(json!({ "type": "leadership" })),
        )
        .await;
        let verify_uri = format!("/internal/achievements/{}/verify", achievement["id"]);

        let (status, _) = send(&app, Method::POST, &verify_uri, None, Some(json!({ "confidence": 140 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, &verify_uri, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(&app, Method::POST, &verify_uri, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/internal/achievements/999/verify", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metadata_projection() {
        let app = test_app();
        let alice = bearer("0xalice", "alice-session");
        let token = mint(
            &app,
            &alice,
            json!({ "type": "gpa", "gpa_value": "3.75", "institution": "Stanford University" }),
            json!({}),
        )
        .await;

        let uri = format!("/achievements/{}/metadata", token["achievement_id"]);
        let (status, metadata) = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(metadata["image"], "ipfs://academic-nft/gpa/level-1/common.png");
        let traits: Vec<&str> = metadata["attributes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|attribute| attribute["trait_type"].as_str().unwrap())
            .collect();
        assert!(traits.contains(&"GPA"));
        assert!(traits.contains(&"Institution"));
        assert!(!traits.contains(&"Composite"));

        let (status, preview) = send(&app, Method::GET, &format!("{}?level=3", uri), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(preview["image"], "ipfs://academic-nft/gpa/level-3/epic.png");

        let (status, _) = send(&app, Method::GET, &format!("{}?level=9", uri), None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::GET, "/achievements/4242/metadata", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

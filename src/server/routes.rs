//! HTTP routes of the EmbedHub API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::services::ServeDir;

use super::handlers::{self, auth, drive, embeddings, github};
use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/auth/session", get(auth::session))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/{provider}/login", get(auth::login))
        .route("/api/auth/{provider}/callback", get(auth::callback))
        .route("/api/github/repos", get(github::list_repos))
        .route(
            "/api/github/repos/{owner}/{repo}/branches",
            get(github::list_branches),
        )
        .route("/api/github/scrape", post(github::scrape))
        .route("/api/github/archive", post(github::archive))
        .route("/api/github/embed", post(github::embed))
        .route("/api/drive/files", get(drive::list_files))
        .route("/api/drive/scrape", post(drive::scrape))
        .route("/api/drive/download", post(drive::download))
        .route("/api/drive/embed", post(drive::embed))
        .route("/api/embeddings", post(embeddings::create))
        .route("/api/search", post(embeddings::search))
        .route(
            "/api/namespaces/{*namespace}",
            delete(embeddings::delete_namespace),
        )
        .fallback_service(static_dir)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;

    use axum::body::{Body, to_bytes};
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{HeaderName, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::UserProfile;
    use crate::core::config::{AppConfig, OAuthClientConfig};
    use crate::core::provider::Provider;
    use crate::ingest::pipeline::tests::{FakeEmbedder, test_app_config};
    use crate::server::extract::SESSION_COOKIE;
    use crate::sources::drive::client::tests::fake_drive;
    use crate::sources::github::client::tests::{fake_github, serve, test_config};
    use crate::storage::{SqliteVectorStore, init_sqlite_vec_extension};

    async fn app_state() -> Arc<AppState> {
        let base = serve(fake_github(Arc::new(AtomicUsize::new(0))).merge(fake_drive())).await;
        let mut config: AppConfig = test_app_config();
        config.sources = test_config(&base);
        config.auth.github = Some(OAuthClientConfig {
            client_id: "gh-id".to_string(),
            client_secret: "gh-secret".to_string(),
        });

        init_sqlite_vec_extension();
        let store = SqliteVectorStore::in_memory("embeddings", 3).await.unwrap();
        AppState::with_backends(config, Arc::new(FakeEmbedder { dims: 3 }), Arc::new(store))
            .unwrap()
    }

    fn sign_in(state: &AppState, provider: Provider) -> String {
        let session = state.sessions.create(
            provider,
            UserProfile {
                id: "1".to_string(),
                name: "Octo Cat".to_string(),
                email: None,
                avatar_url: None,
            },
            "good".to_string(),
            None,
        );
        format!("{SESSION_COOKIE}={}", session.id)
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> Response {
        create_router(Arc::clone(state)).oneshot(request).await.unwrap()
    }

    fn post_json(uri: &str, auth: (HeaderName, &str), body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(auth.0, auth.1)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let state = app_state().await;
        let response = send(
            &state,
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "embedhub");
    }

    #[tokio::test]
    async fn test_session_requires_cookie() {
        let state = app_state().await;
        let response = send(
            &state,
            Request::builder()
                .uri("/api/auth/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Not signed in");

        let cookie = sign_in(&state, Provider::Github);
        let response = send(
            &state,
            Request::builder()
                .uri("/api/auth/session")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["provider"], "github");
        assert_eq!(body["user"]["name"], "Octo Cat");
        assert!(body.get("access_token").is_none());
    }

    #[tokio::test]
    async fn test_login_redirects_with_state() {
        let state = app_state().await;
        let response = send(
            &state,
            Request::builder()
                .uri("/api/auth/github/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(location.contains("client_id=gh-id"));
        assert!(location.contains("state="));

        let google = send(
            &state,
            Request::builder()
                .uri("/api/auth/google/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(google.status(), StatusCode::NOT_FOUND);

        let unknown = send(
            &state,
            Request::builder()
                .uri("/api/auth/gitlab/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_callback_rejects_unknown_state_and_provider_errors() {
        let state = app_state().await;
        let response = send(
            &state,
            Request::builder()
                .uri("/api/auth/github/callback?code=abc&state=forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let denied = send(
            &state,
            Request::builder()
                .uri("/api/auth/github/callback?error=access_denied&error_description=User%20said%20no")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(denied).await["error"], "User said no");
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let state = app_state().await;
        let cookie = sign_in(&state, Provider::Google);
        assert_eq!(state.sessions.len(), 1);

        let response = send(
            &state,
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=0"));
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_github_repos_and_branches() {
        let state = app_state().await;
        let cookie = sign_in(&state, Provider::Github);

        let repos = send(
            &state,
            Request::builder()
                .uri("/api/github/repos?page=2")
                .header(COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(repos.status(), StatusCode::OK);
        assert_eq!(json_body(repos).await[0]["name"], "hello-2");

        let branches = send(
            &state,
            Request::builder()
                .uri("/api/github/repos/octo/hello/branches")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(json_body(branches).await, json!(["main", "dev"]));
    }

    #[tokio::test]
    async fn test_wrong_provider_session_is_unauthorized() {
        let state = app_state().await;
        let cookie = sign_in(&state, Provider::Google);
        let response = send(
            &state,
            Request::builder()
                .uri("/api/github/repos")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_github_scrape_with_bearer_token() {
        let state = app_state().await;
        let body = json!({
            "selected_repos": [{"html_url": "https://github.com/octo/hello"}],
            "include_archive": true
        });
        let response = send(
            &state,
            post_json("/api/github/scrape", (AUTHORIZATION, "Bearer good"), &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;

        let paths: Vec<&str> = body["files_data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["README.md", "src/lib.rs", "docs/guide.md"]);
        assert_eq!(body["extensions"], json!(["md", "rs"]));
        assert_eq!(body["skipped"][0]["path"], "big.txt");
        assert!(
            body["formatted_text"]
                .as_str()
                .unwrap()
                .starts_with("Repository: hello\nFile: README.md\n\n# Hello")
        );
        assert!(body["archive_base64"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_github_scrape_rejects_empty_selection() {
        let state = app_state().await;
        let body = json!({"selected_repos": []});
        let response = send(
            &state,
            post_json("/api/github/scrape", (AUTHORIZATION, "Bearer good"), &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No repositories selected.");
    }

    #[tokio::test]
    async fn test_github_scrape_bad_token_is_unauthorized() {
        let state = app_state().await;
        let body = json!({"selected_repos": [{"html_url": "https://github.com/octo/hello/tree/main"}]});
        let response = send(
            &state,
            post_json("/api/github/scrape", (AUTHORIZATION, "Bearer bad"), &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_github_archive_is_zip() {
        let state = app_state().await;
        let body = json!({"selected_repos": [{"html_url": "https://github.com/octo/hello"}]});
        let response = send(
            &state,
            post_json("/api/github/archive", (AUTHORIZATION, "Bearer good"), &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/zip");
        assert!(
            response.headers()["content-disposition"]
                .to_str()
                .unwrap()
                .contains("repository_contents.zip")
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["hello/README.md", "hello/docs/guide.md", "hello/src/lib.rs"]
        );
    }

    #[tokio::test]
    async fn test_drive_scrape_and_download() {
        let state = app_state().await;
        let cookie = sign_in(&state, Provider::Google);

        let body = json!({"file_ids": ["doc1", "form1"]});
        let response = send(
            &state,
            post_json("/api/drive/scrape", (COOKIE, &cookie), &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let scraped = json_body(response).await;
        assert_eq!(scraped["files"][0]["content"], "The plan");
        assert_eq!(scraped["failed"][0]["file_id"], "form1");

        let empty = json!({"file_ids": []});
        let response = send(
            &state,
            post_json("/api/drive/scrape", (COOKIE, &cookie), &empty),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file IDs provided");

        let body = json!({"file_ids": ["doc1", "note1"]});
        let response = send(
            &state,
            post_json("/api/drive/download", (COOKIE, &cookie), &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Plan.txt", "notes.md"]);
    }

    #[tokio::test]
    async fn test_drive_files_without_token() {
        let state = app_state().await;
        let response = send(
            &state,
            Request::builder()
                .uri("/api/drive/files")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_embed_search_delete() {
        let state = app_state().await;
        let cookie = sign_in(&state, Provider::Github);

        let body = json!({
            "text": "alpha beta gamma",
            "provider": "github",
            "namespace": "octo/hello/main/README.md",
            "resourceId": "github/octo/hello"
        });
        let response = send(
            &state,
            post_json("/api/embeddings", (COOKIE, &cookie), &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let created = json_body(response).await;
        assert_eq!(created["message"], "Embeddings created and stored successfully");
        assert_eq!(created["chunk_count"], 1);
        assert_eq!(created["namespace"], "octo/hello/main/README.md");

        let body = json!({"namespace": "octo/hello/main/README.md", "query": "alpha"});
        let response = send(
            &state,
            post_json("/api/search", (COOKIE, &cookie), &body),
        )
        .await;
        let hits = json_body(response).await;
        assert_eq!(hits[0]["text"], "alpha beta gamma");
        assert_eq!(hits[0]["resource_id"], "github/octo/hello");

        let response = send(
            &state,
            Request::builder()
                .method("DELETE")
                .uri("/api/namespaces/octo/hello/main/README.md")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let ns = crate::ingest::Namespace::new("octo/hello/main/README.md").unwrap();
        assert_eq!(state.pipeline.count(&ns).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embeddings_reject_blank_input() {
        let state = app_state().await;
        let cookie = sign_in(&state, Provider::Github);

        for (text, namespace, error) in [
            ("   ", "drive/abc", "text is empty"),
            ("hello", "  ", "namespace must not be empty"),
        ] {
            let body = json!({
                "text": text,
                "provider": "google-drive",
                "namespace": namespace,
                "resourceId": "google-drive/abc"
            });
            let response = send(
                &state,
                post_json("/api/embeddings", (COOKIE, &cookie), &body),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["error"], error);
        }
    }

    #[tokio::test]
    async fn test_drive_embed_uses_file_namespace() {
        let state = app_state().await;
        let cookie = sign_in(&state, Provider::Google);
        let body = json!({"files": [
            {"file_id": "doc1", "name": "Plan", "content": "The plan"},
            {"file_id": "empty1", "content": "  "}
        ]});
        let response = send(
            &state,
            post_json("/api/drive/embed", (COOKIE, &cookie), &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["results"][0]["namespace"], "drive/doc1");
        assert_eq!(body["results"][0]["resource_id"], "google-drive/doc1");
        assert_eq!(body["skipped"][0]["id"], "empty1");
    }

    #[tokio::test]
    async fn test_github_embed_uses_file_namespace() {
        let state = app_state().await;
        let cookie = sign_in(&state, Provider::Github);
        let body = json!({
            "owner": "octo",
            "repo": "hello",
            "branch": "main",
            "files": [
                {"path": "/src/lib.rs", "text": "pub fn hello() {}"},
                {"path": "empty.txt", "text": " \n "}
            ]
        });
        let response = send(
            &state,
            post_json("/api/github/embed", (COOKIE, &cookie), &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["results"][0]["namespace"], "octo/hello/main/src/lib.rs");
        assert_eq!(body["results"][0]["resource_id"], "github/octo/hello");
        assert_eq!(body["skipped"][0]["id"], "empty.txt");
        assert_eq!(body["skipped"][0]["reason"], "text is empty");

        let ns = crate::ingest::Namespace::new("octo/hello/main/src/lib.rs").unwrap();
        assert_eq!(state.pipeline.count(&ns).await.unwrap(), 1);

        let body = json!({"owner": "octo", "repo": "hello", "branch": "main", "files": []});
        let response = send(
            &state,
            post_json("/api/github/embed", (COOKIE, &cookie), &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No files provided");
    }

    #[tokio::test]
    async fn test_embed_routes_reject_bearer_without_session() {
        let state = app_state().await;
        let github = json!({
            "owner": "victim",
            "repo": "secret",
            "branch": "main",
            "files": [{"path": "README.md", "text": "overwritten"}]
        });
        let drive = json!({"files": [{"file_id": "doc1", "content": "overwritten"}]});

        for (uri, body) in [("/api/github/embed", &github), ("/api/drive/embed", &drive)] {
            let response = send(
                &state,
                post_json(uri, (AUTHORIZATION, "Bearer not-a-real-token"), body),
            )
            .await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }

        let google = sign_in(&state, Provider::Google);
        let response = send(
            &state,
            post_json("/api/github/embed", (COOKIE, &google), &github),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        for namespace in ["victim/secret/main/README.md", "drive/doc1"] {
            let ns = crate::ingest::Namespace::new(namespace).unwrap();
            assert_eq!(state.pipeline.count(&ns).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_drive_embed_reports_failed_file_and_keeps_stored_ones() {
        let state = app_state().await;
        let cookie = sign_in(&state, Provider::Google);
        let body = json!({"files": [
            {"file_id": "doc1", "content": "The plan"},
            {"file_id": "  ", "content": "orphan text"}
        ]});
        let response = send(
            &state,
            post_json("/api/drive/embed", (COOKIE, &cookie), &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert_eq!(body["results"][0]["namespace"], "drive/doc1");
        assert_eq!(body["results"][0]["record_ids"].as_array().unwrap().len(), 1);
        assert_eq!(body["skipped"][0]["id"], "  ");
        assert_eq!(body["skipped"][0]["reason"], "file id must not be empty");
    }
}

//! Requests driven through the full router: auth middleware, extractors,
//! error bodies and the upload → create → stream flow.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use audiochan::application::audios::AudioService;
use audiochan::application::nodes::NodeService;
use audiochan::application::playlists::PlaylistService;
use audiochan::application::repos::RepositorySet;
use audiochan::application::storage::MediaStore;
use audiochan::application::uploads::{UploadPolicy, UploadService};
use audiochan::application::users::UserService;
use audiochan::cache::{CacheAside, CacheConfig, MemoryCacheStore};
use audiochan::infra::db::PostgresRepositories;
use audiochan::infra::http::auth::Claims;
use audiochan::infra::http::{self, ApiState, TokenVerifier};
use audiochan::infra::storage::FileMediaStore;

const SECRET: &str = "router-test-secret";
const BOUNDARY: &str = "audiochan-boundary";

fn build_app(pool: PgPool) -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = Url::parse("https://cdn.test/media/").expect("url");
    let media: Arc<dyn MediaStore> =
        Arc::new(FileMediaStore::new(dir.path().to_path_buf(), base).expect("media store"));

    let policy = UploadPolicy {
        audio_max_bytes: 4096,
        audio_content_types: vec!["audio/mpeg".into()],
        picture_max_bytes: 4096,
    };
    let repositories = Arc::new(PostgresRepositories::new(pool));
    let repos = RepositorySet::from_shared(repositories.clone());
    let config = CacheConfig::default();
    let cache = CacheAside::new(Arc::new(MemoryCacheStore::new(&config)), &config);

    let audios = AudioService::new(repos.clone(), media.clone(), cache.clone(), policy.clone());
    let users = UserService::new(repos.clone(), media.clone(), cache.clone(), 4096);
    let playlists = PlaylistService::new(repos, media.clone(), cache, 4096);
    let nodes = NodeService::new(audios.clone(), users.clone(), playlists.clone());

    let state = ApiState {
        audios: Arc::new(audios),
        users: Arc::new(users),
        playlists: Arc::new(playlists),
        uploads: Arc::new(UploadService::new(media.clone(), policy)),
        nodes: Arc::new(nodes),
        media,
        db: repositories,
        default_page_size: 10,
    };
    let verifier = Arc::new(TokenVerifier::new(SECRET, None));
    (http::build_router(state, verifier, 64 * 1024), dir)
}

fn token(user_id: i64, name: &str) -> String {
    let exp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_secs()
        + 3600;
    let claims = Claims {
        sub: user_id.to_string(),
        name: name.to_string(),
        exp,
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("token")
}

fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {bearer}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

fn upload_request(bearer: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: audio/mpeg\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/uploads/audio")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec();
    (status, bytes)
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[sqlx::test(migrations = "./migrations")]
async fn health_reports_database_reachable(pool: PgPool) {
    let (app, _dir) = build_app(pool);
    let (status, _) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "./migrations")]
async fn protected_routes_require_a_token(pool: PgPool) {
    let (app, _dir) = build_app(pool);

    let (status, body) = send_json(&app, request("GET", "/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, body) =
        send_json(&app, request("GET", "/me", Some("not-a-jwt"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_token");

    // Anonymous reads stay open.
    let (status, body) = send_json(&app, request("GET", "/audios", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["has_next"], false);
}

#[sqlx::test(migrations = "./migrations")]
async fn sync_creates_the_account_from_token_claims(pool: PgPool) {
    let (app, _dir) = build_app(pool);
    let alice = token(7, "Alice");

    let (status, body) = send_json(&app, request("PUT", "/me", Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 7);
    assert_eq!(body["user_name"], "alice");

    let (status, body) = send_json(&app, request("GET", "/users/alice", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["audio_count"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn upload_create_and_stream_audio(pool: PgPool) {
    let (app, _dir) = build_app(pool);
    let alice = token(1, "alice");
    let bob = token(2, "bob");

    let (status, uploaded) =
        send_json(&app, upload_request(&alice, "Night Drive.mp3", b"ID3 tiny")).await;
    assert_eq!(status, StatusCode::CREATED);
    let upload_id = uploaded["upload_id"].as_str().expect("upload id").to_string();
    assert!(upload_id.starts_with("1_"));
    assert_eq!(uploaded["size"], 8);

    let (status, audio) = send_json(
        &app,
        request(
            "POST",
            "/audios",
            Some(&alice),
            Some(json!({
                "upload_id": upload_id,
                "file_name": "Night Drive.mp3",
                "tags": ["synthwave"],
                "duration": 3
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(audio["title"], "Night Drive");
    let file_url = audio["file"].as_str().expect("file url");
    assert_eq!(file_url, format!("https://cdn.test/media/audios/{upload_id}"));
    let id = audio["id"].as_i64().expect("id");

    let (status, bytes) = send(
        &app,
        request("GET", &format!("/media/audios/{upload_id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"ID3 tiny");

    let check = format!("/me/favorite/audios/{id}");
    let (status, _) = send(&app, request("GET", &check, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let favorite = format!("/audios/{id}/favorite");
    let (status, body) = send_json(&app, request("PUT", &favorite, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_favorited"], true);

    let (status, _) = send(&app, request("GET", &check, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        request("DELETE", &format!("/audios/{id}"), Some(&bob), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");
}

#[sqlx::test(migrations = "./migrations")]
async fn uploads_with_unknown_extensions_are_rejected(pool: PgPool) {
    let (app, _dir) = build_app(pool);
    let alice = token(1, "alice");

    let (status, body) = send_json(&app, upload_request(&alice, "notes.txt", b"hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_failed");
    assert!(body["error"]["fields"]["file_name"].is_array());
}

#[sqlx::test(migrations = "./migrations")]
async fn malformed_cursors_are_bad_requests(pool: PgPool) {
    let (app, _dir) = build_app(pool);

    let (status, body) =
        send_json(&app, request("GET", "/audios?cursor=garbage", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_cursor");
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_resources_are_not_found(pool: PgPool) {
    let (app, _dir) = build_app(pool);

    let (status, body) = send_json(&app, request("GET", "/audios/999", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = send(&app, request("GET", "/users/nobody", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, request("GET", "/media/other/file.mp3", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

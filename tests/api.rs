use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use sqlx::PgPool;
use tempfile::TempDir;
use url::Url;

use audiochan::application::audios::{
    AudioService, CreateAudioCommand, SearchAudiosQuery, UpdateAudioCommand,
};
use audiochan::application::auth::Identity;
use audiochan::application::error::HandlerError;
use audiochan::application::nodes::{Node, NodeService};
use audiochan::application::pagination::{AudioCursor, Page, PageRequest};
use audiochan::application::playlists::{CreatePlaylistCommand, PlaylistService};
use audiochan::application::repos::{AudioView, RepositorySet};
use audiochan::application::storage::{Container, MediaStore};
use audiochan::application::uploads::{UploadPolicy, UploadService};
use audiochan::application::users::UserService;
use audiochan::cache::{CacheAside, CacheConfig, MemoryCacheStore};
use audiochan::domain::nodes::{GlobalId, NodeKind};
use audiochan::domain::types::Visibility;
use audiochan::infra::db::PostgresRepositories;
use audiochan::infra::http::api::error::ApiError;
use audiochan::infra::http::api::handlers;
use audiochan::infra::http::api::models::*;
use audiochan::infra::http::{ApiState, CurrentUser, MaybeUser};
use audiochan::infra::storage::FileMediaStore;

struct Harness {
    state: ApiState,
    media: Arc<dyn MediaStore>,
    _dir: TempDir,
}

fn policy() -> UploadPolicy {
    UploadPolicy {
        audio_max_bytes: 1024 * 1024,
        audio_content_types: vec!["audio/mpeg".into(), "audio/ogg".into()],
        picture_max_bytes: 64 * 1024,
    }
}

fn build_state(pool: PgPool) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = Url::parse("https://cdn.test/media/").expect("url");
    let media: Arc<dyn MediaStore> =
        Arc::new(FileMediaStore::new(dir.path().to_path_buf(), base).expect("media store"));

    let repositories = Arc::new(PostgresRepositories::new(pool));
    let repos = RepositorySet::from_shared(repositories.clone());
    let config = CacheConfig::default();
    let cache = CacheAside::new(Arc::new(MemoryCacheStore::new(&config)), &config);

    let audios = AudioService::new(repos.clone(), media.clone(), cache.clone(), policy());
    let users = UserService::new(repos.clone(), media.clone(), cache.clone(), 64 * 1024);
    let playlists = PlaylistService::new(repos, media.clone(), cache, 64 * 1024);
    let nodes = NodeService::new(audios.clone(), users.clone(), playlists.clone());

    let state = ApiState {
        audios: Arc::new(audios),
        users: Arc::new(users),
        playlists: Arc::new(playlists),
        uploads: Arc::new(UploadService::new(media.clone(), policy())),
        nodes: Arc::new(nodes),
        media: media.clone(),
        db: repositories,
        default_page_size: 15,
    };

    Harness {
        state,
        media,
        _dir: dir,
    }
}

fn alice() -> Identity {
    Identity::new(1, "alice")
}

fn bob() -> Identity {
    Identity::new(2, "bob")
}

/// Shaped like the names `UploadService` hands out: `{owner_id}_{random}.{ext}`.
fn upload_name(owner: &Identity, title: &str) -> String {
    format!("{}_{}.mp3", owner.user_id, title.replace(' ', "_"))
}

async fn publish(harness: &Harness, owner: &Identity, title: &str, visibility: Visibility) -> i64 {
    let upload_id = upload_name(owner, title);
    harness
        .media
        .put(
            Container::Audios,
            &upload_id,
            Bytes::from_static(b"ID3 fake audio"),
        )
        .await
        .expect("upload stored");

    harness
        .state
        .audios
        .create_audio(
            owner,
            CreateAudioCommand {
                upload_id,
                file_name: format!("{title}.mp3"),
                title: Some(title.to_string()),
                description: None,
                tags: vec!["lofi".into()],
                duration: 120,
                visibility,
            },
        )
        .await
        .expect("audio created")
        .audio
        .id
}

async fn make_private(harness: &Harness, owner: &Identity, id: i64) {
    harness
        .state
        .audios
        .update_audio(
            owner,
            id,
            UpdateAudioCommand {
                visibility: Some(Visibility::Private),
                ..Default::default()
            },
        )
        .await
        .expect("made private");
}

fn ids(page: Page<AudioView>) -> Vec<i64> {
    page.items.into_iter().map(|audio| audio.id).collect()
}

async fn latest_titles(harness: &Harness, viewer: Option<&Identity>) -> Vec<String> {
    harness
        .state
        .audios
        .list_latest(viewer, PageRequest::first(50))
        .await
        .expect("listing")
        .items
        .into_iter()
        .map(|audio| audio.title)
        .collect()
}

// ============ Audios ============

#[sqlx::test(migrations = "./migrations")]
async fn created_audio_uses_stored_size_and_owner(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "first song", Visibility::Public).await;

    let detail = harness
        .state
        .audios
        .get_audio(id, Some(&alice()))
        .await
        .expect("found");

    assert_eq!(detail.audio.title, "first song");
    assert_eq!(detail.audio.size, 14);
    assert_eq!(detail.audio.user.user_name, "alice");
    assert_eq!(detail.audio.tags, vec!["lofi".to_string()]);
    assert_eq!(detail.is_favorited, Some(false));
}

#[sqlx::test(migrations = "./migrations")]
async fn create_audio_requires_an_existing_upload(pool: PgPool) {
    let harness = build_state(pool);

    let err = harness
        .state
        .audios
        .create_audio(
            &alice(),
            CreateAudioCommand {
                upload_id: upload_name(&alice(), "never uploaded"),
                file_name: "song.mp3".into(),
                duration: 10,
                ..Default::default()
            },
        )
        .await
        .expect_err("missing upload rejected");

    match err {
        HandlerError::Validation(errors) => assert!(errors.field("upload_id").is_some()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn private_audio_is_hidden_from_other_users(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "secret", Visibility::Private).await;

    assert!(harness.state.audios.get_audio(id, Some(&alice())).await.is_ok());
    assert!(matches!(
        harness.state.audios.get_audio(id, Some(&bob())).await,
        Err(HandlerError::NotFound { .. })
    ));
    assert!(matches!(
        harness.state.audios.get_audio(id, None).await,
        Err(HandlerError::NotFound { .. })
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn foreign_uploads_cannot_be_published(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "original", Visibility::Public).await;
    let file = harness
        .state
        .audios
        .get_audio(id, None)
        .await
        .expect("found")
        .audio
        .file;

    // The object name is visible to anyone through the audio's URL.
    let err = harness
        .state
        .audios
        .create_audio(
            &bob(),
            CreateAudioCommand {
                upload_id: upload_name(&alice(), "original"),
                file_name: "copy.mp3".into(),
                duration: 10,
                ..Default::default()
            },
        )
        .await
        .expect_err("someone else's upload");
    assert!(matches!(err, HandlerError::Forbidden { entity: "upload" }));

    assert!(harness.media.stat(&file).await.expect("stat").is_some());
    assert!(harness.state.audios.get_audio(id, None).await.is_ok());
}

#[sqlx::test(migrations = "./migrations")]
async fn an_upload_backs_a_single_audio(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "once", Visibility::Public).await;

    let err = harness
        .state
        .audios
        .create_audio(
            &alice(),
            CreateAudioCommand {
                upload_id: upload_name(&alice(), "once"),
                file_name: "once again.mp3".into(),
                duration: 10,
                ..Default::default()
            },
        )
        .await
        .expect_err("upload already published");
    assert!(matches!(err, HandlerError::Conflict { .. }));

    let own = harness
        .state
        .audios
        .own_audios(&alice(), PageRequest::offset(0, 10))
        .await
        .expect("own audios");
    assert_eq!(ids(own), vec![id]);
}

#[sqlx::test(migrations = "./migrations")]
async fn private_audio_is_left_out_of_user_listings(pool: PgPool) {
    let harness = build_state(pool);
    let open = publish(&harness, &alice(), "open", Visibility::Public).await;
    let secret = publish(&harness, &alice(), "secret", Visibility::Private).await;

    let listed = |viewer: Option<Identity>| {
        let audios = harness.state.audios.clone();
        async move {
            ids(audios
                .user_audios("alice", viewer.as_ref(), PageRequest::first(10))
                .await
                .expect("user audios"))
        }
    };
    assert_eq!(listed(Some(alice())).await, vec![secret, open]);
    assert_eq!(listed(Some(bob())).await, vec![open]);
    assert_eq!(listed(None).await, vec![open]);
}

#[sqlx::test(migrations = "./migrations")]
async fn audio_made_private_leaves_favorite_listings(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "liked", Visibility::Public).await;
    harness.state.audios.favorite(&bob(), id).await.expect("fav");
    make_private(&harness, &alice(), id).await;

    let favorites = |viewer: Option<Identity>| {
        let audios = harness.state.audios.clone();
        async move {
            ids(audios
                .user_favorite_audios("bob", viewer.as_ref(), PageRequest::first(10))
                .await
                .expect("favorites"))
        }
    };
    assert!(favorites(Some(bob())).await.is_empty());
    assert!(favorites(None).await.is_empty());
    assert_eq!(favorites(Some(alice())).await, vec![id]);
}

#[sqlx::test(migrations = "./migrations")]
async fn audio_made_private_leaves_public_playlists(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "mixed in", Visibility::Public).await;
    let playlist = harness
        .state
        .playlists
        .create_playlist(
            &alice(),
            CreatePlaylistCommand {
                title: "shared mix".into(),
                audio_ids: vec![id],
                ..Default::default()
            },
        )
        .await
        .expect("playlist")
        .playlist
        .id;
    make_private(&harness, &alice(), id).await;

    let contents = |viewer: Option<Identity>| {
        let playlists = harness.state.playlists.clone();
        async move {
            ids(playlists
                .playlist_audios(playlist, viewer.as_ref(), PageRequest::first(10))
                .await
                .expect("playlist audios"))
        }
    };
    assert!(contents(Some(bob())).await.is_empty());
    assert!(contents(None).await.is_empty());
    assert_eq!(contents(Some(alice())).await, vec![id]);
}

#[sqlx::test(migrations = "./migrations")]
async fn search_skips_private_audio_of_others(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "hidden gem", Visibility::Private).await;

    let found = |viewer: Option<Identity>| {
        let audios = harness.state.audios.clone();
        async move {
            ids(audios
                .search(
                    SearchAudiosQuery {
                        query: Some("gem".into()),
                        tags: vec!["lofi".into()],
                    },
                    viewer.as_ref(),
                    PageRequest::first(10),
                )
                .await
                .expect("search"))
        }
    };
    assert!(found(Some(bob())).await.is_empty());
    assert!(found(None).await.is_empty());
    assert_eq!(found(Some(alice())).await, vec![id]);
}

#[sqlx::test(migrations = "./migrations")]
async fn feed_skips_private_audio_of_followed_users(pool: PgPool) {
    let harness = build_state(pool);
    let open = publish(&harness, &alice(), "for everyone", Visibility::Public).await;
    let secret = publish(&harness, &alice(), "for me", Visibility::Private).await;
    harness.state.users.sync_identity(&bob()).await.expect("bob");
    harness.state.users.follow(&bob(), "alice").await.expect("follow");

    let feed = harness
        .state
        .audios
        .feed(&bob(), PageRequest::first(10))
        .await
        .expect("feed");
    let feed = ids(feed);
    assert_eq!(feed, vec![open]);
    assert!(!feed.contains(&secret));
}

#[sqlx::test(migrations = "./migrations")]
async fn private_audio_url_and_node_are_owner_only(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "locked", Visibility::Private).await;
    let global = GlobalId::new(NodeKind::Audio, id).encode();

    for viewer in [Some(bob()), None] {
        assert!(matches!(
            harness.state.audios.get_audio_url(id, viewer.as_ref()).await,
            Err(HandlerError::NotFound { .. })
        ));
        assert!(matches!(
            harness.state.nodes.resolve(&global, viewer.as_ref()).await,
            Err(HandlerError::NotFound { .. })
        ));
    }

    let url = harness
        .state
        .audios
        .get_audio_url(id, Some(&alice()))
        .await
        .expect("owner url");
    assert!(url.url.ends_with(&upload_name(&alice(), "locked")));
    assert!(matches!(
        harness.state.nodes.resolve(&global, Some(&alice())).await,
        Ok(Node::Audio(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn unlisted_audio_is_reachable_but_not_listed(pool: PgPool) {
    let harness = build_state(pool);
    publish(&harness, &alice(), "open", Visibility::Public).await;
    let unlisted = publish(&harness, &alice(), "hidden", Visibility::Unlisted).await;

    assert!(harness.state.audios.get_audio(unlisted, None).await.is_ok());
    assert_eq!(latest_titles(&harness, None).await, vec!["open"]);
    assert_eq!(latest_titles(&harness, Some(&bob())).await, vec!["open"]);

    let own = latest_titles(&harness, Some(&alice())).await;
    assert_eq!(own, vec!["hidden", "open"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn owner_can_update_and_others_cannot(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "draft", Visibility::Public).await;

    let err = harness
        .state
        .audios
        .update_audio(
            &bob(),
            id,
            UpdateAudioCommand {
                title: Some("stolen".into()),
                ..Default::default()
            },
        )
        .await
        .expect_err("not the owner");
    assert!(matches!(err, HandlerError::Forbidden { .. }));

    let updated = harness
        .state
        .audios
        .update_audio(
            &alice(),
            id,
            UpdateAudioCommand {
                title: Some("final".into()),
                tags: Some(vec!["Chill Hop".into()]),
                ..Default::default()
            },
        )
        .await
        .expect("updated");
    assert_eq!(updated.audio.title, "final");
    assert_eq!(updated.audio.tags, vec!["chill-hop".to_string()]);
    assert!(updated.audio.updated_at.is_some());

    // A cached read must observe the update.
    let fetched = harness
        .state
        .audios
        .get_audio(id, None)
        .await
        .expect("found");
    assert_eq!(fetched.audio.title, "final");
}

#[sqlx::test(migrations = "./migrations")]
async fn removed_audio_disappears_from_reads_and_storage(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "gone soon", Visibility::Public).await;
    let file = harness
        .state
        .audios
        .get_audio(id, None)
        .await
        .expect("found")
        .audio
        .file;

    harness
        .state
        .audios
        .remove_audio(&alice(), id)
        .await
        .expect("removed");

    assert!(matches!(
        harness.state.audios.get_audio(id, Some(&alice())).await,
        Err(HandlerError::NotFound { .. })
    ));
    assert!(latest_titles(&harness, Some(&alice())).await.is_empty());
    assert_eq!(harness.media.stat(&file).await.expect("stat"), None);
}

#[sqlx::test(migrations = "./migrations")]
async fn favorites_are_idempotent(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "loved", Visibility::Public).await;

    assert!(harness.state.audios.favorite(&bob(), id).await.expect("fav"));
    assert!(harness.state.audios.favorite(&bob(), id).await.expect("fav again"));
    assert!(harness.state.audios.is_favorited(&bob(), id).await.expect("check"));

    let favorites = harness
        .state
        .audios
        .user_favorite_audios("bob", None, PageRequest::first(10))
        .await
        .expect("favorites");
    assert_eq!(favorites.items.len(), 1);

    assert!(!harness.state.audios.unfavorite(&bob(), id).await.expect("unfav"));
    assert!(!harness.state.audios.unfavorite(&bob(), id).await.expect("unfav again"));
    assert!(!harness.state.audios.is_favorited(&bob(), id).await.expect("check"));
}

#[sqlx::test(migrations = "./migrations")]
async fn offset_and_cursor_pages_agree(pool: PgPool) {
    let harness = build_state(pool);
    for index in 0..5 {
        publish(&harness, &alice(), &format!("track {index}"), Visibility::Public).await;
    }

    let first = harness
        .state
        .audios
        .list_latest(None, PageRequest::first(2))
        .await
        .expect("first page");
    assert!(first.has_next);
    let cursor = first
        .next_cursor
        .as_deref()
        .map(|raw| <AudioCursor as audiochan::application::pagination::PageCursor>::decode(raw))
        .transpose()
        .expect("cursor decodes");

    let by_cursor = harness
        .state
        .audios
        .list_latest(None, PageRequest::cursor(cursor, 2))
        .await
        .expect("cursor page");
    let by_offset = harness
        .state
        .audios
        .list_latest(None, PageRequest::offset(1, 2))
        .await
        .expect("offset page");

    let ids = |page: &audiochan::application::pagination::Page<
        audiochan::application::repos::AudioView,
    >| page.items.iter().map(|audio| audio.id).collect::<Vec<_>>();
    assert_eq!(ids(&by_cursor), ids(&by_offset));
    assert_eq!(ids(&by_cursor).len(), 2);

    let last = harness
        .state
        .audios
        .list_latest(None, PageRequest::offset(2, 2))
        .await
        .expect("last page");
    assert_eq!(last.items.len(), 1);
    assert!(!last.has_next);
}

#[sqlx::test(migrations = "./migrations")]
async fn search_matches_title_and_requires_every_tag(pool: PgPool) {
    let harness = build_state(pool);
    publish(&harness, &alice(), "rainy night", Visibility::Public).await;
    publish(&harness, &alice(), "sunny day", Visibility::Public).await;

    let by_title = harness
        .state
        .audios
        .search(
            SearchAudiosQuery {
                query: Some("RAINY".into()),
                tags: Vec::new(),
            },
            None,
            PageRequest::first(10),
        )
        .await
        .expect("search");
    assert_eq!(by_title.items.len(), 1);
    assert_eq!(by_title.items[0].title, "rainy night");

    let by_tags = harness
        .state
        .audios
        .search(
            SearchAudiosQuery {
                query: None,
                tags: vec!["lofi".into(), "jazz".into()],
            },
            None,
            PageRequest::first(10),
        )
        .await
        .expect("search");
    assert!(by_tags.items.is_empty());
}

// ============ Users ============

#[sqlx::test(migrations = "./migrations")]
async fn feed_lists_public_audios_of_followed_users(pool: PgPool) {
    let harness = build_state(pool);
    publish(&harness, &alice(), "public one", Visibility::Public).await;
    publish(&harness, &alice(), "unlisted one", Visibility::Unlisted).await;
    harness.state.users.sync_identity(&bob()).await.expect("bob");

    assert!(harness.state.users.follow(&bob(), "alice").await.expect("follow"));
    assert!(harness.state.users.follow(&bob(), "alice").await.expect("follow again"));
    assert!(harness.state.users.is_following(&bob(), "alice").await.expect("check"));

    let feed = harness
        .state
        .audios
        .feed(&bob(), PageRequest::first(10))
        .await
        .expect("feed");
    let titles: Vec<_> = feed.items.into_iter().map(|audio| audio.title).collect();
    assert_eq!(titles, vec!["public one"]);

    let profile = harness
        .state
        .users
        .profile("alice", Some(&bob()))
        .await
        .expect("profile");
    assert_eq!(profile.profile.follower_count, 1);
    assert_eq!(profile.profile.audio_count, 1);
    assert_eq!(profile.is_following, Some(true));

    let followers = harness
        .state
        .users
        .followers("alice", PageRequest::first(10))
        .await
        .expect("followers");
    assert_eq!(followers.items[0].user.user_name, "bob");
}

#[sqlx::test(migrations = "./migrations")]
async fn later_syncs_keep_the_stored_account(pool: PgPool) {
    let harness = build_state(pool);
    let first = harness.state.users.sync_identity(&alice()).await.expect("created");
    assert_eq!(first.user_name, "alice");

    harness
        .state
        .users
        .update_username(&alice(), "alice_w")
        .await
        .expect("renamed");

    // The token still carries the old name.
    let again = harness.state.users.sync_identity(&alice()).await.expect("synced");
    assert_eq!(again.id, 1);
    assert_eq!(again.user_name, "alice_w");
}

#[sqlx::test(migrations = "./migrations")]
async fn users_cannot_follow_themselves(pool: PgPool) {
    let harness = build_state(pool);
    harness.state.users.sync_identity(&alice()).await.expect("alice");

    let err = harness
        .state
        .users
        .follow(&alice(), "alice")
        .await
        .expect_err("self follow");
    assert!(matches!(err, HandlerError::Validation(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn taken_username_is_a_conflict(pool: PgPool) {
    let harness = build_state(pool);
    harness.state.users.sync_identity(&alice()).await.expect("alice");
    harness.state.users.sync_identity(&bob()).await.expect("bob");

    let err = harness
        .state
        .users
        .update_username(&bob(), "Alice")
        .await
        .expect_err("taken");
    let api: ApiError = err.into();
    assert_eq!(api.status(), StatusCode::CONFLICT);

    let renamed = harness
        .state
        .users
        .update_username(&bob(), "Robert")
        .await
        .expect("renamed");
    assert_eq!(renamed.user_name, "robert");
}

// ============ Playlists ============

#[sqlx::test(migrations = "./migrations")]
async fn playlist_membership_counts_changes(pool: PgPool) {
    let harness = build_state(pool);
    let first = publish(&harness, &alice(), "one", Visibility::Public).await;
    let second = publish(&harness, &alice(), "two", Visibility::Public).await;

    let playlist = harness
        .state
        .playlists
        .create_playlist(
            &alice(),
            CreatePlaylistCommand {
                title: "mix".into(),
                audio_ids: vec![first],
                ..Default::default()
            },
        )
        .await
        .expect("playlist");
    let id = playlist.playlist.id;

    let added = harness
        .state
        .playlists
        .add_audios(&alice(), id, &[first, second])
        .await
        .expect("added");
    assert_eq!(added, 1);

    let audios = harness
        .state
        .playlists
        .playlist_audios(id, None, PageRequest::first(10))
        .await
        .expect("audios");
    assert_eq!(audios.items.len(), 2);

    let err = harness
        .state
        .playlists
        .add_audios(&bob(), id, &[first])
        .await
        .expect_err("not the owner");
    assert!(matches!(err, HandlerError::Forbidden { .. }));

    let removed = harness
        .state
        .playlists
        .remove_audios(&alice(), id, &[first, first])
        .await
        .expect("removed");
    assert_eq!(removed, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn private_playlist_is_not_listed_for_others(pool: PgPool) {
    let harness = build_state(pool);
    harness
        .state
        .playlists
        .create_playlist(
            &alice(),
            CreatePlaylistCommand {
                title: "mine".into(),
                visibility: Visibility::Private,
                ..Default::default()
            },
        )
        .await
        .expect("playlist");

    let as_owner = harness
        .state
        .playlists
        .user_playlists("alice", Some(&alice()), PageRequest::first(10))
        .await
        .expect("listing");
    let as_other = harness
        .state
        .playlists
        .user_playlists("alice", Some(&bob()), PageRequest::first(10))
        .await
        .expect("listing");

    assert_eq!(as_owner.items.len(), 1);
    assert!(as_other.items.is_empty());
}

// ============ Nodes ============

#[sqlx::test(migrations = "./migrations")]
async fn nodes_resolve_by_global_id(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "noded", Visibility::Public).await;

    let global = GlobalId::new(NodeKind::Audio, id).encode();
    match harness.state.nodes.resolve(&global, None).await.expect("node") {
        Node::Audio(detail) => assert_eq!(detail.audio.id, id),
        other => panic!("unexpected node: {other:?}"),
    }

    let user = GlobalId::new(NodeKind::User, 1).encode();
    assert!(matches!(
        harness.state.nodes.resolve(&user, None).await,
        Ok(Node::User(_))
    ));

    assert!(matches!(
        harness.state.nodes.resolve("not base64!", None).await,
        Err(HandlerError::Validation(_))
    ));
}

// ============ Handlers ============

#[sqlx::test(migrations = "./migrations")]
async fn handlers_publish_urls_and_status_codes(pool: PgPool) {
    let harness = build_state(pool);
    let id = publish(&harness, &alice(), "handled", Visibility::Public).await;

    let response = handlers::get_audio(
        State(harness.state.clone()),
        MaybeUser(None),
        Path(id),
    )
    .await
    .expect("get audio via handler")
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let url = harness
        .state
        .audios
        .get_audio_url(id, None)
        .await
        .expect("url");
    assert!(url.url.starts_with("https://cdn.test/media/audios/"));

    let removed = handlers::remove_audio(
        State(harness.state.clone()),
        CurrentUser(alice()),
        Path(id),
    )
    .await
    .expect("remove via handler")
    .into_response();
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let listing = handlers::list_audios(
        State(harness.state.clone()),
        MaybeUser(None),
        Query(CursorQuery::default()),
    )
    .await
    .expect("list via handler")
    .into_response();
    assert_eq!(listing.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn handler_rejects_invalid_playlist_payload(pool: PgPool) {
    let harness = build_state(pool);

    let result = handlers::create_playlist(
        State(harness.state.clone()),
        CurrentUser(alice()),
        Json(CreatePlaylistRequest {
            title: "   ".into(),
            description: None,
            tags: Vec::new(),
            visibility: Visibility::Public,
            audio_ids: Vec::new(),
        }),
    )
    .await;

    let err = match result {
        Ok(_) => panic!("blank title accepted"),
        Err(err) => err,
    };
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

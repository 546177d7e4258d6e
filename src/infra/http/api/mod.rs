pub mod error;
pub mod handlers;
pub mod models;
pub mod publish;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/audios",
            get(handlers::list_audios).post(handlers::create_audio),
        )
        .route(
            "/audios/{id}",
            get(handlers::get_audio)
                .patch(handlers::update_audio)
                .delete(handlers::remove_audio),
        )
        .route("/audios/{id}/picture", patch(handlers::update_audio_picture))
        .route("/audios/{id}/url", get(handlers::get_audio_url))
        .route(
            "/audios/{id}/favorite",
            put(handlers::favorite_audio).delete(handlers::unfavorite_audio),
        )
        .route("/search/audios", get(handlers::search_audios))
        .route("/uploads/audio", post(handlers::upload_audio))
        .route("/me", get(handlers::current_user).put(handlers::sync_me))
        .route("/me/audios", get(handlers::my_audios))
        .route("/me/feed", get(handlers::my_feed))
        .route("/me/username", patch(handlers::update_username))
        .route("/me/email", patch(handlers::update_email))
        .route("/me/picture", patch(handlers::update_my_picture))
        .route(
            "/me/favorite/audios/{id}",
            get(handlers::check_favorite_audio),
        )
        .route(
            "/me/favorite/playlists/{id}",
            get(handlers::check_favorite_playlist),
        )
        .route(
            "/me/followings/{user_name}",
            get(handlers::check_following)
                .put(handlers::follow_user)
                .delete(handlers::unfollow_user),
        )
        .route("/users/{user_name}", get(handlers::get_profile))
        .route("/users/{user_name}/audios", get(handlers::user_audios))
        .route(
            "/users/{user_name}/favorite/audios",
            get(handlers::user_favorite_audios),
        )
        .route("/users/{user_name}/followers", get(handlers::user_followers))
        .route(
            "/users/{user_name}/followings",
            get(handlers::user_followings),
        )
        .route("/users/{user_name}/playlists", get(handlers::user_playlists))
        .route(
            "/users/{user_name}/favorite/playlists",
            get(handlers::user_favorite_playlists),
        )
        .route("/playlists", post(handlers::create_playlist))
        .route(
            "/playlists/{id}",
            get(handlers::get_playlist)
                .patch(handlers::update_playlist)
                .delete(handlers::remove_playlist),
        )
        .route(
            "/playlists/{id}/picture",
            patch(handlers::update_playlist_picture),
        )
        .route(
            "/playlists/{id}/audios",
            get(handlers::playlist_audios)
                .post(handlers::add_playlist_audios)
                .delete(handlers::remove_playlist_audios),
        )
        .route(
            "/playlists/{id}/favorite",
            put(handlers::favorite_playlist).delete(handlers::unfavorite_playlist),
        )
        .route("/nodes/{global_id}", get(handlers::get_node))
        .route("/media/{container}/{name}", get(handlers::serve_media))
        .with_state(state)
}

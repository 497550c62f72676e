//! API routes

pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod dev;
pub mod engagement;
pub mod health;
pub mod learning;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/version", get(health::version))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/profile", get(auth::profile))
        .route("/auth/profile", put(auth::update_profile))
        .route("/auth/change-password", post(auth::change_password))
        .route("/auth/users", get(auth::list_users))
        // Chat
        .route("/chat/rooms", post(chat::create_room))
        .route("/chat/rooms", get(chat::list_rooms))
        .route("/chat/rooms/:id/participants", post(chat::join_room))
        .route("/chat/rooms/:id/messages", post(chat::send_message))
        .route("/chat/rooms/:id/messages", get(chat::room_messages))
        .route("/chat/rooms/:id/post_message", post(chat::post_message))
        // Learning
        .route("/learning/packs", post(learning::create_pack))
        .route("/learning/packs", get(learning::list_packs))
        .route("/learning/packs/:id", get(learning::get_pack))
        .route("/learning/flashcards", post(learning::create_flashcard))
        .route("/learning/flashcards", get(learning::list_flashcards))
        .route("/learning/flashcards/:id", put(learning::update_flashcard))
        .route(
            "/learning/flashcards/:id",
            delete(learning::delete_flashcard),
        )
        .route("/learning/generate", post(learning::generate))
        .route("/learning/sessions", post(learning::log_session))
        .route("/learning/sessions", get(learning::recent_sessions))
        .route("/learning/recommendations", get(learning::recommendations))
        // Engagement
        .route("/engagement/score", get(engagement::score))
        .route("/engagement/add-points", post(engagement::add_points))
        .route("/engagement/badges", get(engagement::badges))
        .route("/engagement/progress", get(engagement::progress))
        .route("/engagement/progress", post(engagement::update_progress))
        .route("/engagement/notifications", get(engagement::notifications))
        .route(
            "/engagement/notifications/:id/read",
            post(engagement::mark_read),
        )
        .route("/engagement/streak", get(engagement::streak))
        .route("/engagement/achievements", get(engagement::achievements))
        .route("/engagement/leaderboard", get(engagement::leaderboard))
        .route("/engagement/overview", get(engagement::overview))
        // Dashboard
        .route("/dashboard/track", post(dashboard::track))
        .route("/dashboard/sessions", post(dashboard::log_session))
        .route("/dashboard/user-dashboard", get(dashboard::user_dashboard))
        .route("/dashboard/overview", get(dashboard::overview))
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/dashboard/summary", get(dashboard::summary))
        .route("/dashboard/reports/export", get(dashboard::export_report))
        // Dev tools (guarded by environment)
        .route("/dev/seed-mock-data", post(dev::seed_mock_data))
        .route("/dev/flush-mock-data", delete(dev::flush_mock_data))
        .route("/dev/mock-data-stats", get(dev::mock_data_stats))
        .route("/dev/reset-database", post(dev::reset_database))
        .route("/dev/test-users", get(dev::test_users))
}

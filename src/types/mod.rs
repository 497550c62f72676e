//! Domain records and request/response types

pub mod activity;
pub mod chat;
pub mod engagement;
pub mod learning;
pub mod user;

pub use activity::UserActivity;
pub use chat::{ChatMessage, ChatParticipant, ChatRoom};
pub use engagement::{Badge, Notification, Progress, Score, UserBadge};
pub use learning::{Flashcard, FlashcardPack, StudySession};
pub use user::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest,
    User, UserView,
};

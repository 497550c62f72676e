//! Mock data seeding for development and testing
//!
//! Creates the standard trio of test accounts plus enough learning, chat,
//! engagement, and activity rows to make every dashboard endpoint show
//! something. Used by the dev-tools endpoints and the seed CLI.

use rand::Rng;
use serde::Serialize;

use crate::auth;
use crate::error::Result;
use crate::storage::Database;
use crate::types::activity::TrackActivityRequest;
use crate::types::chat::NewMessage;
use crate::types::User;

pub const MOCK_USERNAMES: [&str; 3] = ["alice", "bob", "charlie"];
pub const MOCK_PASSWORD: &str = "testpass123";

const MOCK_ROOM: &str = "Study Group";
const MOCK_BADGES: [&str; 2] = ["First Steps", "Study Streak"];

/// Per-table counts of seeded data
#[derive(Debug, Clone, Serialize)]
pub struct MockStats {
    pub users: i64,
    pub flashcard_packs: i64,
    pub flashcards: i64,
    pub chat_rooms: i64,
    pub activities: i64,
    pub study_sessions: i64,
}

impl MockStats {
    pub fn total(&self) -> i64 {
        self.users
            + self.flashcard_packs
            + self.flashcards
            + self.chat_rooms
            + self.activities
            + self.study_sessions
    }
}

/// Seeds and flushes the standard mock dataset
pub struct MockDataManager {
    db: Database,
}

impl MockDataManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Seed everything. Returns the number of rows created.
    pub async fn seed_all(&self) -> Result<usize> {
        let mut created = self.seed_users().await?;

        // Content is seeded once per flush; the mock room marks a seeded state
        if self.db.get_room_by_name(MOCK_ROOM)?.is_none() {
            created += self.seed_learning()?;
            created += self.seed_engagement()?;
            created += self.seed_chat()?;
            created += self.seed_dashboard()?;
        }

        tracing::info!(created, "Mock data seeded");
        Ok(created)
    }

    async fn seed_users(&self) -> Result<usize> {
        let accounts = [
            ("alice", "alice@test.com", "user"),
            ("bob", "bob@test.com", "user"),
            ("charlie", "charlie@test.com", "admin"),
        ];
        let hash = auth::hash_password(MOCK_PASSWORD.to_string()).await?;

        let mut created = 0;
        for (username, email, role) in accounts {
            if self.db.get_user_by_username(username)?.is_none() {
                self.db.create_user(username, email, &hash, role)?;
                created += 1;
            }
        }
        Ok(created)
    }

    /// alice and bob, the two accounts that own seeded content
    fn content_users(&self) -> Result<Vec<User>> {
        let mut users = Vec::new();
        for username in ["alice", "bob"] {
            if let Some(user) = self.db.get_user_by_username(username)? {
                users.push(user);
            }
        }
        Ok(users)
    }

    fn seed_learning(&self) -> Result<usize> {
        let users = self.content_users()?;
        let [Some(alice), Some(bob)] = [users.first(), users.get(1)] else {
            return Ok(0);
        };

        let packs = [
            ("Python Basics", "Fundamental Python concepts", alice.id),
            ("Data Structures", "Lists, dicts, sets", alice.id),
            ("Web Development", "Flask and APIs", bob.id),
        ];

        let mut created = 0;
        for (title, description, owner_id) in packs {
            let pack = self.db.create_pack(title, Some(description), owner_id)?;
            created += 1;

            let cards = [
                (
                    format!("What is {} concept 1?", title),
                    format!("Answer about {}", title),
                ),
                (
                    format!("How does {} work?", title),
                    format!("Explanation of {}", title),
                ),
            ];
            created += self
                .db
                .insert_flashcards(&cards, owner_id, pack.id)?
                .len();
        }
        Ok(created)
    }

    fn seed_engagement(&self) -> Result<usize> {
        let users = self.content_users()?;
        if users.is_empty() {
            return Ok(0);
        }

        let badges = [
            ("First Steps", "Complete first lesson", "/icons/first.png"),
            ("Study Streak", "7 days in a row", "/icons/streak.png"),
        ];
        let mut created = 0;
        for (name, description, icon_url) in badges {
            self.db.insert_badge(name, Some(description), Some(icon_url))?;
            created += 1;
        }

        let mut rng = rand::thread_rng();
        for user in &users {
            self.db.add_points(user.id, rng.gen_range(100..=1000))?;
            self.db
                .upsert_progress(user.id, Some("Beginner"), Some(&[1, 2, 3]))?;
            self.db
                .insert_notification(user.id, &format!("Welcome {}!", user.username), None)?;
            created += 3;
        }
        Ok(created)
    }

    fn seed_chat(&self) -> Result<usize> {
        let users = self.content_users()?;
        let [Some(alice), Some(bob)] = [users.first(), users.get(1)] else {
            return Ok(0);
        };

        let room = self.db.create_room(MOCK_ROOM, "", false, None)?;
        let mut created = 1;

        for user in &users {
            self.db.add_participant(room.id, user.id)?;
            created += 1;
        }

        let messages = [
            (alice.id, "Hello everyone!"),
            (bob.id, "Hi! Ready to study?"),
        ];
        for (sender_id, content) in messages {
            self.db.insert_message(&NewMessage::text(
                room.id,
                sender_id,
                content.to_string(),
                "user".to_string(),
            ))?;
            created += 1;
        }
        Ok(created)
    }

    fn seed_dashboard(&self) -> Result<usize> {
        let users = self.content_users()?;
        let [Some(alice), Some(bob)] = [users.first(), users.get(1)] else {
            return Ok(0);
        };

        let activities = [
            (alice.id, "page_view", Some("/flashcards"), None, Some("sess_1")),
            (
                alice.id,
                "button_click",
                Some("/flashcards"),
                Some("create-btn"),
                None,
            ),
            (bob.id, "page_view", Some("/dashboard"), None, Some("sess_2")),
        ];
        let mut created = 0;
        for (user_id, activity_type, page_url, element_id, session_id) in activities {
            self.db.insert_activity(
                user_id,
                &TrackActivityRequest {
                    activity_type: activity_type.to_string(),
                    page_url: page_url.map(|s| s.to_string()),
                    element_id: element_id.map(|s| s.to_string()),
                    extra_data: None,
                    session_id: session_id.map(|s| s.to_string()),
                },
            )?;
            created += 1;
        }

        let sessions = [(alice.id, "Python", 2700), (bob.id, "Math", 1800)];
        for (user_id, subject, duration) in sessions {
            self.db.insert_study_session(user_id, duration, subject, true)?;
            created += 1;
        }
        Ok(created)
    }

    /// Remove all mock rows. Returns the number of rows removed.
    pub fn flush_all(&self) -> Result<usize> {
        let mut removed = 0;

        removed += self.db.delete_room_by_name(MOCK_ROOM)?;
        removed += self.db.delete_badges_by_names(&MOCK_BADGES)?;

        for username in MOCK_USERNAMES {
            if let Some(user) = self.db.get_user_by_username(username)? {
                removed += self.db.purge_user(user.id)?;
            }
        }

        tracing::info!(removed, "Mock data flushed");
        Ok(removed)
    }

    /// Current per-table counts
    pub fn stats(&self) -> Result<MockStats> {
        Ok(MockStats {
            users: self.db.count_users_named(&MOCK_USERNAMES)?,
            flashcard_packs: self.db.count_all("flashcard_packs")?,
            flashcards: self.db.count_all("flashcards")?,
            chat_rooms: self.db.count_all("chat_rooms")?,
            activities: self.db.count_all("user_activity")?,
            study_sessions: self.db.count_all("study_sessions")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_flush_cycle() {
        let db = Database::in_memory().unwrap();
        let manager = MockDataManager::new(db.clone());

        let created = manager.seed_all().await.unwrap();
        assert!(created > 0);

        let stats = manager.stats().unwrap();
        assert_eq!(stats.users, 3);
        assert_eq!(stats.flashcard_packs, 3);
        assert_eq!(stats.flashcards, 6);
        assert_eq!(stats.chat_rooms, 1);
        assert_eq!(stats.study_sessions, 2);

        let removed = manager.flush_all().unwrap();
        assert!(removed > 0);

        let stats = manager.stats().unwrap();
        assert_eq!(stats.users, 0);
        assert_eq!(stats.flashcards, 0);
        assert_eq!(stats.total(), 0);
    }

    #[tokio::test]
    async fn test_seed_is_user_idempotent() {
        let db = Database::in_memory().unwrap();
        let manager = MockDataManager::new(db.clone());

        manager.seed_all().await.unwrap();
        // Reseeding must not duplicate user accounts
        manager.seed_all().await.unwrap();
        assert_eq!(manager.stats().unwrap().users, 3);
    }
}

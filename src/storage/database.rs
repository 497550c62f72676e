//! SQLite database for all relational application data

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::activity::TrackActivityRequest;
use crate::types::chat::NewMessage;
use crate::types::{
    Badge, ChatMessage, ChatParticipant, ChatRoom, Flashcard, FlashcardPack, Notification,
    Progress, Score, StudySession, User, UserActivity, UserBadge,
};

/// Database handle shared across the application
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// One row of the points leaderboard
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub points: i64,
}

impl Database {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Internal(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Shared connection, for modules layered on the same file (vector store)
    pub(crate) fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        // WAL mode for better concurrent read performance
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
        "#,
        )
        .map_err(|e| Error::Internal(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_rooms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                is_private INTEGER NOT NULL DEFAULT 0,
                created_by INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                room_id INTEGER NOT NULL REFERENCES chat_rooms(id) ON DELETE CASCADE,
                sender_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                is_ai INTEGER NOT NULL DEFAULT 0,
                message_type TEXT NOT NULL DEFAULT 'text',
                status TEXT NOT NULL DEFAULT 'sent',
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chat_messages_room ON chat_messages(room_id);
            CREATE INDEX IF NOT EXISTS idx_chat_messages_sender ON chat_messages(sender_id);

            CREATE TABLE IF NOT EXISTS chat_participants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                room_id INTEGER NOT NULL REFERENCES chat_rooms(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL,
                joined_at TEXT NOT NULL,
                UNIQUE(room_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS flashcard_packs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                owner_id INTEGER NOT NULL REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_flashcard_packs_owner ON flashcard_packs(owner_id);

            CREATE TABLE IF NOT EXISTS flashcards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                owner_id INTEGER NOT NULL REFERENCES users(id),
                pack_id INTEGER REFERENCES flashcard_packs(id) ON DELETE CASCADE,
                next_review TEXT,
                image_url TEXT,
                audio_url TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_flashcards_owner ON flashcards(owner_id);
            CREATE INDEX IF NOT EXISTS idx_flashcards_pack ON flashcards(pack_id);

            CREATE TABLE IF NOT EXISTS study_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                duration INTEGER NOT NULL,
                subject TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 1,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_study_sessions_user ON study_sessions(user_id);

            CREATE TABLE IF NOT EXISTS scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                points INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS badges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                icon_url TEXT
            );

            CREATE TABLE IF NOT EXISTS user_badges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                badge_id INTEGER NOT NULL REFERENCES badges(id) ON DELETE CASCADE,
                awarded_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_user_badges_user ON user_badges(user_id);

            CREATE TABLE IF NOT EXISTS progress (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                current_level TEXT,
                completed_lessons TEXT NOT NULL DEFAULT '[]',
                last_updated TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                message TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                notify_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);

            CREATE TABLE IF NOT EXISTS user_activity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                activity_type TEXT NOT NULL,
                page_url TEXT,
                element_id TEXT,
                extra_data TEXT,
                session_id TEXT,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_user_activity_user ON user_activity(user_id);

            CREATE TABLE IF NOT EXISTS llm_query_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                prompt TEXT NOT NULL,
                response TEXT,
                model_name TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS rag_documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                subject TEXT NOT NULL DEFAULT 'general',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_rag_documents_subject ON rag_documents(subject);
        "#,
        )
        .map_err(|e| Error::Internal(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Probe the database connection (health check)
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    // ==================== Users ====================

    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (username, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![username, email, password_hash, role, now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role: role.to_string(),
            created_at: now,
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT id, username, email, password_hash, role, created_at
                 FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT id, username, email, password_hash, role, created_at
                 FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Whether the username is taken by a different user
    pub fn username_exists(&self, username: &str, exclude: Option<i64>) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1 AND id != ?2",
            params![username, exclude.unwrap_or(-1)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether the email is registered to a different user
    pub fn email_exists(&self, email: &str, exclude: Option<i64>) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1 AND id != ?2",
            params![email, exclude.unwrap_or(-1)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, username, email, password_hash, role, created_at FROM users ORDER BY id",
        )?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn update_user_profile(
        &self,
        id: i64,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock();
        if let Some(username) = username {
            conn.execute(
                "UPDATE users SET username = ?1 WHERE id = ?2",
                params![username, id],
            )?;
        }
        if let Some(email) = email {
            conn.execute(
                "UPDATE users SET email = ?1 WHERE id = ?2",
                params![email, id],
            )?;
        }
        Ok(())
    }

    pub fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, id],
        )?;
        Ok(())
    }

    // ==================== Chat ====================

    pub fn create_room(
        &self,
        name: &str,
        description: &str,
        is_private: bool,
        created_by: Option<i64>,
    ) -> Result<ChatRoom> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO chat_rooms (name, description, is_private, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, description, is_private, created_by, now],
        )?;
        Ok(ChatRoom {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.to_string(),
            is_private,
            created_by,
            created_at: now,
        })
    }

    pub fn get_room(&self, id: i64) -> Result<Option<ChatRoom>> {
        let conn = self.conn.lock();
        let room = conn
            .query_row(
                "SELECT id, name, description, is_private, created_by, created_at
                 FROM chat_rooms WHERE id = ?1",
                params![id],
                row_to_room,
            )
            .optional()?;
        Ok(room)
    }

    pub fn get_room_by_name(&self, name: &str) -> Result<Option<ChatRoom>> {
        let conn = self.conn.lock();
        let room = conn
            .query_row(
                "SELECT id, name, description, is_private, created_by, created_at
                 FROM chat_rooms WHERE name = ?1",
                params![name],
                row_to_room,
            )
            .optional()?;
        Ok(room)
    }

    pub fn list_rooms(&self) -> Result<Vec<ChatRoom>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, is_private, created_by, created_at
             FROM chat_rooms ORDER BY id",
        )?;
        let rooms = stmt
            .query_map([], row_to_room)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rooms)
    }

    pub fn add_participant(&self, room_id: i64, user_id: i64) -> Result<ChatParticipant> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO chat_participants (room_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![room_id, user_id, now],
        )?;
        Ok(ChatParticipant {
            id: conn.last_insert_rowid(),
            room_id,
            user_id,
            joined_at: now,
        })
    }

    pub fn is_participant(&self, room_id: i64, user_id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chat_participants WHERE room_id = ?1 AND user_id = ?2",
            params![room_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_message(&self, msg: &NewMessage) -> Result<ChatMessage> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO chat_messages
                (room_id, sender_id, content, role, is_ai, message_type, status, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                msg.room_id,
                msg.sender_id,
                msg.content,
                msg.role,
                msg.is_ai,
                msg.message_type,
                msg.status,
                now
            ],
        )?;
        Ok(ChatMessage {
            id: conn.last_insert_rowid(),
            room_id: msg.room_id,
            sender_id: msg.sender_id,
            content: msg.content.clone(),
            role: msg.role.clone(),
            is_ai: msg.is_ai,
            message_type: msg.message_type.clone(),
            status: msg.status.clone(),
            timestamp: now,
        })
    }

    /// All messages in a room, oldest first
    pub fn messages_for_room(&self, room_id: i64) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, room_id, sender_id, content, role, is_ai, message_type, status, timestamp
             FROM chat_messages WHERE room_id = ?1 ORDER BY timestamp ASC, id ASC",
        )?;
        let messages = stmt
            .query_map(params![room_id], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// The latest `limit` messages in a room, returned oldest first
    pub fn recent_messages(&self, room_id: i64, limit: usize) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, room_id, sender_id, content, role, is_ai, message_type, status, timestamp
             FROM chat_messages WHERE room_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;
        let mut messages = stmt
            .query_map(params![room_id, limit], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    pub fn count_messages_by_sender(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM chat_messages WHERE sender_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==================== Learning ====================

    pub fn create_pack(
        &self,
        title: &str,
        description: Option<&str>,
        owner_id: i64,
    ) -> Result<FlashcardPack> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO flashcard_packs (title, description, owner_id) VALUES (?1, ?2, ?3)",
            params![title, description, owner_id],
        )?;
        Ok(FlashcardPack {
            id: conn.last_insert_rowid(),
            title: title.to_string(),
            description: description.map(|s| s.to_string()),
            owner_id,
        })
    }

    pub fn get_pack(&self, id: i64, owner_id: i64) -> Result<Option<FlashcardPack>> {
        let conn = self.conn.lock();
        let pack = conn
            .query_row(
                "SELECT id, title, description, owner_id FROM flashcard_packs
                 WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
                row_to_pack,
            )
            .optional()?;
        Ok(pack)
    }

    pub fn list_packs(&self, owner_id: i64) -> Result<Vec<FlashcardPack>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, description, owner_id FROM flashcard_packs
             WHERE owner_id = ?1 ORDER BY id",
        )?;
        let packs = stmt
            .query_map(params![owner_id], row_to_pack)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(packs)
    }

    pub fn create_flashcard(
        &self,
        question: &str,
        answer: &str,
        owner_id: i64,
        pack_id: Option<i64>,
    ) -> Result<Flashcard> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO flashcards (question, answer, owner_id, pack_id) VALUES (?1, ?2, ?3, ?4)",
            params![question, answer, owner_id, pack_id],
        )?;
        Ok(Flashcard {
            id: conn.last_insert_rowid(),
            question: question.to_string(),
            answer: answer.to_string(),
            owner_id,
            pack_id,
            next_review: None,
            image_url: None,
            audio_url: None,
        })
    }

    /// Bulk insert question/answer pairs into a pack, in one transaction
    pub fn insert_flashcards(
        &self,
        cards: &[(String, String)],
        owner_id: i64,
        pack_id: i64,
    ) -> Result<Vec<Flashcard>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut created = Vec::with_capacity(cards.len());
        for (question, answer) in cards {
            tx.execute(
                "INSERT INTO flashcards (question, answer, owner_id, pack_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![question, answer, owner_id, pack_id],
            )?;
            created.push(Flashcard {
                id: tx.last_insert_rowid(),
                question: question.clone(),
                answer: answer.clone(),
                owner_id,
                pack_id: Some(pack_id),
                next_review: None,
                image_url: None,
                audio_url: None,
            });
        }
        tx.commit()?;
        Ok(created)
    }

    pub fn flashcards_for_owner(
        &self,
        owner_id: i64,
        pack_id: Option<i64>,
    ) -> Result<Vec<Flashcard>> {
        let conn = self.conn.lock();
        let mut cards = Vec::new();
        match pack_id {
            Some(pack_id) => {
                let mut stmt = conn.prepare(
                    "SELECT id, question, answer, owner_id, pack_id, next_review, image_url, audio_url
                     FROM flashcards WHERE owner_id = ?1 AND pack_id = ?2 ORDER BY id",
                )?;
                for card in stmt.query_map(params![owner_id, pack_id], row_to_flashcard)? {
                    cards.push(card?);
                }
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, question, answer, owner_id, pack_id, next_review, image_url, audio_url
                     FROM flashcards WHERE owner_id = ?1 ORDER BY id",
                )?;
                for card in stmt.query_map(params![owner_id], row_to_flashcard)? {
                    cards.push(card?);
                }
            }
        }
        Ok(cards)
    }

    pub fn flashcards_in_pack(&self, pack_id: i64) -> Result<Vec<Flashcard>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, question, answer, owner_id, pack_id, next_review, image_url, audio_url
             FROM flashcards WHERE pack_id = ?1 ORDER BY id",
        )?;
        let cards = stmt
            .query_map(params![pack_id], row_to_flashcard)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    pub fn get_flashcard(&self, id: i64, owner_id: i64) -> Result<Option<Flashcard>> {
        let conn = self.conn.lock();
        let card = conn
            .query_row(
                "SELECT id, question, answer, owner_id, pack_id, next_review, image_url, audio_url
                 FROM flashcards WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
                row_to_flashcard,
            )
            .optional()?;
        Ok(card)
    }

    pub fn update_flashcard(
        &self,
        id: i64,
        owner_id: i64,
        question: Option<&str>,
        answer: Option<&str>,
    ) -> Result<Option<Flashcard>> {
        {
            let conn = self.conn.lock();
            if let Some(question) = question {
                conn.execute(
                    "UPDATE flashcards SET question = ?1 WHERE id = ?2 AND owner_id = ?3",
                    params![question, id, owner_id],
                )?;
            }
            if let Some(answer) = answer {
                conn.execute(
                    "UPDATE flashcards SET answer = ?1 WHERE id = ?2 AND owner_id = ?3",
                    params![answer, id, owner_id],
                )?;
            }
        }
        self.get_flashcard(id, owner_id)
    }

    /// Returns true if a card was deleted
    pub fn delete_flashcard(&self, id: i64, owner_id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM flashcards WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        Ok(deleted > 0)
    }

    pub fn count_packs(&self, owner_id: i64) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM flashcard_packs WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_flashcards(&self, owner_id: i64) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM flashcards WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn insert_study_session(
        &self,
        user_id: i64,
        duration: i64,
        subject: &str,
        completed: bool,
    ) -> Result<StudySession> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO study_sessions (user_id, duration, subject, completed, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, duration, subject, completed, now],
        )?;
        Ok(StudySession {
            id: conn.last_insert_rowid(),
            user_id,
            duration,
            subject: subject.to_string(),
            completed,
            timestamp: now,
        })
    }

    /// Study sessions for a user, newest first, optionally limited
    pub fn study_sessions(&self, user_id: i64, limit: Option<usize>) -> Result<Vec<StudySession>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, duration, subject, completed, timestamp
             FROM study_sessions WHERE user_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let sessions = stmt
            .query_map(params![user_id, limit], row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    // ==================== Engagement ====================

    pub fn get_score(&self, user_id: i64) -> Result<Option<Score>> {
        let conn = self.conn.lock();
        let score = conn
            .query_row(
                "SELECT id, user_id, points FROM scores WHERE user_id = ?1",
                params![user_id],
                row_to_score,
            )
            .optional()?;
        Ok(score)
    }

    pub fn get_or_create_score(&self, user_id: i64) -> Result<Score> {
        if let Some(score) = self.get_score(user_id)? {
            return Ok(score);
        }
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO scores (user_id, points) VALUES (?1, 0)",
            params![user_id],
        )?;
        drop(conn);
        self.get_score(user_id)?
            .ok_or_else(|| Error::Internal("score row missing after insert".to_string()))
    }

    pub fn add_points(&self, user_id: i64, points: i64) -> Result<Score> {
        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO scores (user_id, points) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET points = points + excluded.points",
                params![user_id, points],
            )?;
        }
        self.get_score(user_id)?
            .ok_or_else(|| Error::Internal("score row missing after upsert".to_string()))
    }

    pub fn insert_badge(
        &self,
        name: &str,
        description: Option<&str>,
        icon_url: Option<&str>,
    ) -> Result<Badge> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO badges (name, description, icon_url) VALUES (?1, ?2, ?3)",
            params![name, description, icon_url],
        )?;
        Ok(Badge {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(|s| s.to_string()),
            icon_url: icon_url.map(|s| s.to_string()),
        })
    }

    pub fn list_badges(&self) -> Result<Vec<Badge>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, name, description, icon_url FROM badges ORDER BY id")?;
        let badges = stmt
            .query_map([], row_to_badge)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(badges)
    }

    pub fn award_badge(&self, user_id: i64, badge_id: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO user_badges (user_id, badge_id, awarded_at) VALUES (?1, ?2, ?3)",
            params![user_id, badge_id, Utc::now()],
        )?;
        Ok(())
    }

    pub fn badges_for_user(&self, user_id: i64) -> Result<Vec<UserBadge>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT ub.id, ub.user_id, ub.badge_id, ub.awarded_at,
                    b.id, b.name, b.description, b.icon_url
             FROM user_badges ub JOIN badges b ON b.id = ub.badge_id
             WHERE ub.user_id = ?1 ORDER BY ub.awarded_at",
        )?;
        let badges = stmt
            .query_map(params![user_id], |row| {
                Ok(UserBadge {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    badge_id: row.get(2)?,
                    awarded_at: row.get(3)?,
                    badge: Badge {
                        id: row.get(4)?,
                        name: row.get(5)?,
                        description: row.get(6)?,
                        icon_url: row.get(7)?,
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(badges)
    }

    pub fn get_progress(&self, user_id: i64) -> Result<Option<Progress>> {
        let conn = self.conn.lock();
        let progress = conn
            .query_row(
                "SELECT id, user_id, current_level, completed_lessons, last_updated
                 FROM progress WHERE user_id = ?1",
                params![user_id],
                row_to_progress,
            )
            .optional()?;
        Ok(progress)
    }

    pub fn upsert_progress(
        &self,
        user_id: i64,
        current_level: Option<&str>,
        completed_lessons: Option<&[i64]>,
    ) -> Result<Progress> {
        let existing = self.get_progress(user_id)?;
        let level = current_level
            .map(|s| s.to_string())
            .or_else(|| existing.as_ref().and_then(|p| p.current_level.clone()));
        let lessons = completed_lessons
            .map(|l| l.to_vec())
            .or_else(|| existing.as_ref().map(|p| p.completed_lessons.clone()))
            .unwrap_or_default();
        let lessons_json = serde_json::to_string(&lessons)
            .map_err(|e| Error::Internal(format!("serialize lessons: {}", e)))?;

        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO progress (user_id, current_level, completed_lessons, last_updated)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                current_level = excluded.current_level,
                completed_lessons = excluded.completed_lessons,
                last_updated = excluded.last_updated",
            params![user_id, level, lessons_json, now],
        )?;
        drop(conn);
        self.get_progress(user_id)?
            .ok_or_else(|| Error::Internal("progress row missing after upsert".to_string()))
    }

    pub fn insert_notification(
        &self,
        user_id: i64,
        message: &str,
        notify_at: Option<DateTime<Utc>>,
    ) -> Result<Notification> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO notifications (user_id, message, is_read, created_at, notify_at)
             VALUES (?1, ?2, 0, ?3, ?4)",
            params![user_id, message, now, notify_at],
        )?;
        Ok(Notification {
            id: conn.last_insert_rowid(),
            user_id,
            message: message.to_string(),
            is_read: false,
            created_at: now,
            notify_at,
        })
    }

    /// Notifications for a user, newest first
    pub fn notifications_for_user(&self, user_id: i64) -> Result<Vec<Notification>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, message, is_read, created_at, notify_at
             FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let notifications = stmt
            .query_map(params![user_id], row_to_notification)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    pub fn mark_notification_read(&self, id: i64) -> Result<Option<Notification>> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1",
            params![id],
        )?;
        let notification = conn
            .query_row(
                "SELECT id, user_id, message, is_read, created_at, notify_at
                 FROM notifications WHERE id = ?1",
                params![id],
                row_to_notification,
            )
            .optional()?;
        Ok(notification)
    }

    /// Top users by points, with usernames
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT u.username, s.points FROM scores s
             JOIN users u ON u.id = s.user_id
             ORDER BY s.points DESC, u.username ASC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, (username, points))| LeaderboardEntry {
                rank: i + 1,
                username,
                points,
            })
            .collect())
    }

    // ==================== Activity ====================

    pub fn insert_activity(
        &self,
        user_id: i64,
        req: &TrackActivityRequest,
    ) -> Result<UserActivity> {
        let extra_json = req
            .extra_data
            .as_ref()
            .map(|v| serde_json::to_string(v))
            .transpose()
            .map_err(|e| Error::Internal(format!("serialize extra_data: {}", e)))?;

        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO user_activity
                (user_id, activity_type, page_url, element_id, extra_data, session_id, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user_id,
                req.activity_type,
                req.page_url,
                req.element_id,
                extra_json,
                req.session_id,
                now
            ],
        )?;
        Ok(UserActivity {
            id: conn.last_insert_rowid(),
            user_id,
            activity_type: req.activity_type.clone(),
            page_url: req.page_url.clone(),
            element_id: req.element_id.clone(),
            extra_data: req.extra_data.clone(),
            session_id: req.session_id.clone(),
            timestamp: now,
        })
    }

    pub fn count_activities(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM user_activity WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// All activity timestamps for a user (streak/recent-activity computation)
    pub fn activity_timestamps(&self, user_id: i64) -> Result<Vec<DateTime<Utc>>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT timestamp FROM user_activity WHERE user_id = ?1")?;
        let timestamps = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(timestamps)
    }

    // ==================== LLM logs ====================

    pub fn insert_llm_log(
        &self,
        user_id: Option<i64>,
        prompt: &str,
        response: Option<&str>,
        model_name: &str,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO llm_query_logs (user_id, prompt, response, model_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, prompt, response, model_name, Utc::now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // ==================== Global counts (stats/mock data) ====================

    pub fn count_users_named(&self, usernames: &[&str]) -> Result<i64> {
        let conn = self.conn.lock();
        let placeholders = vec!["?"; usernames.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM users WHERE username IN ({})",
            placeholders
        );
        let count = conn.query_row(&sql, rusqlite::params_from_iter(usernames), |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    pub fn count_all(&self, table: &str) -> Result<i64> {
        // Table names come from a fixed internal list, never from requests
        let conn = self.conn.lock();
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    // ==================== Mock data cleanup ====================

    /// Delete a room along with its messages and participants
    pub fn delete_room_by_name(&self, name: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM chat_rooms WHERE name = ?1", params![name])?;
        Ok(deleted)
    }

    pub fn delete_badges_by_names(&self, names: &[&str]) -> Result<usize> {
        let conn = self.conn.lock();
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!("DELETE FROM badges WHERE name IN ({})", placeholders);
        let deleted = conn.execute(&sql, rusqlite::params_from_iter(names))?;
        Ok(deleted)
    }

    /// Remove every row owned by a user, then the user itself.
    /// Returns the number of rows removed.
    pub fn purge_user(&self, user_id: i64) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut removed = 0;
        for sql in [
            "DELETE FROM flashcards WHERE owner_id = ?1",
            "DELETE FROM flashcard_packs WHERE owner_id = ?1",
            "DELETE FROM study_sessions WHERE user_id = ?1",
            "DELETE FROM scores WHERE user_id = ?1",
            "DELETE FROM progress WHERE user_id = ?1",
            "DELETE FROM notifications WHERE user_id = ?1",
            "DELETE FROM user_activity WHERE user_id = ?1",
            "DELETE FROM user_badges WHERE user_id = ?1",
            "DELETE FROM chat_participants WHERE user_id = ?1",
            "DELETE FROM chat_messages WHERE sender_id = ?1",
            "DELETE FROM users WHERE id = ?1",
        ] {
            removed += tx.execute(sql, params![user_id])?;
        }
        tx.commit()?;
        Ok(removed)
    }
}

// ==================== Row mappers ====================

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_room(row: &Row) -> rusqlite::Result<ChatRoom> {
    Ok(ChatRoom {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        is_private: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_message(row: &Row) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        room_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        role: row.get(4)?,
        is_ai: row.get(5)?,
        message_type: row.get(6)?,
        status: row.get(7)?,
        timestamp: row.get(8)?,
    })
}

fn row_to_pack(row: &Row) -> rusqlite::Result<FlashcardPack> {
    Ok(FlashcardPack {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        owner_id: row.get(3)?,
    })
}

fn row_to_flashcard(row: &Row) -> rusqlite::Result<Flashcard> {
    Ok(Flashcard {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        owner_id: row.get(3)?,
        pack_id: row.get(4)?,
        next_review: row.get(5)?,
        image_url: row.get(6)?,
        audio_url: row.get(7)?,
    })
}

fn row_to_session(row: &Row) -> rusqlite::Result<StudySession> {
    Ok(StudySession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        duration: row.get(2)?,
        subject: row.get(3)?,
        completed: row.get(4)?,
        timestamp: row.get(5)?,
    })
}

fn row_to_score(row: &Row) -> rusqlite::Result<Score> {
    Ok(Score {
        id: row.get(0)?,
        user_id: row.get(1)?,
        points: row.get(2)?,
    })
}

fn row_to_badge(row: &Row) -> rusqlite::Result<Badge> {
    Ok(Badge {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon_url: row.get(3)?,
    })
}

fn row_to_progress(row: &Row) -> rusqlite::Result<Progress> {
    let lessons_json: String = row.get(3)?;
    Ok(Progress {
        id: row.get(0)?,
        user_id: row.get(1)?,
        current_level: row.get(2)?,
        completed_lessons: serde_json::from_str(&lessons_json).unwrap_or_default(),
        last_updated: row.get(4)?,
    })
}

fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message: row.get(2)?,
        is_read: row.get(3)?,
        created_at: row.get(4)?,
        notify_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(db: &Database, name: &str) -> User {
        db.create_user(name, &format!("{}@test.com", name), "hash", "user")
            .unwrap()
    }

    #[test]
    fn test_file_backed_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite3");

        {
            let db = Database::new(&path).unwrap();
            test_user(&db, "alice");
        }

        // Reopen: migration is idempotent and data survives
        let db = Database::new(&path).unwrap();
        assert!(db.get_user_by_username("alice").unwrap().is_some());
    }

    #[test]
    fn test_user_crud() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "alice");

        let fetched = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.role, "user");

        assert!(db.username_exists("alice", None).unwrap());
        assert!(!db.username_exists("alice", Some(user.id)).unwrap());
        assert!(db.email_exists("alice@test.com", None).unwrap());

        db.update_user_profile(user.id, Some("alice2"), None).unwrap();
        assert_eq!(db.get_user(user.id).unwrap().unwrap().username, "alice2");
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let db = Database::in_memory().unwrap();
        test_user(&db, "alice");
        assert!(db
            .create_user("alice", "other@test.com", "hash", "user")
            .is_err());
    }

    #[test]
    fn test_room_and_messages() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "alice");
        let room = db.create_room("Study Group", "", false, Some(user.id)).unwrap();

        db.add_participant(room.id, user.id).unwrap();
        assert!(db.is_participant(room.id, user.id).unwrap());
        // Duplicate join violates UNIQUE(room_id, user_id)
        assert!(db.add_participant(room.id, user.id).is_err());

        for i in 0..3 {
            db.insert_message(&NewMessage::text(
                room.id,
                user.id,
                format!("msg {}", i),
                "user".to_string(),
            ))
            .unwrap();
        }

        let messages = db.messages_for_room(room.id).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "msg 0");

        let recent = db.recent_messages(room.id, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "msg 1");
        assert_eq!(recent[1].content, "msg 2");

        assert_eq!(db.count_messages_by_sender(user.id).unwrap(), 3);
    }

    #[test]
    fn test_pack_cascade() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "alice");
        let pack = db.create_pack("Rust", Some("basics"), user.id).unwrap();
        db.create_flashcard("Q1", "A1", user.id, Some(pack.id)).unwrap();
        db.create_flashcard("Q2", "A2", user.id, Some(pack.id)).unwrap();

        assert_eq!(db.flashcards_in_pack(pack.id).unwrap().len(), 2);

        // Deleting the pack cascades to its cards
        {
            let conn = db.conn.lock();
            conn.execute("DELETE FROM flashcard_packs WHERE id = ?1", params![pack.id])
                .unwrap();
        }
        assert_eq!(db.flashcards_in_pack(pack.id).unwrap().len(), 0);
    }

    #[test]
    fn test_flashcard_owner_scoping() {
        let db = Database::in_memory().unwrap();
        let alice = test_user(&db, "alice");
        let bob = test_user(&db, "bob");
        let card = db.create_flashcard("Q", "A", alice.id, None).unwrap();

        assert!(db.get_flashcard(card.id, bob.id).unwrap().is_none());
        assert!(!db.delete_flashcard(card.id, bob.id).unwrap());
        assert!(db.delete_flashcard(card.id, alice.id).unwrap());
    }

    #[test]
    fn test_score_upsert() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "alice");

        let score = db.get_or_create_score(user.id).unwrap();
        assert_eq!(score.points, 0);

        let score = db.add_points(user.id, 50).unwrap();
        assert_eq!(score.points, 50);
        let score = db.add_points(user.id, 25).unwrap();
        assert_eq!(score.points, 75);
    }

    #[test]
    fn test_progress_upsert() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "alice");

        assert!(db.get_progress(user.id).unwrap().is_none());

        let progress = db
            .upsert_progress(user.id, Some("Beginner"), Some(&[1, 2, 3]))
            .unwrap();
        assert_eq!(progress.completed_lessons, vec![1, 2, 3]);

        // Partial update keeps existing fields
        let progress = db.upsert_progress(user.id, Some("Intermediate"), None).unwrap();
        assert_eq!(progress.current_level.as_deref(), Some("Intermediate"));
        assert_eq!(progress.completed_lessons, vec![1, 2, 3]);
    }

    #[test]
    fn test_notifications() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "alice");

        let n = db.insert_notification(user.id, "Welcome!", None).unwrap();
        assert!(!n.is_read);

        let read = db.mark_notification_read(n.id).unwrap().unwrap();
        assert!(read.is_read);

        assert!(db.mark_notification_read(999).unwrap().is_none());
    }

    #[test]
    fn test_leaderboard() {
        let db = Database::in_memory().unwrap();
        let alice = test_user(&db, "alice");
        let bob = test_user(&db, "bob");
        db.add_points(alice.id, 100).unwrap();
        db.add_points(bob.id, 250).unwrap();

        let board = db.leaderboard(10).unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].username, "bob");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].username, "alice");
    }

    #[test]
    fn test_purge_user() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "alice");
        let pack = db.create_pack("P", None, user.id).unwrap();
        db.create_flashcard("Q", "A", user.id, Some(pack.id)).unwrap();
        db.add_points(user.id, 10).unwrap();
        db.insert_notification(user.id, "hi", None).unwrap();

        let removed = db.purge_user(user.id).unwrap();
        assert!(removed >= 5);
        assert!(db.get_user(user.id).unwrap().is_none());
        assert_eq!(db.count_flashcards(user.id).unwrap(), 0);
    }
}

pub mod file;

use futures::future::BoxFuture;

use crate::dao::{
    models::{
        LeaderboardRowEntity, LeaderboardSnapshotEntity, QuestionEntity,
        QuestionSetListItemEntity, SessionEntity, SnapshotListItemEntity,
    },
    storage::StorageResult,
};

/// Abstraction over where sessions, archived leaderboards and question sets are kept.
pub trait SessionStore: Send + Sync {
    /// Overwrite the snapshot of `session.code`. Readers never observe a partial write.
    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn load_session(&self, code: String) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Every readable session. Unreadable snapshots are skipped.
    fn load_all_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>>;
    fn delete_session(&self, code: String) -> BoxFuture<'static, StorageResult<bool>>;

    /// Archive a ranked leaderboard and return the snapshot id.
    fn save_leaderboard_snapshot(
        &self,
        code: String,
        rows: Vec<LeaderboardRowEntity>,
    ) -> BoxFuture<'static, StorageResult<String>>;
    /// Archived leaderboards, newest first, optionally restricted to one session.
    fn list_leaderboard_snapshots(
        &self,
        code: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<SnapshotListItemEntity>>>;
    fn load_leaderboard_snapshot(
        &self,
        snapshot_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<LeaderboardSnapshotEntity>>>;
    /// Delete archived leaderboards and return how many were removed.
    fn delete_leaderboard_snapshots(
        &self,
        code: Option<String>,
    ) -> BoxFuture<'static, StorageResult<usize>>;

    /// Store a named question set and return its file name.
    fn save_question_set(
        &self,
        name: String,
        questions: Vec<QuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<String>>;
    fn load_question_set(
        &self,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<Vec<QuestionEntity>>>>;
    /// Stored question sets sorted by name.
    fn list_question_sets(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionSetListItemEntity>>>;
    fn delete_question_set(&self, name: String) -> BoxFuture<'static, StorageResult<bool>>;
}

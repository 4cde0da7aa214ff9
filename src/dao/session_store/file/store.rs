use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{
    error::{FileDaoError, FileResult},
    layout::{
        JSON_EXT, LEADERBOARDS_DIR, QUESTION_SETS_DIR, SESSIONS_DIR, compact_timestamp,
        human_timestamp, is_snapshot_of, question_set_path, sanitize_set_name, session_key,
        session_path, snapshot_path, temp_path,
    },
};
use crate::dao::{
    models::{
        LeaderboardRowEntity, LeaderboardSnapshotEntity, QuestionEntity,
        QuestionSetListItemEntity, SessionEntity, SnapshotListItemEntity,
    },
    session_store::SessionStore,
    storage::StorageResult,
};

/// JSON files under a data directory: one file per session, per archived
/// leaderboard and per stored question set.
#[derive(Clone)]
pub struct FileSessionStore {
    root: Arc<PathBuf>,
}

impl FileSessionStore {
    /// Prepare the directory tree under `root` and return a store bound to it.
    pub async fn open(root: impl Into<PathBuf>) -> FileResult<Self> {
        let root = root.into();
        for dir in [SESSIONS_DIR, QUESTION_SETS_DIR, LEADERBOARDS_DIR] {
            let path = root.join(dir);
            tokio::fs::create_dir_all(&path)
                .await
                .map_err(|source| FileDaoError::CreateDir { path, source })?;
        }
        Ok(Self {
            root: Arc::new(root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write through a temporary sibling then rename over the target.
    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> FileResult<()> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| FileDaoError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| FileDaoError::Write {
                path: tmp.clone(),
                source,
            })?;
        if let Err(source) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(FileDaoError::Rename {
                path: path.to_path_buf(),
                source,
            });
        }
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> FileResult<Option<T>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(FileDaoError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| FileDaoError::Decode {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn remove(&self, path: &Path) -> FileResult<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(FileDaoError::Remove {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// JSON files of `dir` as `(stem, path)`, sorted by stem. Temporary files are ignored.
    async fn json_files(&self, dir: &str) -> FileResult<Vec<(String, PathBuf)>> {
        let dir_path = self.root.join(dir);
        let mut entries = match tokio::fs::read_dir(&dir_path).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(FileDaoError::ReadDir {
                    path: dir_path,
                    source,
                });
            }
        };

        let mut files = Vec::new();
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|source| FileDaoError::ReadDir {
                    path: dir_path.clone(),
                    source,
                })?;
            let Some(entry) = entry else { break };
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(stem) = file_name.strip_suffix(JSON_EXT) else {
                continue;
            };
            files.push((stem.to_string(), entry.path()));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    async fn save_session(&self, session: SessionEntity) -> FileResult<()> {
        let path = session_path(&self.root, &session.code).ok_or_else(|| FileDaoError::InvalidKey {
            key: session.code.clone(),
        })?;
        self.write_json(&path, &session).await?;
        debug!(session = %session.code, "session saved");
        Ok(())
    }

    async fn load_session(&self, code: String) -> FileResult<Option<SessionEntity>> {
        let Some(key) = session_key(&code) else {
            return Ok(None);
        };
        let path = self.root.join(SESSIONS_DIR).join(format!("{key}{JSON_EXT}"));
        Ok(self
            .read_json::<SessionEntity>(&path)
            .await?
            .map(|mut session| {
                if session.code.trim().is_empty() {
                    session.code = key;
                }
                session
            }))
    }

    async fn load_all_sessions(&self) -> FileResult<Vec<SessionEntity>> {
        let mut sessions = Vec::new();
        for (stem, path) in self.json_files(SESSIONS_DIR).await? {
            match self.read_json::<SessionEntity>(&path).await {
                Ok(Some(mut session)) => {
                    if session.code.trim().is_empty() {
                        session.code = stem;
                    }
                    sessions.push(session);
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "skipping unreadable session snapshot"),
            }
        }
        Ok(sessions)
    }

    async fn delete_session(&self, code: String) -> FileResult<bool> {
        match session_path(&self.root, &code) {
            Some(path) => self.remove(&path).await,
            None => Ok(false),
        }
    }

    async fn save_leaderboard_snapshot(
        &self,
        code: String,
        rows: Vec<LeaderboardRowEntity>,
    ) -> FileResult<String> {
        let key = session_key(&code).ok_or(FileDaoError::InvalidKey { key: code })?;
        let created_at = compact_timestamp(OffsetDateTime::now_utc());
        let dir = self.root.join(LEADERBOARDS_DIR);

        let mut snapshot_id = format!("{key}_{created_at}");
        let mut attempt = 1;
        while tokio::fs::try_exists(dir.join(format!("{snapshot_id}{JSON_EXT}")))
            .await
            .unwrap_or(false)
        {
            snapshot_id = format!("{key}_{created_at}_{attempt}");
            attempt += 1;
        }

        let snapshot = LeaderboardSnapshotEntity {
            code: key,
            created_at,
            leaderboard: rows,
        };
        let path = dir.join(format!("{snapshot_id}{JSON_EXT}"));
        self.write_json(&path, &snapshot).await?;
        Ok(snapshot_id)
    }

    async fn list_leaderboard_snapshots(
        &self,
        code: Option<String>,
    ) -> FileResult<Vec<SnapshotListItemEntity>> {
        let key = match code.as_deref().map(session_key) {
            Some(None) => return Ok(Vec::new()),
            key => key.flatten(),
        };
        let mut items = Vec::new();
        for (stem, path) in self.json_files(LEADERBOARDS_DIR).await? {
            if let Some(key) = &key
                && !is_snapshot_of(&stem, key)
            {
                continue;
            }
            let snapshot = match self.read_json::<LeaderboardSnapshotEntity>(&path).await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => continue,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable leaderboard snapshot");
                    continue;
                }
            };
            items.push(SnapshotListItemEntity {
                file: format!("{stem}{JSON_EXT}"),
                created_at_human: human_timestamp(&snapshot.created_at),
                created_at: snapshot.created_at,
                count: snapshot.leaderboard.len(),
                code: snapshot.code,
                name: stem,
            });
        }
        items.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(items)
    }

    async fn load_leaderboard_snapshot(
        &self,
        snapshot_id: String,
    ) -> FileResult<Option<LeaderboardSnapshotEntity>> {
        let Some(path) = snapshot_path(&self.root, &snapshot_id) else {
            return Ok(None);
        };
        self.read_json(&path).await
    }

    async fn delete_leaderboard_snapshots(&self, code: Option<String>) -> FileResult<usize> {
        let key = match code.as_deref().map(session_key) {
            Some(None) => return Ok(0),
            key => key.flatten(),
        };
        let mut removed = 0;
        for (stem, path) in self.json_files(LEADERBOARDS_DIR).await? {
            if let Some(key) = &key
                && !is_snapshot_of(&stem, key)
            {
                continue;
            }
            if self.remove(&path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn save_question_set(
        &self,
        name: String,
        questions: Vec<QuestionEntity>,
    ) -> FileResult<String> {
        let path = question_set_path(&self.root, &name);
        self.write_json(&path, &questions).await?;
        Ok(format!("{}{JSON_EXT}", sanitize_set_name(&name)))
    }

    async fn load_question_set(&self, name: String) -> FileResult<Option<Vec<QuestionEntity>>> {
        let name = name.strip_suffix(JSON_EXT).unwrap_or(&name);
        self.read_json(&question_set_path(&self.root, name)).await
    }

    async fn list_question_sets(&self) -> FileResult<Vec<QuestionSetListItemEntity>> {
        let mut sets = Vec::new();
        for (stem, path) in self.json_files(QUESTION_SETS_DIR).await? {
            match self.read_json::<Vec<QuestionEntity>>(&path).await {
                Ok(Some(questions)) => sets.push(QuestionSetListItemEntity {
                    name: stem,
                    count: questions.len(),
                }),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "skipping unreadable question set"),
            }
        }
        Ok(sets)
    }

    async fn delete_question_set(&self, name: String) -> FileResult<bool> {
        let name = name.strip_suffix(JSON_EXT).unwrap_or(&name);
        self.remove(&question_set_path(&self.root, name)).await
    }
}

impl SessionStore for FileSessionStore {
    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_session(session).await.map_err(Into::into) })
    }

    fn load_session(&self, code: String) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_session(code).await.map_err(Into::into) })
    }

    fn load_all_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_all_sessions().await.map_err(Into::into) })
    }

    fn delete_session(&self, code: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_session(code).await.map_err(Into::into) })
    }

    fn save_leaderboard_snapshot(
        &self,
        code: String,
        rows: Vec<LeaderboardRowEntity>,
    ) -> BoxFuture<'static, StorageResult<String>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .save_leaderboard_snapshot(code, rows)
                .await
                .map_err(Into::into)
        })
    }

    fn list_leaderboard_snapshots(
        &self,
        code: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<SnapshotListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_leaderboard_snapshots(code).await.map_err(Into::into) })
    }

    fn load_leaderboard_snapshot(
        &self,
        snapshot_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<LeaderboardSnapshotEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .load_leaderboard_snapshot(snapshot_id)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_leaderboard_snapshots(
        &self,
        code: Option<String>,
    ) -> BoxFuture<'static, StorageResult<usize>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_leaderboard_snapshots(code)
                .await
                .map_err(Into::into)
        })
    }

    fn save_question_set(
        &self,
        name: String,
        questions: Vec<QuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<String>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .save_question_set(name, questions)
                .await
                .map_err(Into::into)
        })
    }

    fn load_question_set(
        &self,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<Vec<QuestionEntity>>>> {
        let store = self.clone();
        Box::pin(async move { store.load_question_set(name).await.map_err(Into::into) })
    }

    fn list_question_sets(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionSetListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_question_sets().await.map_err(Into::into) })
    }

    fn delete_question_set(&self, name: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_question_set(name).await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::storage::StorageError;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new() -> Self {
            Self(std::env::temp_dir().join(format!("quizzer-store-{}", uuid::Uuid::new_v4())))
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn session(code: &str) -> SessionEntity {
        serde_json::from_value(serde_json::json!({ "code": code })).unwrap()
    }

    fn row(id: &str, code: &str, score: i64) -> LeaderboardRowEntity {
        LeaderboardRowEntity {
            id: id.into(),
            name: id.into(),
            email: None,
            score,
            participant_code: Some(code.into()),
            firsts: 0,
            cum_time: 0.0,
        }
    }

    fn question(id: &str) -> QuestionEntity {
        QuestionEntity {
            id: id.into(),
            text: format!("question {id}"),
            choices: None,
            answer: None,
            duration: 30,
            hint: None,
        }
    }

    #[tokio::test]
    async fn sessions_round_trip_and_delete() {
        let dir = TempDir::new();
        let store = FileSessionStore::open(&dir.0).await.unwrap();
        let store: &dyn SessionStore = &store;

        let mut entity = session("GLOBAL");
        entity.current_index = 2;
        entity.is_active = true;
        store.save_session(entity.clone()).await.unwrap();

        let loaded = store.load_session("global".into()).await.unwrap();
        assert_eq!(loaded, Some(entity));
        assert!(store.delete_session("GLOBAL".into()).await.unwrap());
        assert!(!store.delete_session("GLOBAL".into()).await.unwrap());
        assert_eq!(store.load_session("GLOBAL".into()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unsafe_session_codes_are_refused() {
        let dir = TempDir::new();
        let store = FileSessionStore::open(&dir.0).await.unwrap();
        let store: &dyn SessionStore = &store;

        let err = store.save_session(session("../escaped")).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
        assert!(!dir.0.join("ESCAPED.json").exists());
        assert!(store
            .save_leaderboard_snapshot("../escaped".into(), vec![])
            .await
            .is_err());
        assert_eq!(store.load_session("../escaped".into()).await.unwrap(), None);
        assert!(!store.delete_session("../escaped".into()).await.unwrap());
    }

    #[tokio::test]
    async fn load_all_skips_corrupt_snapshots() {
        let dir = TempDir::new();
        let store = FileSessionStore::open(&dir.0).await.unwrap();
        SessionStore::save_session(&store, session("A")).await.unwrap();
        SessionStore::save_session(&store, session("B")).await.unwrap();
        std::fs::write(dir.0.join(SESSIONS_DIR).join("BROKEN.json"), b"{ not json").unwrap();
        std::fs::write(dir.0.join(SESSIONS_DIR).join("C.json.abc.tmp"), b"{}").unwrap();

        let mut codes: Vec<String> = SessionStore::load_all_sessions(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|session| session.code)
            .collect();
        codes.sort();
        assert_eq!(codes, vec!["A".to_string(), "B".to_string()]);

        let err = SessionStore::load_session(&store, "BROKEN".into())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn writes_leave_no_temporary_files() {
        let dir = TempDir::new();
        let store = FileSessionStore::open(&dir.0).await.unwrap();
        for _ in 0..3 {
            SessionStore::save_session(&store, session("GLOBAL")).await.unwrap();
        }
        let names: Vec<String> = std::fs::read_dir(dir.0.join(SESSIONS_DIR))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["GLOBAL.json".to_string()]);
    }

    #[tokio::test]
    async fn leaderboard_snapshots_are_listed_per_session_and_cleared() {
        let dir = TempDir::new();
        let store = FileSessionStore::open(&dir.0).await.unwrap();
        let store: &dyn SessionStore = &store;

        let first = store
            .save_leaderboard_snapshot("global".into(), vec![row("p1", "C1", 800)])
            .await
            .unwrap();
        let second = store
            .save_leaderboard_snapshot("GLOBAL".into(), vec![row("p1", "C1", 900), row("p2", "C2", 0)])
            .await
            .unwrap();
        store
            .save_leaderboard_snapshot("OTHER".into(), vec![])
            .await
            .unwrap();
        assert!(first.starts_with("GLOBAL_"));
        assert_ne!(first, second);

        let listed = store
            .list_leaderboard_snapshots(Some("GLOBAL".into()))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].name >= listed[1].name);
        assert!(listed.iter().all(|item| item.code == "GLOBAL"));
        assert!(listed.iter().any(|item| item.count == 2));
        assert_eq!(store.list_leaderboard_snapshots(None).await.unwrap().len(), 3);

        let loaded = store
            .load_leaderboard_snapshot(second.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.leaderboard[0].score, 900);
        assert!(store
            .load_leaderboard_snapshot("../sessions/GLOBAL".into())
            .await
            .unwrap()
            .is_none());

        assert_eq!(
            store
                .delete_leaderboard_snapshots(Some("GLOBAL".into()))
                .await
                .unwrap(),
            2
        );
        assert_eq!(store.list_leaderboard_snapshots(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn snapshots_of_prefixed_sessions_stay_apart() {
        let dir = TempDir::new();
        let store = FileSessionStore::open(&dir.0).await.unwrap();
        let store: &dyn SessionStore = &store;

        store
            .save_leaderboard_snapshot("GLOBAL".into(), vec![row("p1", "C1", 100)])
            .await
            .unwrap();
        let other = store
            .save_leaderboard_snapshot("GLOBAL_2".into(), vec![row("p2", "C2", 200)])
            .await
            .unwrap();

        let listed = store
            .list_leaderboard_snapshots(Some("GLOBAL".into()))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].code, "GLOBAL");

        assert_eq!(
            store
                .delete_leaderboard_snapshots(Some("GLOBAL".into()))
                .await
                .unwrap(),
            1
        );
        assert!(store.load_leaderboard_snapshot(other).await.unwrap().is_some());
        assert_eq!(
            store
                .list_leaderboard_snapshots(Some("GLOBAL_2".into()))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn question_sets_use_sanitized_names() {
        let dir = TempDir::new();
        let store = FileSessionStore::open(&dir.0).await.unwrap();
        let store: &dyn SessionStore = &store;

        let file = store
            .save_question_set("Round One!".into(), vec![question("q1"), question("q2")])
            .await
            .unwrap();
        assert_eq!(file, "roundone.json");
        store
            .save_question_set("alpha".into(), vec![question("a")])
            .await
            .unwrap();

        let sets = store.list_question_sets().await.unwrap();
        assert_eq!(
            sets,
            vec![
                QuestionSetListItemEntity { name: "alpha".into(), count: 1 },
                QuestionSetListItemEntity { name: "roundone".into(), count: 2 },
            ]
        );

        let loaded = store.load_question_set("roundone".into()).await.unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(store.load_question_set("missing".into()).await.unwrap().is_none());
        assert!(store.delete_question_set("roundone.json".into()).await.unwrap());
        assert!(!store.delete_question_set("roundone".into()).await.unwrap());
    }
}

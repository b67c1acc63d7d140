//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{CreateJobRequest, Job, JobError, JobStatus, JobStore};

const JOB_COLUMNS: &str = "id, status, images, title, failure_reason, created_at, updated_at";

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Create a new SQLite job store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, JobError> {
        let conn = Connection::open(path).map_err(|e| JobError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite job store (useful for testing).
    pub fn in_memory() -> Result<Self, JobError> {
        let conn = Connection::open_in_memory().map_err(|e| JobError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                images TEXT NOT NULL,
                remaining INTEGER NOT NULL DEFAULT 0,
                title TEXT NOT NULL,
                failure_reason TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            "#,
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, JobError> {
        self.conn
            .lock()
            .map_err(|_| JobError::Database("connection mutex poisoned".to_string()))
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let id: String = row.get(0)?;
        let status_str: String = row.get(1)?;
        let images_json: String = row.get(2)?;
        let title: String = row.get(3)?;
        let failure_reason: Option<String> = row.get(4)?;
        let created_at_str: String = row.get(5)?;
        let updated_at_str: String = row.get(6)?;

        // Unreadable status/images surface as conversion errors.
        let status = status_str.parse::<JobStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
        })?;

        let images: Vec<String> = serde_json::from_str(&images_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Job {
            id,
            status,
            images,
            title,
            failure_reason,
            created_at,
            updated_at,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Job>, JobError> {
        conn.query_row(
            &format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS),
            params![id],
            Self::row_to_job,
        )
        .optional()
        .map_err(|e| JobError::Database(e.to_string()))
    }
}

impl JobStore for SqliteJobStore {
    fn create(&self, request: CreateJobRequest) -> Result<Job, JobError> {
        let conn = self.conn()?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let title = request
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| id.clone());

        let images_json =
            serde_json::to_string(&request.images).map_err(|e| JobError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO jobs (id, status, images, title, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id,
                JobStatus::Pending.as_str(),
                images_json,
                title,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(Job {
            id,
            status: JobStatus::Pending,
            images: request.images,
            title,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Job>, JobError> {
        let conn = self.conn()?;
        Self::fetch(&conn, id)
    }

    fn list(&self) -> Result<Vec<Job>, JobError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM jobs", JOB_COLUMNS))
            .map_err(|e| JobError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_job)
            .map_err(|e| JobError::Database(e.to_string()))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| JobError::Database(e.to_string()))
    }

    fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, JobError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM jobs WHERE status = ? ORDER BY created_at ASC, rowid ASC",
                JOB_COLUMNS
            ))
            .map_err(|e| JobError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![status.as_str()], Self::row_to_job)
            .map_err(|e| JobError::Database(e.to_string()))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| JobError::Database(e.to_string()))
    }

    fn count_by_status(&self, status: JobStatus) -> Result<i64, JobError> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| JobError::Database(e.to_string()))
    }

    fn update_status(
        &self,
        id: &str,
        status: JobStatus,
        failure_reason: Option<&str>,
    ) -> Result<Job, JobError> {
        // Check and write under one lock.
        let conn = self.conn()?;

        let current = Self::fetch(&conn, id)?.ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if !current.status.can_transition_to(status) {
            return Err(JobError::InvalidTransition {
                job_id: id.to_string(),
                from: current.status,
                to: status,
            });
        }

        let now = Utc::now();
        let failure_reason = failure_reason.map(str::to_string);

        conn.execute(
            "UPDATE jobs SET status = ?, failure_reason = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), failure_reason, now.to_rfc3339(), id],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(Job {
            status,
            failure_reason,
            updated_at: now,
            ..current
        })
    }

    fn delete(&self, id: &str) -> Result<bool, JobError> {
        let conn = self.conn()?;

        let deleted = conn
            .execute("DELETE FROM jobs WHERE id = ?", params![id])
            .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteJobStore {
        SqliteJobStore::in_memory().unwrap()
    }

    fn create_test_request() -> CreateJobRequest {
        CreateJobRequest {
            images: vec![
                "http://x/a.jpg".to_string(),
                "http://x/b.jpg".to_string(),
            ],
            title: Some("Chapter 1".to_string()),
        }
    }

    #[test]
    fn test_create_job() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();

        assert!(!job.id.is_empty());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.title, "Chapter 1");
        assert_eq!(job.images.len(), 2);
        assert!(job.failure_reason.is_none());
    }

    #[test]
    fn test_title_defaults_to_id() {
        let store = create_test_store();
        let job = store
            .create(CreateJobRequest {
                images: vec!["http://x/a.jpg".to_string()],
                title: None,
            })
            .unwrap();
        assert_eq!(job.title, job.id);

        let blank = store
            .create(CreateJobRequest {
                images: vec!["http://x/a.jpg".to_string()],
                title: Some("   ".to_string()),
            })
            .unwrap();
        assert_eq!(blank.title, blank.id);
    }

    #[test]
    fn test_ids_are_unique() {
        let store = create_test_store();
        let a = store.create(create_test_request()).unwrap();
        let b = store.create(create_test_request()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_get_job_preserves_image_order() {
        let store = create_test_store();
        let created = store.create(create_test_request()).unwrap();

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(
            fetched.images,
            vec!["http://x/a.jpg".to_string(), "http://x/b.jpg".to_string()]
        );
    }

    #[test]
    fn test_get_nonexistent_job() {
        let store = create_test_store();
        assert!(store.get("nonexistent-id").unwrap().is_none());
    }

    #[test]
    fn test_list_jobs() {
        let store = create_test_store();
        for _ in 0..3 {
            store.create(create_test_request()).unwrap();
        }
        assert_eq!(store.list().unwrap().len(), 3);
    }

    #[test]
    fn test_list_by_status_oldest_first() {
        let store = create_test_store();
        let first = store.create(create_test_request()).unwrap();
        let second = store.create(create_test_request()).unwrap();
        let third = store.create(create_test_request()).unwrap();

        store
            .update_status(&second.id, JobStatus::Running, None)
            .unwrap();

        let pending = store.list_by_status(JobStatus::Pending).unwrap();
        let ids: Vec<_> = pending.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), third.id.as_str()]);

        assert_eq!(store.count_by_status(JobStatus::Running).unwrap(), 1);
        assert_eq!(store.count_by_status(JobStatus::Pending).unwrap(), 2);
    }

    #[test]
    fn test_full_successful_lifecycle() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();

        let running = store
            .update_status(&job.id, JobStatus::Running, None)
            .unwrap();
        assert_eq!(running.status, JobStatus::Running);

        let completed = store
            .update_status(&job.id, JobStatus::Completed, None)
            .unwrap();
        assert_eq!(completed.status, JobStatus::Completed);

        let fetched = store.get(&job.id).unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Completed);
    }

    #[test]
    fn test_failure_reason_is_stored() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();
        store
            .update_status(&job.id, JobStatus::Running, None)
            .unwrap();
        store
            .update_status(&job.id, JobStatus::Failed, Some("upscaler exited with 1"))
            .unwrap();

        let fetched = store.get(&job.id).unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Failed);
        assert_eq!(
            fetched.failure_reason.as_deref(),
            Some("upscaler exited with 1")
        );
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();

        // Pending cannot skip straight to a terminal state
        let result = store.update_status(&job.id, JobStatus::Completed, None);
        assert!(matches!(result, Err(JobError::InvalidTransition { .. })));

        store
            .update_status(&job.id, JobStatus::Running, None)
            .unwrap();
        store
            .update_status(&job.id, JobStatus::Failed, Some("boom"))
            .unwrap();

        // Terminal states are final
        for next in JobStatus::ALL {
            let result = store.update_status(&job.id, next, None);
            assert!(matches!(result, Err(JobError::InvalidTransition { .. })));
        }
        assert_eq!(
            store.get(&job.id).unwrap().unwrap().status,
            JobStatus::Failed
        );
    }

    #[test]
    fn test_update_status_nonexistent_job() {
        let store = create_test_store();
        let result = store.update_status("missing", JobStatus::Running, None);
        assert!(matches!(result, Err(JobError::NotFound(_))));
    }

    #[test]
    fn test_delete_job() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();

        assert!(store.delete(&job.id).unwrap());
        assert!(store.get(&job.id).unwrap().is_none());
        assert!(!store.delete(&job.id).unwrap());
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("jobs.db");

        let id = {
            let store = SqliteJobStore::new(&db_path).unwrap();
            store.create(create_test_request()).unwrap().id
        };

        let reopened = SqliteJobStore::new(&db_path).unwrap();
        let job = reopened.get(&id).unwrap().unwrap();
        assert_eq!(job.title, "Chapter 1");
    }
}

use bson::{DateTime, doc, oid::ObjectId};
use fairline_db::models::{
    MessageSender, QueueEntry, QueueEntryStatus, QueueMessage, QueueMessageKind,
};
use mongodb::Database;

use super::base::{BaseDao, DaoResult};

/// Persistence for queue entries and their message threads. Status
/// transitions are compare-and-set on the current status so a lost race
/// shows up as `false` instead of a silent double transition.
pub struct QueueDao {
    pub entries: BaseDao<QueueEntry>,
    pub messages: BaseDao<QueueMessage>,
}

const LIVE_STATUSES: [&str; 2] = ["waiting", "in_meeting"];

impl QueueDao {
    pub fn new(db: &Database) -> Self {
        Self {
            entries: BaseDao::new(db, QueueEntry::COLLECTION),
            messages: BaseDao::new(db, QueueMessage::COLLECTION),
        }
    }

    pub async fn find_entry(&self, entry_id: ObjectId) -> DaoResult<QueueEntry> {
        self.entries.find_by_id(entry_id).await
    }

    /// The at-most-one non-terminal entry for this (booth, job seeker).
    pub async fn live_entry(
        &self,
        booth_id: ObjectId,
        job_seeker_id: ObjectId,
    ) -> DaoResult<Option<QueueEntry>> {
        self.entries
            .find_one(doc! {
                "booth_id": booth_id,
                "job_seeker_id": job_seeker_id,
                "status": { "$in": LIVE_STATUSES.to_vec() },
            })
            .await
    }

    /// Highest assigned position + 1. Only meaningful while holding the
    /// booth's serializer; positions are never reused after removals.
    pub async fn next_position(&self, booth_id: ObjectId) -> DaoResult<i64> {
        let mut cursor = self
            .entries
            .collection()
            .find(doc! { "booth_id": booth_id })
            .sort(doc! { "position": -1 })
            .limit(1)
            .await?;

        use futures::TryStreamExt;
        let last: Option<QueueEntry> = cursor.try_next().await?;
        Ok(last.map(|e| e.position + 1).unwrap_or(1))
    }

    pub async fn insert_entry(&self, entry: &QueueEntry) -> DaoResult<ObjectId> {
        self.entries.insert_one(entry).await
    }

    pub async fn waiting_entries(&self, booth_id: ObjectId) -> DaoResult<Vec<QueueEntry>> {
        self.entries
            .find_many(
                doc! { "booth_id": booth_id, "status": "waiting" },
                Some(doc! { "position": 1 }),
            )
            .await
    }

    pub async fn waiting_count(&self, booth_id: ObjectId) -> DaoResult<u64> {
        self.entries
            .count(doc! { "booth_id": booth_id, "status": "waiting" })
            .await
    }

    pub async fn waiting_ahead(&self, booth_id: ObjectId, position: i64) -> DaoResult<u64> {
        self.entries
            .count(doc! {
                "booth_id": booth_id,
                "status": "waiting",
                "position": { "$lt": position },
            })
            .await
    }

    /// Compare-and-set transition; `false` means the entry was not in
    /// `from` anymore.
    pub async fn transition(
        &self,
        entry_id: ObjectId,
        from: QueueEntryStatus,
        to: QueueEntryStatus,
    ) -> DaoResult<bool> {
        self.entries
            .update_one(
                doc! { "_id": entry_id, "status": from.as_str() },
                doc! { "$set": { "status": to.as_str() } },
            )
            .await
    }

    pub async fn append_message(
        &self,
        queue_entry_id: ObjectId,
        kind: QueueMessageKind,
        content: String,
        sender: MessageSender,
    ) -> DaoResult<ObjectId> {
        let message = QueueMessage {
            id: None,
            queue_entry_id,
            kind,
            content,
            sender,
            is_read: false,
            created_at: DateTime::now(),
        };
        let id = self.messages.insert_one(&message).await?;

        let unread_field = match sender {
            MessageSender::JobSeeker => "unread_from_job_seeker",
            MessageSender::Recruiter => "unread_from_recruiter",
        };
        self.entries
            .update_by_id(
                queue_entry_id,
                doc! { "$inc": { "message_count": 1, unread_field: 1 } },
            )
            .await?;

        Ok(id)
    }

    pub async fn delete_message(&self, message_id: ObjectId) -> DaoResult<bool> {
        self.messages.delete_one(doc! { "_id": message_id }).await
    }

    pub async fn list_messages(&self, queue_entry_id: ObjectId) -> DaoResult<Vec<QueueMessage>> {
        self.messages
            .find_many(
                doc! { "queue_entry_id": queue_entry_id },
                Some(doc! { "created_at": 1 }),
            )
            .await
    }

    /// Flips `is_read` on the counterpart's messages and clears the reader's
    /// unread counter. Called when a side opens the thread.
    pub async fn mark_read(
        &self,
        queue_entry_id: ObjectId,
        reader: MessageSender,
    ) -> DaoResult<()> {
        let counterpart = match reader {
            MessageSender::Recruiter => "job_seeker",
            MessageSender::JobSeeker => "recruiter",
        };
        self.messages
            .collection()
            .update_many(
                doc! { "queue_entry_id": queue_entry_id, "sender": counterpart, "is_read": false },
                doc! { "$set": { "is_read": true } },
            )
            .await?;

        let unread_field = match reader {
            MessageSender::Recruiter => "unread_from_job_seeker",
            MessageSender::JobSeeker => "unread_from_recruiter",
        };
        self.entries
            .update_by_id(queue_entry_id, doc! { "$set": { unread_field: 0 } })
            .await?;
        Ok(())
    }
}

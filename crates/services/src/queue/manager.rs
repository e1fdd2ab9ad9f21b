use std::sync::Arc;

use bson::{DateTime, oid::ObjectId};
use fairline_db::models::{MessageSender, QueueEntry, QueueEntryStatus, QueueMessage, QueueMessageKind};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::channel::{ChannelEvent, ChannelPublisher, booth_room};
use crate::dao::base::DaoError;
use crate::dao::{BoothDao, QueueDao};

use super::serializer::KeyedSerializer;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("already queued at this booth")]
    AlreadyQueued,
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Dao(DaoError),
}

impl From<DaoError> for QueueError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => QueueError::NotFound,
            DaoError::DuplicateKey(_) => QueueError::AlreadyQueued,
            other => QueueError::Dao(other),
        }
    }
}

pub type QueueResult<T> = Result<T, QueueError>;

/// What a waiting attendee's client needs to render the waiting view.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub queue_entry_id: String,
    pub position: i64,
    pub people_ahead: u64,
    pub serving_number: i64,
    pub status: QueueEntryStatus,
    pub unread_from_recruiter: i64,
}

/// One row of the recruiter's booth queue.
#[derive(Debug, Clone, Serialize)]
pub struct BoothQueueItem {
    pub queue_entry_id: String,
    pub job_seeker_id: String,
    pub position: i64,
    pub interpreter_category: Option<String>,
    pub joined_at: i64,
    pub message_count: i64,
    pub unread_from_job_seeker: i64,
}

/// Owns per-booth FIFO queue state. All position assignment goes through the
/// per-booth serializer; nothing else mutates entry status or position.
pub struct QueueManager {
    dao: Arc<QueueDao>,
    booths: Arc<BoothDao>,
    serializer: KeyedSerializer,
    channel: Arc<dyn ChannelPublisher>,
}

impl QueueManager {
    pub fn new(
        dao: Arc<QueueDao>,
        booths: Arc<BoothDao>,
        channel: Arc<dyn ChannelPublisher>,
    ) -> Self {
        Self {
            dao,
            booths,
            serializer: KeyedSerializer::new(),
            channel,
        }
    }

    pub fn dao(&self) -> &QueueDao {
        &self.dao
    }

    /// Joins the booth's queue at the next position.
    pub async fn join(
        &self,
        booth_id: ObjectId,
        job_seeker_id: ObjectId,
        interpreter_category: Option<String>,
    ) -> QueueResult<QueueEntry> {
        // Booth must exist before we take the serializer.
        self.booths.find(booth_id).await?;

        let _guard = self.serializer.acquire(booth_id).await;

        if self.dao.live_entry(booth_id, job_seeker_id).await?.is_some() {
            return Err(QueueError::AlreadyQueued);
        }

        let position = self.dao.next_position(booth_id).await?;
        let entry = QueueEntry {
            id: None,
            booth_id,
            job_seeker_id,
            position,
            interpreter_category,
            status: QueueEntryStatus::Waiting,
            joined_at: DateTime::now(),
            message_count: 0,
            unread_from_job_seeker: 0,
            unread_from_recruiter: 0,
        };
        // The partial unique index backs up the live_entry check; a raced
        // duplicate insert surfaces as AlreadyQueued.
        let id = self.dao.insert_entry(&entry).await?;
        drop(_guard);

        let entry = self.dao.find_entry(id).await?;
        info!(%booth_id, %job_seeker_id, position, "Job seeker joined queue");

        self.channel
            .publish(
                &booth_room(booth_id),
                &ChannelEvent::QueueUpdated {
                    booth_id: booth_id.to_hex(),
                },
            )
            .await;
        self.channel
            .publish_to_user(
                job_seeker_id,
                &ChannelEvent::QueuePositionUpdated {
                    booth_id: booth_id.to_hex(),
                    queue_entry_id: id.to_hex(),
                    position,
                },
            )
            .await;

        Ok(entry)
    }

    /// Leaves the queue. Idempotent: no live waiting entry is a no-op.
    pub async fn leave(&self, booth_id: ObjectId, job_seeker_id: ObjectId) -> QueueResult<()> {
        let Some(entry) = self.dao.live_entry(booth_id, job_seeker_id).await? else {
            return Ok(());
        };
        if entry.status != QueueEntryStatus::Waiting {
            // In a meeting; their slot is already consumed.
            return Ok(());
        }
        let entry_id = entry.id.expect("loaded entry has id");

        if self
            .dao
            .transition(entry_id, QueueEntryStatus::Waiting, QueueEntryStatus::Removed)
            .await?
        {
            self.channel
                .publish(
                    &booth_room(booth_id),
                    &ChannelEvent::QueueUpdated {
                        booth_id: booth_id.to_hex(),
                    },
                )
                .await;
        }
        Ok(())
    }

    /// Leaves a message behind and exits the queue. The message is appended
    /// first; if the status flip then loses a race the message is removed
    /// again, so the pair moves together.
    pub async fn leave_with_message(
        &self,
        booth_id: ObjectId,
        job_seeker_id: ObjectId,
        kind: QueueMessageKind,
        content: String,
    ) -> QueueResult<QueueEntry> {
        let _guard = self.serializer.acquire(booth_id).await;

        let entry = self
            .dao
            .live_entry(booth_id, job_seeker_id)
            .await?
            .ok_or(QueueError::NotFound)?;
        if entry.status != QueueEntryStatus::Waiting {
            return Err(QueueError::InvalidState("entry is not waiting"));
        }
        let entry_id = entry.id.expect("loaded entry has id");

        let message_id = self
            .dao
            .append_message(entry_id, kind, content, MessageSender::JobSeeker)
            .await?;

        let flipped = self
            .dao
            .transition(
                entry_id,
                QueueEntryStatus::Waiting,
                QueueEntryStatus::LeftWithMessage,
            )
            .await?;
        if !flipped {
            // Raced with an invite or removal; take the message back so the
            // entry is not left half-transitioned.
            if let Err(e) = self.dao.delete_message(message_id).await {
                warn!(%entry_id, %e, "Failed to roll back leave message");
            }
            return Err(QueueError::InvalidState("entry is not waiting"));
        }
        drop(_guard);

        self.channel
            .publish(
                &booth_room(booth_id),
                &ChannelEvent::QueueLeftWithMessage {
                    booth_id: booth_id.to_hex(),
                    queue_entry_id: entry_id.to_hex(),
                    job_seeker_id: job_seeker_id.to_hex(),
                },
            )
            .await;
        self.channel
            .publish(
                &booth_room(booth_id),
                &ChannelEvent::QueueUpdated {
                    booth_id: booth_id.to_hex(),
                },
            )
            .await;

        Ok(self.dao.find_entry(entry_id).await?)
    }

    /// Recruiter-side serving number update; broadcast so each waiting
    /// client can compute "you are next" locally.
    pub async fn update_serving_number(&self, booth_id: ObjectId, n: i64) -> QueueResult<()> {
        if !self.booths.set_serving_number(booth_id, n).await? {
            // Same number again still gets broadcast; only a missing booth
            // is an error.
            self.booths.find(booth_id).await?;
        }
        self.channel
            .publish(
                &booth_room(booth_id),
                &ChannelEvent::QueueServingUpdated {
                    booth_id: booth_id.to_hex(),
                    serving_number: n,
                },
            )
            .await;
        Ok(())
    }

    /// `waiting -> in_meeting`, invoked only by the call orchestrator.
    pub async fn invite(&self, entry_id: ObjectId) -> QueueResult<QueueEntry> {
        let entry = self.dao.find_entry(entry_id).await?;
        if !self
            .dao
            .transition(entry_id, QueueEntryStatus::Waiting, QueueEntryStatus::InMeeting)
            .await?
        {
            return Err(QueueError::InvalidState("entry is not waiting"));
        }
        debug!(%entry_id, "Queue entry moved to in_meeting");

        self.channel
            .publish(
                &booth_room(entry.booth_id),
                &ChannelEvent::QueueUpdated {
                    booth_id: entry.booth_id.to_hex(),
                },
            )
            .await;

        Ok(self.dao.find_entry(entry_id).await?)
    }

    /// Recruiter-initiated forced removal.
    pub async fn remove(&self, entry_id: ObjectId, reason: &str) -> QueueResult<()> {
        let entry = self.dao.find_entry(entry_id).await?;
        if !self
            .dao
            .transition(entry_id, QueueEntryStatus::Waiting, QueueEntryStatus::Removed)
            .await?
        {
            return Err(QueueError::InvalidState("entry is not waiting"));
        }

        // The attendee's client redirects away from the waiting view.
        self.channel
            .publish_to_user(
                entry.job_seeker_id,
                &ChannelEvent::QueueRemoved {
                    booth_id: entry.booth_id.to_hex(),
                    queue_entry_id: entry_id.to_hex(),
                    reason: reason.to_string(),
                },
            )
            .await;
        self.channel
            .publish(
                &booth_room(entry.booth_id),
                &ChannelEvent::QueueUpdated {
                    booth_id: entry.booth_id.to_hex(),
                },
            )
            .await;
        Ok(())
    }

    /// Appends to the entry's thread and pushes a badge notification. The
    /// notification deliberately carries no content so clients can badge
    /// without fetching the thread.
    pub async fn send_message(
        &self,
        entry_id: ObjectId,
        kind: QueueMessageKind,
        content: String,
        sender: MessageSender,
    ) -> QueueResult<QueueMessage> {
        let entry = self.dao.find_entry(entry_id).await?;
        if entry.status.is_terminal() {
            return Err(QueueError::InvalidState("entry is terminal"));
        }

        let message_id = self
            .dao
            .append_message(entry_id, kind, content, sender)
            .await?;

        let event = ChannelEvent::QueueNewMessage {
            queue_entry_id: entry_id.to_hex(),
            booth_id: entry.booth_id.to_hex(),
            sender: match sender {
                MessageSender::JobSeeker => "job_seeker".to_string(),
                MessageSender::Recruiter => "recruiter".to_string(),
            },
        };
        match sender {
            MessageSender::JobSeeker => {
                self.channel
                    .publish(&booth_room(entry.booth_id), &event)
                    .await;
            }
            MessageSender::Recruiter => {
                self.channel.publish_to_user(entry.job_seeker_id, &event).await;
            }
        }

        Ok(self.dao.messages.find_by_id(message_id).await?)
    }

    /// Opens the thread for `reader`, flipping counterpart messages to read.
    pub async fn open_thread(
        &self,
        entry_id: ObjectId,
        reader: MessageSender,
    ) -> QueueResult<Vec<QueueMessage>> {
        self.dao.find_entry(entry_id).await?;
        self.dao.mark_read(entry_id, reader).await?;
        Ok(self.dao.list_messages(entry_id).await?)
    }

    pub async fn queue_status(
        &self,
        booth_id: ObjectId,
        job_seeker_id: ObjectId,
    ) -> QueueResult<QueueStatus> {
        let booth = self.booths.find(booth_id).await?;
        let entry = self
            .dao
            .live_entry(booth_id, job_seeker_id)
            .await?
            .ok_or(QueueError::NotFound)?;

        let people_ahead = self.dao.waiting_ahead(booth_id, entry.position).await?;
        Ok(QueueStatus {
            queue_entry_id: entry.id.expect("loaded entry has id").to_hex(),
            position: entry.position,
            people_ahead,
            serving_number: booth.serving_number,
            status: entry.status,
            unread_from_recruiter: entry.unread_from_recruiter,
        })
    }

    /// Recruiter's view: everyone still waiting, in position order.
    pub async fn booth_queue(&self, booth_id: ObjectId) -> QueueResult<Vec<BoothQueueItem>> {
        let entries = self.dao.waiting_entries(booth_id).await?;
        Ok(entries
            .into_iter()
            .map(|e| BoothQueueItem {
                queue_entry_id: e.id.expect("loaded entry has id").to_hex(),
                job_seeker_id: e.job_seeker_id.to_hex(),
                position: e.position,
                interpreter_category: e.interpreter_category,
                joined_at: e.joined_at.timestamp_millis(),
                message_count: e.message_count,
                unread_from_job_seeker: e.unread_from_job_seeker,
            })
            .collect())
    }
}

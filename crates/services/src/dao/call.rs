use bson::{DateTime, doc, oid::ObjectId};
use fairline_db::models::{Call, CallInterpreter, InterpreterStatus};
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct CallDao {
    pub base: BaseDao<Call>,
}

impl CallDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Call::COLLECTION),
        }
    }

    pub async fn find(&self, call_id: ObjectId) -> DaoResult<Call> {
        self.base.find_by_id(call_id).await
    }

    pub async fn find_by_room(&self, room_name: &str) -> DaoResult<Option<Call>> {
        self.base.find_one(doc! { "room_name": room_name }).await
    }

    /// A recruiter owns at most one non-ended call at a time.
    pub async fn live_for_recruiter(&self, recruiter_id: ObjectId) -> DaoResult<Option<Call>> {
        self.base
            .find_one(doc! {
                "recruiter_id": recruiter_id,
                "state": { "$ne": "ended" },
            })
            .await
    }

    /// Whether the interpreter is invited or joined on any non-ended call.
    pub async fn interpreter_engaged(&self, interpreter_id: ObjectId) -> DaoResult<bool> {
        let count = self
            .base
            .count(doc! {
                "state": { "$ne": "ended" },
                "interpreters": {
                    "$elemMatch": {
                        "interpreter_id": interpreter_id,
                        "status": { "$in": ["invited", "joined"] },
                    }
                }
            })
            .await?;
        Ok(count > 0)
    }

    pub async fn create(&self, call: &Call) -> DaoResult<Call> {
        let id = self.base.insert_one(call).await?;
        self.base.find_by_id(id).await
    }

    pub async fn activate(&self, call_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "_id": call_id, "state": "created" },
                doc! { "$set": { "state": "active" } },
            )
            .await
    }

    /// Irreversible; `false` means the call was already ended.
    pub async fn end(&self, call_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "_id": call_id, "state": { "$ne": "ended" } },
                doc! { "$set": { "state": "ended", "ended_at": DateTime::now() } },
            )
            .await
    }

    /// Appends an `invited` interpreter slot. Fails (returns `false`) if the
    /// call ended or the interpreter already has a live slot on this call;
    /// declined slots do not block a fresh invitation.
    pub async fn push_interpreter(
        &self,
        call_id: ObjectId,
        interpreter_id: ObjectId,
        category: &str,
    ) -> DaoResult<bool> {
        let slot = CallInterpreter {
            interpreter_id,
            category: category.to_string(),
            status: InterpreterStatus::Invited,
        };
        let slot_doc = bson::to_document(&slot)?;
        self.base
            .update_one(
                doc! {
                    "_id": call_id,
                    "state": { "$ne": "ended" },
                    "interpreters": {
                        "$not": {
                            "$elemMatch": {
                                "interpreter_id": interpreter_id,
                                "status": { "$in": ["invited", "joined"] },
                            }
                        }
                    }
                },
                doc! { "$push": { "interpreters": slot_doc } },
            )
            .await
    }

    /// Resolves a pending invitation via array filters, so only an `invited`
    /// slot can move to `joined`/`declined`.
    pub async fn resolve_interpreter(
        &self,
        call_id: ObjectId,
        interpreter_id: ObjectId,
        status: InterpreterStatus,
    ) -> DaoResult<bool> {
        let status_str = match status {
            InterpreterStatus::Joined => "joined",
            InterpreterStatus::Declined => "declined",
            InterpreterStatus::Invited => return Ok(false),
        };

        let opts = mongodb::options::UpdateOptions::builder()
            .array_filters(vec![doc! {
                "slot.interpreter_id": interpreter_id,
                "slot.status": "invited",
            }])
            .build();

        let result = self
            .base
            .collection()
            .update_one(
                doc! { "_id": call_id, "state": { "$ne": "ended" } },
                doc! { "$set": { "interpreters.$[slot].status": status_str } },
            )
            .with_options(opts)
            .await
            .map_err(DaoError::Mongo)?;

        Ok(result.modified_count > 0)
    }
}

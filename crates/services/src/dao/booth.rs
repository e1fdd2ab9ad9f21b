use bson::{doc, oid::ObjectId};
use fairline_db::models::Booth;
use mongodb::Database;

use super::base::{BaseDao, DaoResult};

pub struct BoothDao {
    pub base: BaseDao<Booth>,
}

impl BoothDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Booth::COLLECTION),
        }
    }

    pub async fn find(&self, booth_id: ObjectId) -> DaoResult<Booth> {
        self.base.find_by_id(booth_id).await
    }

    pub async fn is_recruiter(&self, booth_id: ObjectId, user_id: ObjectId) -> DaoResult<bool> {
        let count = self
            .base
            .count(doc! { "_id": booth_id, "recruiter_ids": user_id })
            .await?;
        Ok(count > 0)
    }

    /// No queue-state side effects; broadcasting is the manager's job.
    pub async fn set_serving_number(&self, booth_id: ObjectId, n: i64) -> DaoResult<bool> {
        self.base
            .update_by_id(
                booth_id,
                doc! { "$set": { "serving_number": n, "updated_at": bson::DateTime::now() } },
            )
            .await
    }
}

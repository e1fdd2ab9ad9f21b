use bson::{doc, oid::ObjectId};
use fairline_db::models::User;
use mongodb::Database;

use super::base::{BaseDao, DaoResult};

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn find(&self, user_id: ObjectId) -> DaoResult<User> {
        self.base.find_by_id(user_id).await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<Option<User>> {
        self.base.find_one(doc! { "email": email }).await
    }

    /// Display name with a short hex fallback for users we cannot load.
    pub async fn display_name(&self, user_id: ObjectId) -> String {
        match self.base.find_by_id(user_id).await {
            Ok(user) => user.display_name,
            Err(_) => user_id.to_hex()[..8].to_string(),
        }
    }
}

use bson::{DateTime, oid::ObjectId};
use fairline_api::auth::AuthService;
use fairline_db::models::{Booth, User, UserRole};

use super::test_app::TestApp;

pub struct SeededUser {
    pub id: ObjectId,
    pub email: String,
    pub access_token: String,
}

impl SeededUser {
    pub fn hex(&self) -> String {
        self.id.to_hex()
    }
}

/// A booth with one recruiter, ready for queueing tests.
pub struct SeededBooth {
    pub booth_id: ObjectId,
    pub event_id: ObjectId,
    pub recruiter: SeededUser,
}

impl TestApp {
    /// Inserts a user directly (account management is external to this
    /// service) and mints a matching access token.
    pub async fn seed_user(&self, email: &str, display_name: &str, role: UserRole) -> SeededUser {
        let now = DateTime::now();
        let user = User {
            id: Some(ObjectId::new()),
            display_name: display_name.to_string(),
            email: email.to_string(),
            role,
            created_at: now,
            updated_at: now,
        };
        self.db
            .collection::<User>(User::COLLECTION)
            .insert_one(&user)
            .await
            .expect("Failed to seed user");

        let auth = AuthService::new(self.settings.jwt.clone());
        let access_token = auth
            .issue_access_token(&user)
            .expect("Failed to issue test token");

        SeededUser {
            id: user.id.unwrap(),
            email: email.to_string(),
            access_token,
        }
    }

    pub async fn seed_booth_with_recruiter(&self, name: &str) -> SeededBooth {
        let recruiter = self
            .seed_user(
                &format!("{name}-recruiter@fair.test"),
                &format!("{name} Recruiter"),
                UserRole::Recruiter,
            )
            .await;

        let now = DateTime::now();
        let event_id = ObjectId::new();
        let booth = Booth {
            id: Some(ObjectId::new()),
            event_id,
            name: name.to_string(),
            recruiter_ids: vec![recruiter.id],
            serving_number: 0,
            logo_url: None,
            created_at: now,
            updated_at: now,
        };
        self.db
            .collection::<Booth>(Booth::COLLECTION)
            .insert_one(&booth)
            .await
            .expect("Failed to seed booth");

        SeededBooth {
            booth_id: booth.id.unwrap(),
            event_id,
            recruiter,
        }
    }

    pub async fn seed_job_seeker(&self, tag: &str) -> SeededUser {
        self.seed_user(
            &format!("{tag}@fair.test"),
            &format!("Seeker {tag}"),
            UserRole::JobSeeker,
        )
        .await
    }

    pub async fn seed_interpreter(&self, tag: &str) -> SeededUser {
        self.seed_user(
            &format!("{tag}@interpret.test"),
            &format!("Interpreter {tag}"),
            UserRole::Interpreter,
        )
        .await
    }
}

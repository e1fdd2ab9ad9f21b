use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        "users",
        vec![index_unique(bson::doc! { "email": 1 })],
    )
    .await?;

    // Booths
    create_indexes(
        db,
        "booths",
        vec![
            index(bson::doc! { "event_id": 1, "name": 1 }),
            index(bson::doc! { "recruiter_ids": 1 }),
        ],
    )
    .await?;

    // Queue entries. The partial unique index is what enforces "at most one
    // live entry per (booth, job seeker)"; terminal entries fall out of it.
    create_indexes(
        db,
        "queue_entries",
        vec![
            index_unique(bson::doc! { "booth_id": 1, "position": 1 }),
            index_unique_partial(
                bson::doc! { "booth_id": 1, "job_seeker_id": 1 },
                bson::doc! { "status": { "$in": ["waiting", "in_meeting"] } },
            ),
            index(bson::doc! { "booth_id": 1, "status": 1, "position": 1 }),
            index(bson::doc! { "job_seeker_id": 1, "status": 1 }),
        ],
    )
    .await?;

    // Queue messages
    create_indexes(
        db,
        "queue_messages",
        vec![index(bson::doc! { "queue_entry_id": 1, "created_at": 1 })],
    )
    .await?;

    // Calls. Provider webhooks look calls up by room name on every event;
    // a room never hosts more than one call.
    create_indexes(
        db,
        "calls",
        vec![
            index_unique(bson::doc! { "room_name": 1 }),
            index(bson::doc! { "recruiter_id": 1, "state": 1 }),
            index(bson::doc! { "queue_entry_id": 1, "state": 1 }),
            index(bson::doc! { "interpreters.interpreter_id": 1, "state": 1 }),
            index(bson::doc! { "booth_id": 1, "created_at": -1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn index_unique_partial(keys: bson::Document, filter: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(filter)
                .build(),
        )
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}

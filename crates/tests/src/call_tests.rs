use std::sync::Arc;

use bson::oid::ObjectId;
use fairline_api::ws::{dispatcher::WsChannel, storage::WsStorage};
use fairline_captions::CaptionEngine;
use fairline_db::models::{Call, CallState};
use fairline_services::dao::{BoothDao, CallDao, QueueDao, UserDao};
use fairline_services::media::MediaTransport;
use fairline_services::{CallOrchestrator, ChannelPublisher, QueueManager};
use serde_json::Value;

use crate::fixtures::fakes::{EchoTranscriber, FakeTransport};
use crate::fixtures::seed::{SeededBooth, SeededUser};
use crate::fixtures::test_app::TestApp;

async fn join(app: &TestApp, booth: &SeededBooth, seeker: &SeededUser) -> String {
    let resp = app
        .auth_post(
            &format!("/api/booth/{}/queue/join", booth.booth_id.to_hex()),
            &seeker.access_token,
        )
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    json["queue_entry_id"].as_str().unwrap().to_string()
}

async fn create_call(app: &TestApp, entry_id: &str, recruiter: &SeededUser) -> Value {
    let resp = app
        .auth_post(&format!("/api/queue/{entry_id}/call"), &recruiter.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn call_lifecycle_create_accept_end() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("calls").await;
    let seeker = app.seed_job_seeker("callee").await;
    let entry_id = join(&app, &booth, &seeker).await;

    let json = create_call(&app, &entry_id, &booth.recruiter).await;
    let call_id = json["call"]["id"].as_str().unwrap().to_string();
    let room_name = json["call"]["room_name"].as_str().unwrap().to_string();
    assert_eq!(json["call"]["state"], "active");
    // Recruiter credential carries their own user id as transport identity.
    assert_eq!(
        json["credential"]["identity"],
        booth.recruiter.id.to_hex()
    );
    assert_eq!(app.transport.created(), vec![room_name.clone()]);

    // The queue slot is consumed; the booth's waiting list is empty.
    let resp = app
        .auth_get(
            &format!("/api/booth/{}/queue", booth.booth_id.to_hex()),
            &booth.recruiter.access_token,
        )
        .send()
        .await
        .unwrap();
    let items: Value = resp.json().await.unwrap();
    assert!(items.as_array().unwrap().is_empty());

    // Attendee accepts and gets their own credential.
    let resp = app
        .auth_post(&format!("/api/call/{call_id}/respond"), &seeker.access_token)
        .json(&serde_json::json!({ "accept": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["credential"]["identity"], seeker.id.to_hex());

    // Recruiter ends the call; the media room is returned to the provider.
    let resp = app
        .auth_post(&format!("/api/call/{call_id}/end"), &booth.recruiter.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(app.transport.removed(), vec![room_name]);

    // Ending twice is an invalid state, not a silent success.
    let resp = app
        .auth_post(&format!("/api/call/{call_id}/end"), &booth.recruiter.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "invalid_state");

    // The attendee's slot stays consumed after the call.
    let resp = app
        .auth_get(
            &format!("/api/booth/{}/queue", booth.booth_id.to_hex()),
            &booth.recruiter.access_token,
        )
        .send()
        .await
        .unwrap();
    let items: Value = resp.json().await.unwrap();
    assert!(items.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn only_booth_recruiters_can_call() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("mine").await;
    let other_booth = app.seed_booth_with_recruiter("theirs").await;
    let seeker = app.seed_job_seeker("target").await;
    let entry_id = join(&app, &booth, &seeker).await;

    let resp = app
        .auth_post(
            &format!("/api/queue/{entry_id}/call"),
            &other_booth.recruiter.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    // No room was provisioned for the refused call.
    assert!(app.transport.created().is_empty());
}

#[tokio::test]
async fn recruiter_with_a_live_call_is_busy() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("busy").await;
    let first = app.seed_job_seeker("first").await;
    let second = app.seed_job_seeker("second").await;
    let entry1 = join(&app, &booth, &first).await;
    let entry2 = join(&app, &booth, &second).await;

    create_call(&app, &entry1, &booth.recruiter).await;

    let resp = app
        .auth_post(&format!("/api/queue/{entry2}/call"), &booth.recruiter.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "recruiter_busy");
}

#[tokio::test]
async fn calling_a_consumed_entry_is_invalid() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("once").await;
    let seeker = app.seed_job_seeker("onetime").await;
    let entry_id = join(&app, &booth, &seeker).await;

    create_call(&app, &entry_id, &booth.recruiter).await;

    let resp = app
        .auth_post(&format!("/api/queue/{entry_id}/call"), &booth.recruiter.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "invalid_state");
}

#[tokio::test]
async fn decline_tears_the_call_down_and_frees_the_recruiter() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("declined").await;
    let first = app.seed_job_seeker("refuser").await;
    let second = app.seed_job_seeker("next-up").await;
    let entry1 = join(&app, &booth, &first).await;
    let entry2 = join(&app, &booth, &second).await;

    let json = create_call(&app, &entry1, &booth.recruiter).await;
    let call_id = json["call"]["id"].as_str().unwrap().to_string();
    let room_name = json["call"]["room_name"].as_str().unwrap().to_string();

    let resp = app
        .auth_post(&format!("/api/call/{call_id}/respond"), &first.access_token)
        .json(&serde_json::json!({ "accept": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert!(json["credential"].is_null());
    assert_eq!(app.transport.removed(), vec![room_name]);

    // The decliner's slot stays consumed; they are not re-queued.
    let resp = app
        .auth_get(
            &format!("/api/booth/{}/queue/status", booth.booth_id.to_hex()),
            &first.access_token,
        )
        .send()
        .await
        .unwrap();
    let status: Value = resp.json().await.unwrap();
    assert_eq!(status["status"], "in_meeting");

    // The recruiter can move on to the next attendee.
    create_call(&app, &entry2, &booth.recruiter).await;
}

#[tokio::test]
async fn only_the_invited_attendee_can_respond() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("secure").await;
    let seeker = app.seed_job_seeker("invited").await;
    let impostor = app.seed_job_seeker("impostor").await;
    let entry_id = join(&app, &booth, &seeker).await;

    let json = create_call(&app, &entry_id, &booth.recruiter).await;
    let call_id = json["call"]["id"].as_str().unwrap();

    let resp = app
        .auth_post(&format!("/api/call/{call_id}/respond"), &impostor.access_token)
        .json(&serde_json::json!({ "accept": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn interpreter_invite_accept_and_reinvite_after_decline() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("interp").await;
    let seeker = app.seed_job_seeker("deaf-attendee").await;
    let interpreter = app.seed_interpreter("sign1").await;
    let entry_id = join(&app, &booth, &seeker).await;

    let json = create_call(&app, &entry_id, &booth.recruiter).await;
    let call_id = json["call"]["id"].as_str().unwrap().to_string();
    let iid = interpreter.id.to_hex();

    let invite = serde_json::json!({ "interpreter_id": iid, "category": "ASL" });
    let resp = app
        .auth_post(&format!("/api/call/{call_id}/interpreter"), &booth.recruiter.access_token)
        .json(&invite)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // A pending invitation blocks a duplicate.
    let resp = app
        .auth_post(&format!("/api/call/{call_id}/interpreter"), &booth.recruiter.access_token)
        .json(&invite)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    // Decline resolves the slot; the same interpreter can be asked again.
    let resp = app
        .auth_post(
            &format!("/api/call/{call_id}/interpreter/respond"),
            &interpreter.access_token,
        )
        .json(&serde_json::json!({ "accept": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert!(json["credential"].is_null());

    let resp = app
        .auth_post(&format!("/api/call/{call_id}/interpreter"), &booth.recruiter.access_token)
        .json(&invite)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // This time they accept and get a room credential.
    let resp = app
        .auth_post(
            &format!("/api/call/{call_id}/interpreter/respond"),
            &interpreter.access_token,
        )
        .json(&serde_json::json!({ "accept": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["credential"]["identity"], iid);

    // And they now appear on the roster.
    let resp = app
        .auth_get(&format!("/api/call/{call_id}/roster"), &booth.recruiter.access_token)
        .send()
        .await
        .unwrap();
    let roster: Value = resp.json().await.unwrap();
    let identities: Vec<&str> = roster
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["identity"].as_str().unwrap())
        .collect();
    assert!(identities.contains(&iid.as_str()));
}

#[tokio::test]
async fn engaged_interpreter_cannot_be_double_booked() {
    let app = TestApp::spawn().await;
    let booth1 = app.seed_booth_with_recruiter("north").await;
    let booth2 = app.seed_booth_with_recruiter("south").await;
    let seeker1 = app.seed_job_seeker("n-attendee").await;
    let seeker2 = app.seed_job_seeker("s-attendee").await;
    let interpreter = app.seed_interpreter("shared").await;

    let entry1 = join(&app, &booth1, &seeker1).await;
    let entry2 = join(&app, &booth2, &seeker2).await;
    let call1: Value = create_call(&app, &entry1, &booth1.recruiter).await;
    let call2: Value = create_call(&app, &entry2, &booth2.recruiter).await;
    let call1_id = call1["call"]["id"].as_str().unwrap();
    let call2_id = call2["call"]["id"].as_str().unwrap();

    let invite = serde_json::json!({
        "interpreter_id": interpreter.id.to_hex(),
        "category": "ASL",
    });
    let resp = app
        .auth_post(&format!("/api/call/{call1_id}/interpreter"), &booth1.recruiter.access_token)
        .json(&invite)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_post(&format!("/api/call/{call2_id}/interpreter"), &booth2.recruiter.access_token)
        .json(&invite)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "conflict");
}

#[tokio::test]
async fn only_interpreters_can_fill_interpreter_slots() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("roles").await;
    let seeker = app.seed_job_seeker("normal").await;
    let bystander = app.seed_job_seeker("bystander").await;
    let entry_id = join(&app, &booth, &seeker).await;

    let json = create_call(&app, &entry_id, &booth.recruiter).await;
    let call_id = json["call"]["id"].as_str().unwrap();

    let resp = app
        .auth_post(&format!("/api/call/{call_id}/interpreter"), &booth.recruiter.access_token)
        .json(&serde_json::json!({
            "interpreter_id": bystander.id.to_hex(),
            "category": "ASL",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn leaving_drops_transport_publications_but_keeps_the_call() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("partial").await;
    let seeker = app.seed_job_seeker("early-exit").await;
    let entry_id = join(&app, &booth, &seeker).await;

    let json = create_call(&app, &entry_id, &booth.recruiter).await;
    let call_id = json["call"]["id"].as_str().unwrap().to_string();
    let room_name = json["call"]["room_name"].as_str().unwrap().to_string();

    let resp = app
        .auth_post(&format!("/api/call/{call_id}/leave"), &seeker.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let removed = app.transport.removed_participants.lock().unwrap().clone();
    assert_eq!(removed, vec![(room_name, seeker.id.to_hex())]);
    // The room itself is still up.
    assert!(app.transport.removed().is_empty());

    let resp = app
        .auth_get(&format!("/api/call/{call_id}"), &booth.recruiter.access_token)
        .send()
        .await
        .unwrap();
    let call: Value = resp.json().await.unwrap();
    assert_eq!(call["state"], "active");
}

#[tokio::test]
async fn concurrent_calls_by_one_recruiter_yield_one_live_call() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("rush").await;
    let first = app.seed_job_seeker("rush-a").await;
    let second = app.seed_job_seeker("rush-b").await;
    let entry1 = join(&app, &booth, &first).await;
    let entry2 = join(&app, &booth, &second).await;

    let token = booth.recruiter.access_token.clone();
    let (a, b) = tokio::join!(
        app.auth_post(&format!("/api/queue/{entry1}/call"), &token).send(),
        app.auth_post(&format!("/api/queue/{entry2}/call"), &token).send(),
    );
    let mut statuses = vec![a.unwrap().status().as_u16(), b.unwrap().status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![200, 409]);
    // Only the winner provisioned a room.
    assert_eq!(app.transport.created().len(), 1);
}

/// A second orchestrator over the same database with empty in-memory state,
/// the way a restarted process comes up.
fn restarted_orchestrator(app: &TestApp) -> CallOrchestrator {
    let booths = Arc::new(BoothDao::new(&app.db));
    let channel: Arc<dyn ChannelPublisher> =
        Arc::new(WsChannel::new(Arc::new(WsStorage::new())));
    let queue = Arc::new(QueueManager::new(
        Arc::new(QueueDao::new(&app.db)),
        booths.clone(),
        channel.clone(),
    ));
    let transport: Arc<dyn MediaTransport> = Arc::new(FakeTransport::new());
    CallOrchestrator::new(
        Arc::new(CallDao::new(&app.db)),
        Arc::new(UserDao::new(&app.db)),
        booths,
        queue,
        transport,
        channel,
        CaptionEngine::new(Arc::new(EchoTranscriber)),
    )
}

#[tokio::test]
async fn restart_keeps_live_calls_serviceable() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("restart").await;
    let seeker = app.seed_job_seeker("survivor").await;
    let interpreter = app.seed_interpreter("signer").await;
    let entry_id = join(&app, &booth, &seeker).await;

    let json = create_call(&app, &entry_id, &booth.recruiter).await;
    let call_id = ObjectId::parse_str(json["call"]["id"].as_str().unwrap()).unwrap();

    let resp = app
        .auth_post(
            &format!("/api/call/{}/interpreter", call_id.to_hex()),
            &booth.recruiter.access_token,
        )
        .json(&serde_json::json!({
            "interpreter_id": interpreter.id.to_hex(),
            "category": "ASL",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // A fresh process holds no roster in memory; the call record alone must
    // be enough to accept the invitation and to leave.
    let fresh = restarted_orchestrator(&app);
    let cred = fresh
        .interpreter_respond(call_id, interpreter.id, true)
        .await
        .unwrap()
        .expect("accept should mint a credential");
    assert_eq!(cred.identity, interpreter.id.to_hex());

    fresh.leave(call_id, seeker.id).await.unwrap();
}

#[tokio::test]
async fn room_names_are_unique_per_call() {
    let app = TestApp::spawn().await;
    let calls = app.db.collection::<Call>(Call::COLLECTION);
    let call = Call {
        id: None,
        room_name: "fair-111-222-333".to_string(),
        booth_id: ObjectId::new(),
        event_id: ObjectId::new(),
        queue_entry_id: ObjectId::new(),
        recruiter_id: ObjectId::new(),
        job_seeker_id: ObjectId::new(),
        interpreters: Vec::new(),
        state: CallState::Active,
        created_at: bson::DateTime::now(),
        ended_at: None,
    };
    calls.insert_one(&call).await.unwrap();
    assert!(calls.insert_one(&call).await.is_err());
}

#[tokio::test]
async fn only_the_recruiter_ends_the_call() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("authority").await;
    let seeker = app.seed_job_seeker("attendee").await;
    let entry_id = join(&app, &booth, &seeker).await;

    let json = create_call(&app, &entry_id, &booth.recruiter).await;
    let call_id = json["call"]["id"].as_str().unwrap();

    let resp = app
        .auth_post(&format!("/api/call/{call_id}/end"), &seeker.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

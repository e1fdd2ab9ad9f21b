use crate::fixtures::test_app::TestApp;
use serde_json::Value;

struct CallCtx {
    call_id: String,
    room_name: String,
}

async fn live_call(app: &TestApp) -> (CallCtx, crate::fixtures::seed::SeededBooth, crate::fixtures::seed::SeededUser) {
    let booth = app.seed_booth_with_recruiter("presence").await;
    let seeker = app.seed_job_seeker("present").await;

    let resp = app
        .auth_post(
            &format!("/api/booth/{}/queue/join", booth.booth_id.to_hex()),
            &seeker.access_token,
        )
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    let entry: Value = resp.json().await.unwrap();
    let entry_id = entry["queue_entry_id"].as_str().unwrap();

    let resp = app
        .auth_post(&format!("/api/queue/{entry_id}/call"), &booth.recruiter.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    let ctx = CallCtx {
        call_id: json["call"]["id"].as_str().unwrap().to_string(),
        room_name: json["call"]["room_name"].as_str().unwrap().to_string(),
    };
    (ctx, booth, seeker)
}

async fn media_event(app: &TestApp, key: &str, event: &str, room: &str, identity: &str) -> reqwest::Response {
    app.client
        .post(app.url("/api/media/events"))
        .header("Authorization", format!("Bearer {key}"))
        .json(&serde_json::json!({
            "event": event,
            "room_name": room,
            "identity": identity,
        }))
        .send()
        .await
        .unwrap()
}

async fn roster(app: &TestApp, ctx: &CallCtx, token: &str) -> Vec<Value> {
    let resp = app
        .auth_get(&format!("/api/call/{}/roster", ctx.call_id), token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    json.as_array().unwrap().clone()
}

#[tokio::test]
async fn webhook_rejects_bad_provider_keys() {
    let app = TestApp::spawn().await;
    let (ctx, _, seeker) = live_call(&app).await;

    let resp = media_event(&app, "wrongkey", "participant_joined", &ctx.room_name, &seeker.hex()).await;
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app
        .client
        .post(app.url("/api/media/events"))
        .json(&serde_json::json!({
            "event": "participant_joined",
            "room_name": ctx.room_name,
            "identity": seeker.hex(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn presence_flips_the_connected_flag() {
    let app = TestApp::spawn().await;
    let (ctx, booth, seeker) = live_call(&app).await;

    let resp = media_event(&app, "testkey", "participant_joined", &ctx.room_name, &seeker.hex()).await;
    assert_eq!(resp.status().as_u16(), 200);

    let entries = roster(&app, &ctx, &booth.recruiter.access_token).await;
    let seeker_entry = entries
        .iter()
        .find(|e| e["identity"] == seeker.hex())
        .expect("seeker on roster");
    assert_eq!(seeker_entry["connected"], true);
    assert_eq!(seeker_entry["role"], "job_seeker");
    // The recruiter has not joined the room yet.
    let recruiter_entry = entries
        .iter()
        .find(|e| e["identity"] == booth.recruiter.hex())
        .unwrap();
    assert_eq!(recruiter_entry["connected"], false);

    media_event(&app, "testkey", "participant_left", &ctx.room_name, &seeker.hex()).await;
    let entries = roster(&app, &ctx, &booth.recruiter.access_token).await;
    let seeker_entry = entries.iter().find(|e| e["identity"] == seeker.hex()).unwrap();
    assert_eq!(seeker_entry["connected"], false);
}

#[tokio::test]
async fn unknown_identities_surface_as_guests() {
    let app = TestApp::spawn().await;
    let (ctx, booth, _) = live_call(&app).await;

    let resp = media_event(&app, "testkey", "participant_joined", &ctx.room_name, "observer-7").await;
    assert_eq!(resp.status().as_u16(), 200);

    let entries = roster(&app, &ctx, &booth.recruiter.access_token).await;
    let guest = entries
        .iter()
        .find(|e| e["identity"] == "observer-7")
        .expect("guest on roster");
    assert_eq!(guest["role"], "guest");
    assert_eq!(guest["connected"], true);
    assert!(guest["user_id"].is_null());
}

#[tokio::test]
async fn email_identities_resolve_to_known_users() {
    let app = TestApp::spawn().await;
    let (ctx, booth, seeker) = live_call(&app).await;

    // Some provisioning paths hand the provider an email, not a user id.
    let resp = media_event(&app, "testkey", "participant_joined", &ctx.room_name, &seeker.email).await;
    assert_eq!(resp.status().as_u16(), 200);

    let entries = roster(&app, &ctx, &booth.recruiter.access_token).await;
    let seeker_entry = entries.iter().find(|e| e["identity"] == seeker.hex()).unwrap();
    assert_eq!(seeker_entry["connected"], true);
    // No duplicate guest entry was created for the email spelling.
    assert!(!entries.iter().any(|e| e["identity"] == seeker.email));
}

#[tokio::test]
async fn events_for_unknown_rooms_are_ignored() {
    let app = TestApp::spawn().await;
    let (_, _, seeker) = live_call(&app).await;

    let resp = media_event(&app, "testkey", "participant_joined", "no-such-room", &seeker.hex()).await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = media_event(&app, "testkey", "recording_started", "no-such-room", "x").await;
    assert_eq!(resp.status().as_u16(), 200);
}

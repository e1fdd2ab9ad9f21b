use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn joins_assign_strictly_increasing_positions() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("acme").await;

    for expected in 1..=5 {
        let seeker = app.seed_job_seeker(&format!("pos{expected}")).await;
        let resp = app
            .auth_post(
                &format!("/api/booth/{}/queue/join", booth.booth_id.to_hex()),
                &seeker.access_token,
            )
            .json(&serde_json::json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["position"], expected);
        assert_eq!(json["status"], "waiting");
    }
}

#[tokio::test]
async fn duplicate_join_is_rejected() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("dup").await;
    let seeker = app.seed_job_seeker("dupseeker").await;
    let path = format!("/api/booth/{}/queue/join", booth.booth_id.to_hex());

    let resp = app
        .auth_post(&path, &seeker.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_post(&path, &seeker.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "already_queued");
}

#[tokio::test]
async fn positions_are_never_reused_after_leaving() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("rejoin").await;
    let seeker = app.seed_job_seeker("boomerang").await;
    let bid = booth.booth_id.to_hex();

    let resp = app
        .auth_post(&format!("/api/booth/{bid}/queue/join"), &seeker.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["position"], 1);

    let resp = app
        .auth_post(&format!("/api/booth/{bid}/queue/leave"), &seeker.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // The old slot is gone for good; a fresh join goes to the back.
    let resp = app
        .auth_post(&format!("/api/booth/{bid}/queue/join"), &seeker.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["position"], 2);
}

#[tokio::test]
async fn leave_without_entry_is_a_no_op() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("noop").await;
    let seeker = app.seed_job_seeker("ghost").await;

    let resp = app
        .auth_post(
            &format!("/api/booth/{}/queue/leave", booth.booth_id.to_hex()),
            &seeker.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn status_reports_people_ahead_and_serving_number() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("status").await;
    let bid = booth.booth_id.to_hex();

    let first = app.seed_job_seeker("first").await;
    let second = app.seed_job_seeker("second").await;
    for seeker in [&first, &second] {
        app.auth_post(&format!("/api/booth/{bid}/queue/join"), &seeker.access_token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .unwrap();
    }

    let resp = app
        .auth_put(
            &format!("/api/booth/{bid}/queue/serving"),
            &booth.recruiter.access_token,
        )
        .json(&serde_json::json!({ "serving_number": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get(&format!("/api/booth/{bid}/queue/status"), &second.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["position"], 2);
    assert_eq!(json["people_ahead"], 1);
    assert_eq!(json["serving_number"], 1);
}

#[tokio::test]
async fn booth_queue_is_recruiter_only() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("gate").await;
    let seeker = app.seed_job_seeker("peeker").await;
    let path = format!("/api/booth/{}/queue", booth.booth_id.to_hex());

    let resp = app
        .auth_get(&path, &seeker.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "permission_denied");

    let resp = app
        .auth_get(&path, &booth.recruiter.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn recruiter_removes_waiting_attendee() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("bouncer").await;
    let seeker = app.seed_job_seeker("removed").await;
    let bid = booth.booth_id.to_hex();

    let resp = app
        .auth_post(&format!("/api/booth/{bid}/queue/join"), &seeker.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    let entry: Value = resp.json().await.unwrap();
    let entry_id = entry["queue_entry_id"].as_str().unwrap();

    let resp = app
        .auth_post(
            &format!("/api/queue/{entry_id}/remove"),
            &booth.recruiter.access_token,
        )
        .json(&serde_json::json!({ "reason": "no-show" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // No live entry anymore.
    let resp = app
        .auth_get(&format!("/api/booth/{bid}/queue/status"), &seeker.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    // Removing twice trips the compare-and-set.
    let resp = app
        .auth_post(
            &format!("/api/queue/{entry_id}/remove"),
            &booth.recruiter.access_token,
        )
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "invalid_state");
}

#[tokio::test]
async fn interpreter_category_is_kept_on_the_entry() {
    let app = TestApp::spawn().await;
    let booth = app.seed_booth_with_recruiter("asl").await;
    let seeker = app.seed_job_seeker("signer").await;
    let bid = booth.booth_id.to_hex();

    app.auth_post(&format!("/api/booth/{bid}/queue/join"), &seeker.access_token)
        .json(&serde_json::json!({ "interpreter_category": "ASL" }))
        .send()
        .await
        .unwrap();

    let resp = app
        .auth_get(
            &format!("/api/booth/{bid}/queue"),
            &booth.recruiter.access_token,
        )
        .send()
        .await
        .unwrap();
    let items: Value = resp.json().await.unwrap();
    assert_eq!(items[0]["interpreter_category"], "ASL");
}

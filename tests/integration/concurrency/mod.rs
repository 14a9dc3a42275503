//! Concurrent operations against one engine
//!
//! Capacity, single-team membership and pending-request uniqueness must hold
//! no matter how the tasks interleave.

use std::sync::Arc;

use teamforge_common::Result;
use teamforge_formation::*;
use tokio::task::JoinSet;

use crate::common::TestApp;

/// Await every task, splitting results into successes and error codes
async fn drain<T: Send + 'static>(mut set: JoinSet<Result<T>>) -> (Vec<T>, Vec<String>) {
    let mut ok = Vec::new();
    let mut codes = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined.expect("task panicked") {
            Ok(value) => ok.push(value),
            Err(e) => codes.push(e.error_code().to_string()),
        }
    }
    (ok, codes)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_never_exceed_capacity() {
    let app = TestApp::new();
    let (team, _) = app.team("Contested", 4).await;

    let mut candidates = Vec::new();
    for i in 0..12 {
        candidates.push(app.participant(&format!("Candidate {}", i), &["algebra"]).await);
    }

    let mut set = JoinSet::new();
    for candidate in candidates {
        let engine = Arc::clone(&app.engine);
        let team_id = team.team.id;
        set.spawn(async move { engine.add_member(team_id, candidate.id).await });
    }

    let (added, codes) = drain(set).await;
    assert_eq!(added.len(), 3);
    assert_eq!(codes.len(), 9);
    assert!(codes.iter().all(|c| c == "CONFLICT"), "{:?}", codes);

    let roster = app.engine.team(team.team.id).await.unwrap();
    assert_eq!(roster.size(), 4);
    app.assert_invariants().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_to_different_teams_pick_one() {
    let app = TestApp::new();
    let drifter = app.participant("Drifter", &["algebra"]).await;

    let mut team_ids = Vec::new();
    for i in 0..5 {
        let (team, _) = app.team(&format!("Team {}", i), 4).await;
        team_ids.push(team.team.id);
    }

    let mut set = JoinSet::new();
    for team_id in team_ids {
        let engine = Arc::clone(&app.engine);
        let participant_id = drifter.id;
        set.spawn(async move { engine.add_member(team_id, participant_id).await });
    }

    let (added, codes) = drain(set).await;
    assert_eq!(added.len(), 1);
    assert_eq!(codes.len(), 4);

    let joined = app.reload(drifter.id).await;
    assert_eq!(joined.team_id, Some(added[0].team.id));
    app.assert_invariants().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_form_one_team() {
    let app = TestApp::new();
    let sender = app.participant("Sender", &["algebra"]).await;

    let mut requests = Vec::new();
    for i in 0..4 {
        let recipient = app.participant(&format!("Recipient {}", i), &["geometry"]).await;
        let request = app
            .engine
            .create_request(sender.id, recipient.id, None, None)
            .await
            .unwrap();
        requests.push((request.id, recipient.id));
    }

    let mut set = JoinSet::new();
    for (request_id, recipient_id) in requests.clone() {
        let engine = Arc::clone(&app.engine);
        set.spawn(async move { engine.respond(request_id, recipient_id, Decision::Accept).await });
    }

    let (accepted, codes) = drain(set).await;
    assert_eq!(accepted.len(), 1);
    assert!(accepted[0].team_created);
    assert!(codes.iter().all(|c| c == "CONFLICT"), "{:?}", codes);

    // Losing acceptances rolled back and left their requests pending
    let mut pending = 0;
    for (request_id, _) in requests {
        let request = app.engine.store().get_request(request_id).await.unwrap().unwrap();
        if request.status == RequestStatus::Pending {
            pending += 1;
        }
    }
    assert_eq!(pending, 3);

    let stats = app.engine.team_statistics().await.unwrap();
    assert_eq!(stats.total_teams, 1);
    app.assert_invariants().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_requests_keep_one_pending() {
    let app = TestApp::new();
    let a = app.participant("Ada", &["algebra"]).await;
    let b = app.participant("Bob", &["geometry"]).await;

    let mut set = JoinSet::new();
    for _ in 0..8 {
        let engine = Arc::clone(&app.engine);
        let (from, to) = (a.id, b.id);
        set.spawn(async move { engine.create_request(from, to, None, None).await });
    }

    let (created, codes) = drain(set).await;
    assert_eq!(created.len(), 1);
    assert_eq!(codes.len(), 7);
    assert!(codes.iter().all(|c| c == "CONFLICT"), "{:?}", codes);

    let inbox = app.engine.requests_for(b.id).await.unwrap();
    assert_eq!(inbox.incoming.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_leaves_and_joins_stay_consistent() {
    let app = TestApp::new();
    let (team, _) = app.team("Busy", 3).await;
    let a = app.participant("A", &["algebra"]).await;
    let b = app.participant("B", &["geometry"]).await;
    app.engine.add_member(team.team.id, a.id).await.unwrap();
    app.engine.add_member(team.team.id, b.id).await.unwrap();

    let mut newcomers = Vec::new();
    for i in 0..4 {
        newcomers.push(app.participant(&format!("New {}", i), &["algorithms"]).await);
    }

    let mut set = JoinSet::new();
    for leaver in [a.id, b.id] {
        let engine = Arc::clone(&app.engine);
        let team_id = team.team.id;
        set.spawn(async move { engine.remove_member(team_id, leaver).await.map(|_| ()) });
    }
    for newcomer in &newcomers {
        let engine = Arc::clone(&app.engine);
        let (team_id, participant_id) = (team.team.id, newcomer.id);
        set.spawn(async move { engine.add_member(team_id, participant_id).await.map(|_| ()) });
    }

    let (ok, _) = drain(set).await;
    assert!(ok.len() >= 2);

    let roster = app.engine.team(team.team.id).await.unwrap();
    assert!(roster.size() <= 3);
    app.assert_invariants().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_delete_team_racing_new_requests_leaves_none_pending() {
    let app = TestApp::new();
    let (team, leader) = app.team("Dissolving", 4).await;

    let mut applicants = Vec::new();
    for i in 0..6 {
        applicants.push(app.participant(&format!("Applicant {}", i), &["algebra"]).await);
    }

    let mut set = JoinSet::new();
    for applicant in &applicants {
        let engine = Arc::clone(&app.engine);
        let (from, to, team_id) = (applicant.id, leader.id, team.team.id);
        set.spawn(async move {
            engine
                .create_request(from, to, Some(team_id), None)
                .await
                .map(|_| ())
        });
    }
    let engine = Arc::clone(&app.engine);
    let team_id = team.team.id;
    set.spawn(async move { engine.delete_team(team_id).await });

    let (_, codes) = drain(set).await;
    assert!(codes.iter().all(|c| c == "NOT_FOUND"), "{:?}", codes);

    // Requests that won the race were expired with the team
    for applicant in &applicants {
        let outgoing = app.engine.requests_for(applicant.id).await.unwrap().outgoing;
        assert!(outgoing.iter().all(|r| r.status != RequestStatus::Pending));
    }
    app.assert_invariants().await;
}

//! Membership manager integration tests

use teamforge_formation::*;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use crate::common::{assert_error_code, TestApp};

mod test_add_member {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_add_member_fills_team_to_capacity_then_conflicts() {
        let app = TestApp::new();
        let (team, _leader) = app.team("Primes", 4).await;

        for i in 0..3 {
            let p = app.participant(&format!("Member {}", i), &["algebra"]).await;
            let roster = assert_ok!(app.engine.add_member(team.team.id, p.id).await);
            assert_eq!(roster.size(), i + 2);
        }

        let extra = app.participant("Extra", &["geometry"]).await;
        let err = assert_error_code(app.engine.add_member(team.team.id, extra.id).await, "CONFLICT");
        assert!(err.to_string().contains("capacity"));
        assert!(app.reload(extra.id).await.team_id.is_none());

        app.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_add_member_rejects_participant_with_team() {
        let app = TestApp::new();
        let (first, _) = app.team("First", 4).await;
        let (second, _) = app.team("Second", 4).await;
        let p = app.participant("Ada", &["algebra"]).await;

        assert_ok!(app.engine.add_member(first.team.id, p.id).await);
        assert_error_code(app.engine.add_member(second.team.id, p.id).await, "CONFLICT");
        assert_error_code(app.engine.add_member(first.team.id, p.id).await, "CONFLICT");

        assert_eq!(app.reload(p.id).await.team_id, Some(first.team.id));
    }

    #[tokio::test]
    async fn test_add_member_rejects_locked_team() {
        let app = TestApp::new();
        let (team, leader) = app.team("Locked", 4).await;
        assert_ok!(app.engine.lock_team(team.team.id, leader.id, true).await);

        let p = app.participant("Ada", &["algebra"]).await;
        assert_error_code(app.engine.add_member(team.team.id, p.id).await, "CONFLICT");
    }

    #[tokio::test]
    async fn test_add_member_unknown_entities() {
        let app = TestApp::new();
        let (team, _) = app.team("Known", 4).await;
        let p = app.participant("Ada", &["algebra"]).await;

        assert_error_code(app.engine.add_member(Uuid::new_v4(), p.id).await, "NOT_FOUND");
        assert_error_code(app.engine.add_member(team.team.id, Uuid::new_v4()).await, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_add_member_publishes_event() {
        let app = TestApp::new();
        let (team, _) = app.team("Events", 4).await;
        let p = app.participant("Ada", &["algebra"]).await;

        app.notifier.clear();
        assert_ok!(app.engine.add_member(team.team.id, p.id).await);

        assert_eq!(
            app.notifier.events(),
            vec![FormationEvent::MemberAdded {
                team_id: team.team.id,
                participant_id: p.id,
            }]
        );
    }
}

mod test_remove_member {
    use super::*;

    #[tokio::test]
    async fn test_leader_must_transfer_before_leaving() {
        let app = TestApp::new();
        let (team, leader) = app.team("Hexagons", 4).await;
        let x = app.participant("X", &["geometry"]).await;
        let y = app.participant("Y", &["algebra"]).await;
        assert_ok!(app.engine.add_member(team.team.id, x.id).await);
        assert_ok!(app.engine.add_member(team.team.id, y.id).await);

        assert_error_code(
            app.engine.remove_member(team.team.id, leader.id).await,
            "INVALID_STATE",
        );

        let updated = assert_ok!(app.engine.transfer_leadership(team.team.id, x.id).await);
        assert_eq!(updated.leader_id, x.id);

        let roster = assert_ok!(app.engine.remove_member(team.team.id, leader.id).await);
        assert_eq!(roster.size(), 2);
        assert_eq!(roster.team.leader_id, x.id);
        assert!(app.reload(leader.id).await.team_id.is_none());

        app.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_remove_non_member_is_invalid_state() {
        let app = TestApp::new();
        let (team, _) = app.team("Team", 4).await;
        let outsider = app.participant("Outsider", &["algebra"]).await;

        assert_error_code(
            app.engine.remove_member(team.team.id, outsider.id).await,
            "INVALID_STATE",
        );
    }

    #[tokio::test]
    async fn test_locked_team_membership_is_frozen() {
        let app = TestApp::new();
        let (team, leader) = app.team("Frozen", 4).await;
        let member = app.participant("Member", &["algebra"]).await;
        assert_ok!(app.engine.add_member(team.team.id, member.id).await);
        assert_ok!(app.engine.lock_team(team.team.id, leader.id, true).await);

        assert_error_code(
            app.engine.remove_member(team.team.id, member.id).await,
            "INVALID_STATE",
        );

        assert_ok!(app.engine.lock_team(team.team.id, leader.id, false).await);
        assert_ok!(app.engine.remove_member(team.team.id, member.id).await);
    }

    #[tokio::test]
    async fn test_closed_team_still_allows_leaving() {
        let app = TestApp::new();
        let (team, leader) = app.team("Closed", 4).await;
        let member = app.participant("Member", &["algebra"]).await;
        assert_ok!(app.engine.add_member(team.team.id, member.id).await);
        assert_ok!(
            app.engine
                .set_open_to_requests(team.team.id, leader.id, false)
                .await
        );

        assert_ok!(app.engine.remove_member(team.team.id, member.id).await);
    }
}

mod test_leadership_and_flags {
    use super::*;

    #[tokio::test]
    async fn test_transfer_to_non_member_is_invalid_state() {
        let app = TestApp::new();
        let (team, leader) = app.team("Team", 4).await;
        let outsider = app.participant("Outsider", &["algebra"]).await;

        assert_error_code(
            app.engine.transfer_leadership(team.team.id, outsider.id).await,
            "INVALID_STATE",
        );
        assert_eq!(app.engine.team(team.team.id).await.unwrap().team.leader_id, leader.id);
    }

    #[tokio::test]
    async fn test_only_leader_sets_flags() {
        let app = TestApp::new();
        let (team, leader) = app.team("Team", 4).await;
        let member = app.participant("Member", &["algebra"]).await;
        assert_ok!(app.engine.add_member(team.team.id, member.id).await);

        assert_error_code(
            app.engine.lock_team(team.team.id, member.id, true).await,
            "FORBIDDEN",
        );
        assert_error_code(
            app.engine
                .set_open_to_requests(team.team.id, member.id, false)
                .await,
            "FORBIDDEN",
        );

        let locked = assert_ok!(app.engine.lock_team(team.team.id, leader.id, true).await);
        assert!(locked.locked);
        assert!(locked.open_to_requests);

        let closed = assert_ok!(
            app.engine
                .set_open_to_requests(team.team.id, leader.id, false)
                .await
        );
        assert!(closed.locked);
        assert!(!closed.open_to_requests);
    }

    #[tokio::test]
    async fn test_flags_on_unknown_team() {
        let app = TestApp::new();
        let p = app.participant("Ada", &["algebra"]).await;
        assert_err!(app.engine.lock_team(Uuid::new_v4(), p.id, true).await);
    }
}

mod test_delete_team {
    use super::*;

    #[tokio::test]
    async fn test_delete_team_detaches_members() {
        let app = TestApp::new();
        let (team, leader) = app.team("Doomed", 4).await;
        let member = app.participant("Member", &["algebra"]).await;
        assert_ok!(app.engine.add_member(team.team.id, member.id).await);

        assert_ok!(app.engine.delete_team(team.team.id).await);

        assert!(app.reload(leader.id).await.team_id.is_none());
        assert!(app.reload(member.id).await.team_id.is_none());
        assert_error_code(app.engine.team(team.team.id).await, "NOT_FOUND");
        app.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_delete_team_expires_requests_targeting_it() {
        let app = TestApp::new();
        let (team, leader) = app.team("Doomed", 4).await;
        let applicant = app.participant("Applicant", &["algebra"]).await;
        let request = assert_ok!(
            app.engine
                .create_request(applicant.id, leader.id, Some(team.team.id), None)
                .await
        );

        assert_ok!(app.engine.delete_team(team.team.id).await);

        let stored = app.engine.store().get_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Expired);
        assert!(stored.responded_at.is_some());
        assert_error_code(
            app.engine
                .respond(request.id, leader.id, Decision::Accept)
                .await,
            "INVALID_STATE",
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_team() {
        let app = TestApp::new();
        assert_error_code(app.engine.delete_team(Uuid::new_v4()).await, "NOT_FOUND");
    }
}

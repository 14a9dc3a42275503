//! Participant registry, team administration and query integration tests

use teamforge_formation::*;
use tokio_test::assert_ok;
use uuid::Uuid;

use crate::common::{assert_error_code, TestApp};

fn new_participant(email: &str, registration_number: &str) -> NewParticipant {
    NewParticipant {
        name: "Ada Lovelace".to_string(),
        email: email.to_string(),
        registration_number: registration_number.to_string(),
        credential_hash: "argon2-hash".to_string(),
        skills: vec![" Algebra ".to_string(), "algebra".to_string(), "geometry".to_string()],
    }
}

mod test_participants {
    use super::*;

    #[tokio::test]
    async fn test_register_normalises_input() {
        let app = TestApp::new();
        let p = assert_ok!(
            app.engine
                .register_participant(new_participant("Ada@Example.com", "ab123"))
                .await
        );

        assert_eq!(p.email, "ada@example.com");
        assert_eq!(p.registration_number, "AB123");
        assert_eq!(p.skills, vec!["algebra".to_string(), "geometry".to_string()]);
        assert!(p.team_id.is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let app = TestApp::new();
        assert_ok!(
            app.engine
                .register_participant(new_participant("ada@example.com", "R1"))
                .await
        );

        assert_error_code(
            app.engine
                .register_participant(new_participant("ADA@example.com", "R2"))
                .await,
            "CONFLICT",
        );
        assert_error_code(
            app.engine
                .register_participant(new_participant("other@example.com", "r1"))
                .await,
            "CONFLICT",
        );
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let app = TestApp::new();

        let mut no_skills = new_participant("a@example.com", "R1");
        no_skills.skills = vec![];
        assert_error_code(app.engine.register_participant(no_skills).await, "VALIDATION_ERROR");

        let bad_email = new_participant("not-an-email", "R2");
        assert_error_code(app.engine.register_participant(bad_email).await, "VALIDATION_ERROR");

        let bad_reg = new_participant("b@example.com", "R-3");
        assert_error_code(app.engine.register_participant(bad_reg).await, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_update_participant_profile() {
        let app = TestApp::new();
        let p = app.participant("Ada", &["algebra"]).await;

        let updated = assert_ok!(
            app.engine
                .update_participant(
                    p.id,
                    ParticipantUpdate {
                        name: Some("Ada L.".to_string()),
                        skills: Some(vec!["Geometry".to_string()]),
                        ..Default::default()
                    },
                )
                .await
        );
        assert_eq!(updated.name, "Ada L.");
        assert_eq!(updated.skills, vec!["geometry".to_string()]);
        assert_eq!(updated.email, p.email);

        let reloaded = app.reload(p.id).await;
        assert_eq!(reloaded.skills, vec!["geometry".to_string()]);

        assert_error_code(
            app.engine
                .update_participant(
                    p.id,
                    ParticipantUpdate {
                        skills: Some(vec![]),
                        ..Default::default()
                    },
                )
                .await,
            "VALIDATION_ERROR",
        );
        assert_error_code(
            app.engine
                .update_participant(Uuid::new_v4(), ParticipantUpdate::default())
                .await,
            "NOT_FOUND",
        );
    }

    #[tokio::test]
    async fn test_remove_participant_deletes_their_requests() {
        let app = TestApp::new();
        let a = app.participant("Ada", &["algebra"]).await;
        let b = app.participant("Bob", &["geometry"]).await;
        let c = app.participant("Cy", &["algorithms"]).await;
        let sent = assert_ok!(app.engine.create_request(a.id, b.id, None, None).await);
        let received = assert_ok!(app.engine.create_request(c.id, a.id, None, None).await);
        let unrelated = assert_ok!(app.engine.create_request(b.id, c.id, None, None).await);

        assert_ok!(app.engine.remove_participant(a.id).await);

        let store = app.engine.store();
        assert!(store.get_participant(a.id).await.unwrap().is_none());
        assert!(store.get_request(sent.id).await.unwrap().is_none());
        assert!(store.get_request(received.id).await.unwrap().is_none());
        assert!(store.get_request(unrelated.id).await.unwrap().is_some());

        assert_error_code(app.engine.remove_participant(a.id).await, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_remove_member_participant_detaches() {
        let app = TestApp::new();
        let (team, _) = app.team("Team", 4).await;
        let member = app.participant("Member", &["algebra"]).await;
        assert_ok!(app.engine.add_member(team.team.id, member.id).await);

        assert_ok!(app.engine.remove_participant(member.id).await);

        let roster = app.engine.team(team.team.id).await.unwrap();
        assert_eq!(roster.size(), 1);
        app.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_remove_leader_rules() {
        let app = TestApp::new();
        let (busy, busy_leader) = app.team("Busy", 4).await;
        let member = app.participant("Member", &["algebra"]).await;
        assert_ok!(app.engine.add_member(busy.team.id, member.id).await);

        assert_error_code(
            app.engine.remove_participant(busy_leader.id).await,
            "INVALID_STATE",
        );

        let (solo, solo_leader) = app.team("Solo", 4).await;
        assert_ok!(app.engine.remove_participant(solo_leader.id).await);
        assert_error_code(app.engine.team(solo.team.id).await, "NOT_FOUND");
        app.assert_invariants().await;
    }
}

mod test_teams {
    use super::*;

    #[tokio::test]
    async fn test_create_team_adds_leader() {
        let app = TestApp::new();
        let leader = app.participant("Leader", &["leadership"]).await;

        let roster = assert_ok!(
            app.engine
                .create_team(NewTeam {
                    name: "  Topologists ".to_string(),
                    description: Some("Knots and surfaces".to_string()),
                    leader_id: leader.id,
                    capacity: None,
                    tags: vec!["Topology".to_string()],
                })
                .await
        );

        assert_eq!(roster.team.name, "Topologists");
        assert_eq!(roster.team.capacity, DEFAULT_TEAM_CAPACITY);
        assert_eq!(roster.team.tags, vec!["topology".to_string()]);
        assert!(roster.team.open_to_requests);
        assert!(!roster.team.locked);
        assert_eq!(roster.members.len(), 1);
        assert_eq!(app.reload(leader.id).await.team_id, Some(roster.team.id));
    }

    #[tokio::test]
    async fn test_create_team_rules() {
        let app = TestApp::new();
        let (existing, existing_leader) = app.team("Taken", 4).await;
        let leader = app.participant("Leader", &["leadership"]).await;

        let new_team = |name: &str, leader_id: Uuid, capacity: Option<i32>| NewTeam {
            name: name.to_string(),
            description: None,
            leader_id,
            capacity,
            tags: vec![],
        };

        assert_error_code(
            app.engine.create_team(new_team("Taken", leader.id, None)).await,
            "CONFLICT",
        );
        assert_error_code(
            app.engine
                .create_team(new_team("Other", existing_leader.id, None))
                .await,
            "CONFLICT",
        );
        assert_error_code(
            app.engine
                .create_team(new_team("Other", Uuid::new_v4(), None))
                .await,
            "NOT_FOUND",
        );
        assert_error_code(
            app.engine
                .create_team(new_team("Other", leader.id, Some(11)))
                .await,
            "VALIDATION_ERROR",
        );
        assert_error_code(
            app.engine
                .create_team(new_team("Other", leader.id, Some(0)))
                .await,
            "VALIDATION_ERROR",
        );

        assert_eq!(app.engine.team(existing.team.id).await.unwrap().size(), 1);
        assert!(app.reload(leader.id).await.team_id.is_none());
    }

    #[tokio::test]
    async fn test_update_team() {
        let app = TestApp::new();
        let (team, leader) = app.team("Team", 4).await;
        let (other, _) = app.team("Other", 4).await;
        let a = app.participant("A", &["algebra"]).await;
        let b = app.participant("B", &["geometry"]).await;
        assert_ok!(app.engine.add_member(team.team.id, a.id).await);
        assert_ok!(app.engine.add_member(team.team.id, b.id).await);

        assert_error_code(
            app.engine
                .update_team(team.team.id, a.id, TeamUpdate::default())
                .await,
            "FORBIDDEN",
        );
        assert_error_code(
            app.engine
                .update_team(
                    team.team.id,
                    leader.id,
                    TeamUpdate {
                        capacity: Some(2),
                        ..Default::default()
                    },
                )
                .await,
            "INVALID_STATE",
        );
        assert_error_code(
            app.engine
                .update_team(
                    team.team.id,
                    leader.id,
                    TeamUpdate {
                        name: Some(other.team.name.clone()),
                        ..Default::default()
                    },
                )
                .await,
            "CONFLICT",
        );

        let updated = assert_ok!(
            app.engine
                .update_team(
                    team.team.id,
                    leader.id,
                    TeamUpdate {
                        name: Some("Renamed".to_string()),
                        description: Some("New description".to_string()),
                        capacity: Some(3),
                        tags: None,
                    },
                )
                .await
        );
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.capacity, 3);
        assert_eq!(updated.description.as_deref(), Some("New description"));

        let status = assert_ok!(app.engine.team_status(team.team.id).await);
        assert_eq!(status.name, "Renamed");
        assert_eq!(status.size, 3);
        assert_eq!(status.open_slots, 0);
    }
}

mod test_queries {
    use super::*;

    #[tokio::test]
    async fn test_participant_queries() {
        let app = TestApp::new();
        let (team, leader) = app.team("Team", 4).await;
        let a = app.participant("A", &["algebra", "geometry"]).await;
        let b = app.participant("B", &["geometry"]).await;
        assert_ok!(app.engine.add_member(team.team.id, a.id).await);

        let unassigned = assert_ok!(app.engine.unassigned_participants().await);
        assert_eq!(unassigned.iter().map(|p| p.id).collect::<Vec<_>>(), vec![b.id]);

        let geometers = assert_ok!(app.engine.participants_with_skill(" GEOMETRY ").await);
        assert_eq!(geometers.len(), 2);

        let distribution = assert_ok!(app.engine.skill_distribution().await);
        assert_eq!(distribution[0].skill, "geometry");
        assert_eq!(distribution[0].participants, 2);
        let names: Vec<&str> = distribution.iter().map(|s| s.skill.as_str()).collect();
        assert_eq!(names, vec!["geometry", "algebra", "leadership"]);

        let status = assert_ok!(app.engine.team_status(team.team.id).await);
        assert_eq!(status.leader_id, leader.id);
        assert_eq!(status.size, 2);
        assert_eq!(status.capacity, 4);
        assert_eq!(status.open_slots, 2);
        assert_eq!(
            status.skill_coverage,
            vec!["algebra".to_string(), "geometry".to_string(), "leadership".to_string()]
        );

        assert_error_code(app.engine.participant(Uuid::new_v4()).await, "NOT_FOUND");
        assert_error_code(app.engine.team_status(Uuid::new_v4()).await, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_team_statistics() {
        let app = TestApp::new();
        let (full, _) = app.team("Full", 2).await;
        let (_partial, _) = app.team("Partial", 4).await;
        let (emptied, emptied_leader) = app.team("Emptied", 4).await;
        let filler = app.participant("Filler", &["algebra"]).await;
        let stand_in = app.participant("Stand-in", &["algebra"]).await;
        assert_ok!(app.engine.add_member(full.team.id, filler.id).await);

        // The founding leader steps down and leaves
        assert_ok!(app.engine.add_member(emptied.team.id, stand_in.id).await);
        assert_ok!(app.engine.transfer_leadership(emptied.team.id, stand_in.id).await);
        assert_ok!(app.engine.remove_member(emptied.team.id, emptied_leader.id).await);

        let stats = assert_ok!(app.engine.team_statistics().await);
        assert_eq!(stats.total_teams, 3);
        assert_eq!(stats.full_teams, 1);
        assert_eq!(stats.teams_with_members, 3);
        assert_eq!(stats.empty_teams, 0);
    }
}

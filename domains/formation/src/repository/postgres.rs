//! PostgreSQL entity store
//!
//! Locking reads use `SELECT ... FOR UPDATE` inside the transaction opened by
//! [`EntityStore::begin`]. Uniqueness (email, registration number, team name,
//! one pending request per ordered pair) is enforced by the schema and
//! surfaces as `RepositoryError::AlreadyExists`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use teamforge_common::RepositoryError;
use uuid::Uuid;

use super::{EntityStore, StoreResult, StoreTx};
use crate::domain::entities::{Participant, Team, TeamRequest, TeamWithMembers};

pub(crate) const PARTICIPANT_COLUMNS: &str = "id, name, email, registration_number, \
    credential_hash, skills, team_id, created_at, updated_at";

pub(crate) const TEAM_COLUMNS: &str = "id, name, description, leader_id, capacity, tags, \
    locked, open_to_requests, created_at, updated_at";

pub(crate) const REQUEST_COLUMNS: &str = "id, from_participant_id, to_participant_id, team_id, \
    message, status, created_at, responded_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `database_url`
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Connection(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl EntityStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> StoreResult<PgTx> {
        let tx = self.pool.begin().await.map_err(RepositoryError::from_sqlx)?;
        Ok(PgTx { tx })
    }

    async fn get_participant(&self, id: Uuid) -> StoreResult<Option<Participant>> {
        let query = format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1");
        sqlx::query_as::<_, Participant>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn list_participants(&self) -> StoreResult<Vec<Participant>> {
        let query =
            format!("SELECT {PARTICIPANT_COLUMNS} FROM participants ORDER BY created_at, id");
        sqlx::query_as::<_, Participant>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn get_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1");
        sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn list_rosters(&self) -> StoreResult<Vec<TeamWithMembers>> {
        // Both reads share one snapshot so rosters match their teams
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from_sqlx)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;

        let teams_query = format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY created_at, id");
        let teams = sqlx::query_as::<_, Team>(&teams_query)
            .fetch_all(&mut *tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;

        let members_query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             WHERE team_id IS NOT NULL ORDER BY created_at, id"
        );
        let members = sqlx::query_as::<_, Participant>(&members_query)
            .fetch_all(&mut *tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;

        tx.commit().await.map_err(RepositoryError::from_sqlx)?;

        Ok(teams
            .into_iter()
            .map(|team| {
                let roster = members
                    .iter()
                    .filter(|p| p.team_id == Some(team.id))
                    .cloned()
                    .collect();
                TeamWithMembers {
                    team,
                    members: roster,
                }
            })
            .collect())
    }

    async fn team_members(&self, team_id: Uuid) -> StoreResult<Vec<Participant>> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             WHERE team_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(team_id)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn get_request(&self, id: Uuid) -> StoreResult<Option<TeamRequest>> {
        let query = format!("SELECT {REQUEST_COLUMNS} FROM team_requests WHERE id = $1");
        sqlx::query_as::<_, TeamRequest>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn requests_from(&self, participant_id: Uuid) -> StoreResult<Vec<TeamRequest>> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM team_requests \
             WHERE from_participant_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, TeamRequest>(&query)
            .bind(participant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn requests_to(&self, participant_id: Uuid) -> StoreResult<Vec<TeamRequest>> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM team_requests \
             WHERE to_participant_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, TeamRequest>(&query)
            .bind(participant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)
    }
}

impl PgTx {
    /// Fail with `NotFound` when a write touched no rows
    fn expect_row(rows_affected: u64) -> StoreResult<()> {
        if rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_participant(&mut self, id: Uuid) -> StoreResult<Option<Participant>> {
        let query =
            format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Participant>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn lock_team(&mut self, id: Uuid) -> StoreResult<Option<Team>> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn lock_request(&mut self, id: Uuid) -> StoreResult<Option<TeamRequest>> {
        let query =
            format!("SELECT {REQUEST_COLUMNS} FROM team_requests WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, TeamRequest>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn members_of(&mut self, team_id: Uuid) -> StoreResult<Vec<Participant>> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             WHERE team_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(team_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn find_participant_by_email(
        &mut self,
        email: &str,
    ) -> StoreResult<Option<Participant>> {
        let query = format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE email = $1");
        sqlx::query_as::<_, Participant>(&query)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn find_participant_by_registration_number(
        &mut self,
        registration_number: &str,
    ) -> StoreResult<Option<Participant>> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE registration_number = $1"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(registration_number)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn find_team_by_name(&mut self, name: &str) -> StoreResult<Option<Team>> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE name = $1");
        sqlx::query_as::<_, Team>(&query)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn find_pending_request(
        &mut self,
        from_participant_id: Uuid,
        to_participant_id: Uuid,
    ) -> StoreResult<Option<TeamRequest>> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM team_requests \
             WHERE from_participant_id = $1 AND to_participant_id = $2 AND status = 'pending'"
        );
        sqlx::query_as::<_, TeamRequest>(&query)
            .bind(from_participant_id)
            .bind(to_participant_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn lock_pending_requests_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<TeamRequest>> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM team_requests \
             WHERE status = 'pending' AND created_at < $1 \
             ORDER BY id FOR UPDATE SKIP LOCKED"
        );
        sqlx::query_as::<_, TeamRequest>(&query)
            .bind(cutoff)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn lock_pending_requests_for_team(
        &mut self,
        team_id: Uuid,
    ) -> StoreResult<Vec<TeamRequest>> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM team_requests \
             WHERE status = 'pending' AND team_id = $1 \
             ORDER BY id FOR UPDATE"
        );
        sqlx::query_as::<_, TeamRequest>(&query)
            .bind(team_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)
    }

    async fn insert_participant(&mut self, participant: &Participant) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO participants ({PARTICIPANT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        );
        sqlx::query(&query)
            .bind(participant.id)
            .bind(&participant.name)
            .bind(&participant.email)
            .bind(&participant.registration_number)
            .bind(&participant.credential_hash)
            .bind(&participant.skills)
            .bind(participant.team_id)
            .bind(participant.created_at)
            .bind(participant.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn update_participant(&mut self, participant: &Participant) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE participants SET \
                name = $2, skills = $3, credential_hash = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(participant.id)
        .bind(&participant.name)
        .bind(&participant.skills)
        .bind(&participant.credential_hash)
        .bind(participant.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Self::expect_row(result.rows_affected())
    }

    async fn delete_participant(&mut self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Self::expect_row(result.rows_affected())
    }

    async fn set_team_reference(
        &mut self,
        participant_id: Uuid,
        team_id: Option<Uuid>,
    ) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE participants SET team_id = $2, updated_at = NOW() WHERE id = $1")
                .bind(participant_id)
                .bind(team_id)
                .execute(&mut *self.tx)
                .await
                .map_err(RepositoryError::from_sqlx)?;
        Self::expect_row(result.rows_affected())
    }

    async fn insert_team(&mut self, team: &Team) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO teams ({TEAM_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        sqlx::query(&query)
            .bind(team.id)
            .bind(&team.name)
            .bind(&team.description)
            .bind(team.leader_id)
            .bind(team.capacity)
            .bind(&team.tags)
            .bind(team.locked)
            .bind(team.open_to_requests)
            .bind(team.created_at)
            .bind(team.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn update_team(&mut self, team: &Team) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE teams SET \
                name = $2, description = $3, leader_id = $4, capacity = $5, tags = $6, \
                locked = $7, open_to_requests = $8, updated_at = $9 \
             WHERE id = $1",
        )
        .bind(team.id)
        .bind(&team.name)
        .bind(&team.description)
        .bind(team.leader_id)
        .bind(team.capacity)
        .bind(&team.tags)
        .bind(team.locked)
        .bind(team.open_to_requests)
        .bind(team.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Self::expect_row(result.rows_affected())
    }

    async fn delete_team(&mut self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE participants SET team_id = NULL, updated_at = NOW() WHERE team_id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Self::expect_row(result.rows_affected())
    }

    async fn insert_request(&mut self, request: &TeamRequest) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO team_requests ({REQUEST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&query)
            .bind(request.id)
            .bind(request.from_participant_id)
            .bind(request.to_participant_id)
            .bind(request.team_id)
            .bind(&request.message)
            .bind(request.status)
            .bind(request.created_at)
            .bind(request.responded_at)
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn update_request(&mut self, request: &TeamRequest) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE team_requests SET status = $2, responded_at = $3 WHERE id = $1")
                .bind(request.id)
                .bind(request.status)
                .bind(request.responded_at)
                .execute(&mut *self.tx)
                .await
                .map_err(RepositoryError::from_sqlx)?;
        Self::expect_row(result.rows_affected())
    }

    async fn delete_request(&mut self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM team_requests WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Self::expect_row(result.rows_affected())
    }

    async fn delete_requests_involving(&mut self, participant_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM team_requests \
             WHERE from_participant_id = $1 OR to_participant_id = $1",
        )
        .bind(participant_id)
        .execute(&mut *self.tx)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await.map_err(RepositoryError::from_sqlx)
    }
}

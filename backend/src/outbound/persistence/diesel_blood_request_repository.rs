//! PostgreSQL-backed `BloodRequestRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{BloodRequestRepository, BloodRequestRepositoryError, RequestFilter};
use crate::domain::{BloodRequest, BloodRequestId, Page, PageRequest, RequestStatus};

use super::error_mapping::{
    DieselFailure, classify, contains_pattern, count_to_u64, limit_offset, pool_message,
};
use super::models::BloodRequestRow;
use super::pool::{DbPool, PoolError};
use super::schema::blood_requests;

/// Diesel-backed implementation of the [`BloodRequestRepository`] port.
#[derive(Clone)]
pub struct DieselBloodRequestRepository {
    pool: DbPool,
}

impl DieselBloodRequestRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> BloodRequestRepositoryError {
    BloodRequestRepositoryError::connection(pool_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> BloodRequestRepositoryError {
    match classify(error) {
        DieselFailure::Connection(message) => BloodRequestRepositoryError::connection(message),
        DieselFailure::UniqueViolation(constraint) => BloodRequestRepositoryError::query(
            format!("unique violation on {}", constraint.as_deref().unwrap_or("unknown")),
        ),
        DieselFailure::ForeignKeyViolation => {
            BloodRequestRepositoryError::query("requester does not exist")
        }
        DieselFailure::NotFound => BloodRequestRepositoryError::query("blood request not found"),
        DieselFailure::Query(message) => BloodRequestRepositoryError::query(message),
    }
}

fn row_to_request(row: BloodRequestRow) -> Result<BloodRequest, BloodRequestRepositoryError> {
    row.into_domain().map_err(BloodRequestRepositoryError::query)
}

/// Requests matching `filter`, expressed as SQL predicates.
fn filtered(filter: &RequestFilter) -> blood_requests::BoxedQuery<'static, Pg> {
    let mut query = blood_requests::table.into_boxed();
    if let Some(requester) = &filter.requester {
        query = query.filter(blood_requests::requester_id.eq(*requester.as_uuid()));
    }
    if let Some(excluded) = &filter.exclude_requester {
        query = query.filter(blood_requests::requester_id.ne(*excluded.as_uuid()));
    }
    if filter.public_only {
        query = query.filter(blood_requests::is_public.eq(true));
    }
    if let Some(status) = filter.status {
        query = query.filter(blood_requests::status.eq(status.as_str()));
    }
    if let Some(group) = filter.blood_group {
        query = query.filter(blood_requests::blood_group_needed.eq(group.as_str()));
    }
    if !filter.urgencies.is_empty() {
        let codes: Vec<&'static str> = filter.urgencies.iter().map(|u| u.as_str()).collect();
        query = query.filter(blood_requests::urgency.eq_any(codes));
    }
    if let Some(needle) = filter.search_needle() {
        let pattern = contains_pattern(&needle);
        query = query.filter(
            blood_requests::patient_name
                .ilike(pattern.clone())
                .or(blood_requests::hospital_name.ilike(pattern.clone()))
                .or(blood_requests::description.ilike(pattern)),
        );
    }
    query
}

#[async_trait]
impl BloodRequestRepository for DieselBloodRequestRepository {
    async fn insert(&self, request: &BloodRequest) -> Result<(), BloodRequestRepositoryError> {
        let row = BloodRequestRow::from_domain(request).map_err(BloodRequestRepositoryError::query)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(blood_requests::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find(
        &self,
        id: &BloodRequestId,
    ) -> Result<Option<BloodRequest>, BloodRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<BloodRequestRow> = blood_requests::table
            .find(id.as_uuid())
            .select(BloodRequestRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_request).transpose()
    }

    async fn update(&self, request: &BloodRequest) -> Result<(), BloodRequestRepositoryError> {
        let row = BloodRequestRow::from_domain(request).map_err(BloodRequestRepositoryError::query)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(blood_requests::table.find(request.id.as_uuid()))
            .set(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(BloodRequestRepositoryError::query("blood request not found"));
        }
        Ok(())
    }

    async fn delete(&self, id: &BloodRequestId) -> Result<bool, BloodRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        // Responses go with the request through ON DELETE CASCADE.
        let deleted = diesel::delete(blood_requests::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn list(
        &self,
        filter: &RequestFilter,
        page: PageRequest,
    ) -> Result<Page<BloodRequest>, BloodRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = filtered(filter)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let (limit, offset) = limit_offset(page);
        let rows: Vec<BloodRequestRow> = filtered(filter)
            .select(BloodRequestRow::as_select())
            .order_by((blood_requests::created_at.desc(), blood_requests::id.asc()))
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let requests = rows
            .into_iter()
            .map(row_to_request)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(requests, page, count_to_u64(total)))
    }

    async fn count(&self, filter: &RequestFilter) -> Result<u64, BloodRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = filtered(filter)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(count_to_u64(total))
    }

    async fn expire_overdue(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, BloodRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let expired = diesel::update(
            blood_requests::table
                .filter(blood_requests::status.eq(RequestStatus::Active.as_str()))
                .filter(blood_requests::needed_by.lt(now)),
        )
        .set((
            blood_requests::status.eq(RequestStatus::Expired.as_str()),
            blood_requests::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(u64::try_from(expired).unwrap_or(u64::MAX))
    }
}

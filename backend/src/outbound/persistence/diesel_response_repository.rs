//! PostgreSQL-backed `ResponseRepository` implementation using Diesel ORM.
//!
//! Listings join each response with its request and the donor's name in one
//! query. Recording a donation touches four tables and runs in a single
//! transaction, so a failure leaves counters and statuses untouched.

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::ports::{
    DonationCompletion, ResponseFilter, ResponseRecord, ResponseRepository,
    ResponseRepositoryError,
};
use crate::domain::{
    BloodRequestId, DonationResponse, Page, PageRequest, RequestStatus, ResponseId,
    ResponseOutcome, UserId,
};

use super::error_mapping::{
    DieselFailure, classify, contains_pattern, count_to_u64, limit_offset, pool_message,
};
use super::models::{BloodRequestRow, ResponseRow};
use super::pool::{DbPool, PoolError};
use super::schema::{blood_request_responses, blood_requests, user_profiles, users};

/// Diesel-backed implementation of the [`ResponseRepository`] port.
#[derive(Clone)]
pub struct DieselResponseRepository {
    pool: DbPool,
}

impl DieselResponseRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ResponseRepositoryError {
    ResponseRepositoryError::connection(pool_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> ResponseRepositoryError {
    match classify(error) {
        DieselFailure::Connection(message) => ResponseRepositoryError::connection(message),
        DieselFailure::UniqueViolation(constraint) => ResponseRepositoryError::query(format!(
            "unique violation on {}",
            constraint.as_deref().unwrap_or("unknown")
        )),
        DieselFailure::ForeignKeyViolation => {
            ResponseRepositoryError::missing("blood request or donor not found")
        }
        DieselFailure::NotFound => ResponseRepositoryError::missing("response or request not found"),
        DieselFailure::Query(message) => ResponseRepositoryError::query(message),
    }
}

fn row_to_response(row: ResponseRow) -> Result<DonationResponse, ResponseRepositoryError> {
    row.into_domain().map_err(ResponseRepositoryError::query)
}

type JoinedRow = (ResponseRow, BloodRequestRow, String, String);

fn joined_to_record(
    (response, request, first_name, last_name): JoinedRow,
) -> Result<ResponseRecord, ResponseRepositoryError> {
    let response = row_to_response(response)?;
    let request = request
        .into_domain()
        .map_err(ResponseRepositoryError::query)?;
    let donor_name = format!("{first_name} {last_name}").trim().to_owned();
    Ok(ResponseRecord {
        response,
        request,
        donor_name,
    })
}

/// Responses joined with their request and donor, narrowed by a
/// [`ResponseFilter`]. The join type is unnameable, so this stays a macro.
macro_rules! filtered_responses {
    ($filter:expr) => {{
        let filter: &ResponseFilter = $filter;
        let mut query = blood_request_responses::table
            .inner_join(blood_requests::table)
            .inner_join(users::table.on(users::id.eq(blood_request_responses::donor_id)))
            .into_boxed::<Pg>();
        if let Some(donor) = &filter.donor {
            query = query.filter(blood_request_responses::donor_id.eq(*donor.as_uuid()));
        }
        if let Some(request_id) = &filter.request_id {
            query = query.filter(blood_request_responses::request_id.eq(*request_id.as_uuid()));
        }
        if let Some(group) = filter.blood_group {
            query = query.filter(blood_requests::blood_group_needed.eq(group.as_str()));
        }
        if let Some(urgency) = filter.urgency {
            query = query.filter(blood_requests::urgency.eq(urgency.as_str()));
        }
        if let Some(outcome) = filter.outcome {
            query = query.filter(blood_request_responses::outcome.eq(outcome.as_str()));
        }
        if let Some(needle) = filter.search_needle() {
            let pattern = contains_pattern(&needle);
            query = query.filter(
                users::first_name
                    .concat(" ")
                    .concat(users::last_name)
                    .ilike(pattern.clone())
                    .or(blood_requests::patient_name.ilike(pattern.clone()))
                    .or(blood_requests::hospital_name.ilike(pattern)),
            );
        }
        query
    }};
}

#[async_trait]
impl ResponseRepository for DieselResponseRepository {
    async fn insert(&self, response: &DonationResponse) -> Result<(), ResponseRepositoryError> {
        let row = ResponseRow::from(response);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(blood_request_responses::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| map_insert_error(err, response))?;
        Ok(())
    }

    async fn find(
        &self,
        id: &ResponseId,
    ) -> Result<Option<DonationResponse>, ResponseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ResponseRow> = blood_request_responses::table
            .find(id.as_uuid())
            .select(ResponseRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_response).transpose()
    }

    async fn find_for_donor(
        &self,
        request_id: &BloodRequestId,
        donor: &UserId,
    ) -> Result<Option<DonationResponse>, ResponseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ResponseRow> = blood_request_responses::table
            .filter(blood_request_responses::request_id.eq(request_id.as_uuid()))
            .filter(blood_request_responses::donor_id.eq(donor.as_uuid()))
            .select(ResponseRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_response).transpose()
    }

    async fn list(
        &self,
        filter: &ResponseFilter,
        page: PageRequest,
    ) -> Result<Page<ResponseRecord>, ResponseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = filtered_responses!(filter)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let (limit, offset) = limit_offset(page);
        let rows: Vec<JoinedRow> = filtered_responses!(filter)
            .select((
                ResponseRow::as_select(),
                BloodRequestRow::as_select(),
                users::first_name,
                users::last_name,
            ))
            .order_by((
                blood_request_responses::responded_at.desc(),
                blood_request_responses::id.asc(),
            ))
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let records = rows
            .into_iter()
            .map(joined_to_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(records, page, count_to_u64(total)))
    }

    async fn count(&self, filter: &ResponseFilter) -> Result<u64, ResponseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = filtered_responses!(filter)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(count_to_u64(total))
    }

    async fn record_donation(
        &self,
        completion: &DonationCompletion,
    ) -> Result<RequestStatus, ResponseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let status: String = conn
            .transaction(|conn| {
                async move {
                    let now = completion.completed_at;
                    let target = blood_request_responses::table
                        .find(completion.response_id.as_uuid())
                        .filter(
                            blood_request_responses::request_id
                                .eq(completion.request_id.as_uuid()),
                        );
                    let updated = diesel::update(
                        target.clone().filter(
                            blood_request_responses::outcome
                                .eq(ResponseOutcome::Accepted.as_str()),
                        ),
                    )
                    .set((
                        blood_request_responses::outcome.eq(ResponseOutcome::Completed.as_str()),
                        blood_request_responses::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .await?;
                    if updated == 0 {
                        let exists: bool = diesel::select(diesel::dsl::exists(target))
                            .get_result(conn)
                            .await?;
                        return Err(if exists {
                            CompletionFailure::NotAccepted
                        } else {
                            CompletionFailure::Diesel(diesel::result::Error::NotFound)
                        });
                    }

                    diesel::update(users::table.find(completion.donor.as_uuid()))
                        .set((
                            users::last_donation_date.eq(Some(completion.donated_on)),
                            users::updated_at.eq(now),
                        ))
                        .execute(conn)
                        .await?;
                    diesel::update(user_profiles::table.find(completion.donor.as_uuid()))
                        .set((
                            user_profiles::total_donations.eq(user_profiles::total_donations + 1),
                            user_profiles::updated_at.eq(now),
                        ))
                        .execute(conn)
                        .await?;
                    diesel::update(user_profiles::table.find(completion.requester.as_uuid()))
                        .set((
                            user_profiles::total_requests_fulfilled
                                .eq(user_profiles::total_requests_fulfilled + 1),
                            user_profiles::updated_at.eq(now),
                        ))
                        .execute(conn)
                        .await?;

                    let completed: i64 = blood_request_responses::table
                        .filter(
                            blood_request_responses::request_id
                                .eq(completion.request_id.as_uuid()),
                        )
                        .filter(
                            blood_request_responses::outcome
                                .eq(ResponseOutcome::Completed.as_str()),
                        )
                        .count()
                        .get_result(conn)
                        .await?;
                    if completion.fulfils(count_to_u64(completed)) {
                        diesel::update(blood_requests::table.find(completion.request_id.as_uuid()))
                            .set((
                                blood_requests::status.eq(RequestStatus::Fulfilled.as_str()),
                                blood_requests::updated_at.eq(now),
                            ))
                            .execute(conn)
                            .await?;
                    }

                    Ok::<_, CompletionFailure>(
                        blood_requests::table
                            .find(completion.request_id.as_uuid())
                            .select(blood_requests::status)
                            .first::<String>(conn)
                            .await?,
                    )
                }
                .scope_boxed()
            })
            .await
            .map_err(|failure| map_completion_failure(failure, completion))?;
        status
            .parse::<RequestStatus>()
            .map_err(ResponseRepositoryError::query)
    }
}

/// Why recording a donation rolled back.
#[derive(Debug)]
enum CompletionFailure {
    Diesel(diesel::result::Error),
    /// The response exists but another completion got there first.
    NotAccepted,
}

impl From<diesel::result::Error> for CompletionFailure {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

fn map_completion_failure(
    failure: CompletionFailure,
    completion: &DonationCompletion,
) -> ResponseRepositoryError {
    match failure {
        CompletionFailure::Diesel(error) => map_diesel_error(error),
        CompletionFailure::NotAccepted => {
            ResponseRepositoryError::not_accepted(completion.response_id.to_string())
        }
    }
}

/// Map an insert failure, naming the response that collided.
fn map_insert_error(
    error: diesel::result::Error,
    response: &DonationResponse,
) -> ResponseRepositoryError {
    match classify(error) {
        DieselFailure::UniqueViolation(_) => ResponseRepositoryError::duplicate_response(
            response.request_id.to_string(),
            response.donor.to_string(),
        ),
        DieselFailure::ForeignKeyViolation | DieselFailure::NotFound => {
            ResponseRepositoryError::missing("blood request not found")
        }
        DieselFailure::Connection(message) => ResponseRepositoryError::connection(message),
        DieselFailure::Query(message) => ResponseRepositoryError::query(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BloodGroup, Urgency};
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    fn database_error(kind: DatabaseErrorKind) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(String::from("constraint failed")))
    }

    fn response() -> DonationResponse {
        DonationResponse {
            id: ResponseId::random(),
            request_id: BloodRequestId::random(),
            donor: UserId::random(),
            outcome: ResponseOutcome::Accepted,
            message: String::new(),
            donor_phone: "9800000000".into(),
            preferred_contact_time: String::new(),
            responded_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[rstest]
    fn unique_violation_is_a_duplicate_response() {
        let err = map_insert_error(
            database_error(DatabaseErrorKind::UniqueViolation),
            &response(),
        );
        assert!(matches!(
            err,
            ResponseRepositoryError::DuplicateResponse { .. }
        ));
    }

    #[rstest]
    fn foreign_key_violation_is_missing_request() {
        let err = map_insert_error(
            database_error(DatabaseErrorKind::ForeignKeyViolation),
            &response(),
        );
        assert!(matches!(
            err,
            ResponseRepositoryError::Missing { .. }
        ));
    }

    #[rstest]
    fn missing_row_in_transaction_maps_to_missing() {
        assert!(matches!(
            map_diesel_error(DieselError::NotFound),
            ResponseRepositoryError::Missing { .. }
        ));
    }

    fn completion() -> DonationCompletion {
        DonationCompletion {
            response_id: ResponseId::random(),
            request_id: BloodRequestId::random(),
            donor: UserId::random(),
            requester: UserId::random(),
            units_needed: 1,
            donated_on: chrono::Utc::now().date_naive(),
            completed_at: chrono::Utc::now(),
        }
    }

    #[rstest]
    fn completion_of_settled_response_is_not_accepted() {
        let completion = completion();
        let err = map_completion_failure(CompletionFailure::NotAccepted, &completion);
        assert_eq!(
            err,
            ResponseRepositoryError::not_accepted(completion.response_id.to_string())
        );
    }

    #[rstest]
    fn completion_of_vanished_response_is_missing() {
        let err = map_completion_failure(
            CompletionFailure::Diesel(DieselError::NotFound),
            &completion(),
        );
        assert!(matches!(err, ResponseRepositoryError::Missing { .. }));
    }

    #[rstest]
    fn completion_only_updates_accepted_responses() {
        let id = ResponseId::random();
        let query = diesel::update(
            blood_request_responses::table.find(id.as_uuid()).filter(
                blood_request_responses::outcome.eq(ResponseOutcome::Accepted.as_str()),
            ),
        )
        .set(blood_request_responses::outcome.eq(ResponseOutcome::Completed.as_str()));
        let sql = diesel::debug_query::<Pg, _>(&query).to_string();
        let (_, predicate) = sql.split_once("WHERE").expect("filtered update");
        assert!(
            predicate.contains("\"blood_request_responses\".\"outcome\" = $"),
            "{sql}"
        );
        assert!(sql.contains("\"ACCEPTED\""), "{sql}");
    }

    #[rstest]
    fn listing_query_joins_donor_and_searches_names() {
        let filter = ResponseFilter {
            blood_group: Some(BloodGroup::OPositive),
            urgency: Some(Urgency::Critical),
            search: Some("Gita".into()),
            ..ResponseFilter::default()
        };
        let query = filtered_responses!(&filter);
        let sql = diesel::debug_query::<Pg, _>(&query).to_string();
        assert!(sql.contains("INNER JOIN \"users\" ON"), "{sql}");
        assert!(sql.contains("\"users\".\"first_name\" || $"), "{sql}");
        assert!(sql.contains("%gita%"), "{sql}");
    }
}

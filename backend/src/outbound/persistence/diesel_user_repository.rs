//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! Users and their profiles live in separate tables; account creation writes
//! both rows inside one transaction. Password hashes are read only by
//! [`UserRepository::find_credentials`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::eligibility::DonorFilter;
use crate::domain::ports::{StoredCredentials, UserRepository, UserRepositoryError};
use crate::domain::{
    Page, PageRequest, ProfileUpdate, User, UserId, UserProfile, VerificationToken,
};

use super::error_mapping::{
    DieselFailure, classify, contains_pattern, count_to_u64, limit_offset, pool_message,
};
use super::models::{NewUserRow, UserDetailsUpdate, UserProfileRow, UserRow, UserUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::{user_profiles, users};

/// Diesel-backed implementation of the [`UserRepository`] port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserRepositoryError {
    UserRepositoryError::connection(pool_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> UserRepositoryError {
    match classify(error) {
        DieselFailure::Connection(message) => UserRepositoryError::connection(message),
        DieselFailure::UniqueViolation(_) => UserRepositoryError::duplicate_email("email"),
        DieselFailure::NotFound => UserRepositoryError::query("user not found"),
        DieselFailure::ForeignKeyViolation => {
            UserRepositoryError::query("foreign key violation")
        }
        DieselFailure::Query(message) => UserRepositoryError::query(message),
    }
}

fn row_to_user(row: UserRow) -> Result<User, UserRepositoryError> {
    row.into_domain().map_err(UserRepositoryError::query)
}

/// Verified, available donors narrowed by `filter`.
fn donor_query(filter: &DonorFilter) -> users::BoxedQuery<'static, Pg> {
    let mut query = users::table
        .filter(users::is_donor.eq(true))
        .filter(users::is_available_for_donation.eq(true))
        .filter(users::is_email_verified.eq(true))
        .into_boxed();
    if let Some(group) = filter.blood_group {
        query = query.filter(users::blood_group.eq(group.as_str()));
    }
    if let Some(excluded) = &filter.exclude {
        query = query.filter(users::id.ne(*excluded.as_uuid()));
    }
    if let Some(needle) = filter.location_needle() {
        query = query.filter(users::address.ilike(contains_pattern(&needle)));
    }
    query
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create(
        &self,
        user: &User,
        profile: &UserProfile,
        password_hash: &str,
    ) -> Result<(), UserRepositoryError> {
        let new_user = NewUserRow::new(user, password_hash);
        let profile_row =
            UserProfileRow::from_domain(profile).map_err(UserRepositoryError::query)?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                diesel::insert_into(users::table)
                    .values(&new_user)
                    .execute(conn)
                    .await?;
                diesel::insert_into(user_profiles::table)
                    .values(&profile_row)
                    .execute(conn)
                    .await?;
                Ok::<_, diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| match map_diesel_error(err) {
            UserRepositoryError::DuplicateEmail { .. } => {
                UserRepositoryError::duplicate_email(user.email.as_ref())
            }
            other => other,
        })
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .find(id.as_uuid())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_user).transpose()
    }

    async fn find_by_verification_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::verification_token.eq(token.as_uuid()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_user).transpose()
    }

    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, UserRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;
        let row: Option<(UserRow, String)> = users::table
            .filter(users::email.eq(email))
            .select((UserRow::as_select(), users::password_hash))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|(user, password_hash)| {
            Ok(StoredCredentials {
                user: row_to_user(user)?,
                password_hash,
            })
        })
        .transpose()
    }

    async fn email_exists(&self, email: &str) -> Result<bool, UserRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;
        diesel::select(diesel::dsl::exists(
            users::table.filter(users::email.eq(email)),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn update(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;
        let updated = diesel::update(users::table.find(user.id.as_uuid()))
            .set(&UserUpdate::from(user))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(UserRepositoryError::query("user not found"));
        }
        Ok(())
    }

    async fn update_details(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<(), UserRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;
        let updated = diesel::update(users::table.find(id.as_uuid()))
            .set(&UserDetailsUpdate::from(update))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(UserRepositoryError::query("user not found"));
        }
        Ok(())
    }

    async fn set_availability(
        &self,
        id: &UserId,
        available: bool,
        at: DateTime<Utc>,
    ) -> Result<(), UserRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;
        let updated = diesel::update(users::table.find(id.as_uuid()))
            .set((
                users::is_available_for_donation.eq(available),
                users::updated_at.eq(at),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(UserRepositoryError::query("user not found"));
        }
        Ok(())
    }

    async fn find_profile(
        &self,
        id: &UserId,
    ) -> Result<Option<UserProfile>, UserRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;
        let row: Option<UserProfileRow> = user_profiles::table
            .find(id.as_uuid())
            .select(UserProfileRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|row| row.into_domain().map_err(UserRepositoryError::query))
            .transpose()
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<(), UserRepositoryError> {
        let row = UserProfileRow::from_domain(profile).map_err(UserRepositoryError::query)?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;
        // Upsert so users created before profiles existed still get a row.
        diesel::insert_into(user_profiles::table)
            .values(&row)
            .on_conflict(user_profiles::user_id)
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn search_donors(
        &self,
        filter: &DonorFilter,
        page: PageRequest,
    ) -> Result<Page<User>, UserRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;
        let total: i64 = donor_query(filter)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let (limit, offset) = limit_offset(page);
        let rows: Vec<UserRow> = donor_query(filter)
            .select(UserRow::as_select())
            .order_by((users::first_name.asc(), users::last_name.asc(), users::id.asc()))
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let users = rows
            .into_iter()
            .map(row_to_user)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(users, page, count_to_u64(total)))
    }

    async fn count_verified(&self) -> Result<u64, UserRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)?;
        let total: i64 = users::table
            .filter(users::is_email_verified.eq(true))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(count_to_u64(total))
    }
}

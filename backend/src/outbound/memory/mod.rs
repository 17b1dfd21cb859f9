//! Process-local store implementing every repository port.
//!
//! Used when no database URL is configured and by the integration tests.
//! All state lives behind one [`RwLock`], so multi-row operations such as
//! [`ResponseRepository::record_donation`] are applied atomically. Cloning
//! the store shares the same tables.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::eligibility::DonorFilter;
use crate::domain::ports::{
    BloodRequestRepository, BloodRequestRepositoryError, DonationCompletion, RequestFilter,
    ResponseFilter, ResponseRecord, ResponseRepository, ResponseRepositoryError,
    StoredCredentials, UserRepository, UserRepositoryError,
};
use crate::domain::{
    BloodRequest, BloodRequestId, DonationResponse, Page, PageRequest, ProfileUpdate,
    RequestStatus, ResponseId, ResponseOutcome, User, UserId, UserProfile, VerificationToken,
};

const POISONED: &str = "in-memory store lock poisoned";

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, StoredCredentials>,
    profiles: HashMap<UserId, UserProfile>,
    requests: HashMap<BloodRequestId, BloodRequest>,
    responses: HashMap<ResponseId, DonationResponse>,
}

impl Tables {
    fn record(&self, response: &DonationResponse) -> Option<ResponseRecord> {
        let request = self.requests.get(&response.request_id)?;
        let donor_name = self
            .users
            .get(&response.donor)
            .map(|stored| stored.user.full_name())
            .unwrap_or_default();
        Some(ResponseRecord {
            response: response.clone(),
            request: request.clone(),
            donor_name,
        })
    }

    fn matching_records(&self, filter: &ResponseFilter) -> Vec<ResponseRecord> {
        let mut records: Vec<ResponseRecord> = self
            .responses
            .values()
            .filter_map(|response| self.record(response))
            .filter(|record| filter.matches(record))
            .collect();
        records.sort_by(|a, b| b.response.responded_at.cmp(&a.response.responded_at));
        records
    }
}

/// Shared in-memory tables for users, profiles, requests and responses.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read<E>(
        &self,
        poisoned: impl FnOnce(&'static str) -> E,
    ) -> Result<RwLockReadGuard<'_, Tables>, E> {
        self.tables.read().map_err(|_| poisoned(POISONED))
    }

    fn write<E>(
        &self,
        poisoned: impl FnOnce(&'static str) -> E,
    ) -> Result<RwLockWriteGuard<'_, Tables>, E> {
        self.tables.write().map_err(|_| poisoned(POISONED))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(
        &self,
        user: &User,
        profile: &UserProfile,
        password_hash: &str,
    ) -> Result<(), UserRepositoryError> {
        let mut tables = self.write(UserRepositoryError::query)?;
        if tables
            .users
            .values()
            .any(|stored| stored.user.email == user.email)
        {
            return Err(UserRepositoryError::duplicate_email(user.email.as_ref()));
        }
        tables.users.insert(
            user.id.clone(),
            StoredCredentials {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
            },
        );
        tables.profiles.insert(user.id.clone(), profile.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let tables = self.read(UserRepositoryError::query)?;
        Ok(tables.users.get(id).map(|stored| stored.user.clone()))
    }

    async fn find_by_verification_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<User>, UserRepositoryError> {
        let tables = self.read(UserRepositoryError::query)?;
        Ok(tables
            .users
            .values()
            .find(|stored| stored.user.verification_token.as_ref() == Some(token))
            .map(|stored| stored.user.clone()))
    }

    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, UserRepositoryError> {
        let tables = self.read(UserRepositoryError::query)?;
        Ok(tables
            .users
            .values()
            .find(|stored| stored.user.email.as_ref() == email)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, UserRepositoryError> {
        let tables = self.read(UserRepositoryError::query)?;
        Ok(tables
            .users
            .values()
            .any(|stored| stored.user.email.as_ref() == email))
    }

    async fn update(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut tables = self.write(UserRepositoryError::query)?;
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| UserRepositoryError::query("user not found"))?;
        stored.user = user.clone();
        Ok(())
    }

    async fn update_details(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<(), UserRepositoryError> {
        let mut tables = self.write(UserRepositoryError::query)?;
        let stored = tables
            .users
            .get_mut(id)
            .ok_or_else(|| UserRepositoryError::query("user not found"))?;
        update.apply_to(&mut stored.user);
        Ok(())
    }

    async fn set_availability(
        &self,
        id: &UserId,
        available: bool,
        at: DateTime<Utc>,
    ) -> Result<(), UserRepositoryError> {
        let mut tables = self.write(UserRepositoryError::query)?;
        let stored = tables
            .users
            .get_mut(id)
            .ok_or_else(|| UserRepositoryError::query("user not found"))?;
        stored.user.is_available_for_donation = available;
        stored.user.updated_at = at;
        Ok(())
    }

    async fn find_profile(
        &self,
        id: &UserId,
    ) -> Result<Option<UserProfile>, UserRepositoryError> {
        let tables = self.read(UserRepositoryError::query)?;
        Ok(tables.profiles.get(id).cloned())
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<(), UserRepositoryError> {
        let mut tables = self.write(UserRepositoryError::query)?;
        if !tables.users.contains_key(&profile.user_id) {
            return Err(UserRepositoryError::query("user not found"));
        }
        tables
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn search_donors(
        &self,
        filter: &DonorFilter,
        page: PageRequest,
    ) -> Result<Page<User>, UserRepositoryError> {
        let tables = self.read(UserRepositoryError::query)?;
        let mut donors: Vec<User> = tables
            .users
            .values()
            .map(|stored| &stored.user)
            .filter(|user| filter.matches(user))
            .cloned()
            .collect();
        donors.sort_by(|a, b| {
            (&a.first_name, &a.last_name).cmp(&(&b.first_name, &b.last_name))
        });
        Ok(page.slice(donors))
    }

    async fn count_verified(&self) -> Result<u64, UserRepositoryError> {
        let tables = self.read(UserRepositoryError::query)?;
        Ok(tables
            .users
            .values()
            .filter(|stored| stored.user.is_email_verified)
            .count() as u64)
    }
}

#[async_trait]
impl BloodRequestRepository for InMemoryStore {
    async fn insert(&self, request: &BloodRequest) -> Result<(), BloodRequestRepositoryError> {
        let mut tables = self.write(BloodRequestRepositoryError::query)?;
        tables.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn find(
        &self,
        id: &BloodRequestId,
    ) -> Result<Option<BloodRequest>, BloodRequestRepositoryError> {
        let tables = self.read(BloodRequestRepositoryError::query)?;
        Ok(tables.requests.get(id).cloned())
    }

    async fn update(&self, request: &BloodRequest) -> Result<(), BloodRequestRepositoryError> {
        let mut tables = self.write(BloodRequestRepositoryError::query)?;
        let stored = tables
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| BloodRequestRepositoryError::query("blood request not found"))?;
        *stored = request.clone();
        Ok(())
    }

    async fn delete(&self, id: &BloodRequestId) -> Result<bool, BloodRequestRepositoryError> {
        let mut tables = self.write(BloodRequestRepositoryError::query)?;
        if tables.requests.remove(id).is_none() {
            return Ok(false);
        }
        tables.responses.retain(|_, response| &response.request_id != id);
        Ok(true)
    }

    async fn list(
        &self,
        filter: &RequestFilter,
        page: PageRequest,
    ) -> Result<Page<BloodRequest>, BloodRequestRepositoryError> {
        let tables = self.read(BloodRequestRepositoryError::query)?;
        let mut requests: Vec<BloodRequest> = tables
            .requests
            .values()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.slice(requests))
    }

    async fn count(&self, filter: &RequestFilter) -> Result<u64, BloodRequestRepositoryError> {
        let tables = self.read(BloodRequestRepositoryError::query)?;
        Ok(tables
            .requests
            .values()
            .filter(|request| filter.matches(request))
            .count() as u64)
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, BloodRequestRepositoryError> {
        let mut tables = self.write(BloodRequestRepositoryError::query)?;
        let mut expired = 0;
        for request in tables.requests.values_mut() {
            if request.status == RequestStatus::Active && request.needed_by < now {
                request.status = RequestStatus::Expired;
                request.updated_at = now;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl ResponseRepository for InMemoryStore {
    async fn insert(&self, response: &DonationResponse) -> Result<(), ResponseRepositoryError> {
        let mut tables = self.write(ResponseRepositoryError::query)?;
        if !tables.requests.contains_key(&response.request_id) {
            return Err(ResponseRepositoryError::missing("blood request not found"));
        }
        let duplicate = tables.responses.values().any(|existing| {
            existing.request_id == response.request_id && existing.donor == response.donor
        });
        if duplicate {
            return Err(ResponseRepositoryError::duplicate_response(
                response.request_id.to_string(),
                response.donor.to_string(),
            ));
        }
        tables.responses.insert(response.id, response.clone());
        Ok(())
    }

    async fn find(
        &self,
        id: &ResponseId,
    ) -> Result<Option<DonationResponse>, ResponseRepositoryError> {
        let tables = self.read(ResponseRepositoryError::query)?;
        Ok(tables.responses.get(id).cloned())
    }

    async fn find_for_donor(
        &self,
        request_id: &BloodRequestId,
        donor: &UserId,
    ) -> Result<Option<DonationResponse>, ResponseRepositoryError> {
        let tables = self.read(ResponseRepositoryError::query)?;
        Ok(tables
            .responses
            .values()
            .find(|response| &response.request_id == request_id && &response.donor == donor)
            .cloned())
    }

    async fn list(
        &self,
        filter: &ResponseFilter,
        page: PageRequest,
    ) -> Result<Page<ResponseRecord>, ResponseRepositoryError> {
        let tables = self.read(ResponseRepositoryError::query)?;
        Ok(page.slice(tables.matching_records(filter)))
    }

    async fn count(&self, filter: &ResponseFilter) -> Result<u64, ResponseRepositoryError> {
        let tables = self.read(ResponseRepositoryError::query)?;
        Ok(tables.matching_records(filter).len() as u64)
    }

    async fn record_donation(
        &self,
        completion: &DonationCompletion,
    ) -> Result<RequestStatus, ResponseRepositoryError> {
        let mut tables = self.write(ResponseRepositoryError::query)?;
        let Tables {
            users,
            profiles,
            requests,
            responses,
        } = &mut *tables;

        let request = requests
            .get_mut(&completion.request_id)
            .ok_or_else(|| ResponseRepositoryError::missing("blood request not found"))?;
        let response = responses
            .get_mut(&completion.response_id)
            .ok_or_else(|| ResponseRepositoryError::missing("response not found"))?;
        if response.outcome != ResponseOutcome::Accepted {
            return Err(ResponseRepositoryError::not_accepted(
                completion.response_id.to_string(),
            ));
        }
        let donor = users
            .get_mut(&completion.donor)
            .ok_or_else(|| ResponseRepositoryError::missing("donor not found"))?;

        response.outcome = ResponseOutcome::Completed;
        response.updated_at = completion.completed_at;
        donor.user.last_donation_date = Some(completion.donated_on);
        donor.user.updated_at = completion.completed_at;

        if let Some(profile) = profiles.get_mut(&completion.donor) {
            profile.total_donations += 1;
            profile.updated_at = completion.completed_at;
        }
        if let Some(profile) = profiles.get_mut(&completion.requester) {
            profile.total_requests_fulfilled += 1;
            profile.updated_at = completion.completed_at;
        }

        let completed = responses
            .values()
            .filter(|response| {
                response.request_id == completion.request_id
                    && response.outcome == ResponseOutcome::Completed
            })
            .count() as u64;
        if completion.fulfils(completed) {
            request.status = RequestStatus::Fulfilled;
            request.updated_at = completion.completed_at;
        }
        Ok(request.status)
    }
}

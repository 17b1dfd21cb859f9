//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate
//! with `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered accounts with donor attributes and the password hash.
    users (id) {
        id -> Uuid,
        /// Lower-cased, unique login identifier.
        email -> Varchar,
        /// Argon2id PHC string.
        password_hash -> Text,
        first_name -> Varchar,
        last_name -> Varchar,
        phone_number -> Varchar,
        date_of_birth -> Nullable<Date>,
        /// `M`, `F` or `O`.
        gender -> Nullable<Varchar>,
        address -> Text,
        /// Conventional notation, e.g. `AB-`.
        blood_group -> Nullable<Varchar>,
        weight_kg -> Nullable<Float8>,
        last_donation_date -> Nullable<Date>,
        medical_conditions -> Text,
        is_donor -> Bool,
        is_recipient -> Bool,
        is_available_for_donation -> Bool,
        is_active -> Bool,
        is_email_verified -> Bool,
        verification_token -> Nullable<Uuid>,
        verification_sent_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// One settings row per user, created in the same transaction.
    user_profiles (user_id) {
        user_id -> Uuid,
        emergency_contact_name -> Varchar,
        emergency_contact_phone -> Varchar,
        emergency_contact_relation -> Varchar,
        total_donations -> Int4,
        total_requests_fulfilled -> Int4,
        email_notifications -> Bool,
        sms_notifications -> Bool,
        privacy_level -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Requests for units of one blood group.
    blood_requests (id) {
        id -> Uuid,
        requester_id -> Uuid,
        patient_name -> Varchar,
        blood_group_needed -> Varchar,
        units_needed -> Int4,
        hospital_name -> Varchar,
        hospital_address -> Text,
        urgency -> Varchar,
        needed_by -> Timestamptz,
        description -> Text,
        contact_phone -> Varchar,
        status -> Varchar,
        is_public -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Donor replies; unique per (request_id, donor_id).
    blood_request_responses (id) {
        id -> Uuid,
        request_id -> Uuid,
        donor_id -> Uuid,
        outcome -> Varchar,
        message -> Text,
        donor_phone -> Varchar,
        preferred_contact_time -> Varchar,
        responded_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(user_profiles -> users (user_id));
diesel::joinable!(blood_requests -> users (requester_id));
diesel::joinable!(blood_request_responses -> blood_requests (request_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    user_profiles,
    blood_requests,
    blood_request_responses,
);

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User onboarding, login and profile endpoints.
//!
//! Onboarding runs in order: phone OTP, profile and email, BVN, tag,
//! passcode. Each step raises `signup_level`. Login is passcode then OTP, and
//! binds the session to a single device.

use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::{extract::ApiJson, load_caller};
use crate::{
    auth::{
        codes::{code_digest, email_code_ttl, generate_code, verify_code},
        passcode::{hash_passcode, is_valid_passcode, verify_passcode},
        Auth, AuthError,
    },
    error::{ApiError, ApiResponse, ApiResult},
    models::UserProfile,
    state::AppState,
    storage::{
        signup_level, AccountOwner, AccountRepository, AuditEvent, AuditEventType, AuditRepository,
        KycStatus, LedgerRead, OtpChallengeRepository, OtpPurpose, StoredOtpChallenge, StoredUser,
        StoredVerificationCode, UnitOfWork, UserRepository, VerificationRepository,
    },
};

const BVN_LENGTH: usize = 11;
const SEARCH_LIMIT: usize = 20;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendPhoneOtpRequest {
    /// E.164-style phone number, e.g. `+2348012345678`
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyPhoneOtpRequest {
    pub phone_number: String,
    /// Returned by send-phone-otp or login-request
    pub pin_id: String,
    pub pin: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddUserRequest {
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyBvnRequest {
    pub email: String,
    /// 11-digit Bank Verification Number
    pub bvn: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddTagRequest {
    pub email: String,
    /// 3-20 characters of `a-z`, `0-9` and `_`
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddPasscodeRequest {
    pub email: String,
    pub passcode: String,
    pub confirm_passcode: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub phone_number: String,
    pub passcode: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyLoginRequest {
    pub phone_number: String,
    pub pin_id: String,
    pub pin: String,
    /// Identifier of the device the session is bound to
    pub device_id: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Substring of the tag to look for
    pub q: String,
}

/// A phone OTP was sent.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PinIssued {
    /// Pass back with the PIN to verify it
    pub pin_id: String,
}

/// A session token bound to one device.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagMatch {
    pub tag: String,
    pub name: String,
}

// =============================================================================
// Input Validation
// =============================================================================

/// Trim a phone number and check it is an optional `+` then 10-15 digits.
pub(crate) fn normalize_phone(phone_number: &str) -> Result<String, ApiError> {
    let phone = phone_number.trim();
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if !(10..=15).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::bad_request("Invalid phone number"));
    }
    Ok(phone.to_string())
}

pub(crate) fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.contains('@') && domain.contains('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(email)
}

pub(crate) fn require_name(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > 64 {
        return Err(ApiError::bad_request(format!("{field} must be 1-64 characters")));
    }
    Ok(value.to_string())
}

/// Remember which phone and flow a freshly sent pin belongs to.
async fn record_challenge(
    state: &AppState,
    pin_id: &str,
    phone_number: &str,
    purpose: OtpPurpose,
) -> Result<(), ApiError> {
    let (pin_id, phone_number) = (pin_id.to_string(), phone_number.to_string());
    state
        .ledger
        .write(&state.scope(), move |uow| -> Result<(), ApiError> {
            let challenge = StoredOtpChallenge::issue(pin_id, phone_number, purpose, uow.now());
            OtpChallengeRepository::new(uow).save(&challenge)?;
            Ok(())
        })
        .await
}

/// The pin id must have been issued to this phone for this flow and not expired.
fn check_challenge<R: LedgerRead>(
    tx: &R,
    pin_id: &str,
    phone_number: &str,
    purpose: OtpPurpose,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    match OtpChallengeRepository::new(tx).find(pin_id)? {
        Some(challenge) if challenge.admits(phone_number, purpose, now) => Ok(()),
        _ => Err(ApiError::bad_request("Invalid or expired OTP")),
    }
}

/// Check and consume the challenge inside the unit of work that acts on it.
fn redeem_challenge(
    uow: &UnitOfWork<'_>,
    pin_id: &str,
    phone_number: &str,
    purpose: OtpPurpose,
) -> Result<(), ApiError> {
    check_challenge(uow, pin_id, phone_number, purpose, uow.now())?;
    OtpChallengeRepository::new(uow).consume(pin_id)?;
    Ok(())
}

fn user_by_email<R: crate::storage::LedgerRead>(tx: &R, email: &str) -> Result<StoredUser, ApiError> {
    UserRepository::new(tx)
        .find_by_email(email)?
        .ok_or_else(|| ApiError::not_found("No user with this email"))
}

fn user_by_phone<R: crate::storage::LedgerRead>(tx: &R, phone_number: &str) -> Result<StoredUser, ApiError> {
    UserRepository::new(tx)
        .find_by_phone(phone_number)?
        .ok_or_else(|| ApiError::not_found("No user with this phone number"))
}

// =============================================================================
// Onboarding
// =============================================================================

/// Send a verification OTP to a phone number that is not yet registered.
#[utoipa::path(
    post,
    path = "/v1/user/send-phone-otp",
    tag = "Users",
    request_body = SendPhoneOtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = PinIssued),
        (status = 400, description = "Invalid phone number", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Phone number already registered", body = crate::error::ErrorEnvelope),
        (status = 502, description = "SMS provider failure", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn send_phone_otp(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SendPhoneOtpRequest>,
) -> ApiResult<PinIssued> {
    let phone_number = normalize_phone(&body.phone_number)?;

    let snapshot = state.ledger.snapshot()?;
    if UserRepository::new(&snapshot).find_by_phone(&phone_number)?.is_some() {
        return Err(ApiError::conflict("Phone number is already registered"));
    }
    drop(snapshot);

    let pin_id = state.providers.sms.send_otp(&phone_number).await?;
    record_challenge(&state, &pin_id, &phone_number, OtpPurpose::Signup).await?;
    Ok(ApiResponse::ok("OTP sent", PinIssued { pin_id }))
}

/// Verify the phone OTP and register the user.
#[utoipa::path(
    post,
    path = "/v1/user/verify-phone-otp",
    tag = "Users",
    request_body = VerifyPhoneOtpRequest,
    responses(
        (status = 200, description = "Phone verified, user created", body = UserProfile),
        (status = 400, description = "Invalid or expired OTP", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Phone number already registered", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn verify_phone_otp(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyPhoneOtpRequest>,
) -> ApiResult<UserProfile> {
    let phone_number = normalize_phone(&body.phone_number)?;
    let pin_id = body.pin_id;
    check_challenge(&state.ledger.snapshot()?, &pin_id, &phone_number, OtpPurpose::Signup, Utc::now())?;
    if !state.providers.sms.verify_otp(&pin_id, body.pin.trim()).await? {
        return Err(ApiError::bad_request("Invalid or expired OTP"));
    }

    let user = state
        .ledger
        .write(&state.scope(), move |uow| -> Result<StoredUser, ApiError> {
            redeem_challenge(uow, &pin_id, &phone_number, OtpPurpose::Signup)?;
            let user = StoredUser::with_verified_phone(phone_number, uow.now());
            UserRepository::new(uow).create(&user)?;
            AuditRepository::new(uow).log(
                AuditEvent::new(AuditEventType::UserRegistered)
                    .with_user(&user.user_id)
                    .with_resource("user", &user.user_id),
            )?;
            Ok(user)
        })
        .await?;

    info!(user_id = %user.user_id, "User registered");
    Ok(ApiResponse::ok("Phone number verified", UserProfile::new(&user, None)))
}

/// Add name and email, and send an email verification code.
#[utoipa::path(
    post,
    path = "/v1/user/add-user",
    tag = "Users",
    request_body = AddUserRequest,
    responses(
        (status = 200, description = "Profile saved, code sent", body = UserProfile),
        (status = 404, description = "Phone number not registered", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Email already in use", body = crate::error::ErrorEnvelope),
        (status = 502, description = "Email provider failure", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn add_user(State(state): State<AppState>, ApiJson(body): ApiJson<AddUserRequest>) -> ApiResult<UserProfile> {
    let phone_number = normalize_phone(&body.phone_number)?;
    let first_name = require_name("first_name", &body.first_name)?;
    let last_name = require_name("last_name", &body.last_name)?;
    let email = normalize_email(&body.email)?;

    let code = generate_code();
    let digest = code_digest(&state.config.jwt_secret, &email, &code)?;

    let user = state
        .ledger
        .write(&state.scope(), {
            let email = email.clone();
            move |uow| -> Result<StoredUser, ApiError> {
                let users = UserRepository::new(uow);
                let mut user = user_by_phone(uow, &phone_number)?;
                if let Some(owner) = users.find_by_email(&email)? {
                    if owner.user_id != user.user_id {
                        return Err(ApiError::conflict("Email is already in use"));
                    }
                }

                if user.email.as_deref() != Some(email.as_str()) {
                    user.email_verified = false;
                }
                user.first_name = Some(first_name);
                user.last_name = Some(last_name);
                user.email = Some(email.clone());
                user.signup_level = user.signup_level.max(signup_level::PROFILE_ADDED);
                users.save(&mut user)?;

                let now = uow.now();
                VerificationRepository::new(uow).save(&StoredVerificationCode {
                    email,
                    code_digest: digest,
                    expires_at: now + email_code_ttl(),
                    created_at: now,
                })?;
                AuditRepository::new(uow).log(
                    AuditEvent::new(AuditEventType::ProfileUpdated).with_resource("user", &user.user_id),
                )?;
                Ok(user)
            }
        })
        .await?;

    state.providers.email.send_verification_code(&email, &code).await?;

    info!(user_id = %user.user_id, "Profile added, email code sent");
    Ok(ApiResponse::ok(
        "Profile saved, a verification code has been sent to your email",
        UserProfile::new(&user, None),
    ))
}

/// Confirm the email verification code.
#[utoipa::path(
    post,
    path = "/v1/user/verify-email",
    tag = "Users",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = UserProfile),
        (status = 400, description = "Wrong or expired code", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown email", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Email already verified", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyEmailRequest>,
) -> ApiResult<UserProfile> {
    let email = normalize_email(&body.email)?;
    let code = body.code.trim().to_string();
    let secret = state.config.jwt_secret.clone();

    let user = state
        .ledger
        .write(&state.scope(), move |uow| -> Result<StoredUser, ApiError> {
            let mut user = user_by_email(uow, &email)?;
            if user.email_verified {
                return Err(ApiError::conflict("Email is already verified"));
            }

            let codes = VerificationRepository::new(uow);
            let stored = codes
                .find(&email)?
                .filter(|stored| !stored.is_expired(uow.now()))
                .ok_or_else(|| ApiError::bad_request("Invalid or expired verification code"))?;
            if !verify_code(&secret, &email, &code, &stored.code_digest) {
                return Err(ApiError::bad_request("Invalid or expired verification code"));
            }

            user.email_verified = true;
            UserRepository::new(uow).save(&mut user)?;
            codes.consume(&email)?;
            AuditRepository::new(uow).log(
                AuditEvent::new(AuditEventType::EmailVerified).with_resource("user", &user.user_id),
            )?;
            Ok(user)
        })
        .await?;

    Ok(ApiResponse::ok("Email verified", UserProfile::new(&user, None)))
}

/// Verify the user's BVN with the KYC provider.
#[utoipa::path(
    post,
    path = "/v1/user/verify-bvn",
    tag = "Users",
    request_body = VerifyBvnRequest,
    responses(
        (status = 200, description = "BVN verified", body = UserProfile),
        (status = 400, description = "Malformed or unverifiable BVN", body = crate::error::ErrorEnvelope),
        (status = 409, description = "BVN already verified", body = crate::error::ErrorEnvelope),
        (status = 502, description = "KYC provider failure", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn verify_bvn(State(state): State<AppState>, ApiJson(body): ApiJson<VerifyBvnRequest>) -> ApiResult<UserProfile> {
    let email = normalize_email(&body.email)?;
    let bvn = body.bvn.trim().to_string();
    if bvn.len() != BVN_LENGTH || !bvn.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::bad_request("BVN must be 11 digits"));
    }

    let snapshot = state.ledger.snapshot()?;
    let user = user_by_email(&snapshot, &email)?;
    drop(snapshot);
    if !user.email_verified {
        return Err(ApiError::bad_request("Verify your email before your BVN"));
    }
    if user.bvn_verified {
        return Err(ApiError::conflict("BVN is already verified"));
    }

    if !state.providers.kyc.verify_bvn(&bvn).await? {
        return Err(ApiError::bad_request("BVN could not be verified"));
    }

    let user_id = user.user_id;
    let user = state
        .ledger
        .write(&state.scope(), move |uow| -> Result<StoredUser, ApiError> {
            let users = UserRepository::new(uow);
            let mut user = users.get(&user_id)?;
            if user.bvn_verified {
                return Err(ApiError::conflict("BVN is already verified"));
            }
            user.bvn_verified = true;
            user.kyc_status = KycStatus::Verified;
            user.signup_level = user.signup_level.max(signup_level::BVN_VERIFIED);
            users.save(&mut user)?;
            AuditRepository::new(uow).log(
                AuditEvent::new(AuditEventType::BvnVerified).with_resource("user", &user.user_id),
            )?;
            Ok(user)
        })
        .await?;

    info!(user_id = %user.user_id, "BVN verified");
    Ok(ApiResponse::ok("BVN verified", UserProfile::new(&user, None)))
}

/// Choose a tag and open the user's account.
#[utoipa::path(
    post,
    path = "/v1/user/add-tag",
    tag = "Users",
    request_body = AddTagRequest,
    responses(
        (status = 200, description = "Tag assigned, account opened", body = UserProfile),
        (status = 400, description = "Invalid tag or KYC incomplete", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Tag already taken", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn add_tag(State(state): State<AppState>, ApiJson(body): ApiJson<AddTagRequest>) -> ApiResult<UserProfile> {
    let email = normalize_email(&body.email)?;
    let user_id = user_by_email(&state.ledger.snapshot()?, &email)?.user_id;

    let (user, account) = state.engine.assign_tag(&state.scope(), &user_id, &body.tag).await?;
    Ok(ApiResponse::ok("Tag added", UserProfile::new(&user, Some(&account))))
}

/// Set the six-digit login passcode.
#[utoipa::path(
    post,
    path = "/v1/user/add-passcode",
    tag = "Users",
    request_body = AddPasscodeRequest,
    responses(
        (status = 200, description = "Passcode set", body = UserProfile),
        (status = 400, description = "Invalid or mismatched passcode", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Passcode already set", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn add_passcode(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AddPasscodeRequest>,
) -> ApiResult<UserProfile> {
    let email = normalize_email(&body.email)?;
    if !is_valid_passcode(&body.passcode) {
        return Err(ApiError::bad_request("Passcode must be 6 digits"));
    }
    if body.passcode != body.confirm_passcode {
        return Err(ApiError::bad_request("Passcodes do not match"));
    }
    let passcode_hash = hash_passcode(&body.passcode)?;

    let user = state
        .ledger
        .write(&state.scope(), move |uow| -> Result<StoredUser, ApiError> {
            let mut user = user_by_email(uow, &email)?;
            if user.tag.is_none() {
                return Err(ApiError::bad_request("Choose a tag before setting a passcode"));
            }
            if user.passcode_hash.is_some() {
                return Err(ApiError::conflict("Passcode is already set"));
            }
            user.passcode_hash = Some(passcode_hash);
            user.signup_level = user.signup_level.max(signup_level::PASSCODE_SET);
            UserRepository::new(uow).save(&mut user)?;
            AuditRepository::new(uow).log(
                AuditEvent::new(AuditEventType::PasscodeSet).with_resource("user", &user.user_id),
            )?;
            Ok(user)
        })
        .await?;

    Ok(ApiResponse::ok("Passcode set", UserProfile::new(&user, None)))
}

// =============================================================================
// Login
// =============================================================================

/// Check the passcode and send a login OTP.
#[utoipa::path(
    post,
    path = "/v1/user/login-request",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "OTP sent", body = PinIssued),
        (status = 401, description = "Invalid phone number or passcode", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn login_request(State(state): State<AppState>, ApiJson(body): ApiJson<LoginRequest>) -> ApiResult<PinIssued> {
    let phone_number = normalize_phone(&body.phone_number)?;

    let user = UserRepository::new(&state.ledger.snapshot()?).find_by_phone(&phone_number)?;
    let stored_hash = user
        .and_then(|u| u.passcode_hash)
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_passcode(&body.passcode, &stored_hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let pin_id = state.providers.sms.send_otp(&phone_number).await?;
    record_challenge(&state, &pin_id, &phone_number, OtpPurpose::Login).await?;
    Ok(ApiResponse::ok("OTP sent", PinIssued { pin_id }))
}

/// Verify the login OTP, bind the device and issue a session token.
#[utoipa::path(
    post,
    path = "/v1/user/verify-login",
    tag = "Users",
    request_body = VerifyLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid or expired OTP", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Onboarding incomplete", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn verify_login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyLoginRequest>,
) -> ApiResult<LoginResponse> {
    let phone_number = normalize_phone(&body.phone_number)?;
    let device_id = body.device_id.trim().to_string();
    if device_id.is_empty() {
        return Err(ApiError::bad_request("device_id is required"));
    }
    let pin_id = body.pin_id;
    check_challenge(&state.ledger.snapshot()?, &pin_id, &phone_number, OtpPurpose::Login, Utc::now())?;
    if !state.providers.sms.verify_otp(&pin_id, body.pin.trim()).await? {
        return Err(ApiError::bad_request("Invalid or expired OTP"));
    }

    let (user, account) = state
        .ledger
        .write(&state.scope(), move |uow| -> Result<_, ApiError> {
            redeem_challenge(uow, &pin_id, &phone_number, OtpPurpose::Login)?;
            let mut user = UserRepository::new(uow)
                .find_by_phone(&phone_number)?
                .filter(|u| u.passcode_hash.is_some())
                .ok_or(AuthError::InvalidCredentials)?;
            let previous = user.device_id.replace(device_id.clone());
            UserRepository::new(uow).save(&mut user)?;
            AuditRepository::new(uow).log(
                AuditEvent::new(AuditEventType::DeviceBound)
                    .with_user(&user.user_id)
                    .with_resource("device", &device_id)
                    .with_details(json!({ "replaced": previous })),
            )?;
            let account = AccountRepository::new(uow).find_for_owner(&AccountOwner::User(user.user_id.clone()))?;
            Ok((user, account))
        })
        .await?;

    let device_id = user.device_id.as_deref().unwrap_or_default();
    let issued = state.tokens.issue(&user.user_id, device_id)?;

    info!(user_id = %user.user_id, "User logged in");
    Ok(ApiResponse::ok(
        "Login successful",
        LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user: UserProfile::new(&user, account.as_ref()),
        },
    ))
}

// =============================================================================
// Authenticated
// =============================================================================

/// Search users by tag.
#[utoipa::path(
    get,
    path = "/v1/user/search",
    tag = "Users",
    params(SearchQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Matching tags", body = Vec<TagMatch>),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn search_users(
    State(state): State<AppState>,
    Auth(auth): Auth,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<TagMatch>> {
    let needle = query.q.trim().to_lowercase();
    if needle.is_empty() {
        return Err(ApiError::bad_request("q must not be empty"));
    }

    let snapshot = state.ledger.snapshot()?;
    load_caller(&snapshot, &auth)?;

    let users = UserRepository::new(&snapshot);
    let mut matches = Vec::new();
    for (tag, user_id) in users.search_tags(&needle, SEARCH_LIMIT)? {
        if let Some(user) = users.find(&user_id)? {
            matches.push(TagMatch {
                tag,
                name: user.full_name(),
            });
        }
    }
    Ok(ApiResponse::ok("Search results", matches))
}

/// Get the caller's profile and account summary.
#[utoipa::path(
    get,
    path = "/v1/user/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn me(State(state): State<AppState>, Auth(auth): Auth) -> ApiResult<UserProfile> {
    let snapshot = state.ledger.snapshot()?;
    let user = load_caller(&snapshot, &auth)?;
    let account = AccountRepository::new(&snapshot).find_for_owner(&AccountOwner::User(user.user_id.clone()))?;
    Ok(ApiResponse::ok("User profile", UserProfile::new(&user, account.as_ref())))
}

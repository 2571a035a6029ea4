// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{AuthError, AuthenticatedUser},
    error::{ApiError, ErrorEnvelope},
    models::{
        AccountView, GroupMemberView, GroupView, TransactionPageView, TransactionView, TransferView, UserProfile,
    },
    notifications::NotificationWarning,
    state::AppState,
    storage::{LedgerRead, StoredUser, UserRepository},
};

pub mod accounts;
pub mod extract;
pub mod groups;
pub mod health;
pub mod payments;
pub mod transactions;
pub mod users;
pub mod web;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/user/send-phone-otp", post(users::send_phone_otp))
        .route("/user/verify-phone-otp", post(users::verify_phone_otp))
        .route("/user/add-user", post(users::add_user))
        .route("/user/verify-email", post(users::verify_email))
        .route("/user/verify-bvn", post(users::verify_bvn))
        .route("/user/add-tag", post(users::add_tag))
        .route("/user/add-passcode", post(users::add_passcode))
        .route("/user/login-request", post(users::login_request))
        .route("/user/verify-login", post(users::verify_login))
        .route("/user/search", get(users::search_users))
        .route("/user/me", get(users::me))
        .route("/account", get(accounts::get_account))
        .route("/payment/transfer", post(payments::transfer))
        .route("/payment/request-funds", post(payments::request_funds))
        .route("/payment/requests/{transaction_id}/pay", post(payments::pay_request))
        .route("/payment/requests/{transaction_id}/decline", post(payments::decline_request))
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/{transaction_id}", get(transactions::get_transaction))
        .route("/group/create-group", post(groups::create_group))
        .route("/group/group-transfer", post(groups::group_transfer))
        .route("/group/{tag}", get(groups::get_group))
        .route("/group/{tag}/payout", post(groups::group_payout))
        .route("/group/{tag}/transactions", get(groups::group_transactions))
        .route("/web/add-waitlist", post(web::join_waitlist))
        .route("/web/whitelist", post(web::join_waitlist));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

/// Load the caller's user record and check the token's device is still bound.
pub(crate) fn load_caller<R: LedgerRead>(tx: &R, auth: &AuthenticatedUser) -> Result<StoredUser, ApiError> {
    let user = UserRepository::new(tx)
        .find(&auth.user_id)?
        .ok_or(AuthError::InvalidCredentials)?;
    auth.ensure_bound_device(&user)?;
    Ok(user)
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme("bearer", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        users::send_phone_otp,
        users::verify_phone_otp,
        users::add_user,
        users::verify_email,
        users::verify_bvn,
        users::add_tag,
        users::add_passcode,
        users::login_request,
        users::verify_login,
        users::search_users,
        users::me,
        accounts::get_account,
        payments::transfer,
        payments::request_funds,
        payments::pay_request,
        payments::decline_request,
        transactions::list_transactions,
        transactions::get_transaction,
        groups::create_group,
        groups::group_transfer,
        groups::get_group,
        groups::group_payout,
        groups::group_transactions,
        web::join_waitlist
    ),
    components(
        schemas(
            ErrorEnvelope,
            NotificationWarning,
            AccountView,
            UserProfile,
            TransactionView,
            TransactionPageView,
            TransferView,
            GroupView,
            GroupMemberView,
            users::SendPhoneOtpRequest,
            users::VerifyPhoneOtpRequest,
            users::AddUserRequest,
            users::VerifyEmailRequest,
            users::VerifyBvnRequest,
            users::AddTagRequest,
            users::AddPasscodeRequest,
            users::LoginRequest,
            users::VerifyLoginRequest,
            users::PinIssued,
            users::LoginResponse,
            users::TagMatch,
            payments::TransferRequest,
            payments::RequestFundsRequest,
            payments::RequestSettlementView,
            groups::CreateGroupRequest,
            groups::GroupTransferRequest,
            groups::GroupPayoutRequest,
            web::JoinWaitlistRequest,
            web::WaitlistView
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Users", description = "Onboarding, login and profile"),
        (name = "Accounts", description = "Virtual accounts"),
        (name = "Payments", description = "Transfers and funds requests"),
        (name = "Transactions", description = "Transaction history"),
        (name = "Groups", description = "Group wallets"),
        (name = "Web", description = "Public website signups")
    )
)]
struct ApiDoc;


#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::test_support::{signed_in, DEVICE};
    use super::*;
    use crate::providers::Providers;
    use crate::state::test_support::test_state;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn liveness_probe_answers() {
        let (state, _dir) = test_state(Providers::sandbox());
        let response = router(state)
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (state, _dir) = test_state(Providers::sandbox());
        let response = router(state)
            .oneshot(Request::get("/api-doc/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let doc = body_json(response).await;
        assert!(doc["paths"]["/v1/payment/transfer"]["post"].is_object());
        assert!(doc["components"]["securitySchemes"]["bearer"].is_object());
    }

    #[tokio::test]
    async fn protected_route_without_token_is_401_envelope() {
        let (state, _dir) = test_state(Providers::sandbox());
        let response = router(state)
            .oneshot(Request::get("/v1/user/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["error"], true);
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn transfer_over_http() {
        let (state, _dir) = test_state(Providers::sandbox());
        let (ada, _) = signed_in(&state, "ada", "+2348000000001", "1000");
        signed_in(&state, "bola", "+2348000000002", "500");
        let token = state.tokens.issue(&ada.user_id, DEVICE).unwrap().token;

        let request = Request::post("/v1/payment/transfer")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "receiver_tag": "bola", "amount": "300", "description": "rent" }).to_string(),
            ))
            .unwrap();
        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["error"], false);
        assert_eq!(body["data"]["balance"], "700.00");
        assert_eq!(body["data"]["transaction"]["amount"], "300.00");
        assert_eq!(body["data"]["transaction"]["status"], "completed");
        assert!(body.get("warning").is_none());
    }

    #[tokio::test]
    async fn incomplete_body_is_400_envelope() {
        let (state, _dir) = test_state(Providers::sandbox());
        let (ada, _) = signed_in(&state, "ada", "+2348000000001", "1000");
        let token = state.tokens.issue(&ada.user_id, DEVICE).unwrap().token;

        let request = Request::post("/v1/payment/transfer")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "amount": "300" }).to_string()))
            .unwrap();
        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/json"));

        let body = body_json(response).await;
        assert_eq!(body["error"], true);
        assert_eq!(body["response_code"], 400);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn waitlist_signup_over_http() {
        let (state, _dir) = test_state(Providers::sandbox());
        let app = router(state);
        let signup = || {
            Request::post("/v1/web/whitelist")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "full_name": "Ada Obi", "email": "ada@example.com", "phone_number": "+2348011111111" })
                        .to_string(),
                ))
                .unwrap()
        };

        let response = app.clone().oneshot(signup()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"], false);
        assert_eq!(body["data"]["email"], "ada@example.com");

        let response = app.oneshot(signup()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"], true);
    }
}

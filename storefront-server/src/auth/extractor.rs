//! Request extractors for customers and admins

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::error::{AppError, ErrorCode};
use shared::models::{User, UserCreate};

use super::telegram::{InitDataError, verify_init_data};
use super::constant_time_eq;
use crate::core::ServerState;
use crate::db::repository::user;

const TMA_PREFIX: &str = "tma ";
const BEARER_PREFIX: &str = "Bearer ";

/// The authenticated customer, created on first sight
#[derive(Debug, Clone)]
pub struct CurrentCustomer(pub User);

/// Proof that the request carries the admin token
#[derive(Debug, Clone, Copy)]
pub struct AdminSession;

fn header_value<'a>(parts: &'a Parts, prefix: &str) -> Option<&'a str> {
    parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(prefix))
}

fn query_value(parts: &Parts, name: &str) -> Option<String> {
    let query = parts.uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

impl FromRequestParts<ServerState> for CurrentCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(customer) = parts.extensions.get::<CurrentCustomer>() {
            return Ok(customer.clone());
        }

        let init_data = match header_value(parts, TMA_PREFIX) {
            Some(value) => value.to_string(),
            None => query_value(parts, "init_data").ok_or_else(AppError::not_authenticated)?,
        };

        let web_user = verify_init_data(
            &init_data,
            &state.config.bot_token,
            state.config.init_data_max_age_secs,
            shared::util::now_secs(),
        )
        .map_err(|e| {
            tracing::warn!(error = %e, uri = %parts.uri, "Init data rejected");
            match e {
                InitDataError::Expired => AppError::with_message(ErrorCode::TokenExpired, e.to_string()),
                _ => AppError::invalid_token(e.to_string()),
            }
        })?;

        let mut conn = state.pool.acquire().await.map_err(|e| {
            tracing::error!(error = %e, "Database unavailable during auth");
            AppError::new(ErrorCode::DatabaseError)
        })?;
        let (mut customer, created) = user::find_or_create(
            &mut conn,
            UserCreate {
                telegram_id: web_user.telegram_id,
                username: web_user.username.clone(),
                refer_id: web_user.referrer_id(),
            },
        )
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
        drop(conn);

        if created {
            tracing::info!(user_id = customer.id, telegram_id = customer.telegram_id, "New customer");
        } else if customer.username != web_user.username {
            user::update_username(&state.pool, customer.id, web_user.username.as_deref())
                .await
                .map_err(|e| AppError::database(e.to_string()))?;
            customer.username = web_user.username;
        }

        if customer.is_banned {
            return Err(AppError::with_message(ErrorCode::UserBanned, "User is banned"));
        }

        let customer = CurrentCustomer(customer);
        parts.extensions.insert(customer.clone());
        Ok(customer)
    }
}

impl FromRequestParts<ServerState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let token = match header_value(parts, BEARER_PREFIX) {
            Some(value) => value.to_string(),
            None => query_value(parts, "token").ok_or_else(AppError::not_authenticated)?,
        };

        if constant_time_eq(token.as_bytes(), state.config.admin_token.as_bytes()) {
            Ok(AdminSession)
        } else {
            tracing::warn!(uri = %parts.uri, "Admin token rejected");
            Err(AppError::invalid_token("Invalid admin token"))
        }
    }
}

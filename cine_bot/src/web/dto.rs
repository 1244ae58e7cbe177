//! JSON shapes of the panel API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::pagination::PAGE_SIZE,
    database::{Movie, PaymentRequest, UserRecord},
    types::{PaymentStatus, Plan},
};

#[derive(Debug, Deserialize)]
pub struct UserStatusRequest {
    pub telegram_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitPaymentRequest {
    pub telegram_id: u64,
    pub plan: Option<String>,
    pub method: Option<String>,
    /// Base64, optionally as a `data:` URL.
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitPaymentResponse {
    pub request_id: i64,
    pub status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    pub admin_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub admin_id: u64,
    pub request_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub admin_id: u64,
    pub request_id: i64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub request_id: i64,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogRequest {
    pub telegram_id: u64,
    /// 1-based.
    pub page: Option<usize>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminPageRequest {
    pub admin_id: u64,
    /// 1-based.
    pub page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RequestMovieRequest {
    pub telegram_id: u64,
    pub movie_id: i64,
}

#[derive(Debug, Serialize)]
pub struct RequestMovieResponse {
    pub delivered: bool,
    pub protected: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddMovieRequest {
    pub admin_id: u64,
    #[serde(default)]
    pub title: String,
    pub message_id: i32,
}

#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub total: i64,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
    /// Set when `total` is more than can be paged through.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl<T> Paged<T> {
    /// Page `index` (0-based) of `total` items.
    pub fn new(data: Vec<T>, total: i64, index: usize) -> Self {
        Paged {
            data,
            total,
            page: index + 1,
            page_size: PAGE_SIZE,
            truncated: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovieDto {
    pub movie_id: i64,
    pub title: String,
    pub channel_id: i64,
    pub message_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&Movie> for MovieDto {
    fn from(movie: &Movie) -> Self {
        MovieDto {
            movie_id: movie.movie_id,
            title: movie.title.clone(),
            channel_id: movie.channel_id.0,
            message_id: movie.message_id.0,
            created_at: movie.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentRequestDto {
    pub request_id: i64,
    pub user_id: u64,
    pub plan: Plan,
    pub method: Option<String>,
    pub proof_url: String,
    pub status: PaymentStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<u64>,
}

impl From<PaymentRequest> for PaymentRequestDto {
    fn from(request: PaymentRequest) -> Self {
        PaymentRequestDto {
            request_id: request.request_id,
            user_id: request.user_id.0,
            plan: request.plan,
            method: request.method,
            proof_url: request.proof_url,
            status: request.status,
            rejection_reason: request.rejection_reason,
            created_at: request.created_at,
            decided_at: request.decided_at,
            decided_by: request.decided_by.map(|x| x.0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub user_id: u64,
    pub plan: Plan,
    pub subscribed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

impl UserDto {
    pub fn at(user: UserRecord, now: DateTime<Utc>) -> Self {
        UserDto {
            user_id: user.user_id.0,
            plan: user.plan,
            subscribed_at: user.subscribed_at,
            expires_at: user.expires_at,
            created_at: user.created_at,
            active: user.is_active_at(now),
        }
    }
}

//! Handlers of the panel API. Callers identify themselves by Telegram ID.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use base64::Engine;
use chrono::Utc;
use teloxide::types::{MessageId, UserId};

use super::{dto::*, AppState};
use crate::{
    backend::UserStatus,
    catalog::{pagination::Page, Catalog, PANEL_SEARCH_LIMIT},
    database::Movie,
    error::{Error, Result},
    types::{PaymentStatus, Plan},
};

type Body<T> = std::result::Result<Json<T>, JsonRejection>;

/// 1-based page from the request to 0-based index. Missing or zero is the
/// first page.
fn page_index(page: Option<usize>) -> usize {
    page.unwrap_or(1).saturating_sub(1)
}

/// Decode a base64 image, with or without a `data:image/...;base64,` prefix.
pub fn decode_image(image: &str) -> Result<Vec<u8>> {
    let image = image.trim();
    let data = match image.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| Error::validation("malformed data URL"))?,
        None => image,
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| Error::validation(format!("image is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(Error::validation("image is empty"));
    }
    Ok(bytes)
}

/// `POST /api/user-status`
pub async fn user_status(
    State(state): State<AppState>,
    body: Body<UserStatusRequest>,
) -> Result<Json<UserStatus>> {
    let Json(body) = body?;
    Ok(Json(
        state.backend.user_status(UserId(body.telegram_id)).await?,
    ))
}

/// `POST /api/submit-payment`
pub async fn submit_payment(
    State(state): State<AppState>,
    body: Body<SubmitPaymentRequest>,
) -> Result<(StatusCode, Json<SubmitPaymentResponse>)> {
    let Json(body) = body?;

    let plan: Plan = body
        .plan
        .as_deref()
        .ok_or_else(|| Error::validation("plan is missing"))?
        .parse::<Plan>()
        .map_err(|e| Error::validation(e.to_string()))?;
    let image = decode_image(
        body.image
            .as_deref()
            .ok_or_else(|| Error::validation("image is missing"))?,
    )?;

    let request_id = state
        .backend
        .payments
        .submit(
            UserId(body.telegram_id),
            plan,
            body.method.as_deref(),
            &image,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitPaymentResponse {
            request_id,
            status: PaymentStatus::Pending,
        }),
    ))
}

/// `POST /api/pending-requests`
pub async fn pending_requests(
    State(state): State<AppState>,
    body: Body<AdminRequest>,
) -> Result<Json<Vec<PaymentRequestDto>>> {
    let Json(body) = body?;
    let pending = state.backend.payments.pending(UserId(body.admin_id)).await?;
    Ok(Json(pending.into_iter().map(Into::into).collect()))
}

/// `POST /api/approve-request`
pub async fn approve_request(
    State(state): State<AppState>,
    body: Body<ApproveRequest>,
) -> Result<Json<DecisionResponse>> {
    let Json(body) = body?;
    let (request, user) = state
        .backend
        .payments
        .approve(UserId(body.admin_id), body.request_id)
        .await?;
    Ok(Json(DecisionResponse {
        request_id: request.request_id,
        status: request.status,
        expires_at: user.expires_at,
    }))
}

/// `POST /api/reject-request`
pub async fn reject_request(
    State(state): State<AppState>,
    body: Body<RejectRequest>,
) -> Result<Json<DecisionResponse>> {
    let Json(body) = body?;
    let request = state
        .backend
        .payments
        .reject(UserId(body.admin_id), body.request_id, &body.reason)
        .await?;
    Ok(Json(DecisionResponse {
        request_id: request.request_id,
        status: request.status,
        expires_at: None,
    }))
}

/// `POST /api/catalogo`, the catalog as seen by a subscriber.
pub async fn catalog(
    State(state): State<AppState>,
    body: Body<CatalogRequest>,
) -> Result<Json<Paged<MovieDto>>> {
    let Json(body) = body?;
    let backend = &state.backend;
    backend.gate.require_active(UserId(body.telegram_id)).await?;

    let index = page_index(body.page);
    let search = body.search.as_deref().map(str::trim).unwrap_or("");

    if search.is_empty() {
        let (movies, total) = backend.catalog.list(index).await?;
        return Ok(Json(Paged::new(
            movies.iter().map(MovieDto::from).collect(),
            total,
            index,
        )));
    }

    if !Catalog::query_is_searchable(search) {
        return Err(Error::validation("search needs at least 3 characters"));
    }
    let results = backend.catalog.search(search, PANEL_SEARCH_LIMIT).await?;
    let total = backend.catalog.count_matches(search).await?;
    Ok(Json(search_page(&results, total, index)))
}

/// Page `index` of cached search `results`, out of `total` matches overall.
/// Only the first [`PANEL_SEARCH_LIMIT`] matches can be paged through.
fn search_page(results: &[Movie], total: i64, index: usize) -> Paged<MovieDto> {
    let page = Page::of(results, index);
    let mut paged = Paged::new(page.items.iter().map(MovieDto::from).collect(), total, index);
    paged.truncated = usize::try_from(total).is_ok_and(|total| total > results.len());
    paged
}

/// `POST /api/request-movie`
pub async fn request_movie(
    State(state): State<AppState>,
    body: Body<RequestMovieRequest>,
) -> Result<Json<RequestMovieResponse>> {
    let Json(body) = body?;
    let delivery = state
        .backend
        .deliver_movie(UserId(body.telegram_id), body.movie_id)
        .await?;
    Ok(Json(RequestMovieResponse {
        delivered: true,
        protected: delivery.protected,
    }))
}

/// `POST /api/users`
pub async fn users(
    State(state): State<AppState>,
    body: Body<AdminPageRequest>,
) -> Result<Json<Paged<UserDto>>> {
    let Json(body) = body?;
    let index = page_index(body.page);
    let (users, total) = state
        .backend
        .list_users(UserId(body.admin_id), index)
        .await?;

    let now = Utc::now();
    Ok(Json(Paged::new(
        users.into_iter().map(|u| UserDto::at(u, now)).collect(),
        total,
        index,
    )))
}

/// `POST /api/catalogo-admin`, the whole catalog for admins.
pub async fn admin_catalog(
    State(state): State<AppState>,
    body: Body<AdminPageRequest>,
) -> Result<Json<Paged<MovieDto>>> {
    let Json(body) = body?;
    state.backend.gate.require_admin(UserId(body.admin_id))?;

    let index = page_index(body.page);
    let (movies, total) = state.backend.catalog.list(index).await?;
    Ok(Json(Paged::new(
        movies.iter().map(MovieDto::from).collect(),
        total,
        index,
    )))
}

/// `POST /api/add-movie`
pub async fn add_movie(
    State(state): State<AppState>,
    body: Body<AddMovieRequest>,
) -> Result<(StatusCode, Json<MovieDto>)> {
    let Json(body) = body?;
    let movie = state
        .backend
        .add_movie(UserId(body.admin_id), &body.title, MessageId(body.message_id))
        .await?;
    Ok((StatusCode::CREATED, Json(MovieDto::from(&movie))))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn images_decode_plain_or_as_data_url() {
        assert_eq!(decode_image("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_image("data:image/jpeg;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(matches!(decode_image("%%%"), Err(Error::Validation(_))));
        assert!(matches!(decode_image(""), Err(Error::Validation(_))));
        assert!(matches!(
            decode_image("data:image/jpeg;base64"),
            Err(Error::Validation(_))
        ));
    }

    fn movies(count: usize) -> Vec<Movie> {
        (0..count)
            .map(|i| Movie {
                movie_id: i as i64 + 1,
                title: format!("Saw {i}"),
                channel_id: teloxide::types::ChatId(-100),
                message_id: MessageId(i as i32),
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn search_total_counts_past_the_limit() {
        let results = movies(25);

        let page = search_page(&results, 25, 2);
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.total, 25);
        assert_eq!(page.page, 3);
        assert!(!page.truncated);

        // More matches than were fetched.
        let page = search_page(&results, 240, 0);
        assert_eq!(page.data.len(), 10);
        assert_eq!(page.total, 240);
        assert!(page.truncated);
    }

    #[test]
    fn pages_are_one_based_on_the_wire() {
        assert_eq!(page_index(None), 0);
        assert_eq!(page_index(Some(0)), 0);
        assert_eq!(page_index(Some(1)), 0);
        assert_eq!(page_index(Some(3)), 2);
    }
}

use crate::error::{AppError, Result};
use crate::model::{DecodeParams, DecodeResponse, EncodeRequest, EncodeResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

pub async fn encode_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<EncodeRequest>, JsonRejection>,
) -> Result<Json<EncodeResponse>> {
    let Json(request) =
        payload.map_err(|rejection| AppError::Validation(vec![rejection.body_text()]))?;

    let record = state
        .shortener()
        .encode(&request.into_original_url())
        .await?;

    Ok(Json(EncodeResponse {
        short_url: record.short_code.to_url(&state.base_url(&headers)),
    }))
}

pub async fn decode_handler(
    State(state): State<AppState>,
    Query(params): Query<DecodeParams>,
) -> Result<Json<DecodeResponse>> {
    let Some(short_code) = params.short_code else {
        return Err(AppError::NotFound);
    };

    match state.shortener().decode(&short_code).await? {
        Some(record) => Ok(Json(DecodeResponse {
            original_url: record.original_url,
        })),
        None => Err(AppError::NotFound),
    }
}

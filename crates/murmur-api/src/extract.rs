//! Extractors whose rejections come back as [`FeedError::Validation`], so a
//! malformed body, path or query gets the same JSON error body as every
//! other failure.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::FeedError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(FeedError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(FeedError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(FeedError))]
pub struct ApiQuery<T>(pub T);

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{FieldError, Schema, ValidationError, ROOT_PATH};
use crate::error::ApiError;

/// Input types that describe their own shape.
pub trait RequestSchema: DeserializeOwned {
    fn schema() -> Schema;
}

/// JSON body checked against `T::schema()`.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

/// Query string checked against `T::schema()` with string coercion.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

/// Path parameters checked against `T::schema()` with string coercion.
#[derive(Debug)]
pub struct ValidatedPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: RequestSchema,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ApiError::from(ValidationError::new(vec![FieldError::new(ROOT_PATH, rejection.body_text())]))
            })?;

        T::schema()
            .safe_parse(&value)
            .into_result()
            .map(ValidatedJson)
            .map_err(ApiError::from)
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: RequestSchema,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::from(ValidationError::new(vec![FieldError::new(ROOT_PATH, rejection.body_text())]))
            })?;

        T::schema()
            .coercing()
            .safe_parse(&string_map(params))
            .into_result()
            .map(ValidatedQuery)
            .map_err(ApiError::from)
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: RequestSchema,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::from(ValidationError::new(vec![FieldError::new(ROOT_PATH, rejection.body_text())]))
            })?;

        T::schema()
            .coercing()
            .safe_parse(&string_map(params))
            .into_result()
            .map(ValidatedPath)
            .map_err(ApiError::from)
    }
}

fn string_map(params: HashMap<String, String>) -> Value {
    Value::Object(
        params
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<String, Value>>(),
    )
}

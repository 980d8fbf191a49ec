use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header,
    Form,
};
use shared::{error::ApiError, protocol::FormPayload};

use crate::error::{reject, HttpError};

/// Extracts a [`FormPayload`] from either a multipart or a URL-encoded body.
/// Absent fields read as empty strings.
pub(crate) struct FormBody<T>(pub(crate) T);

#[async_trait]
impl<S, T> FromRequest<S> for FormBody<T>
where
    S: Send + Sync,
    T: FormPayload + Send,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let fields = read_fields(req, state).await?;
        let lookup = |key: &str| fields.get(key).cloned().unwrap_or_default();
        Ok(Self(T::from_lookup(&lookup)))
    }
}

fn bad_form(detail: String) -> HttpError {
    tracing::debug!(%detail, "rejected form body");
    reject(ApiError::validation(format!("invalid form body: {detail}")))
}

async fn read_fields<S>(req: Request, state: &S) -> Result<HashMap<String, String>, HttpError>
where
    S: Send + Sync,
{
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if !is_multipart {
        let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
            .await
            .map_err(|err| bad_form(err.body_text()))?;
        return Ok(fields);
    }

    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(|err| bad_form(err.body_text()))?;
    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| bad_form(err.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field.text().await.map_err(|err| bad_form(err.body_text()))?;
        fields.insert(name, value);
    }
    Ok(fields)
}

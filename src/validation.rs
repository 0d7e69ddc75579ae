use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::AppError;

/// `(field path, wire name)` pairs of a record in declaration order. Nested
/// fields are written as `parent.child` in both columns.
pub trait DeclaredFields {
    const FIELDS: &'static [(&'static str, &'static str)];
}

/// First failing constraint of a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {rule} {param}")]
pub struct FieldError {
    pub field: String,
    pub rule: String,
    pub param: String,
}

impl FieldError {
    fn from_validation(field: &str, err: &ValidationError) -> Self {
        let mut params: Vec<_> = err
            .params
            .iter()
            .map(|(key, value)| (key.to_string(), value))
            .filter(|(key, _)| key != "value")
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));

        let param = params
            .into_iter()
            .map(|(_, value)| match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(",");

        Self {
            field: field.to_string(),
            rule: err.code.to_string(),
            param,
        }
    }
}

/// Non-empty string check; reported under the `required` rule with no
/// parameter.
pub fn required(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

struct Failure<'a> {
    path: String,
    error: &'a ValidationError,
}

fn collect<'a>(prefix: &str, errors: &'a ValidationErrors, out: &mut Vec<Failure<'a>>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                // `required` wins over whatever else failed on an empty value
                let first = list
                    .iter()
                    .find(|e| e.code == "required")
                    .or_else(|| list.first());
                if let Some(error) = first {
                    out.push(Failure { path, error });
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect(&path, inner, out);
                }
            }
        }
    }
}

fn rank(fields: &[(&str, &str)], path: &str) -> usize {
    fields
        .iter()
        .position(|(field, wire)| *field == path || *wire == path)
        .unwrap_or(usize::MAX)
}

/// Leaf of the wire name clients sent, falling back to the field path.
fn wire_name(fields: &[(&str, &str)], path: &str) -> String {
    let full = fields
        .iter()
        .find(|(field, wire)| *field == path || *wire == path)
        .map_or(path, |(_, wire)| *wire);
    full.rsplit('.').next().unwrap_or(full).to_string()
}

/// Validate `value` and report only the first failure in declaration order.
pub fn validate_struct<T>(value: &T) -> Result<(), FieldError>
where
    T: Validate + DeclaredFields,
{
    let errors = match value.validate() {
        Ok(()) => return Ok(()),
        Err(errors) => errors,
    };

    let mut failures = Vec::new();
    collect("", &errors, &mut failures);

    let first = failures.iter().min_by(|a, b| {
        rank(T::FIELDS, &a.path)
            .cmp(&rank(T::FIELDS, &b.path))
            .then_with(|| a.path.cmp(&b.path))
    });

    match first {
        Some(first) => Err(FieldError::from_validation(
            &wire_name(T::FIELDS, &first.path),
            first.error,
        )),
        None => Ok(()),
    }
}

/// JSON body that has been parsed and validated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + DeclaredFields,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::MalformedBody(rejection.body_text()))?;

        validate_struct(&value)?;
        Ok(ValidatedJson(value))
    }
}

use crate::forms::FieldErrors;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    Unauthorized,
    Network,
    Http,
    Parse,
    /// Rejected submission with per-field messages.
    Validation,
    /// The API root could not be read; collection URLs stay unknown.
    Bootstrap,
}

#[derive(Clone, Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub fields: Option<FieldErrors>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: None,
        }
    }

    pub(crate) fn network(e: reqwest::Error) -> Self {
        Self::new(ApiErrorKind::Network, e.to_string())
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self::new(ApiErrorKind::Parse, e.to_string())
    }

    pub(crate) fn unauthorized() -> Self {
        Self::new(ApiErrorKind::Unauthorized, "Unauthorized")
    }

    pub(crate) fn bootstrap(cause: &ApiError) -> Self {
        Self::new(
            ApiErrorKind::Bootstrap,
            format!("API root unavailable: {cause}"),
        )
    }

    pub(crate) fn missing_collection(name: &str) -> Self {
        Self::new(
            ApiErrorKind::Bootstrap,
            format!("API root does not list the `{name}` collection"),
        )
    }

    /// Classifies a failed response from its status and body text.
    ///
    /// A body holding a JSON object of field messages becomes a validation
    /// error regardless of the exact 4xx status the backend picked.
    pub(crate) fn from_response(status: reqwest::StatusCode, body: &str, ctx: &str) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            let mut err = Self::unauthorized();
            err.fields = FieldErrors::from_body(body);
            return err;
        }

        if status.is_client_error() {
            if let Some(fields) = FieldErrors::from_body(body) {
                return Self {
                    kind: ApiErrorKind::Validation,
                    message: format!("{ctx} ({status})"),
                    fields: Some(fields),
                };
            }
        }

        Self::new(ApiErrorKind::Http, format!("{ctx} ({status}): {body}"))
    }

    /// Errors to render inline on a form. Failures without a field mapping
    /// degrade to a single request-wide message.
    pub fn field_errors(&self) -> FieldErrors {
        match &self.fields {
            Some(fields) if !fields.is_empty() => fields.clone(),
            _ => FieldErrors::generic(self.message.clone()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_bad_request_with_field_map_is_validation() {
        let err = ApiError::from_response(
            StatusCode::BAD_REQUEST,
            r#"{"username": ["This field is required."]}"#,
            "Login failed",
        );
        assert_eq!(err.kind, ApiErrorKind::Validation);
        let fields = err.field_errors();
        assert_eq!(
            fields.get("username"),
            Some(&["This field is required.".to_string()][..])
        );
    }

    #[test]
    fn test_server_error_degrades_to_generic_message() {
        let err = ApiError::from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "<html>boom</html>",
            "Request failed",
        );
        assert_eq!(err.kind, ApiErrorKind::Http);
        let fields = err.field_errors();
        assert_eq!(fields.len(), 1);
        assert!(fields.get(FieldErrors::GENERIC_FIELD).is_some());
    }

    #[test]
    fn test_client_error_with_malformed_body_is_http() {
        let err = ApiError::from_response(StatusCode::BAD_REQUEST, "not json", "Request failed");
        assert_eq!(err.kind, ApiErrorKind::Http);
        assert!(err.fields.is_none());
    }

    #[test]
    fn test_unauthorized_status() {
        let err = ApiError::from_response(
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "Invalid token."}"#,
            "Request failed",
        );
        assert_eq!(err.kind, ApiErrorKind::Unauthorized);
        assert_eq!(
            err.field_errors().get("detail"),
            Some(&["Invalid token.".to_string()][..])
        );
    }
}

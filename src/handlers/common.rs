use axum::{http::StatusCode, Json};
use validator::ValidationErrors;

use crate::{ApiResponse, AppState, PaginatedResponse};

/// Flattens field errors into `field: message` strings.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            let field = field.to_string();
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Invalid value".to_string())
                )
            })
        })
        .collect();
    messages.sort();
    messages
}

/// The 400 body returned when request validation fails.
pub fn validation_failure<T>(errors: &ValidationErrors) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::validation_errors(validation_messages(errors))),
    )
}

/// Resolves 1-based page and clamped page size from query values.
pub fn page_and_limit(state: &AppState, page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    (page.unwrap_or(1).max(1), state.config.page_size(limit))
}

pub fn paginated<T>(items: Vec<T>, total: u64, page: u64, limit: u64) -> PaginatedResponse<T> {
    let total_pages = if total == 0 {
        0
    } else {
        (total + limit - 1) / limit
    };
    PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Contact {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn messages_carry_field_names() {
        let contact = Contact {
            name: String::new(),
            email: "nope".into(),
        };
        let errors = contact.validate().unwrap_err();
        let messages = validation_messages(&errors);
        assert_eq!(messages.len(), 2);
        assert!(messages.contains(&"name: Name is required".to_string()));
        assert!(messages.iter().any(|m| m.starts_with("email: ")));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(paginated(vec![1, 2], 41, 1, 20).total_pages, 3);
        assert_eq!(paginated::<u8>(vec![], 0, 1, 20).total_pages, 0);
        assert_eq!(paginated(vec![1], 20, 1, 20).total_pages, 1);
    }
}

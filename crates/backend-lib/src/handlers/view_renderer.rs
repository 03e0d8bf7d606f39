//! Template rendering for handlers.
use askama::Template;
use axum::response::Html;

use crate::error::AppError;

/// Render a view, turning a template failure into [`AppError::Render`].
pub fn render_template<T: Template>(template: T) -> Result<Html<String>, AppError> {
    template.render().map(Html).map_err(|e| {
        tracing::error!(error = %e, "template rendering failed");
        AppError::Render(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Template)]
    #[template(source = "<p>Test: {{ value }}</p>", ext = "html")]
    struct TestTemplate {
        value: String,
    }

    struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[derive(Template)]
    #[template(source = "<p>{{ value }}</p>", ext = "html")]
    struct BrokenTemplate {
        value: Broken,
    }

    #[test]
    fn test_render_template_success() {
        let Html(html) = render_template(TestTemplate {
            value: "<hello>".to_string(),
        })
        .unwrap();
        assert_eq!(html, "<p>Test: &lt;hello&gt;</p>");
    }

    #[test]
    fn test_render_template_failure_is_an_app_error() {
        let err = render_template(BrokenTemplate { value: Broken }).unwrap_err();
        assert!(matches!(err, AppError::Render(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}

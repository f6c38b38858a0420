use axum::response::Html;

const APP_SHELL: &str = include_str!("../../static/index.html");

/// Client-rendered shell served for every page route.
pub async fn app_shell() -> Html<&'static str> {
    Html(APP_SHELL)
}

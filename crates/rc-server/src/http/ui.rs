//! Static pages

use axum::response::{Html, Redirect};

const PAIRING_PAGE: &str = include_str!("../../assets/pairing.html");
const BROADCAST_PAGE: &str = include_str!("../../assets/broadcast.html");

pub(super) async fn index() -> Redirect {
    Redirect::to("/pairing")
}

pub(super) async fn pairing_page() -> Html<&'static str> {
    Html(PAIRING_PAGE)
}

pub(super) async fn broadcast_page() -> Html<&'static str> {
    Html(BROADCAST_PAGE)
}

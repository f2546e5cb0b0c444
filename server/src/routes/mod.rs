use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    birthday, catalogue, health_check, payments, raffles, redemptions, tickets,
};
use crate::services::Engine;
use crate::store::Store;

pub fn create_routes<S: Store>(engine: Arc<Engine<S>>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/tiers", post(catalogue::create_tier::<S>))
        .route("/tiers/:id", get(catalogue::get_tier::<S>))
        .route("/tables", post(catalogue::create_table::<S>))
        .route("/tables/:id", patch(catalogue::update_table::<S>))
        .route("/products", post(catalogue::create_product::<S>))
        .route("/tickets", post(tickets::issue_ticket::<S>))
        .route("/tickets/:id/invalidate", post(tickets::invalidate_ticket::<S>))
        .route(
            "/tickets/:id/confirmation-sent",
            post(tickets::confirmation_sent::<S>),
        )
        .route("/tickets/:id/confirm", post(tickets::confirm_attendance::<S>))
        .route("/redemptions", post(redemptions::scan::<S>))
        .route("/payments/webhook", post(payments::payment_webhook::<S>))
        .route("/raffles/:event_id", put(raffles::configure_raffle::<S>))
        .route("/raffles/:event_id/draw", post(raffles::draw_raffle::<S>))
        .route("/birthday-benefits", post(birthday::claim_benefit::<S>))
        .route(
            "/birthday-benefits/:id",
            patch(birthday::update_guest_limit::<S>),
        )
        .with_state(engine)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
}

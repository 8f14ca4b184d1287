use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;

use super::{auth, endpoints, State};

pub fn router(state: State) -> Router {
    let booking = Router::new()
        .route("/api/bookings", post(endpoints::create_booking))
        .route(
            "/api/bookings/composite",
            post(endpoints::create_composite_booking),
        )
        .route("/api/bookings/user/{user_id}", get(endpoints::user_bookings))
        .route(
            "/api/bookings/{id}",
            get(endpoints::get_booking).delete(endpoints::delete_booking),
        )
        .route("/api/bookings/{id}/cancel", put(endpoints::cancel_booking))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_user,
        ));

    let admin = Router::new()
        .route("/api/admin/seats/block", post(endpoints::block_seats))
        .route("/api/admin/seats/unblock", post(endpoints::unblock_seats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/api/search", get(endpoints::search))
        .route("/api/seats", get(endpoints::seat_layout))
        .merge(booking)
        .merge(admin)
        .with_state(state)
}

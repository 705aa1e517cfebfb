use axum::routing::get;
use axum::Router;

use super::{handlers, Resource, ResourceState};

/// `GET|POST /api/{PATH}` and `GET|PUT|DELETE /api/{PATH}/{id}`.
pub fn resource_router<R: Resource>(state: ResourceState<R>) -> Router {
    let collection_path = format!("/api/{}", R::PATH);
    let item_path = format!("/api/{}/{{id}}", R::PATH);

    Router::new()
        .route(
            &collection_path,
            get(handlers::list::<R>).post(handlers::create::<R>),
        )
        .route(
            &item_path,
            get(handlers::get::<R>)
                .put(handlers::update::<R>)
                .delete(handlers::delete::<R>),
        )
        .with_state(state)
}

mod auth;
mod bookings;
mod context;
mod docs;
mod errors;
mod properties;
mod reviews;
mod schemas;
mod serialized;
mod wishlist;

use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
};

use axum::routing::get;
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use context::{Market, ServerContext};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9640;

pub type Router = axum::Router<ServerContext>;

/// Starts the roost server
pub async fn run_server(context: ServerContext) {
    let port = env::var("ROOST_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/properties", properties::router())
        .nest("/bookings", bookings::router())
        .nest("/reviews", reviews::router())
        .nest("/wishlist", wishlist::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {}", port);

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs");
}

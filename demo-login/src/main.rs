use axum::{Router, response::Html, routing::get};
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slack_oauth2_axum::{SLACK_ROUTE_PREFIX, init, slack_login_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate SLACK_CLIENT_ID etc. before accepting requests
    init()?;

    let app = Router::new()
        .route("/", get(index))
        .nest(SLACK_ROUTE_PREFIX.as_str(), slack_login_router());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index() -> Html<String> {
    Html(format!(
        "<h1>Sign in with Slack demo</h1>\n\
         <p><a href=\"{prefix}/slack?user_scope=identity.basic&scope=users:read,team:read\">\
         Sign in with Slack</a></p>",
        prefix = SLACK_ROUTE_PREFIX.as_str()
    ))
}

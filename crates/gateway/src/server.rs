use std::{net::SocketAddr, sync::Arc};

use {
    anyhow::Context,
    axum::{
        Router,
        routing::{get, post},
    },
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{error, info, warn},
};

use {
    pairgate_bridge::StdioConnector,
    pairgate_config::{HMAC_SECRET_ENV, PairgateConfig},
    pairgate_session::{CredentialStore, Publisher, SessionController},
};

use crate::{
    auth::RequestSigner, broadcast::BroadcastObserver, qr::TerminalQr, routes,
    state::GatewayState, ws::ws_upgrade_handler,
};

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(routes::ping))
        .route("/estado", get(routes::estado))
        .route("/qr", get(routes::qr))
        .route("/enviar", post(routes::enviar))
        .route("/health", get(routes::health))
        .route("/ws", get(ws_upgrade_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the gateway HTTP + WebSocket server and drive the session until
/// Ctrl-C.
pub async fn start_gateway(config: PairgateConfig) -> anyhow::Result<()> {
    let secret = config.auth.hmac_secret.as_ref().with_context(|| {
        format!("no request-signing secret: set [auth] hmac_secret or {HMAC_SECRET_ENV}")
    })?;
    let signer = RequestSigner::new(secret)?;

    let credentials = CredentialStore::new(config.session.auth_dir.clone());
    let session = Arc::new(
        SessionController::new(
            Arc::new(StdioConnector::new(config.bridge.clone())),
            credentials,
            Arc::new(Publisher::new()),
        )
        .with_reconnect(config.reconnect.clone()),
    );

    let state = GatewayState::new(Arc::clone(&session), signer);
    session
        .publisher()
        .register(Arc::new(BroadcastObserver::new(
            &session,
            state.broadcaster.clone(),
        )));
    if config.session.print_qr {
        session.publisher().register(Arc::new(TerminalQr::stderr()));
    }

    let app = build_gateway_app(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind((config.server.bind.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "failed to bind {}:{}",
                config.server.bind, config.server.port
            )
        })?;
    let addr = listener.local_addr()?;

    // Startup banner.
    let lines = [
        format!("pairgate gateway v{}", state.version),
        format!("listening on {addr}"),
        format!("bridge: {}", config.bridge.command),
        format!("credentials: {}", config.session.auth_dir.display()),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    // A session that fails to start leaves HTTP up and reporting DESCONECTADO.
    let runner = Arc::clone(&session);
    tokio::spawn(async move {
        match runner.run().await {
            Ok(()) => warn!("session stopped; restart the gateway to pair again"),
            Err(e) => error!(error = %e, "session failed"),
        }
    });

    // Run the server with ConnectInfo for remote IP extraction.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

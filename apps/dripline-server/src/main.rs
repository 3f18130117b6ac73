use tracing::{error, info};

mod app_state;
mod bootstrap;
mod chat;
pub mod config;
mod openapi;
mod responder;
mod responses;
mod router;
mod security;
#[cfg(test)]
mod test_support;

pub(crate) use app_state::AppState;

#[tokio::main]
async fn main() {
    match bootstrap::ensure_openapi_export() {
        Ok(Some(_)) => return,
        Ok(None) => {}
        Err(err) => {
            eprintln!("error: failed to write generated OPENAPI_OUT: {err}");
            std::process::exit(2);
        }
    }

    dripline_otel::init();

    let http_cfg = match bootstrap::http_config_from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    let chat_config = config::ChatConfig::from_env();
    let bootstrap::BootstrapOutput { router, state } = bootstrap::build(chat_config);
    let config = state.config().clone();
    let app = bootstrap::attach_http_layers(
        router.with_state(state),
        &config,
        http_cfg.concurrency_limit,
    );

    info!(
        addr = %http_cfg.addr,
        responder = ?config.responder,
        rag = config.knowledge_base_id.is_some(),
        "dripline concierge listening"
    );

    let listener = tokio::net::TcpListener::bind(http_cfg.addr)
        .await
        .expect("bind server socket");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        error!("http server exited with error: {err}");
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}

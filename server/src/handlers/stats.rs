use crate::admin::{AdminCommand, ServerStats};
use crate::server::{ServerCommand, ServerTx};
use actix_cors::Cors;
use actix_web::error;
use actix_web::{web, HttpResponse, Result};

/// Only this resource answers cross-origin requests, so `cors` never sees the
/// WebSocket handshake.
pub fn configure_stats_handlers(cfg: &mut web::ServiceConfig, cors: Cors) {
    cfg.service(
        web::resource("/stats")
            .route(web::get().to(show_stats))
            .wrap(cors),
    );
}

async fn show_stats(srv_tx: web::Data<ServerTx>) -> Result<HttpResponse> {
    let (tx, rx) = tokio::sync::oneshot::channel::<ServerStats>();

    srv_tx
        .send(ServerCommand::Admin(AdminCommand::GetStats { tx }))
        .map_err(|_| error::ErrorInternalServerError("Internal Server Error"))?;

    let stats = rx
        .await
        .map_err(|_| error::ErrorInternalServerError("Receiver await error"))?;

    Ok(HttpResponse::Ok().json(stats))
}

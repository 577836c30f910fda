use crate::connection::ws_index;
use crate::handlers::stats::configure_stats_handlers;
use actix_cors::Cors;
use actix_web::web;

mod stats;

/// The browser client opens its socket on the host root; `/ws/` is kept for
/// clients that live behind a path-routing proxy. `cors` guards `/stats` only.
pub fn root(cfg: &mut web::ServiceConfig, cors: Cors) {
    cfg.service(web::resource("/").route(web::get().to(ws_index)))
        .service(web::resource("/ws/").route(web::get().to(ws_index)));
    configure_stats_handlers(cfg, cors);
}

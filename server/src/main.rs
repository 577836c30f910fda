use actix_web::{middleware, App, HttpServer};
use env_logger::Env;

use drawboard_server::config::Config;
use drawboard_server::connection::ConnectionFactory;
use drawboard_server::handlers;
use drawboard_server::server::{spawn_server, Server};
use system::SessionStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::load().unwrap_or_else(|err| {
        log::error!("Failed to load configuration: {}", err);
        log::warn!("Using default configuration");
        Config::default()
    });

    let srv_tx = spawn_server(Server::new(SessionStore::new(), config.gateway_options()));
    let factory = ConnectionFactory::new(srv_tx.clone(), config.egress_buffer);
    let address = config.server_address();

    log::info!("Drawing board listening on {}", address);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .data(srv_tx.clone())
            .data(factory.clone())
            .configure(|cfg| handlers::root(cfg, config.cors()))
    })
    .bind(address)?
    .run()
    .await
}

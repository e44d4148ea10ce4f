//! The coordinator's HTTP surface: `actix-web` routes over a shared
//! [`crate::curriculum::Curriculum`], following `hosting::Server::run`'s
//! `App::new().wrap(Logger::new(...)).wrap(Cors::default()...)` shape.

pub mod dto;
mod handlers;

use crate::curriculum::Curriculum;
use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use std::sync::Arc;

/// Table-node settings the API surface needs at request time (as opposed
/// to at startup, like the bind address). Kept separate from
/// [`crate::config::TableConfig`] so the API layer doesn't need the whole
/// config, just what it applies per-request.
#[derive(Debug, Clone, Copy)]
pub struct ApiConfig {
    pub default_timeout_minutes: i64,
}

pub struct Server;

impl Server {
    pub async fn run(curriculum: Arc<Curriculum>, config: ApiConfig, bind_addr: &str) -> Result<(), std::io::Error> {
        let state = web::Data::from(curriculum);
        let config = web::Data::new(config);
        log::info!("starting table node on {bind_addr}");
        HttpServer::new(move || {
            App::new()
                .wrap(Logger::new("%r %s %Ts"))
                .wrap(Cors::default().allow_any_origin().allow_any_method().allow_any_header())
                .app_data(state.clone())
                .app_data(config.clone())
                .route("/ping", web::get().to(handlers::ping))
                .route("/status", web::get().to(handlers::status))
                .route("/study/register", web::post().to(handlers::register_study))
                .route("/trial/reserve", web::post().to(handlers::reserve_trial))
                .route("/trial/register", web::post().to(handlers::register_trial))
                .route("/study", web::get().to(handlers::fetch_study))
        })
        .workers(4)
        .bind(bind_addr)?
        .run()
        .await
    }
}

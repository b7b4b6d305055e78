use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use mongodb::Client;
use tracing_subscriber::EnvFilter;

use crate::auth::AuthConfig;
use crate::settings::Settings;
use crate::store::{MemoryTripStore, MongoTripStore, TripStore};

mod auth;
mod balance;
mod error;
mod exchange;
mod routes;
mod schemas;
mod settings;
mod split;
mod store;
mod summary;

fn cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);
    if allowed_origins.is_empty() {
        return cors.allow_any_origin();
    }
    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

async fn open_store(settings: &Settings) -> io::Result<Arc<dyn TripStore>> {
    let Some(uri) = &settings.mongodb_uri else {
        tracing::warn!("MONGODB_URI is not set, trips are kept in memory only");
        return Ok(Arc::new(MemoryTripStore::default()));
    };

    let client = Client::with_uri_str(uri).await.map_err(|err| {
        tracing::error!("failed to connect to MongoDB: {err}");
        io::Error::new(io::ErrorKind::Other, err)
    })?;
    tracing::info!(database = %settings.mongodb_database, "Connected");
    let store = MongoTripStore::new(&client.database(&settings.mongodb_database));
    store.ensure_indexes().await.map_err(|err| {
        tracing::error!("failed to create the trip indexes: {err}");
        io::Error::new(io::ErrorKind::Other, err)
    })?;
    Ok(Arc::new(store))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env().map_err(|err| {
        tracing::error!("{err}");
        io::Error::new(io::ErrorKind::InvalidInput, err)
    })?;

    let store = open_store(&settings).await?;
    let auth = AuthConfig::new(settings.service_token.clone());
    let allowed_origins = settings.allowed_origins.clone();

    tracing::info!(
        "Listening on {}:{}",
        settings.bind_address,
        settings.port
    );
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&allowed_origins))
            .wrap(Logger::default())
            .app_data(web::Data::from(store.clone()))
            .app_data(web::Data::new(auth.clone()))
            .configure(routes::configure)
    })
    .bind((settings.bind_address.as_str(), settings.port))?
    .run()
    .await
}

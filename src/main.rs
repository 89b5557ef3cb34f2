use actix_cors::Cors;
use actix_web::{
    self, http, App, HttpServer,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};

use crate::{
    configs::{RedisCache, connect_database},
    middlewares::{authentication, authorization},
    modules::{
        connection::{repository_pg::ConnectionRepositoryPg, service::ConnectionService},
        user::{repository_pg::UserRepositoryPg, schema::UserRole, service::UserService},
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check(db_pool: web::Data<sqlx::PgPool>) -> &'static str {
    match sqlx::query("SELECT 1").execute(db_pool.get_ref()).await {
        Ok(_) => "Server is running",
        Err(e) => {
            log::error!("Health check failed: {:?}", e);
            "Database unavailable"
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let db_pool = connect_database().await.map_err(|e| {
        log::error!("{:?}", e);
        std::io::Error::other("Database connection error")
    })?;

    let redis_pool =
        RedisCache::new().await.map_err(|_| std::io::Error::other("Redis connection error"))?;

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let connection_repo = Arc::new(ConnectionRepositoryPg::new(db_pool.clone()));

    let user_service = UserService::with_dependencies(user_repo.clone(), Arc::new(redis_pool));
    let connection_service = ConnectionService::with_dependencies(connection_repo, user_repo);

    log::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(ENV.frontend_url.as_str())
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
            .allowed_headers(vec![http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(connection_service.clone()))
            .app_data(web::Data::new(db_pool.clone()))
            .service(health_check)
            .service(
                web::scope("/api").configure(modules::user::route::public_api_configure).service(
                    web::scope("")
                        .wrap(from_fn(authorization(vec![UserRole::User, UserRole::Admin])))
                        .wrap(from_fn(authentication))
                        .configure(modules::user::route::configure)
                        .configure(
                            modules::connection::route::configure::<
                                ConnectionRepositoryPg,
                                UserRepositoryPg,
                            >,
                        ),
                ),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}

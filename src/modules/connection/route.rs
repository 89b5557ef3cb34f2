use actix_web::web::{self, scope, ServiceConfig};

use crate::modules::{
    connection::{handle::*, repository::ConnectionRepository},
    user::repository::UserRepository,
};

pub fn configure<R, U>(cfg: &mut ServiceConfig)
where
    R: ConnectionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    cfg.service(
        scope("/connections")
            .service(
                web::resource("")
                    .route(web::post().to(create_connection::<R, U>))
                    .route(web::get().to(list_connections::<R, U>)),
            )
            .service(web::resource("/friends").route(web::get().to(list_friends::<R, U>)))
            .service(web::resource("/pending").route(web::get().to(list_pending::<R, U>)))
            .service(
                web::resource("/{connection_id:[0-9a-fA-F-]{36}}")
                    .route(web::get().to(get_connection::<R, U>))
                    .route(web::patch().to(update_connection_status::<R, U>))
                    .route(web::delete().to(remove_connection::<R, U>)),
            ),
    );
}

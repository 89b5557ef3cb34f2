use actix_web::{web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        connection::{
            model::{
                ConnectionQuery, ConnectionResponse, CreateConnectionBody,
                UpdateConnectionStatusBody,
            },
            repository::ConnectionRepository,
            service::ConnectionService,
        },
        user::repository::UserRepository,
    },
    utils::{ValidatedJson, ValidatedQuery},
};

pub async fn create_connection<R, U>(
    connection_service: web::Data<ConnectionService<R, U>>,
    body: ValidatedJson<CreateConnectionBody>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionResponse>, error::Error>
where
    R: ConnectionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let requester_id = get_claims(&req)?.sub;
    let connection = connection_service.create(requester_id, body.0.friend_id).await?;

    Ok(success::Success::created(Some(connection)).message("Connection request sent successfully"))
}

pub async fn list_connections<R, U>(
    connection_service: web::Data<ConnectionService<R, U>>,
    query: ValidatedQuery<ConnectionQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ConnectionResponse>>, error::Error>
where
    R: ConnectionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let user_id = get_claims(&req)?.sub;
    let connections = connection_service.list(user_id, query.0.status).await?;

    Ok(success::Success::ok(Some(connections)).message("Connections retrieved successfully"))
}

pub async fn list_friends<R, U>(
    connection_service: web::Data<ConnectionService<R, U>>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ConnectionResponse>>, error::Error>
where
    R: ConnectionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let user_id = get_claims(&req)?.sub;
    let friends = connection_service.get_friends(user_id).await?;

    Ok(success::Success::ok(Some(friends)).message("Friends retrieved successfully"))
}

pub async fn list_pending<R, U>(
    connection_service: web::Data<ConnectionService<R, U>>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ConnectionResponse>>, error::Error>
where
    R: ConnectionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let user_id = get_claims(&req)?.sub;
    let pending = connection_service.get_pending(user_id).await?;

    Ok(success::Success::ok(Some(pending)).message("Pending requests retrieved successfully"))
}

pub async fn get_connection<R, U>(
    connection_service: web::Data<ConnectionService<R, U>>,
    connection_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionResponse>, error::Error>
where
    R: ConnectionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let user_id = get_claims(&req)?.sub;
    let connection = connection_service.get_by_id(connection_id.into_inner(), user_id).await?;

    Ok(success::Success::ok(Some(connection)).message("Connection retrieved successfully"))
}

pub async fn update_connection_status<R, U>(
    connection_service: web::Data<ConnectionService<R, U>>,
    connection_id: web::Path<Uuid>,
    body: ValidatedJson<UpdateConnectionStatusBody>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionResponse>, error::Error>
where
    R: ConnectionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let user_id = get_claims(&req)?.sub;
    let connection = connection_service
        .update_status(connection_id.into_inner(), user_id, body.0.status)
        .await?;

    Ok(success::Success::ok(Some(connection)).message("Connection status updated successfully"))
}

pub async fn remove_connection<R, U>(
    connection_service: web::Data<ConnectionService<R, U>>,
    connection_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error>
where
    R: ConnectionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let user_id = get_claims(&req)?.sub;
    connection_service.remove(connection_id.into_inner(), user_id).await?;

    Ok(success::Success::ok(None).message("Connection removed successfully"))
}

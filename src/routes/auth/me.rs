use axum::Json;
use serde::Serialize;

use crate::{
    routes::extract::CurrentUser,
    services::database::UserProfile,
    utils::envelope::{data, Envelope},
};

#[derive(Debug, Serialize)]
pub struct RouteOutput {
    user: UserProfile,
}

pub async fn me(current: CurrentUser) -> Json<Envelope<RouteOutput>> {
    data(RouteOutput {
        user: UserProfile::from(&current.user),
    })
}

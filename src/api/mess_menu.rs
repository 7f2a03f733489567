use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppError,
    model::mess_menu::{MealType, MessMenu},
    service::mess_menu::MessMenuService,
    session::Session,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MenuParams {
    /// Day of week, e.g. `monday`.
    pub day: Option<String>,
    /// Only honoured together with `day`.
    pub meal: Option<MealType>,
}

/// Weekly mess menu
///
/// Without parameters, the whole week ordered by day then meal. With `day`,
/// that day's meals. With `day` and `meal`, the single matching entry (or
/// `null`).
#[utoipa::path(
    get,
    path = "/api/mess-menu",
    params(MenuParams),
    responses((status = 200, description = "Menu entries", body = Vec<MessMenu>)),
    security(("bearer_auth" = [])),
    tag = "Mess menu"
)]
pub async fn get_menu(
    _session: Session,
    query: web::Query<MenuParams>,
    menus: web::Data<MessMenuService>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let body = match (query.day, query.meal) {
        (Some(day), Some(meal)) => serde_json::to_value(menus.find(&day, meal).await?),
        (Some(day), None) => serde_json::to_value(menus.for_day(&day).await?),
        (None, _) => serde_json::to_value(&*menus.list().await?),
    }
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to encode menu");
        AppError::Internal
    })?;

    Ok(HttpResponse::Ok().json(body))
}

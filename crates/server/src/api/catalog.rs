//! Catalog read endpoints.
//!
//! Every route takes `tenant`, `username` and `password` query parameters
//! identifying the tenant and end-user on whose behalf upstream is queried.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use streamgate_core::{CoreError, MediaClass};
use streamgate_gateway::AccessContext;

use super::AppState;
use crate::error::ServerError;

/// Query parameters shared by the catalog routes.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub tenant: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Category filter for item listings.
    pub category: Option<String>,
}

impl CatalogQuery {
    fn context(&self) -> Result<AccessContext, ServerError> {
        let tenant = required(self.tenant.as_deref(), "tenant")?;
        let username = required(self.username.as_deref(), "username")?;
        let password = self
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ServerError::BadRequest("password is required".into()))?;
        Ok(AccessContext::new(tenant, username, password))
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ServerError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServerError::BadRequest(format!("{name} is required")))
}

fn media_class(raw: &str) -> Result<MediaClass, ServerError> {
    raw.parse()
        .map_err(|e: CoreError| ServerError::BadRequest(e.to_string()))
}

/// `GET /v1/catalog/profile`
pub async fn profile(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>, ServerError> {
    let ctx = query.context()?;
    Ok(Json(state.gateway.catalog().get_profile(&ctx).await?))
}

/// `GET /v1/catalog/{media}/categories`
pub async fn categories(
    State(state): State<AppState>,
    Path(media): Path<String>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>, ServerError> {
    let media = media_class(&media)?;
    let ctx = query.context()?;
    Ok(Json(
        state.gateway.catalog().list_categories(&ctx, media).await?,
    ))
}

/// `GET /v1/catalog/{media}/items?category=`
pub async fn items(
    State(state): State<AppState>,
    Path(media): Path<String>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>, ServerError> {
    let media = media_class(&media)?;
    let ctx = query.context()?;
    Ok(Json(
        state
            .gateway
            .catalog()
            .list_items(&ctx, media, query.category.as_deref())
            .await?,
    ))
}

/// `GET /v1/catalog/{media}/items/{id}`
pub async fn item_detail(
    State(state): State<AppState>,
    Path((media, id)): Path<(String, String)>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>, ServerError> {
    let media = media_class(&media)?;
    let ctx = query.context()?;
    Ok(Json(
        state
            .gateway
            .catalog()
            .get_item_detail(&ctx, media, &id)
            .await?,
    ))
}

/// `GET /v1/catalog/{media}/guide/{channel}` -- live channels only.
pub async fn guide(
    State(state): State<AppState>,
    Path((media, channel)): Path<(String, String)>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>, ServerError> {
    if media_class(&media)? != MediaClass::Live {
        return Err(ServerError::BadRequest(
            "programme guide is only available for live channels".into(),
        ));
    }
    let ctx = query.context()?;
    Ok(Json(
        state
            .gateway
            .catalog()
            .get_guide_data(&ctx, &channel)
            .await?,
    ))
}

/// `GET /v1/catalog/{media}/streams/{id}/url`
pub async fn playback_url(
    State(state): State<AppState>,
    Path((media, id)): Path<(String, String)>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>, ServerError> {
    let media = media_class(&media)?;
    let ctx = query.context()?;
    let url = state
        .gateway
        .catalog()
        .build_playback_url(&ctx, &id, media)
        .await?;
    Ok(Json(json!({ "url": url })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_requires_all_fields() {
        let query = CatalogQuery {
            tenant: Some("042".into()),
            username: Some("alice".into()),
            password: Some("pw".into()),
            category: None,
        };
        let ctx = query.context().unwrap();
        assert_eq!(ctx.tenant.as_str(), "042");
        assert_eq!(ctx.credentials.username.as_str(), "alice");

        let missing = CatalogQuery {
            username: Some("  ".into()),
            ..query
        };
        let err = missing.context().err().unwrap();
        assert!(err.to_string().contains("username"));

        assert!(CatalogQuery::default().context().is_err());
    }

    #[test]
    fn media_aliases() {
        assert_eq!(media_class("vod").unwrap(), MediaClass::Movies);
        assert_eq!(media_class("tv").unwrap(), MediaClass::Live);
        assert_eq!(media_class("radio").err().unwrap().kind(), "bad_request");
    }
}

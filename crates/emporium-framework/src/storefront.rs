//! Built-in storefront controllers.
//!
//! These cover the routes every installation needs: the router that turns
//! the `route` parameter into the primary action, the maintenance gate, the
//! home page, and the not-found page.

use crate::action::{ActionError, Outcome, RouteTableBuilder};
use crate::context::Context;
use crate::markup::escape_html;
use crate::route::RouteId;

/// Route used when neither the request nor `action_default` names one.
pub const FALLBACK_ROUTE: &str = "common/home";

/// Registers the built-in controllers on `builder`.
#[must_use]
pub fn register(builder: RouteTableBuilder) -> RouteTableBuilder {
    builder
        .handle("startup/router", "index", router)
        .handle("startup/maintenance", "index", maintenance)
        .handle("common/home", "index", home)
        .handle("error/not_found", "index", not_found)
}

/// A builder holding only the built-in controllers.
#[must_use]
pub fn routes() -> RouteTableBuilder {
    register(RouteTableBuilder::default())
}

fn router(ctx: &mut Context, _: &[serde_json::Value]) -> Result<Outcome, ActionError> {
    let raw = ctx
        .request()
        .route()
        .or_else(|| ctx.config().get_str("action_default"))
        .unwrap_or(FALLBACK_ROUTE)
        .to_owned();
    let route = RouteId::sanitize(&raw).ok_or_else(|| ActionError::not_found(&raw))?;
    if route.segments().next() == Some("startup") {
        return Err(ActionError::not_found(route.as_str()));
    }
    Ok(Outcome::Redirect(route.to_string()))
}

fn maintenance(ctx: &mut Context, _: &[serde_json::Value]) -> Result<Outcome, ActionError> {
    if !ctx.config().get_bool("config_maintenance") {
        return Ok(Outcome::Continue);
    }
    let title = escape_html(ctx.language().get_or("text_maintenance", "Maintenance"));
    let message = escape_html(ctx.language().get_or(
        "text_maintenance_message",
        "We are currently performing some scheduled maintenance. We will be back as soon as possible.",
    ));
    ctx.response_mut().set_status(503);
    ctx.response_mut().set_header("Retry-After", "3600");
    Ok(Outcome::respond(page(&title, &format!("<p>{message}</p>"))))
}

fn home(ctx: &mut Context, _: &[serde_json::Value]) -> Result<Outcome, ActionError> {
    let title = ctx.language().get("heading_title").to_owned();
    ctx.document_mut().set_title(title.clone());
    if let Some(description) = ctx.config().get_str("config_meta_description") {
        let description = description.to_owned();
        ctx.document_mut().set_description(description);
    }
    let title = escape_html(&title);
    Ok(Outcome::respond(page(&title, "")))
}

fn not_found(ctx: &mut Context, _: &[serde_json::Value]) -> Result<Outcome, ActionError> {
    let title = escape_html(ctx.language().get_or("text_not_found", "Page Not Found"));
    let body = match ctx.request().route() {
        Some(route) => format!("<p>The page you requested ({route}) cannot be found.</p>"),
        None => String::from("<p>The page you requested cannot be found.</p>"),
    };
    ctx.document_mut().set_title(title.clone());
    ctx.response_mut().set_status(404);
    Ok(Outcome::respond(page(&title, &body)))
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{title}</h1>{body}</body></html>"
    )
}

//! HTML rendering with minijinja templates embedded in the binary.

use std::sync::LazyLock;

use actix_web::{HttpResponse, http::StatusCode, http::header::ContentType};
use minijinja::{Environment, Value, context, default_auto_escape_callback};
use serde::Serialize;

use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::AppResult;
use crate::middleware::flash::{Flash, removal_cookie};

static ENGINE: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_auto_escape_callback(default_auto_escape_callback);
    env.set_loader(embedded_template_loader);
    env
});

/// Template loader for minijinja that loads from embedded sources
fn embedded_template_loader(name: &str) -> Result<Option<String>, minijinja::Error> {
    let template_content = match name {
        "base.html" => Some(include_str!("base.html")),
        "error.html" => Some(include_str!("error.html")),

        // Posts
        "blog/index.html" => Some(include_str!("blog/index.html")),
        "blog/show.html" => Some(include_str!("blog/show.html")),
        "blog/create.html" => Some(include_str!("blog/create.html")),
        "blog/edit.html" => Some(include_str!("blog/edit.html")),
        "blog/form.html" => Some(include_str!("blog/form.html")),

        // Session
        "auth/login.html" => Some(include_str!("auth/login.html")),

        _ => None,
    };

    Ok(template_content.map(|s| s.to_string()))
}

/// Render a template to a string.
pub fn render(template_name: &str, ctx: Value) -> Result<String, minijinja::Error> {
    ENGINE.get_template(template_name)?.render(ctx)
}

/// Values every page shares through `base.html`.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Layout {
    pub user_name: Option<String>,
    pub flash: Option<&'static str>,
    pub section: &'static str,
}

impl Layout {
    pub fn new(identity: &OptionalIdentity, flash: &Flash) -> Self {
        Self {
            user_name: identity.0.as_ref().map(|id| id.name.clone()),
            flash: flash.message(),
            section: "blog",
        }
    }

    pub fn section(mut self, section: &'static str) -> Self {
        self.section = section;
        self
    }
}

/// Render a full page; a displayed flash notice is cleared in the same response.
pub fn page(
    status: StatusCode,
    template_name: &str,
    layout: &Layout,
    ctx: Value,
) -> AppResult<HttpResponse> {
    let body = render(template_name, context! { layout => layout, ..ctx })?;

    let mut response = HttpResponse::build(status);
    response.content_type(ContentType::html());
    if layout.flash.is_some() {
        response.cookie(removal_cookie());
    }

    Ok(response.body(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_compiles() {
        for name in [
            "base.html",
            "error.html",
            "blog/index.html",
            "blog/show.html",
            "blog/create.html",
            "blog/edit.html",
            "blog/form.html",
            "auth/login.html",
        ] {
            assert!(ENGINE.get_template(name).is_ok(), "{} failed to load", name);
        }
    }

    #[test]
    fn test_output_is_escaped() {
        let html = render(
            "error.html",
            context! {
                layout => Layout::default(),
                error => context! { status => 404, title => "<script>", detail => "x" },
            },
        )
        .unwrap();

        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_layout_shows_login_link_for_guests() {
        let html = render(
            "error.html",
            context! {
                layout => Layout::default(),
                error => context! { status => 500, title => "Erreur interne" },
            },
        )
        .unwrap();

        assert!(html.contains("href=\"/login\""));
        assert!(!html.contains("Se déconnecter"));
    }
}

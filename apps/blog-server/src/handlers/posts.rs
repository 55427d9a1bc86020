//! Post pages: listing, reading, and the create/edit forms.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, http::StatusCode, http::header, web};
use minijinja::context;
use serde::Serialize;

use blog_core::domain::{PageRequest, Post, PostWithRelations};
use blog_core::ports::FileStore;
use blog_core::{DomainError, FieldErrors, ShowOutcome};
use blog_shared::ListQuery;

use crate::forms::{FormValues, read_post_form};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::middleware::flash::{Flash, Notice, flash_cookie};
use crate::state::AppState;
use crate::templates::{self, Layout};

const EXCERPT_CHARS: usize = 200;

/// A post as the templates see it.
#[derive(Serialize)]
struct PostView {
    #[serde(flatten)]
    post: PostWithRelations,
    url: String,
    image_url: Option<String>,
    excerpt: String,
}

impl PostView {
    fn new(post: PostWithRelations, files: &dyn FileStore) -> Self {
        let url = post.post.canonical_path();
        let image_url = post.post.image.as_deref().map(|key| files.url(key));
        let excerpt = excerpt(&post.post.content);
        Self {
            post,
            url,
            image_url,
            excerpt,
        }
    }
}

fn excerpt(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head.trim_end())
    } else {
        head
    }
}

/// GET /posts
pub async fn index(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
    identity: OptionalIdentity,
    flash: Flash,
) -> AppResult<HttpResponse> {
    let request = PageRequest::new(query.page_number());
    let page = state.posts.list(request).await?;

    tracing::debug!(
        page = page.page,
        total_items = page.total_items,
        "Listing posts"
    );

    let has_previous = page.has_previous();
    let has_next = page.has_next();
    let posts: Vec<PostView> = page
        .items
        .into_iter()
        .map(|post| PostView::new(post, state.files.as_ref()))
        .collect();

    templates::page(
        StatusCode::OK,
        "blog/index.html",
        &Layout::new(&identity, &flash),
        context! {
            posts,
            page => page.page,
            total_pages => page.total_pages,
            has_previous,
            has_next,
        },
    )
}

/// GET /posts/{slug}/{id}
pub async fn show(
    state: web::Data<AppState>,
    path: web::Path<(String, i64)>,
    identity: OptionalIdentity,
    flash: Flash,
) -> AppResult<HttpResponse> {
    let (slug, id) = path.into_inner();

    match state.posts.show(id, &slug).await? {
        ShowOutcome::Redirect(location) => Ok(HttpResponse::Found()
            .insert_header((header::LOCATION, location))
            .finish()),
        ShowOutcome::Render(post) => templates::page(
            StatusCode::OK,
            "blog/show.html",
            &Layout::new(&identity, &flash),
            context! { post => PostView::new(post, state.files.as_ref()) },
        ),
    }
}

/// GET /posts/create
pub async fn create(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    PostFormPage::create(FormValues::default())
        .render(&state, &identity, StatusCode::OK, &FieldErrors::new())
        .await
}

/// POST /posts
pub async fn store(
    state: web::Data<AppState>,
    identity: Identity,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let form = read_post_form(payload, state.max_image_bytes).await?;
    let page = PostFormPage::create(form.values());

    let input = match form.validate(state.max_image_bytes) {
        Ok(input) => input,
        Err(errors) => return page.rejected(&state, &identity, &errors).await,
    };

    match state.posts.create(input).await {
        Ok(post) => {
            tracing::info!(post_id = post.id, author_id = identity.user_id, "Post saved");
            Ok(saved(&post, Notice::PostCreated))
        }
        Err(DomainError::Validation(errors)) => page.rejected(&state, &identity, &errors).await,
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/edit
pub async fn edit(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let post = state.posts.find(id).await?;

    let image_url = post.post.image.as_deref().map(|key| state.files.url(key));
    PostFormPage::edit(id, FormValues::from_post(&post), image_url)
        .render(&state, &identity, StatusCode::OK, &FieldErrors::new())
        .await
}

/// PUT|PATCH|POST /posts/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let existing = state.posts.find(id).await?;

    let form = read_post_form(payload, state.max_image_bytes).await?;
    let image_url = existing.post.image.as_deref().map(|key| state.files.url(key));
    let page = PostFormPage::edit(id, form.values(), image_url);

    let input = match form.validate(state.max_image_bytes) {
        Ok(input) => input,
        Err(errors) => return page.rejected(&state, &identity, &errors).await,
    };

    match state.posts.update(id, input).await {
        Ok(post) => {
            tracing::info!(post_id = post.id, author_id = identity.user_id, "Post modified");
            Ok(saved(&post, Notice::PostUpdated))
        }
        Err(DomainError::Validation(errors)) => page.rejected(&state, &identity, &errors).await,
        Err(e) => Err(e.into()),
    }
}

/// Redirect to the saved post with a notice.
fn saved(post: &Post, notice: Notice) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, post.canonical_path()))
        .cookie(flash_cookie(notice))
        .finish()
}

/// The create or edit form, with whatever the user typed.
struct PostFormPage {
    template: &'static str,
    action: String,
    is_edit: bool,
    values: FormValues,
    image_url: Option<String>,
}

impl PostFormPage {
    fn create(values: FormValues) -> Self {
        Self {
            template: "blog/create.html",
            action: "/posts".to_string(),
            is_edit: false,
            values,
            image_url: None,
        }
    }

    fn edit(id: i64, values: FormValues, image_url: Option<String>) -> Self {
        Self {
            template: "blog/edit.html",
            action: format!("/posts/{}", id),
            is_edit: true,
            values,
            image_url,
        }
    }

    async fn render(
        &self,
        state: &AppState,
        identity: &Identity,
        status: StatusCode,
        errors: &FieldErrors,
    ) -> AppResult<HttpResponse> {
        let mut categories = state.categories.find_all().await?;
        categories.sort_by_key(|c| c.id);
        let mut tags = state.tags.find_all().await?;
        tags.sort_by_key(|t| t.id);

        let layout = Layout {
            user_name: Some(identity.name.clone()),
            flash: None,
            section: "blog",
        };

        templates::page(
            status,
            self.template,
            &layout,
            context! {
                action => &self.action,
                is_edit => self.is_edit,
                values => &self.values,
                image_url => &self.image_url,
                errors,
                categories,
                tags,
            },
        )
    }

    async fn rejected(
        &self,
        state: &AppState,
        identity: &Identity,
        errors: &FieldErrors,
    ) -> AppResult<HttpResponse> {
        tracing::debug!(%errors, "Post form rejected");
        self.render(state, identity, StatusCode::UNPROCESSABLE_ENTITY, errors)
            .await
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};

    use blog_core::ports::{BaseRepository, PostRepository};

    use super::*;
    use crate::handlers::configure_routes;
    use crate::test_support::{Part, TestContext, location, multipart, read_body};

    macro_rules! app {
        ($ctx:expr) => {
            test::init_service(
                App::new()
                    .configure(|cfg| $ctx.state.configure(cfg))
                    .configure(configure_routes),
            )
            .await
        };
    }

    fn post_fields<'a>(slug: &'a str, tags: &'a [&'a str]) -> Vec<Part<'a>> {
        let mut parts = vec![
            Part::text("title", "Premier article"),
            Part::text("slug", slug),
            Part::text("content", "Bonjour tout le monde"),
            Part::text("category_id", "1"),
        ];
        parts.extend(tags.iter().map(|id| Part::text("tags[]", id)));
        parts
    }

    #[::core::prelude::v1::test]
    fn test_excerpt() {
        assert_eq!(excerpt("short"), "short");
        let long = "a".repeat(250);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 1);
        assert!(cut.ends_with('…'));
    }

    #[actix_web::test]
    async fn test_index_lists_posts_with_relations() {
        let ctx = TestContext::new().await;
        ctx.seed_post("hello", &[2]).await;
        let app = app!(ctx);

        let req = test::TestRequest::get().uri("/posts").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let html = read_body(resp).await;
        assert!(html.contains("Premier article"));
        assert!(html.contains("Actualités"));
        assert!(html.contains("web"));
    }

    #[actix_web::test]
    async fn test_index_page_past_end_is_empty() {
        let ctx = TestContext::new().await;
        ctx.seed_post("hello", &[]).await;
        let app = app!(ctx);

        for uri in ["/posts?page=5", "/posts?page=abc"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn test_show_redirects_stale_slug() {
        let ctx = TestContext::new().await;
        let post = ctx.seed_post("my-post", &[]).await;
        let app = app!(ctx);

        let req = test::TestRequest::get()
            .uri(&format!("/posts/other-slug/{}", post.id))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/posts/my-post/{}", post.id));
    }

    #[actix_web::test]
    async fn test_show_renders_canonical_url() {
        let ctx = TestContext::new().await;
        let post = ctx.seed_post("my-post", &[]).await;
        let app = app!(ctx);

        let req = test::TestRequest::get()
            .uri(&format!("/posts/my-post/{}", post.id))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(read_body(resp).await.contains("Premier article"));
    }

    #[actix_web::test]
    async fn test_show_unknown_post_is_404() {
        let ctx = TestContext::new().await;
        let app = app!(ctx);

        let req = test::TestRequest::get().uri("/posts/nope/999").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_write_routes_require_session() {
        let ctx = TestContext::new().await;
        let app = app!(ctx);

        let req = test::TestRequest::get().uri("/posts/create").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/login");

        let (content_type, body) = multipart(&post_fields("sneaky", &[]));
        let req = test::TestRequest::post()
            .uri("/posts")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(ctx.db.posts().find_all().await.unwrap().len(), 0);
    }

    #[actix_web::test]
    async fn test_create_form_lists_choices() {
        let ctx = TestContext::new().await;
        let app = app!(ctx);

        let req = test::TestRequest::get()
            .uri("/posts/create")
            .cookie(ctx.session_cookie())
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let html = read_body(resp).await;
        assert!(html.contains("Sélectionner une catégorie"));
        assert!(html.contains("Enregistrer"));
        assert!(html.contains(">rust</option>"));
    }

    #[actix_web::test]
    async fn test_store_creates_post_and_redirects() {
        let ctx = TestContext::new().await;
        let app = app!(ctx);

        let mut parts = post_fields("premier-article", &["1", "3"]);
        parts.push(Part::file("image", "photo.png", "image/png", b"\x89PNG data"));
        let (content_type, body) = multipart(&parts);

        let req = test::TestRequest::post()
            .uri("/posts")
            .cookie(ctx.session_cookie())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let post = ctx.db.posts().find_all().await.unwrap().remove(0);
        assert_eq!(location(&resp), format!("/posts/premier-article/{}", post.id));
        let flash = resp
            .response()
            .cookies()
            .find(|c| c.name() == "blog_flash")
            .unwrap();
        assert_eq!(flash.value(), "post-created");

        let stored = ctx.db.posts().find_with_relations(post.id).await.unwrap().unwrap();
        assert_eq!(stored.tag_ids().into_iter().collect::<Vec<_>>(), [1, 3]);
        let key = stored.post.image.unwrap();
        assert!(key.starts_with("blog/") && key.ends_with(".png"));
        assert!(ctx.files.exists(&key).await);
    }

    #[actix_web::test]
    async fn test_store_rerenders_invalid_form() {
        let ctx = TestContext::new().await;
        let app = app!(ctx);

        let (content_type, body) = multipart(&post_fields("Pas Un Slug", &["999"]));
        let req = test::TestRequest::post()
            .uri("/posts")
            .cookie(ctx.session_cookie())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = read_body(resp).await;
        assert!(html.contains("value=\"Premier article\""));
        assert!(html.contains("Le slug ne peut contenir"));
        assert_eq!(ctx.db.posts().find_all().await.unwrap().len(), 0);
    }

    #[actix_web::test]
    async fn test_store_reports_unknown_tag() {
        let ctx = TestContext::new().await;
        let app = app!(ctx);

        let (content_type, body) = multipart(&post_fields("tagged", &["1", "999"]));
        let req = test::TestRequest::post()
            .uri("/posts")
            .cookie(ctx.session_cookie())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(read_body(resp).await.contains("Le tag 999 n&#x27;existe pas."));
        assert_eq!(ctx.db.posts().find_all().await.unwrap().len(), 0);
    }

    #[actix_web::test]
    async fn test_edit_form_is_populated() {
        let ctx = TestContext::new().await;
        let post = ctx.seed_post("to-edit", &[2]).await;
        let app = app!(ctx);

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}/edit", post.id))
            .cookie(ctx.session_cookie())
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let html = read_body(resp).await;
        assert!(html.contains("value=\"to-edit\""));
        assert!(html.contains("<option value=\"2\" selected>web</option>"));
        assert!(html.contains("Modifier"));
    }

    #[actix_web::test]
    async fn test_update_replaces_tags_and_image() {
        let ctx = TestContext::new().await;
        let app = app!(ctx);

        let mut parts = post_fields("photo", &["1", "2"]);
        parts.push(Part::file("image", "old.png", "image/png", b"old"));
        let (content_type, body) = multipart(&parts);
        let req = test::TestRequest::post()
            .uri("/posts")
            .cookie(ctx.session_cookie())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        test::call_service(&app, req).await;
        let original = ctx.db.posts().find_all().await.unwrap().remove(0);
        let old_key = original.image.clone().unwrap();

        let mut parts = post_fields("photo-renamed", &["2", "3"]);
        parts.push(Part::text("_method", "put"));
        parts.push(Part::file("image", "new.jpg", "image/jpeg", b"new"));
        let (content_type, body) = multipart(&parts);
        let req = test::TestRequest::put()
            .uri(&format!("/posts/{}", original.id))
            .cookie(ctx.session_cookie())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), format!("/posts/photo-renamed/{}", original.id));

        let updated = ctx
            .db
            .posts()
            .find_with_relations(original.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.tag_ids().into_iter().collect::<Vec<_>>(), [2, 3]);
        let new_key = updated.post.image.unwrap();
        assert!(new_key.ends_with(".jpg"));
        assert!(!ctx.files.exists(&old_key).await);
        assert!(ctx.files.exists(&new_key).await);
    }

    #[actix_web::test]
    async fn test_update_without_image_keeps_it() {
        let ctx = TestContext::new().await;
        let post = ctx.seed_post("keep", &[]).await;
        let app = app!(ctx);

        let mut parts = post_fields("keep", &[]);
        parts.push(Part::file("image", "", "application/octet-stream", b""));
        let (content_type, body) = multipart(&parts);
        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}", post.id))
            .cookie(ctx.session_cookie())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let after = ctx.db.posts().find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(after.image, post.image);
    }

    #[actix_web::test]
    async fn test_unknown_field_is_rejected() {
        let ctx = TestContext::new().await;
        let app = app!(ctx);

        let mut parts = post_fields("extra", &[]);
        parts.push(Part::text("author_id", "42"));
        let (content_type, body) = multipart(&parts);
        let req = test::TestRequest::post()
            .uri("/posts")
            .cookie(ctx.session_cookie())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(read_body(resp).await.contains("Champ inattendu : author_id."));
    }

    #[actix_web::test]
    async fn test_flash_is_shown_once() {
        let ctx = TestContext::new().await;
        let post = ctx.seed_post("flash", &[]).await;
        let app = app!(ctx);

        let req = test::TestRequest::get()
            .uri(&format!("/posts/flash/{}", post.id))
            .cookie(flash_cookie(Notice::PostCreated))
            .to_request();
        let resp = test::call_service(&app, req).await;

        let cleared = resp
            .response()
            .cookies()
            .find(|c| c.name() == "blog_flash")
            .unwrap();
        assert_eq!(cleared.value(), "");
        assert!(read_body(resp).await.contains("L&#x27;article a bien été sauvegardé"));
    }
}

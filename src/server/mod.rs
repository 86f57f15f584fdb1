//! HTTP server: public pages, blog, admin panel and the conversion form

mod error;

pub use error::{AppError, AppResult};

use anyhow::Result;
use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, Query, State},
    http::{header, request::Parts, HeaderMap},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tera::Context;
use tokio::signal;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::admin::{self, Access, Upload};
use crate::config::SiteConfig;
use crate::content::{store::post_stem, ContentError, ContentStore, MarkdownRenderer, ThumbnailUpload};
use crate::convert::{self, Converter};
use crate::templates::{ConversionData, PostData, SiteData, TemplateRenderer};
use crate::Site;

/// Shared application state, built once at startup
pub struct AppState {
    pub config: SiteConfig,
    pub store: Arc<dyn ContentStore>,
    pub renderer: MarkdownRenderer,
    pub templates: TemplateRenderer,
    pub converter: Converter,
    pub public_dir: PathBuf,
}

type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(site: &Site) -> Result<Self> {
        Ok(Self {
            config: site.config.clone(),
            store: Arc::new(site.store()),
            renderer: MarkdownRenderer::with_theme(&site.config.highlight_theme),
            templates: TemplateRenderer::new()?,
            converter: Converter::new(&site.config.converter)?,
            public_dir: site.public_dir.clone(),
        })
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &SiteData::from(&self.config));
        context
    }

    fn render(&self, template: &str, context: &Context) -> AppResult<Html<String>> {
        Ok(Html(self.templates.render(template, context)?))
    }
}

/// Start the server
pub async fn start(site: &Site, ip: &str, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(site)?);
    let app = router(state);

    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    if site.config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set, the admin panel is open to anyone");
    }
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Build the router with all routes
pub fn router(state: SharedState) -> Router {
    let public = ServeDir::new(&state.public_dir);
    let upload_limit = state.config.upload_limit;

    Router::new()
        // Public pages
        .route("/", get(index))
        .route("/about", get(about))
        .route("/other-tool", get(other_tool))
        .route("/convert-mp3", post(convert_mp3))
        // Blog
        .route("/blog", get(blog))
        .route("/blog/:slug", get(blog_post))
        // Admin
        .route("/admin", get(admin_index))
        .route("/admin/upload", post(admin_upload))
        .route(
            "/admin/edit/:file_name",
            get(admin_edit_form).post(admin_edit_save),
        )
        .route("/admin/delete/:file_name", post(admin_delete))
        .fallback_service(public)
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::warn!("Received SIGTERM, shutting down"),
    }
}

// ============================================================================
// Public pages
// ============================================================================

async fn index(State(state): State<SharedState>) -> AppResult<Html<String>> {
    let mut context = state.context();
    context.insert("conversion", &None::<ConversionData>);
    state.render("index.html", &context)
}

async fn about(State(state): State<SharedState>) -> AppResult<Html<String>> {
    state.render("about.html", &state.context())
}

async fn other_tool(State(state): State<SharedState>) -> AppResult<Html<String>> {
    state.render("other_tool.html", &state.context())
}

#[derive(Debug, Deserialize)]
struct ConvertForm {
    #[serde(rename = "videoID", default)]
    video_id: String,
}

async fn convert_mp3(
    State(state): State<SharedState>,
    Form(form): Form<ConvertForm>,
) -> AppResult<Html<String>> {
    let result = match convert::extract_video_id(&form.video_id) {
        Ok(id) => state.converter.convert(&id).await,
        Err(e) => Err(e),
    };

    let mut context = state.context();
    context.insert("conversion", &Some(ConversionData::from_result(&result)));
    context.insert("video_url", &form.video_id);
    state.render("index.html", &context)
}

// ============================================================================
// Blog
// ============================================================================

async fn blog(State(state): State<SharedState>) -> AppResult<Html<String>> {
    let posts = state.store.list(state.config.list_policy)?;
    let posts: Vec<PostData> = posts
        .iter()
        .map(|p| PostData::from_post(p, state.config.excerpt_length))
        .collect();

    let mut context = state.context();
    context.insert("posts", &posts);
    state.render("blog.html", &context)
}

async fn blog_post(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> AppResult<Html<String>> {
    let post = state.store.get(&slug)?;
    let content = state.renderer.render(&post.body)?;

    let mut context = state.context();
    context.insert("post", &PostData::from_post(&post, state.config.excerpt_length));
    context.insert("content", &content);
    state.render("post.html", &context)
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Passed admin authorization. Holds the `?token=` suffix for links.
struct AdminAccess {
    token_query: String,
}

impl AdminAccess {
    fn redirect(&self) -> Redirect {
        Redirect::to(&format!("/admin{}", self.token_query))
    }

    fn context(&self, state: &AppState) -> Context {
        let mut context = state.context();
        context.insert("token_query", &self.token_query);
        context
    }
}

#[async_trait]
impl FromRequestParts<SharedState> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let presented = bearer_token(&parts.headers).or_else(|| {
            Query::<TokenQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(q)| q.token)
        });

        let expected = state.config.admin_token.as_deref();
        match admin::authorize(expected, presented.as_deref()) {
            Access::Granted => Ok(Self {
                token_query: expected
                    .map(|t| format!("?token={}", utf8_percent_encode(t, NON_ALPHANUMERIC)))
                    .unwrap_or_default(),
            }),
            Access::Denied => {
                tracing::warn!("Rejected admin request to {}", parts.uri.path());
                Err(AppError::Unauthorized)
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

async fn admin_index(
    State(state): State<SharedState>,
    access: AdminAccess,
) -> AppResult<Html<String>> {
    let files = state.store.list_names()?;
    let mut context = access.context(&state);
    context.insert("files", &files);
    state.render("admin.html", &context)
}

async fn admin_upload(
    State(state): State<SharedState>,
    access: AdminAccess,
    mut multipart: Multipart,
) -> AppResult<Redirect> {
    let mut markdown: Option<(String, String)> = None;
    let mut thumbnail = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(String::from);
        let file_name = field.file_name().map(String::from);
        match name.as_deref() {
            Some("markdownFile") => {
                let file_name = file_name
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| AppError::BadRequest("The markdown file has no name".into()))?;
                let content = String::from_utf8(field.bytes().await?.to_vec())
                    .map_err(|_| AppError::BadRequest("The markdown file is not UTF-8".into()))?;
                markdown = Some((file_name, content));
            }
            Some("thumbnail") => {
                let data = field.bytes().await?;
                // Browsers send an empty part when no file was picked
                if let Some(file_name) = file_name.filter(|n| !n.is_empty()) {
                    if !data.is_empty() {
                        thumbnail = Some(ThumbnailUpload {
                            file_name,
                            data: data.to_vec(),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    let (file_name, content) =
        markdown.ok_or_else(|| AppError::BadRequest("No markdown file uploaded".into()))?;

    let upload = Upload {
        file_name,
        content,
        thumbnail,
    };
    admin::upload(state.store.as_ref(), upload).map_err(|e| match e {
        ContentError::MalformedPost { .. } | ContentError::MalformedMetadataLine { .. } => {
            AppError::BadRequest(e.to_string())
        }
        other => other.into(),
    })?;

    Ok(access.redirect())
}

async fn admin_edit_form(
    State(state): State<SharedState>,
    access: AdminAccess,
    Path(file_name): Path<String>,
) -> AppResult<Html<String>> {
    let content = state.store.get_raw(&file_name)?;
    let mut context = access.context(&state);
    context.insert("file_name", &format!("{}.md", post_stem(&file_name)?));
    context.insert("content", &content);
    state.render("edit.html", &context)
}

#[derive(Debug, Deserialize)]
struct EditForm {
    content: String,
}

async fn admin_edit_save(
    State(state): State<SharedState>,
    access: AdminAccess,
    Path(file_name): Path<String>,
    Form(form): Form<EditForm>,
) -> AppResult<Redirect> {
    admin::edit(state.store.as_ref(), &file_name, &form.content)?;
    Ok(access.redirect())
}

async fn admin_delete(
    State(state): State<SharedState>,
    access: AdminAccess,
    Path(file_name): Path<String>,
) -> AppResult<Redirect> {
    admin::remove(state.store.as_ref(), &file_name)?;
    Ok(access.redirect())
}

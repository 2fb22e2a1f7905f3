//! Route table
//!
//! Maps each HTTP route to one façade operation and its result to a JSON
//! response. Any façade failure becomes a 500 with the route's failure
//! message.

use std::path::Path;

use log::{error, warn};
use serde_json::json;
use thiserror::Error;

use crate::client::Connector;
use crate::error::BridgeError;
use crate::operations::FtpBridge;
use crate::server::request::{Form, FormError, HttpRequest, Method, MissingField};
use crate::server::response::HttpResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Upload,
    Download,
    List,
    Delete,
    Rename,
    CreateDirectory,
    RemoveDirectory,
    RenameDirectory,
    FileSize,
    FileExists,
    FileMtime,
    SetPermissions,
    Search,
    Health,
}

impl Route {
    pub fn from_path(path: &str) -> Option<Self> {
        let route = match path {
            "/upload" => Route::Upload,
            "/download" => Route::Download,
            "/list" => Route::List,
            "/delete" => Route::Delete,
            "/rename" => Route::Rename,
            "/create_directory" => Route::CreateDirectory,
            "/remove_directory" => Route::RemoveDirectory,
            "/rename_directory" => Route::RenameDirectory,
            "/file_size" => Route::FileSize,
            "/file_exists" => Route::FileExists,
            "/file_mtime" => Route::FileMtime,
            "/set_permissions" => Route::SetPermissions,
            "/search" => Route::Search,
            "/health" => Route::Health,
            _ => return None,
        };
        Some(route)
    }

    pub fn method(&self) -> Method {
        match self {
            Route::Health => Method::Get,
            _ => Method::Post,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Upload => "upload",
            Route::Download => "download",
            Route::List => "list",
            Route::Delete => "delete",
            Route::Rename => "rename",
            Route::CreateDirectory => "create directory",
            Route::RemoveDirectory => "remove directory",
            Route::RenameDirectory => "rename directory",
            Route::FileSize => "file size",
            Route::FileExists => "file exists",
            Route::FileMtime => "file mtime",
            Route::SetPermissions => "set permissions",
            Route::Search => "search",
            Route::Health => "health check",
        }
    }

    /// Body message of a 500 answer.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Route::Upload => "File upload failed",
            Route::Download => "File download failed",
            Route::List => "Failed to list directory contents",
            Route::Delete => "File deletion failed",
            Route::Rename => "File renaming/moving failed",
            Route::CreateDirectory => "Directory creation failed",
            Route::RemoveDirectory => "Directory removal failed",
            Route::RenameDirectory => "Directory renaming/moving failed",
            Route::FileSize => "Failed to get file size",
            Route::FileExists => "Failed to check file existence",
            Route::FileMtime => "Failed to get file modification time",
            Route::SetPermissions => "Failed to set file permissions",
            Route::Search => "File search failed",
            Route::Health => "Health check failed",
        }
    }
}

#[derive(Debug, Error)]
enum RouteError {
    #[error(transparent)]
    MissingField(#[from] MissingField),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

fn message(text: &str) -> HttpResponse {
    HttpResponse::ok(json!({ "message": text }))
}

/// Answers one request.
pub async fn handle_request<C: Connector>(bridge: &FtpBridge<C>, request: &HttpRequest) -> HttpResponse {
    let Some(route) = Route::from_path(request.path()) else {
        return HttpResponse::message(404, "Not found");
    };
    if request.method() != &route.method() {
        return HttpResponse::message(405, "Method not allowed");
    }

    let form = if route.method() == Method::Post {
        match request.form().await {
            Ok(form) => form,
            Err(FormError::UnsupportedType(media_type)) => {
                warn!("Unsupported content type {media_type} for {} route", route.name());
                return HttpResponse::message(415, "Unsupported media type");
            }
            Err(e) => {
                warn!("Bad form body for {} route: {e}", route.name());
                return HttpResponse::message(400, "Bad request");
            }
        }
    } else {
        Form::default()
    };

    match dispatch(bridge, route, &form).await {
        Ok(response) => response,
        Err(e) => {
            error!("Error in {} route: {e}", route.name());
            HttpResponse::message(500, route.failure_message())
        }
    }
}

async fn health<C: Connector>(bridge: &FtpBridge<C>) -> HttpResponse {
    if bridge.check_ftp_health().await {
        message("FTP server is healthy")
    } else {
        HttpResponse::message(503, "FTP server is not healthy")
    }
}

async fn dispatch<C: Connector>(
    bridge: &FtpBridge<C>,
    route: Route,
    form: &Form,
) -> Result<HttpResponse, RouteError> {
    let response = match route {
        Route::Upload => {
            let filepath = form.field("filepath")?;
            let destination = form.field("destination")?;
            bridge.upload_file(Path::new(filepath), destination).await?;
            message("File uploaded successfully")
        }
        Route::Download => {
            let filepath = form.field("filepath")?;
            let destination = form.field("destination")?;
            bridge
                .download_file(filepath, Path::new(destination))
                .await?;
            message("File downloaded successfully")
        }
        Route::List => {
            let files = bridge.list_directory(form.field("path")?).await?;
            HttpResponse::ok(json!({ "files": files }))
        }
        Route::Delete => {
            bridge.delete_file(form.field("filepath")?).await?;
            message("File deleted successfully")
        }
        Route::Rename => {
            let old_path = form.field("old_path")?;
            let new_path = form.field("new_path")?;
            bridge.rename_file(old_path, new_path).await?;
            message("File renamed/moved successfully")
        }
        Route::CreateDirectory => {
            bridge.create_directory(form.field("path")?).await?;
            message("Directory created successfully")
        }
        Route::RemoveDirectory => {
            bridge.remove_directory(form.field("path")?).await?;
            message("Directory removed successfully")
        }
        Route::RenameDirectory => {
            let old_path = form.field("old_path")?;
            let new_path = form.field("new_path")?;
            bridge.rename_directory(old_path, new_path).await?;
            message("Directory renamed/moved successfully")
        }
        Route::FileSize => {
            let size = bridge.get_file_size(form.field("filepath")?).await?;
            HttpResponse::ok(json!({ "size": size }))
        }
        Route::FileExists => {
            let exists = bridge.file_exists(form.field("filepath")?).await?;
            HttpResponse::ok(json!({ "exists": exists }))
        }
        Route::FileMtime => {
            let mtime = bridge.get_file_mtime(form.field("filepath")?).await?;
            HttpResponse::ok(json!({ "mtime": mtime }))
        }
        Route::SetPermissions => {
            let filepath = form.field("filepath")?;
            let permissions = form.field("permissions")?;
            bridge.set_file_permissions(filepath, permissions).await?;
            message("File permissions set successfully")
        }
        Route::Search => {
            let files = bridge.search_files(form.field("pattern")?).await?;
            HttpResponse::ok(json!({ "files": files }))
        }
        Route::Health => health(bridge).await,
    };
    Ok(response)
}

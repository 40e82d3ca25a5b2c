//! OpenAPI document for the file API.

use utoipa::OpenApi;

use crate::errors::ErrorBody;
use crate::handlers::{
    self, DeleteResponse, FileEntry, FileInfo, FileListResponse, UploadForm, UploadResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "File Upload API",
        version = "1.0.0",
        description = "API for uploading and managing files"
    ),
    paths(handlers::upload, handlers::list_files, handlers::delete_file),
    components(schemas(
        UploadForm,
        UploadResponse,
        FileInfo,
        FileListResponse,
        FileEntry,
        DeleteResponse,
        ErrorBody
    )),
    tags((name = "files", description = "Upload, list and delete stored files"))
)]
pub struct ApiDoc;

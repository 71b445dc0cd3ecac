use std::time::Instant;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::{debug, warn};

use datasync_core::models::UploadKind;
use datasync_domain::{UploadIngestor, UploadStatus};

use crate::routes::AppState;

/// multipart 表单中的 `nodename` 与 `uploaded` 字段
#[derive(Debug, Default)]
struct UploadForm {
    node_name: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

pub async fn log_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<&'static str> {
    handle_upload(&state, UploadKind::Log, multipart).await
}

pub async fn key_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<&'static str> {
    handle_upload(&state, UploadKind::Key, multipart).await
}

async fn handle_upload(
    state: &AppState,
    kind: UploadKind,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<&'static str> {
    let form = match multipart {
        Ok(multipart) => read_form(multipart).await,
        Err(rejection) => {
            warn!(kind = %kind, error = %rejection, "upload without multipart body");
            UploadForm::default()
        }
    };

    let Some((filename, bytes)) = form.file else {
        return Json(UploadStatus::NothingPosted.message(kind));
    };

    let size = bytes.len();
    let start = Instant::now();
    let written = state
        .uploads
        .ingest(kind, form.node_name.as_deref(), &filename, bytes)
        .await;
    state.metrics.record_upload(kind, written, size);
    debug!(kind = %kind, size, elapsed_ms = start.elapsed().as_millis() as u64, "upload handled");

    Json(UploadIngestor::status(written).message(kind))
}

/// 读取表单字段；读取中途出错时保留已读到的内容
async fn read_form(mut multipart: Multipart) -> UploadForm {
    let mut form = UploadForm::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "读取multipart字段失败");
                break;
            }
        };

        match field.name() {
            Some("nodename") => match field.text().await {
                Ok(name) if !name.is_empty() => form.node_name = Some(name),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "读取nodename失败"),
            },
            Some("uploaded") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => form.file = Some((filename, bytes.to_vec())),
                    Err(e) => warn!(filename = %filename, error = %e, "读取上传内容失败"),
                }
            }
            _ => {}
        }
    }
    form
}

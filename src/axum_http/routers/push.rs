use std::{io, sync::Arc};

use anyhow::anyhow;
use axum::{
    Json, Router,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    axum_http::error_responses::AppError,
    config::config_model::RelayConfig,
    domain::{
        repositories::remote_store::RemoteStoreConnector,
        value_objects::uploads::{PushKind, PushUpload},
    },
    usecases::push::PushUseCase,
};

pub const PUSH_FIELD: &str = "push";

/// Body chunks buffered between the multipart reader and the upload pipeline.
const CHUNK_BUFFER: usize = 8;

pub fn routes<C>(connector: Arc<C>, config: Arc<RelayConfig>) -> Router
where
    C: RemoteStoreConnector + Send + Sync + 'static,
{
    let usecase = PushUseCase::new(connector, config.push.clone());

    Router::new()
        .route("/push", post(push::<C>))
        .with_state(Arc::new(usecase))
}

pub async fn push<C>(
    State(usecase): State<Arc<PushUseCase<C>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response
where
    C: RemoteStoreConnector + Send + Sync + 'static,
{
    let push_id = Uuid::new_v4();

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            return rejected(push_id, AppError::MissingUpload(anyhow!(rejection.body_text())));
        }
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                let err = anyhow!("multipart form has no `{}` field", PUSH_FIELD);
                return rejected(push_id, AppError::MissingUpload(err));
            }
            Err(err) => return rejected(push_id, AppError::MissingUpload(err.into())),
        };

        if field.name() == Some(PUSH_FIELD) {
            return relay_field(push_id, usecase.as_ref(), field).await;
        }
    }
}

async fn relay_field<C>(push_id: Uuid, usecase: &PushUseCase<C>, field: Field<'_>) -> Response
where
    C: RemoteStoreConnector + Send + Sync + 'static,
{
    let (sender, receiver) = mpsc::channel(CHUNK_BUFFER);
    let upload = PushUpload {
        file_name: field.file_name().map(str::to_string),
        content_type: field.content_type().map(str::to_string),
        contents: Box::new(SyncIoBridge::new(StreamReader::new(ReceiverStream::new(
            receiver,
        )))),
    };

    info!(
        %push_id,
        file_name = upload.file_name.as_deref().unwrap_or_default(),
        "push: upload received"
    );

    let (forwarded, pushed) = tokio::join!(
        forward_field(field, sender),
        usecase.push(push_id, upload)
    );

    match (pushed, forwarded) {
        (Ok(outcome), _) => {
            let status = match outcome.kind {
                PushKind::Archive => StatusCode::OK,
                PushKind::Single => StatusCode::CREATED,
            };
            info!(%push_id, files = outcome.manifest.len(), "push: completed");
            (status, Json(outcome.manifest)).into_response()
        }
        // The pipeline only saw a broken stream; report the body read failure.
        (Err(_), Err(err)) => rejected(push_id, err),
        (Err(err), Ok(forwarded)) => {
            let err = AppError::from(err);
            error!(%push_id, forwarded, error = %err.detail(), "push: {}", err);
            err.into_response()
        }
    }
}

fn rejected(push_id: Uuid, err: AppError) -> Response {
    warn!(%push_id, error = %err.detail(), "push: {}", err);
    err.into_response()
}

/// Feeds the field body to the upload pipeline chunk by chunk. Returns the
/// number of bytes handed over.
async fn forward_field(
    mut field: Field<'_>,
    sender: mpsc::Sender<io::Result<Bytes>>,
) -> Result<u64, AppError> {
    let mut forwarded = 0;

    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                forwarded += chunk.len() as u64;
                if sender.send(Ok(chunk)).await.is_err() {
                    // Pipeline finished or failed without draining the body.
                    debug!(forwarded, "push: upload pipeline stopped reading");
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                let _ = sender.send(Err(io::Error::other(err.body_text()))).await;
                return Err(AppError::UnreadableUpload(err.into()));
            }
        }
    }

    Ok(forwarded)
}

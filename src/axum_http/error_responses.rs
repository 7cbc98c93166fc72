use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::usecases::push::PushError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Could not get file")]
    MissingUpload(#[source] anyhow::Error),

    #[error("Could not open file")]
    UnreadableUpload(#[source] anyhow::Error),

    #[error(transparent)]
    Push(#[from] PushError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UnreadableUpload(_) => StatusCode::BAD_REQUEST,
            AppError::Push(PushError::InvalidEntryName(_)) => StatusCode::BAD_REQUEST,
            AppError::MissingUpload(_) | AppError::Push(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            AppError::MissingUpload(err) | AppError::UnreadableUpload(err) => format!("{:#}", err),
            AppError::Push(err) => err.detail(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            message: self.to_string(),
            error: self.detail(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::remote_paths::EntryNameError;

    #[test]
    fn statuses_follow_the_failing_stage() {
        assert_eq!(
            AppError::MissingUpload(anyhow::anyhow!("no field")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::UnreadableUpload(anyhow::anyhow!("stream closed")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(PushError::InvalidEntryName(EntryNameError::Empty)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(PushError::Store(anyhow::anyhow!("553"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn message_and_detail_are_split() {
        let err = AppError::from(PushError::Store(
            anyhow::anyhow!("553 denied").context("failed to store a.txt on FTP server"),
        ));

        assert_eq!(err.to_string(), "Could not upload file to FTP server");
        assert_eq!(err.detail(), "failed to store a.txt on FTP server: 553 denied");
    }
}

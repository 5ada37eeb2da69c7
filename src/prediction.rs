//! Upload of a captured frame to the remote prediction service.
//!
//! The response contract is undocumented, so the body is handed back as raw
//! JSON. Failures are surfaced as-is; nothing here retries.

use std::{collections::BTreeMap, time::Duration};

use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::{
    capture::frame::ImageRef,
    error::{Alert, AlertAction, NetworkError, WorkflowError},
    sensor::SensorInput,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const DEFAULT_PREDICTION_ENDPOINT: &str = "https://agrisense-api.onrender.com/predict";

const IMAGE_FIELD: &str = "image";
const IMAGE_FILE_NAME: &str = "photo.jpg";

/// One multipart submission: the frame plus scalar form fields.
#[derive(Debug, Clone)]
pub struct PredictionUpload {
    image: ImageRef,
    fields: BTreeMap<String, String>,
}

impl PredictionUpload {
    pub fn new(image: ImageRef) -> Self {
        Self {
            image,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_readings(mut self, readings: &SensorInput) -> Self {
        self.fields.extend(readings.to_form_fields());
        self
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    fn into_form(self) -> Result<Form, NetworkError> {
        let part = Part::bytes(self.image.bytes().to_vec())
            .file_name(IMAGE_FILE_NAME)
            .mime_str(self.image.mime_type())
            .map_err(|err| NetworkError::Request(err.to_string()))?;

        let form = self
            .fields
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));
        Ok(form.part(IMAGE_FIELD, part))
    }
}

pub struct PredictionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl PredictionClient {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self, NetworkError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| NetworkError::Request(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn submit(&self, upload: PredictionUpload) -> Result<Value, NetworkError> {
        let image_id = upload.image.id();
        let form = upload.into_form()?;

        log_info!("Uploading capture {} to {}", image_id, self.endpoint);
        let resp = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                log_warn!("Prediction request failed: {}", err);
                NetworkError::Request(err.to_string())
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| NetworkError::Request(err.to_string()))?;

        if !status.is_success() {
            log_warn!("Prediction service returned {}", status);
            return Err(NetworkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|err| NetworkError::MalformedJson(err.to_string()))
    }
}

/// Dialog shown once the upload settles.
pub fn outcome_alert(outcome: &Result<Value, NetworkError>) -> Alert {
    match outcome {
        Ok(value) => Alert::new("Success", value.to_string(), vec![AlertAction::Continue]),
        Err(err) => WorkflowError::Network(err.clone()).alert(),
    }
}

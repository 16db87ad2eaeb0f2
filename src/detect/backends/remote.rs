//! Remote inference over HTTP.
//!
//! Two sequential legs: host the image (multipart upload, yields a public
//! URL), then hand that URL to the detection workflow. Each leg runs on its
//! own `ureq` agent with a bounded timeout.

use anyhow::{anyhow, Context, Result};
use rand::RngCore;
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::time::Duration;

use crate::asset::ImageAsset;
use crate::config::{UploadSettings, WorkflowSettings};
use crate::detect::backend::{DetectorBackend, InferenceFailure, Leg, LegObserver};
use crate::detect::normalize::{extract_predictions, RawPrediction};

/// Cap on any response body we read.
pub const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

// -------------------- Upload --------------------

/// Hosts images on the upload endpoint.
pub struct ImageUploader {
    settings: UploadSettings,
    agent: ureq::Agent,
}

impl ImageUploader {
    pub fn new(settings: UploadSettings, timeout: Duration) -> Self {
        Self {
            settings,
            agent: build_agent(timeout),
        }
    }

    /// `{base_url}/{cloud_name}/image/upload`.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.cloud_name
        )
    }

    /// Uploads the image and returns its public `secure_url`.
    pub fn upload(&self, image: &ImageAsset) -> Result<String> {
        if self.settings.cloud_name.trim().is_empty() {
            return Err(anyhow!("upload cloud name is not configured"));
        }
        if self.settings.upload_preset.trim().is_empty() {
            return Err(anyhow!("upload preset is not configured"));
        }

        let form = MultipartForm::new()
            .file("file", "image.jpg", "image/jpeg", image.bytes())
            .text("upload_preset", &self.settings.upload_preset);
        let endpoint = self.endpoint();
        log::debug!("uploading {} ({} bytes) to {}", image.source(), image.len(), endpoint);

        let response = self
            .agent
            .post(&endpoint)
            .set("Content-Type", &form.content_type())
            .send_bytes(&form.finish())
            .map_err(describe_ureq_error)
            .context("upload request")?;
        let body = read_json(response).context("upload response")?;

        body.get("secure_url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("upload response missing 'secure_url'"))
    }
}

// -------------------- Detection workflow --------------------

#[derive(Serialize)]
struct WorkflowRequest<'a> {
    api_key: &'a str,
    inputs: WorkflowInputs<'a>,
}

#[derive(Serialize)]
struct WorkflowInputs<'a> {
    image: WorkflowImage<'a>,
}

#[derive(Serialize)]
struct WorkflowImage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

/// Submits hosted image URLs to the detection workflow.
pub struct WorkflowClient {
    settings: WorkflowSettings,
    agent: ureq::Agent,
}

impl WorkflowClient {
    pub fn new(settings: WorkflowSettings, timeout: Duration) -> Self {
        Self {
            settings,
            agent: build_agent(timeout),
        }
    }

    /// Runs the workflow on a hosted image and returns the raw response
    /// document. Shape validation is left to the normalizer.
    pub fn run(&self, image_url: &str) -> Result<Value> {
        if self.settings.url.trim().is_empty() {
            return Err(anyhow!("workflow url is not configured"));
        }
        if self.settings.api_key.trim().is_empty() {
            return Err(anyhow!("workflow api key is not configured"));
        }

        let request = WorkflowRequest {
            api_key: &self.settings.api_key,
            inputs: WorkflowInputs {
                image: WorkflowImage {
                    kind: "url",
                    value: image_url,
                },
            },
        };
        let payload = serde_json::to_string(&request).context("encode workflow request")?;

        let response = self
            .agent
            .post(&self.settings.url)
            .set("Content-Type", "application/json")
            .send_string(&payload)
            .map_err(describe_ureq_error)
            .context("workflow request")?;
        read_json(response).context("workflow response")
    }
}

// -------------------- Backend --------------------

/// Upload-then-detect backend.
pub struct RemoteBackend {
    uploader: ImageUploader,
    workflow: WorkflowClient,
}

impl RemoteBackend {
    pub fn new(
        upload: UploadSettings,
        workflow: WorkflowSettings,
        upload_timeout: Duration,
        detect_timeout: Duration,
    ) -> Self {
        Self {
            uploader: ImageUploader::new(upload, upload_timeout),
            workflow: WorkflowClient::new(workflow, detect_timeout),
        }
    }
}

impl DetectorBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn detect(
        &mut self,
        image: &ImageAsset,
        observer: &mut dyn LegObserver,
    ) -> Result<Vec<RawPrediction>, InferenceFailure> {
        observer.started(Leg::Upload);
        let hosted_url = match self.uploader.upload(image) {
            Ok(url) => url,
            Err(err) => {
                observer.finished(Leg::Upload, false, "failed");
                return Err(InferenceFailure::Upload(err));
            }
        };
        observer.finished(Leg::Upload, true, "hosted");
        log::info!("image hosted at {}", hosted_url);

        observer.started(Leg::Detect);
        let response = match self.workflow.run(&hosted_url) {
            Ok(response) => response,
            Err(err) => {
                observer.finished(Leg::Detect, false, "failed");
                return Err(InferenceFailure::DetectionService(err));
            }
        };
        let predictions = extract_predictions(&response);
        observer.finished(
            Leg::Detect,
            true,
            &format!("{} prediction(s)", predictions.len()),
        );
        log::info!("workflow returned {} prediction(s)", predictions.len());
        Ok(predictions)
    }
}

// -------------------- HTTP helpers --------------------

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

fn describe_ureq_error(err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, response) => {
            let mut snippet = String::new();
            let _ = response
                .into_reader()
                .take(256)
                .read_to_string(&mut snippet);
            anyhow!("http status {}: {}", code, snippet.trim())
        }
        ureq::Error::Transport(transport) => anyhow!("transport error: {}", transport),
    }
}

fn read_json(response: ureq::Response) -> Result<Value> {
    let mut raw = Vec::new();
    response
        .into_reader()
        .take(MAX_RESPONSE_BYTES)
        .read_to_end(&mut raw)
        .context("read response body")?;
    serde_json::from_slice(&raw).map_err(|e| anyhow!("malformed json: {}", e))
}

// -------------------- Multipart --------------------

/// Minimal `multipart/form-data` encoder for the upload leg.
struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    fn new() -> Self {
        let mut nonce = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self {
            boundary: format!("smearscan-{}", hex::encode(nonce)),
            body: Vec::new(),
        }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.part_header(&format!("form-data; name=\"{}\"", name), None);
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.part_header(
            &format!("form-data; name=\"{}\"; filename=\"{}\"", name, filename),
            Some(content_type),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn part_header(&mut self, disposition: &str, content_type: Option<&str>) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.body
            .extend_from_slice(format!("Content-Disposition: {}\r\n", disposition).as_bytes());
        if let Some(content_type) = content_type {
            self.body
                .extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        self.body.extend_from_slice(b"\r\n");
    }

    fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct LegLog(Vec<(Leg, String)>);

    impl LegObserver for LegLog {
        fn started(&mut self, leg: Leg) {
            self.0.push((leg, "start".to_string()));
        }

        fn finished(&mut self, leg: Leg, ok: bool, detail: &str) {
            assert_eq!(ok, detail != "failed");
            self.0.push((leg, detail.to_string()));
        }
    }

    #[test]
    fn multipart_body_carries_both_fields() {
        let form = MultipartForm::new()
            .file("file", "image.jpg", "image/jpeg", b"\xFF\xD8jpeg")
            .text("upload_preset", "preset-1");
        let content_type = form.content_type();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap()
            .to_string();
        let body = String::from_utf8_lossy(&form.finish()).into_owned();

        assert!(body.starts_with(&format!("--{}\r\n", boundary)));
        assert!(body.contains(
            "Content-Disposition: form-data; name=\"file\"; filename=\"image.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
        ));
        assert!(body.contains(
            "Content-Disposition: form-data; name=\"upload_preset\"\r\n\r\npreset-1\r\n"
        ));
        assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
    }

    #[test]
    fn boundaries_differ_per_form() {
        assert_ne!(
            MultipartForm::new().content_type(),
            MultipartForm::new().content_type()
        );
    }

    #[test]
    fn boundary_is_prefixed_hex_nonce() {
        let form = MultipartForm::new();
        let nonce = form.boundary.strip_prefix("smearscan-").unwrap();
        assert_eq!(nonce.len(), 24);
        assert_eq!(hex::decode(nonce).unwrap().len(), 12);
    }

    #[test]
    fn workflow_request_shape() {
        let request = WorkflowRequest {
            api_key: "key",
            inputs: WorkflowInputs {
                image: WorkflowImage {
                    kind: "url",
                    value: "https://img/1.jpg",
                },
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "api_key": "key",
                "inputs": {"image": {"type": "url", "value": "https://img/1.jpg"}}
            })
        );
    }

    #[test]
    fn upload_endpoint_joins_cloud_name() {
        let uploader = ImageUploader::new(
            UploadSettings {
                base_url: "https://api.cloudinary.com/v1_1/".to_string(),
                cloud_name: "demo".to_string(),
                upload_preset: "p".to_string(),
            },
            Duration::from_secs(1),
        );
        assert_eq!(
            uploader.endpoint(),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn unconfigured_legs_fail_before_network() {
        let mut backend = RemoteBackend::new(
            UploadSettings {
                base_url: "http://127.0.0.1:9".to_string(),
                cloud_name: String::new(),
                upload_preset: "p".to_string(),
            },
            WorkflowSettings {
                url: "http://127.0.0.1:9/wf".to_string(),
                api_key: "k".to_string(),
            },
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let image = ImageAsset::new("mem.jpg", vec![1, 2, 3]).unwrap();
        let mut legs = LegLog::default();
        let outcome = backend.detect(&image, &mut legs);
        assert_eq!(
            legs.0,
            vec![
                (Leg::Upload, "start".to_string()),
                (Leg::Upload, "failed".to_string())
            ]
        );
        match outcome {
            Err(InferenceFailure::Upload(err)) => {
                assert!(err.to_string().contains("cloud name"))
            }
            other => panic!("expected upload failure, got {:?}", other.map(|p| p.len())),
        }
    }
}

use crate::camera::Frame;
use crate::detector::{Detection, DetectorError, FaceDetector};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use url::Url;

/// Model asset manifests the inference service must have loaded before any
/// detection. Mirrors the face-api model set: tiny face detector, 68-point
/// landmarks, expression classifier.
const MODEL_MANIFESTS: [&str; 3] = [
    "tiny_face_detector_model-weights_manifest.json",
    "face_landmark_68_model-weights_manifest.json",
    "face_expression_model-weights_manifest.json",
];

/// HTTP backend for an external face/expression inference service. The model
/// itself stays a black box behind the wire.
#[derive(Clone)]
pub struct RemoteDetector {
    client: Client,
    base: Url,
}

impl RemoteDetector {
    pub fn new(base_url: &str) -> Result<Self, DetectorError> {
        // A trailing slash keeps Url::join from eating the last path segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };
        Ok(Self {
            client: Client::new(),
            base: Url::parse(&normalized)?,
        })
    }
}

impl FaceDetector for RemoteDetector {
    fn load_models(&self) -> BoxFuture<'_, Result<(), DetectorError>> {
        let this = self.clone();
        async move {
            for manifest in MODEL_MANIFESTS {
                let url = this
                    .base
                    .join(&format!("models/{manifest}"))
                    .map_err(|e| DetectorError::ModelLoad {
                        details: format!("bad manifest url: {e}"),
                    })?;

                let response = this.client.get(url.clone()).send().await.map_err(|e| {
                    DetectorError::ModelLoad {
                        details: format!("fetch {manifest}: {e}"),
                    }
                })?;

                if !response.status().is_success() {
                    return Err(DetectorError::ModelLoad {
                        details: format!("fetch {manifest}: HTTP {}", response.status().as_u16()),
                    });
                }

                tracing::debug!(%url, "model manifest available");
            }
            tracing::info!("detector models loaded");
            Ok(())
        }
        .boxed()
    }

    fn detect(&self, frame: Frame) -> BoxFuture<'_, Result<Vec<Detection>, DetectorError>> {
        let this = self.clone();
        async move {
            let url = this.base.join("detect")?;

            let response = this
                .client
                .post(url)
                .header("content-type", "application/octet-stream")
                .header("x-frame-width", frame.width)
                .header("x-frame-height", frame.height)
                .body(frame.pixels)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(DetectorError::InferenceStatus {
                    status: response.status().as_u16(),
                });
            }

            let detections: Vec<Detection> =
                response
                    .json()
                    .await
                    .map_err(|e| DetectorError::InvalidResponse {
                        details: format!("failed to parse JSON: {e}"),
                    })?;

            Ok(detections)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::ExpressionScore;

    #[test]
    fn base_url_gets_trailing_slash() {
        let detector = RemoteDetector::new("http://localhost:9000/api").expect("valid url");
        assert_eq!(detector.base.as_str(), "http://localhost:9000/api/");

        let joined = detector.base.join("detect").expect("join");
        assert_eq!(joined.as_str(), "http://localhost:9000/api/detect");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            RemoteDetector::new("not a url"),
            Err(DetectorError::InvalidUrl(_))
        ));
    }

    #[test]
    fn wire_detection_parses_service_json() {
        let payload = r#"[{
            "box": {"x": 10.0, "y": 20.0, "width": 64.0, "height": 64.0},
            "landmarks": [[12.0, 24.0], [30.0, 24.0]],
            "expressions": [
                {"label": "happy", "score": 0.82},
                {"label": "neutral", "score": 0.10}
            ]
        }]"#;

        let detections: Vec<Detection> = serde_json::from_str(payload).expect("parse");
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].face.width, 64.0);
        assert_eq!(detections[0].landmarks.len(), 2);
        assert_eq!(
            detections[0].expressions[0],
            ExpressionScore::new("happy", 0.82)
        );
    }
}

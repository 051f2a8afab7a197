//! Video extraction handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use clipx_models::{ExtractionResult, VideoCandidate};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Title used when the post has no caption.
pub const DEFAULT_TITLE: &str = "Twitter Video";

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub success: bool,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_image: Option<String>,
    pub videos: Vec<VideoCandidate>,
    pub tweet_id: String,
}

impl From<ExtractionResult> for ExtractResponse {
    fn from(result: ExtractionResult) -> Self {
        let title = match result.caption() {
            "" => DEFAULT_TITLE.to_string(),
            caption => caption.to_string(),
        };
        Self {
            success: true,
            title,
            preview_image: result.preview_image().map(str::to_string),
            videos: result.candidates().to_vec(),
            tweet_id: result.post().id.clone(),
        }
    }
}

/// Resolve a post URL into ranked playable videos.
pub async fn extract_video(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> ApiResult<Json<ExtractResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected extract body: {}", rejection);
        ApiError::bad_request("Invalid request body")
    })?;

    let raw_url = request.url.unwrap_or_default();
    let result = state
        .pipeline
        .extract(&raw_url)
        .await
        .map_err(|e| ApiError::from_extract(e, state.rate_window_minutes))?;

    Ok(Json(result.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipx_models::PostReference;

    fn result(caption: &str, preview: Option<&str>) -> ExtractionResult {
        ExtractionResult::new(
            PostReference::parse("https://x.com/user/status/123").unwrap(),
            vec![
                VideoCandidate::from_url_hint("https://v/clip_1280x720.mp4"),
                VideoCandidate::with_bitrate("https://v/hi.mp4", 2_176_000),
            ],
            caption,
            preview.map(str::to_string),
        )
    }

    #[test]
    fn test_response_shape() {
        let response = ExtractResponse::from(result("hello", Some("https://pbs.example/p.jpg")));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["title"], "hello");
        assert_eq!(json["tweetId"], "123");
        assert_eq!(json["previewImage"], "https://pbs.example/p.jpg");
        assert_eq!(json["videos"][0]["url"], "https://v/hi.mp4");
        assert_eq!(json["videos"][0]["type"], "video/mp4");
        assert_eq!(json["videos"][0]["quality"], "1080p");
        assert_eq!(json["videos"][0]["bitrate"], 2_176_000);
        assert_eq!(json["videos"][1]["quality"], "720p");
        assert!(json["videos"][1].get("bitrate").is_none());
    }

    #[test]
    fn test_empty_caption_uses_default_title() {
        let json = serde_json::to_value(ExtractResponse::from(result("", None))).unwrap();
        assert_eq!(json["title"], DEFAULT_TITLE);
        assert!(json.get("previewImage").is_none());
    }
}

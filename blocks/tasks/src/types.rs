use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use manage_task_atoms::media::ImageUpload;
use serde::{Deserialize, Serialize};

use crate::workflow::{CreateTaskInput, UpdateTaskInput};

// ========== IMAGE ==========
/// Image sent inline as standard base64.
#[derive(Debug, Deserialize)]
pub struct ImagePayload {
    pub file_name: String,
    pub data: String,
}

impl ImagePayload {
    pub fn decode(self) -> Result<ImageUpload, base64::DecodeError> {
        let bytes = STANDARD.decode(self.data.trim())?;
        Ok(ImageUpload::new(self.file_name, bytes))
    }
}

// ========== TASKS ==========
#[derive(Debug, Deserialize)]
pub struct CreateTaskPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub is_complete: bool,
    pub image: Option<ImagePayload>,
}

impl CreateTaskPayload {
    pub fn into_input(self) -> Result<CreateTaskInput, base64::DecodeError> {
        Ok(CreateTaskInput {
            title: self.title,
            detail: self.detail,
            is_complete: self.is_complete,
            image: self.image.map(ImagePayload::decode).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub is_complete: bool,
    /// The image_url the client loaded with the task
    pub image_url: Option<String>,
    #[serde(default)]
    pub remove_image: bool,
    pub image: Option<ImagePayload>,
}

impl UpdateTaskPayload {
    pub fn into_input(self) -> Result<UpdateTaskInput, base64::DecodeError> {
        Ok(UpdateTaskInput {
            title: self.title,
            detail: self.detail,
            is_complete: self.is_complete,
            image: self.image.map(ImagePayload::decode).transpose()?,
            current_image_url: self.image_url,
            remove_image: self.remove_image,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedTask {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_defaults_optional_fields() {
        let payload: CreateTaskPayload = serde_json::from_str(r#"{"title":"Buy milk"}"#).unwrap();

        let input = payload.into_input().unwrap();

        assert_eq!(input.title, "Buy milk");
        assert_eq!(input.detail, "");
        assert!(!input.is_complete);
        assert!(input.image.is_none());
    }

    #[test]
    fn image_data_is_base64_decoded() {
        let payload: CreateTaskPayload = serde_json::from_str(
            r#"{"title":"t","image":{"file_name":"a.png","data":"AQID"}}"#,
        )
        .unwrap();

        let image = payload.into_input().unwrap().image.unwrap();

        assert_eq!(image.file_name, "a.png");
        assert_eq!(image.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn bad_base64_is_rejected() {
        let payload: UpdateTaskPayload = serde_json::from_str(
            r#"{"title":"t","image":{"file_name":"a.png","data":"not base64!"}}"#,
        )
        .unwrap();

        assert!(payload.into_input().is_err());
    }

    #[test]
    fn update_payload_maps_image_url_to_current() {
        let payload: UpdateTaskPayload = serde_json::from_str(
            r#"{"title":"t","is_complete":true,"image_url":"https://x/old.png"}"#,
        )
        .unwrap();

        let input = payload.into_input().unwrap();

        assert!(input.is_complete);
        assert_eq!(input.current_image_url.as_deref(), Some("https://x/old.png"));
        assert!(!input.remove_image);
    }
}

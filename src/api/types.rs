//! Request and response payloads exchanged with the conversion backend.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Deserializes `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Opaque task identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute device the backend should transcribe on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cuda,
    Cpu,
}

impl Device {
    /// Returns the other device.
    pub fn toggled(self) -> Self {
        match self {
            Device::Cuda => Device::Cpu,
            Device::Cpu => Device::Cuda,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
        }
    }

    /// Parses `cuda` or `cpu` (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cuda" | "gpu" => Some(Device::Cuda),
            "cpu" => Some(Device::Cpu),
            _ => None,
        }
    }
}

/// Where a converted piece of media came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Youtube,
    Tiktok,
    Discord,
    /// Uploaded audio file, and anything the backend does not label.
    #[default]
    #[serde(other)]
    Mp3,
}

impl MediaKind {
    /// Badge text shown in the history list.
    pub fn badge(self) -> &'static str {
        match self {
            MediaKind::Youtube => "YouTube",
            MediaKind::Tiktok => "TikTok",
            MediaKind::Discord => "Discord",
            MediaKind::Mp3 => "MP3",
        }
    }

    /// Guesses the source of a media URL the same way the backend does.
    ///
    /// Returns `None` for URLs the backend would reject.
    pub fn detect(url: &str) -> Option<Self> {
        let lower = url.trim().to_ascii_lowercase();
        let rest = lower
            .strip_prefix("https://")
            .or_else(|| lower.strip_prefix("http://"));
        let had_scheme = rest.is_some();
        let rest = rest.unwrap_or(&lower);
        let host_path = rest.strip_prefix("www.").unwrap_or(rest);

        let youtube_hosts = [
            "youtube.com/",
            "youtu.be/",
            "youtube-nocookie.com/",
            "m.youtube.com/",
        ];
        if youtube_hosts.iter().any(|h| host_path.starts_with(h)) {
            return Some(MediaKind::Youtube);
        }

        let tiktok = host_path.strip_prefix("m.").unwrap_or(host_path);
        if ["tiktok.com/", "vt.tiktok.com/", "vm.tiktok.com/"]
            .iter()
            .any(|h| tiktok.starts_with(h))
        {
            return Some(MediaKind::Tiktok);
        }

        // Discord attachment links must carry an explicit scheme
        let discord_hosts = [
            "cdn.discordapp.com/attachments/",
            "cdn.discordapp.net/attachments/",
            "media.discordapp.com/attachments/",
            "media.discordapp.net/attachments/",
        ];
        if had_scheme && discord_hosts.iter().any(|h| rest.starts_with(h)) {
            return Some(MediaKind::Discord);
        }

        None
    }
}

/// Body of `POST /api/convert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertRequest {
    pub media_url: String,
    pub device: Device,
}

/// Response of `POST /api/convert`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskCreated {
    pub task_id: TaskId,
}

/// Task status as reported by `GET /api/status/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    Error,
    /// Any other value (`queued`, `downloading`, ...) means still running.
    #[serde(other)]
    Other,
}

/// Fields describing a finished conversion.
///
/// Shared by the completed status payload and history entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub kind: MediaKind,
    #[serde(default)]
    pub midi_name: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub conversion_time: Option<f64>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub video_title: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub tiktok_url: Option<String>,
    #[serde(default)]
    pub discord_url: Option<String>,
    #[serde(default)]
    pub library: Option<String>,
}

impl ConversionResult {
    /// Best human-readable title: video title, then source URL, then MIDI name.
    pub fn title(&self) -> &str {
        self.video_title
            .as_deref()
            .or(self.youtube_url.as_deref())
            .or(self.tiktok_url.as_deref())
            .or(self.discord_url.as_deref())
            .or(self.midi_name.as_deref())
            .unwrap_or("Untitled")
    }
}

/// Response of `GET /api/status/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusPayload {
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub result: ConversionResult,
}

/// Sheet text returned by `POST /api/convert-to-sheets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetText {
    pub text: String,
    pub sheets_filename: Option<String>,
}

/// Raw response of `POST /api/convert-to-sheets`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SheetsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub sheet_text: Option<String>,
    #[serde(default)]
    pub sheets_filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `POST /api/upload-midi`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UploadResponse {
    pub midi_filename: String,
}

/// Error body the backend attaches to failed requests.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// One entry of `GET /api/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unix timestamp (seconds); doubles as the entry's identity.
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: f64,
    /// Pre-formatted local time from the backend.
    #[serde(default)]
    pub time_str: Option<String>,
    #[serde(default)]
    pub mp3_name: Option<String>,
    #[serde(flatten)]
    pub result: ConversionResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_payload_parsing() {
        let json = r#"{"status":"completed","midi_name":"song.mid","type":"youtube",
            "video_id":"abc","conversion_time":12.5}"#;
        let payload: StatusPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.status, TaskStatus::Completed);
        assert_eq!(payload.result.kind, MediaKind::Youtube);
        assert_eq!(payload.result.midi_name.as_deref(), Some("song.mid"));
        assert_eq!(payload.result.conversion_time, Some(12.5));
    }

    #[test]
    fn test_unknown_status_is_other() {
        let payload: StatusPayload =
            serde_json::from_str(r#"{"status":"queued","progress":"Queued for processing"}"#)
                .unwrap();
        assert_eq!(payload.status, TaskStatus::Other);
        assert_eq!(payload.progress.as_deref(), Some("Queued for processing"));
    }

    #[test]
    fn test_null_type_defaults_to_mp3() {
        let entry: HistoryEntry =
            serde_json::from_str(r#"{"timestamp":1700000000.5,"type":null,"midi_name":"a.mid"}"#)
                .unwrap();
        assert_eq!(entry.result.kind, MediaKind::Mp3);
        assert_eq!(entry.result.title(), "a.mid");
    }

    #[test]
    fn test_convert_request_serialization() {
        let req = ConvertRequest {
            media_url: "https://youtu.be/x".to_string(),
            device: Device::Cpu,
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"media_url":"https://youtu.be/x","device":"cpu"}"#
        );
    }

    #[test]
    fn test_detect_media_kind() {
        assert_eq!(
            MediaKind::detect("https://www.youtube.com/watch?v=abc"),
            Some(MediaKind::Youtube)
        );
        assert_eq!(MediaKind::detect("youtu.be/abc"), Some(MediaKind::Youtube));
        assert_eq!(
            MediaKind::detect("https://vm.tiktok.com/ZM123/"),
            Some(MediaKind::Tiktok)
        );
        assert_eq!(
            MediaKind::detect("https://cdn.discordapp.com/attachments/1/2/a.mp3"),
            Some(MediaKind::Discord)
        );
        assert_eq!(MediaKind::detect("cdn.discordapp.com/attachments/1/2"), None);
        assert_eq!(MediaKind::detect("https://example.com/video"), None);
    }
}

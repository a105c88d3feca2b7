use std::path::{Path, PathBuf};

use base64::Engine;
use crate::error::AppError;

/// Image media types accepted by the Messages API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedMediaType {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl SupportedMediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Match a declared content type. Case-insensitive; parameters after `;` are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

/// A base64-encoded image ready to inline in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub media_type: SupportedMediaType,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    /// A `data:<type>;base64,<payload>` string.
    DataUri(String),
}

/// The uploaded chart: a name, its declared content type and where its bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFile {
    pub name: String,
    pub content_type: String,
    pub source: ChartSource,
}

impl ChartFile {
    /// Declares the content type from the file extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: display_name(&path),
            content_type: content_type_for_path(&path).to_string(),
            source: ChartSource::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            source: ChartSource::Bytes(bytes),
        }
    }

    /// The content type is taken from the URI header, e.g. `data:image/png;base64,...`.
    pub fn from_data_uri(name: impl Into<String>, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let content_type = uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split([';', ',']).next())
            .unwrap_or_default()
            .to_string();
        Self {
            name: name.into(),
            content_type,
            source: ChartSource::DataUri(uri),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Best guess at a content type from a path's extension.
pub fn content_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Drop a `data:...;base64,` header if present, returning just the payload.
pub fn strip_data_uri_prefix(value: &str) -> &str {
    match value.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, payload)| payload).unwrap_or(rest),
        None => value,
    }
}

/// Validate the declared type and encode the file's full contents as base64.
pub async fn encode_image(file: &ChartFile) -> Result<ImagePart, AppError> {
    let media_type = SupportedMediaType::from_content_type(&file.content_type)
        .ok_or_else(|| AppError::UnsupportedMediaType(file.content_type.clone()))?;

    let data = match &file.source {
        ChartSource::Path(path) => {
            let bytes = tokio::fs::read(path).await?;
            base64::engine::general_purpose::STANDARD.encode(bytes)
        }
        ChartSource::Bytes(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
        ChartSource::DataUri(uri) => strip_data_uri_prefix(uri).trim().to_string(),
    };

    Ok(ImagePart { media_type, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn test_media_type_matching() {
        assert_eq!(SupportedMediaType::from_content_type("image/png"), Some(SupportedMediaType::Png));
        assert_eq!(SupportedMediaType::from_content_type("IMAGE/JPEG"), Some(SupportedMediaType::Jpeg));
        assert_eq!(
            SupportedMediaType::from_content_type("image/webp; charset=binary"),
            Some(SupportedMediaType::Webp)
        );
        assert_eq!(SupportedMediaType::from_content_type("image/jpg"), None);
        assert_eq!(SupportedMediaType::from_content_type("image/svg+xml"), None);
        assert_eq!(SupportedMediaType::from_content_type(""), None);
    }

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path(Path::new("sales.JPG")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("a/b/chart.gif")), "image/gif");
        assert_eq!(content_type_for_path(Path::new("chart.bmp")), "application/octet-stream");
        assert_eq!(content_type_for_path(Path::new("README")), "application/octet-stream");
    }

    #[test]
    fn test_strip_data_uri_prefix() {
        assert_eq!(strip_data_uri_prefix("data:image/png;base64,iVBORw0K"), "iVBORw0K");
        assert_eq!(strip_data_uri_prefix("iVBORw0K"), "iVBORw0K");
    }

    #[test]
    fn test_from_data_uri_declares_type() {
        let file = ChartFile::from_data_uri("paste", "data:image/gif;base64,R0lGOD");
        assert_eq!(file.content_type, "image/gif");
        let bare = ChartFile::from_data_uri("paste", "R0lGOD");
        assert_eq!(bare.content_type, "");
    }

    #[tokio::test]
    async fn test_encode_bytes() {
        let file = ChartFile::from_bytes("chart.png", "image/png", PNG_MAGIC.to_vec());
        let part = encode_image(&file).await.unwrap();
        assert_eq!(part.media_type, SupportedMediaType::Png);
        assert_eq!(part.data, "iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn test_encode_data_uri_strips_prefix() {
        let file = ChartFile::from_data_uri("paste", "data:image/png;base64,iVBORw0KGgo=");
        let part = encode_image(&file).await.unwrap();
        assert_eq!(part.data, "iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn test_encode_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        std::fs::File::create(&path).unwrap().write_all(&PNG_MAGIC).unwrap();

        let file = ChartFile::from_path(&path);
        assert_eq!(file.name, "chart.png");
        let part = encode_image(&file).await.unwrap();
        assert_eq!(part.media_type, SupportedMediaType::Png);
        assert_eq!(part.data, "iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn test_unsupported_type_rejected_before_read() {
        // The path does not exist; validation must fail first.
        let file = ChartFile::from_path("/nonexistent/chart.bmp");
        let err = encode_image(&file).await.unwrap_err();
        match err {
            AppError::UnsupportedMediaType(t) => assert_eq!(t, "application/octet-stream"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let file = ChartFile::from_path("/nonexistent/chart.png");
        let err = encode_image(&file).await.unwrap_err();
        assert!(matches!(err, AppError::IoError(_)));
    }

    #[tokio::test]
    async fn test_content_type_override() {
        let file = ChartFile::from_bytes("chart", "application/octet-stream", vec![1, 2, 3])
            .with_content_type("image/jpeg");
        let part = encode_image(&file).await.unwrap();
        assert_eq!(part.media_type, SupportedMediaType::Jpeg);
        assert_eq!(part.data, "AQID");
    }
}

mod error;

use std::path::Path;

use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

pub use error::{FetchError, FetchResult};

/// Element on the coub page whose text is the embedded JSON payload.
const COUB_JSON_SELECTOR: &str = "#coubPageCoubJson";

/// Resolved source URLs for one coub, highest available quality per track.
#[derive(Debug, Clone)]
pub struct CoubSources {
    pub coub_id: String,
    pub video_url: String,
    pub audio_url: String,
    pub thumb_url: String,
}

/// Embedded page payload, reduced to the fields this pipeline reads.
#[derive(Debug, Deserialize)]
struct CoubPage {
    file_versions: FileVersions,
    image_versions: ImageVersions,
}

#[derive(Debug, Deserialize)]
struct FileVersions {
    html5: Html5Versions,
}

#[derive(Debug, Deserialize)]
struct Html5Versions {
    video: QualityVariants,
    audio: QualityVariants,
}

#[derive(Debug, Deserialize)]
struct ImageVersions {
    template: String,
}

/// Available quality variants of one track. Preference order is high, then
/// med, then low; the first available wins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualityVariants {
    #[serde(default)]
    high: Option<VariantLink>,
    #[serde(default)]
    med: Option<VariantLink>,
    #[serde(default)]
    low: Option<VariantLink>,
}

#[derive(Debug, Clone, Deserialize)]
struct VariantLink {
    url: String,
}

impl QualityVariants {
    pub fn best(&self) -> Option<&str> {
        self.high
            .as_ref()
            .or(self.med.as_ref())
            .or(self.low.as_ref())
            .map(|variant| variant.url.as_str())
    }
}

/// Fetches coub pages and raw media assets. `file://` URLs are served from
/// the local filesystem so tests run without a network.
pub struct CoubClient {
    http: Client,
}

impl CoubClient {
    pub fn new(user_agent: &str) -> FetchResult<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|err| FetchError::Network(err.to_string()))?;
        Ok(Self { http })
    }

    /// Fetch the coub page and resolve the three source URLs.
    pub async fn resolve(&self, link: &str) -> FetchResult<CoubSources> {
        let coub_id = coub_id_from_link(link)?;
        let page = self.fetch_text(link).await?;
        let payload = extract_embedded_json(&page)?;
        let parsed: CoubPage = serde_json::from_str(&payload)?;
        let video_url = parsed
            .file_versions
            .html5
            .video
            .best()
            .ok_or_else(|| FetchError::Parse("no playable video variant".into()))?
            .to_string();
        let audio_url = parsed
            .file_versions
            .html5
            .audio
            .best()
            .ok_or_else(|| FetchError::Parse("no playable audio variant".into()))?
            .to_string();
        let thumb_url = parsed.image_versions.template.replace("%{version}", "small");
        Ok(CoubSources {
            coub_id,
            video_url,
            audio_url,
            thumb_url,
        })
    }

    /// Stream a remote asset to a local file.
    pub async fn download(&self, url: &str, dest: &Path) -> FetchResult<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| FetchError::Io {
                    source,
                    path: parent.to_path_buf(),
                })?;
        }
        if let Some(source_path) = local_path(url) {
            fs::copy(&source_path, dest)
                .await
                .map(|_| ())
                .map_err(|source| FetchError::Io {
                    source,
                    path: dest.to_path_buf(),
                })?;
            return Ok(());
        }
        let response = self.http.get(url).send().await?.error_for_status()?;
        let mut stream = response.bytes_stream();
        let mut file = fs::File::create(dest)
            .await
            .map_err(|source| FetchError::Io {
                source,
                path: dest.to_path_buf(),
            })?;
        use futures::StreamExt;
        while let Some(chunk) = stream.next().await {
            let data = chunk?;
            file.write_all(&data)
                .await
                .map_err(|source| FetchError::Io {
                    source,
                    path: dest.to_path_buf(),
                })?;
        }
        Ok(())
    }

    /// Fetch an asset into memory. Used for the thumbnail, which is checked
    /// for availability but not persisted.
    pub async fn fetch_bytes(&self, url: &str) -> FetchResult<Vec<u8>> {
        if let Some(source_path) = local_path(url) {
            return fs::read(&source_path)
                .await
                .map_err(|source| FetchError::Io {
                    source,
                    path: source_path,
                });
        }
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_text(&self, url: &str) -> FetchResult<String> {
        if let Some(source_path) = local_path(url) {
            return fs::read_to_string(&source_path)
                .await
                .map_err(|source| FetchError::Io {
                    source,
                    path: source_path,
                });
        }
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Last path segment of the coub link, e.g. `dl5px` for
/// `https://coub.com/view/dl5px`.
pub fn coub_id_from_link(link: &str) -> FetchResult<String> {
    let url = Url::parse(link).map_err(|err| FetchError::Parse(err.to_string()))?;
    url.path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
        .map(|segment| segment.to_string())
        .ok_or_else(|| FetchError::Parse("link has no coub id segment".into()))
}

/// Local filename for a downloaded asset, taken from the URL's last path
/// segment.
pub fn remote_basename(url: &str) -> FetchResult<String> {
    let parsed = Url::parse(url).map_err(|err| FetchError::Parse(err.to_string()))?;
    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
        .map(|segment| segment.to_string())
        .ok_or_else(|| FetchError::Parse(format!("asset url has no filename: {url}")))
}

fn extract_embedded_json(page: &str) -> FetchResult<String> {
    let document = Html::parse_document(page);
    let selector = Selector::parse(COUB_JSON_SELECTOR).expect("valid selector");
    let element = document.select(&selector).next().ok_or_else(|| {
        FetchError::Parse(format!("element {COUB_JSON_SELECTOR} not found on page"))
    })?;
    Ok(element.text().collect::<String>())
}

fn local_path(url: &str) -> Option<std::path::PathBuf> {
    let parsed = Url::parse(url).ok()?;
    if parsed.scheme() == "file" {
        parsed.to_file_path().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <script id="coubPageCoubJson" type="text/json">{
            "file_versions": {
                "html5": {
                    "video": {
                        "med": {"url": "https://cdn.example/video_med.mp4"},
                        "low": {"url": "https://cdn.example/video_low.mp4"}
                    },
                    "audio": {
                        "high": {"url": "https://cdn.example/audio_high.mp3"},
                        "low": {"url": "https://cdn.example/audio_low.mp3"}
                    }
                }
            },
            "image_versions": {
                "template": "https://cdn.example/thumb_%{version}.jpg"
            }
        }</script>
    </body></html>"#;

    #[test]
    fn embedded_json_is_extracted() {
        let payload = extract_embedded_json(PAGE).unwrap();
        let parsed: CoubPage = serde_json::from_str(&payload).unwrap();
        assert_eq!(
            parsed.file_versions.html5.audio.best(),
            Some("https://cdn.example/audio_high.mp3")
        );
    }

    #[test]
    fn missing_payload_element_is_parse_error() {
        let err = extract_embedded_json("<html><body></body></html>").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn quality_preference_is_high_then_med_then_low() {
        let payload = extract_embedded_json(PAGE).unwrap();
        let parsed: CoubPage = serde_json::from_str(&payload).unwrap();
        // No high video variant on this page, so med wins.
        assert_eq!(
            parsed.file_versions.html5.video.best(),
            Some("https://cdn.example/video_med.mp4")
        );
    }

    #[test]
    fn empty_variants_have_no_best() {
        let variants = QualityVariants::default();
        assert_eq!(variants.best(), None);
    }

    #[test]
    fn coub_id_is_last_link_segment() {
        assert_eq!(
            coub_id_from_link("https://coub.com/view/dl5px").unwrap(),
            "dl5px"
        );
        assert!(coub_id_from_link("https://coub.com").is_err());
    }

    #[test]
    fn basename_comes_from_url_path() {
        assert_eq!(
            remote_basename("https://cdn.example/path/video_med_1499.mp4?token=x").unwrap(),
            "video_med_1499.mp4"
        );
    }

    #[tokio::test]
    async fn download_serves_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("asset.bin");
        fs::write(&source, b"PAYLOAD").await.unwrap();
        let dest = dir.path().join("copied.bin");

        let client = CoubClient::new("GetCoub/test").unwrap();
        let url = format!("file://{}", source.display());
        client.download(&url, &dest).await.unwrap();
        assert_eq!(fs::read(&dest).await.unwrap(), b"PAYLOAD");
    }
}

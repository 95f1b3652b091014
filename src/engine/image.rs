use super::{ContainerEngine, EngineError};
use std::fmt;
use tracing::{debug, info};

const DEFAULT_TAG: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Reference {
    Tag(String),
    Digest(String),
}

/// An image name split into repository and tag (or digest).
///
/// Names without a tag are tagged `latest`. A `:` only counts as a tag
/// separator after the last `/`, so registry ports survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    repository: String,
    reference: Reference,
}

impl ImageRef {
    pub fn parse(name: &str) -> Self {
        if let Some((repository, digest)) = name.split_once('@') {
            return Self {
                repository: repository.to_string(),
                reference: Reference::Digest(digest.to_string()),
            };
        }

        let name_start = name.rfind('/').map_or(0, |slash| slash + 1);
        match name[name_start..].rfind(':') {
            Some(colon) => {
                let split = name_start + colon;
                Self {
                    repository: name[..split].to_string(),
                    reference: Reference::Tag(name[split + 1..].to_string()),
                }
            }
            None => Self {
                repository: name.to_string(),
                reference: Reference::Tag(DEFAULT_TAG.to_string()),
            },
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// The tag, or the digest for digest references
    pub fn reference(&self) -> &str {
        match &self.reference {
            Reference::Tag(tag) => tag,
            Reference::Digest(digest) => digest,
        }
    }

    fn matches(&self, image: &super::ImageInfo) -> bool {
        let full = self.to_string();
        match self.reference {
            Reference::Tag(_) => image.tags.iter().any(|tag| *tag == full),
            Reference::Digest(_) => image.digests.iter().any(|digest| *digest == full),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Reference::Tag(tag) => write!(f, "{}:{}", self.repository, tag),
            Reference::Digest(digest) => write!(f, "{}@{}", self.repository, digest),
        }
    }
}

/// Makes sure `name` is available locally, pulling it when it is not.
pub async fn ensure_image(engine: &dyn ContainerEngine, name: &str) -> Result<(), EngineError> {
    let image = ImageRef::parse(name);

    let local = engine.list_images(image.repository()).await?;
    if local.iter().any(|info| image.matches(info)) {
        debug!(image = %image, "Image is already available locally");
        return Ok(());
    }

    info!(image = %image, "Pulling image");
    engine.pull_image(&image).await?;
    debug!(image = %image, "Image pulled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineCall, ImageInfo, MockEngine};

    #[test]
    fn test_untagged_name_gets_latest() {
        let image = ImageRef::parse("alpine");
        assert_eq!(image.repository(), "alpine");
        assert_eq!(image.reference(), "latest");
        assert_eq!(image.to_string(), "alpine:latest");
    }

    #[test]
    fn test_explicit_tag() {
        let image = ImageRef::parse("tenzer/fpm:1.9");
        assert_eq!(image.repository(), "tenzer/fpm");
        assert_eq!(image.reference(), "1.9");
    }

    #[test]
    fn test_registry_port_is_not_a_tag() {
        let image = ImageRef::parse("localhost:5000/tools/fpm");
        assert_eq!(image.repository(), "localhost:5000/tools/fpm");
        assert_eq!(image.to_string(), "localhost:5000/tools/fpm:latest");

        let tagged = ImageRef::parse("localhost:5000/tools/fpm:2");
        assert_eq!(tagged.repository(), "localhost:5000/tools/fpm");
        assert_eq!(tagged.reference(), "2");
    }

    #[test]
    fn test_digest_reference() {
        let image = ImageRef::parse("alpine@sha256:abcd");
        assert_eq!(image.repository(), "alpine");
        assert_eq!(image.reference(), "sha256:abcd");
        assert_eq!(image.to_string(), "alpine@sha256:abcd");
    }

    #[tokio::test]
    async fn test_present_image_is_not_pulled() {
        let engine = MockEngine::new().with_local_image(ImageInfo {
            id: "sha256:1".to_string(),
            tags: vec!["alpine:latest".to_string()],
            digests: vec![],
        });

        ensure_image(&engine, "alpine").await.unwrap();

        assert_eq!(
            engine.calls(),
            vec![EngineCall::ListImages("alpine".to_string())]
        );
    }

    #[tokio::test]
    async fn test_other_tag_triggers_pull() {
        let engine = MockEngine::new().with_local_image(ImageInfo {
            id: "sha256:1".to_string(),
            tags: vec!["alpine:3.18".to_string()],
            digests: vec![],
        });

        ensure_image(&engine, "alpine").await.unwrap();

        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::ListImages("alpine".to_string()),
                EngineCall::PullImage("alpine:latest".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_pull_failure_is_reported() {
        let engine = MockEngine::new().with_pull_error("manifest unknown");

        let err = ensure_image(&engine, "does/not-exist:1").await.unwrap_err();
        assert!(err.to_string().contains("manifest unknown"));
        assert!(err.to_string().contains("does/not-exist:1"));
    }
}

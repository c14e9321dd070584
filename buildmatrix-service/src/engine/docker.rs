// Docker engine client
// BuildEngine implementation backed by the Docker Engine API

use async_trait::async_trait;
use bollard::image::BuildImageOptions;
use bollard::Docker;
use tokio_stream::StreamExt;

use crate::context::packer::BUILD_DEFINITION_NAME;
use crate::engine::{BuildEngine, BuildEvent, BuildEventStream, EngineError};

/// Build engine talking to a local Docker daemon
pub struct DockerEngine {
    client: Docker,
}

impl DockerEngine {
    /// Connect using the platform's default socket/pipe
    pub fn connect() -> Result<Self, EngineError> {
        let client = Docker::connect_with_local_defaults()
            .map_err(|e| EngineError::Connect(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an already-configured client
    pub fn from_client(client: Docker) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BuildEngine for DockerEngine {
    async fn submit(&self, context: Vec<u8>, tag: &str) -> Result<BuildEventStream, EngineError> {
        let options = BuildImageOptions {
            dockerfile: BUILD_DEFINITION_NAME.to_string(),
            t: tag.to_string(),
            rm: true,
            ..Default::default()
        };

        let stream = self.client.build_image(
            options,
            None,
            Some(bollard::body_full(bytes::Bytes::from(context))),
        );

        Ok(Box::pin(stream.map(|message| match message {
            Ok(info) => Ok(BuildEvent {
                stream: info.stream,
                error: info.error,
            }),
            Err(e) => Err(EngineError::Transport(e.to_string())),
        })))
    }
}

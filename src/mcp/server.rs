//! The `hackerbot` MCP server and its single tool.

use crate::hardware::SharedHardware;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::model::{
    CallToolResult, Content, ErrorData, Implementation, ProtocolVersion, ServerCapabilities,
    ServerInfo,
};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

pub const SERVER_NAME: &str = "hackerbot";

/// Serves frames from the arm camera to a calling agent.
#[derive(Clone)]
pub struct HackerbotMcp {
    hardware: Arc<SharedHardware>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl HackerbotMcp {
    pub fn new(hardware: Arc<SharedHardware>) -> Self {
        Self {
            hardware,
            tool_router: Self::tool_router(),
        }
    }

    /// Base64 JPEG of the current view. A failed capture is a tool error, not a protocol one.
    #[tool(description = "Gets the image from the Hackerbot on-arm camera")]
    pub async fn get_camera_image(&self) -> Result<CallToolResult, ErrorData> {
        let image = match self.hardware.capture().await.and_then(|f| f.to_image_data()) {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "Camera capture failed");
                return Ok(CallToolResult::error(vec![Content::text(e.to_string())]));
            }
        };

        info!(bytes = image.bytes.len(), "Captured camera image for tool call");
        Ok(CallToolResult::success(vec![Content::image(
            image.to_base64(),
            image.mime_type,
        )]))
    }
}

#[tool_handler]
impl ServerHandler for HackerbotMcp {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = SERVER_NAME.to_string();
        server_info.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info,
            instructions: Some(
                "Call get_camera_image to see through the Hackerbot arm camera.".to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::camera::{FileCamera, FrameSource, SyntheticCamera};
    use base64::Engine;

    fn server_with(camera: Arc<dyn FrameSource>) -> HackerbotMcp {
        HackerbotMcp::new(Arc::new(SharedHardware::new(camera, None)))
    }

    #[test]
    fn test_server_info() {
        let info = server_with(Arc::new(SyntheticCamera::new(8, 8))).get_info();

        assert_eq!(info.server_info.name, "hackerbot");
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.protocol_version, ProtocolVersion::LATEST);
    }

    #[tokio::test]
    async fn test_camera_image_is_jpeg_content() {
        let server = server_with(Arc::new(SyntheticCamera::new(32, 24)));

        let result = server.get_camera_image().await.unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isError"], false);
        assert_eq!(json["content"][0]["type"], "image");
        assert_eq!(json["content"][0]["mimeType"], "image/jpeg");
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(json["content"][0]["data"].as_str().unwrap())
            .unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_camera_failure_is_tool_error() {
        let server = server_with(Arc::new(FileCamera::new("/nonexistent.jpg", 8, 8)));

        let result = server.get_camera_image().await.unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isError"], true);
        assert!(json["content"][0]["text"].as_str().unwrap().starts_with("Camera error"));
    }
}

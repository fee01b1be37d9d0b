//! Per-message orchestration.
//!
//! One turn: capture a frame, show it, build the prompt for the current mode, query the
//! model, show the answer, then (locate/center) parse the box, annotate, and optionally move
//! the arm. The mode-selection actions are offered again at the end of every turn.
//!
//! Device and model failures end the turn with an error. An answer the parser cannot read
//! and a move outside the joint limits are reported to the user instead.

use crate::assistant::surface::{Action, ChatSurface, OutboundMessage};
use crate::config::{AssistantConfig, VariantProfile};
use crate::error::{BoxParseError, GeometryError, HackerbotError, Result};
use crate::hardware::SharedHardware;
use crate::llm::LlmBroker;
use crate::session::{InteractionMode, Session};
use crate::vision::bounding_box::{BoundingBox, BoxSpace};
use crate::vision::frame::Frame;
use crate::vision::geometry::{
    annotation_rect, CameraModel, JointLimits, JointVector, PanTilt, PixelRect,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Speed passed with every arm command
pub const ARM_SPEED: u32 = 0;

/// What happened during one turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnReport {
    pub mode: InteractionMode,
    pub response: String,
    pub located: Option<BoundingBox>,
    pub annotation: Option<PixelRect>,
    pub parse_error: Option<BoxParseError>,
    pub correction: Option<PanTilt>,
    pub commanded: Option<JointVector>,
    pub rejected: Option<GeometryError>,
}

pub struct Assistant {
    broker: LlmBroker,
    hardware: Arc<SharedHardware>,
    profile: VariantProfile,
    camera_model: CameraModel,
    joint_limits: JointLimits,
}

impl Assistant {
    pub fn new(
        broker: LlmBroker,
        hardware: Arc<SharedHardware>,
        profile: VariantProfile,
        camera_model: CameraModel,
        joint_limits: JointLimits,
    ) -> Self {
        Self {
            broker,
            hardware,
            profile,
            camera_model,
            joint_limits,
        }
    }

    /// Build from configuration around hardware shared with other sessions.
    pub fn from_config(config: &AssistantConfig, hardware: Arc<SharedHardware>) -> Result<Self> {
        Ok(Self::new(
            config.build_broker()?,
            hardware,
            config.variant.clone(),
            config.camera_model,
            config.joint_limits,
        ))
    }

    pub fn profile(&self) -> &VariantProfile {
        &self.profile
    }

    pub fn new_session(&self) -> Session {
        Session::new(&self.profile.modes)
    }

    /// Home the arm (when this variant drives it), enter chat mode and offer the actions.
    pub async fn start_session(
        &self,
        session: &mut Session,
        surface: &dyn ChatSurface,
    ) -> Result<()> {
        info!(
            session = %session.id(),
            variant = %self.profile.name,
            model = %self.broker.model(),
            "Starting chat"
        );

        if self.profile.drives_arm() {
            info!("Resetting arm joints");
            let home = JointVector::zero();
            self.hardware.move_arm(&home, ARM_SPEED).await?;
            session.set_joints(home);
        }

        session.select(InteractionMode::Chat)?;
        self.offer_actions(session, surface).await
    }

    /// Apply an action button press and acknowledge it.
    pub async fn select_action(
        &self,
        session: &mut Session,
        action: &str,
        surface: &dyn ChatSurface,
    ) -> Result<InteractionMode> {
        let mode = session.select_action(action)?;
        info!(session = %session.id(), mode = %mode, "Mode selected");
        surface.send(OutboundMessage::text(mode.acknowledgement())).await?;
        Ok(mode)
    }

    pub async fn offer_actions(&self, session: &Session, surface: &dyn ChatSurface) -> Result<()> {
        let actions: Vec<Action> =
            session.offered_modes().iter().copied().map(Action::from).collect();
        let text = format!("Set the interaction mode. The current mode is: {}", session.mode());
        surface.send(OutboundMessage::text(text).with_actions(actions)).await
    }

    /// Process one user message to completion.
    pub async fn handle_message(
        &self,
        session: &mut Session,
        text: &str,
        surface: &dyn ChatSurface,
    ) -> Result<TurnReport> {
        let mode = session.mode();
        if !self.profile.offers(mode) {
            return Err(HackerbotError::InvalidMode(mode.to_string()));
        }

        let frame = self.hardware.capture().await?;
        let image = frame.to_image_data()?;
        surface.send(OutboundMessage::image("Camera image", image.clone())).await?;

        let prompt = if mode.locates() {
            self.profile.locate_prompt(text, frame.width(), frame.height())
        } else {
            text.to_string()
        };

        let response = self.broker.ask_about_image(image, &prompt).await?;
        surface.send(OutboundMessage::text(response.clone())).await?;

        let mut report = TurnReport {
            mode,
            response,
            ..Default::default()
        };

        if mode.locates() {
            self.locate(session, &frame, surface, &mut report).await?;
        }

        self.offer_actions(session, surface).await?;
        Ok(report)
    }

    async fn locate(
        &self,
        session: &mut Session,
        frame: &Frame,
        surface: &dyn ChatSurface,
        report: &mut TurnReport,
    ) -> Result<()> {
        let (width, height) = (frame.width(), frame.height());

        let bbox = match self.profile.parser().parse(&report.response, width, height) {
            Ok(Some(bbox)) => bbox,
            Ok(None) => {
                info!("Object not found");
                surface
                    .send(OutboundMessage::text("The object was not found in the camera view."))
                    .await?;
                return Ok(());
            }
            Err(err) => {
                warn!(error = %err, "Could not parse location");
                surface
                    .send(OutboundMessage::text(format!("Could not parse location: {}", err)))
                    .await?;
                report.parse_error = Some(err);
                return Ok(());
            }
        };
        report.located = Some(bbox);

        let rect = annotation_rect(&bbox, self.profile.space, width, height);
        info!(start = %rect.start, end = %rect.end, "Annotating frame");
        let caption = format!(
            "Annotated image (start_point={}, end_point={})",
            rect.start, rect.end
        );
        let annotated = frame.annotated(&rect).to_image_data()?;
        surface.send(OutboundMessage::image(caption, annotated)).await?;
        report.annotation = Some(rect);

        if report.mode == InteractionMode::Center {
            let normalized = normalize(&bbox, self.profile.space, width, height);
            self.center(session, &normalized, surface, report).await?;
        }

        Ok(())
    }

    async fn center(
        &self,
        session: &mut Session,
        bbox: &BoundingBox,
        surface: &dyn ChatSurface,
        report: &mut TurnReport,
    ) -> Result<()> {
        let delta = self.camera_model.pan_tilt_delta(bbox);
        let target = session.joints().offset_by(delta);
        report.correction = Some(delta);
        info!(pan = delta.pan, tilt = delta.tilt, joints = %target, "Computed centering move");

        if let Err(err) = self.joint_limits.check(&target) {
            warn!(error = %err, "Refusing arm move");
            surface.send(OutboundMessage::text(format!("Not moving the arm: {}", err))).await?;
            report.rejected = Some(err);
            return Ok(());
        }

        surface
            .send(OutboundMessage::text(format!(
                "Panning {:.2} degrees to the left and tilting {:.2} degrees up",
                delta.pan, delta.tilt
            )))
            .await?;
        self.hardware.move_arm(&target, ARM_SPEED).await?;
        session.set_joints(target);
        report.commanded = Some(target);

        Ok(())
    }
}

fn normalize(bbox: &BoundingBox, space: BoxSpace, width: u32, height: u32) -> BoundingBox {
    match space {
        BoxSpace::Normalized => *bbox,
        BoxSpace::Pixel => {
            let (w, h) = (f64::from(width), f64::from(height));
            BoundingBox::new(bbox.xmin / w, bbox.ymin / h, bbox.xmax / w, bbox.ymax / h)
        }
    }
}

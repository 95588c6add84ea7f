//! One open sheet editor.
//!
//! Owns the camera, placing tool, selection and components for a single
//! sheet. Sessions share nothing but the FileManager, so several can be open
//! side by side.

use std::sync::Arc;

use compass_domain::{Component, ComponentDraft, ComponentId, ComponentType, SheetId};

use super::assets::AssetCache;
use super::camera::{Camera, Point};
use super::events::{EditorEvent, EditorEventBus};
use crate::infrastructure::ports::{ClockPort, FileManager};

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Escape,
    Delete,
    Backspace,
    ZoomIn,
    ZoomOut,
    ResetZoom,
}

impl EditorKey {
    /// Map a keyboard key name (`KeyboardEvent.key` style).
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "Escape" => Some(Self::Escape),
            "Delete" => Some(Self::Delete),
            "Backspace" => Some(Self::Backspace),
            "+" | "=" => Some(Self::ZoomIn),
            "-" => Some(Self::ZoomOut),
            "0" => Some(Self::ResetZoom),
            _ => None,
        }
    }
}

pub struct EditorSession {
    sheet_id: SheetId,
    camera: Camera,
    placing_type: Option<ComponentType>,
    selection: Vec<ComponentId>,
    components: Vec<Component>,
    assets: AssetCache,
    events: EditorEventBus,
    clock: Arc<dyn ClockPort>,
}

impl EditorSession {
    pub fn new(sheet_id: SheetId, file_manager: Arc<dyn FileManager>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            sheet_id,
            camera: Camera::default(),
            placing_type: None,
            selection: Vec::new(),
            components: Vec::new(),
            assets: AssetCache::new(file_manager),
            events: EditorEventBus::new(),
            clock,
        }
    }

    pub fn sheet_id(&self) -> SheetId {
        self.sheet_id
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn events(&self) -> &EditorEventBus {
        &self.events
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.iter().find(|c| c.id() == id)
    }

    pub fn selection(&self) -> &[ComponentId] {
        &self.selection
    }

    pub fn placing_type(&self) -> Option<ComponentType> {
        self.placing_type
    }

    pub fn set_placing_type(&mut self, placing_type: Option<ComponentType>) {
        if self.placing_type == placing_type {
            return;
        }
        self.placing_type = placing_type;
        self.events.publish(EditorEvent::PlacingTypeChanged(placing_type));
    }

    /// Add a component to this sheet.
    ///
    /// Incomplete drafts are logged and dropped; nothing is added.
    pub fn create_component(&mut self, mut draft: ComponentDraft) -> Option<Component> {
        draft.sheet_id = draft.sheet_id.or(Some(self.sheet_id));
        let component = match Component::create(draft, self.clock.now()) {
            Ok(component) => component,
            Err(e) => {
                tracing::warn!(sheet_id = %self.sheet_id, error = %e, "Rejected component");
                return None;
            }
        };

        tracing::debug!(
            component_id = %component.id(),
            component_type = %component.component_type,
            "Component created"
        );
        self.components.push(component.clone());
        self.events.publish(EditorEvent::ComponentCreated(component.id()));
        Some(component)
    }

    /// Drop the current placing type at a screen position.
    pub fn place_at(&mut self, screen: Point) -> Option<Component> {
        let component_type = self.placing_type?;
        let world = self.camera.screen_to_world(screen);
        let placed = self.create_component(ComponentDraft::new(component_type, world.x, world.y));
        self.set_placing_type(None);
        placed
    }

    /// Select `id`, adding to the selection when `additive`.
    pub fn select(&mut self, id: ComponentId, additive: bool) {
        if self.component(id).is_none() {
            return;
        }
        if !additive {
            self.selection.clear();
        }
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
        self.publish_selection();
    }

    pub fn clear_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.publish_selection();
    }

    pub fn remove_selected(&mut self) -> Vec<ComponentId> {
        if self.selection.is_empty() {
            return Vec::new();
        }
        let removed = std::mem::take(&mut self.selection);
        self.components.retain(|c| !removed.contains(&c.id()));

        self.events.publish(EditorEvent::ComponentsRemoved(removed.clone()));
        self.publish_selection();
        removed
    }

    pub fn zoom_at(&mut self, factor: f64, focal: Point) {
        self.camera.zoom_at(factor, focal);
        self.publish_camera();
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.camera.pan_by(dx, dy);
        self.publish_camera();
    }

    /// Returns whether the key did anything.
    pub fn handle_key(&mut self, key: EditorKey) -> bool {
        match key {
            EditorKey::Escape => {
                let busy = self.placing_type.is_some() || !self.selection.is_empty();
                self.set_placing_type(None);
                self.clear_selection();
                busy
            }
            EditorKey::Delete | EditorKey::Backspace => !self.remove_selected().is_empty(),
            EditorKey::ZoomIn => self.adjust_camera(Camera::zoom_in),
            EditorKey::ZoomOut => self.adjust_camera(Camera::zoom_out),
            EditorKey::ResetZoom => self.adjust_camera(Camera::reset),
        }
    }

    fn adjust_camera(&mut self, adjust: fn(&mut Camera)) -> bool {
        let before = self.camera;
        adjust(&mut self.camera);
        if self.camera == before {
            return false;
        }
        self.publish_camera();
        true
    }

    fn publish_camera(&self) {
        self.events.publish(EditorEvent::CameraChanged {
            zoom: self.camera.zoom(),
            pan: self.camera.pan(),
        });
    }

    fn publish_selection(&self) {
        self.events
            .publish(EditorEvent::SelectionChanged(self.selection.clone()));
    }
}

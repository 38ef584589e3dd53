//! Controller registration with the host.
//!
//! Serial devices cannot be found automatically, so discovery only makes
//! sure one manually configurable controller exists.

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_PORT;

pub const IMAGE_URL: &str = "https://assets.signalrgb.com/devices/brands/adalight/misc/led-strip.png";
pub const ICON_URL: &str = "https://assets.signalrgb.com/brands/adalight/logo.png";

/// A controller as the host registry sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerInstance {
    pub id: String,
    pub name: String,
    pub port: String,
    pub image_url: String,
}

impl Default for ControllerInstance {
    fn default() -> Self {
        ControllerInstance::for_port(DEFAULT_PORT)
    }
}

/// Identity fields the host may push to a controller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerUpdate {
    pub id: Option<String>,
    pub port: Option<String>,
}

impl ControllerInstance {
    pub fn for_port(port: &str) -> Self {
        ControllerInstance {
            id: format!("Adalight-{}", port),
            name: format!("Adalight {}", port),
            port: port.to_string(),
            image_url: IMAGE_URL.to_string(),
        }
    }

    /// Apply a host update; the name always follows the port
    pub fn update_with_value(
        &mut self,
        value: &ControllerUpdate,
        notify: bool,
        registry: &mut dyn ControllerRegistry,
    ) {
        let previous_id = self.id.clone();
        if let Some(port) = value.port.as_deref().filter(|p| !p.is_empty()) {
            self.port = port.to_string();
        }
        if let Some(id) = value.id.as_deref().filter(|id| !id.is_empty()) {
            self.id = id.to_string();
        }
        self.name = format!("Adalight {}", self.port);

        if notify {
            registry.update_controller(&previous_id, self);
        }
    }
}

/// Host-side list of known controllers
pub trait ControllerRegistry {
    fn controllers(&self) -> &[ControllerInstance];

    fn add_controller(&mut self, controller: ControllerInstance);

    fn announce_controller(&mut self, controller: &ControllerInstance);

    /// Replace the controller registered as `previous_id`
    fn update_controller(&mut self, previous_id: &str, controller: &ControllerInstance);
}

#[derive(Debug)]
pub struct DiscoveryService {
    pub icon_url: &'static str,
}

impl Default for DiscoveryService {
    fn default() -> Self {
        DiscoveryService { icon_url: ICON_URL }
    }
}

impl DiscoveryService {
    pub fn initialize(&self) {
        info!("Adalight discovery service initialized");
    }

    /// Register and announce a default controller if the host has none
    pub fn update(&self, registry: &mut dyn ControllerRegistry) {
        if !registry.controllers().is_empty() {
            return;
        }
        let controller = ControllerInstance::default();
        info!("Constructed: {}", controller.name);
        registry.add_controller(controller.clone());
        registry.announce_controller(&controller);
    }
}

/// Registry kept in process memory by the standalone host
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    controllers: Vec<ControllerInstance>,
    announced: Vec<String>,
}

impl InMemoryRegistry {
    pub fn announced(&self) -> &[String] {
        &self.announced
    }
}

impl ControllerRegistry for InMemoryRegistry {
    fn controllers(&self) -> &[ControllerInstance] {
        &self.controllers
    }

    fn add_controller(&mut self, controller: ControllerInstance) {
        self.controllers.push(controller);
    }

    fn announce_controller(&mut self, controller: &ControllerInstance) {
        info!("Announced controller {} ({})", controller.name, controller.id);
        self.announced.push(controller.id.clone());
    }

    fn update_controller(&mut self, previous_id: &str, controller: &ControllerInstance) {
        match self.controllers.iter_mut().find(|c| c.id == previous_id) {
            Some(existing) => *existing = controller.clone(),
            None => self.controllers.push(controller.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_controller() {
        let controller = ControllerInstance::default();
        assert_eq!(controller.id, "Adalight-COM4");
        assert_eq!(controller.name, "Adalight COM4");
        assert_eq!(controller.port, "COM4");
        assert_eq!(controller.image_url, IMAGE_URL);
    }

    #[test]
    fn test_update_adds_default_once() {
        let service = DiscoveryService::default();
        let mut registry = InMemoryRegistry::default();
        service.update(&mut registry);
        service.update(&mut registry);

        assert_eq!(registry.controllers().len(), 1);
        assert_eq!(registry.announced(), &["Adalight-COM4".to_string()]);
    }

    #[test]
    fn test_update_with_value_renames_and_notifies() {
        let mut registry = InMemoryRegistry::default();
        let mut controller = ControllerInstance::default();
        registry.add_controller(controller.clone());

        let update = ControllerUpdate { id: None, port: Some("COM7".into()) };
        controller.update_with_value(&update, true, &mut registry);

        assert_eq!(controller.name, "Adalight COM7");
        assert_eq!(controller.id, "Adalight-COM4");
        assert_eq!(registry.controllers(), &[controller]);
    }

    #[test]
    fn test_update_changing_id_and_port_replaces_entry() {
        let mut registry = InMemoryRegistry::default();
        let mut controller = ControllerInstance::default();
        registry.add_controller(controller.clone());

        let update = ControllerUpdate { id: Some("strip-1".into()), port: Some("COM8".into()) };
        controller.update_with_value(&update, true, &mut registry);

        assert_eq!(registry.controllers().len(), 1);
        assert_eq!(registry.controllers()[0].id, "strip-1");
        assert_eq!(registry.controllers()[0].name, "Adalight COM8");

        // A second update is keyed on the new id
        let update = ControllerUpdate { id: None, port: Some("COM9".into()) };
        controller.update_with_value(&update, true, &mut registry);
        assert_eq!(registry.controllers(), &[controller]);
    }

    #[test]
    fn test_update_without_notify() {
        let mut registry = InMemoryRegistry::default();
        let mut controller = ControllerInstance::default();
        let update = ControllerUpdate { id: Some("strip-1".into()), port: Some("COM8".into()) };
        controller.update_with_value(&update, false, &mut registry);

        assert_eq!(controller.id, "strip-1");
        assert_eq!(controller.name, "Adalight COM8");
        assert!(registry.controllers().is_empty());
    }
}

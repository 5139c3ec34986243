use std::sync::Arc;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::error::OsError;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "ImGUI Example".to_string(),
            width: 1280,
            height: 720,
            resizable: false,
        }
    }
}

/// Create the main window, centered on the primary monitor when one is known.
pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &PlatformConfig,
) -> Result<Arc<Window>, OsError> {
    let mut attrs = WindowAttributes::default()
        .with_title(&config.title)
        .with_inner_size(LogicalSize::new(config.width, config.height))
        .with_resizable(config.resizable);

    if let Some(monitor) = event_loop.primary_monitor() {
        let window_size: PhysicalSize<u32> =
            LogicalSize::new(config.width, config.height).to_physical(monitor.scale_factor());
        let offset = centered_position(monitor.size(), window_size);
        let origin = monitor.position();
        attrs = attrs.with_position(PhysicalPosition::new(
            origin.x + offset.x,
            origin.y + offset.y,
        ));
    } else {
        log::debug!("No primary monitor reported; leaving window placement to the OS");
    }

    let window = event_loop.create_window(attrs)?;
    Ok(Arc::new(window))
}

/// Top-left offset that centers `window` inside `monitor`. A window larger
/// than the monitor is pinned to the monitor origin.
pub fn centered_position(
    monitor: PhysicalSize<u32>,
    window: PhysicalSize<u32>,
) -> PhysicalPosition<i32> {
    let x = (monitor.width.saturating_sub(window.width) / 2) as i32;
    let y = (monitor.height.saturating_sub(window.height) / 2) as i32;
    PhysicalPosition::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_centered_on_monitor() {
        let pos = centered_position(PhysicalSize::new(1920, 1080), PhysicalSize::new(1280, 720));
        assert_eq!(pos, PhysicalPosition::new(320, 180));
    }

    #[test]
    fn oversized_window_is_pinned_to_origin() {
        let pos = centered_position(PhysicalSize::new(1024, 768), PhysicalSize::new(1280, 720));
        assert_eq!(pos, PhysicalPosition::new(0, 24));
    }

    #[test]
    fn default_config_matches_demo_window() {
        let config = PlatformConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(!config.resizable);
    }
}

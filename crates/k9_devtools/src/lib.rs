pub mod panel;

pub use panel::{
    draw_panel, AudioCommand, DevPanel, MusicStatus, PanelActions, PanelState, PanelStatus,
    PendingTextures,
};

mod cinematic;
mod menu;
mod pause;
mod world;

pub use cinematic::IntroCinematicPanel;
pub use menu::MainMenuPanel;
pub use pause::PauseMenuPanel;
pub use world::WorldPanel;

pub(crate) const CURSOR_ARROW_SPRITE_KEY: &str = "cursor/arrow";

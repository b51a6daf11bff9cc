//! Screen state machine: main menu, playing, paused, plus the info dialogs
//! and the unlock popup.

use folio_core::events::{EventBus, GameEvent};

use crate::projects::{ProjectCatalog, ProjectDef};
use crate::tasks::{GameTask, Scheduler};

pub const INSTRUCTIONS: &str = "INSTRUCCIONES:\n\n- Moverse: W, A, S, D\n- Mirar alrededor: Ratón\n- Interactuar: Click izquierdo\n- Pausa: ESC\n\nExplora el mundo para descubrir mis proyectos";
pub const CREDITS: &str =
    "CRÉDITOS:\n\nJuan David Solano Martinez\nMúsica y efectos: Libre de derechos";

const RELOCK_DELAY_SECS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Menu,
    Playing,
    Paused,
}

impl MenuState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    Instructions,
    Credits,
}

impl Dialog {
    pub fn text(&self) -> &'static str {
        match self {
            Self::Instructions => INSTRUCTIONS,
            Self::Credits => CREDITS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Play,
    /// The pause key. Only pauses; resuming is a button.
    Pause,
    Resume,
    ReturnToMenu,
    ShowInstructions,
    ShowCredits,
    DismissDialog,
    ClosePopup,
}

/// What the music should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicCue {
    Play,
    Pause,
}

/// Process-wide flags, passed around instead of living in globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppState {
    /// Simulation and input are live.
    pub running: bool,
    /// The window should hold the cursor grabbed and hidden.
    pub cursor_captured: bool,
}

pub struct MenuController {
    pub state: MenuState,
    pub app: AppState,
    pub dialog: Option<Dialog>,
    pub popup: Option<ProjectDef>,
    catalog: ProjectCatalog,
}

impl MenuController {
    pub fn new(catalog: ProjectCatalog) -> Self {
        Self {
            state: MenuState::Menu,
            app: AppState::default(),
            dialog: None,
            popup: None,
            catalog,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == MenuState::Playing
    }

    /// Firing needs a live game with no popup over it.
    pub fn can_fire(&self) -> bool {
        self.is_playing() && self.popup.is_none()
    }

    fn enter(&mut self, state: MenuState, events: &mut EventBus) {
        self.state = state;
        self.app.running = state == MenuState::Playing;
        self.app.cursor_captured = self.app.running && self.popup.is_none();
        tracing::info!("Menu state: {}", state.as_str());
        events.emit(GameEvent::StateChanged {
            state: state.as_str().to_string(),
        });
    }

    /// Apply a user action. Actions that make no sense in the current state
    /// are ignored.
    pub fn apply(
        &mut self,
        action: MenuAction,
        scheduler: &mut Scheduler,
        events: &mut EventBus,
    ) -> Option<MusicCue> {
        match (action, self.state) {
            (MenuAction::Play, MenuState::Menu) => {
                self.dialog = None;
                self.enter(MenuState::Playing, events);
                Some(MusicCue::Play)
            }
            (MenuAction::Pause, MenuState::Playing) => {
                self.enter(MenuState::Paused, events);
                Some(MusicCue::Pause)
            }
            (MenuAction::Resume, MenuState::Paused) => {
                self.enter(MenuState::Playing, events);
                Some(MusicCue::Play)
            }
            (MenuAction::ReturnToMenu, MenuState::Paused) => {
                self.enter(MenuState::Menu, events);
                Some(MusicCue::Pause)
            }
            (MenuAction::ShowInstructions, MenuState::Menu) => {
                self.dialog = Some(Dialog::Instructions);
                None
            }
            (MenuAction::ShowCredits, MenuState::Menu) => {
                self.dialog = Some(Dialog::Credits);
                None
            }
            (MenuAction::DismissDialog, _) => {
                self.dialog = None;
                None
            }
            (MenuAction::ClosePopup, _) if self.popup.is_some() => {
                self.popup = None;
                events.emit(GameEvent::PopupClosed);
                if self.app.running {
                    scheduler.schedule(RELOCK_DELAY_SECS, GameTask::RelockCursor);
                }
                None
            }
            (action, state) => {
                tracing::debug!("Ignoring {:?} in {}", action, state.as_str());
                None
            }
        }
    }

    /// Show the popup for a freshly unlocked target and free the cursor.
    pub fn on_unlocked(&mut self, name: &str, events: &mut EventBus) {
        let info = self.catalog.lookup(name);
        tracing::info!("Showing project popup: {}", info.name);
        self.popup = Some(info);
        self.app.cursor_captured = false;
        events.emit(GameEvent::PopupOpened {
            name: name.to_string(),
        });
    }

    /// Returns false for tasks handled elsewhere.
    pub fn run_task(&mut self, task: GameTask) -> bool {
        if task != GameTask::RelockCursor {
            return false;
        }
        if self.app.running && self.popup.is_none() {
            self.app.cursor_captured = true;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> (MenuController, Scheduler, EventBus) {
        (
            MenuController::new(ProjectCatalog::new(&[])),
            Scheduler::new(),
            EventBus::new(100),
        )
    }

    #[test]
    fn test_play_pause_resume() {
        let (mut menu, mut sched, mut bus) = controller();
        assert_eq!(menu.apply(MenuAction::Play, &mut sched, &mut bus), Some(MusicCue::Play));
        assert!(menu.app.running);
        assert!(menu.app.cursor_captured);

        assert_eq!(menu.apply(MenuAction::Pause, &mut sched, &mut bus), Some(MusicCue::Pause));
        assert_eq!(menu.state, MenuState::Paused);
        assert!(!menu.app.cursor_captured);

        // The pause key does not unpause.
        assert_eq!(menu.apply(MenuAction::Pause, &mut sched, &mut bus), None);
        assert_eq!(menu.state, MenuState::Paused);

        assert_eq!(menu.apply(MenuAction::Resume, &mut sched, &mut bus), Some(MusicCue::Play));
        assert!(menu.is_playing());
    }

    #[test]
    fn test_pause_ignored_in_menu() {
        let (mut menu, mut sched, mut bus) = controller();
        assert_eq!(menu.apply(MenuAction::Pause, &mut sched, &mut bus), None);
        assert_eq!(menu.state, MenuState::Menu);
    }

    #[test]
    fn test_return_to_menu() {
        let (mut menu, mut sched, mut bus) = controller();
        menu.apply(MenuAction::Play, &mut sched, &mut bus);
        menu.apply(MenuAction::Pause, &mut sched, &mut bus);
        assert_eq!(
            menu.apply(MenuAction::ReturnToMenu, &mut sched, &mut bus),
            Some(MusicCue::Pause)
        );
        assert_eq!(menu.state, MenuState::Menu);
        assert!(!menu.app.running);
    }

    #[test]
    fn test_dialogs() {
        let (mut menu, mut sched, mut bus) = controller();
        menu.apply(MenuAction::ShowCredits, &mut sched, &mut bus);
        assert_eq!(menu.dialog, Some(Dialog::Credits));
        menu.apply(MenuAction::DismissDialog, &mut sched, &mut bus);
        assert_eq!(menu.dialog, None);
        menu.apply(MenuAction::ShowInstructions, &mut sched, &mut bus);
        assert!(menu.dialog.unwrap().text().contains("ESC"));
    }

    #[test]
    fn test_popup_releases_and_relocks_cursor() {
        let (mut menu, mut sched, mut bus) = controller();
        menu.apply(MenuAction::Play, &mut sched, &mut bus);
        menu.on_unlocked("MERITOS", &mut bus);
        assert!(!menu.app.cursor_captured);
        assert!(!menu.can_fire());
        assert_eq!(menu.popup.as_ref().unwrap().description, "graduado del colegio claret");

        menu.apply(MenuAction::ClosePopup, &mut sched, &mut bus);
        assert!(menu.popup.is_none());
        assert!(!menu.app.cursor_captured);

        let due = sched.advance(0.05);
        assert!(due.is_empty());
        for task in sched.advance(0.1) {
            assert!(menu.run_task(task));
        }
        assert!(menu.app.cursor_captured);
        assert!(menu.can_fire());
    }

    #[test]
    fn test_relock_skipped_when_paused() {
        let (mut menu, mut sched, mut bus) = controller();
        menu.apply(MenuAction::Play, &mut sched, &mut bus);
        menu.on_unlocked("HOJA DE VIDA", &mut bus);
        menu.apply(MenuAction::ClosePopup, &mut sched, &mut bus);
        menu.apply(MenuAction::Pause, &mut sched, &mut bus);
        for task in sched.advance(1.0) {
            menu.run_task(task);
        }
        assert!(!menu.app.cursor_captured);
    }
}

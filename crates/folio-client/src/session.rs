//! One walkthrough session: owns every game system and runs the frame loop.
//! No window or GPU is needed; the windowed engine and the scripted runner
//! both drive this.

use std::path::{Path, PathBuf};

use glam::Vec3;
use winit::keyboard::KeyCode;

use folio_core::events::{EventBus, GameEvent};
use folio_core::schedule::IntervalTimer;

use crate::assets::{AssetError, AssetLoader, LoadMode, LoadedAsset};
use crate::audio::MusicPlayer;
use crate::combat::{self, ShotContext, ShotOutcome, Weapon};
use crate::decor::DecorSet;
use crate::entities::EntityManager;
use crate::input::{InputBindings, InputState};
use crate::menu::{MenuAction, MenuController, MenuState, MusicCue};
use crate::physics::CollisionWorld;
use crate::player::{PlayerController, RestoreOutcome};
use crate::project_config::FolioConfig;
use crate::projects::ProjectCatalog;
use crate::storage::{FileStore, KeyValueStore, MemoryStore, SavedPosition, POSITION_KEY};
use crate::tasks::{GameTask, Scheduler};
use crate::world::{self, WorldState};

/// What an asset request was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKey {
    World,
    Weapon,
    Target(usize),
    Decor(usize),
}

pub struct GameSession {
    pub project_root: PathBuf,
    pub config: FolioConfig,
    pub input: InputState,
    pub collision: CollisionWorld,
    pub world_state: WorldState,
    pub player: PlayerController,
    pub entities: EntityManager,
    pub weapon: Weapon,
    pub menu: MenuController,
    pub music: MusicPlayer,
    pub decor: DecorSet,
    pub scheduler: Scheduler,
    pub events: EventBus,
    pub restore_outcome: Option<RestoreOutcome>,
    pub last_shot: Option<ShotOutcome>,
    /// Game clock: only advances while playing.
    pub elapsed: f32,
    pub frame_count: u64,
    store: Box<dyn KeyValueStore>,
    loader: AssetLoader<AssetKey>,
    watchdog: IntervalTimer,
    autosave: IntervalTimer,
}

impl GameSession {
    pub fn new(
        project_root: &Path,
        config: FolioConfig,
        bindings: InputBindings,
        store: Box<dyn KeyValueStore>,
        music: MusicPlayer,
        load_mode: LoadMode,
    ) -> Self {
        let mut events = EventBus::new(config.events.log_capacity);
        if let Some(log_file) = &config.events.log_file {
            events.enable_file_logging(project_root.join(log_file));
        }

        let mut session = Self {
            project_root: project_root.to_path_buf(),
            input: InputState::new(bindings),
            collision: CollisionWorld::new(),
            world_state: WorldState::Loading,
            player: PlayerController::new(config.player.clone()),
            entities: EntityManager::new(config.targets.clone(), config.seed),
            weapon: Weapon::new(),
            menu: MenuController::new(ProjectCatalog::new(&config.projects)),
            music,
            decor: DecorSet::new(config.assets.decor.clone()),
            scheduler: Scheduler::new(),
            events,
            restore_outcome: None,
            last_shot: None,
            elapsed: 0.0,
            frame_count: 0,
            store,
            loader: AssetLoader::new(project_root, load_mode),
            watchdog: IntervalTimer::new(config.save.watchdog_secs),
            autosave: IntervalTimer::new(config.save.autosave_secs),
            config,
        };
        session.request_assets();
        session
    }

    /// Session for a window: background loading, real audio, save file on disk.
    pub fn windowed(project_root: &Path, config: FolioConfig) -> Self {
        let bindings = crate::input::load_bindings(project_root);
        let store = FileStore::open(&project_root.join(&config.save.file));
        let music = MusicPlayer::new(project_root, &config.audio);
        Self::new(project_root, config, bindings, Box::new(store), music, LoadMode::Background)
    }

    /// Session without window or audio. Loads run inline so every run of
    /// the same script sees the same frames.
    pub fn headless(project_root: &Path, config: FolioConfig, persist: bool) -> Self {
        let bindings = crate::input::load_bindings(project_root);
        let store: Box<dyn KeyValueStore> = if persist {
            Box::new(FileStore::open(&project_root.join(&config.save.file)))
        } else {
            Box::new(MemoryStore::new())
        };
        let music = MusicPlayer::disabled(project_root, &config.audio);
        Self::new(project_root, config, bindings, store, music, LoadMode::Inline)
    }

    fn request_assets(&mut self) {
        let assets = self.config.assets.clone();
        self.loader.request_model(AssetKey::World, &assets.world);
        self.loader.request_model(AssetKey::Weapon, &assets.weapon);
        for index in 0..self.config.targets.len() {
            self.loader.request_model(AssetKey::Target(index), &assets.target);
        }
        for (index, decor) in assets.decor.iter().enumerate() {
            self.loader.request_image(AssetKey::Decor(index), &decor.image);
        }
    }

    pub fn assets_pending(&self) -> usize {
        self.loader.in_flight()
    }

    /// Block until outstanding loads finish, then apply them.
    pub fn wait_for_assets(&mut self, timeout: std::time::Duration) {
        for (key, result) in self.loader.wait_all(timeout) {
            self.on_asset(key, result);
        }
        self.events.flush();
    }

    fn on_asset(&mut self, key: AssetKey, result: Result<LoadedAsset, AssetError>) {
        let as_model = |r: Result<LoadedAsset, AssetError>| {
            r.and_then(|a| a.into_model().ok_or(AssetError::NoMeshes))
        };
        match key {
            AssetKey::World => {
                self.world_state = world::finish_world_load(&mut self.collision, as_model(result));
                match &self.world_state {
                    WorldState::Ready { surfaces } => self.events.emit(GameEvent::WorldLoaded {
                        surfaces: *surfaces,
                    }),
                    WorldState::Failed { error } => self.events.emit(GameEvent::WorldFailed {
                        error: error.clone(),
                    }),
                    WorldState::Loading => {}
                }
                self.collision.refresh();
                self.restore_position();
            }
            AssetKey::Weapon => self.weapon.on_model_loaded(as_model(result)),
            AssetKey::Target(index) => {
                self.entities.on_model_loaded(
                    index,
                    as_model(result),
                    &mut self.collision,
                    &mut self.events,
                );
            }
            AssetKey::Decor(index) => self.decor.on_image_loaded(index, result),
        }
    }

    /// Apply the saved pose once the world exists to validate it against.
    fn restore_position(&mut self) {
        let saved = SavedPosition::load(self.store.as_ref());
        if saved.is_none() && self.store.get(POSITION_KEY).is_some() {
            // Unreadable record: start over from a safe spawn and drop it.
            self.reset_player();
            self.restore_outcome = Some(RestoreOutcome::Substituted(self.player.position));
            return;
        }
        let outcome = self.player.restore(saved, &self.collision);
        if let RestoreOutcome::Substituted(position) = outcome {
            self.events.emit(GameEvent::PlayerReset {
                position: position.to_array(),
            });
        }
        self.restore_outcome = Some(outcome);
    }

    /// Back to safe ground; the stored position is forgotten.
    pub fn reset_player(&mut self) {
        let position = self.player.reset(&self.collision);
        if let Err(e) = SavedPosition::clear(self.store.as_mut()) {
            tracing::warn!("Failed to clear saved position: {}", e);
        }
        self.events.emit(GameEvent::PlayerReset {
            position: position.to_array(),
        });
    }

    /// Persist the position if plausible, otherwise drop the stored one.
    pub fn save_position(&mut self) {
        if self.player.is_saveable() {
            let snapshot = self.player.snapshot();
            match snapshot.store(self.store.as_mut()) {
                Ok(()) => {
                    tracing::debug!("Position saved: {:?}", snapshot);
                    self.events.emit(GameEvent::PositionSaved {
                        position: self.player.position.to_array(),
                    });
                }
                Err(e) => tracing::warn!("Failed to save position: {}", e),
            }
        } else {
            tracing::info!("Position {} not saved (out of bounds)", self.player.position);
            if let Err(e) = SavedPosition::clear(self.store.as_mut()) {
                tracing::warn!("Failed to clear saved position: {}", e);
            }
            self.events.emit(GameEvent::PositionDiscarded);
        }
    }

    pub fn saved_position(&self) -> Option<SavedPosition> {
        SavedPosition::load(self.store.as_ref())
    }

    pub fn apply_menu(&mut self, action: MenuAction) {
        match self.menu.apply(action, &mut self.scheduler, &mut self.events) {
            Some(MusicCue::Play) => self.music.play(),
            Some(MusicCue::Pause) => self.music.pause(),
            None => {}
        }
    }

    /// Raw-key menu shortcuts: Enter confirms, I/C open the dialogs,
    /// M leaves a paused game.
    fn handle_menu_keys(&mut self) {
        if self.input.just_pressed("pause") {
            self.apply_menu(MenuAction::Pause);
        }
        if self.input.just_pressed_key(KeyCode::Enter) {
            let action = if self.menu.dialog.is_some() {
                MenuAction::DismissDialog
            } else if self.menu.popup.is_some() {
                MenuAction::ClosePopup
            } else if self.menu.state == MenuState::Paused {
                MenuAction::Resume
            } else {
                MenuAction::Play
            };
            self.apply_menu(action);
        }
        if self.input.just_pressed_key(KeyCode::KeyI) {
            self.apply_menu(MenuAction::ShowInstructions);
        }
        if self.input.just_pressed_key(KeyCode::KeyC) {
            self.apply_menu(MenuAction::ShowCredits);
        }
        if self.input.just_pressed_key(KeyCode::KeyM) {
            self.apply_menu(MenuAction::ReturnToMenu);
        }
    }

    fn run_task(&mut self, task: GameTask) {
        let handled = self.weapon.run_task(task)
            || self.entities.run_task(task)
            || self.menu.run_task(task);
        if !handled {
            tracing::debug!("Unhandled task {:?}", task);
        }
    }

    /// Advance one frame using the current input state. The caller clears
    /// per-frame input afterwards.
    pub fn frame(&mut self, dt: f32) {
        for (key, result) in self.loader.poll() {
            self.on_asset(key, result);
        }

        self.handle_menu_keys();

        if self.menu.is_playing() {
            self.simulate(dt);
        }

        for record in self.events.flush() {
            if let GameEvent::TargetUnlocked { name } = &record.event {
                self.menu.on_unlocked(name, &mut self.events);
            }
        }
        self.frame_count += 1;
    }

    fn simulate(&mut self, dt: f32) {
        self.elapsed += dt;
        self.events.tick(dt as f64);

        for task in self.scheduler.advance(dt) {
            self.run_task(task);
        }
        self.collision.refresh();

        if self.input.just_pressed("reset_position") {
            self.reset_player();
        }
        if self.input.just_pressed("jump") {
            self.player.jump();
        }
        if self.menu.app.cursor_captured {
            self.player.look(self.input.mouse_delta());
        }
        self.player.update(dt, self.input.move_axis(), &self.collision);

        if self.menu.can_fire() && self.input.just_pressed("fire") {
            self.fire();
        }

        let eye = self.player.eye_position();
        self.entities.update(
            dt,
            self.elapsed,
            eye,
            &mut self.collision,
            &mut self.scheduler,
            &mut self.events,
        );
        self.collision.refresh();
        self.decor.update(self.elapsed);

        if self.watchdog.tick(dt) && self.player.is_fallen() {
            tracing::warn!("Player fell out of the world at {}", self.player.position);
            self.reset_player();
        }
        if self.autosave.tick(dt) {
            self.save_position();
        }
    }

    pub fn fire(&mut self) -> ShotOutcome {
        let outcome = combat::fire(
            &mut self.weapon,
            self.player.camera_matrix(),
            self.player.forward(),
            ShotContext {
                entities: &mut self.entities,
                collision: &self.collision,
                scheduler: &mut self.scheduler,
                events: &mut self.events,
            },
        );
        self.last_shot = Some(outcome.clone());
        outcome
    }

    /// Camera position, for labels and the title bar.
    pub fn eye_position(&self) -> Vec3 {
        self.player.eye_position()
    }

    /// One-line status for the window title.
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "{} [{}] targets {}/{}",
            self.config.name,
            self.menu.state.as_str(),
            self.entities.live_count(),
            self.entities.declared().len()
        );
        if self.assets_pending() > 0 {
            line.push_str(&format!(" | loading {}", self.assets_pending()));
        }
        if let Some(dialog) = self.menu.dialog {
            line.push_str(" | ");
            line.push_str(dialog.text().lines().next().unwrap_or_default());
        }
        if let Some(popup) = &self.menu.popup {
            line.push_str(&format!(" | {}: {} ({})", popup.name, popup.description, popup.link));
        }
        let p = self.player.position;
        line.push_str(&format!(" | pos {:.1} {:.1} {:.1}", p.x, p.y, p.z));
        line
    }
}

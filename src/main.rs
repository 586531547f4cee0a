//! Neon Arcade entry point
//!
//! The browser build mounts the game named by the location hash into
//! `#game-root` and mirrors the host view into the DOM HUD. The native build
//! plays a scripted headless session, handy for smoke tests and logs.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod web_app {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element, Window};

    use neon_arcade::audio::{AudioSink, WebAudio};
    use neon_arcade::highscores::{HighscoreStore, Identity, KvHighscoreStore};
    use neon_arcade::host::{GameHost, HostStatus, HostView, Platform};
    use neon_arcade::persistence::{LocalStorageBackend, MemoryBackend};
    use neon_arcade::platform::route_from_hash;
    use neon_arcade::platform::web::{DomInputSource, RafScheduler};
    use neon_arcade::renderer::canvas2d::CanvasSurfaceFactory;
    use neon_arcade::settings::Settings;

    const DEFAULT_GAME: &str = "dodge";

    fn local_player() -> Identity {
        Identity::new("local", None, None)
    }

    /// Highscores in LocalStorage, or in memory when storage is blocked
    fn open_store() -> (Rc<dyn HighscoreStore>, Settings) {
        match LocalStorageBackend::open() {
            Ok(backend) => {
                let settings = Settings::load(&backend);
                let store = KvHighscoreStore::new(backend);
                store.sign_in(local_player());
                (Rc::new(store), settings)
            }
            Err(e) => {
                log::warn!("{e}; highscores last for this page only");
                let store = KvHighscoreStore::new(MemoryBackend::new());
                store.sign_in(local_player());
                (Rc::new(store), Settings::default())
            }
        }
    }

    fn set_text(document: &Document, selector: &str, text: &str) {
        if let Some(el) = document.query_selector(selector).ok().flatten() {
            el.set_text_content(Some(text));
        }
    }

    fn sound_label(on: bool) -> &'static str {
        if on { "Sound: on" } else { "Sound: off" }
    }

    /// Flip sound, apply it to `audio` and persist the choice
    fn toggle_sound(settings: &RefCell<Settings>, audio: &WebAudio, button: &Element) {
        let mut settings = settings.borrow_mut();
        let on = match LocalStorageBackend::open() {
            Ok(backend) => settings.toggle_sound(&backend),
            Err(e) => {
                log::warn!("{e}; sound setting not saved");
                settings.toggle_sound(&MemoryBackend::new())
            }
        };
        audio.set_enabled(on);
        button.set_text_content(Some(sound_label(on)));
    }

    fn set_hidden(document: &Document, id: &str, hidden: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", if hidden { "hidden" } else { "" });
        }
    }

    /// Mirror the host view into the page
    fn update_hud(document: &Document, view: &HostView) {
        set_text(document, "#hud-title", view.title.unwrap_or("Neon Arcade"));
        set_text(document, "#hud-score .hud-value", &view.score.to_string());
        set_text(document, "#hud-best .hud-value", &view.best.to_string());
        set_text(document, "#status", view.status.message());

        let over = view.status == HostStatus::GameOver;
        set_hidden(document, "game-over", !over);
        if let Some(payload) = &view.game_over {
            set_text(document, "#final-score", &payload.score.to_string());
            set_text(document, "#final-reason", payload.reason.as_deref().unwrap_or(""));
        }
        set_hidden(document, "new-record", !(over && view.new_record));
    }

    fn mount_from_hash(host: &GameHost, window: &Window, container: &Element) {
        let hash = window.location().hash().unwrap_or_default();
        let game_id = route_from_hash(&hash).unwrap_or(DEFAULT_GAME);
        let width = container.client_width().max(0) as u32;
        let height = container.client_height().max(0) as u32;
        if let Err(e) = host.mount(game_id, width, height) {
            log::error!("{e}");
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"logger already initialized".into());
        }

        log::info!("Neon Arcade starting...");

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let container = document
            .get_element_by_id("game-root")
            .ok_or_else(|| JsValue::from_str("no #game-root element"))?;

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let (store, settings) = open_store();
        let web_audio = Rc::new(WebAudio::new(&settings));
        let audio: Rc<dyn AudioSink> = web_audio.clone();
        let sound_settings = Rc::new(RefCell::new(settings.clone()));
        let platform = Platform {
            scheduler: Rc::new(RafScheduler::new(window.clone())),
            input: Rc::new(DomInputSource::new(
                window.clone(),
                document.clone(),
                container.clone(),
            )),
            surfaces: Rc::new(CanvasSurfaceFactory::new(
                document.clone(),
                container.clone(),
                window.device_pixel_ratio(),
            )),
            audio: Some(audio),
            store,
            settings,
            seed: js_sys::Date::now() as u64,
        };
        let host = Rc::new(GameHost::new(platform));

        {
            let document = document.clone();
            host.set_observer(move |view| update_hud(&document, view));
        }

        mount_from_hash(&host, &window, &container);

        // Remount on navigation
        {
            let host = host.clone();
            let win = window.clone();
            let container = container.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                mount_from_hash(&host, &win, &container);
            });
            window.add_event_listener_with_callback("hashchange", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let host = host.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                host.restart();
            });
            btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("sound-btn") {
            btn.set_text_content(Some(sound_label(sound_settings.borrow().sound)));
            let button = btn.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                toggle_sound(&sound_settings, &web_audio, &button);
            });
            btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        log::info!("Neon Arcade running!");
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    web_app::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::rc::Rc;

    use neon_arcade::engine::{CountingInputSource, ManualScheduler};
    use neon_arcade::highscores::{HighscoreStore, Identity, KvHighscoreStore};
    use neon_arcade::host::{GameHost, HostStatus, Platform};
    use neon_arcade::persistence::MemoryBackend;
    use neon_arcade::renderer::RecordingSurfaceFactory;
    use neon_arcade::settings::Settings;

    const FRAME_MS: f64 = 1000.0 / 60.0;
    const MAX_FRAMES: usize = 60 * 120;
    /// Keys tapped in turn; covers every game's controls
    const SCRIPT: [&str; 9] = [
        "Space",
        "ArrowLeft",
        "ArrowUp",
        "ArrowRight",
        "ArrowDown",
        "Digit1",
        "Digit2",
        "Digit3",
        "Digit4",
    ];

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let game_id = std::env::args().nth(1).unwrap_or_else(|| "dodge".to_string());
    log::info!("Neon Arcade (native) starting {game_id} headless...");

    let scheduler = Rc::new(ManualScheduler::new());
    let input = Rc::new(CountingInputSource::new());
    let store = Rc::new(KvHighscoreStore::new(MemoryBackend::new()));
    store.sign_in(Identity::new("demo", Some("Demo"), None));

    let host = GameHost::new(Platform {
        scheduler: scheduler.clone(),
        input: input.clone(),
        surfaces: Rc::new(RecordingSurfaceFactory::new()),
        audio: None,
        store: store.clone(),
        settings: Settings::default(),
        seed: 42,
    });

    if let Err(e) = host.mount(&game_id, 800, 600) {
        log::error!("{e}");
        let ids: Vec<&str> = host.games().iter().map(|m| m.id).collect();
        eprintln!("Available games: {}", ids.join(", "));
        std::process::exit(2);
    }

    let mut frames = 0;
    while frames < MAX_FRAMES && host.view().status == HostStatus::Playing {
        if frames % 20 == 0 {
            let key = SCRIPT[(frames / 20) % SCRIPT.len()];
            input.emit_key_down(key);
            scheduler.advance(FRAME_MS);
            input.emit_key_up(key);
        } else {
            scheduler.advance(FRAME_MS);
        }
        frames += 1;
    }

    let view = host.view();
    log::info!(
        "{game_id}: {:?} after {frames} frames, score {}, best {}",
        view.status,
        view.score,
        store.get_highscore(&game_id)
    );
    match serde_json::to_string_pretty(&view) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Could not encode view: {e}"),
    }
    host.unmount();
}

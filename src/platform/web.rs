//! Browser glue: `requestAnimationFrame` scheduling and DOM input listeners

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, EventTarget, KeyboardEvent, PointerEvent, Window};

use crate::engine::{
    FrameCallback, FrameHandle, FrameScheduler, InputAdapter, InputSink, InputSource, Intent,
    ListenerGuard,
};

type RafClosure = Closure<dyn FnMut(f64)>;

#[derive(Default)]
struct RafState {
    next: u64,
    /// token -> (rAF id, closure)
    frames: HashMap<u64, (i32, RafClosure)>,
    /// Closures that already ran; freed on the next callback
    spent: Vec<RafClosure>,
}

/// `FrameScheduler` backed by `window.requestAnimationFrame`
pub struct RafScheduler {
    window: Window,
    state: Rc<RefCell<RafState>>,
}

impl RafScheduler {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            state: Rc::new(RefCell::new(RafState::default())),
        }
    }
}

impl FrameScheduler for RafScheduler {
    fn now(&self) -> f64 {
        self.window
            .performance()
            .map_or_else(js_sys::Date::now, |p| p.now())
    }

    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let token = {
            let mut state = self.state.borrow_mut();
            state.next += 1;
            state.next
        };

        let weak = Rc::downgrade(&self.state);
        let mut callback = Some(callback);
        let closure = Closure::<dyn FnMut(f64)>::new(move |time: f64| {
            if let Some(state) = weak.upgrade() {
                let mut state = state.borrow_mut();
                state.spent.clear();
                if let Some((_, own)) = state.frames.remove(&token) {
                    state.spent.push(own);
                }
            }
            if let Some(callback) = callback.take() {
                callback(time);
            }
        });

        match self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
        {
            Ok(id) => {
                self.state.borrow_mut().frames.insert(token, (id, closure));
            }
            Err(e) => log::error!("requestAnimationFrame failed: {e:?}"),
        }
        FrameHandle(token)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let entry = self.state.borrow_mut().frames.remove(&handle.0);
        if let Some((id, _closure)) = entry {
            if let Err(e) = self.window.cancel_animation_frame(id) {
                log::warn!("cancelAnimationFrame failed: {e:?}");
            }
        }
    }
}

impl Drop for RafScheduler {
    fn drop(&mut self) {
        let frames: Vec<_> = self.state.borrow_mut().frames.drain().collect();
        for (_, (id, _closure)) in frames {
            let _ = self.window.cancel_animation_frame(id);
        }
    }
}

type Listener = (EventTarget, &'static str, Closure<dyn FnMut(Event)>);

/// Keyboard on the window, pointer events on the game container, and
/// auto-pause on blur or when the tab is hidden
pub struct DomInputSource {
    window: Window,
    document: Document,
    container: Element,
}

impl DomInputSource {
    pub fn new(window: Window, document: Document, container: Element) -> Self {
        Self {
            window,
            document,
            container,
        }
    }

    fn with_adapter(sink: &InputSink, f: impl FnOnce(&mut InputAdapter)) {
        if let Some(adapter) = sink.upgrade() {
            f(&mut adapter.borrow_mut());
        }
    }
}

/// Pointer position relative to `container`
fn local_pos(container: &Element, event: &PointerEvent) -> Vec2 {
    let rect = container.get_bounding_client_rect();
    Vec2::new(
        (event.client_x() as f64 - rect.left()) as f32,
        (event.client_y() as f64 - rect.top()) as f32,
    )
}

impl InputSource for DomInputSource {
    fn attach(&self, sink: InputSink) -> ListenerGuard {
        let mut listeners: Vec<Listener> = Vec::new();
        let window: EventTarget = self.window.clone().into();
        let document: EventTarget = self.document.clone().into();
        let container: EventTarget = self.container.clone().into();

        {
            let sink = sink.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: Event| {
                let Some(key) = event.dyn_ref::<KeyboardEvent>() else {
                    return;
                };
                let code = key.code();
                if Intent::from_key_code(&code).is_some_and(|i| i.blocks_default()) {
                    event.prevent_default();
                }
                Self::with_adapter(&sink, |a| {
                    a.key_down(&code);
                });
            });
            listeners.push((window.clone(), "keydown", closure));
        }
        {
            let sink = sink.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: Event| {
                if let Some(key) = event.dyn_ref::<KeyboardEvent>() {
                    let code = key.code();
                    Self::with_adapter(&sink, |a| a.key_up(&code));
                }
            });
            listeners.push((window.clone(), "keyup", closure));
        }

        let pointer_events: [(&'static str, fn(&mut InputAdapter, Vec2)); 3] = [
            ("pointerdown", |a, pos| a.pointer_down(pos)),
            ("pointermove", |a, pos| a.pointer_move(pos)),
            ("pointerup", |a, pos| a.pointer_up(pos)),
        ];
        for (name, handle) in pointer_events {
            let sink = sink.clone();
            let element = self.container.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: Event| {
                if let Some(pointer) = event.dyn_ref::<PointerEvent>() {
                    let pos = local_pos(&element, pointer);
                    Self::with_adapter(&sink, |a| handle(a, pos));
                }
            });
            listeners.push((container.clone(), name, closure));
        }

        {
            let sink = sink.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
                log::info!("Auto-paused (window blur)");
                Self::with_adapter(&sink, |a| a.request_pause());
            });
            listeners.push((window.clone(), "blur", closure));
        }
        {
            let sink = sink.clone();
            let doc = self.document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
                if doc.visibility_state() == web_sys::VisibilityState::Hidden {
                    log::info!("Auto-paused (tab hidden)");
                    Self::with_adapter(&sink, |a| a.request_pause());
                }
            });
            listeners.push((document.clone(), "visibilitychange", closure));
        }

        listeners.retain(|(target, name, closure)| {
            match target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref()) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Could not listen for {name}: {e:?}");
                    false
                }
            }
        });

        ListenerGuard::new(move || {
            for (target, name, closure) in listeners {
                let _ = target
                    .remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            }
        })
    }
}

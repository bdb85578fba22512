//! Browser binding of the nicofix agent.
//!
//! Binds the reconciler's entry points to `setInterval`, a
//! `MutationObserver`, `message`, `ratechange` and `pagehide`. Everything
//! runs on the page's single thread; a callback that finds the reconciler
//! already borrowed skips its turn and the next tick catches up.

mod page;

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function};
use nicofix_lib::{AgentConfig, FrameMessage, Reconciler, TimerKind};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, MessageEvent, MutationObserver, MutationObserverInit};

pub use page::WebPage;

type Shared = Rc<RefCell<Reconciler<WebPage>>>;

const OBSERVED_ATTRIBUTES: [&str; 5] = ["style", "class", "aria-hidden", "title", "src"];

/// Listeners and handles kept alive for the lifetime of the document.
struct Agent {
    reconciler: Shared,
    intervals: Vec<(i32, Closure<dyn FnMut()>)>,
    observer: Option<(MutationObserver, Closure<dyn FnMut()>)>,
    listeners: Vec<(&'static str, bool, Closure<dyn FnMut(Event)>)>,
    ready: Option<Closure<dyn FnMut()>>,
    stopped: bool,
}

thread_local! {
    static AGENT: RefCell<Option<Agent>> = const { RefCell::new(None) };
}

/// Initialize panic hook and logging
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("[Agent] WASM module initialized");
}

fn with_reconciler(reconciler: &Shared, f: impl FnOnce(&mut Reconciler<WebPage>)) {
    match reconciler.try_borrow_mut() {
        Ok(mut reconciler) => f(&mut reconciler),
        Err(_) => log::debug!("[Agent] reconciler busy, skipping"),
    }
}

/// Start the agent in this document.
///
/// `config_json` is an optional partial override of the defaults. Returns
/// without doing anything when this document is not one the agent serves
/// or the agent is already running.
#[wasm_bindgen]
pub fn start(config_json: Option<String>) -> Result<(), JsValue> {
    if AGENT.with(|agent| agent.borrow().is_some()) {
        log::debug!("[Agent] already started");
        return Ok(());
    }

    let config = match config_json.as_deref() {
        Some(json) => AgentConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => AgentConfig::default(),
    };
    let page = WebPage::new()?;
    let window = page.window().clone();
    let document = page.document().clone();

    let Some(reconciler) =
        Reconciler::for_page(page, config).map_err(|e| JsValue::from_str(&e.to_string()))?
    else {
        log::info!("[Agent] not a watch, embed or ad frame document");
        return Ok(());
    };
    log::info!("[Agent] starting as {:?}", reconciler.role());
    let timers = reconciler.timers();
    let reconciler: Shared = Rc::new(RefCell::new(reconciler));

    let mut agent = Agent {
        reconciler: reconciler.clone(),
        intervals: Vec::new(),
        observer: None,
        listeners: Vec::new(),
        ready: None,
        stopped: false,
    };

    for (kind, period_ms) in timers {
        let shared = reconciler.clone();
        let callback = Closure::wrap(Box::new(move || {
            with_reconciler(&shared, |r| r.on_timer(kind));
        }) as Box<dyn FnMut()>);
        let handle = window.set_interval_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            period_ms as i32,
        )?;
        agent.intervals.push((handle, callback));
    }

    let shared = reconciler.clone();
    let on_mutation = Closure::wrap(Box::new(move || {
        with_reconciler(&shared, |r| r.on_mutation());
    }) as Box<dyn FnMut()>);
    let observer = MutationObserver::new(on_mutation.as_ref().unchecked_ref())?;
    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    init.set_attributes(true);
    let filter: Array = OBSERVED_ATTRIBUTES.iter().map(|a| JsValue::from_str(a)).collect();
    init.set_attribute_filter(&filter);
    if let Some(root) = document.document_element() {
        observer.observe_with_options(&root, &init)?;
    }
    agent.observer = Some((observer, on_mutation));

    let shared = reconciler.clone();
    let on_message = Closure::wrap(Box::new(move |event: Event| {
        let event = event.unchecked_into::<MessageEvent>();
        let origin = event.origin();
        let data = event.data();
        if let Some(text) = data.as_string() {
            with_reconciler(&shared, |r| r.on_message(&origin, &text));
        } else if data.is_object() {
            match serde_wasm_bindgen::from_value::<FrameMessage>(data) {
                Ok(message) => with_reconciler(&shared, |r| r.on_frame_message(&origin, message)),
                Err(err) => log::debug!("[SYNC] ignored message from {}: {}", origin, err),
            }
        }
    }) as Box<dyn FnMut(Event)>);
    window.add_event_listener_with_callback("message", on_message.as_ref().unchecked_ref())?;
    agent.listeners.push(("message", false, on_message));

    // ratechange does not bubble; listen in the capture phase.
    let shared = reconciler.clone();
    let on_rate = Closure::wrap(Box::new(move |_: Event| {
        with_reconciler(&shared, |r| r.on_primary_rate_change());
    }) as Box<dyn FnMut(Event)>);
    document.add_event_listener_with_callback_and_bool(
        "ratechange",
        on_rate.as_ref().unchecked_ref(),
        true,
    )?;
    agent.listeners.push(("ratechange", true, on_rate));

    let on_hide = Closure::wrap(Box::new(move |_: Event| stop()) as Box<dyn FnMut(Event)>);
    window.add_event_listener_with_callback("pagehide", on_hide.as_ref().unchecked_ref())?;
    agent.listeners.push(("pagehide", false, on_hide));

    if document.ready_state() == "loading" {
        let shared = reconciler.clone();
        let on_ready = Closure::wrap(Box::new(move || {
            with_reconciler(&shared, |r| r.on_start());
        }) as Box<dyn FnMut()>);
        let callback: &Function = on_ready.as_ref().unchecked_ref();
        document.add_event_listener_with_callback("DOMContentLoaded", callback)?;
        agent.ready = Some(on_ready);
    } else {
        with_reconciler(&reconciler, |r| r.on_start());
    }

    AGENT.with(|slot| *slot.borrow_mut() = Some(agent));
    Ok(())
}

/// Tear the agent down: restore moved controls, remove the frame and stop
/// every timer and observer. Closures stay owned by the agent so a
/// listener that is mid-dispatch is never freed under itself.
#[wasm_bindgen]
pub fn stop() {
    AGENT.with(|slot| {
        let Ok(mut slot) = slot.try_borrow_mut() else {
            return;
        };
        let Some(agent) = slot.as_mut() else {
            return;
        };
        if agent.stopped {
            return;
        }
        agent.stopped = true;

        with_reconciler(&agent.reconciler, |r| r.teardown());

        let Some(window) = web_sys::window() else {
            return;
        };
        for (handle, _) in &agent.intervals {
            window.clear_interval_with_handle(*handle);
        }
        if let Some((observer, _)) = &agent.observer {
            observer.disconnect();
        }
        for (event, capture, callback) in &agent.listeners {
            let callback: &Function = callback.as_ref().unchecked_ref();
            let removed = if *capture {
                window
                    .document()
                    .map(|d| d.remove_event_listener_with_callback_and_bool(event, callback, true))
                    .unwrap_or(Ok(()))
            } else {
                window.remove_event_listener_with_callback(event, callback)
            };
            if removed.is_err() {
                log::debug!("[Agent] could not remove {} listener", event);
            }
        }
        if let (Some(ready), Some(document)) = (&agent.ready, window.document()) {
            let _ = document
                .remove_event_listener_with_callback("DOMContentLoaded", ready.as_ref().unchecked_ref());
        }
        log::info!("[Agent] stopped");
    });
}

/// Current decision and role, for debugging from the console.
#[wasm_bindgen]
pub fn status() -> JsValue {
    AGENT.with(|slot| {
        let slot = slot.borrow();
        let Some(agent) = slot.as_ref() else {
            return JsValue::NULL;
        };
        let Ok(reconciler) = agent.reconciler.try_borrow() else {
            return JsValue::NULL;
        };
        let status = serde_json::json!({
            "role": reconciler.role(),
            "decision": reconciler.decision(),
            "session": reconciler.session().map(|s| s.watch_id.as_str().to_string()),
            "tornDown": reconciler.is_torn_down(),
        });
        status
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .unwrap_or(JsValue::NULL)
    })
}

/// Force a decision pass, e.g. after a soft navigation the loader observed.
#[wasm_bindgen]
pub fn refresh() {
    AGENT.with(|slot| {
        if let Some(agent) = slot.borrow().as_ref() {
            with_reconciler(&agent.reconciler, |r| r.on_timer(TimerKind::Decision));
        }
    });
}

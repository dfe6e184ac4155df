use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AddEventListenerOptions, CanvasRenderingContext2d, Document, Element, Event,
    HtmlButtonElement, HtmlCanvasElement, HtmlElement, MouseEvent, TouchEvent, Window,
};

use twosign_shared::{PointerInput, Role, SignRequest};

use crate::dom::{fit_pad, get_element, mouse_to_point, notify, set_display, touch_to_point};
use crate::net::{fetch_status, post_sign, FetchError};
use crate::render::{paint_pad, render_party, render_state, sign_button};
use crate::state::State;
use crate::util::now_iso;

type SharedState = Rc<RefCell<State>>;

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let started = Rc::new(Cell::new(false));

    if document.ready_state() != "loading" {
        started.set(true);
        return start_app();
    }

    let onload_started = started.clone();
    let onload = Closure::<dyn FnMut(Event)>::new(move |_| {
        if onload_started.replace(true) {
            return;
        }
        if let Err(err) = start_app() {
            web_sys::console::error_1(&err);
        }
    });
    document.add_event_listener_with_callback(
        "DOMContentLoaded",
        onload.as_ref().unchecked_ref(),
    )?;
    onload.forget();

    Ok(())
}

fn load_status(window: &Window, document: &Document) -> Result<(), JsValue> {
    let window_cb = window.clone();
    let document_cb = document.clone();
    fetch_status(window, move |result| match result {
        Ok(agreement) => render_state(&window_cb, &document_cb, &agreement),
        Err(error) => web_sys::console::error_1(
            &format!("Failed to fetch status: {error:?}").into(),
        ),
    })
}

fn open_modal(window: &Window, document: &Document, state: &SharedState, role: Role) {
    state.borrow_mut().current_role = Some(role);
    if let Ok(title) = get_element::<Element>(document, "modalTitle") {
        title.set_text_content(Some(&format!("{}请签字", role.label())));
    }
    if let Ok(modal) = get_element::<HtmlElement>(document, "signModal") {
        set_display(&modal, true);
    }

    // The container has no size until the modal is laid out.
    let state_cb = state.clone();
    let onframe = Closure::<dyn FnMut()>::new(move || {
        let mut state = state_cb.borrow_mut();
        if !state.modal_open() {
            return;
        }
        fit_pad(&mut state);
        state.pad.clear();
        paint_pad(&state);
    });
    if let Err(error) = window.request_animation_frame(onframe.as_ref().unchecked_ref()) {
        web_sys::console::error_1(&error);
    }
    onframe.forget();
}

fn close_modal(document: &Document, state: &SharedState) {
    if let Ok(modal) = get_element::<HtmlElement>(document, "signModal") {
        set_display(&modal, false);
    }
    let mut state = state.borrow_mut();
    state.current_role = None;
    state.pad.end_stroke();
}

fn submit_signature(window: &Window, document: &Document, state: &SharedState) {
    let (role, image) = {
        let mut state = state.borrow_mut();
        let Some(role) = state.current_role else {
            return;
        };
        if state.submitting {
            return;
        }
        if state.pad.is_blank() {
            drop(state);
            notify(window, "请先签字");
            return;
        }
        state.submitting = true;
        (role, state.pad.export())
    };
    let request = SignRequest {
        role: role.as_str().to_string(),
        signature: image,
        date: now_iso(),
    };

    let window_cb = window.clone();
    let document_cb = document.clone();
    let state_cb = state.clone();
    let sent = post_sign(window, &request, move |result| {
        state_cb.borrow_mut().submitting = false;
        match result {
            Ok(response) => {
                if let Err(error) =
                    render_party(&window_cb, &document_cb, role, response.data.slot(role))
                {
                    web_sys::console::error_1(&error);
                }
                close_modal(&document_cb, &state_cb);
                notify(&window_cb, "签字成功！");
            }
            Err(FetchError::Rejected(reason)) => {
                web_sys::console::warn_1(&format!("Sign rejected: {reason}").into());
                notify(&window_cb, "签字失败，请重试");
            }
            Err(FetchError::Network(reason)) => {
                web_sys::console::error_1(&format!("Error saving signature: {reason}").into());
                notify(&window_cb, "网络错误，请重试");
            }
        }
    });
    if let Err(error) = sent {
        state.borrow_mut().submitting = false;
        web_sys::console::error_1(&error);
        notify(window, "网络错误，请重试");
    }
}

fn apply_input(state: &SharedState, input: PointerInput) {
    let mut state = state.borrow_mut();
    if !state.modal_open() {
        return;
    }
    state.pad.handle(input);
    if matches!(input, PointerInput::Move(_)) {
        paint_pad(&state);
    }
}

fn bind_mouse(canvas: &HtmlCanvasElement, state: &SharedState) -> Result<(), JsValue> {
    for event_name in ["mousedown", "mousemove", "mouseup", "mouseout"] {
        let state_cb = state.clone();
        let canvas_cb = canvas.clone();
        let onmouse = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            let input = match event.type_().as_str() {
                "mousedown" => PointerInput::Down(mouse_to_point(&canvas_cb, &event)),
                "mousemove" => PointerInput::Move(mouse_to_point(&canvas_cb, &event)),
                "mouseup" => PointerInput::Up,
                _ => PointerInput::Leave,
            };
            apply_input(&state_cb, input);
        });
        canvas.add_event_listener_with_callback(event_name, onmouse.as_ref().unchecked_ref())?;
        onmouse.forget();
    }
    Ok(())
}

fn bind_touch(canvas: &HtmlCanvasElement, state: &SharedState) -> Result<(), JsValue> {
    let options = AddEventListenerOptions::new();
    options.set_passive(false);
    for event_name in ["touchstart", "touchmove", "touchend"] {
        let state_cb = state.clone();
        let canvas_cb = canvas.clone();
        let ontouch = Closure::<dyn FnMut(TouchEvent)>::new(move |event: TouchEvent| {
            let kind = event.type_();
            if kind != "touchend" {
                event.prevent_default();
            }
            let input = match kind.as_str() {
                "touchstart" => touch_to_point(&canvas_cb, &event).map(PointerInput::Down),
                "touchmove" => touch_to_point(&canvas_cb, &event).map(PointerInput::Move),
                _ => Some(PointerInput::Up),
            };
            if let Some(input) = input {
                apply_input(&state_cb, input);
            }
        });
        canvas.add_event_listener_with_callback_and_add_event_listener_options(
            event_name,
            ontouch.as_ref().unchecked_ref(),
            &options,
        )?;
        ontouch.forget();
    }
    Ok(())
}

fn on_click(
    button: &HtmlButtonElement,
    mut handler: impl 'static + FnMut(),
) -> Result<(), JsValue> {
    let onclick = Closure::<dyn FnMut(Event)>::new(move |_| handler());
    button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
    onclick.forget();
    Ok(())
}

fn start_app() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;

    let canvas: HtmlCanvasElement = get_element(&document, "signaturePad")?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("Missing 2d context"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    let modal: Element = get_element(&document, "signModal")?;
    let save_button: HtmlButtonElement = get_element(&document, "btnSave")?;
    let clear_button: HtmlButtonElement = get_element(&document, "btnClear")?;
    let cancel_button: HtmlButtonElement = get_element(&document, "btnCancel")?;

    let state: SharedState = Rc::new(RefCell::new(State::new(canvas.clone(), ctx)));

    load_status(&window, &document)?;

    for role in Role::ALL {
        let button = sign_button(&document, role)?;
        let window_cb = window.clone();
        let document_cb = document.clone();
        let state_cb = state.clone();
        on_click(&button, move || {
            open_modal(&window_cb, &document_cb, &state_cb, role);
        })?;
    }

    {
        let window_cb = window.clone();
        let document_cb = document.clone();
        let state_cb = state.clone();
        on_click(&save_button, move || {
            submit_signature(&window_cb, &document_cb, &state_cb);
        })?;
    }

    {
        let state_cb = state.clone();
        on_click(&clear_button, move || {
            let mut state = state_cb.borrow_mut();
            state.pad.end_stroke();
            state.pad.clear();
            paint_pad(&state);
        })?;
    }

    {
        let document_cb = document.clone();
        let state_cb = state.clone();
        on_click(&cancel_button, move || {
            close_modal(&document_cb, &state_cb);
        })?;
    }

    bind_mouse(&canvas, &state)?;
    bind_touch(&canvas, &state)?;

    {
        let document_cb = document.clone();
        let state_cb = state.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let on_backdrop = event.target().is_some_and(|target| {
                AsRef::<JsValue>::as_ref(&target) == AsRef::<JsValue>::as_ref(&modal)
            });
            if on_backdrop {
                close_modal(&document_cb, &state_cb);
            }
        });
        window.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let resize_state = state.clone();
        let onresize = Closure::<dyn FnMut()>::new(move || {
            let mut state = resize_state.borrow_mut();
            if state.modal_open() {
                fit_pad(&mut state);
            }
        });
        window.add_event_listener_with_callback("resize", onresize.as_ref().unchecked_ref())?;
        onresize.forget();
    }

    Ok(())
}

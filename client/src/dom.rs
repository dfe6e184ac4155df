use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlCanvasElement, HtmlElement, MouseEvent, TouchEvent, Window};

use twosign_shared::{Point, SignaturePad};

use crate::render::paint_pad;
use crate::state::State;

pub fn get_element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {id}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {id}")))
}

pub fn query_element<T: JsCast>(document: &Document, selector: &str) -> Result<T, JsValue> {
    let element = document
        .query_selector(selector)?
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {selector}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {selector}")))
}

pub fn set_display(element: &HtmlElement, shown: bool) {
    let value = if shown { "block" } else { "none" };
    let _ = element.style().set_property("display", value);
}

pub fn notify(window: &Window, message: &str) {
    let _ = window.alert_with_message(message);
}

/// Fits the pad to its container. Must run after the container is laid out;
/// a hidden container measures zero and the pad falls back to its defaults.
pub fn fit_pad(state: &mut State) {
    let (width, height) = match state.canvas.parent_element() {
        Some(container) => (
            container.client_width().max(0) as u32,
            container.client_height().max(0) as u32,
        ),
        None => (state.canvas.width(), 0),
    };
    state.pad.resize(width, height);
    state.canvas.set_width(state.pad.width());
    state.canvas.set_height(state.pad.height());
    paint_pad(state);
}

fn to_pad_point(canvas: &HtmlCanvasElement, client_x: i32, client_y: i32) -> Point {
    let rect = canvas.get_bounding_client_rect();
    SignaturePad::to_local(client_x as f64, client_y as f64, rect.left(), rect.top())
}

pub fn mouse_to_point(canvas: &HtmlCanvasElement, event: &MouseEvent) -> Point {
    to_pad_point(canvas, event.client_x(), event.client_y())
}

pub fn touch_to_point(canvas: &HtmlCanvasElement, event: &TouchEvent) -> Option<Point> {
    let touch = event.touches().get(0)?;
    Some(to_pad_point(canvas, touch.client_x(), touch.client_y()))
}

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Headers, Request, RequestInit, Response, Window};

use twosign_shared::{AgreementState, ErrorResponse, SignRequest, SignResponse};

const API_URL: &str = "/api";

#[derive(Debug)]
pub enum FetchError {
    /// The request never produced a readable response.
    Network(String),
    /// The service answered, but not with a success.
    Rejected(String),
}

type TextCallback = Box<dyn FnOnce(Result<String, FetchError>)>;

fn fetch_text(window: &Window, request: &Request, on_done: TextCallback) {
    let on_done = Rc::new(RefCell::new(Some(on_done)));

    let to_text = Closure::<dyn FnMut(JsValue) -> JsValue>::new(|value: JsValue| {
        match value.dyn_into::<Response>().ok().and_then(|response| response.text().ok()) {
            Some(text) => text.into(),
            None => Promise::reject(&JsValue::from_str("Response has no body")).into(),
        }
    });

    let done_ok = on_done.clone();
    let on_text = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
        if let Some(callback) = done_ok.borrow_mut().take() {
            callback(
                value
                    .as_string()
                    .ok_or_else(|| FetchError::Network("Response body is not text".into())),
            );
        }
    });

    let done_err = on_done;
    let on_err = Closure::<dyn FnMut(JsValue)>::new(move |error: JsValue| {
        if let Some(callback) = done_err.borrow_mut().take() {
            callback(Err(FetchError::Network(format!("{error:?}"))));
        }
    });

    let _ = window
        .fetch_with_request(request)
        .then(&to_text)
        .then2(&on_text, &on_err);
    to_text.forget();
    on_text.forget();
    on_err.forget();
}

fn rejection(text: &str) -> FetchError {
    match serde_json::from_str::<ErrorResponse>(text) {
        Ok(body) => FetchError::Rejected(body.error),
        Err(_) => FetchError::Rejected("Unexpected response".into()),
    }
}

pub fn fetch_status(
    window: &Window,
    on_done: impl 'static + FnOnce(Result<AgreementState, FetchError>),
) -> Result<(), JsValue> {
    let request = Request::new_with_str(&format!("{API_URL}/status"))?;
    fetch_text(
        window,
        &request,
        Box::new(move |result| {
            on_done(result.and_then(|text| {
                serde_json::from_str::<AgreementState>(&text).map_err(|_| rejection(&text))
            }))
        }),
    );
    Ok(())
}

pub fn post_sign(
    window: &Window,
    body: &SignRequest,
    on_done: impl 'static + FnOnce(Result<SignResponse, FetchError>),
) -> Result<(), JsValue> {
    let payload = serde_json::to_string(body)
        .map_err(|error| JsValue::from_str(&format!("Failed to encode sign request: {error}")))?;
    let headers = Headers::new()?;
    headers.set("Content-Type", "application/json")?;
    let init = RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(&payload));
    let request = Request::new_with_str_and_init(&format!("{API_URL}/sign"), &init)?;

    fetch_text(
        window,
        &request,
        Box::new(move |result| {
            on_done(result.and_then(|text| {
                match serde_json::from_str::<SignResponse>(&text) {
                    Ok(response) if response.success => Ok(response),
                    Ok(_) => Err(FetchError::Rejected("Sign was not accepted".into())),
                    Err(_) => Err(rejection(&text)),
                }
            }))
        }),
    );
    Ok(())
}

use wasm_bindgen::JsValue;

pub fn now_iso() -> String {
    js_sys::Date::new_0().to_iso_string().into()
}

/// Date part of an ISO timestamp in the browser's locale.
pub fn format_date(window: &web_sys::Window, iso: &str) -> String {
    let locale = window
        .navigator()
        .language()
        .unwrap_or_else(|| "zh-CN".to_string());
    let date = js_sys::Date::new(&JsValue::from_str(iso));
    date.to_locale_date_string(&locale, &JsValue::UNDEFINED)
        .into()
}

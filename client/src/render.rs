use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{Document, Element, HtmlButtonElement, HtmlImageElement, ImageData, Window};

use twosign_shared::{AgreementState, Role, SignatureRecord};

use crate::dom::{get_element, query_element};
use crate::state::{State, REVEAL_DELAY_MS};
use crate::util::format_date;

/// Copies the pad's pixels onto the visible canvas.
pub fn paint_pad(state: &State) {
    let pad = &state.pad;
    match ImageData::new_with_u8_clamped_array_and_sh(Clamped(pad.pixels()), pad.width(), pad.height()) {
        Ok(image) => {
            let _ = state.ctx.put_image_data(&image, 0.0, 0.0);
        }
        Err(error) => web_sys::console::error_2(&"Failed to paint signature pad".into(), &error),
    }
}

fn button_label(role: Role) -> &'static str {
    match role {
        Role::PartyA => "🤡 甲方签字 (不信邪)",
        Role::PartyB => "😎 乙方签字 (稳如狗)",
    }
}

pub fn sign_button(document: &Document, role: Role) -> Result<HtmlButtonElement, JsValue> {
    query_element(document, &format!("#block-{role} .btn-sign"))
}

pub fn render_state(window: &Window, document: &Document, agreement: &AgreementState) {
    for role in Role::ALL {
        if let Err(error) = render_party(window, document, role, agreement.slot(role)) {
            web_sys::console::error_1(&error);
        }
    }
}

pub fn render_party(
    window: &Window,
    document: &Document,
    role: Role,
    record: Option<&SignatureRecord>,
) -> Result<(), JsValue> {
    let display: Element = get_element(document, &format!("display-{role}"))?;
    let meta: Element = get_element(document, &format!("meta-{role}"))?;
    let stamp: Element = get_element(document, &format!("stamp-{role}"))?;
    let fingerprint: Element = get_element(document, &format!("fingerprint-{role}"))?;
    let block: Element = get_element(document, &format!("block-{role}"))?;
    let button = sign_button(document, role)?;

    display.set_inner_html("");
    match record {
        Some(record) => {
            let image: HtmlImageElement = document.create_element("img")?.dyn_into()?;
            image.set_src(&record.image);
            image.set_alt("Signature");
            display.append_child(&image)?;
            meta.set_text_content(Some(&format!(
                "签订日期：{}",
                format_date(window, &record.date)
            )));
            button.set_disabled(true);
            button.set_text_content(Some("已签字 ✅"));

            stamp.class_list().add_1("show")?;
            block.class_list().add_1("signed")?;
            let block_cb = block.clone();
            let onreveal = Closure::<dyn FnMut()>::new(move || {
                // Skip if the block was reset before the delay ran out.
                if block_cb.class_list().contains("signed") {
                    let _ = fingerprint.class_list().add_1("show");
                }
            });
            window.set_timeout_with_callback_and_timeout_and_arguments_0(
                onreveal.as_ref().unchecked_ref(),
                REVEAL_DELAY_MS,
            )?;
            onreveal.forget();
        }
        None => {
            meta.set_text_content(Some(""));
            button.set_disabled(false);
            button.set_text_content(Some(button_label(role)));
            stamp.class_list().remove_1("show")?;
            fingerprint.class_list().remove_1("show")?;
            block.class_list().remove_1("signed")?;
        }
    }
    Ok(())
}

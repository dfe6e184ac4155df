use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use twosign_shared::{Role, SignaturePad};

pub const REVEAL_DELAY_MS: i32 = 300;

pub struct State {
    pub canvas: HtmlCanvasElement,
    pub ctx: CanvasRenderingContext2d,
    pub pad: SignaturePad,
    /// Role being signed while the modal is open.
    pub current_role: Option<Role>,
    pub submitting: bool,
}

impl State {
    pub fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        let pad = SignaturePad::new(canvas.width(), canvas.height());
        Self {
            canvas,
            ctx,
            pad,
            current_role: None,
            submitting: false,
        }
    }

    pub fn modal_open(&self) -> bool {
        self.current_role.is_some()
    }
}

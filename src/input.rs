/* Parsing of the 5-byte motion/click register block into an InputSample. */
use crate::registers::{INPUT_BLOCK_LEN, MSK_CLICKED, MSK_CLICK_STATE_UPDATE};

/* One snapshot of the trackball's motion and click state, produced per   */
/* poll cycle and handed to listeners when anything changed.              */
/*  */
/* `clicked` is the current switch level; `click_state_changed` is the    */
/* transition flag the firmware latches on press or release. The two are  */
/* independent.                                                           */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSample {
    pub left: u8,
    pub right: u8,
    pub up: u8,
    pub down: u8,
    pub clicked: bool,
    pub click_state_changed: bool,
    /* True iff any directional magnitude or the click transition flag */
    /* is set; only then is the sample worth emitting.                 */
    pub state_update: bool,
}

impl InputSample {
    /* Decode the raw block read from REG_LEFT. */
    pub fn from_raw(raw: [u8; INPUT_BLOCK_LEN]) -> Self {
        let [left, right, up, down, switch] = raw;
        let clicked = switch & MSK_CLICKED != 0;
        let click_state_changed = switch & MSK_CLICK_STATE_UPDATE != 0;
        let state_update =
            left != 0 || right != 0 || up != 0 || down != 0 || click_state_changed;

        Self {
            left,
            right,
            up,
            down,
            clicked,
            click_state_changed,
            state_update,
        }
    }
}

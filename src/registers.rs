/* PIM447 register map. */
/*  */
/* The trackball exposes a flat byte-addressed register file over I2C: */
/* - 0x00..0x03: LED drive levels (red, green, blue, white)            */
/* - 0x04..0x08: motion/click state block, readable in one burst       */
/* - 0xD0..0xFE: flash, interrupt and chip management registers        */

/* I2C bus addresses (the alternative is selected by cutting a trace) */
pub const I2C_ADDR_PRIMARY: u16 = 0x0A;
pub const I2C_ADDR_ALTERNATIVE: u16 = 0x0B;

/* Chip identity reported through REG_CHIP_ID_L/H */
pub const CHIP_ID: u16 = 0xBA11;
pub const VERSION: u8 = 1;

/* LED channel registers */
pub const REG_LED_RED: u8 = 0x00;
pub const REG_LED_GRN: u8 = 0x01;
pub const REG_LED_BLU: u8 = 0x02;
pub const REG_LED_WHT: u8 = 0x03;

/* Motion/click state block; read 5 bytes starting at REG_LEFT */
pub const REG_LEFT: u8 = 0x04;
pub const REG_RIGHT: u8 = 0x05;
pub const REG_UP: u8 = 0x06;
pub const REG_DOWN: u8 = 0x07;
pub const REG_SWITCH: u8 = 0x08;
pub const INPUT_BLOCK_LEN: usize = 5;

/* REG_SWITCH bit masks */
pub const MSK_CLICKED: u8 = 0x80;
pub const MSK_CLICK_STATE_UPDATE: u8 = 0x01;
pub const MSK_SWITCH_STATE: u8 = 0b1000_0000;

/* Flash storage */
pub const REG_USER_FLASH: u8 = 0xD0;
pub const REG_FLASH_PAGE: u8 = 0xF0;

/* Interrupt control */
pub const REG_INT: u8 = 0xF9;
pub const MSK_INT_TRIGGERED: u8 = 0b0000_0001;
pub const MSK_INT_OUT_EN: u8 = 0b0000_0010;

/* Chip management */
pub const REG_CHIP_ID_L: u8 = 0xFA;
pub const REG_CHIP_ID_H: u8 = 0xFB;
pub const REG_VERSION: u8 = 0xFC;
pub const REG_I2C_ADDR: u8 = 0xFD;

/* REG_CTRL and its bit masks */
pub const REG_CTRL: u8 = 0xFE;
pub const MSK_CTRL_SLEEP: u8 = 0b0000_0001;
pub const MSK_CTRL_RESET: u8 = 0b0000_0010;
pub const MSK_CTRL_FREAD: u8 = 0b0000_0100;
pub const MSK_CTRL_FWRITE: u8 = 0b0000_1000;
